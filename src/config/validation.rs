//! Configuration validation.
//!
//! Turns an [`ExporterConfig`] into typed [`Settings`], collecting every
//! error instead of stopping at the first one.

use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::config::schema::ExporterConfig;
use crate::registry::parse_buckets;
use crate::syslog::SyslogAddress;

/// Validated runtime settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub web_address: SocketAddr,
    pub telemetry_path: String,
    pub syslog_address: SyslogAddress,
    pub syslog_tag: String,
    pub queue_capacity: usize,
    pub buckets: Vec<f64>,
    pub log_level: String,
}

/// A single semantic configuration error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Parse a TCP/UDP listen address, accepting `:port` for all interfaces.
pub fn parse_listen_address(raw: &str) -> Result<SocketAddr, String> {
    let raw = raw.trim();
    let normalized = if raw.starts_with(':') {
        format!("0.0.0.0{raw}")
    } else {
        raw.to_string()
    };
    normalized
        .parse()
        .map_err(|e| format!("invalid address {raw:?}: {e}"))
}

/// Parse the syslog listener address (`unix:` prefix selects a socket path).
pub fn parse_syslog_address(raw: &str) -> Result<SyslogAddress, String> {
    match raw.trim().strip_prefix("unix:") {
        Some("") => Err("empty unix socket path".to_string()),
        Some(path) => Ok(SyslogAddress::Unix(PathBuf::from(path))),
        None => parse_listen_address(raw).map(SyslogAddress::Udp),
    }
}

/// Validate the whole configuration.
pub fn validate_config(config: &ExporterConfig) -> Result<Settings, Vec<ValidationError>> {
    let mut errors = Vec::new();

    let web_address = parse_listen_address(&config.web.listen_address)
        .map_err(|e| errors.push(ValidationError::new("web.listen_address", e)))
        .ok();

    let telemetry_path = &config.web.telemetry_path;
    if !telemetry_path.starts_with('/') || telemetry_path == "/" {
        errors.push(ValidationError::new(
            "web.telemetry_path",
            format!("must start with '/' and not be the root path, got {telemetry_path:?}"),
        ));
    }

    let syslog_address = parse_syslog_address(&config.syslog.listen_address)
        .map_err(|e| errors.push(ValidationError::new("syslog.listen_address", e)))
        .ok();

    if config.syslog.tag.trim().is_empty() {
        errors.push(ValidationError::new("syslog.tag", "must not be empty"));
    }

    if config.syslog.queue_capacity == 0 {
        errors.push(ValidationError::new("syslog.queue_capacity", "must be greater than 0"));
    }

    let buckets = parse_buckets(&config.histogram.buckets)
        .map_err(|e| errors.push(ValidationError::new("histogram.buckets", e.to_string())))
        .ok();

    match (web_address, syslog_address, buckets) {
        (Some(web_address), Some(syslog_address), Some(buckets)) if errors.is_empty() => Ok(Settings {
            web_address,
            telemetry_path: telemetry_path.clone(),
            syslog_address,
            syslog_tag: config.syslog.tag.trim().to_string(),
            queue_capacity: config.syslog.queue_capacity,
            buckets,
            log_level: config.observability.log_level.clone(),
        }),
        _ => Err(errors),
    }
}
