//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from the optional TOML
//! config file. Every field has a default matching the documented
//! environment-variable defaults.

use serde::{Deserialize, Serialize};

/// Root configuration for the exporter.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct ExporterConfig {
    /// HTTP exposition settings.
    pub web: WebConfig,

    /// Syslog ingress settings.
    pub syslog: SyslogConfig,

    /// Histogram settings.
    pub histogram: HistogramConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// HTTP exposition configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct WebConfig {
    /// Address to listen on for the landing page and telemetry.
    /// A leading `:` means all interfaces.
    pub listen_address: String,

    /// Path under which to expose metrics.
    pub telemetry_path: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            listen_address: ":9147".to_string(),
            telemetry_path: "/metrics".to_string(),
        }
    }
}

/// Syslog ingress configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct SyslogConfig {
    /// UDP `host:port`, or `unix:/path` for a datagram socket.
    pub listen_address: String,

    /// Tag messages must carry to be processed.
    pub tag: String,

    /// Capacity of the queue between listener and pipeline.
    pub queue_capacity: usize,
}

impl Default for SyslogConfig {
    fn default() -> Self {
        Self {
            listen_address: "0.0.0.0:9514".to_string(),
            tag: "nginx".to_string(),
            queue_capacity: 20_000,
        }
    }
}

/// Histogram configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct HistogramConfig {
    /// Comma-separated, strictly increasing bucket boundaries.
    pub buckets: String,
}

impl Default for HistogramConfig {
    fn default() -> Self {
        Self {
            buckets: ".005,.01,.025,.05,.1,.25,.5,1,2.5,5,10".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}
