//! Configuration loading: defaults, TOML file, then environment and flags.

use clap::Args;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::schema::ExporterConfig;
use crate::config::validation::{validate_config, Settings, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Settings taken from command-line flags or their environment variables.
///
/// A flag wins over its environment variable. Anything left unset keeps the
/// value from the config file or the default.
#[derive(Debug, Clone, Default, Args)]
pub struct Overrides {
    /// Address to listen on for web interface and telemetry.
    #[arg(long = "web.listen-address", env = "NRE_WEB_LISTEN_ADDRESS")]
    pub web_listen_address: Option<String>,

    /// Path under which to expose metrics.
    #[arg(long = "web.telemetry-path", env = "NRE_WEB_TELEMETRY_PATH")]
    pub web_telemetry_path: Option<String>,

    /// Syslog listen address/socket for Nginx.
    #[arg(long = "nginx.syslog-address", env = "NRE_NGINX_SYSLOG_LISTENER")]
    pub syslog_address: Option<String>,

    /// Syslog tag Nginx messages are sent with.
    #[arg(long = "nginx.syslog-tag", env = "NRE_NGINX_SYSLOG_TAG")]
    pub syslog_tag: Option<String>,

    /// Capacity of the syslog message queue.
    #[arg(long = "nginx.queue-capacity", env = "NRE_QUEUE_CAPACITY")]
    pub queue_capacity: Option<usize>,

    /// Buckets for the Prometheus histogram.
    #[arg(long = "histogram.buckets", env = "NRE_HISTOGRAM_BUCKETS")]
    pub histogram_buckets: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long = "log.level", env = "NRE_LOG_LEVEL")]
    pub log_level: Option<String>,
}

impl Overrides {
    /// Overwrite every field that was explicitly set.
    pub fn apply(&self, config: &mut ExporterConfig) {
        fn set<T: Clone>(target: &mut T, value: &Option<T>) {
            if let Some(value) = value {
                *target = value.clone();
            }
        }

        set(&mut config.web.listen_address, &self.web_listen_address);
        set(&mut config.web.telemetry_path, &self.web_telemetry_path);
        set(&mut config.syslog.listen_address, &self.syslog_address);
        set(&mut config.syslog.tag, &self.syslog_tag);
        set(&mut config.syslog.queue_capacity, &self.queue_capacity);
        set(&mut config.histogram.buckets, &self.histogram_buckets);
        set(&mut config.observability.log_level, &self.log_level);
    }
}

/// Read a TOML config file without validating it.
pub fn read_config_file(path: &Path) -> Result<ExporterConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(toml::from_str(&content)?)
}

/// Build validated settings from an optional file plus overrides.
pub fn load_config(path: Option<&Path>, overrides: &Overrides) -> Result<Settings, ConfigError> {
    let mut config = match path {
        Some(path) => read_config_file(path)?,
        None => ExporterConfig::default(),
    };
    overrides.apply(&mut config);

    validate_config(&config).map_err(ConfigError::Validation)
}
