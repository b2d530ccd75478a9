//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! built-in defaults
//!     → optional TOML file (--config / NRE_CONFIG_FILE)
//!     → flags and NRE_* environment variables (loader.rs Overrides)
//!     → validation.rs (semantic checks, all errors collected)
//!     → Settings (validated, immutable for the process lifetime)
//! ```
//!
//! # Design Decisions
//! - No hot reload: the log format is fixed until restart
//! - All fields have defaults to allow running with no configuration
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError, Overrides};
pub use schema::ExporterConfig;
pub use validation::{validate_config, Settings, ValidationError};
