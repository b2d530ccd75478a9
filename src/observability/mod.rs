//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via tracing)
//!     → registry (histograms and counters, scraped over HTTP)
//! ```
//!
//! # Design Decisions
//! - Structured fields (hostname, metric, error) on every drop event
//! - Metrics live in the explicit registry, not a global recorder

pub mod logging;

pub use logging::init_logging;
