//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Settings → Registry → Pipeline → bind syslog → bind HTTP → serve
//!
//! Shutdown (shutdown.rs):
//!     Signal received → watch → listener, worker, HTTP server exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → trigger shutdown
//! ```
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Listeners bind before any task starts
//! - Queued messages are not drained on shutdown

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::{Shutdown, ShutdownSignal};
pub use startup::{Exporter, StartupError};
