//! HTTP exposition subsystem.
//!
//! # Data Flow
//! ```text
//! Prometheus scrape
//!     → server.rs (Axum router, request tracing)
//!     → GET <telemetry path> → MetricRegistry::render()
//!     → GET /               → landing page linking to the telemetry path
//! ```

pub mod server;

pub use server::{AppState, HttpServer};
