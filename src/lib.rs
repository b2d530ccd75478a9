//! Nginx Request Exporter
//!
//! Turns Nginx access-log lines received over syslog into Prometheus
//! histograms.
//!
//! # Architecture Overview
//!
//! ```text
//!   Nginx ──syslog──▶ syslog (UDP / unix datagram, RFC3164)
//!                          │ bounded queue
//!                          ▼
//!                     pipeline worker ──▶ parser ("time:0.1 status=200 hostname=srv1")
//!                          │
//!                          ▼
//!                     registry (one histogram collector per metric identity)
//!                          ▲
//!   Prometheus ──GET──▶ http (telemetry path renders the registry)
//! ```

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod parser;
pub mod pipeline;
pub mod registry;
pub mod syslog;

pub use config::Settings;
pub use lifecycle::{Exporter, Shutdown};
pub use registry::MetricRegistry;
