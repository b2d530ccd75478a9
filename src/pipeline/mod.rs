//! Observation pipeline subsystem.
//!
//! # Data Flow
//! ```text
//! SyslogMessage (from the ingress queue)
//!     → messages counter += 1
//!     → tag / hostname / content checks ──fail──▶ parse failures += 1, drop
//!     → parser::parse(content)          ──fail──▶ parse failures += 1, drop
//!     → for each metric:
//!         registry.resolve((name, label names))
//!         collector.observe(label values, value)   (conflict: log, skip metric)
//! ```
//!
//! # Design Decisions
//! - Single consumer task, messages applied in arrival order
//! - No retries: a malformed line never becomes valid
//! - Per-metric failures do not count as message failures

pub mod worker;

pub use worker::{Outcome, Pipeline, Rejection, DEFAULT_SYSLOG_TAG};
