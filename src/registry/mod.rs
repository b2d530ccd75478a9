//! Metric registry subsystem.
//!
//! # Data Flow
//! ```text
//! pipeline worker (writer)
//!     → MetricRegistry::resolve(identity)
//!         → lookup by metric name (fast path)
//!         → miss: build collector, publish via entry API (create-or-adopt)
//!     → HistogramCollector::observe(label values, value)
//!         → recorder histogram + per-series count/sum
//!
//! HTTP scrape (reader)
//!     → MetricRegistry::render() → Prometheus text format
//! ```
//!
//! # Design Decisions
//! - Explicit object shared via Arc, never a process global
//! - DashMap sharding keeps scrapes and ingestion from blocking each other
//! - One concrete collector type, so no runtime type inspection on adopt
//! - The label-name sequence of a metric is fixed by its first observation
//! - Names that would break the exposition text are refused, not sanitized
//! - A periodic upkeep task drains pending samples between scrapes

pub mod collector;
pub mod store;

use thiserror::Error;

pub use collector::{HistogramCollector, SeriesSnapshot};
pub use store::{parse_buckets, MetricRegistry, NAMESPACE};

/// Key identifying one collector: metric name plus ordered label names.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MetricIdentity {
    pub name: String,
    pub label_names: Vec<String>,
}

impl MetricIdentity {
    pub fn new(name: impl Into<String>, label_names: Vec<String>) -> Self {
        Self {
            name: name.into(),
            label_names,
        }
    }
}

/// Error type for registry operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistryError {
    /// Metric name already registered with other label names.
    #[error("metric {metric:?} registered with labels {registered:?}, got {requested:?}")]
    LabelSetConflict {
        metric: String,
        registered: Vec<String>,
        requested: Vec<String>,
    },
    /// Label values do not align with label names.
    #[error("metric {metric:?} expects {expected} label values, got {actual}")]
    LabelCardinality {
        metric: String,
        expected: usize,
        actual: usize,
    },
    /// Metric name is not a valid exposition name.
    #[error("invalid metric name {0:?}")]
    InvalidMetricName(String),
    /// Label name is not valid, reserved, or the bucket label `le`.
    #[error("metric {metric:?} uses invalid label name {label:?}")]
    InvalidLabelName { metric: String, label: String },
    /// Name already taken by a fixed counter.
    #[error("metric name {0:?} is reserved")]
    ReservedName(String),
    /// Histogram bucket configuration rejected.
    #[error("invalid histogram buckets: {0}")]
    InvalidBuckets(String),
}
