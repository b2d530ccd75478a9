//! Histogram collector for a single metric identity.
//!
//! # Responsibilities
//! - Hold the label-name sequence fixed at creation
//! - Lazily register one recorder histogram per label-value tuple
//! - Keep a per-series count and sum that can be read back

use dashmap::DashMap;
use metrics::{Histogram, Key, Label, Level, Metadata, Recorder};
use metrics_exporter_prometheus::PrometheusRecorder;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::{MetricIdentity, RegistryError};

/// Point-in-time view of one series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesSnapshot {
    pub count: u64,
    pub sum: f64,
}

/// One label-value tuple of a collector.
struct Series {
    histogram: Histogram,
    count: AtomicU64,
    /// f64 bits, updated with compare-and-swap.
    sum: AtomicU64,
}

impl Series {
    fn new(histogram: Histogram) -> Self {
        Self {
            histogram,
            count: AtomicU64::new(0),
            sum: AtomicU64::new(0f64.to_bits()),
        }
    }

    fn observe(&self, value: f64) {
        self.histogram.record(value);
        self.count.fetch_add(1, Ordering::Relaxed);

        let mut current = self.sum.load(Ordering::Relaxed);
        loop {
            let next = (f64::from_bits(current) + value).to_bits();
            match self
                .sum
                .compare_exchange_weak(current, next, Ordering::Relaxed, Ordering::Relaxed)
            {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }
    }

    fn snapshot(&self) -> SeriesSnapshot {
        SeriesSnapshot {
            count: self.count.load(Ordering::Relaxed),
            sum: f64::from_bits(self.sum.load(Ordering::Relaxed)),
        }
    }
}

/// Histogram collector keyed by label values.
///
/// Created by [`MetricRegistry::resolve`](super::MetricRegistry::resolve);
/// never removed or reset.
pub struct HistogramCollector {
    identity: MetricIdentity,
    full_name: String,
    recorder: Arc<PrometheusRecorder>,
    series: DashMap<Vec<String>, Series>,
}

impl HistogramCollector {
    pub(super) fn new(
        identity: MetricIdentity,
        full_name: String,
        recorder: Arc<PrometheusRecorder>,
    ) -> Self {
        Self {
            identity,
            full_name,
            recorder,
            series: DashMap::new(),
        }
    }

    /// The identity this collector was created for.
    pub fn identity(&self) -> &MetricIdentity {
        &self.identity
    }

    /// Exposed metric name, namespace included.
    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    /// Record `value` for the series identified by `label_values`.
    ///
    /// `label_values` must align with the identity's label names.
    pub fn observe(&self, label_values: &[String], value: f64) -> Result<(), RegistryError> {
        let expected = self.identity.label_names.len();
        if label_values.len() != expected {
            return Err(RegistryError::LabelCardinality {
                metric: self.identity.name.clone(),
                expected,
                actual: label_values.len(),
            });
        }

        if let Some(series) = self.series.get(label_values) {
            series.observe(value);
            return Ok(());
        }

        self.series
            .entry(label_values.to_vec())
            .or_insert_with(|| Series::new(self.register(label_values)))
            .observe(value);
        Ok(())
    }

    /// Count and sum of one series, if it has been observed.
    pub fn snapshot(&self, label_values: &[String]) -> Option<SeriesSnapshot> {
        self.series.get(label_values).map(|s| s.snapshot())
    }

    fn register(&self, label_values: &[String]) -> Histogram {
        let labels: Vec<Label> = self
            .identity
            .label_names
            .iter()
            .zip(label_values)
            .map(|(name, value)| Label::new(name.clone(), value.clone()))
            .collect();
        let key = Key::from_parts(self.full_name.clone(), labels);
        let metadata = Metadata::new(module_path!(), Level::INFO, Some(module_path!()));

        tracing::debug!(
            metric = %self.full_name,
            labels = ?label_values,
            "Registering histogram series"
        );
        self.recorder.register_histogram(&key, &metadata)
    }
}

impl std::fmt::Debug for HistogramCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistogramCollector")
            .field("identity", &self.identity)
            .field("full_name", &self.full_name)
            .field("series", &self.series.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{parse_buckets, MetricRegistry};
    use std::thread;

    #[test]
    fn concurrent_observations_accumulate_exact_sum() {
        let registry = MetricRegistry::new(parse_buckets("1,10").unwrap()).unwrap();
        let collector = registry
            .resolve(&MetricIdentity::new("time", vec!["hostname".into()]))
            .unwrap();
        let values = vec!["srv1".to_string()];

        thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    for _ in 0..1000 {
                        collector.observe(&values, 0.5).unwrap();
                    }
                });
            }
        });

        let snapshot = collector.snapshot(&values).unwrap();
        assert_eq!(snapshot.count, 8000);
        assert_eq!(snapshot.sum, 4000.0);
    }
}
