//! Process-wide collector table and Prometheus recorder.

use dashmap::{DashMap, DashSet};
use metrics::{Counter, Key, KeyName, Level, Metadata, Recorder, SharedString};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle, PrometheusRecorder};
use std::sync::Arc;
use std::time::Duration;
use tokio::time;

use super::{HistogramCollector, MetricIdentity, RegistryError};
use crate::lifecycle::ShutdownSignal;

/// Prefix applied to every exposed metric name.
pub const NAMESPACE: &str = "nginx_request";

/// Label name the exposition format reserves for histogram buckets.
const BUCKET_LABEL: &str = "le";

fn is_valid_metric_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_' || c == ':')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
}

fn is_valid_label_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !name.starts_with("__")
        && name != BUCKET_LABEL
}

/// Parse a comma-separated bucket list such as `".005,.01,.025"`.
///
/// Entries are trimmed. The result must be non-empty, finite and strictly
/// increasing.
pub fn parse_buckets(raw: &str) -> Result<Vec<f64>, RegistryError> {
    let mut buckets = Vec::new();
    for entry in raw.split(',') {
        let entry = entry.trim();
        let bucket: f64 = entry
            .parse()
            .map_err(|_| RegistryError::InvalidBuckets(format!("not a number: {entry:?}")))?;
        if !bucket.is_finite() {
            return Err(RegistryError::InvalidBuckets(format!("not finite: {entry:?}")));
        }
        if let Some(&last) = buckets.last() {
            if bucket <= last {
                return Err(RegistryError::InvalidBuckets(format!(
                    "{bucket} does not follow {last}"
                )));
            }
        }
        buckets.push(bucket);
    }
    Ok(buckets)
}

/// Registry of dynamically created histogram collectors.
///
/// Collectors are keyed by metric name; the label-name sequence stored with
/// each collector is checked on every resolve. Names taken by the fixed
/// counters are never handed out as histograms.
pub struct MetricRegistry {
    collectors: DashMap<String, Arc<HistogramCollector>>,
    reserved: DashSet<String>,
    recorder: Arc<PrometheusRecorder>,
    handle: PrometheusHandle,
    buckets: Vec<f64>,
}

impl MetricRegistry {
    /// Create an empty registry applying `buckets` to every histogram.
    pub fn new(buckets: Vec<f64>) -> Result<Self, RegistryError> {
        let recorder = PrometheusBuilder::new()
            .set_buckets(&buckets)
            .map_err(|e| RegistryError::InvalidBuckets(e.to_string()))?
            .build_recorder();
        let handle = recorder.handle();

        Ok(Self {
            collectors: DashMap::new(),
            reserved: DashSet::new(),
            recorder: Arc::new(recorder),
            handle,
            buckets,
        })
    }

    /// Return the collector for `identity`, creating it on first use.
    ///
    /// Concurrent callers racing on the same identity all receive the same
    /// collector: the first to publish wins, the others drop their fresh
    /// instance and adopt the published one.
    ///
    /// Names that would render invalid exposition text are refused before
    /// anything reaches the recorder.
    pub fn resolve(&self, identity: &MetricIdentity) -> Result<Arc<HistogramCollector>, RegistryError> {
        if let Some(existing) = self.collectors.get(&identity.name) {
            return Self::adopt(existing.value(), identity);
        }

        self.check_names(identity)?;

        let fresh = Arc::new(HistogramCollector::new(
            identity.clone(),
            self.full_name(&identity.name),
            Arc::clone(&self.recorder),
        ));

        let published = self
            .collectors
            .entry(identity.name.clone())
            .or_insert_with(|| Arc::clone(&fresh))
            .value()
            .clone();

        if Arc::ptr_eq(&published, &fresh) {
            self.describe(&published);
            tracing::info!(
                metric = %published.full_name(),
                labels = ?identity.label_names,
                "Registered histogram collector"
            );
            Ok(published)
        } else {
            tracing::debug!(metric = %identity.name, "Adopted concurrently registered collector");
            Self::adopt(&published, identity)
        }
    }

    fn check_names(&self, identity: &MetricIdentity) -> Result<(), RegistryError> {
        if !is_valid_metric_name(&identity.name) {
            return Err(RegistryError::InvalidMetricName(identity.name.clone()));
        }
        if let Some(label) = identity.label_names.iter().find(|l| !is_valid_label_name(l)) {
            return Err(RegistryError::InvalidLabelName {
                metric: identity.name.clone(),
                label: label.clone(),
            });
        }
        let full_name = self.full_name(&identity.name);
        if self.reserved.contains(&full_name) {
            return Err(RegistryError::ReservedName(full_name));
        }
        Ok(())
    }

    fn adopt(
        existing: &Arc<HistogramCollector>,
        identity: &MetricIdentity,
    ) -> Result<Arc<HistogramCollector>, RegistryError> {
        let registered = &existing.identity().label_names;
        if *registered != identity.label_names {
            return Err(RegistryError::LabelSetConflict {
                metric: identity.name.clone(),
                registered: registered.clone(),
                requested: identity.label_names.clone(),
            });
        }
        Ok(Arc::clone(existing))
    }

    fn describe(&self, collector: &HistogramCollector) {
        self.recorder.describe_histogram(
            KeyName::from(collector.full_name().to_string()),
            None,
            SharedString::from(format!(
                "Nginx request log value for {}",
                collector.identity().name
            )),
        );
    }

    /// Register a plain counter under the registry's namespace.
    ///
    /// Its name is reserved from then on; register counters before ingestion
    /// starts.
    pub fn counter(&self, name: &str, help: &'static str) -> Counter {
        let full_name = self.full_name(name);
        self.reserved.insert(full_name.clone());
        self.recorder.describe_counter(
            KeyName::from(full_name.clone()),
            None,
            SharedString::from(help),
        );
        let metadata = Metadata::new(module_path!(), Level::INFO, Some(module_path!()));
        self.recorder.register_counter(&Key::from_name(full_name), &metadata)
    }

    /// Look up an existing collector without creating one.
    pub fn get(&self, name: &str) -> Option<Arc<HistogramCollector>> {
        self.collectors.get(name).map(|c| Arc::clone(c.value()))
    }

    /// Number of registered collectors.
    pub fn len(&self) -> usize {
        self.collectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collectors.is_empty()
    }

    /// Bucket boundaries applied to every histogram.
    pub fn buckets(&self) -> &[f64] {
        &self.buckets
    }

    /// Render all collectors and counters in the Prometheus text format.
    pub fn render(&self) -> String {
        self.handle.render()
    }

    /// Fold pending histogram samples into their summaries.
    ///
    /// Scrapes do this as a side effect; without scrapes samples pile up.
    pub fn run_upkeep(&self) {
        self.handle.run_upkeep();
    }

    /// Run upkeep every `period` until shutdown.
    pub async fn maintain(self: Arc<Self>, period: Duration, mut shutdown: ShutdownSignal) {
        tracing::debug!(period_secs = period.as_secs_f64(), "Registry upkeep starting");
        let mut ticker = time::interval(period);

        loop {
            tokio::select! {
                _ = ticker.tick() => self.run_upkeep(),
                _ = shutdown.recv() => {
                    tracing::debug!("Registry upkeep received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    fn full_name(&self, name: &str) -> String {
        format!("{NAMESPACE}_{name}")
    }
}

impl std::fmt::Debug for MetricRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricRegistry")
            .field("collectors", &self.collectors.len())
            .field("buckets", &self.buckets)
            .finish()
    }
}
