//! Single-consumer worker feeding parsed lines into the registry.

use metrics::Counter;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::lifecycle::ShutdownSignal;
use crate::parser::{self, ParseError};
use crate::registry::{MetricIdentity, MetricRegistry};
use crate::syslog::SyslogMessage;

/// Syslog tag Nginx uses unless `tag=` is set in `access_log`.
pub const DEFAULT_SYSLOG_TAG: &str = "nginx";

/// Reason a whole message was dropped.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Rejection {
    #[error("unexpected syslog tag {0:?}")]
    WrongTag(String),
    #[error("hostname missing in syslog message")]
    MissingHostname,
    #[error("empty syslog message")]
    EmptyContent,
    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Result of processing one message.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Message accepted; `dropped` metrics hit a registry error.
    Observed { observed: usize, dropped: usize },
    /// Message rejected and counted as a parse failure.
    Rejected(Rejection),
}

/// Observation pipeline.
pub struct Pipeline {
    registry: Arc<MetricRegistry>,
    expected_tag: String,
    messages: Counter,
    parse_failures: Counter,
}

impl Pipeline {
    /// Create a pipeline and register its two fixed counters.
    pub fn new(registry: Arc<MetricRegistry>, expected_tag: impl Into<String>) -> Self {
        let messages = registry.counter(
            "exporter_syslog_messages",
            "Current total syslog messages received.",
        );
        let parse_failures = registry.counter(
            "exporter_syslog_parse_failure",
            "Number of errors while parsing syslog messages.",
        );

        Self {
            registry,
            expected_tag: expected_tag.into(),
            messages,
            parse_failures,
        }
    }

    /// Process one message synchronously.
    pub fn process(&self, message: &SyslogMessage) -> Outcome {
        self.messages.increment(1);

        match self.observe(message) {
            Ok(outcome) => outcome,
            Err(rejection) => {
                tracing::warn!(
                    hostname = %message.hostname,
                    tag = %message.tag,
                    error = %rejection,
                    "Dropping syslog message"
                );
                self.parse_failures.increment(1);
                Outcome::Rejected(rejection)
            }
        }
    }

    fn observe(&self, message: &SyslogMessage) -> Result<Outcome, Rejection> {
        if message.tag != self.expected_tag {
            return Err(Rejection::WrongTag(message.tag.clone()));
        }
        if message.hostname.is_empty() {
            return Err(Rejection::MissingHostname);
        }
        if message.content.trim().is_empty() {
            return Err(Rejection::EmptyContent);
        }

        let line = parser::parse(&message.content)?;
        let label_names = line.labels.names().to_vec();
        let mut observed = 0;
        let mut dropped = 0;

        for metric in &line.metrics {
            let identity = MetricIdentity::new(metric.name.as_str(), label_names.clone());
            let result = self
                .registry
                .resolve(&identity)
                .and_then(|collector| collector.observe(line.labels.values(), metric.value));

            match result {
                Ok(()) => observed += 1,
                Err(e) => {
                    tracing::error!(
                        hostname = %message.hostname,
                        metric = %metric.name,
                        error = %e,
                        "Dropping metric"
                    );
                    dropped += 1;
                }
            }
        }

        Ok(Outcome::Observed { observed, dropped })
    }

    /// Drain the queue until shutdown or until every sender is gone.
    ///
    /// Messages still queued at shutdown are not processed.
    pub async fn run(self, mut rx: mpsc::Receiver<SyslogMessage>, mut shutdown: ShutdownSignal) {
        tracing::info!(tag = %self.expected_tag, "Observation pipeline starting");

        loop {
            tokio::select! {
                message = rx.recv() => match message {
                    Some(message) => {
                        self.process(&message);
                    }
                    None => {
                        tracing::info!("Message queue closed, pipeline exiting");
                        break;
                    }
                },
                _ = shutdown.recv() => {
                    tracing::info!(pending = rx.len(), "Pipeline received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::Shutdown;
    use crate::registry::parse_buckets;

    fn pipeline() -> (Pipeline, Arc<MetricRegistry>) {
        let registry = Arc::new(MetricRegistry::new(parse_buckets(".1,.5,1").unwrap()).unwrap());
        (Pipeline::new(Arc::clone(&registry), DEFAULT_SYSLOG_TAG), registry)
    }

    fn message(tag: &str, hostname: &str, content: &str) -> SyslogMessage {
        SyslogMessage {
            tag: tag.into(),
            hostname: hostname.into(),
            content: content.into(),
            ..SyslogMessage::default()
        }
    }

    fn scrape(text: &str, series: &str) -> f64 {
        text.lines()
            .find_map(|line| line.strip_prefix(series)?.strip_prefix(' '))
            .map(|v| v.trim().parse().unwrap())
            .unwrap_or(0.0)
    }

    #[test]
    fn observes_every_metric_of_a_line() {
        let (pipeline, registry) = pipeline();
        let outcome = pipeline.process(&message(
            "nginx",
            "srv1",
            "time:0.25 upstream_time:0.2 status=200 hostname=srv1",
        ));
        assert_eq!(outcome, Outcome::Observed { observed: 2, dropped: 0 });

        let values = vec!["200".to_string(), "srv1".to_string()];
        let time = registry.get("time").unwrap();
        assert_eq!(time.identity().label_names, ["status", "hostname"]);
        assert_eq!(time.snapshot(&values).unwrap().sum, 0.25);
        assert_eq!(registry.get("upstream_time").unwrap().snapshot(&values).unwrap().count, 1);
    }

    #[test]
    fn duplicate_metric_names_are_separate_observations() {
        let (pipeline, registry) = pipeline();
        pipeline.process(&message("nginx", "srv1", "t:1 t:2 hostname=srv1"));

        let snapshot = registry.get("t").unwrap().snapshot(&["srv1".to_string()]).unwrap();
        assert_eq!(snapshot.count, 2);
        assert_eq!(snapshot.sum, 3.0);
    }

    #[test]
    fn transport_checks_reject_before_parsing() {
        let (pipeline, registry) = pipeline();

        assert_eq!(
            pipeline.process(&message("apache", "srv1", "t:1 hostname=srv1")),
            Outcome::Rejected(Rejection::WrongTag("apache".into()))
        );
        assert_eq!(
            pipeline.process(&message("nginx", "", "t:1 hostname=srv1")),
            Outcome::Rejected(Rejection::MissingHostname)
        );
        assert_eq!(
            pipeline.process(&message("nginx", "srv1", "")),
            Outcome::Rejected(Rejection::EmptyContent)
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn parse_errors_are_rejections() {
        let (pipeline, _) = pipeline();
        assert_eq!(
            pipeline.process(&message("nginx", "srv1", "t:abc hostname=srv1")),
            Outcome::Rejected(Rejection::Parse(ParseError::InvalidMetricValue("t".into())))
        );
    }

    #[test]
    fn conflict_drops_only_the_conflicting_metric() {
        let (pipeline, registry) = pipeline();
        pipeline.process(&message("nginx", "srv1", "a:1 hostname=srv1"));

        let outcome = pipeline.process(&message("nginx", "srv1", "a:1 b:2 status=200 hostname=srv1"));
        assert_eq!(outcome, Outcome::Observed { observed: 1, dropped: 1 });
        assert!(registry.get("b").is_some());

        let text = registry.render();
        assert_eq!(scrape(&text, "nginx_request_exporter_syslog_messages"), 2.0);
        assert_eq!(scrape(&text, "nginx_request_exporter_syslog_parse_failure"), 0.0);
    }

    #[test]
    fn colliding_names_never_reach_the_exposition() {
        let (pipeline, registry) = pipeline();

        let outcome = pipeline.process(&message(
            "nginx",
            "srv1",
            "exporter_syslog_messages:0.3 t:0.3 hostname=srv1",
        ));
        assert_eq!(outcome, Outcome::Observed { observed: 1, dropped: 1 });

        let outcome = pipeline.process(&message("nginx", "srv1", "u:0.3 le=x hostname=srv1"));
        assert_eq!(outcome, Outcome::Observed { observed: 0, dropped: 1 });
        assert!(registry.get("u").is_none());

        let text = registry.render();
        assert_eq!(text.matches("# TYPE nginx_request_exporter_syslog_messages ").count(), 1);
        assert!(text.contains("# TYPE nginx_request_exporter_syslog_messages counter"));
        assert!(!text.contains("le=\"x\""));
        assert_eq!(scrape(&text, "nginx_request_exporter_syslog_parse_failure"), 0.0);
        assert_eq!(scrape(&text, "nginx_request_t_count{hostname=\"srv1\"}"), 1.0);
    }

    #[test]
    fn counters_track_received_and_failed() {
        let (pipeline, registry) = pipeline();
        let messages = [
            message("nginx", "srv1", "t:1 hostname=srv1"),
            message("other", "srv1", "t:1 hostname=srv1"),
            message("nginx", "srv1", "  "),
            message("nginx", "srv1", "t:1 bogus hostname=srv1"),
            message("nginx", "srv1", "status=200 hostname=srv1"),
            message("nginx", "srv1", "t:2 hostname=srv2"),
        ];
        for m in &messages {
            pipeline.process(m);
        }

        let text = registry.render();
        assert_eq!(scrape(&text, "nginx_request_exporter_syslog_messages"), 6.0);
        assert_eq!(scrape(&text, "nginx_request_exporter_syslog_parse_failure"), 3.0);
        assert_eq!(scrape(&text, "nginx_request_t_count{hostname=\"srv2\"}"), 1.0);
    }

    #[tokio::test]
    async fn run_drains_queue_until_closed() {
        let (pipeline, registry) = pipeline();
        let (tx, rx) = mpsc::channel(16);
        let shutdown = Shutdown::new();

        for i in 0..5 {
            tx.send(message("nginx", "srv1", &format!("t:{i} hostname=srv1")))
                .await
                .unwrap();
        }
        drop(tx);

        pipeline.run(rx, shutdown.subscribe()).await;

        let snapshot = registry.get("t").unwrap().snapshot(&["srv1".to_string()]).unwrap();
        assert_eq!(snapshot.count, 5);
        assert_eq!(snapshot.sum, 10.0);
    }

    #[tokio::test]
    async fn run_stops_on_shutdown() {
        let (pipeline, _) = pipeline();
        let (_tx, rx) = mpsc::channel::<SyslogMessage>(16);
        let shutdown = Shutdown::new();

        let task = tokio::spawn(pipeline.run(rx, shutdown.subscribe()));
        shutdown.trigger();
        task.await.unwrap();
    }
}
