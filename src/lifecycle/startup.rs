//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the registry and pipeline from validated settings
//! - Bind both listeners before serving anything (fail fast)
//! - Run listener, worker, registry upkeep and HTTP server until shutdown

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use crate::config::Settings;
use crate::http::HttpServer;
use crate::lifecycle::{signals, Shutdown};
use crate::pipeline::Pipeline;
use crate::registry::{MetricRegistry, RegistryError};
use crate::syslog::{ListenerError, SyslogListener};

/// How often pending histogram samples are folded in between scrapes.
const UPKEEP_INTERVAL: Duration = Duration::from_secs(5);

/// Fatal errors raised before or while serving.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Syslog(#[from] ListenerError),
    #[error("failed to bind HTTP listener on {address}: {source}")]
    HttpBind {
        address: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    #[error("HTTP server failed: {0}")]
    Serve(#[source] std::io::Error),
    #[error("failed to install signal handler: {0}")]
    Signal(#[source] std::io::Error),
}

/// A fully bound exporter, ready to run.
pub struct Exporter {
    registry: Arc<MetricRegistry>,
    pipeline: Pipeline,
    syslog: SyslogListener,
    http: HttpServer,
    http_listener: TcpListener,
    queue_capacity: usize,
}

impl Exporter {
    /// Build every subsystem and bind both listeners.
    pub async fn bind(settings: &Settings) -> Result<Self, StartupError> {
        let registry = Arc::new(MetricRegistry::new(settings.buckets.clone())?);
        let pipeline = Pipeline::new(Arc::clone(&registry), settings.syslog_tag.clone());

        let syslog = SyslogListener::bind(&settings.syslog_address).await?;

        let http_listener = TcpListener::bind(settings.web_address)
            .await
            .map_err(|source| StartupError::HttpBind {
                address: settings.web_address,
                source,
            })?;
        let http = HttpServer::new(Arc::clone(&registry), &settings.telemetry_path);

        tracing::info!(
            web_address = %settings.web_address,
            telemetry_path = %settings.telemetry_path,
            syslog_address = %settings.syslog_address,
            buckets = ?registry.buckets(),
            "Exporter bound"
        );

        Ok(Self {
            registry,
            pipeline,
            syslog,
            http,
            http_listener,
            queue_capacity: settings.queue_capacity,
        })
    }

    /// Bound HTTP address.
    pub fn http_addr(&self) -> std::io::Result<SocketAddr> {
        self.http_listener.local_addr()
    }

    /// Bound UDP syslog address, if not using a unix socket.
    pub fn syslog_addr(&self) -> Option<SocketAddr> {
        self.syslog.local_addr()
    }

    /// Serve until `shutdown` fires or the HTTP server fails.
    pub async fn run(self, shutdown: &Shutdown) -> Result<(), StartupError> {
        let (tx, rx) = mpsc::channel(self.queue_capacity);

        let listener_task = tokio::spawn(self.syslog.run(tx, shutdown.subscribe()));
        let pipeline_task = tokio::spawn(self.pipeline.run(rx, shutdown.subscribe()));
        let upkeep_task = tokio::spawn(self.registry.maintain(UPKEEP_INTERVAL, shutdown.subscribe()));

        let served = self.http.run(self.http_listener, shutdown.subscribe()).await;

        shutdown.trigger();
        let _ = listener_task.await;
        let _ = pipeline_task.await;
        let _ = upkeep_task.await;

        served.map_err(StartupError::Serve)
    }
}

/// Bind, serve, and stop on SIGTERM/SIGINT.
pub async fn run(settings: &Settings) -> Result<(), StartupError> {
    let exporter = Exporter::bind(settings).await?;
    let shutdown = Shutdown::new();

    let trigger = shutdown.clone();
    let signal_task = tokio::spawn(async move {
        let result = signals::wait_for_termination().await;
        if let Ok(name) = result {
            tracing::info!(signal = name, "Received signal, terminating");
        }
        trigger.trigger();
        result
    });

    exporter.run(&shutdown).await?;

    if signal_task.is_finished() {
        if let Ok(Err(e)) = signal_task.await {
            return Err(StartupError::Signal(e));
        }
    } else {
        signal_task.abort();
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
