//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the landing page and telemetry handler
//! - Wire up request tracing
//! - Serve until shutdown fires

use axum::{
    extract::State,
    http::header,
    response::{Html, IntoResponse},
    routing::get,
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::lifecycle::ShutdownSignal;
use crate::registry::MetricRegistry;

const APPLICATION_NAME: &str = "Nginx Request Exporter";
const EXPOSITION_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<MetricRegistry>,
    pub telemetry_path: Arc<str>,
}

/// HTTP server exposing the registry.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a new HTTP server serving `registry` under `telemetry_path`.
    pub fn new(registry: Arc<MetricRegistry>, telemetry_path: &str) -> Self {
        let state = AppState {
            registry,
            telemetry_path: Arc::from(telemetry_path),
        };
        Self {
            router: Self::build_router(telemetry_path, state),
        }
    }

    fn build_router(telemetry_path: &str, state: AppState) -> Router {
        Router::new()
            .route(telemetry_path, get(metrics_handler))
            .route("/", get(landing_handler))
            .with_state(state)
            .layer(TraceLayer::new_for_http())
    }

    /// The configured router, for embedding or testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server on `listener` until shutdown is signalled.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: ShutdownSignal,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                shutdown.recv().await;
                tracing::info!("HTTP server received shutdown signal");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, EXPOSITION_CONTENT_TYPE)],
        state.registry.render(),
    )
}

async fn landing_handler(State(state): State<AppState>) -> Html<String> {
    Html(format!(
        "<html><head>\n<title>{APPLICATION_NAME}</title>\n</head><body>\n\
         <h1>{APPLICATION_NAME}</h1>\n\
         <p><a href='{path}'>Metrics</a></p>\n\
         </body></html>",
        path = state.telemetry_path
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{parse_buckets, MetricIdentity};
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn server() -> (HttpServer, Arc<MetricRegistry>) {
        let registry = Arc::new(MetricRegistry::new(parse_buckets("0.5,2.5").unwrap()).unwrap());
        (HttpServer::new(Arc::clone(&registry), "/metrics"), registry)
    }

    async fn get_body(router: Router, uri: &str) -> (StatusCode, String, Option<String>) {
        let response = router
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .map(|v| v.to_str().unwrap().to_string());
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap(), content_type)
    }

    #[tokio::test]
    async fn landing_page_links_to_metrics() {
        let (server, _) = server();
        let (status, body, _) = get_body(server.router(), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("<title>Nginx Request Exporter</title>"));
        assert!(body.contains("<a href='/metrics'>Metrics</a>"));
    }

    #[tokio::test]
    async fn metrics_endpoint_renders_registry() {
        let (server, registry) = server();
        registry
            .resolve(&MetricIdentity::new("time", vec!["hostname".into()]))
            .unwrap()
            .observe(&["srv1".to_string()], 1.5)
            .unwrap();

        let (status, body, content_type) = get_body(server.router(), "/metrics").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type.as_deref(), Some(EXPOSITION_CONTENT_TYPE));
        assert!(body.contains("nginx_request_time_bucket{hostname=\"srv1\",le=\"2.5\"} 1"));
    }

    #[tokio::test]
    async fn unknown_path_is_not_found() {
        let (server, _) = server();
        let (status, _, _) = get_body(server.router(), "/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
