//! HTTP endpoint for Prometheus scraping and liveness probes

use std::net::SocketAddr;

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use tracing::{error, info};

use hello_common::OperatorMetrics;

/// Content type of the Prometheus text exposition format
const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Routes served by the metrics server
pub fn router(metrics: OperatorMetrics) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/healthz", get(|| async { "ok" }))
        .with_state(metrics)
}

/// Bind `addr` and serve until the process exits
pub async fn serve(addr: SocketAddr, metrics: OperatorMetrics) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| anyhow::anyhow!("failed to bind metrics server on {}: {}", addr, e))?;

    info!(%addr, "Starting metrics server");
    axum::serve(listener, router(metrics))
        .await
        .map_err(|e| anyhow::anyhow!("metrics server error: {}", e))
}

async fn metrics_handler(State(metrics): State<OperatorMetrics>) -> Response {
    match metrics.render() {
        Ok(body) => ([(header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)], body).into_response(),
        Err(e) => {
            error!(error = %e, "failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}
