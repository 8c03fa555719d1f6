//! Observability endpoints.
//!
//! - `GET /metrics`: Prometheus text exposition
//! - `GET /health`: full report, always 200
//! - `GET /health/live`: process-alive, always 200
//! - `GET /health/ready`: full report, 503 iff unhealthy

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};

use crate::health::ServiceStatus;
use crate::http::middleware::TelemetryState;

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

/// Router exposing the scrape and probe endpoints; merge into the service's
/// main router.
pub fn observability_router(state: TelemetryState) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_handler))
        .route("/health/live", get(liveness_handler))
        .route("/health/ready", get(readiness_handler))
        .with_state(state)
}

async fn metrics_handler(State(state): State<TelemetryState>) -> Response {
    match state.metrics.render() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)],
            body,
        )
            .into_response(),
        Err(err) => {
            tracing::error!(error = %err, "metrics rendering failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics unavailable").into_response()
        }
    }
}

async fn health_handler(State(state): State<TelemetryState>) -> Response {
    let report = state.health.health().await;
    (StatusCode::OK, Json(report)).into_response()
}

async fn liveness_handler(State(state): State<TelemetryState>) -> Response {
    (StatusCode::OK, Json(state.health.liveness())).into_response()
}

async fn readiness_handler(State(state): State<TelemetryState>) -> Response {
    let report = state.health.readiness().await;
    let status = match report.status {
        ServiceStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        ServiceStatus::Healthy | ServiceStatus::Degraded => StatusCode::OK,
    };
    (status, Json(report)).into_response()
}
