//! Request instrumentation middleware.
//!
//! # Responsibilities
//! - Read or mint the `x-request-id` correlation id; echo it on the response
//! - Extract an external trace parent and open a SERVER span per request
//! - Maintain the in-flight gauge, request counters, and latency histogram
//! - Emit one structured log line per request with trace and correlation ids
//!
//! # Design Decisions
//! - The correlation id is fixed when the request arrives; nothing downstream
//!   regenerates it
//! - A 4xx answer is the caller's fault: the SERVER span stays OK, only 5xx
//!   marks it as an error

use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderValue, Request};
use axum::middleware::Next;
use axum::response::Response;
use opentelemetry::trace::{FutureExt, SpanKind, Status, TraceContextExt};
use opentelemetry::{Context, KeyValue};
use tracing::Instrument;

use crate::config::ServiceIdentity;
use crate::correlation::{with_correlation_id, CorrelationId, REQUEST_ID_HEADER};
use crate::health::HealthEngine;
use crate::metrics::ServiceMetrics;
use crate::trace::propagation::extract_from_headers;
use crate::trace::span::{start_span, SpanOptions};

/// Shared state for the middleware and the observability routes.
#[derive(Clone)]
pub struct TelemetryState {
    pub metrics: Arc<ServiceMetrics>,
    pub health: Arc<HealthEngine>,
    pub identity: ServiceIdentity,
}

impl TelemetryState {
    pub fn new(
        metrics: Arc<ServiceMetrics>,
        health: Arc<HealthEngine>,
        identity: ServiceIdentity,
    ) -> Self {
        Self {
            metrics,
            health,
            identity,
        }
    }
}

/// Per-request instrumentation; attach with
/// `axum::middleware::from_fn_with_state(state, telemetry_middleware)`.
pub async fn telemetry_middleware(
    State(state): State<TelemetryState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let path = request.uri().path().to_string();

    let correlation_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| CorrelationId::new().to_string());

    let parent = extract_from_headers(request.headers());
    let span = start_span(
        format!("{method} {path}"),
        SpanOptions::new()
            .with_kind(SpanKind::Server)
            .with_parent(parent)
            .with_attributes([
                KeyValue::new("http.request.method", method.clone()),
                KeyValue::new("url.path", path.clone()),
                KeyValue::new("correlation.id", correlation_id.clone()),
                KeyValue::new("service.name", state.identity.name.clone()),
            ]),
    );
    let cx = Context::current_with_span(span);
    let trace_id = cx.span().span_context().trace_id().to_string();
    let span_id = cx.span().span_context().span_id().to_string();

    // Every log record emitted while serving this request inherits these
    // fields through the subscriber's span context.
    let access_span = tracing::info_span!(
        "request",
        trace_id = %trace_id,
        span_id = %span_id,
        correlation_id = %correlation_id,
    );

    state.metrics.active_connections.inc();
    let mut response = with_correlation_id(
        correlation_id.clone(),
        next.run(request)
            .with_context(cx.clone())
            .instrument(access_span),
    )
    .await;
    state.metrics.active_connections.dec();

    let status = response.status().as_u16();
    state.metrics.record_http_request(&method, &path, status, start);

    {
        let span = cx.span();
        span.set_attribute(KeyValue::new(
            "http.response.status_code",
            i64::from(status),
        ));
        if status >= 500 {
            span.set_status(Status::error("server error"));
        } else {
            span.set_status(Status::Ok);
        }
        span.end();
    }

    tracing::info!(
        method = %method,
        path = %path,
        status,
        duration_ms = start.elapsed().as_millis() as u64,
        trace_id = %trace_id,
        span_id = %span_id,
        correlation_id = %correlation_id,
        "request completed"
    );

    if let Ok(value) = HeaderValue::from_str(&correlation_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}
