//! Tests for the traced outbound HTTP client against real TCP backends.

use std::sync::Once;
use std::time::Duration;

use opentelemetry_sdk::trace::SdkTracerProvider;

use beacon::{with_correlation_id, ServiceIdentity, TracedClient};

mod common;

static INIT: Once = Once::new();

/// A real tracer provider is needed so client spans carry valid contexts for
/// header injection; no exporter is attached.
fn init_tracing() {
    INIT.call_once(|| {
        opentelemetry::global::set_tracer_provider(SdkTracerProvider::builder().build());
        beacon::trace::propagation::init_propagator();
    });
}

fn client() -> TracedClient {
    TracedClient::new(ServiceIdentity::new("orders", "1.0.0")).unwrap()
}

#[tokio::test]
async fn get_injects_trace_and_correlation_headers() {
    init_tracing();
    let backend = common::start_mock_backend(200, "pong").await;

    let response = with_correlation_id("req-777".to_string(), async {
        client().get(&backend.url("/ping")).await
    })
    .await
    .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let heads = backend.request_heads();
    let head = heads.first().expect("backend saw the request").to_lowercase();
    assert!(head.starts_with("get /ping"));
    assert!(head.contains("traceparent: 00-"), "missing traceparent in: {head}");
    assert!(head.contains("x-request-id: req-777"), "missing request id in: {head}");
}

#[tokio::test]
async fn no_correlation_scope_means_no_request_id_header() {
    init_tracing();
    let backend = common::start_mock_backend(200, "pong").await;

    client().get(&backend.url("/ping")).await.unwrap();

    let heads = backend.request_heads();
    let head = heads.first().unwrap().to_lowercase();
    assert!(!head.contains("x-request-id"));
}

#[tokio::test]
async fn server_error_statuses_are_returned_not_raised() {
    init_tracing();
    let backend = common::start_mock_backend(500, "boom").await;

    let response = client().get(&backend.url("/explode")).await.unwrap();
    assert_eq!(response.status().as_u16(), 500);
}

#[tokio::test]
async fn deadline_surfaces_the_original_transport_error() {
    init_tracing();
    let backend =
        common::start_mock_backend_with_delay(200, "late", Duration::from_secs(5)).await;

    let client = TracedClient::with_timeout(
        ServiceIdentity::new("orders", "1.0.0"),
        Duration::from_millis(200),
    )
    .unwrap();

    let err = client.get(&backend.url("/slow")).await.unwrap_err();
    assert!(err.is_timeout(), "expected timeout, got: {err}");
}

#[tokio::test]
async fn connection_refused_is_returned_unchanged() {
    init_tracing();
    // Bind then drop to get a port nothing listens on.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = client()
        .get(&format!("http://{addr}/nope"))
        .await
        .unwrap_err();
    assert!(err.is_connect() || err.is_request());
}

#[tokio::test]
async fn post_sends_json_body() {
    init_tracing();
    let backend = common::start_mock_backend(200, "ok").await;

    client()
        .post(&backend.url("/orders"), &serde_json::json!({ "sku": "A-1" }))
        .await
        .unwrap();

    let heads = backend.request_heads();
    let head = heads.first().unwrap().to_lowercase();
    assert!(head.starts_with("post /orders"));
    assert!(head.contains("content-type: application/json"));
}
