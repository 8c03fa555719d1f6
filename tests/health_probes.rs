//! Health check factories probed against real TCP backends.

use std::time::Duration;

use beacon::health::{disk_space_check, http_check, CheckStatus, ServiceStatus};
use beacon::{HealthEngine, ServiceIdentity};

mod common;

fn engine() -> HealthEngine {
    HealthEngine::new(ServiceIdentity::new("orders-api", "1.0.0"))
}

#[tokio::test]
async fn http_check_passes_on_success() {
    let backend = common::start_mock_backend(200, "ok").await;
    let engine = engine();
    engine.register(http_check(
        "upstream",
        backend.url("/healthz"),
        Duration::from_secs(2),
    ));

    let report = engine.health().await;
    assert_eq!(report.status, ServiceStatus::Healthy);
    assert_eq!(report.checks[0].status, CheckStatus::Pass);
    assert_eq!(report.checks[0].component_type, "http");
}

#[tokio::test]
async fn http_check_warns_on_4xx_and_fails_on_5xx() {
    let missing = common::start_mock_backend(404, "nope").await;
    let broken = common::start_mock_backend(500, "boom").await;
    let engine = engine();
    engine.register(http_check(
        "missing",
        missing.url("/healthz"),
        Duration::from_secs(2),
    ));
    engine.register(http_check(
        "broken",
        broken.url("/healthz"),
        Duration::from_secs(2),
    ));

    let report = engine.health().await;
    assert_eq!(report.status, ServiceStatus::Unhealthy);
    let missing = report.checks.iter().find(|c| c.name == "missing").unwrap();
    let broken = report.checks.iter().find(|c| c.name == "broken").unwrap();
    assert_eq!(missing.status, CheckStatus::Warn);
    assert_eq!(broken.status, CheckStatus::Fail);
}

#[tokio::test]
async fn http_check_fails_when_unreachable() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let engine = engine();
    engine.register(http_check(
        "gone",
        format!("http://{addr}/healthz"),
        Duration::from_millis(500),
    ));

    let report = engine.health().await;
    assert_eq!(report.status, ServiceStatus::Unhealthy);
    assert!(report.checks[0]
        .message
        .as_deref()
        .unwrap()
        .contains("unreachable"));
}

#[tokio::test]
async fn disk_check_reports_an_observed_ratio() {
    let engine = engine();
    // A zero floor can never trip; this exercises the probe itself.
    engine.register(disk_space_check("rootfs", "/", 0.0));

    let report = engine.health().await;
    let check = &report.checks[0];
    assert_eq!(check.status, CheckStatus::Pass);
    let ratio = check.observed_value.as_ref().unwrap()["freeRatio"]
        .as_f64()
        .unwrap();
    assert!((0.0..=1.0).contains(&ratio));
}
