//! Health aggregation engine.
//!
//! # Responsibilities
//! - Hold the registered checks for a service
//! - Run every check per probe, concurrently, and time each one
//! - Reduce individual results into a single service status
//!
//! # Design Decisions
//! - fail > warn > pass; the worst individual result wins, so the aggregate
//!   is independent of registration and completion order
//! - A panicking check is a failing check, never a failing probe
//! - Nothing is cached; every invocation reflects the state at call time

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, RwLock};
use std::time::Instant;

use serde::Serialize;

use crate::config::ServiceIdentity;

/// Severity of one check, ordered so the worst result can be taken with `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
}

/// Aggregate status over all checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl From<CheckStatus> for ServiceStatus {
    fn from(status: CheckStatus) -> Self {
        match status {
            CheckStatus::Pass => Self::Healthy,
            CheckStatus::Warn => Self::Degraded,
            CheckStatus::Fail => Self::Unhealthy,
        }
    }
}

/// What a check function reports back.
#[derive(Debug, Clone)]
pub struct CheckOutput {
    pub status: CheckStatus,
    pub message: Option<String>,
    pub observed_value: Option<serde_json::Value>,
}

impl CheckOutput {
    pub fn pass() -> Self {
        Self {
            status: CheckStatus::Pass,
            message: None,
            observed_value: None,
        }
    }

    pub fn warn(message: impl Into<String>) -> Self {
        Self {
            status: CheckStatus::Warn,
            message: Some(message.into()),
            observed_value: None,
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            status: CheckStatus::Fail,
            message: Some(message.into()),
            observed_value: None,
        }
    }

    pub fn with_observed_value(mut self, value: serde_json::Value) -> Self {
        self.observed_value = Some(value);
        self
    }
}

pub type CheckFuture = Pin<Box<dyn Future<Output = CheckOutput> + Send>>;
type CheckFn = Arc<dyn Fn() -> CheckFuture + Send + Sync>;

/// A named, typed health check ready for registration.
#[derive(Clone)]
pub struct Check {
    name: String,
    component_type: String,
    run: CheckFn,
}

impl Check {
    pub fn new<F, Fut>(
        name: impl Into<String>,
        component_type: impl Into<String>,
        check: F,
    ) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CheckOutput> + Send + 'static,
    {
        Self {
            name: name.into(),
            component_type: component_type.into(),
            run: Arc::new(move || Box::pin(check())),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// One check's contribution to a health report.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub component_type: String,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_value: Option<serde_json::Value>,
}

/// Full readiness/health report.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub status: ServiceStatus,
    pub timestamp: String,
    pub service: String,
    pub version: String,
    pub uptime_secs: u64,
    pub checks: Vec<CheckResult>,
}

/// Process-alive answer; deliberately touches no dependencies.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LivenessReport {
    pub status: &'static str,
    pub timestamp: String,
}

/// Engine holding the service's checks.
pub struct HealthEngine {
    identity: ServiceIdentity,
    started: Instant,
    checks: RwLock<Vec<Check>>,
}

impl HealthEngine {
    pub fn new(identity: ServiceIdentity) -> Self {
        Self {
            identity,
            started: Instant::now(),
            checks: RwLock::new(Vec::new()),
        }
    }

    /// Register a check. Safe at any point, including between probes.
    pub fn register(&self, check: Check) {
        let mut checks = self.checks.write().unwrap_or_else(|e| e.into_inner());
        checks.push(check);
    }

    /// Register a bare closure as a check.
    pub fn register_fn<F, Fut>(
        &self,
        name: impl Into<String>,
        component_type: impl Into<String>,
        check: F,
    ) where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = CheckOutput> + Send + 'static,
    {
        self.register(Check::new(name, component_type, check));
    }

    /// Process-alive answer. Runs no checks.
    pub fn liveness(&self) -> LivenessReport {
        LivenessReport {
            status: "ok",
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Run every registered check and reduce into an aggregate status.
    pub async fn health(&self) -> HealthReport {
        let snapshot: Vec<Check> = {
            let checks = self.checks.read().unwrap_or_else(|e| e.into_inner());
            checks.clone()
        };

        let mut handles = Vec::with_capacity(snapshot.len());
        for check in snapshot {
            let run = Arc::clone(&check.run);
            let handle = tokio::spawn(async move {
                let start = Instant::now();
                let output = run().await;
                (output, start.elapsed())
            });
            handles.push((check.name, check.component_type, handle));
        }

        let mut results = Vec::with_capacity(handles.len());
        for (name, component_type, handle) in handles {
            let result = match handle.await {
                Ok((output, elapsed)) => CheckResult {
                    name,
                    status: output.status,
                    component_type,
                    duration_ms: elapsed.as_millis() as u64,
                    message: output.message,
                    observed_value: output.observed_value,
                },
                Err(join_err) => {
                    tracing::error!(check = %name, error = %join_err, "health check panicked");
                    CheckResult {
                        name,
                        status: CheckStatus::Fail,
                        component_type,
                        duration_ms: 0,
                        message: Some(format!("check aborted: {join_err}")),
                        observed_value: None,
                    }
                }
            };
            results.push(result);
        }

        let worst = results
            .iter()
            .map(|r| r.status)
            .max()
            .unwrap_or(CheckStatus::Pass);

        HealthReport {
            status: worst.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            service: self.identity.name.clone(),
            version: self.identity.version.clone(),
            uptime_secs: self.started.elapsed().as_secs(),
            checks: results,
        }
    }

    /// Readiness is the same probe as [`health`](Self::health); the transport
    /// layer differs only in how it maps the aggregate onto a status code.
    pub async fn readiness(&self) -> HealthReport {
        self.health().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn engine() -> HealthEngine {
        HealthEngine::new(ServiceIdentity::new("orders-api", "1.2.3"))
    }

    #[tokio::test]
    async fn empty_engine_is_healthy() {
        let report = engine().health().await;
        assert_eq!(report.status, ServiceStatus::Healthy);
        assert!(report.checks.is_empty());
        assert_eq!(report.service, "orders-api");
        assert_eq!(report.version, "1.2.3");
    }

    #[tokio::test]
    async fn worst_result_wins_regardless_of_order() {
        let forward = engine();
        forward.register_fn("a", "datastore", || async { CheckOutput::pass() });
        forward.register_fn("b", "cache", || async { CheckOutput::warn("slow") });
        forward.register_fn("c", "http", || async { CheckOutput::fail("down") });

        let reversed = engine();
        reversed.register_fn("c", "http", || async { CheckOutput::fail("down") });
        reversed.register_fn("b", "cache", || async { CheckOutput::warn("slow") });
        reversed.register_fn("a", "datastore", || async { CheckOutput::pass() });

        assert_eq!(forward.health().await.status, ServiceStatus::Unhealthy);
        assert_eq!(reversed.health().await.status, ServiceStatus::Unhealthy);
    }

    #[tokio::test]
    async fn warn_without_fail_degrades() {
        let engine = engine();
        engine.register_fn("a", "datastore", || async { CheckOutput::pass() });
        engine.register_fn("b", "cache", || async { CheckOutput::warn("slow") });
        assert_eq!(engine.health().await.status, ServiceStatus::Degraded);
    }

    #[tokio::test]
    async fn panicking_check_becomes_synthetic_fail() {
        let engine = engine();
        engine.register_fn("boom", "custom", || async { panic!("kaboom") });
        engine.register_fn("ok", "custom", || async { CheckOutput::pass() });

        let report = engine.health().await;
        assert_eq!(report.status, ServiceStatus::Unhealthy);
        let boom = report.checks.iter().find(|c| c.name == "boom").unwrap();
        assert_eq!(boom.status, CheckStatus::Fail);
        assert!(boom.message.as_deref().unwrap().contains("aborted"));
    }

    #[tokio::test]
    async fn every_probe_runs_checks_fresh() {
        static CALLS: AtomicUsize = AtomicUsize::new(0);
        let engine = engine();
        engine.register_fn("counted", "custom", || async {
            CALLS.fetch_add(1, Ordering::SeqCst);
            CheckOutput::pass()
        });

        engine.health().await;
        engine.health().await;
        assert_eq!(CALLS.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn liveness_runs_no_checks() {
        static CALLS: AtomicUsize = AtomicUsize::new(0);
        let engine = engine();
        engine.register_fn("counted", "custom", || async {
            CALLS.fetch_add(1, Ordering::SeqCst);
            CheckOutput::pass()
        });

        let live = engine.liveness();
        assert_eq!(live.status, "ok");
        assert_eq!(CALLS.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn report_serializes_camel_case() {
        let engine = engine();
        engine.register_fn("db", "datastore", || async {
            CheckOutput::warn("replica lag")
                .with_observed_value(serde_json::json!({ "lagSeconds": 4 }))
        });

        let report = engine.health().await;
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "degraded");
        assert!(json["uptimeSecs"].is_u64());
        let check = &json["checks"][0];
        assert_eq!(check["componentType"], "datastore");
        assert_eq!(check["status"], "warn");
        assert_eq!(check["message"], "replica lag");
        assert_eq!(check["observedValue"]["lagSeconds"], 4);
        assert!(check["durationMs"].is_u64());
    }

    #[tokio::test]
    async fn registration_between_probes_is_picked_up() {
        let engine = engine();
        engine.register_fn("a", "custom", || async { CheckOutput::pass() });
        assert_eq!(engine.health().await.checks.len(), 1);

        engine.register_fn("b", "custom", || async { CheckOutput::fail("late") });
        let report = engine.health().await;
        assert_eq!(report.checks.len(), 2);
        assert_eq!(report.status, ServiceStatus::Unhealthy);
    }
}
