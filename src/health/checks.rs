//! Ready-made health check constructors.
//!
//! Each factory returns a [`Check`] for [`HealthEngine::register`]; none of
//! them touch the probed resource until the engine runs a cycle.
//!
//! [`HealthEngine::register`]: crate::health::engine::HealthEngine::register

use std::fmt::Display;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use sysinfo::{Disks, ProcessesToUpdate, System};

use crate::health::engine::{Check, CheckOutput};

/// Connectivity check over a caller-supplied database round trip.
pub fn database_check<F, Fut, E>(name: impl Into<String>, probe: F) -> Check
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), E>> + Send + 'static,
    E: Display,
{
    probe_check(name, "datastore", probe)
}

/// Connectivity check over a caller-supplied cache ping.
pub fn cache_check<F, Fut, E>(name: impl Into<String>, probe: F) -> Check
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), E>> + Send + 'static,
    E: Display,
{
    probe_check(name, "cache", probe)
}

fn probe_check<F, Fut, E>(name: impl Into<String>, component_type: &str, probe: F) -> Check
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), E>> + Send + 'static,
    E: Display,
{
    Check::new(name, component_type, move || {
        let fut = probe();
        async move {
            match fut.await {
                Ok(()) => CheckOutput::pass(),
                Err(err) => CheckOutput::fail(err.to_string()),
            }
        }
    })
}

/// GET probe against a dependency's endpoint.
///
/// 5xx answers fail the check; 4xx answers only warn, since the dependency is
/// up and reachable even if it dislikes the probe request. Transport errors
/// and timeouts fail.
pub fn http_check(name: impl Into<String>, url: impl Into<String>, timeout: Duration) -> Check {
    let url = url.into();
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|err| err.to_string());

    Check::new(name, "http", move || {
        let url = url.clone();
        let client = client.clone();
        async move {
            let client = match client {
                Ok(client) => client,
                Err(err) => return CheckOutput::fail(format!("client build failed: {err}")),
            };
            match client.get(&url).send().await {
                Ok(response) => {
                    let status = response.status();
                    let observed = serde_json::json!({ "statusCode": status.as_u16() });
                    if status.is_server_error() {
                        CheckOutput::fail(format!("{url} answered {status}"))
                            .with_observed_value(observed)
                    } else if status.is_client_error() {
                        CheckOutput::warn(format!("{url} answered {status}"))
                            .with_observed_value(observed)
                    } else {
                        CheckOutput::pass().with_observed_value(observed)
                    }
                }
                Err(err) => CheckOutput::fail(format!("{url} unreachable: {err}")),
            }
        }
    })
}

/// Free-space check for the filesystem holding `path`.
pub fn disk_space_check(
    name: impl Into<String>,
    path: impl Into<PathBuf>,
    min_free_ratio: f64,
) -> Check {
    let path = path.into();
    Check::new(name, "disk", move || {
        let path = path.clone();
        async move {
            match tokio::task::spawn_blocking(move || free_space_ratio(&path)).await {
                Ok(Ok(ratio)) => classify_free_space(ratio, min_free_ratio),
                Ok(Err(err)) => CheckOutput::fail(err),
                Err(err) => CheckOutput::fail(format!("disk probe aborted: {err}")),
            }
        }
    })
}

/// Process RSS against total host memory.
pub fn memory_check(name: impl Into<String>, max_used_ratio: f64) -> Check {
    Check::new(name, "memory", move || async move {
        match tokio::task::spawn_blocking(process_memory_ratio).await {
            Ok(Ok(ratio)) => classify_memory(ratio, max_used_ratio),
            Ok(Err(err)) => CheckOutput::fail(err),
            Err(err) => CheckOutput::fail(format!("memory probe aborted: {err}")),
        }
    })
}

/// Outcome type for [`custom_check`] closures that want to attach a message.
pub struct CheckOutcome {
    pub ok: bool,
    pub message: Option<String>,
}

impl From<CheckOutcome> for CheckOutput {
    fn from(outcome: CheckOutcome) -> Self {
        match (outcome.ok, outcome.message) {
            (true, _) => CheckOutput::pass(),
            (false, Some(message)) => CheckOutput::fail(message),
            (false, None) => CheckOutput::fail("check reported not ok"),
        }
    }
}

impl From<bool> for CheckOutput {
    fn from(ok: bool) -> Self {
        CheckOutcome { ok, message: None }.into()
    }
}

/// Wrap any closure returning `bool` or [`CheckOutcome`] as a check.
pub fn custom_check<F, Fut, O>(
    name: impl Into<String>,
    component_type: impl Into<String>,
    f: F,
) -> Check
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = O> + Send + 'static,
    O: Into<CheckOutput>,
{
    Check::new(name, component_type, move || {
        let fut = f();
        async move { fut.await.into() }
    })
}

fn classify_free_space(ratio: f64, min_free_ratio: f64) -> CheckOutput {
    let observed = serde_json::json!({ "freeRatio": ratio });
    if ratio < min_free_ratio {
        CheckOutput::fail(format!(
            "free space {:.1}% below minimum {:.1}%",
            ratio * 100.0,
            min_free_ratio * 100.0
        ))
        .with_observed_value(observed)
    } else if ratio < min_free_ratio * 1.5 {
        CheckOutput::warn(format!("free space {:.1}% approaching minimum", ratio * 100.0))
            .with_observed_value(observed)
    } else {
        CheckOutput::pass().with_observed_value(observed)
    }
}

fn classify_memory(ratio: f64, max_used_ratio: f64) -> CheckOutput {
    let observed = serde_json::json!({ "usedRatio": ratio });
    if ratio > max_used_ratio {
        CheckOutput::fail(format!(
            "process memory {:.1}% above limit {:.1}%",
            ratio * 100.0,
            max_used_ratio * 100.0
        ))
        .with_observed_value(observed)
    } else if ratio > max_used_ratio * 0.8 {
        CheckOutput::warn(format!("process memory {:.1}% nearing limit", ratio * 100.0))
            .with_observed_value(observed)
    } else {
        CheckOutput::pass().with_observed_value(observed)
    }
}

/// Free/total ratio for the disk whose mount point is the longest prefix of
/// `path`.
fn free_space_ratio(path: &Path) -> Result<f64, String> {
    let disks = Disks::new_with_refreshed_list();
    let disk = disks
        .list()
        .iter()
        .filter(|d| path.starts_with(d.mount_point()))
        .max_by_key(|d| d.mount_point().as_os_str().len())
        .ok_or_else(|| format!("no disk found for {}", path.display()))?;
    let total = disk.total_space();
    if total == 0 {
        return Err("disk reports zero total space".to_string());
    }
    Ok(disk.available_space() as f64 / total as f64)
}

fn process_memory_ratio() -> Result<f64, String> {
    let mut sys = System::new();
    sys.refresh_memory();
    let total = sys.total_memory();
    if total == 0 {
        return Err("total memory reported as zero".to_string());
    }
    let pid = sysinfo::get_current_pid().map_err(|err| err.to_string())?;
    sys.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
    let process = sys
        .process(pid)
        .ok_or_else(|| "current process not visible".to_string())?;
    Ok(process.memory() as f64 / total as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::engine::CheckStatus;

    #[test]
    fn free_space_classification_thresholds() {
        assert_eq!(classify_free_space(0.05, 0.10).status, CheckStatus::Fail);
        assert_eq!(classify_free_space(0.12, 0.10).status, CheckStatus::Warn);
        assert_eq!(classify_free_space(0.50, 0.10).status, CheckStatus::Pass);
    }

    #[test]
    fn memory_classification_thresholds() {
        assert_eq!(classify_memory(0.95, 0.90).status, CheckStatus::Fail);
        assert_eq!(classify_memory(0.85, 0.90).status, CheckStatus::Warn);
        assert_eq!(classify_memory(0.20, 0.90).status, CheckStatus::Pass);
    }

    #[tokio::test]
    async fn database_check_maps_probe_result() {
        let engine = crate::health::engine::HealthEngine::new(
            crate::config::ServiceIdentity::new("svc", "1.0.0"),
        );
        engine.register(database_check("primary", || async {
            Ok::<(), String>(())
        }));
        engine.register(database_check("replica", || async {
            Err::<(), String>("connection refused".to_string())
        }));

        let report = engine.health().await;
        let primary = report.checks.iter().find(|c| c.name == "primary").unwrap();
        let replica = report.checks.iter().find(|c| c.name == "replica").unwrap();
        assert_eq!(primary.status, CheckStatus::Pass);
        assert_eq!(replica.status, CheckStatus::Fail);
        assert_eq!(replica.message.as_deref(), Some("connection refused"));
        assert_eq!(replica.component_type, "datastore");
    }

    #[tokio::test]
    async fn custom_check_accepts_bool_and_outcome() {
        let engine = crate::health::engine::HealthEngine::new(
            crate::config::ServiceIdentity::new("svc", "1.0.0"),
        );
        engine.register(custom_check("flag", "feature", || async { true }));
        engine.register(custom_check("detail", "feature", || async {
            CheckOutcome {
                ok: false,
                message: Some("toggle store stale".to_string()),
            }
        }));

        let report = engine.health().await;
        let flag = report.checks.iter().find(|c| c.name == "flag").unwrap();
        let detail = report.checks.iter().find(|c| c.name == "detail").unwrap();
        assert_eq!(flag.status, CheckStatus::Pass);
        assert_eq!(detail.status, CheckStatus::Fail);
        assert_eq!(detail.message.as_deref(), Some("toggle store stale"));
    }

    #[tokio::test]
    async fn memory_check_runs_against_this_process() {
        let engine = crate::health::engine::HealthEngine::new(
            crate::config::ServiceIdentity::new("svc", "1.0.0"),
        );
        // A test process is nowhere near the whole host's memory.
        engine.register(memory_check("rss", 0.99));
        let report = engine.health().await;
        let rss = report.checks.iter().find(|c| c.name == "rss").unwrap();
        assert_eq!(rss.status, CheckStatus::Pass);
    }
}
