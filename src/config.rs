//! Telemetry configuration.
//!
//! # Responsibilities
//! - Define the service identity shared by traces, metrics, and health reports
//! - Hold tunables with sensible defaults (log level/format, outbound deadline)
//!
//! # Design Decisions
//! - Plain serde structs so host services can embed this in their own config
//! - Defaults are production-safe; everything is overridable

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::logging::LogFormat;

/// Default deadline for outbound calls made through the traced client.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

/// Identity under which a process reports telemetry.
///
/// Metric names are scoped by the sanitized service name; health reports and
/// span resources carry both name and version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceIdentity {
    pub name: String,
    pub version: String,
}

impl ServiceIdentity {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }

    /// Metric namespace derived from the service name. Prometheus metric names
    /// only allow `[a-zA-Z0-9_:]`, so everything else becomes an underscore.
    pub fn metric_namespace(&self) -> String {
        self.name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect()
    }
}

impl Default for ServiceIdentity {
    fn default() -> Self {
        Self::new("service", "0.0.0")
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// EnvFilter directive used when `RUST_LOG` is not set.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::infer(),
        }
    }
}

/// Top-level configuration for the instrumentation core.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub service: ServiceIdentity,
    pub log: LogConfig,
    /// Deadline applied to outbound calls made through [`crate::trace::TracedClient`].
    pub http_timeout_secs: u64,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service: ServiceIdentity::default(),
            log: LogConfig::default(),
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
        }
    }
}

impl TelemetryConfig {
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}
