//! Structured logging.
//!
//! # Responsibilities
//! - Install the global tracing subscriber
//! - JSON output for production, pretty output for development
//! - Level configurable via config and `RUST_LOG`
//!
//! Trace and span identifiers reach log lines through span fields recorded by
//! the request middleware, so every JSON record emitted while serving a
//! request can be joined against the trace.

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use crate::config::LogConfig;
use crate::error::TelemetryError;

/// Output format for the logger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    /// JSON in release builds, pretty in debug builds.
    pub const fn infer() -> Self {
        if cfg!(debug_assertions) {
            Self::Pretty
        } else {
            Self::Json
        }
    }
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured level when set.
pub fn init_logging(config: &LogConfig) -> Result<(), TelemetryError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    let installed = match config.format {
        LogFormat::Json => builder
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .try_init(),
        LogFormat::Pretty => builder.try_init(),
    };

    installed.map_err(|err| TelemetryError::Init(format!("subscriber install failed: {err}")))
}
