//! Crate error type.
//!
//! Telemetry failures are split in two: errors surfaced to the embedding
//! service (registration, init, rendering) live here; instrumentation-internal
//! failures (attribute extraction, result serialization) are logged and
//! swallowed at the call site so telemetry never changes application behavior.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TelemetryError {
    /// Metric construction or registration failed. Duplicate names within one
    /// registry surface through this variant.
    #[error("metric registration failed: {0}")]
    Metrics(#[from] prometheus::Error),

    /// The metrics snapshot could not be encoded into the text exposition format.
    #[error("metrics encoding failed: {0}")]
    Encode(String),

    /// Telemetry initialization failed (subscriber already installed, bad client config).
    #[error("telemetry init failed: {0}")]
    Init(String),
}
