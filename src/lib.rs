//! Service instrumentation core: correlated traces, metrics, and health
//! aggregation for HTTP services.
//!
//! One [`init`] call installs the structured logger, the W3C trace context
//! propagator, and a resource-stamped tracer provider. Exporter transports
//! stay out of scope: the host process installs its own span processor if it
//! ships traces anywhere.

pub mod config;
pub mod correlation;
pub mod error;
pub mod health;
pub mod http;
pub mod logging;
pub mod metrics;
pub mod trace;

use opentelemetry::{global, KeyValue};
use opentelemetry_sdk::trace::SdkTracerProvider;
use opentelemetry_sdk::Resource;

pub use config::{LogConfig, ServiceIdentity, TelemetryConfig};
pub use correlation::{current_correlation_id, with_correlation_id, CorrelationId};
pub use error::TelemetryError;
pub use health::{HealthEngine, HealthReport, ServiceStatus};
pub use http::{observability_router, telemetry_middleware, TelemetryState};
pub use metrics::{GatewayMetrics, ServiceMetrics};
pub use trace::client::TracedClient;

/// Keeps the tracer provider alive; dropping it flushes and shuts it down.
pub struct TelemetryGuard {
    provider: SdkTracerProvider,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        if let Err(err) = self.provider.shutdown() {
            tracing::warn!(error = %err, "tracer provider shutdown failed");
        }
    }
}

/// Initialize logging, propagation, and tracing for a service process.
pub fn init(config: &TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    logging::init_logging(&config.log)?;
    trace::propagation::init_propagator();

    let resource = Resource::builder()
        .with_service_name(config.service.name.clone())
        .with_attribute(KeyValue::new(
            "service.version",
            config.service.version.clone(),
        ))
        .build();
    let provider = SdkTracerProvider::builder()
        .with_resource(resource)
        .build();
    global::set_tracer_provider(provider.clone());

    tracing::info!(
        service = %config.service.name,
        version = %config.service.version,
        "telemetry initialized"
    );
    Ok(TelemetryGuard { provider })
}
