//! HTTP integration subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound request
//!     → middleware.rs (correlation id, SERVER span, metrics, access log)
//!     → inner service
//!
//! Scrapes and probes
//!     → routes.rs (/metrics, /health, /health/live, /health/ready)
//! ```
//!
//! # Design Decisions
//! - Middleware attaches via `axum::middleware::from_fn_with_state`
//! - Readiness answers 503 only when the aggregate is unhealthy; degraded
//!   still accepts traffic

pub mod middleware;
pub mod routes;

pub use middleware::{telemetry_middleware, TelemetryState};
pub use routes::observability_router;
