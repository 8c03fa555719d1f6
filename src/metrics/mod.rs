//! Metrics subsystem.
//!
//! # Data Flow
//! ```text
//! registry.rs → service-wide registry + baseline metrics + factories
//! gateway.rs  → degraded-mode, backing-store, and circuit-breaker series
//!
//! Consumers:
//!     → GET /metrics (Prometheus text exposition)
//! ```
//!
//! # Design Decisions
//! - One registry per process, scoped by service identity
//! - Duplicate names are rejected by the registry, never silently overwritten
//! - Updates are atomic; no locks are held across I/O

pub mod gateway;
pub mod registry;

pub use gateway::{CircuitState, GatewayMetrics, RateLimitOutcome, StoreTimer};
pub use registry::ServiceMetrics;
