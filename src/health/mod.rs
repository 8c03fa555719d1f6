//! Health aggregation subsystem.
//!
//! # Data Flow
//! ```text
//! Registration (engine.rs):
//!     checks::database_check / http_check / custom_check / …
//!     → HealthEngine::register
//!
//! Probe (engine.rs):
//!     GET /health | /health/ready
//!     → run every check concurrently, time each
//!     → reduce fail > warn > pass into unhealthy | degraded | healthy
//! ```
//!
//! # Design Decisions
//! - Liveness never touches dependencies; readiness runs everything
//! - A panicking check fails that check, never the probe
//! - No caching between probes

pub mod checks;
pub mod engine;

pub use checks::{
    cache_check, custom_check, database_check, disk_space_check, http_check, memory_check,
    CheckOutcome,
};
pub use engine::{
    Check, CheckOutput, CheckResult, CheckStatus, HealthEngine, HealthReport, LivenessReport,
    ServiceStatus,
};
