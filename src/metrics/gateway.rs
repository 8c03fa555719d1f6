//! Gateway specialization: degraded-mode, backing-store, and circuit-breaker
//! metrics.
//!
//! # Metrics
//! - `<svc>_rate_limit_fail_open_total` (counter): fail-open events by route, reason
//! - `<svc>_rate_limit_fail_open_active` (gauge): 1 while a route is failing open
//! - `<svc>_rate_limit_checks_total` (counter): checks by outcome
//! - `<svc>_store_operation_duration_seconds` (histogram): backing-store latency
//! - `<svc>_store_operations_total` (counter): backing-store ops by outcome
//! - `<svc>_store_connected` (gauge): 1 connected / 0 not, per host
//! - `<svc>_circuit_state` (gauge): 0=CLOSED, 1=OPEN, 2=HALF_OPEN
//! - `<svc>_circuit_transitions_total` / `<svc>_circuit_trips_total` (counters)

use std::time::Instant;

use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, IntGaugeVec, Opts};

use crate::error::TelemetryError;
use crate::metrics::registry::ServiceMetrics;

/// Backing-store latency buckets (seconds); these calls are expected fast.
const STORE_LATENCY_BUCKETS: &[f64] = &[
    0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
];

/// Circuit breaker states with their fixed gauge encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Closed => "CLOSED",
            Self::Open => "OPEN",
            Self::HalfOpen => "HALF_OPEN",
        }
    }

    pub fn gauge_value(&self) -> i64 {
        match self {
            Self::Closed => 0,
            Self::Open => 1,
            Self::HalfOpen => 2,
        }
    }
}

/// Outcome of one rate-limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitOutcome {
    Allowed,
    Rejected,
    /// The backing store was unreachable and the check fell back to fail-open.
    Degraded,
}

impl RateLimitOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Allowed => "allowed",
            Self::Rejected => "rejected",
            Self::Degraded => "degraded",
        }
    }

    fn gauge_value(&self) -> i64 {
        match self {
            Self::Allowed => 0,
            Self::Rejected => 1,
            Self::Degraded => 2,
        }
    }
}

/// Gateway metrics registered into the shared service registry.
pub struct GatewayMetrics {
    rate_limit_fail_open_total: IntCounterVec,
    rate_limit_fail_open_active: IntGaugeVec,
    rate_limit_checks_total: IntCounterVec,
    rate_limit_last_outcome: prometheus::IntGauge,
    store_operation_duration: HistogramVec,
    store_operations_total: IntCounterVec,
    store_connected: IntGaugeVec,
    circuit_state: IntGaugeVec,
    circuit_transitions_total: IntCounterVec,
    circuit_trips_total: IntCounterVec,
}

impl GatewayMetrics {
    /// Register the gateway series into the service's registry.
    pub fn new(metrics: &ServiceMetrics) -> Result<Self, TelemetryError> {
        let namespace = metrics.namespace().to_string();
        let registry = metrics.registry();

        let rate_limit_fail_open_total = IntCounterVec::new(
            Opts::new(
                "rate_limit_fail_open_total",
                "Rate-limit checks that fell back to fail-open mode",
            )
            .namespace(namespace.clone()),
            &["route", "reason"],
        )?;
        let rate_limit_fail_open_active = IntGaugeVec::new(
            Opts::new(
                "rate_limit_fail_open_active",
                "1 while the route's rate limiting is failing open",
            )
            .namespace(namespace.clone()),
            &["route"],
        )?;
        let rate_limit_checks_total = IntCounterVec::new(
            Opts::new("rate_limit_checks_total", "Rate-limit checks by outcome")
                .namespace(namespace.clone()),
            &["outcome"],
        )?;
        let rate_limit_last_outcome = prometheus::IntGauge::with_opts(
            Opts::new(
                "rate_limit_last_outcome",
                "Most recent rate-limit check outcome (0=allowed, 1=rejected, 2=degraded)",
            )
            .namespace(namespace.clone()),
        )?;
        let store_operation_duration = HistogramVec::new(
            HistogramOpts::new(
                "store_operation_duration_seconds",
                "Backing-store operation latency",
            )
            .namespace(namespace.clone())
            .buckets(STORE_LATENCY_BUCKETS.to_vec()),
            &["operation"],
        )?;
        let store_operations_total = IntCounterVec::new(
            Opts::new("store_operations_total", "Backing-store operations by outcome")
                .namespace(namespace.clone()),
            &["operation", "outcome"],
        )?;
        let store_connected = IntGaugeVec::new(
            Opts::new("store_connected", "Backing-store connection state per host")
                .namespace(namespace.clone()),
            &["host"],
        )?;
        let circuit_state = IntGaugeVec::new(
            Opts::new(
                "circuit_state",
                "Circuit breaker state (0=CLOSED, 1=OPEN, 2=HALF_OPEN)",
            )
            .namespace(namespace.clone()),
            &["breaker"],
        )?;
        let circuit_transitions_total = IntCounterVec::new(
            Opts::new("circuit_transitions_total", "Circuit breaker state transitions")
                .namespace(namespace.clone()),
            &["breaker", "from_state", "to_state"],
        )?;
        let circuit_trips_total = IntCounterVec::new(
            Opts::new("circuit_trips_total", "Circuit breaker trips into OPEN")
                .namespace(namespace),
            &["breaker"],
        )?;

        registry.register(Box::new(rate_limit_fail_open_total.clone()))?;
        registry.register(Box::new(rate_limit_fail_open_active.clone()))?;
        registry.register(Box::new(rate_limit_checks_total.clone()))?;
        registry.register(Box::new(rate_limit_last_outcome.clone()))?;
        registry.register(Box::new(store_operation_duration.clone()))?;
        registry.register(Box::new(store_operations_total.clone()))?;
        registry.register(Box::new(store_connected.clone()))?;
        registry.register(Box::new(circuit_state.clone()))?;
        registry.register(Box::new(circuit_transitions_total.clone()))?;
        registry.register(Box::new(circuit_trips_total.clone()))?;

        Ok(Self {
            rate_limit_fail_open_total,
            rate_limit_fail_open_active,
            rate_limit_checks_total,
            rate_limit_last_outcome,
            store_operation_duration,
            store_operations_total,
            store_connected,
            circuit_state,
            circuit_transitions_total,
            circuit_trips_total,
        })
    }

    /// Record a rate-limit check falling back to fail-open for a route.
    pub fn record_fail_open(&self, route: &str, reason: &str) {
        self.rate_limit_fail_open_total
            .with_label_values(&[route, reason])
            .inc();
        self.rate_limit_fail_open_active
            .with_label_values(&[route])
            .set(1);
        tracing::warn!(route, reason, "rate limiting degraded to fail-open");
    }

    /// Clear the fail-open gauge once the backing store recovers.
    pub fn clear_fail_open(&self, route: &str) {
        self.rate_limit_fail_open_active
            .with_label_values(&[route])
            .set(0);
    }

    pub fn record_rate_limit_check(&self, outcome: RateLimitOutcome) {
        self.rate_limit_checks_total
            .with_label_values(&[outcome.as_str()])
            .inc();
        self.rate_limit_last_outcome.set(outcome.gauge_value());
    }

    /// Record one backing-store operation: latency plus outcome counter.
    pub fn observe_store_operation(&self, operation: &str, success: bool, start: Instant) {
        self.store_operation_duration
            .with_label_values(&[operation])
            .observe(start.elapsed().as_secs_f64());
        let outcome = if success { "success" } else { "failure" };
        self.store_operations_total
            .with_label_values(&[operation, outcome])
            .inc();
    }

    pub fn set_store_connected(&self, host: &str, connected: bool) {
        self.store_connected
            .with_label_values(&[host])
            .set(i64::from(connected));
    }

    /// Record a circuit breaker transition.
    ///
    /// The state gauge follows the destination. A trip is counted only when
    /// the destination is OPEN and the origin is a different state; an
    /// OPEN → OPEN transition cannot occur in a correct breaker and is not
    /// counted as a new trip.
    pub fn record_circuit_transition(
        &self,
        breaker: &str,
        from: CircuitState,
        to: CircuitState,
    ) {
        self.circuit_transitions_total
            .with_label_values(&[breaker, from.as_str(), to.as_str()])
            .inc();
        self.circuit_state
            .with_label_values(&[breaker])
            .set(to.gauge_value());
        if to == CircuitState::Open && from != CircuitState::Open {
            self.circuit_trips_total.with_label_values(&[breaker]).inc();
            tracing::warn!(breaker, from = from.as_str(), "circuit breaker tripped open");
        }
    }

    /// Start a stopwatch for a named backing-store operation.
    ///
    /// Every store call site needs the same latency + outcome update; the
    /// timer bundles them so none can be forgotten under an error path.
    pub fn start_store_timer<'a>(&'a self, operation: &str) -> StoreTimer<'a> {
        StoreTimer {
            gateway: self,
            operation: operation.to_string(),
            start: Instant::now(),
        }
    }
}

/// Stopwatch for one backing-store operation.
pub struct StoreTimer<'a> {
    gateway: &'a GatewayMetrics,
    operation: String,
    start: Instant,
}

impl StoreTimer<'_> {
    /// Stop the timer, recording latency and the success/failure counter.
    pub fn end(self, success: bool) {
        self.gateway
            .observe_store_operation(&self.operation, success, self.start);
    }
}
