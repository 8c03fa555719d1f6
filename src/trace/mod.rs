//! Tracing subsystem.
//!
//! # Data Flow
//! ```text
//! span.rs        → span lifecycle (create, attach, status, exceptions)
//! wrap.rs        → call-interception wrappers built on span.rs
//! propagation.rs → W3C trace context in/out of header carriers
//! client.rs      → outbound HTTP with client spans + header injection
//! ```
//!
//! # Design Decisions
//! - Spans use the OpenTelemetry API; the exporter backend is the host's concern
//! - Ambient "current span" rides the OpenTelemetry Context, never a global
//! - Wrappers record errors and rethrow; telemetry never swallows call failures

pub mod client;
pub mod propagation;
pub mod span;
pub mod wrap;

pub use client::TracedClient;
pub use propagation::{
    extract_context, extract_from_headers, inject_context, inject_into_headers,
    propagate_context,
};
pub use span::{
    record_error_on_current, record_exception, record_result, start_span, with_span,
    with_span_async, SpanOptions,
};
pub use wrap::{
    record_failure, traced, traced_cache, traced_db, traced_http_out, traced_queue,
    traced_transaction, CacheOp, QueueRole, TraceOptions, TracedService,
};
