//! Span primitives.
//!
//! # Responsibilities
//! - Create spans parented to the ambient (or an explicit) context
//! - Guarantee exactly one `end()` per span on every exit path
//! - Map `Result` outcomes to span status and exception events
//!
//! The ambient active span is the OpenTelemetry [`Context`]: synchronous code
//! attaches it with a guard, async code rides it on the future, so two
//! concurrently in-flight calls never see each other's span.

use std::borrow::Cow;
use std::fmt::Display;
use std::future::Future;

use opentelemetry::global::{self, BoxedSpan, BoxedTracer};
use opentelemetry::trace::{
    FutureExt as OtelFutureExt, Link, SpanKind, SpanRef, Status, TraceContextExt, Tracer,
};
use opentelemetry::{Context, KeyValue};

const TRACER_NAME: &str = "beacon";

/// Longest `code.result` attribute value recorded before truncation.
const MAX_RESULT_LEN: usize = 512;

fn tracer() -> BoxedTracer {
    global::tracer(TRACER_NAME)
}

/// Options for span creation.
#[derive(Default)]
pub struct SpanOptions {
    pub kind: Option<SpanKind>,
    pub attributes: Vec<KeyValue>,
    /// Explicit parent; defaults to the ambient active context.
    pub parent: Option<Context>,
    /// Causal references to spans outside the parent chain.
    pub links: Vec<Link>,
}

impl SpanOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_kind(mut self, kind: SpanKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_attribute(mut self, attribute: KeyValue) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn with_attributes(mut self, attributes: impl IntoIterator<Item = KeyValue>) -> Self {
        self.attributes.extend(attributes);
        self
    }

    pub fn with_parent(mut self, parent: Context) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_link(mut self, link: Link) -> Self {
        self.links.push(link);
        self
    }
}

/// Start a span without attaching it to the ambient context.
///
/// Most callers want [`with_span`] or [`with_span_async`], which also
/// guarantee the end call. The returned span must be ended by the caller.
pub fn start_span(name: impl Into<Cow<'static, str>>, opts: SpanOptions) -> BoxedSpan {
    let tracer = tracer();
    let parent = opts.parent.unwrap_or_else(Context::current);
    let mut builder = tracer.span_builder(name).with_attributes(opts.attributes);
    if let Some(kind) = opts.kind {
        builder = builder.with_kind(kind);
    }
    if !opts.links.is_empty() {
        builder = builder.with_links(opts.links);
    }
    builder.start_with_context(&tracer, &parent)
}

/// Run a synchronous fallible call under a new span.
///
/// The span becomes the ambient active span for the duration of `f`. On `Ok`
/// the status is set to OK; on `Err` the error is recorded as an exception
/// event and the status set to ERROR with the error's message. The span ends
/// exactly once and the caller's `Result` is returned unchanged.
pub fn with_span<T, E, F>(name: &str, opts: SpanOptions, f: F) -> Result<T, E>
where
    F: FnOnce() -> Result<T, E>,
    E: Display,
{
    let span = start_span(name.to_string(), opts);
    let cx = Context::current_with_span(span);
    let result = {
        let _guard = cx.clone().attach();
        f()
    };
    close_span(&cx, &result);
    result
}

/// Async counterpart of [`with_span`].
///
/// The span context rides the future across every suspension point, so the
/// span stays active for the whole logical call even when the task yields.
pub async fn with_span_async<T, E, F, Fut>(name: &str, opts: SpanOptions, f: F) -> Result<T, E>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let span = start_span(name.to_string(), opts);
    let cx = Context::current_with_span(span);
    let result = async move { f().await }.with_context(cx.clone()).await;
    close_span(&cx, &result);
    result
}

fn close_span<T, E: Display>(cx: &Context, result: &Result<T, E>) {
    let span = cx.span();
    match result {
        Ok(_) => span.set_status(Status::Ok),
        Err(err) => {
            record_exception(&span, err);
            span.set_status(Status::error(err.to_string()));
        }
    }
    span.end();
}

/// Record an exception event on a span without changing its status.
pub fn record_exception<E: Display>(span: &SpanRef<'_>, err: &E) {
    span.add_event(
        "exception",
        vec![
            KeyValue::new("exception.type", std::any::type_name::<E>()),
            KeyValue::new("exception.message", err.to_string()),
        ],
    );
}

/// Record an exception on whatever span is currently active, if any.
///
/// Used by the error-only wrapper; a missing active span makes this a no-op.
pub fn record_error_on_current<E: Display>(err: &E) {
    let cx = Context::current();
    if cx.has_active_span() {
        record_exception(&cx.span(), err);
    }
}

/// Stamp a serialized call result onto the current span as `code.result`.
///
/// Serialization failures are logged and ignored; overlong values are
/// truncated. Telemetry must never fail the call it observes.
pub fn record_result<T: serde::Serialize>(value: &T) {
    let cx = Context::current();
    if !cx.has_active_span() {
        return;
    }
    match serde_json::to_string(value) {
        Ok(mut rendered) => {
            if rendered.len() > MAX_RESULT_LEN {
                // Walk back to a char boundary; a mid-codepoint truncate panics.
                let mut cut = MAX_RESULT_LEN;
                while !rendered.is_char_boundary(cut) {
                    cut -= 1;
                }
                rendered.truncate(cut);
            }
            cx.span().set_attribute(KeyValue::new("code.result", rendered));
        }
        Err(err) => {
            tracing::debug!(error = %err, "result serialization failed; attribute omitted");
        }
    }
}
