//! Call-interception wrappers.
//!
//! # Responsibilities
//! - Wrap fallible calls with identical pre/post span behavior without
//!   touching call sites
//! - Fix span kind and attribute shape for common call patterns (database,
//!   outbound HTTP, cache, queue, business transaction)
//!
//! # Failure Semantics
//! - Attribute-extraction failures are logged at debug and ignored
//! - The wrapped call's own failure always propagates after being recorded

use std::fmt::Display;
use std::future::Future;

use opentelemetry::trace::SpanKind;
use opentelemetry::KeyValue;

use super::span::{record_error_on_current, with_span, with_span_async, SpanOptions};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// An extractor deriving extra span attributes from the call arguments.
///
/// Runs once, before the span opens; failures never fail the wrapped call.
pub type AttrExtractor = Box<dyn FnOnce() -> Result<Vec<KeyValue>, BoxError> + Send>;

/// Options consumed by the generic wrapper.
#[derive(Default)]
pub struct TraceOptions {
    pub kind: Option<SpanKind>,
    pub attributes: Vec<KeyValue>,
    pub extract: Option<AttrExtractor>,
}

impl TraceOptions {
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

    pub fn with_extractor<F>(mut self, extract: F) -> Self
    where
        F: FnOnce() -> Result<Vec<KeyValue>, BoxError> + Send + 'static,
    {
        self.extract = Some(Box::new(extract));
        self
    }

    fn into_span_options(self, target: &str, fn_name: &str) -> SpanOptions {
        let mut attributes = vec![
            KeyValue::new("code.namespace", target.to_string()),
            KeyValue::new("code.function", fn_name.to_string()),
        ];
        attributes.extend(self.attributes);
        if let Some(extract) = self.extract {
            match extract() {
                Ok(extra) => attributes.extend(extra),
                Err(err) => {
                    tracing::debug!(
                        target_type = target,
                        function = fn_name,
                        error = %err,
                        "attribute extraction failed; span continues without"
                    );
                }
            }
        }
        let mut opts = SpanOptions::new().with_attributes(attributes);
        if let Some(kind) = self.kind {
            opts = opts.with_kind(kind);
        }
        opts
    }
}

/// Generic call-interception wrapper.
///
/// Opens a span named `{target}.{fn_name}`, stamps the invoking type and
/// function plus any static and extracted attributes, and applies the usual
/// status/exception contract.
pub async fn traced<T, E, F, Fut>(
    target: &str,
    fn_name: &str,
    opts: TraceOptions,
    f: F,
) -> Result<T, E>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let name = format!("{target}.{fn_name}");
    let opts = opts.into_span_options(target, fn_name);
    with_span_async(&name, opts, f).await
}

/// Database-operation wrapper: CLIENT span with `db.operation` / `db.table`.
pub async fn traced_db<T, E, F, Fut>(operation: &str, table: &str, f: F) -> Result<T, E>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let name = format!("db.{operation}");
    let opts = SpanOptions::new()
        .with_kind(SpanKind::Client)
        .with_attribute(KeyValue::new("db.operation", operation.to_string()))
        .with_attribute(KeyValue::new("db.table", table.to_string()));
    with_span_async(&name, opts, f).await
}

/// Outbound-HTTP wrapper: CLIENT span with method and target URL.
///
/// For URLs only known from the call arguments, derive them with an extractor
/// via [`traced`] instead.
pub async fn traced_http_out<T, E, F, Fut>(method: &str, url: &str, f: F) -> Result<T, E>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let name = format!("http.{method}");
    let opts = SpanOptions::new()
        .with_kind(SpanKind::Client)
        .with_attribute(KeyValue::new("http.request.method", method.to_string()))
        .with_attribute(KeyValue::new("url.full", url.to_string()));
    with_span_async(&name, opts, f).await
}

/// Cache operations with a fixed verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOp {
    Get,
    Set,
    Delete,
}

impl CacheOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Set => "SET",
            Self::Delete => "DELETE",
        }
    }
}

/// Cache wrapper: CLIENT span with the operation verb and a key derived from
/// an extractor. Extractor failure drops the key attribute, nothing else.
pub async fn traced_cache<T, E, F, Fut, K>(op: CacheOp, key: K, f: F) -> Result<T, E>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
    K: FnOnce() -> Result<String, BoxError>,
{
    let name = format!("cache.{}", op.as_str());
    let mut opts = SpanOptions::new()
        .with_kind(SpanKind::Client)
        .with_attribute(KeyValue::new("cache.operation", op.as_str()));
    match key() {
        Ok(key) => opts = opts.with_attribute(KeyValue::new("cache.key", key)),
        Err(err) => {
            tracing::debug!(operation = op.as_str(), error = %err, "cache key extraction failed");
        }
    }
    with_span_async(&name, opts, f).await
}

/// Which side of a queue a wrapped call sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueRole {
    Producer,
    Consumer,
}

impl QueueRole {
    fn span_kind(&self) -> SpanKind {
        match self {
            Self::Producer => SpanKind::Producer,
            Self::Consumer => SpanKind::Consumer,
        }
    }
}

/// Queue wrapper: PRODUCER for sends, CONSUMER otherwise.
pub async fn traced_queue<T, E, F, Fut>(role: QueueRole, destination: &str, f: F) -> Result<T, E>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let name = format!("queue.{destination}");
    let opts = SpanOptions::new()
        .with_kind(role.span_kind())
        .with_attribute(KeyValue::new("messaging.destination", destination.to_string()));
    with_span_async(&name, opts, f).await
}

/// Business-transaction wrapper: names domain operations distinctly from
/// infrastructure spans via `transaction.type = "business"`.
pub async fn traced_transaction<T, E, F, Fut>(name: &str, f: F) -> Result<T, E>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let opts = SpanOptions::new()
        .with_attribute(KeyValue::new("transaction.type", "business"));
    with_span_async(name, opts, f).await
}

/// Error-only wrapper: no new span. On `Err` the exception is recorded on
/// whatever span is currently active (if any), the optional handler runs, and
/// the same error is returned to the caller.
pub async fn record_failure<T, E, F, Fut, H>(f: F, on_error: Option<H>) -> Result<T, E>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
    H: FnOnce(&E),
{
    match f().await {
        Ok(value) => Ok(value),
        Err(err) => {
            record_error_on_current(&err);
            if let Some(handler) = on_error {
                handler(&err);
            }
            Err(err)
        }
    }
}

/// Whole-type wrapping: instruments every call made through the wrapper.
///
/// Construction happens once at registration time; afterwards call sites go
/// through [`TracedService::call`] and get a span named `{type}.{method}`
/// without any per-site instrumentation.
pub struct TracedService<T> {
    target: &'static str,
    inner: T,
}

impl<T> TracedService<T> {
    pub fn new(target: &'static str, inner: T) -> Self {
        Self { target, inner }
    }

    /// Access the wrapped value without instrumentation.
    pub fn inner(&self) -> &T {
        &self.inner
    }

    /// Invoke an async method of the wrapped value under a span.
    pub async fn call<'a, R, E, F, Fut>(&'a self, method: &str, f: F) -> Result<R, E>
    where
        F: FnOnce(&'a T) -> Fut,
        Fut: Future<Output = Result<R, E>> + 'a,
        E: Display,
    {
        traced(self.target, method, TraceOptions::new(), || f(&self.inner)).await
    }

    /// Invoke a synchronous method of the wrapped value under a span.
    pub fn call_sync<'a, R, E, F>(&'a self, method: &str, f: F) -> Result<R, E>
    where
        F: FnOnce(&'a T) -> Result<R, E>,
        E: Display,
    {
        let name = format!("{}.{}", self.target, method);
        let opts = TraceOptions::new().into_span_options(self.target, method);
        with_span(&name, opts, || f(&self.inner))
    }
}
