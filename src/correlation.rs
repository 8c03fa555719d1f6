//! Correlation id management.
//!
//! A correlation id is carried on the inbound request, forwarded on every
//! outbound call and log line for the lifetime of that request, and generated
//! if absent. It is independent of trace ids: trace context links spans,
//! correlation ids link log lines and responses.

use std::fmt;
use std::future::Future;

use uuid::Uuid;

/// Header carrying the correlation id on requests and responses.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// A freshly minted correlation id.
///
/// Inbound requests may carry arbitrary caller-supplied ids; this type is only
/// used when the process has to generate one itself.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CorrelationId(Uuid);

impl CorrelationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CorrelationId({})", self.0)
    }
}

tokio::task_local! {
    static ACTIVE_CORRELATION_ID: String;
}

/// Run a future with the given correlation id available to downstream code.
///
/// The request middleware scopes the inner service call with this; the traced
/// HTTP client reads it back to forward the id on outbound requests.
pub async fn with_correlation_id<F, T>(id: String, fut: F) -> T
where
    F: Future<Output = T>,
{
    ACTIVE_CORRELATION_ID.scope(id, fut).await
}

/// The correlation id of the request currently being served, if any.
pub fn current_correlation_id() -> Option<String> {
    ACTIVE_CORRELATION_ID.try_with(Clone::clone).ok()
}
