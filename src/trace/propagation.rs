//! Cross-process trace context propagation.
//!
//! # Responsibilities
//! - Serialize the ambient trace context into header carriers on the way out
//! - Parse incoming carriers into a parent context on the way in
//!
//! # Design Decisions
//! - W3C Trace Context only (`traceparent` + optional `tracestate`)
//! - Absent or malformed headers yield a rootless context, never an error:
//!   downstream span creation then starts a fresh trace

use std::collections::HashMap;

use opentelemetry::propagation::{Extractor, Injector};
use opentelemetry::{global, Context};
use opentelemetry_sdk::propagation::TraceContextPropagator;

const PROPAGATION_HEADERS: [&str; 2] = ["traceparent", "tracestate"];

/// Install the W3C Trace Context propagator globally.
///
/// Called by [`crate::init`]; standalone consumers can call it directly.
pub fn init_propagator() {
    global::set_text_map_propagator(TraceContextPropagator::new());
}

/// Extractor over typed HTTP headers.
pub struct HeaderExtractor<'a>(pub &'a http::HeaderMap);

impl Extractor for HeaderExtractor<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        PROPAGATION_HEADERS
            .into_iter()
            .filter(|k| self.0.contains_key(*k))
            .collect()
    }
}

/// Injector over typed HTTP headers. Values that are not valid header text
/// are dropped rather than failing the request.
pub struct HeaderInjector<'a>(pub &'a mut http::HeaderMap);

impl Injector for HeaderInjector<'_> {
    fn set(&mut self, key: &str, value: String) {
        if let (Ok(name), Ok(value)) = (
            http::header::HeaderName::from_bytes(key.as_bytes()),
            http::header::HeaderValue::from_str(&value),
        ) {
            self.0.insert(name, value);
        }
    }
}

/// Inject the ambient trace context into a flat string carrier.
pub fn inject_context(carrier: &mut HashMap<String, String>) {
    let cx = Context::current();
    global::get_text_map_propagator(|propagator| propagator.inject_context(&cx, carrier));
}

/// Inject the ambient trace context into typed HTTP headers.
pub fn inject_into_headers(headers: &mut http::HeaderMap) {
    let cx = Context::current();
    global::get_text_map_propagator(|propagator| {
        propagator.inject_context(&cx, &mut HeaderInjector(headers));
    });
}

/// Inject a specific context into typed HTTP headers.
pub(crate) fn inject_cx_into_headers(cx: &Context, headers: &mut http::HeaderMap) {
    global::get_text_map_propagator(|propagator| {
        propagator.inject_context(cx, &mut HeaderInjector(headers));
    });
}

/// Return a copy of the given headers augmented with the serialized ambient
/// trace context. The input map is left untouched.
pub fn propagate_context(headers: &HashMap<String, String>) -> HashMap<String, String> {
    let mut out = headers.clone();
    inject_context(&mut out);
    out
}

/// Parse a flat string carrier into a context usable as a span parent.
pub fn extract_context(carrier: &HashMap<String, String>) -> Context {
    global::get_text_map_propagator(|propagator| propagator.extract(carrier))
}

/// Parse typed HTTP headers into a context usable as a span parent.
pub fn extract_from_headers(headers: &http::HeaderMap) -> Context {
    global::get_text_map_propagator(|propagator| propagator.extract(&HeaderExtractor(headers)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::span::{with_span, SpanOptions};
    use crate::trace::testutil::init_test_tracing;
    use opentelemetry::trace::TraceContextExt;

    #[test]
    fn inject_extract_roundtrip_preserves_trace_id() {
        init_test_tracing();
        let _: Result<(), String> = with_span("propagation_roundtrip", SpanOptions::new(), || {
            let ambient_trace_id = Context::current().span().span_context().trace_id();

            let headers = propagate_context(&HashMap::new());
            let traceparent = headers.get("traceparent").expect("traceparent injected");
            assert!(traceparent.starts_with("00-"));

            let extracted = extract_context(&headers);
            assert_eq!(
                extracted.span().span_context().trace_id(),
                ambient_trace_id
            );
            Ok(())
        });
    }

    #[test]
    fn propagate_context_on_empty_map_adds_only_propagation_headers() {
        init_test_tracing();
        let _: Result<(), String> = with_span("propagation_bare", SpanOptions::new(), || {
            let headers = propagate_context(&HashMap::new());
            assert!(!headers.is_empty());
            for key in headers.keys() {
                assert!(
                    PROPAGATION_HEADERS.contains(&key.as_str()),
                    "unexpected header {key}"
                );
            }
            Ok(())
        });
    }

    #[test]
    fn propagate_context_keeps_caller_headers() {
        init_test_tracing();
        let _: Result<(), String> = with_span("propagation_merge", SpanOptions::new(), || {
            let mut headers = HashMap::new();
            headers.insert("content-type".to_string(), "application/json".to_string());
            let out = propagate_context(&headers);
            assert_eq!(out.get("content-type").map(String::as_str), Some("application/json"));
            assert!(out.contains_key("traceparent"));
            // input untouched
            assert!(!headers.contains_key("traceparent"));
            Ok(())
        });
    }

    #[test]
    fn malformed_traceparent_yields_rootless_context() {
        init_test_tracing();
        let mut headers = HashMap::new();
        headers.insert("traceparent".to_string(), "not-a-traceparent".to_string());
        let cx = extract_context(&headers);
        assert!(!cx.span().span_context().is_valid());
    }

    #[test]
    fn empty_carrier_yields_rootless_context() {
        init_test_tracing();
        let cx = extract_context(&HashMap::new());
        assert!(!cx.span().span_context().is_valid());
    }

    #[test]
    fn typed_header_roundtrip() {
        init_test_tracing();
        let _: Result<(), String> = with_span("propagation_typed", SpanOptions::new(), || {
            let ambient_trace_id = Context::current().span().span_context().trace_id();
            let mut headers = http::HeaderMap::new();
            inject_into_headers(&mut headers);
            assert!(headers.contains_key("traceparent"));

            let extracted = extract_from_headers(&headers);
            assert_eq!(
                extracted.span().span_context().trace_id(),
                ambient_trace_id
            );
            Ok(())
        });
    }

    #[test]
    fn tracestate_survives_extraction() {
        init_test_tracing();
        let mut headers = HashMap::new();
        headers.insert(
            "traceparent".to_string(),
            "00-0af7651916cd43dd8448eb211c80319c-b7ad6b7169203331-01".to_string(),
        );
        headers.insert("tracestate".to_string(), "vendor=value".to_string());
        let cx = extract_context(&headers);
        let span_cx = cx.span().span_context().clone();
        assert!(span_cx.is_valid());
        assert!(!span_cx.trace_state().header().is_empty());
    }
}
