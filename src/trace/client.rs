//! Traced outbound HTTP client.
//!
//! # Responsibilities
//! - Open a CLIENT span around every outbound request
//! - Inject the ambient trace context and correlation id into request headers
//! - Map the HTTP status onto span status; enforce a deadline
//!
//! Transport failures (timeout, connection refused) are recorded on the span
//! and the original `reqwest::Error` is returned unchanged.

use std::time::Duration;

use opentelemetry::trace::{SpanKind, Status, TraceContextExt};
use opentelemetry::{Context, KeyValue};
use reqwest::{Method, Response, Url};
use serde::Serialize;

use crate::config::{ServiceIdentity, TelemetryConfig, DEFAULT_HTTP_TIMEOUT_SECS};
use crate::correlation::{current_correlation_id, REQUEST_ID_HEADER};
use crate::error::TelemetryError;
use crate::trace::propagation::inject_cx_into_headers;
use crate::trace::span::{record_exception, start_span, SpanOptions};

/// Response body size classes recorded as `http.response.size_class`.
fn size_class(len: Option<u64>) -> &'static str {
    match len {
        Some(n) if n < 1_024 => "small",
        Some(n) if n < 1_048_576 => "medium",
        Some(_) => "large",
        None => "unknown",
    }
}

/// Outbound HTTP client that wraps every call in a CLIENT span.
#[derive(Clone)]
pub struct TracedClient {
    client: reqwest::Client,
    identity: ServiceIdentity,
    timeout: Duration,
}

impl TracedClient {
    /// Build a client with the default deadline.
    pub fn new(identity: ServiceIdentity) -> Result<Self, TelemetryError> {
        Self::with_timeout(identity, Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS))
    }

    /// Build a client taking identity and deadline from the service config.
    pub fn from_config(config: &TelemetryConfig) -> Result<Self, TelemetryError> {
        Self::with_timeout(config.service.clone(), config.http_timeout())
    }

    /// Build a client with an explicit per-request deadline.
    pub fn with_timeout(
        identity: ServiceIdentity,
        timeout: Duration,
    ) -> Result<Self, TelemetryError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| TelemetryError::Init(format!("http client build failed: {err}")))?;
        Ok(Self {
            client,
            identity,
            timeout,
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn get(&self, url: &str) -> Result<Response, reqwest::Error> {
        self.send(Method::GET, url, None::<&()>).await
    }

    pub async fn delete(&self, url: &str) -> Result<Response, reqwest::Error> {
        self.send(Method::DELETE, url, None::<&()>).await
    }

    pub async fn post<B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<Response, reqwest::Error> {
        self.send(Method::POST, url, Some(body)).await
    }

    pub async fn put<B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<Response, reqwest::Error> {
        self.send(Method::PUT, url, Some(body)).await
    }

    pub async fn patch<B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<Response, reqwest::Error> {
        self.send(Method::PATCH, url, Some(body)).await
    }

    /// Send a request under a CLIENT span.
    ///
    /// The span carries method, target path, scheme, host, and service
    /// identity; the ambient trace context and the active correlation id are
    /// injected into the outgoing headers before sending.
    pub async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: &str,
        body: Option<&B>,
    ) -> Result<Response, reqwest::Error> {
        let mut attributes = vec![
            KeyValue::new("http.request.method", method.to_string()),
            KeyValue::new("peer.service", self.identity.name.clone()),
        ];
        if let Ok(parsed) = Url::parse(url) {
            attributes.push(KeyValue::new("url.path", parsed.path().to_string()));
            attributes.push(KeyValue::new("url.scheme", parsed.scheme().to_string()));
            if let Some(host) = parsed.host_str() {
                attributes.push(KeyValue::new("server.address", host.to_string()));
            }
        }

        let span = start_span(
            format!("HTTP {method}"),
            SpanOptions::new()
                .with_kind(SpanKind::Client)
                .with_attributes(attributes),
        );
        let cx = Context::current_with_span(span);

        let mut headers = http::HeaderMap::new();
        inject_cx_into_headers(&cx, &mut headers);
        if let Some(correlation_id) = current_correlation_id() {
            if let Ok(value) = http::HeaderValue::from_str(&correlation_id) {
                headers.insert(REQUEST_ID_HEADER, value);
            }
        }

        let mut request = self
            .client
            .request(method, url)
            .headers(headers)
            .timeout(self.timeout);
        if let Some(body) = body {
            request = request.json(body);
        }

        let result = request.send().await;
        let span = cx.span();
        match &result {
            Ok(response) => {
                let status = response.status();
                span.set_attribute(KeyValue::new(
                    "http.response.status_code",
                    i64::from(status.as_u16()),
                ));
                span.set_attribute(KeyValue::new(
                    "http.response.size_class",
                    size_class(response.content_length()),
                ));
                if status.is_server_error() {
                    span.set_status(Status::error("server error"));
                } else if status.is_client_error() {
                    span.set_status(Status::error("client error"));
                } else {
                    span.set_status(Status::Ok);
                }
            }
            Err(err) => {
                record_exception(&span, err);
                span.set_status(Status::error(err.to_string()));
            }
        }
        span.end();
        result
    }
}
