//! Shared HTTP plumbing: deadlines, retries and failure classification.
//!
//! Every upstream call goes through [`HttpSource`], which guarantees that
//! whatever happens on the wire comes back as one of the three
//! [`AdapterError`] kinds.

use opentelemetry::trace::TraceContextExt;
use portalconf::{AdapterConfig, RetryPolicy};
use reqwest::header::ACCEPT;
use serde_json::Value;
use std::future::Future;
use std::time::Duration;
use switchboard::AdapterError;
use thiserror::Error;
use tracing::{debug, warn};
use tracing_opentelemetry::OpenTelemetrySpanExt;

pub const ACCEPT_JSON: &str = "application/json";
pub const ACCEPT_TEXT: &str = "text/plain, text/html; q=0.9, */*; q=0.8";

#[derive(Debug, Error)]
pub enum SourceBuildError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// An HTTP client bound to one adapter's configuration.
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: reqwest::Client,
    config: AdapterConfig,
}

impl HttpSource {
    pub fn new(config: AdapterConfig) -> Result<Self, SourceBuildError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("dataportal/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    /// Join `path` onto the configured base URL.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base(), path.trim_start_matches('/'))
    }

    /// GET `url` and decode the body as JSON.
    pub async fn get_json(&self, url: &str, query: &QueryParams) -> Result<Value, AdapterError> {
        let body = self.get(url, query, ACCEPT_JSON).await?;
        serde_json::from_str(&body).map_err(|e| {
            debug!(url, error = %e, "upstream body is not JSON");
            AdapterError::Unavailable("upstream returned an undecodable body".to_string())
        })
    }

    /// GET `url` and return the body as text.
    pub async fn get_text(&self, url: &str, accept: &str) -> Result<String, AdapterError> {
        self.get(url, &QueryParams::new(), accept).await
    }

    async fn get(&self, url: &str, query: &QueryParams, accept: &str) -> Result<String, AdapterError> {
        let deadline = self.config.timeout();
        debug!(url, params = ?query.pairs(), "upstream request");
        with_deadline(
            deadline,
            retry(&self.config.retry, || self.attempt(url, query, accept)),
        )
        .await
    }

    async fn attempt(&self, url: &str, query: &QueryParams, accept: &str) -> Result<String, AdapterError> {
        let deadline = self.config.timeout();
        let mut request = self
            .client
            .get(url)
            .query(query.pairs())
            .header(ACCEPT, accept);
        if let Some(token) = &self.config.token {
            request = request.bearer_auth(token.expose());
        }
        let request = inject_trace_context(request);

        let response = request
            .send()
            .await
            .map_err(|e| classify_transport(e, deadline))?;

        let status = response.status();
        if status.is_client_error() {
            return Err(AdapterError::InvalidRequest(format!("HTTP {status}")));
        }
        if !status.is_success() {
            return Err(AdapterError::Unavailable(format!("HTTP {status}")));
        }

        response
            .text()
            .await
            .map_err(|e| classify_transport(e, deadline))
    }
}

/// Turn a transport error into a failure kind without leaking its text.
fn classify_transport(err: reqwest::Error, deadline: Duration) -> AdapterError {
    debug!(error = %err, "upstream transport error");
    if err.is_timeout() {
        AdapterError::Timeout(deadline)
    } else if err.is_connect() {
        AdapterError::Unavailable("could not connect to upstream".to_string())
    } else if err.is_body() || err.is_decode() {
        AdapterError::Unavailable("failed to read upstream response".to_string())
    } else {
        AdapterError::Unavailable("upstream request failed".to_string())
    }
}

// Propagate the current trace to the upstream via `traceparent`.
fn inject_trace_context(builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
    let span = tracing::Span::current();
    let context = span.context();
    let ctx_span = context.span();
    let span_context = ctx_span.span_context();

    if span_context.is_valid() {
        let flags = if span_context.is_sampled() { "01" } else { "00" };
        let traceparent = format!(
            "00-{}-{}-{}",
            span_context.trace_id(),
            span_context.span_id(),
            flags
        );
        builder.header("traceparent", traceparent)
    } else {
        builder
    }
}

/// Bound `fut` by `deadline`; expiry drops it and reports a timeout.
pub async fn with_deadline<T, Fut>(deadline: Duration, fut: Fut) -> Result<T, AdapterError>
where
    Fut: Future<Output = Result<T, AdapterError>>,
{
    match tokio::time::timeout(deadline, fut).await {
        Ok(result) => result,
        Err(_) => Err(AdapterError::Timeout(deadline)),
    }
}

/// Re-run `op` on retriable failures, backing off between attempts.
pub async fn retry<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T, AdapterError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AdapterError>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Err(err) if err.retriable() && attempt < policy.max_retries => {
                attempt += 1;
                let delay = policy.backoff(attempt);
                warn!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "retrying upstream call: {err}"
                );
                tokio::time::sleep(delay).await;
            }
            other => return other,
        }
    }
}

/// Query parameters with blank values dropped and the rest trimmed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryParams(Vec<(&'static str, String)>);

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: &'static str, value: impl ToString) -> Self {
        self.push(key, Some(value.to_string()));
        self
    }

    pub fn set_opt<V: ToString>(mut self, key: &'static str, value: Option<V>) -> Self {
        self.push(key, value.map(|v| v.to_string()));
        self
    }

    fn push(&mut self, key: &'static str, value: Option<String>) {
        if let Some(value) = value {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                self.0.push((key, trimmed.to_string()));
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn pairs(&self) -> &[(&'static str, String)] {
        &self.0
    }
}
