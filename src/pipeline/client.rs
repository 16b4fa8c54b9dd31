//! Authenticated, traced HTTP client for the photo API and image host.
//!
//! # Responsibilities
//! - Build GET requests carrying the API key header
//! - Open an HTTP client span per call and propagate it via `traceparent`
//! - Bound every call with the outbound deadline
//!
//! No retries: a failed call is terminal for the request.

use std::time::Duration;

use axum::http::{HeaderName, HeaderValue};

use crate::config::{PhotoApiConfig, TimeoutConfig};
use crate::observability::{metrics, propagation, SpanKind, TraceContext, TraceSpan, Tracer};
use crate::pipeline::error::{PipelineError, PipelineResult};

/// A response whose client span is still open.
///
/// The caller finishes `span` once it has consumed the body.
#[derive(Debug)]
pub struct TracedResponse {
    pub response: reqwest::Response,
    pub span: TraceSpan,
}

/// Client for the photo search API and the hosts serving its images.
#[derive(Clone)]
pub struct PhotoApi {
    http: reqwest::Client,
    search_url: String,
    api_key: Option<(HeaderName, HeaderValue)>,
    tracer: Tracer,
}

impl PhotoApi {
    /// Create a new client.
    pub fn new(config: &PhotoApiConfig, timeouts: &TimeoutConfig, tracer: Tracer) -> PipelineResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeouts.outbound_secs))
            .build()
            .map_err(|e| PipelineError::RequestBuild(e.to_string()))?;

        let api_key = if config.api_key.is_empty() {
            None
        } else {
            let name = HeaderName::from_bytes(config.api_key_header.as_bytes())
                .map_err(|e| PipelineError::RequestBuild(format!("invalid API key header: {}", e)))?;
            let mut value = HeaderValue::from_str(&config.api_key)
                .map_err(|e| PipelineError::RequestBuild(format!("invalid API key: {}", e)))?;
            value.set_sensitive(true);
            Some((name, value))
        };

        Ok(Self {
            http,
            search_url: config.search_url.clone(),
            api_key,
            tracer,
        })
    }

    pub fn tracer(&self) -> &Tracer {
        &self.tracer
    }

    pub fn search_url(&self) -> &str {
        &self.search_url
    }

    /// Build an authenticated GET for `url`.
    pub fn get(&self, url: &str) -> PipelineResult<reqwest::Request> {
        let mut builder = self.http.get(url);
        if let Some((name, value)) = &self.api_key {
            builder = builder.header(name.clone(), value.clone());
        }
        builder
            .build()
            .map_err(|e| PipelineError::RequestBuild(e.to_string()))
    }

    /// Execute `request` under a new HTTP client span.
    ///
    /// On error the client span is tagged and finished here; on success it is
    /// returned open inside the `TracedResponse`.
    pub async fn execute(
        &self,
        ctx: &TraceContext,
        target: &'static str,
        mut request: reqwest::Request,
    ) -> PipelineResult<TracedResponse> {
        let url = request.url().to_string();
        let (_, span) = self
            .tracer
            .start_span(ctx, format!("HTTP {}", request.method()), SpanKind::Client);
        span.set_tag("span.kind", "client");
        span.set_tag("component", "net/http");
        span.set_tag("http.method", request.method().as_str());
        span.set_tag("http.url", url.clone());
        propagation::inject(&span, request.headers_mut());

        let response = match self.http.execute(request).await {
            Ok(response) => response,
            Err(e) => {
                metrics::record_upstream(target, 0);
                span.set_tag("error", true);
                span.log_kv("event", "error");
                span.log_kv("error.object", e.to_string());
                span.finish();
                return Err(PipelineError::Transport(e));
            }
        };

        let status = response.status();
        metrics::record_upstream(target, status.as_u16());
        span.set_tag("http.status_code", status.as_u16());
        if !status.is_success() {
            span.set_tag("error", true);
            span.finish();
            return Err(PipelineError::UpstreamStatus {
                url,
                status: status.as_u16(),
            });
        }

        Ok(TracedResponse { response, span })
    }
}

impl std::fmt::Debug for PhotoApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhotoApi")
            .field("search_url", &self.search_url)
            .field("authenticated", &self.api_key.is_some())
            .finish()
    }
}
