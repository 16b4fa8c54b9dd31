//! Request tracer: span creation, annotation and completion.
//!
//! # Responsibilities
//! - Create spans for the inbound request, outbound calls and pipeline steps
//! - Carry the active span through each request as a `TraceContext`
//! - End every owned span exactly once, including spans whose future is dropped
//!
//! # Design Decisions
//! - The tracer wraps an injected OpenTelemetry provider, never the global one
//! - Step spans are gated by the verbosity flag; request and HTTP spans are not
//! - `finish` consumes the handle; dropping an unfinished owned span ends it as cancelled

use std::fmt;
use std::sync::Arc;

use opentelemetry::trace::{
    SpanBuilder, SpanContext, SpanKind, Status, TraceContextExt, Tracer as _, TracerProvider as _,
};
use opentelemetry::{Context, KeyValue, Value};
use opentelemetry_sdk::trace::{SdkTracer, SdkTracerProvider};

/// Value attached to a span tag.
#[derive(Debug, Clone, PartialEq)]
pub enum TagValue {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl From<bool> for TagValue {
    fn from(v: bool) -> Self {
        TagValue::Bool(v)
    }
}

impl From<u16> for TagValue {
    fn from(v: u16) -> Self {
        TagValue::Int(v.into())
    }
}

impl From<&str> for TagValue {
    fn from(v: &str) -> Self {
        TagValue::Str(v.to_string())
    }
}

impl From<String> for TagValue {
    fn from(v: String) -> Self {
        TagValue::Str(v)
    }
}

impl From<TagValue> for Value {
    fn from(v: TagValue) -> Self {
        match v {
            TagValue::Bool(v) => Value::Bool(v),
            TagValue::Int(v) => Value::I64(v),
            TagValue::Str(v) => Value::from(v),
        }
    }
}

/// Handle to one traced operation.
///
/// A handle either owns its span (it was created by a `start_*` call and must be
/// finished) or borrows the ambient span of a context, in which case `finish` is a
/// no-op. Annotations go to the underlying span either way; on a context without
/// a recording span they are dropped.
pub struct TraceSpan {
    cx: Context,
    /// Operation name, present while this handle still has to end the span.
    owner: Option<String>,
}

impl TraceSpan {
    /// Identity of the underlying span. Invalid when there is no span.
    pub fn span_context(&self) -> SpanContext {
        self.cx.span().span_context().clone()
    }

    pub(crate) fn otel_context(&self) -> &Context {
        &self.cx
    }

    pub fn set_tag(&self, key: &str, value: impl Into<TagValue>) {
        let value: TagValue = value.into();
        self.cx
            .span()
            .set_attribute(KeyValue::new(key.to_string(), Value::from(value)));
    }

    /// Record a free-form event.
    pub fn log_event(&self, event: impl Into<String>) {
        let event: String = event.into();
        self.cx.span().add_event(event, Vec::new());
    }

    /// Record a single key/value pair as an event named after the key.
    pub fn log_kv(&self, key: &str, value: impl Into<String>) {
        let value: String = value.into();
        self.cx
            .span()
            .add_event(key.to_string(), vec![KeyValue::new(key.to_string(), value)]);
    }

    /// Record an error: adds an `exception` event, sets `error=true` and the error status.
    pub fn record_error(&self, error: &dyn std::error::Error) {
        let span = self.cx.span();
        let message = error.to_string();
        span.add_event(
            "exception",
            vec![KeyValue::new("exception.message", message.clone())],
        );
        span.set_attribute(KeyValue::new("error", true));
        span.set_status(Status::error(message));
    }

    /// Complete the span. Only owned handles end it.
    pub fn finish(mut self) {
        if let Some(operation) = self.owner.take() {
            self.end(&operation);
        }
    }

    fn end(&self, operation: &str) {
        let span = self.cx.span();
        let context = span.span_context();
        tracing::debug!(
            trace_id = %context.trace_id(),
            span_id = %context.span_id(),
            operation,
            "Span finished"
        );
        span.end();
    }
}

impl Drop for TraceSpan {
    fn drop(&mut self) {
        // Reached when the owning future is cancelled (deadline, client gone).
        if let Some(operation) = self.owner.take() {
            let span = self.cx.span();
            span.set_attribute(KeyValue::new("error", true));
            span.set_attribute(KeyValue::new("cancelled", true));
            span.set_status(Status::error("cancelled before completion"));
            tracing::debug!(operation = %operation, "Span dropped unfinished, ending as cancelled");
            self.end(&operation);
        }
    }
}

impl fmt::Debug for TraceSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TraceSpan")
            .field("operation", &self.owner)
            .field("context", &self.span_context())
            .finish()
    }
}

/// Per-request tracing context.
///
/// Holds the active span (if one is open in this request) or the remote parent
/// extracted from an inbound `traceparent` header.
#[derive(Debug, Clone, Default)]
pub struct TraceContext {
    cx: Context,
}

impl TraceContext {
    /// A context with no span and no parent.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A context continuing a trace started by a remote caller.
    pub fn from_remote(parent: SpanContext) -> Self {
        Self {
            cx: Context::new().with_remote_span_context(parent),
        }
    }

    /// A non-owning handle to the active span.
    pub fn ambient_span(&self) -> TraceSpan {
        TraceSpan {
            cx: self.cx.clone(),
            owner: None,
        }
    }
}

/// Cheap, clonable tracer handle.
#[derive(Clone)]
pub struct Tracer {
    inner: Arc<TracerInner>,
}

struct TracerInner {
    verbose: bool,
    tracer: SdkTracer,
    provider: SdkTracerProvider,
}

impl Tracer {
    pub fn new(verbose: bool, provider: SdkTracerProvider) -> Self {
        let tracer = provider.tracer(env!("CARGO_PKG_NAME"));
        Self {
            inner: Arc::new(TracerInner {
                verbose,
                tracer,
                provider,
            }),
        }
    }

    /// A tracer whose spans go nowhere.
    pub fn noop() -> Self {
        Self::new(false, SdkTracerProvider::builder().build())
    }

    /// Whether pipeline steps get their own spans.
    pub fn is_verbose(&self) -> bool {
        self.inner.verbose
    }

    /// Start a span unconditionally as a child of `parent`'s active span.
    pub fn start_span(
        &self,
        parent: &TraceContext,
        operation: impl Into<String>,
        kind: SpanKind,
    ) -> (TraceContext, TraceSpan) {
        let operation = operation.into();
        let builder = SpanBuilder::from_name(operation.clone()).with_kind(kind);
        let span = self.inner.tracer.build_with_context(builder, &parent.cx);
        let cx = parent.cx.with_span(span);
        (
            TraceContext { cx: cx.clone() },
            TraceSpan {
                cx,
                owner: Some(operation),
            },
        )
    }

    /// Start a span for a pipeline step.
    ///
    /// When verbose, creates an internal child span named `operation`. Otherwise
    /// returns the context unchanged with a non-owning handle to its ambient span.
    /// Callers finish the returned span exactly once either way.
    pub fn start_local_span(
        &self,
        ctx: &TraceContext,
        operation: &str,
    ) -> (TraceContext, TraceSpan) {
        if self.inner.verbose {
            self.start_span(ctx, operation, SpanKind::Internal)
        } else {
            (ctx.clone(), ctx.ambient_span())
        }
    }

    /// Flush queued spans and stop the exporter. Blocks until the exporter is done.
    pub fn shutdown(&self) {
        if let Err(e) = self.inner.provider.shutdown() {
            tracing::warn!(error = %e, "Span exporter shutdown failed");
        }
    }
}

impl fmt::Debug for Tracer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tracer")
            .field("verbose", &self.inner.verbose)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::testing::{recording_tracer, SpanDataExt};
    use opentelemetry::trace::{SpanId, TraceFlags, TraceId, TraceState};

    fn remote(trace: &str, span: &str) -> SpanContext {
        SpanContext::new(
            TraceId::from_hex(trace).unwrap(),
            SpanId::from_hex(span).unwrap(),
            TraceFlags::SAMPLED,
            true,
            TraceState::default(),
        )
    }

    #[test]
    fn test_start_span_links_parent() {
        let (tracer, recorder) = recording_tracer(false);
        let (ctx, root) = tracer.start_span(&TraceContext::empty(), "root", SpanKind::Server);
        let (_, child) = tracer.start_span(&ctx, "child", SpanKind::Client);
        child.finish();
        root.finish();

        let spans = recorder.spans();
        assert_eq!(recorder.names(), vec!["child", "root"]);
        assert_eq!(spans[0].span_context.trace_id(), spans[1].span_context.trace_id());
        assert_eq!(spans[0].parent_span_id, spans[1].span_context.span_id());
        assert_eq!(spans[1].parent_span_id, SpanId::INVALID);
        assert_eq!(spans[0].span_kind, SpanKind::Client);
    }

    #[test]
    fn test_local_span_created_when_verbose() {
        let (tracer, recorder) = recording_tracer(true);
        let (ctx, root) = tracer.start_span(&TraceContext::empty(), "request", SpanKind::Server);
        let (_, step) = tracer.start_local_span(&ctx, "fetch_photo_result");
        step.set_tag("error", true);
        step.finish();
        root.finish();

        assert_eq!(recorder.names(), vec!["fetch_photo_result", "request"]);
        assert!(recorder.spans()[0].is_error());
        assert_eq!(recorder.spans()[0].span_kind, SpanKind::Internal);
    }

    #[test]
    fn test_local_span_reuses_ambient_when_quiet() {
        let (tracer, recorder) = recording_tracer(false);
        let (ctx, root) = tracer.start_span(&TraceContext::empty(), "request", SpanKind::Server);
        let (step_ctx, step) = tracer.start_local_span(&ctx, "fetch_photo_result");
        assert_eq!(step.span_context(), root.span_context());
        assert_eq!(
            step_ctx.ambient_span().span_context(),
            ctx.ambient_span().span_context()
        );

        step.log_event("on the ambient span");
        step.finish();
        assert!(recorder.spans().is_empty(), "borrowed finish must not end the span");

        root.finish();
        let spans = recorder.spans();
        assert_eq!(spans.len(), 1);
        assert!(spans[0].has_event("on the ambient span"));
    }

    #[test]
    fn test_local_span_without_ambient_is_noop() {
        let (tracer, recorder) = recording_tracer(false);
        let (_, span) = tracer.start_local_span(&TraceContext::empty(), "annotate");
        assert!(!span.span_context().is_valid());
        span.set_tag("error", true);
        span.finish();
        assert!(recorder.spans().is_empty());
    }

    #[test]
    fn test_remote_parent_continues_trace() {
        let (tracer, recorder) = recording_tracer(false);
        let parent = remote("4bf92f3577b34da6a3ce929d0e0e4736", "00f067aa0ba902b7");
        let (_, span) = tracer.start_span(&TraceContext::from_remote(parent), "request", SpanKind::Server);
        span.finish();

        let span = &recorder.spans()[0];
        assert_eq!(span.span_context.trace_id(), TraceId::from_hex("4bf92f3577b34da6a3ce929d0e0e4736").unwrap());
        assert_eq!(span.parent_span_id, SpanId::from_hex("00f067aa0ba902b7").unwrap());
        assert!(span.parent_span_is_remote);
    }

    #[test]
    fn test_record_error_tags_and_logs() {
        let (tracer, recorder) = recording_tracer(true);
        let (_, span) = tracer.start_span(&TraceContext::empty(), "op", SpanKind::Internal);
        let err = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        span.record_error(&err);
        span.finish();

        let span = &recorder.spans()[0];
        assert!(span.is_error());
        assert!(matches!(span.status, Status::Error { .. }));
        assert_eq!(span.event_value("exception.message").as_deref(), Some("boom"));
    }

    #[test]
    fn test_tag_values_keep_their_type() {
        let (tracer, recorder) = recording_tracer(false);
        let (_, span) = tracer.start_span(&TraceContext::empty(), "op", SpanKind::Server);
        span.set_tag("http.status_code", 200u16);
        span.set_tag("component", "net/http");
        span.finish();

        let span = &recorder.spans()[0];
        assert_eq!(span.attr("http.status_code"), Some(&Value::I64(200)));
        assert_eq!(span.attr("component"), Some(&Value::from("net/http")));
    }

    #[test]
    fn test_dropped_span_ends_as_cancelled() {
        let (tracer, recorder) = recording_tracer(true);
        let (_, span) = tracer.start_span(&TraceContext::empty(), "interrupted", SpanKind::Internal);
        span.log_event("started");
        drop(span);

        let spans = recorder.spans();
        assert_eq!(spans.len(), 1);
        assert!(spans[0].is_error());
        assert_eq!(spans[0].attr("cancelled"), Some(&Value::Bool(true)));
        assert!(spans[0].has_event("started"));
    }

    #[test]
    fn test_finished_span_is_not_cancelled() {
        let (tracer, recorder) = recording_tracer(true);
        let (_, span) = tracer.start_span(&TraceContext::empty(), "done", SpanKind::Internal);
        span.finish();

        let spans = recorder.spans();
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].attr("cancelled"), None);
        assert!(!spans[0].is_error());
    }
}
