//! W3C Trace Context propagation.
//!
//! # Responsibilities
//! - Extract trace context from incoming requests
//! - Propagate trace context to outbound requests
//!
//! Parsing and formatting belong to the SDK's `TraceContextPropagator`; this
//! module adapts `HeaderMap` to its carrier traits and rejects `traceparent`
//! values whose fields are not fixed-width lowercase hex.

use axum::http::{HeaderMap, HeaderName, HeaderValue};
use opentelemetry::propagation::{Extractor, Injector, TextMapPropagator};
use opentelemetry::trace::{SpanContext, TraceContextExt};
use opentelemetry_sdk::propagation::TraceContextPropagator;

use crate::observability::tracer::TraceSpan;

pub const TRACEPARENT: &str = "traceparent";

/// Field widths of `version-trace_id-parent_id-flags`.
const FIELD_WIDTHS: [usize; 4] = [2, 32, 16, 2];

/// Injects context into an outbound header map.
pub struct HeaderInjector<'a>(pub &'a mut HeaderMap);

impl Injector for HeaderInjector<'_> {
    fn set(&mut self, key: &str, value: String) {
        if let Ok(name) = HeaderName::try_from(key) {
            if let Ok(val) = HeaderValue::from_str(&value) {
                self.0.insert(name, val);
            }
        }
    }
}

/// Extracts context from an inbound header map.
pub struct HeaderExtractor<'a>(pub &'a HeaderMap);

impl Extractor for HeaderExtractor<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(|k| k.as_str()).collect()
    }
}

/// Read the caller's span identity from inbound headers.
pub fn extract(headers: &HeaderMap) -> Option<SpanContext> {
    let value = headers.get(TRACEPARENT)?.to_str().ok()?;
    if !is_well_formed(value) {
        return None;
    }
    let cx = TraceContextPropagator::new().extract(&HeaderExtractor(headers));
    let context = cx.span().span_context().clone();
    context.is_valid().then_some(context)
}

/// Write `span`'s identity into outbound headers. No-op for non-recording spans.
pub fn inject(span: &TraceSpan, headers: &mut HeaderMap) {
    TraceContextPropagator::new().inject_context(span.otel_context(), &mut HeaderInjector(headers));
}

fn is_well_formed(value: &str) -> bool {
    let fields: Vec<&str> = value.trim().split('-').collect();
    if fields.len() < FIELD_WIDTHS.len() {
        return false;
    }
    // Version 00 has exactly four fields.
    if fields[0] == "00" && fields.len() != FIELD_WIDTHS.len() {
        return false;
    }
    fields.iter().zip(FIELD_WIDTHS).all(|(field, width)| {
        field.len() == width && field.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
    })
}
