//! Per-request server span.
//!
//! Opens a span for every inbound request (continuing the caller's trace when a
//! `traceparent` header is present), exposes it to handlers as a `TraceContext`
//! extension, and finishes it once the response is ready.

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};

use crate::http::request::request_id;
use crate::observability::{propagation, SpanKind, TraceContext, Tracer};

pub async fn request_span(
    State(tracer): State<Tracer>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let parent = match propagation::extract(req.headers()) {
        Some(remote) => TraceContext::from_remote(remote),
        None => TraceContext::empty(),
    };

    let operation = format!("{} {}", req.method(), req.uri().path());
    let (ctx, span) = tracer.start_span(&parent, operation, SpanKind::Server);
    span.set_tag("span.kind", "server");
    span.set_tag("component", "net/http");
    span.set_tag("http.method", req.method().as_str());
    span.set_tag("http.url", req.uri().to_string());
    span.set_tag("request.id", request_id(req.headers()));

    req.extensions_mut().insert(ctx);
    let response = next.run(req).await;

    let status = response.status();
    span.set_tag("http.status_code", status.as_u16());
    if status.is_server_error() {
        span.set_tag("error", true);
    }
    span.finish();
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::testing::{recording_tracer, SpanDataExt, SpanRecorder};
    use axum::{http::StatusCode, routing::get, Extension, Router};
    use opentelemetry::trace::{SpanId, TraceId};
    use opentelemetry::Value;
    use tower::ServiceExt;

    fn app() -> (Router, SpanRecorder) {
        let (tracer, recorder) = recording_tracer(false);
        let router = Router::new()
            .route(
                "/ok",
                get(|Extension(ctx): Extension<TraceContext>| async move {
                    ctx.ambient_span().log_event("inside handler");
                    "ok"
                }),
            )
            .route("/fail", get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "nope") }))
            .layer(axum::middleware::from_fn_with_state(tracer, request_span));
        (router, recorder)
    }

    #[tokio::test]
    async fn test_server_span_wraps_handler() {
        let (app, recorder) = app();
        let response = app
            .oneshot(Request::get("/ok").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let span = recorder.find("GET /ok").unwrap();
        assert_eq!(span.attr("http.status_code"), Some(&Value::I64(200)));
        assert_eq!(span.attr("span.kind"), Some(&Value::from("server")));
        assert_eq!(span.span_kind, SpanKind::Server);
        assert!(span.has_event("inside handler"));
        assert!(!span.is_error());
    }

    #[tokio::test]
    async fn test_server_error_tags_span() {
        let (app, recorder) = app();
        app.oneshot(Request::get("/fail").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(recorder.find("GET /fail").unwrap().is_error());
    }

    #[tokio::test]
    async fn test_continues_remote_trace() {
        let (app, recorder) = app();
        let request = Request::get("/ok")
            .header("traceparent", "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01")
            .body(Body::empty())
            .unwrap();
        app.oneshot(request).await.unwrap();

        let span = recorder.find("GET /ok").unwrap();
        assert_eq!(
            span.span_context.trace_id(),
            TraceId::from_hex("4bf92f3577b34da6a3ce929d0e0e4736").unwrap()
        );
        assert_eq!(span.parent_span_id, SpanId::from_hex("00f067aa0ba902b7").unwrap());
    }

    #[tokio::test]
    async fn test_malformed_traceparent_starts_new_trace() {
        let (app, recorder) = app();
        let request = Request::get("/ok")
            .header("traceparent", "00-+bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01")
            .body(Body::empty())
            .unwrap();
        app.oneshot(request).await.unwrap();

        let span = recorder.find("GET /ok").unwrap();
        assert_eq!(span.parent_span_id, SpanId::INVALID);
    }
}
