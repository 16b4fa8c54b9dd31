//! Route handlers.

use std::time::Instant;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension,
};
use serde::Deserialize;

use crate::http::response::{Stage, StageError};
use crate::http::server::AppState;
use crate::observability::{metrics, TraceContext, Tracer};
use crate::pipeline::PipelineError;

pub const CAT_GREETING: &str = r#"
 /\_/\
( o.o )
 > ^ <
"#;

/// Query string of `/getHelloWorldCat`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnnotationQuery {
    pub annotation: Option<String>,
}

/// `GET /`
pub async fn index() -> &'static str {
    CAT_GREETING
}

/// `GET /getHelloWorldCat?annotation=<text>`
///
/// Responds `200` with a base64 PNG, or `500` naming the stage that failed.
pub async fn get_hello_world_cat(
    State(state): State<AppState>,
    Extension(ctx): Extension<TraceContext>,
    Query(query): Query<AnnotationQuery>,
) -> Response {
    let start = Instant::now();

    match annotate_random_photo(&state, &ctx, &query).await {
        Ok(payload) => {
            metrics::record_request("ok", start);
            (StatusCode::OK, payload).into_response()
        }
        Err(err) => {
            tracing::error!(stage = %err.stage, error = %err.source, "Request failed");
            let span = ctx.ambient_span();
            span.set_tag("failed.stage", err.stage.as_str());
            span.log_kv("error.object", err.source.to_string());
            metrics::record_request(err.stage.as_str(), start);
            err.into_response()
        }
    }
}

async fn annotate_random_photo(
    state: &AppState,
    ctx: &TraceContext,
    query: &AnnotationQuery,
) -> Result<String, StageError> {
    let photo = state
        .photo_api
        .fetch_photo_result(ctx)
        .await
        .map_err(StageError::at(Stage::FetchingSearchResult))?;
    tracing::debug!(url = %photo.url, width = photo.width, height = photo.height, "Photo selected");

    let image = state
        .photo_api
        .fetch_and_decode_image(ctx, &photo.url)
        .await
        .map_err(StageError::at(Stage::FetchingImage))?;

    let text = parse_annotation(&state.tracer, ctx, query, &state.fallback_text);

    let engine = state.engine.clone();
    let ctx = ctx.clone();
    tokio::task::spawn_blocking(move || engine.annotate(&ctx, image, &text))
        .await
        .unwrap_or_else(|e| Err(PipelineError::Task(e.to_string())))
        .map_err(StageError::at(Stage::Annotating))
}

/// The requested annotation, or `fallback` when missing or empty.
pub fn parse_annotation(tracer: &Tracer, ctx: &TraceContext, query: &AnnotationQuery, fallback: &str) -> String {
    let (_, span) = tracer.start_local_span(ctx, "parse_annotation");
    let text = match query.annotation.as_deref() {
        Some(text) if !text.is_empty() => text.to_string(),
        _ => {
            span.log_event("could not find annotation param, falling back to default");
            fallback.to_string()
        }
    };
    span.finish();
    text
}
