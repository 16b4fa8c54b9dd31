//! Photo search: ask the API for a random photo and pick the first result.

use serde::{Deserialize, Serialize};

use crate::observability::{TraceContext, Tracer};
use crate::pipeline::client::{PhotoApi, TracedResponse};
use crate::pipeline::error::{PipelineError, PipelineResult};

/// One photo record returned by the search API.
///
/// Dimensions are informational; the decoded image is authoritative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoSearchResult {
    pub url: String,
    pub width: i64,
    pub height: i64,
}

impl PhotoApi {
    /// Fetch the search endpoint and return its first photo.
    pub async fn fetch_photo_result(&self, ctx: &TraceContext) -> PipelineResult<PhotoSearchResult> {
        let (ctx, span) = self.tracer().start_local_span(ctx, "fetch_photo_result");
        let result = self.search(&ctx).await;
        if let Err(e) = &result {
            span.log_event(e.to_string());
            span.set_tag("error", true);
        }
        span.finish();
        result
    }

    async fn search(&self, ctx: &TraceContext) -> PipelineResult<PhotoSearchResult> {
        let request = self.get(self.search_url())?;
        let TracedResponse { response, span: http_span } = self.execute(ctx, "search", request).await?;

        let body = match response.bytes().await {
            Ok(body) => body,
            Err(e) => {
                http_span.set_tag("error", true);
                http_span.finish();
                return Err(PipelineError::BodyRead(e));
            }
        };

        let result = parse_search_response(self.tracer(), ctx, &body);
        if let Ok(photo) = &result {
            http_span.log_kv("response", String::from_utf8_lossy(&body));
            http_span.log_kv("resource", format!("{:?}", photo));
        }
        http_span.finish();
        result
    }
}

/// Decode a search response body and take its first element.
///
/// Anything but a non-empty array of photo records is an error; extra elements
/// are ignored.
pub fn parse_search_response(
    tracer: &Tracer,
    ctx: &TraceContext,
    body: &[u8],
) -> PipelineResult<PhotoSearchResult> {
    let (_, span) = tracer.start_local_span(ctx, "parse_search_response");

    let result = serde_json::from_slice::<Vec<PhotoSearchResult>>(body)
        .map_err(PipelineError::from)
        .and_then(|photos| photos.into_iter().next().ok_or(PipelineError::EmptyResponse));

    if let Err(e) = &result {
        span.record_error(e);
    }
    span.finish();
    result
}
