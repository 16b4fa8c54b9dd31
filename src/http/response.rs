//! Response handling: mapping pipeline failures to client responses.
//!
//! # Responsibilities
//! - Name the stage of a request that failed
//! - Map stage failures to `500` with a short, stage-specific message
//!
//! # Design Decisions
//! - Error details never reach the client; they go to logs and the request span
//! - Every stage failure is terminal; later stages never run

use std::fmt;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::pipeline::PipelineError;

/// A fallible stage of the annotation request.
///
/// A request moves `FetchingSearchResult → FetchingImage → Annotating` and then
/// responds; failure at any stage ends it with that stage's message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    FetchingSearchResult,
    FetchingImage,
    Annotating,
}

impl Stage {
    /// Short label used in logs and metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::FetchingSearchResult => "search",
            Stage::FetchingImage => "image",
            Stage::Annotating => "annotate",
        }
    }

    /// Body of the `500` response for a failure at this stage.
    pub fn failure_message(self) -> &'static str {
        match self {
            Stage::FetchingSearchResult => "could not get cat api response",
            Stage::FetchingImage => "could not get cat image",
            Stage::Annotating => "could not annotate cat image",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A pipeline failure tagged with the stage it happened in.
#[derive(Debug, Error)]
#[error("{stage} stage failed: {source}")]
pub struct StageError {
    pub stage: Stage,
    #[source]
    pub source: PipelineError,
}

impl StageError {
    pub fn new(stage: Stage, source: PipelineError) -> Self {
        Self { stage, source }
    }

    /// Adapter for `map_err`.
    pub fn at(stage: Stage) -> impl FnOnce(PipelineError) -> Self {
        move |source| Self::new(stage, source)
    }
}

impl IntoResponse for StageError {
    fn into_response(self) -> Response {
        (StatusCode::INTERNAL_SERVER_ERROR, self.stage.failure_message()).into_response()
    }
}
