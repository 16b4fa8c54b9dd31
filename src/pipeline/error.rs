//! Pipeline error definitions.

use image::ColorType;
use thiserror::Error;

/// Errors that can occur while producing an annotated photo.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The outbound request could not be built (bad URL, bad header).
    #[error("failed to build request: {0}")]
    RequestBuild(String),

    /// Connection, TLS or timeout failure talking to the upstream.
    #[error("failed to talk to external service: {0}")]
    Transport(#[source] reqwest::Error),

    /// The upstream answered with a non-success status.
    #[error("upstream {url} returned status {status}")]
    UpstreamStatus { url: String, status: u16 },

    /// The response body could not be read to completion.
    #[error("failed to read response body: {0}")]
    BodyRead(#[source] reqwest::Error),

    /// The search response was not a JSON array of photo records.
    #[error("failed to decode search response: {0}")]
    Json(#[from] serde_json::Error),

    /// The search response was a valid but empty array.
    #[error("search response contained no photos")]
    EmptyResponse,

    /// The image bytes could not be sniffed.
    #[error("failed to read image data: {0}")]
    ImageIo(#[source] std::io::Error),

    /// The image bytes were malformed or in an unsupported format.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[source] image::ImageError),

    /// The decoded pixel layout has no drawing path.
    #[error("unsupported pixel layout {0:?}")]
    UnsupportedLayout(ColorType),

    /// The font cannot render a character of the annotation.
    #[error("font has no glyph for {0:?}")]
    MissingGlyph(char),

    /// The annotated image could not be re-encoded.
    #[error("failed to encode image: {0}")]
    Encode(#[source] image::ImageError),

    /// The blocking rendering task panicked or was cancelled.
    #[error("rendering task failed: {0}")]
    Task(String),
}

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;
