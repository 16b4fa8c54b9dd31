//! Photo annotation pipeline.
//!
//! # Data Flow
//! ```text
//! TraceContext (from the request)
//!     → client.rs + search.rs (GET search endpoint → first PhotoSearchResult)
//!     → client.rs + decoder.rs (GET photo URL → DecodedImage)
//!     → annotate.rs (draw text with the shared FontAsset → PNG → base64)
//! ```
//!
//! # Design Decisions
//! - Stages run strictly in sequence; the image URL comes from the search
//! - Every stage returns a typed `PipelineError`; nothing panics on bad input
//! - Each traced step finishes its own span on every exit path

pub mod annotate;
pub mod client;
pub mod decoder;
pub mod error;
pub mod font;
pub mod search;

pub use annotate::{AnnotationEngine, DrawingContext, TextAnchor};
pub use client::{PhotoApi, TracedResponse};
pub use decoder::{decode_image, DecodedImage, PixelBuffer};
pub use error::{PipelineError, PipelineResult};
pub use font::{FontAsset, FontError};
pub use search::{parse_search_response, PhotoSearchResult};
