//! Image retrieval and decoding.
//!
//! Only PNG support is compiled into the `image` crate, so format sniffing
//! accepts PNG and rejects everything else as a decode error.

use std::io::Cursor;

use image::{ColorType, DynamicImage, ImageFormat, ImageReader, RgbImage, RgbaImage};

use crate::observability::TraceContext;
use crate::pipeline::client::{PhotoApi, TracedResponse};
use crate::pipeline::error::{PipelineError, PipelineResult};

/// Decoded pixels, tagged by in-memory layout.
///
/// `Rgba8` and `Rgb8` are the layouts the PNG decoder produces for colour
/// images and the only ones the annotation engine can draw on. Any other layout
/// is carried as `Unsupported` and rejected at annotation time.
#[derive(Debug, Clone)]
pub enum PixelBuffer {
    Rgba8(RgbaImage),
    Rgb8(RgbImage),
    Unsupported(DynamicImage),
}

impl From<DynamicImage> for PixelBuffer {
    fn from(image: DynamicImage) -> Self {
        match image {
            DynamicImage::ImageRgba8(buffer) => PixelBuffer::Rgba8(buffer),
            DynamicImage::ImageRgb8(buffer) => PixelBuffer::Rgb8(buffer),
            other => PixelBuffer::Unsupported(other),
        }
    }
}

impl PixelBuffer {
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            PixelBuffer::Rgba8(buffer) => buffer.dimensions(),
            PixelBuffer::Rgb8(buffer) => buffer.dimensions(),
            PixelBuffer::Unsupported(image) => (image.width(), image.height()),
        }
    }

    pub fn color_type(&self) -> ColorType {
        match self {
            PixelBuffer::Rgba8(_) => ColorType::Rgba8,
            PixelBuffer::Rgb8(_) => ColorType::Rgb8,
            PixelBuffer::Unsupported(image) => image.color(),
        }
    }
}

/// A decoded image and the container format it came from.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub format: ImageFormat,
    pub pixels: PixelBuffer,
}

impl DecodedImage {
    pub fn new(format: ImageFormat, pixels: impl Into<PixelBuffer>) -> Self {
        Self {
            format,
            pixels: pixels.into(),
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }
}

/// Sniff the format of `bytes` and decode them.
pub fn decode_image(bytes: &[u8]) -> PipelineResult<DecodedImage> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(PipelineError::ImageIo)?;
    let format = reader.format();
    // decode() fails with `Unsupported` when no format was recognised
    let image = reader.decode().map_err(PipelineError::ImageDecode)?;
    Ok(DecodedImage::new(format.unwrap_or(ImageFormat::Png), image))
}

impl PhotoApi {
    /// Download the image at `url` and decode it.
    pub async fn fetch_and_decode_image(&self, ctx: &TraceContext, url: &str) -> PipelineResult<DecodedImage> {
        let (ctx, span) = self.tracer().start_local_span(ctx, "fetch_and_decode_image");
        span.log_event(format!("getting cat image at {}", url));

        let request = match self.get(url) {
            Ok(request) => request,
            Err(e) => {
                span.log_event("failed to build request");
                span.finish();
                return Err(e);
            }
        };

        let TracedResponse { response, span: http_span } = match self.execute(&ctx, "image", request).await {
            Ok(traced) => traced,
            Err(e) => {
                span.log_event("failed to talk to external service");
                span.finish();
                return Err(e);
            }
        };

        let decoded = match response.bytes().await {
            Ok(body) => decode_image(&body),
            Err(e) => Err(PipelineError::BodyRead(e)),
        };
        http_span.finish();

        match decoded {
            Ok(image) => {
                let (width, height) = image.dimensions();
                span.log_kv("image.dimensions", format!("{}x{}", width, height));
                span.finish();
                Ok(image)
            }
            Err(e) => {
                span.log_kv("error.object", e.to_string());
                span.log_event("failed to decode body");
                span.finish();
                Err(e)
            }
        }
    }
}
