//! Annotation engine: draws text onto a decoded image and re-encodes it.
//!
//! # Responsibilities
//! - Pick a drawing path for the image's pixel layout
//! - Rasterize the annotation with the shared font
//! - Encode the result in the source format and base64 it
//!
//! # Design Decisions
//! - Layout dispatch is an exhaustive match; unknown layouts are an error,
//!   never converted or guessed
//! - Text is black and opaque, anchored at a fixed point from the top-left
//! - Pixels are mutated in place; no copy of the image is made

use std::io::Cursor;

use ab_glyph::PxScale;
use base64::{engine::general_purpose, Engine as _};
use image::{ImageBuffer, ImageFormat, Pixel, Rgb, Rgba};
use imageproc::drawing::draw_text_mut;

use crate::config::AnnotationConfig;
use crate::observability::{TraceContext, Tracer};
use crate::pipeline::decoder::{DecodedImage, PixelBuffer};
use crate::pipeline::error::{PipelineError, PipelineResult};
use crate::pipeline::font::FontAsset;

/// Where text is placed on the image, in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextAnchor {
    pub x: i32,
    /// Baseline of the first line: top margin plus the em size in pixels.
    pub baseline_y: i32,
}

/// Font, pixel buffer and ink bound together for drawing.
pub struct DrawingContext<'a, P: Pixel> {
    font: &'a FontAsset,
    scale: PxScale,
    ascent: f32,
    ink: P,
    dst: &'a mut ImageBuffer<P, Vec<u8>>,
}

impl<'a, P> DrawingContext<'a, P>
where
    P: Pixel<Subpixel = u8>,
{
    /// Draw `text` with its baseline starting at `anchor`.
    ///
    /// Glyph coverage outside the destination bounds is clipped.
    pub fn draw_string(&mut self, text: &str, anchor: TextAnchor) {
        let top = anchor.baseline_y - self.ascent.round() as i32;
        draw_text_mut(&mut *self.dst, self.ink, anchor.x, top, self.scale, self.font.font(), text);
    }
}

/// Draws annotations using the process-wide font.
#[derive(Debug, Clone)]
pub struct AnnotationEngine {
    font: FontAsset,
    scale: PxScale,
    em_px: f32,
    anchor_x: i32,
    anchor_top: i32,
    tracer: Tracer,
}

impl AnnotationEngine {
    pub fn new(font: FontAsset, config: &AnnotationConfig, tracer: Tracer) -> Self {
        let em_px = config.pixel_size();
        let scale = font.scale_for_em(em_px);
        Self {
            font,
            scale,
            em_px,
            anchor_x: config.anchor_x,
            anchor_top: config.anchor_top,
            tracer,
        }
    }

    /// The point the first glyph's baseline starts at.
    ///
    /// The baseline sits one em below the top margin, whatever the face's ascent.
    pub fn anchor(&self) -> TextAnchor {
        TextAnchor {
            x: self.anchor_x,
            baseline_y: self.anchor_top + self.em_px.round() as i32,
        }
    }

    /// Draw `text` onto `image` and return the re-encoded image as base64.
    pub fn annotate(&self, ctx: &TraceContext, image: DecodedImage, text: &str) -> PipelineResult<String> {
        let (ctx, span) = self.tracer.start_local_span(ctx, "annotate");
        let result = self.render(&ctx, image, text);
        if let Err(e) = &result {
            span.log_kv("error.object", e.to_string());
            span.set_tag("error", true);
        }
        span.finish();
        result
    }

    fn render(&self, ctx: &TraceContext, image: DecodedImage, text: &str) -> PipelineResult<String> {
        if let Some(c) = self.font.first_missing_glyph(text) {
            return Err(PipelineError::MissingGlyph(c));
        }

        let DecodedImage { format, mut pixels } = image;
        let anchor = self.anchor();
        match &mut pixels {
            PixelBuffer::Rgba8(buffer) => {
                self.drawing_context(ctx, "rgba8", buffer, Rgba([0, 0, 0, 255]))
                    .draw_string(text, anchor);
            }
            PixelBuffer::Rgb8(buffer) => {
                self.drawing_context(ctx, "rgb8", buffer, Rgb([0, 0, 0]))
                    .draw_string(text, anchor);
            }
            PixelBuffer::Unsupported(other) => {
                return Err(PipelineError::UnsupportedLayout(other.color()));
            }
        }

        let encoded = encode(&pixels, format)?;
        Ok(general_purpose::STANDARD.encode(encoded))
    }

    fn drawing_context<'a, P>(
        &'a self,
        ctx: &TraceContext,
        layout: &str,
        dst: &'a mut ImageBuffer<P, Vec<u8>>,
        ink: P,
    ) -> DrawingContext<'a, P>
    where
        P: Pixel<Subpixel = u8>,
    {
        let (_, span) = self.tracer.start_local_span(ctx, "build_drawing_context");
        span.set_tag("pixel.layout", layout);
        let context = DrawingContext {
            font: &self.font,
            scale: self.scale,
            ascent: self.font.ascent(self.scale),
            ink,
            dst,
        };
        span.finish();
        context
    }
}

fn encode(pixels: &PixelBuffer, format: ImageFormat) -> PipelineResult<Vec<u8>> {
    let mut out = Cursor::new(Vec::new());
    match pixels {
        PixelBuffer::Rgba8(buffer) => buffer.write_to(&mut out, format),
        PixelBuffer::Rgb8(buffer) => buffer.write_to(&mut out, format),
        PixelBuffer::Unsupported(other) => return Err(PipelineError::UnsupportedLayout(other.color())),
    }
    .map_err(PipelineError::Encode)?;
    Ok(out.into_inner())
}
