//! Process-wide font used for annotations.

use std::path::{Path, PathBuf};

use ab_glyph::{Font, FontArc, InvalidFont, PxScale, ScaleFont};
use thiserror::Error;

/// Errors loading the annotation font.
#[derive(Debug, Error)]
pub enum FontError {
    #[error("could not read font file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse font file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: InvalidFont,
    },
}

/// An immutable, cheaply clonable font shared by every request.
#[derive(Clone)]
pub struct FontAsset {
    font: FontArc,
    path: PathBuf,
}

impl FontAsset {
    /// Read and parse the font at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, FontError> {
        let path = path.as_ref().to_path_buf();
        let bytes = std::fs::read(&path).map_err(|source| FontError::Read {
            path: path.clone(),
            source,
        })?;
        let font = FontArc::try_from_vec(bytes).map_err(|source| FontError::Parse {
            path: path.clone(),
            source,
        })?;
        Ok(Self { font, path })
    }

    pub fn font(&self) -> &FontArc {
        &self.font
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Scale at which one em spans `px_per_em` pixels.
    pub fn scale_for_em(&self, px_per_em: f32) -> PxScale {
        match self.font.units_per_em() {
            Some(units) => PxScale::from(px_per_em * self.font.height_unscaled() / units),
            None => PxScale::from(px_per_em),
        }
    }

    /// Ascent in pixels at `scale`.
    pub fn ascent(&self, scale: PxScale) -> f32 {
        self.font.as_scaled(scale).ascent()
    }

    /// Whether the font maps `c` to a real glyph.
    pub fn has_glyph(&self, c: char) -> bool {
        self.font.glyph_id(c).0 != 0
    }

    /// First printable character of `text` the font cannot render.
    pub fn first_missing_glyph(&self, text: &str) -> Option<char> {
        text.chars()
            .filter(|c| !c.is_whitespace() && !c.is_control())
            .find(|c| !self.has_glyph(*c))
    }
}

impl std::fmt::Debug for FontAsset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontAsset")
            .field("path", &self.path)
            .field("glyphs", &self.font.glyph_count())
            .finish()
    }
}
