//! Rasterization with `imageproc` and an `ab_glyph` font.

use std::path::{Path, PathBuf};

use ab_glyph::{FontVec, PxScale};
use image::{Rgb, RgbImage};
use tracing::{debug, info};

use crate::error::{MailcloudError, Result};

use super::frequency::WordFrequencies;
use super::layout::{layout, TextMeasure};
use super::CloudOptions;

/// Fonts tried, in order, when none is configured.
const SYSTEM_FONTS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation-sans/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// A loaded outline font.
pub struct FontFace {
    font: FontVec,
    path: PathBuf,
}

impl FontFace {
    /// Load a TrueType/OpenType file.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read(path).map_err(|e| MailcloudError::io(path, e))?;
        let font =
            FontVec::try_from_vec(data).map_err(|_| MailcloudError::InvalidFont(path.to_path_buf()))?;
        debug!(path = %path.display(), "Loaded font");
        Ok(Self {
            font,
            path: path.to_path_buf(),
        })
    }

    /// Load the configured font, or the first system font that exists.
    pub fn discover(configured: Option<&Path>) -> Result<Self> {
        if let Some(path) = configured {
            return Self::load(path);
        }
        SYSTEM_FONTS
            .iter()
            .map(Path::new)
            .find(|p| p.exists())
            .map(Self::load)
            .unwrap_or_else(|| Err(MailcloudError::FontNotFound(SYSTEM_FONTS.join(", "))))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TextMeasure for FontFace {
    fn measure(&self, text: &str, size: f32) -> (u32, u32) {
        imageproc::drawing::text_size(PxScale::from(size), &self.font, text)
    }
}

/// Draw the cloud into a new in-memory image.
///
/// Nothing is written to disk; saving or showing the image is up to the caller.
/// An empty frequency map gives a plain background.
pub fn render(freqs: &WordFrequencies, options: &CloudOptions, font: &FontFace) -> RgbImage {
    let mut image = RgbImage::from_pixel(
        options.layout.width,
        options.layout.height,
        Rgb(options.background),
    );

    let placed = layout(freqs, &options.layout, font);
    let min_count = placed.iter().map(|p| p.count).min().unwrap_or(0);
    let max_count = placed.iter().map(|p| p.count).max().unwrap_or(0);
    let margin = options.layout.margin as i32;

    for word in &placed {
        let color = options.gradient.for_count(word.count, min_count, max_count);
        imageproc::drawing::draw_text_mut(
            &mut image,
            Rgb(color),
            word.x as i32 + margin,
            word.y as i32 + margin,
            PxScale::from(word.size),
            &font.font,
            &word.word,
        );
    }

    info!(
        words = placed.len(),
        width = options.layout.width,
        height = options.layout.height,
        "Rendered word cloud"
    );
    image
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::frequency::word_frequencies;
    use crate::cloud::stopwords::StopWords;

    #[test]
    fn test_missing_font_file() {
        let err = FontFace::load(Path::new("/nonexistent/font.ttf")).err().unwrap();
        assert!(matches!(err, MailcloudError::Io { .. }));
    }

    #[test]
    fn test_invalid_font_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("bogus.ttf");
        std::fs::write(&path, b"not a font").unwrap();
        let err = FontFace::load(&path).err().unwrap();
        assert!(matches!(err, MailcloudError::InvalidFont(_)));
    }

    #[test]
    fn test_render_with_system_font() {
        // Only runs where a common system font is installed.
        let Ok(font) = FontFace::discover(None) else {
            return;
        };
        let options = CloudOptions::default();
        let freqs = word_frequencies(["budget budget review", "team offsite"], &StopWords::standard());
        let image = render(&freqs, &options, &font);
        assert_eq!(image.dimensions(), (800, 400));
        let background = Rgb(options.background);
        assert!(image.pixels().any(|p| *p != background));
    }

    #[test]
    fn test_render_empty_is_blank() {
        let Ok(font) = FontFace::discover(None) else {
            return;
        };
        let options = CloudOptions::default();
        let image = render(&WordFrequencies::default(), &options, &font);
        let background = Rgb(options.background);
        assert!(image.pixels().all(|p| *p == background));
    }
}
