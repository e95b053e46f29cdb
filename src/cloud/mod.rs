//! Word cloud of subject lines: stopword filtering, counting, layout, and
//! rasterization with a two-color gradient.

pub mod frequency;
pub mod layout;
pub mod render;
pub mod stopwords;

use crate::config::CloudConfig;

use self::layout::LayoutOptions;
use self::stopwords::StopWords;

/// Linear RGB interpolation between two fixed colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gradient {
    /// Color at the low end of the frequency range.
    pub start: [u8; 3],
    /// Color at the high end.
    pub end: [u8; 3],
}

impl Gradient {
    /// Color at position `t` in `[0, 1]` (clamped).
    pub fn at(&self, t: f32) -> [u8; 3] {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        let mix = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
        [
            mix(self.start[0], self.end[0]),
            mix(self.start[1], self.end[1]),
            mix(self.start[2], self.end[2]),
        ]
    }

    /// Color for `count` within `[min, max]`. A flat range maps to the end color.
    pub fn for_count(&self, count: usize, min: usize, max: usize) -> [u8; 3] {
        if max <= min {
            return self.end;
        }
        self.at((count.saturating_sub(min)) as f32 / (max - min) as f32)
    }
}

/// Everything the renderer needs besides the font.
#[derive(Debug, Clone)]
pub struct CloudOptions {
    pub layout: LayoutOptions,
    pub background: [u8; 3],
    pub gradient: Gradient,
    pub stopwords: StopWords,
}

impl CloudOptions {
    pub fn from_config(config: &CloudConfig) -> Self {
        Self {
            layout: LayoutOptions {
                width: config.width,
                height: config.height,
                max_words: config.max_words,
                max_font_size: config.max_font_size,
                min_font_size: config.min_font_size,
                font_step: config.font_step,
                margin: config.margin,
            },
            background: config.background,
            gradient: Gradient {
                start: config.gradient_start,
                end: config.gradient_end,
            },
            stopwords: StopWords::standard().with_extra(&config.extra_stopwords),
        }
    }
}

impl Default for CloudOptions {
    fn default() -> Self {
        Self::from_config(&CloudConfig::default())
    }
}
