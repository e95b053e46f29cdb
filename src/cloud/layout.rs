//! Word placement: frequency-proportional sizes on an Archimedean spiral.
//!
//! Occupied pixels are tracked in a bitmap with a summed-area table, so
//! testing whether a rectangle is free costs four lookups.

use tracing::debug;

use super::frequency::WordFrequencies;

/// Measures rendered text. Implemented by the loaded font; tests use
/// fixed-width stand-ins.
pub trait TextMeasure {
    /// `(width, height)` in pixels of `text` at `size` pixels.
    fn measure(&self, text: &str, size: f32) -> (u32, u32);
}

/// Geometry and sizing options.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutOptions {
    pub width: u32,
    pub height: u32,
    pub max_words: usize,
    pub max_font_size: f32,
    pub min_font_size: f32,
    pub font_step: f32,
    pub margin: u32,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            width: 800,
            height: 400,
            max_words: 200,
            max_font_size: 96.0,
            min_font_size: 10.0,
            font_step: 2.0,
            margin: 2,
        }
    }
}

/// A word with its final size and bounding box (margin included).
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedWord {
    pub word: String,
    pub count: usize,
    pub size: f32,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PlacedWord {
    fn overlaps(&self, other: &PlacedWord) -> bool {
        self.x < other.x + other.width
            && other.x < self.x + self.width
            && self.y < other.y + other.height
            && other.y < self.y + self.height
    }
}

/// Radius growth per radian of the spiral, in pixels.
const SPIRAL_PITCH: f32 = 2.0;
/// Approximate distance between two candidate positions, in pixels.
const SPIRAL_STRIDE: f32 = 3.0;

/// Occupancy bitmap with a summed-area table.
struct Occupancy {
    width: usize,
    height: usize,
    used: Vec<bool>,
    /// `(width + 1) * (height + 1)` prefix sums.
    sums: Vec<u32>,
}

impl Occupancy {
    fn new(width: u32, height: u32) -> Self {
        let (w, h) = (width as usize, height as usize);
        Self {
            width: w,
            height: h,
            used: vec![false; w * h],
            sums: vec![0; (w + 1) * (h + 1)],
        }
    }

    fn is_free(&self, x: u32, y: u32, w: u32, h: u32) -> bool {
        let (x0, y0) = (x as usize, y as usize);
        let (x1, y1) = (x0 + w as usize, y0 + h as usize);
        if x1 > self.width || y1 > self.height {
            return false;
        }
        let stride = self.width + 1;
        let s = |xx: usize, yy: usize| self.sums[yy * stride + xx];
        s(x1, y1) + s(x0, y0) - s(x0, y1) - s(x1, y0) == 0
    }

    fn mark(&mut self, x: u32, y: u32, w: u32, h: u32) {
        for yy in y as usize..(y + h) as usize {
            let row = yy * self.width;
            for xx in x as usize..(x + w) as usize {
                self.used[row + xx] = true;
            }
        }
        self.rebuild();
    }

    fn rebuild(&mut self) {
        let stride = self.width + 1;
        for yy in 0..self.height {
            let mut row_sum = 0u32;
            for xx in 0..self.width {
                row_sum += u32::from(self.used[yy * self.width + xx]);
                self.sums[(yy + 1) * stride + xx + 1] = self.sums[yy * stride + xx + 1] + row_sum;
            }
        }
    }
}

/// Find a free spot for a `w` x `h` box, walking a spiral out from the centre.
fn find_position(grid: &Occupancy, canvas_w: u32, canvas_h: u32, w: u32, h: u32) -> Option<(u32, u32)> {
    let cx = canvas_w as f32 / 2.0;
    let cy = canvas_h as f32 / 2.0;
    let aspect = canvas_h as f32 / canvas_w as f32;
    let max_radius = cx.hypot(cy) / aspect.min(1.0);

    let mut theta = 0.0f32;
    loop {
        let radius = SPIRAL_PITCH * theta;
        if radius > max_radius {
            return None;
        }
        let px = cx + radius * theta.cos() - w as f32 / 2.0;
        let py = cy + radius * aspect * theta.sin() - h as f32 / 2.0;

        if px >= 0.0 && py >= 0.0 {
            let (x, y) = (px as u32, py as u32);
            if grid.is_free(x, y, w, h) {
                return Some((x, y));
            }
        }
        theta += SPIRAL_STRIDE / radius.max(SPIRAL_STRIDE);
    }
}

/// Font size for `count`, proportional to the largest count.
pub fn font_size_for(count: usize, max_count: usize, options: &LayoutOptions) -> f32 {
    if max_count == 0 {
        return options.min_font_size;
    }
    let ratio = count as f32 / max_count as f32;
    options.min_font_size + (options.max_font_size - options.min_font_size) * ratio
}

/// Place the most frequent words without overlap.
///
/// Words are handled from most to least frequent. A word that finds no
/// room is retried `font_step` smaller, and dropped below `min_font_size`.
pub fn layout(
    freqs: &WordFrequencies,
    options: &LayoutOptions,
    measure: &dyn TextMeasure,
) -> Vec<PlacedWord> {
    let words = freqs.top(options.max_words);
    let Some(&(_, max_count)) = words.first() else {
        return Vec::new();
    };
    if options.width == 0 || options.height == 0 {
        return Vec::new();
    }

    let mut grid = Occupancy::new(options.width, options.height);
    let mut placed = Vec::with_capacity(words.len());
    let step = options.font_step.max(0.5);

    for (word, count) in words {
        let mut size = font_size_for(count, max_count, options);
        loop {
            if size < options.min_font_size {
                debug!(word, count, "No room left for word, dropped");
                break;
            }
            let (tw, th) = measure.measure(word, size);
            let w = tw + 2 * options.margin;
            let h = th + 2 * options.margin;

            if w <= options.width && h <= options.height && tw > 0 && th > 0 {
                if let Some((x, y)) = find_position(&grid, options.width, options.height, w, h) {
                    grid.mark(x, y, w, h);
                    placed.push(PlacedWord {
                        word: word.to_string(),
                        count,
                        size,
                        x,
                        y,
                        width: w,
                        height: h,
                    });
                    break;
                }
            }
            size -= step;
        }
    }

    debug!(placed = placed.len(), candidates = freqs.len(), "Layout done");
    placed
}

/// Whether any two placed boxes intersect.
pub fn has_overlap(words: &[PlacedWord]) -> bool {
    words
        .iter()
        .enumerate()
        .any(|(i, a)| words[i + 1..].iter().any(|b| a.overlaps(b)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::stopwords::StopWords;
    use crate::cloud::frequency::word_frequencies;

    /// Every glyph is `size / 2` wide and `size` tall.
    struct Monospace;

    impl TextMeasure for Monospace {
        fn measure(&self, text: &str, size: f32) -> (u32, u32) {
            let w = (text.chars().count() as f32 * size / 2.0).ceil() as u32;
            (w, size.ceil() as u32)
        }
    }

    fn sample() -> WordFrequencies {
        word_frequencies(
            [
                "invoice invoice invoice invoice",
                "meeting meeting meeting",
                "project update",
                "quarterly report",
                "lunch",
            ],
            &StopWords::standard(),
        )
    }

    #[test]
    fn test_font_size_proportional() {
        let opts = LayoutOptions::default();
        assert_eq!(font_size_for(4, 4, &opts), opts.max_font_size);
        assert!(font_size_for(1, 4, &opts) < font_size_for(2, 4, &opts));
        assert!(font_size_for(1, 4, &opts) >= opts.min_font_size);
    }

    #[test]
    fn test_layout_places_all_without_overlap() {
        let placed = layout(&sample(), &LayoutOptions::default(), &Monospace);
        assert_eq!(placed.len(), 7);
        assert_eq!(placed[0].word, "invoice");
        assert!(!has_overlap(&placed));
        for p in &placed {
            assert!(p.x + p.width <= 800 && p.y + p.height <= 400);
        }
    }

    #[test]
    fn test_largest_word_sits_near_centre() {
        let placed = layout(&sample(), &LayoutOptions::default(), &Monospace);
        let first = &placed[0];
        let centre_x = first.x + first.width / 2;
        let centre_y = first.y + first.height / 2;
        assert!((centre_x as i64 - 400).abs() <= 2);
        assert!((centre_y as i64 - 200).abs() <= 2);
    }

    #[test]
    fn test_word_shrinks_to_fit_small_canvas() {
        let opts = LayoutOptions {
            width: 120,
            height: 60,
            ..Default::default()
        };
        let freqs = word_frequencies(["extraordinarily"], &StopWords::standard());
        let placed = layout(&freqs, &opts, &Monospace);
        assert_eq!(placed.len(), 1);
        assert!(placed[0].size < opts.max_font_size);
        assert!(placed[0].width <= 120);
    }

    #[test]
    fn test_max_words_and_empty() {
        let opts = LayoutOptions {
            max_words: 2,
            ..Default::default()
        };
        assert_eq!(layout(&sample(), &opts, &Monospace).len(), 2);
        assert!(layout(&WordFrequencies::default(), &opts, &Monospace).is_empty());
    }

    #[test]
    fn test_occupancy_free_check() {
        let mut grid = Occupancy::new(10, 10);
        assert!(grid.is_free(0, 0, 10, 10));
        grid.mark(4, 4, 2, 2);
        assert!(!grid.is_free(0, 0, 10, 10));
        assert!(!grid.is_free(5, 5, 1, 1));
        assert!(grid.is_free(0, 0, 4, 10));
        assert!(grid.is_free(6, 6, 4, 4));
        assert!(!grid.is_free(8, 8, 4, 4));
    }
}
