//! Text rasterization for certificate text.
//!
//! Two faces are supported:
//!
//! - **Outline**: TrueType/OpenType regular + bold faces loaded at runtime,
//!   rendered anti-aliased with ab_glyph.
//! - **Bitmap**: the built-in Spleen 12×24 face, scaled nearest-neighbour to
//!   the requested size. Always available, so rendering never depends on
//!   fonts installed on the host.
//!
//! Sizes are em sizes in pixels, like a CSS `font` declaration.

use ab_glyph::{Font, FontArc, Glyph, PxScale, ScaleFont};
use spleen_font::{FONT_12X24, PSF2Font};
use std::path::Path;

use crate::error::CertError;

const BITMAP_CELL_WIDTH: usize = 12;
const BITMAP_CELL_HEIGHT: usize = 24;
/// Row of the Spleen 12×24 cell the baseline sits on.
const BITMAP_BASELINE_ROW: usize = 19;

/// Largest em size the rasterizer draws, in pixels. Larger sizes are clamped.
pub const MAX_FONT_SIZE: f32 = 1000.0;

/// Rendered text as an anti-aliased coverage buffer.
///
/// The buffer's top-left corner sits at `(offset_x, offset_y)` relative to
/// the start of the baseline.
#[derive(Debug, Clone)]
pub struct TextMask {
    pub width: usize,
    pub height: usize,
    pub offset_x: i64,
    pub offset_y: i64,
    /// Horizontal advance of the whole string, used for alignment.
    pub advance: f32,
    /// Coverage values: 0.0 = none, 1.0 = full ink.
    pub data: Vec<f32>,
}

impl TextMask {
    fn empty(advance: f32) -> Self {
        Self {
            width: 0,
            height: 0,
            offset_x: 0,
            offset_y: 0,
            advance,
            data: Vec::new(),
        }
    }

    pub fn coverage(&self, x: usize, y: usize) -> f32 {
        self.data[y * self.width + x]
    }
}

/// The faces used for certificate text.
#[derive(Clone)]
pub enum FontSet {
    Outline { regular: FontArc, bold: FontArc },
    Bitmap,
}

impl std::fmt::Debug for FontSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FontSet::Outline { .. } => f.write_str("FontSet::Outline"),
            FontSet::Bitmap => f.write_str("FontSet::Bitmap"),
        }
    }
}

impl Default for FontSet {
    fn default() -> Self {
        FontSet::Bitmap
    }
}

impl FontSet {
    /// Load regular and bold faces from font files.
    pub fn from_files(regular: &Path, bold: &Path) -> Result<Self, CertError> {
        Ok(FontSet::Outline {
            regular: load_face(regular)?,
            bold: load_face(bold)?,
        })
    }

    /// Horizontal advance of `text` at `size` px, without rasterizing it.
    pub fn advance(&self, text: &str, size: f32, bold: bool) -> f32 {
        let Some(size) = effective_size(size) else {
            return 0.0;
        };
        match self {
            FontSet::Outline { regular, bold: bold_face } => {
                let face = if bold { bold_face } else { regular };
                layout_outline(face, text, size).1
            }
            FontSet::Bitmap => {
                let (cell_w, _) = bitmap_cell(size);
                (cell_w * text.chars().count()) as f32
            }
        }
    }

    /// Rasterize one line of text at `size` px, keeping only the pixels
    /// inside `window`.
    pub fn rasterize(&self, text: &str, size: f32, bold: bool, window: Window) -> TextMask {
        let Some(size) = effective_size(size) else {
            return TextMask::empty(0.0);
        };
        match self {
            FontSet::Outline { regular, bold: bold_face } => {
                let face = if bold { bold_face } else { regular };
                rasterize_outline(face, text, size, window)
            }
            FontSet::Bitmap => rasterize_bitmap(text, size, bold, window),
        }
    }
}

/// Pixel window a mask is clipped to, relative to the pen origin: `x` from
/// the start of the advance, `y` from the baseline. `right` and `bottom` are
/// exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub left: i64,
    pub top: i64,
    pub right: i64,
    pub bottom: i64,
}

impl Window {
    /// Intersect with a bounding box; `None` if nothing is left.
    fn clip(&self, left: i64, top: i64, right: i64, bottom: i64) -> Option<(i64, i64, i64, i64)> {
        let l = left.max(self.left);
        let t = top.max(self.top);
        let r = right.min(self.right);
        let b = bottom.min(self.bottom);
        (l < r && t < b).then_some((l, t, r, b))
    }
}

/// Sizes outside `(0, MAX_FONT_SIZE]` are clamped; non-finite or
/// non-positive sizes draw nothing.
fn effective_size(size: f32) -> Option<f32> {
    (size.is_finite() && size > 0.0).then(|| size.min(MAX_FONT_SIZE))
}

fn load_face(path: &Path) -> Result<FontArc, CertError> {
    let bytes = std::fs::read(path)
        .map_err(|e| CertError::Font(format!("Failed to read {}: {}", path.display(), e)))?;
    FontArc::try_from_vec(bytes)
        .map_err(|e| CertError::Font(format!("Invalid font {}: {}", path.display(), e)))
}

/// Position every glyph on the baseline; returns the glyphs and the advance.
fn layout_outline(font: &FontArc, text: &str, size: f32) -> (Vec<Glyph>, f32) {
    // ab_glyph scales by ascent-descent; convert the em size first
    let units_per_em = font.units_per_em().unwrap_or(1000.0);
    let scale = PxScale::from(size * font.height_unscaled() / units_per_em);
    let scaled = font.as_scaled(scale);

    let mut glyphs = Vec::new();
    let mut caret_x = 0.0f32;
    let mut previous = None;
    for ch in text.chars() {
        let glyph_id = font.glyph_id(ch);
        if let Some(prev) = previous {
            caret_x += scaled.kern(prev, glyph_id);
        }
        glyphs.push(glyph_id.with_scale_and_position(scale, ab_glyph::point(caret_x, 0.0)));
        caret_x += scaled.h_advance(glyph_id);
        previous = Some(glyph_id);
    }
    (glyphs, caret_x)
}

fn rasterize_outline(font: &FontArc, text: &str, size: f32, window: Window) -> TextMask {
    let (glyphs, advance) = layout_outline(font, text, size);
    let outlined: Vec<_> = glyphs
        .into_iter()
        .filter_map(|g| font.outline_glyph(g))
        .collect();
    if outlined.is_empty() {
        return TextMask::empty(advance);
    }

    let (mut min_x, mut min_y) = (f32::MAX, f32::MAX);
    let (mut max_x, mut max_y) = (f32::MIN, f32::MIN);
    for o in &outlined {
        let b = o.px_bounds();
        min_x = min_x.min(b.min.x);
        min_y = min_y.min(b.min.y);
        max_x = max_x.max(b.max.x);
        max_y = max_y.max(b.max.y);
    }
    let Some((left, top, right, bottom)) = window.clip(
        min_x.floor() as i64,
        min_y.floor() as i64,
        max_x.ceil() as i64,
        max_y.ceil() as i64,
    ) else {
        return TextMask::empty(advance);
    };
    let width = (right - left) as usize;
    let height = (bottom - top) as usize;

    let mut data = vec![0.0f32; width * height];
    for o in &outlined {
        let bounds = o.px_bounds();
        let outside = bounds.max.x < left as f32
            || bounds.min.x > right as f32
            || bounds.max.y < top as f32
            || bounds.min.y > bottom as f32;
        if outside {
            continue;
        }
        o.draw(|px, py, coverage| {
            let x = px as i64 + bounds.min.x as i64 - left;
            let y = py as i64 + bounds.min.y as i64 - top;
            if x >= 0 && (x as usize) < width && y >= 0 && (y as usize) < height {
                let idx = y as usize * width + x as usize;
                data[idx] = (data[idx] + coverage).min(1.0);
            }
        });
    }

    TextMask {
        width,
        height,
        offset_x: left,
        offset_y: top,
        advance,
        data,
    }
}

/// Scaled Spleen cell: `(width, height)` in pixels.
fn bitmap_cell(size: f32) -> (usize, usize) {
    let cell_h = size.round().max(1.0) as usize;
    let cell_w = (size * BITMAP_CELL_WIDTH as f32 / BITMAP_CELL_HEIGHT as f32)
        .round()
        .max(1.0) as usize;
    (cell_w, cell_h)
}

fn rasterize_bitmap(text: &str, size: f32, bold: bool, window: Window) -> TextMask {
    let mut spleen = PSF2Font::new(FONT_12X24).ok();
    let glyphs: Vec<Vec<u8>> = text
        .chars()
        .map(|ch| bitmap_glyph(spleen.as_mut(), ch))
        .collect();
    if glyphs.is_empty() {
        return TextMask::empty(0.0);
    }

    let (cell_w, cell_h) = bitmap_cell(size);
    let advance = cell_w * glyphs.len();
    // Bold widens each stroke by one source column's worth of pixels
    let embolden = if bold { cell_w.div_ceil(BITMAP_CELL_WIDTH) } else { 0 };
    let baseline = (BITMAP_BASELINE_ROW * cell_h / BITMAP_CELL_HEIGHT) as i64;

    let Some((left, top, right, bottom)) = window.clip(
        0,
        -baseline,
        (advance + embolden) as i64,
        cell_h as i64 - baseline,
    ) else {
        return TextMask::empty(advance as f32);
    };
    let width = (right - left) as usize;
    let height = (bottom - top) as usize;
    let mut data = vec![0.0f32; width * height];

    for y in top..bottom {
        let sy = (y + baseline) as usize * BITMAP_CELL_HEIGHT / cell_h;
        for x in left..right {
            let inked = (0..=embolden as i64).any(|extra| {
                let qx = x - extra;
                if qx < 0 || qx as usize >= advance {
                    return false;
                }
                let qx = qx as usize;
                let sx = (qx % cell_w) * BITMAP_CELL_WIDTH / cell_w;
                glyphs[qx / cell_w][sy * BITMAP_CELL_WIDTH + sx] != 0
            });
            if inked {
                data[(y - top) as usize * width + (x - left) as usize] = 1.0;
            }
        }
    }

    TextMask {
        width,
        height,
        offset_x: left,
        offset_y: top,
        advance: advance as f32,
        data,
    }
}

/// 12×24 glyph bitmap, 1 = ink. Unknown characters draw a box.
fn bitmap_glyph(spleen: Option<&mut PSF2Font>, ch: char) -> Vec<u8> {
    let mut glyph = vec![0u8; BITMAP_CELL_WIDTH * BITMAP_CELL_HEIGHT];
    if ch == ' ' {
        return glyph;
    }

    let utf8 = ch.to_string();
    let found = match spleen.and_then(|s| s.glyph_for_utf8(utf8.as_bytes())) {
        Some(rows) => {
            for (row_y, row) in rows.enumerate() {
                for (col_x, on) in row.enumerate() {
                    let idx = row_y * BITMAP_CELL_WIDTH + col_x;
                    if on && col_x < BITMAP_CELL_WIDTH && idx < glyph.len() {
                        glyph[idx] = 1;
                    }
                }
            }
            true
        }
        None => false,
    };

    if !found {
        draw_box(&mut glyph, BITMAP_CELL_WIDTH, BITMAP_CELL_HEIGHT);
    }
    glyph
}

fn draw_box(glyph: &mut [u8], width: usize, height: usize) {
    for x in 0..width {
        glyph[x] = 1;
        glyph[(height - 1) * width + x] = 1;
    }
    for y in 0..height {
        glyph[y * width] = 1;
        glyph[y * width + width - 1] = 1;
    }
}
