//! The drawing surface.
//!
//! A single RGBA buffer that each render resizes to its template and paints
//! in order: template, text, QR backing, QR code. All drawing clips to the
//! surface; nothing drawn off-canvas is an error.

use image::{Rgba, RgbaImage};

use super::font::{TextMask, Window};

pub const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);
pub const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Horizontal text anchoring, as for a canvas `textAlign`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlign {
    Center,
    Right,
}

impl TextAlign {
    /// Where the pen starts for text of width `advance` anchored at `x`.
    pub fn start(self, x: f32, advance: f32) -> f32 {
        match self {
            TextAlign::Center => x - advance / 2.0,
            TextAlign::Right => x - advance,
        }
    }
}

#[derive(Debug, Default)]
pub struct Canvas {
    surface: RgbaImage,
}

impl Canvas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn width(&self) -> u32 {
        self.surface.width()
    }

    pub fn height(&self) -> u32 {
        self.surface.height()
    }

    /// Resize to `width`×`height` and clear to transparent.
    pub fn reset(&mut self, width: u32, height: u32) {
        if self.surface.dimensions() == (width, height) {
            self.surface.pixels_mut().for_each(|p| *p = Rgba([0, 0, 0, 0]));
        } else {
            self.surface = RgbaImage::new(width, height);
        }
    }

    /// Draw an image with its top-left corner at `(x, y)`, alpha-composited.
    pub fn draw_image(&mut self, image: &RgbaImage, x: i64, y: i64) {
        for (sx, sy, pixel) in image.enumerate_pixels() {
            let alpha = pixel[3] as f32 / 255.0;
            if alpha > 0.0 {
                self.blend(x + sx as i64, y + sy as i64, *pixel, alpha);
            }
        }
    }

    /// Fill an axis-aligned rectangle with an opaque color.
    pub fn fill_rect(&mut self, x: i64, y: i64, width: u32, height: u32, color: Rgba<u8>) {
        let x0 = x.max(0);
        let y0 = y.max(0);
        let x1 = (x + width as i64).min(self.width() as i64);
        let y1 = (y + height as i64).min(self.height() as i64);
        for py in y0..y1 {
            for px in x0..x1 {
                self.surface.put_pixel(px as u32, py as u32, color);
            }
        }
    }

    /// The part of the surface visible to text whose pen starts at
    /// `(left, baseline)`, in pen-relative coordinates.
    pub fn text_window(&self, left: f32, baseline: f32) -> Window {
        let (x, y) = pen_origin(left, baseline);
        Window {
            left: x.saturating_neg(),
            top: y.saturating_neg(),
            right: (self.width() as i64).saturating_sub(x),
            bottom: (self.height() as i64).saturating_sub(y),
        }
    }

    /// Paint rasterized text whose pen starts at `(left, baseline)`.
    pub fn fill_text(&mut self, mask: &TextMask, left: f32, baseline: f32, color: Rgba<u8>) {
        let (x, y) = pen_origin(left, baseline);
        let left = x.saturating_add(mask.offset_x);
        let top = y.saturating_add(mask.offset_y);

        for my in 0..mask.height {
            for mx in 0..mask.width {
                let coverage = mask.coverage(mx, my);
                if coverage > 0.0 {
                    self.blend(
                        left.saturating_add(mx as i64),
                        top.saturating_add(my as i64),
                        color,
                        coverage,
                    );
                }
            }
        }
    }

    /// Copy of the current surface.
    pub fn snapshot(&self) -> RgbaImage {
        self.surface.clone()
    }

    fn blend(&mut self, x: i64, y: i64, color: Rgba<u8>, alpha: f32) {
        if x < 0 || y < 0 || x >= self.width() as i64 || y >= self.height() as i64 {
            return;
        }
        let dst = self.surface.get_pixel_mut(x as u32, y as u32);
        let a = (alpha * color[3] as f32 / 255.0).clamp(0.0, 1.0);
        for c in 0..3 {
            let mixed = color[c] as f32 * a + dst[c] as f32 * (1.0 - a);
            dst[c] = mixed.round() as u8;
        }
        let out_alpha = a * 255.0 + dst[3] as f32 * (1.0 - a);
        dst[3] = out_alpha.round() as u8;
    }
}

fn pen_origin(left: f32, baseline: f32) -> (i64, i64) {
    (left.round() as i64, baseline.round() as i64)
}
