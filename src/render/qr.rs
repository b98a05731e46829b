//! QR code generation.
//!
//! Produces a square black-on-white image with a one-module quiet zone,
//! scaled to exactly the requested side length.

use image::RgbaImage;
use qrcode::{Color, EcLevel, QrCode};

use super::canvas::{BLACK, WHITE};

/// Quiet zone around the symbol, in modules.
const MARGIN_MODULES: usize = 1;

/// Encode `payload` as a `size`×`size` QR image.
pub fn generate(payload: &str, size: u32) -> Result<RgbaImage, String> {
    let code = QrCode::with_error_correction_level(payload.as_bytes(), EcLevel::M)
        .map_err(|e| format!("QR code generation failed: {}", e))?;
    if size == 0 {
        return Err("QR code size must be positive".to_string());
    }

    let modules = code.width();
    let total = modules + 2 * MARGIN_MODULES;
    let colors = code.to_colors();

    let image = RgbaImage::from_fn(size, size, |px, py| {
        let mx = px as usize * total / size as usize;
        let my = py as usize * total / size as usize;
        if is_dark(&colors, modules, mx, my) {
            BLACK
        } else {
            WHITE
        }
    });
    Ok(image)
}

fn is_dark(colors: &[Color], modules: usize, mx: usize, my: usize) -> bool {
    let inside = |m: usize| m >= MARGIN_MODULES && m < modules + MARGIN_MODULES;
    if !inside(mx) || !inside(my) {
        return false;
    }
    let idx = (my - MARGIN_MODULES) * modules + (mx - MARGIN_MODULES);
    colors[idx] == Color::Dark
}
