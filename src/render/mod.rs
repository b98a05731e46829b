//! # Certificate Renderer
//!
//! Composites one participant onto the shared template.
//!
//! ```text
//! template bytes ──decode──▶ canvas (template size)
//!                             ├─ name, upper-cased, bold, centered at (W/2, nameY% · H)
//!                             ├─ "{location}, {date}", right-aligned at (dateX% · W, dateY% · H)
//!                             └─ QR (120×120 on a white 130×130 backing) at (80, H − 170)
//!                             ▼
//!                         RgbaImage ──encode_png──▶ PNG bytes
//! ```
//!
//! The renderer owns the drawing surface; `render` takes `&mut self`, so a
//! render holds the surface exclusively until it returns. Both decode steps
//! run on the blocking pool and are awaited in order: template first, since
//! the QR placement depends on its size.
//!
//! A QR code that cannot be generated is logged and left out. Rendering
//! never fails because of it.

pub mod canvas;
pub mod font;
pub mod qr;

use image::{DynamicImage, ImageFormat, RgbaImage};
use std::io::Cursor;
use std::sync::Arc;

use crate::error::CertError;
use crate::layout::{LayoutConfig, QR_PADDING, QR_SIZE};
use crate::participant::{EventConfig, Participant};

use canvas::{BLACK, Canvas, TextAlign, WHITE};
use font::FontSet;

/// The certificate background, shared by every render in a session.
///
/// Holds the encoded bytes; each render decodes them afresh.
#[derive(Debug, Clone)]
pub struct Template {
    bytes: Arc<[u8]>,
    format: Option<ImageFormat>,
}

impl Template {
    pub fn from_bytes(bytes: impl Into<Arc<[u8]>>) -> Self {
        let bytes = bytes.into();
        let format = image::guess_format(&bytes).ok();
        Self { bytes, format }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// MIME type of the encoded template, if recognized.
    pub fn mime_type(&self) -> &'static str {
        match self.format {
            Some(format) => format.to_mime_type(),
            None => "application/octet-stream",
        }
    }

    fn decode(&self) -> Result<RgbaImage, CertError> {
        image::load_from_memory(&self.bytes)
            .map(DynamicImage::into_rgba8)
            .map_err(|e| CertError::Decode(format!("Failed to decode template: {}", e)))
    }
}

/// Renders certificates onto a single reusable canvas.
#[derive(Debug, Default)]
pub struct CertificateRenderer {
    canvas: Canvas,
    fonts: FontSet,
}

impl CertificateRenderer {
    pub fn new(fonts: FontSet) -> Self {
        Self {
            canvas: Canvas::new(),
            fonts,
        }
    }

    /// Render one certificate.
    ///
    /// Fails only if the template cannot be decoded.
    pub async fn render(
        &mut self,
        participant: &Participant,
        event: &EventConfig,
        template: &Template,
        layout: &LayoutConfig,
    ) -> Result<RgbaImage, CertError> {
        let base = {
            let template = template.clone();
            tokio::task::spawn_blocking(move || template.decode())
                .await
                .map_err(|e| CertError::Decode(format!("Template decode task failed: {}", e)))??
        };

        let qr = if participant.qr_payload.is_empty() {
            None
        } else {
            let payload = participant.qr_payload.clone();
            match tokio::task::spawn_blocking(move || qr::generate(&payload, QR_SIZE)).await {
                Ok(Ok(image)) => Some(image),
                Ok(Err(e)) => {
                    tracing::warn!(participant = %participant.id, error = %e, "rendering without QR code");
                    None
                }
                Err(e) => {
                    tracing::warn!(participant = %participant.id, error = %e, "QR task failed, rendering without QR code");
                    None
                }
            }
        };

        Ok(self.compose(&base, participant, event, layout, qr.as_ref()))
    }

    fn compose(
        &mut self,
        base: &RgbaImage,
        participant: &Participant,
        event: &EventConfig,
        layout: &LayoutConfig,
        qr: Option<&RgbaImage>,
    ) -> RgbaImage {
        let (width, height) = base.dimensions();
        self.canvas.reset(width, height);
        self.canvas.draw_image(base, 0, 0);

        let placement = layout.place(width, height);

        let name = participant.full_name.to_uppercase();
        self.draw_text(&name, layout.name_font_size, true, placement.name, TextAlign::Center);

        if let Some(line) = event.issue_line() {
            self.draw_text(&line, layout.date_font_size, false, placement.date, TextAlign::Right);
        }

        if let Some(qr) = qr {
            let (qx, qy) = placement.qr;
            let backing = QR_SIZE + 2 * QR_PADDING as u32;
            self.canvas
                .fill_rect(qx - QR_PADDING, qy - QR_PADDING, backing, backing, WHITE);
            self.canvas.draw_image(qr, qx, qy);
        }

        self.canvas.snapshot()
    }

    /// Rasterize only the part of `text` that lands on the canvas and paint it.
    fn draw_text(&mut self, text: &str, size: f32, bold: bool, anchor: (f32, f32), align: TextAlign) {
        let (x, baseline) = anchor;
        let left = align.start(x, self.fonts.advance(text, size, bold));
        let window = self.canvas.text_window(left, baseline);
        let mask = self.fonts.rasterize(text, size, bold, window);
        self.canvas.fill_text(&mask, left, baseline, BLACK);
    }
}

/// Encode a rendered certificate as PNG.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, CertError> {
    let mut out = Cursor::new(Vec::new());
    image
        .write_to(&mut out, ImageFormat::Png)
        .map_err(|e| CertError::Image(format!("Failed to encode PNG: {}", e)))?;
    Ok(out.into_inner())
}

/// `data:` URL for encoded image bytes.
pub fn data_url(mime: &str, bytes: &[u8]) -> String {
    use base64::Engine;
    format!(
        "data:{};base64,{}",
        mime,
        base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}
