//! # Layout Configuration
//!
//! Where the name and the issue line land on the template.
//!
//! | Field | Unit | Default |
//! |-------|------|---------|
//! | `nameY` | % of template height | 44 |
//! | `nameFontSize` | px | 48 |
//! | `dateY` | % of template height | 68 |
//! | `dateFontSize` | px | 18 |
//! | `dateX` | % of template width | 85 |
//!
//! Percentages are resolved against the template's own pixel size, so the
//! same layout works for any template resolution.
//!
//! The layout is the only state that survives a restart. [`LayoutStore`]
//! keeps it as a flat JSON object under the `certificateVisualConfig` key
//! of a small settings file.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::CertError;
use crate::render::font::MAX_FONT_SIZE;

/// Settings key the layout is stored under.
pub const LAYOUT_KEY: &str = "certificateVisualConfig";

/// Side length of the QR code in pixels.
pub const QR_SIZE: u32 = 120;
/// Distance of the QR code from the left edge.
pub const QR_LEFT: i64 = 80;
/// Gap between the QR code and the bottom edge.
pub const QR_BOTTOM: i64 = 50;
/// White border drawn around the QR code.
pub const QR_PADDING: i64 = 5;

/// Placement parameters for the certificate text.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutConfig {
    pub name_y: f32,
    pub name_font_size: f32,
    pub date_y: f32,
    pub date_font_size: f32,
    pub date_x: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            name_y: 44.0,
            name_font_size: 48.0,
            date_y: 68.0,
            date_font_size: 18.0,
            date_x: 85.0,
        }
    }
}

impl LayoutConfig {
    /// Check that every parameter can be drawn.
    ///
    /// Positions are percentages in `0..=100`; font sizes are positive and at
    /// most [`MAX_FONT_SIZE`] px.
    pub fn validate(&self) -> Result<(), CertError> {
        let percentages = [
            ("nameY", self.name_y),
            ("dateY", self.date_y),
            ("dateX", self.date_x),
        ];
        for (key, value) in percentages {
            if !(0.0..=100.0).contains(&value) {
                return Err(CertError::InvalidLayout(format!(
                    "{} must be between 0 and 100, got {}",
                    key, value
                )));
            }
        }
        let sizes = [
            ("nameFontSize", self.name_font_size),
            ("dateFontSize", self.date_font_size),
        ];
        for (key, value) in sizes {
            if !(value > 0.0 && value <= MAX_FONT_SIZE) {
                return Err(CertError::InvalidLayout(format!(
                    "{} must be greater than 0 and at most {}, got {}",
                    key, MAX_FONT_SIZE, value
                )));
            }
        }
        Ok(())
    }

    /// Resolve this layout against a template of the given size.
    pub fn place(&self, width: u32, height: u32) -> Placement {
        let w = width as f32;
        let h = height as f32;
        Placement {
            name: (w / 2.0, h * self.name_y / 100.0),
            date: (w * self.date_x / 100.0, h * self.date_y / 100.0),
            qr: (QR_LEFT, height as i64 - QR_SIZE as i64 - QR_BOTTOM),
        }
    }
}

/// Pixel anchors for one template size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    /// Center of the name's baseline.
    pub name: (f32, f32),
    /// Right end of the issue line's baseline.
    pub date: (f32, f32),
    /// Top-left corner of the QR code.
    pub qr: (i64, i64),
}

/// JSON settings file holding the persisted layout.
#[derive(Debug, Clone)]
pub struct LayoutStore {
    path: PathBuf,
}

impl LayoutStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the saved layout, falling back to the default.
    ///
    /// A missing file or key is normal. An unreadable or malformed value is
    /// logged and ignored.
    pub fn load(&self) -> LayoutConfig {
        match self.try_load() {
            Ok(Some(layout)) => {
                tracing::info!(path = %self.path.display(), "loaded saved layout");
                layout
            }
            Ok(None) => LayoutConfig::default(),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "ignoring saved layout");
                LayoutConfig::default()
            }
        }
    }

    fn try_load(&self) -> Result<Option<LayoutConfig>, CertError> {
        let settings = match self.read_settings()? {
            Some(settings) => settings,
            None => return Ok(None),
        };
        match settings.get(LAYOUT_KEY) {
            Some(value) => {
                let layout: LayoutConfig = serde_json::from_value(value.clone())
                    .map_err(|e| CertError::Config(format!("Invalid {}: {}", LAYOUT_KEY, e)))?;
                layout.validate()?;
                Ok(Some(layout))
            }
            None => Ok(None),
        }
    }

    /// Persist the layout, keeping any other keys already in the file.
    pub fn save(&self, layout: &LayoutConfig) -> Result<(), CertError> {
        layout.validate()?;
        let mut settings = self.read_settings().ok().flatten().unwrap_or_default();
        let value = serde_json::to_value(layout)
            .map_err(|e| CertError::Config(format!("Failed to serialize layout: {}", e)))?;
        settings.insert(LAYOUT_KEY.to_string(), value);

        let json = serde_json::to_string_pretty(&Value::Object(settings))
            .map_err(|e| CertError::Config(format!("Failed to serialize settings: {}", e)))?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, json)?;
        tracing::info!(path = %self.path.display(), "layout saved");
        Ok(())
    }

    fn read_settings(&self) -> Result<Option<Map<String, Value>>, CertError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_str(&text) {
            Ok(Value::Object(map)) => Ok(Some(map)),
            Ok(_) => Err(CertError::Config("Settings file is not a JSON object".into())),
            Err(e) => Err(CertError::Config(format!("Malformed settings file: {}", e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn temp_store(name: &str) -> LayoutStore {
        let dir = std::env::temp_dir().join(format!("certforge-layout-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        LayoutStore::new(dir.join("settings.json"))
    }

    #[test]
    fn test_place_scenario() {
        let layout = LayoutConfig {
            name_y: 50.0,
            name_font_size: 40.0,
            date_y: 70.0,
            date_font_size: 20.0,
            date_x: 90.0,
        };
        let p = layout.place(1000, 700);
        assert_eq!(p.name, (500.0, 350.0));
        assert_eq!(p.date, (900.0, 490.0));
        assert_eq!(p.qr, (80, 530));
    }

    #[test]
    fn test_place_scales_with_template() {
        let layout = LayoutConfig::default();
        let small = layout.place(1000, 700);
        let large = layout.place(2000, 1400);
        assert_eq!(large.name.0, small.name.0 * 2.0);
        assert!((large.name.1 - small.name.1 * 2.0).abs() < 1e-3);
        assert!((large.date.0 - small.date.0 * 2.0).abs() < 1e-3);
    }

    #[test]
    fn test_json_keys() {
        let json = serde_json::to_value(LayoutConfig::default()).unwrap();
        assert_eq!(json["nameY"], 44.0);
        assert_eq!(json["nameFontSize"], 48.0);
        assert_eq!(json["dateX"], 85.0);
    }

    #[test]
    fn test_load_missing_file_is_default() {
        let store = temp_store("missing");
        assert_eq!(store.load(), LayoutConfig::default());
    }

    #[test]
    fn test_save_then_load() {
        let store = temp_store("roundtrip");
        let layout = LayoutConfig {
            name_y: 40.5,
            ..Default::default()
        };
        store.save(&layout).unwrap();
        assert_eq!(store.load(), layout);
    }

    #[test]
    fn test_save_keeps_other_keys() {
        let store = temp_store("keys");
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        fs::write(store.path(), r#"{"theme":"dark"}"#).unwrap();
        store.save(&LayoutConfig::default()).unwrap();

        let text = fs::read_to_string(store.path()).unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["theme"], "dark");
        assert_eq!(value[LAYOUT_KEY]["dateY"], 68.0);
    }

    #[test]
    fn test_malformed_layout_falls_back() {
        let store = temp_store("malformed");
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        fs::write(store.path(), r#"{"certificateVisualConfig":{"nameY":"high"}}"#).unwrap();
        assert_eq!(store.load(), LayoutConfig::default());
    }

    #[test]
    fn test_validate_rejects_unusable_values() {
        assert!(LayoutConfig::default().validate().is_ok());

        let cases = [
            LayoutConfig { name_font_size: 1.0e8, ..Default::default() },
            LayoutConfig { name_font_size: 0.0, ..Default::default() },
            LayoutConfig { date_font_size: f32::NAN, ..Default::default() },
            LayoutConfig { name_y: 150.0, ..Default::default() },
            LayoutConfig { date_x: -1.0, ..Default::default() },
            LayoutConfig { date_y: f32::INFINITY, ..Default::default() },
        ];
        for layout in cases {
            let err = layout.validate().unwrap_err();
            assert!(matches!(err, CertError::InvalidLayout(_)), "{:?}", layout);
        }
    }

    #[test]
    fn test_out_of_range_saved_layout_falls_back() {
        let store = temp_store("out-of-range");
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        fs::write(
            store.path(),
            r#"{"certificateVisualConfig":{"nameY":44,"nameFontSize":100000000,"dateY":68,"dateFontSize":18,"dateX":85}}"#,
        )
        .unwrap();
        assert_eq!(store.load(), LayoutConfig::default());
    }

    #[test]
    fn test_save_rejects_invalid_layout() {
        let store = temp_store("save-invalid");
        let layout = LayoutConfig { name_y: 200.0, ..Default::default() };
        assert!(store.save(&layout).is_err());
        assert!(!store.path().exists());
    }
}
