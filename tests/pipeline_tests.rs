//! # Pipeline Tests
//!
//! End-to-end checks from a spreadsheet upload to certificate files on disk,
//! going through the public [`Session`] API only.

use certforge::layout::LayoutConfig;
use certforge::participant::EventProfile;
use certforge::render::{Template, encode_png, font::FontSet};
use certforge::{CertError, Session};
use image::{Rgba, RgbaImage};
use pretty_assertions::assert_eq;
use std::time::Duration;

const CSV: &str = "\
Marca temporal,Nombres y Apellidos,Correo Electrónico,DNI,Cargo
2024-05-01 10:00,Juan Pérez,juan@x.com,12345678,Analista
2024-05-01 10:05,María López,maria@x.com,87654321,Jefa
,,,,
2024-05-01 10:07,Sin Correo,,11111111,Asistente
";

fn template() -> Template {
    let img = RgbaImage::from_pixel(1000, 700, Rgba([240, 240, 240, 255]));
    Template::from_bytes(encode_png(&img).unwrap())
}

fn session() -> Session {
    let mut session = Session::new("https://certs.example", FontSet::Bitmap, LayoutConfig::default());
    let mut profile = EventProfile::default();
    profile.config.event_title = "Taller de Gestión Pública".into();
    profile.config.issue_location = "Lima".into();
    profile.config.issue_date = "15 de mayo de 2024".into();
    session.set_profile(profile);
    session
}

fn scratch_dir(name: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!("certforge-{}-{}", name, std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn test_upload_resolves_and_filters() {
    let mut session = session();
    let summary = session
        .load_spreadsheet(CSV.as_bytes(), Some("inscritos.csv"))
        .unwrap();

    assert_eq!(summary.loaded, 2);
    assert_eq!(summary.skipped, 1);

    let names: Vec<&str> = session
        .participants()
        .iter()
        .map(|p| p.full_name.as_str())
        .collect();
    assert_eq!(names, vec!["Juan Pérez", "María López"]);

    let juan = &session.participants()[0];
    assert_eq!(juan.document_id, "12345678");
    assert_eq!(juan.role, "Analista");
    assert!(juan.id.as_str().starts_with("temp-"));
    assert_eq!(
        juan.qr_payload,
        format!("https://certs.example/certificate/{}", juan.id)
    );
}

#[test]
fn test_upload_xlsx_workbook() {
    let mut session = session();
    let summary = session
        .load_spreadsheet(include_bytes!("fixtures/inscritos.xlsx"), Some("inscritos.xlsx"))
        .unwrap();

    assert_eq!(summary.loaded, 1);
    assert_eq!(summary.skipped, 0);
    assert_eq!(summary.headers, vec!["Nombres y Apellidos", "Correo Electrónico", "DNI"]);

    let juan = &session.participants()[0];
    assert_eq!(juan.full_name, "Juan Pérez");
    assert_eq!(juan.email, "juan@x.com");
    assert_eq!(juan.document_id, "12345678");
}

#[test]
fn test_failed_upload_keeps_previous_set() {
    let mut session = session();
    session
        .load_spreadsheet(CSV.as_bytes(), Some("inscritos.csv"))
        .unwrap();

    let err = session
        .load_spreadsheet(b"Nombre,Telefono\nAna,999\n", Some("otra.csv"))
        .unwrap_err();
    assert!(matches!(err, CertError::NoValidRecords { .. }));
    assert_eq!(session.participants().len(), 2);
}

#[tokio::test]
async fn test_preview_is_deterministic() {
    let mut session = session();
    session
        .load_spreadsheet(CSV.as_bytes(), Some("inscritos.csv"))
        .unwrap();
    session.set_template(template());

    let id = session.participants()[0].id.clone();
    let first = session.preview(&id).await.unwrap();
    let second = session.preview(&id).await.unwrap();
    assert_eq!(first, second);

    let decoded = image::load_from_memory(&first).unwrap().into_rgba8();
    assert_eq!(decoded.dimensions(), (1000, 700));
    // QR backing square sits at (75, H-175)
    assert_eq!(*decoded.get_pixel(76, 526), Rgba([255, 255, 255, 255]));
}

#[tokio::test(start_paused = true)]
async fn test_download_all_writes_one_file_per_participant() {
    let mut session = session();
    session
        .load_spreadsheet(CSV.as_bytes(), Some("inscritos.csv"))
        .unwrap();
    session.set_template(template());

    let dir = scratch_dir("download");
    let report = session.download_all(&dir, Duration::from_millis(500)).await;

    assert_eq!(report.total, 2);
    assert_eq!(report.succeeded, 2);
    assert!(report.is_complete_success());
    assert!(dir.join("certificado_Juan_Pérez.png").exists());
    assert!(dir.join("certificado_María_López.png").exists());

    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn test_download_all_without_template_reports_every_failure() {
    let mut session = session();
    session
        .load_spreadsheet(CSV.as_bytes(), Some("inscritos.csv"))
        .unwrap();

    let dir = scratch_dir("no-template");
    let report = session.download_all(&dir, Duration::ZERO).await;

    assert_eq!(report.failed, 2);
    assert_eq!(report.errors[0].name, "Juan Pérez");
    assert_eq!(report.errors[0].error, "No certificate template loaded");

    let _ = std::fs::remove_dir_all(&dir);
}
