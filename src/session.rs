//! # Session
//!
//! The in-memory working set: participants loaded from the last upload, the
//! template, the event profile, the current layout, and the renderer that
//! owns the drawing surface.
//!
//! Participants live only here until a delivery succeeds; nothing is
//! persisted automatically. Every render goes through `&mut self`, which is
//! what keeps renders and deliveries one at a time.

use chrono::Utc;
use std::path::{Path, PathBuf};

use crate::batch::{self, BatchReport, BatchWork};
use crate::delivery::{DeliveryClient, DeliveryRequest};
use crate::error::CertError;
use crate::ingest::{self, IngestReport};
use crate::layout::LayoutConfig;
use crate::participant::{EventProfile, Participant, ParticipantId, ParticipantPatch};
use crate::render::{self, CertificateRenderer, Template, font::FontSet};

/// Sample name used by the live layout preview.
pub const SAMPLE_NAME: &str = "JUAN CARLOS PÉREZ GARCÍA";

/// Summary of a successful upload.
#[derive(Debug, Clone, serde::Serialize)]
pub struct LoadSummary {
    pub loaded: usize,
    pub skipped: usize,
    pub headers: Vec<String>,
}

/// The most recent single-participant preview.
#[derive(Debug, Clone)]
struct Preview {
    participant: ParticipantId,
    png: Vec<u8>,
}

pub struct Session {
    participants: Vec<Participant>,
    template: Option<Template>,
    profile: EventProfile,
    layout: LayoutConfig,
    renderer: CertificateRenderer,
    public_url: String,
    preview: Option<Preview>,
}

impl Session {
    pub fn new(public_url: impl Into<String>, fonts: FontSet, layout: LayoutConfig) -> Self {
        Self {
            participants: Vec::new(),
            template: None,
            profile: EventProfile::default(),
            layout,
            renderer: CertificateRenderer::new(fonts),
            public_url: public_url.into(),
            preview: None,
        }
    }

    // ------------------------------------------------------------------
    // Participant set
    // ------------------------------------------------------------------

    /// Replace the participant set with the contents of a workbook.
    ///
    /// On error the current set is left untouched.
    pub fn load_spreadsheet(
        &mut self,
        bytes: &[u8],
        file_name: Option<&str>,
    ) -> Result<LoadSummary, CertError> {
        let IngestReport {
            participants,
            skipped,
            headers,
        } = ingest::ingest_workbook(bytes, file_name, &self.public_url)?;
        let summary = LoadSummary {
            loaded: participants.len(),
            skipped,
            headers,
        };
        self.participants = participants;
        self.preview = None;
        Ok(summary)
    }

    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub fn get(&self, id: &ParticipantId) -> Result<&Participant, CertError> {
        self.participants
            .iter()
            .find(|p| &p.id == id)
            .ok_or_else(|| CertError::NotFound(id.to_string()))
    }

    fn get_mut(&mut self, id: &ParticipantId) -> Result<&mut Participant, CertError> {
        self.participants
            .iter_mut()
            .find(|p| &p.id == id)
            .ok_or_else(|| CertError::NotFound(id.to_string()))
    }

    pub fn update_participant(
        &mut self,
        id: &ParticipantId,
        patch: ParticipantPatch,
    ) -> Result<&Participant, CertError> {
        self.preview = None;
        let participant = self.get_mut(id)?;
        participant.apply(patch);
        Ok(participant)
    }

    pub fn delete_participant(&mut self, id: &ParticipantId) -> Result<Participant, CertError> {
        let index = self
            .participants
            .iter()
            .position(|p| &p.id == id)
            .ok_or_else(|| CertError::NotFound(id.to_string()))?;
        self.preview = None;
        Ok(self.participants.remove(index))
    }

    // ------------------------------------------------------------------
    // Render inputs
    // ------------------------------------------------------------------

    /// Install a new template. Any cached preview is discarded.
    pub fn set_template(&mut self, template: Template) {
        self.template = Some(template);
        self.preview = None;
    }

    pub fn template(&self) -> Option<&Template> {
        self.template.as_ref()
    }

    pub fn profile(&self) -> &EventProfile {
        &self.profile
    }

    pub fn set_profile(&mut self, profile: EventProfile) {
        self.profile = profile;
        self.preview = None;
    }

    pub fn layout(&self) -> LayoutConfig {
        self.layout
    }

    /// Use `layout` for subsequent renders. Out-of-range values are rejected
    /// and the current layout is kept.
    pub fn set_layout(&mut self, layout: LayoutConfig) -> Result<(), CertError> {
        layout.validate()?;
        self.layout = layout;
        self.preview = None;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Single-participant operations
    // ------------------------------------------------------------------

    async fn render_png(&mut self, participant: &Participant) -> Result<Vec<u8>, CertError> {
        let template = self.template.clone().ok_or(CertError::TemplateMissing)?;
        let layout = self.layout;
        let image = self
            .renderer
            .render(participant, &self.profile.config, &template, &layout)
            .await?;
        render::encode_png(&image)
    }

    /// Render one participant and keep it as the current preview.
    ///
    /// Asking again for the same participant returns the kept image until
    /// any render input changes.
    pub async fn preview(&mut self, id: &ParticipantId) -> Result<Vec<u8>, CertError> {
        if let Some(preview) = self.preview.as_ref().filter(|p| &p.participant == id) {
            return Ok(preview.png.clone());
        }
        let participant = self.get(id)?.clone();
        let png = self.render_png(&participant).await?;
        self.preview = Some(Preview {
            participant: participant.id,
            png: png.clone(),
        });
        Ok(png)
    }

    /// Render the current layout with a sample name and no QR code.
    pub async fn layout_preview(&mut self, sample_name: Option<&str>) -> Result<Vec<u8>, CertError> {
        let sample = Participant::new(sample_name.unwrap_or(SAMPLE_NAME), "");
        self.render_png(&sample).await
    }

    /// Render one participant for download: `(file name, PNG bytes)`.
    pub async fn download(&mut self, id: &ParticipantId) -> Result<(String, Vec<u8>), CertError> {
        let participant = self.get(id)?.clone();
        let png = self.render_png(&participant).await?;
        Ok((participant.certificate_file_name(), png))
    }

    /// Render and deliver one certificate, then fold the receipt back in.
    ///
    /// Returns the participant's identifier after delivery, which is the
    /// persisted one.
    pub async fn send(
        &mut self,
        id: &ParticipantId,
        delivery: &dyn DeliveryClient,
    ) -> Result<ParticipantId, CertError> {
        let participant = self.get(id)?.clone();
        if participant.email.trim().is_empty() || !participant.email.contains('@') {
            return Err(CertError::InvalidEmail(participant.email));
        }

        let png = self.render_png(&participant).await?;
        let template_image = self
            .template
            .as_ref()
            .map(|t| render::data_url(t.mime_type(), t.bytes()))
            .unwrap_or_default();

        let receipt = delivery
            .deliver(DeliveryRequest {
                participant,
                profile: self.profile.clone(),
                png,
                template_image,
            })
            .await?;

        let persisted_id = ParticipantId(receipt.participant_id);
        let taken = self
            .participants
            .iter()
            .any(|p| p.id == persisted_id && &p.id != id);
        self.preview = None;

        let stored = self.get_mut(id)?;
        if taken {
            // Keep ids unique; the certificate went out either way
            tracing::warn!(
                participant = %stored.id,
                returned = %persisted_id,
                "delivery returned an id already in use, keeping the current one"
            );
        } else {
            stored.id = persisted_id;
        }
        stored.email_sent = true;
        stored.email_sent_at = Some(Utc::now());
        stored.persisted = true;
        if let Some(qr) = receipt.qr_code {
            stored.qr_payload = qr;
        }
        tracing::info!(participant = %stored.id, email = %stored.email, "certificate delivered");
        Ok(stored.id.clone())
    }

    // ------------------------------------------------------------------
    // Batches
    // ------------------------------------------------------------------

    /// Render every participant into `dir`, one file per certificate.
    pub async fn download_all(&mut self, dir: &Path, pacing: std::time::Duration) -> BatchReport {
        let ids: Vec<ParticipantId> = self.participants.iter().map(|p| p.id.clone()).collect();
        let mut work = DownloadWork {
            session: self,
            dir: dir.to_path_buf(),
        };
        batch::run_batch(&mut work, &ids, pacing).await
    }

    /// Deliver the given participants one at a time.
    pub async fn send_bulk(
        &mut self,
        ids: &[ParticipantId],
        delivery: &dyn DeliveryClient,
        pacing: std::time::Duration,
    ) -> BatchReport {
        let mut work = SendWork {
            session: self,
            delivery,
        };
        batch::run_batch(&mut work, ids, pacing).await
    }

    fn label(&self, id: &ParticipantId) -> String {
        self.get(id)
            .map(|p| p.full_name.clone())
            .unwrap_or_else(|_| id.to_string())
    }
}

struct DownloadWork<'a> {
    session: &'a mut Session,
    dir: PathBuf,
}

#[async_trait::async_trait]
impl<'a> BatchWork for DownloadWork<'a> {
    type Item = ParticipantId;

    fn label(&self, id: &ParticipantId) -> String {
        self.session.label(id)
    }

    async fn run(&mut self, id: &ParticipantId) -> Result<(), CertError> {
        let (file_name, png) = self.session.download(id).await?;
        let path = self.dir.join(file_name);
        tokio::fs::write(&path, png).await?;
        tracing::debug!(path = %path.display(), "certificate written");
        Ok(())
    }
}

struct SendWork<'a> {
    session: &'a mut Session,
    delivery: &'a dyn DeliveryClient,
}

#[async_trait::async_trait]
impl<'a> BatchWork for SendWork<'a> {
    type Item = ParticipantId;

    fn label(&self, id: &ParticipantId) -> String {
        self.session.label(id)
    }

    async fn run(&mut self, id: &ParticipantId) -> Result<(), CertError> {
        self.session.send(id, self.delivery).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delivery::DeliveryReceipt;
    use crate::participant::EventConfig;
    use async_trait::async_trait;
    use image::{Rgba, RgbaImage};
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;
    use std::time::Duration;

    const SHEET: &str = "Nombres y Apellidos,Correo Electrónico,DNI\n\
                         Juan Pérez,juan@x.com,12345678\n\
                         Ana Quispe,ana@x.com,87654321\n\
                         Sin Correo,,11111111\n";

    struct FakeDelivery {
        refuse: Vec<String>,
        /// Persisted id handed back for every participant, if set.
        fixed_id: Option<String>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeDelivery {
        fn new(refuse: &[&str]) -> Self {
            Self {
                refuse: refuse.iter().map(|s| s.to_string()).collect(),
                fixed_id: None,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl DeliveryClient for FakeDelivery {
        async fn deliver(&self, request: DeliveryRequest) -> Result<DeliveryReceipt, CertError> {
            let email = request.participant.email.clone();
            self.calls.lock().unwrap().push(email.clone());
            assert!(!request.png.is_empty());
            assert!(request.template_image.starts_with("data:image/png;base64,"));
            if self.refuse.contains(&email) {
                return Err(CertError::Delivery("mailbox unavailable".into()));
            }
            Ok(DeliveryReceipt {
                participant_id: self.fixed_id.clone().unwrap_or_else(|| format!("db-{}", email)),
                qr_code: Some(format!("https://certs.example/certificate/db-{}", email)),
            })
        }
    }

    fn template() -> Template {
        let img = RgbaImage::from_pixel(600, 400, Rgba([255, 255, 255, 255]));
        Template::from_bytes(render::encode_png(&img).unwrap())
    }

    fn loaded_session() -> Session {
        let mut session = Session::new("https://certs.example", FontSet::Bitmap, LayoutConfig::default());
        session.load_spreadsheet(SHEET.as_bytes(), Some("lista.csv")).unwrap();
        session
    }

    fn id_of(session: &Session, name: &str) -> ParticipantId {
        session
            .participants()
            .iter()
            .find(|p| p.full_name == name)
            .unwrap()
            .id
            .clone()
    }

    #[test]
    fn test_load_spreadsheet_summary() {
        let mut session = Session::new("https://certs.example", FontSet::Bitmap, LayoutConfig::default());
        let summary = session.load_spreadsheet(SHEET.as_bytes(), Some("lista.csv")).unwrap();
        assert_eq!(summary.loaded, 2);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.headers, vec!["Nombres y Apellidos", "Correo Electrónico", "DNI"]);
    }

    #[test]
    fn test_failed_upload_keeps_previous_set() {
        let mut session = loaded_session();
        let err = session
            .load_spreadsheet(b"Nombre,Telefono\nAna,999\n", Some("otra.csv"))
            .unwrap_err();
        assert!(matches!(err, CertError::NoValidRecords { .. }));
        assert_eq!(session.participants().len(), 2);
    }

    #[test]
    fn test_update_and_delete() {
        let mut session = loaded_session();
        let id = id_of(&session, "Ana Quispe");
        session
            .update_participant(
                &id,
                ParticipantPatch {
                    role: Some("Secretaria".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(session.get(&id).unwrap().role, "Secretaria");

        let removed = session.delete_participant(&id).unwrap();
        assert_eq!(removed.full_name, "Ana Quispe");
        assert!(matches!(session.get(&id), Err(CertError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_render_without_template() {
        let mut session = loaded_session();
        let id = id_of(&session, "Juan Pérez");
        assert!(matches!(session.preview(&id).await, Err(CertError::TemplateMissing)));
    }

    #[tokio::test]
    async fn test_preview_is_cached_until_template_changes() {
        let mut session = loaded_session();
        session.set_template(template());
        let id = id_of(&session, "Juan Pérez");
        let png = session.preview(&id).await.unwrap();
        assert_eq!(session.preview.as_ref().unwrap().png, png);
        assert_eq!(session.preview(&id).await.unwrap(), png);

        session.set_template(template());
        assert!(session.preview.is_none());
    }

    #[tokio::test]
    async fn test_preview_cache_follows_render_inputs() {
        let mut session = loaded_session();
        session.set_template(template());
        let id = id_of(&session, "Juan Pérez");
        let before = session.preview(&id).await.unwrap();

        session
            .update_participant(
                &id,
                ParticipantPatch {
                    full_name: Some("Juan Pérez Quispe".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(session.preview.is_none());
        let renamed = session.preview(&id).await.unwrap();
        assert_ne!(before, renamed);

        session
            .set_layout(LayoutConfig {
                name_y: 20.0,
                ..Default::default()
            })
            .unwrap();
        assert!(session.preview.is_none());
        assert_ne!(session.preview(&id).await.unwrap(), renamed);
    }

    #[test]
    fn test_set_layout_rejects_out_of_range() {
        let mut session = loaded_session();
        let err = session
            .set_layout(LayoutConfig {
                name_font_size: 1.0e8,
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, CertError::InvalidLayout(_)));
        assert_eq!(session.layout(), LayoutConfig::default());
    }

    #[tokio::test]
    async fn test_download_file_name() {
        let mut session = loaded_session();
        session.set_template(template());
        let id = id_of(&session, "Juan Pérez");
        let (name, png) = session.download(&id).await.unwrap();
        assert_eq!(name, "certificado_Juan_Pérez.png");
        assert!(png.starts_with(&[0x89, b'P', b'N', b'G']));
    }

    #[tokio::test]
    async fn test_layout_preview_uses_current_layout() {
        let mut session = loaded_session();
        session.set_template(template());
        let a = session.layout_preview(None).await.unwrap();
        session
            .set_layout(LayoutConfig {
                name_y: 20.0,
                ..Default::default()
            })
            .unwrap();
        let b = session.layout_preview(None).await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_send_folds_receipt_back() {
        let mut session = loaded_session();
        session.set_template(template());
        session.set_profile(EventProfile {
            config: EventConfig {
                event_title: "Pausa Activa".into(),
                ..Default::default()
            },
            ..Default::default()
        });
        let id = id_of(&session, "Juan Pérez");
        let delivery = FakeDelivery::new(&[]);

        let new_id = session.send(&id, &delivery).await.unwrap();
        assert_eq!(new_id.as_str(), "db-juan@x.com");

        let p = session.get(&new_id).unwrap();
        assert!(p.persisted);
        assert!(p.email_sent);
        assert!(p.email_sent_at.is_some());
        assert_eq!(p.qr_payload, "https://certs.example/certificate/db-juan@x.com");
        assert!(session.get(&id).is_err());
    }

    #[tokio::test]
    async fn test_send_rejects_bad_email_before_rendering() {
        let mut session = loaded_session();
        let id = id_of(&session, "Ana Quispe");
        session
            .update_participant(
                &id,
                ParticipantPatch {
                    email: Some("ana.x.com".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        let delivery = FakeDelivery::new(&[]);
        // no template loaded: the email check must come first
        let err = session.send(&id, &delivery).await.unwrap_err();
        assert!(matches!(err, CertError::InvalidEmail(ref e) if e == "ana.x.com"));
        assert!(delivery.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_send_keeps_ids_unique() {
        let mut session = loaded_session();
        session.set_template(template());
        let juan = id_of(&session, "Juan Pérez");
        let ana = id_of(&session, "Ana Quispe");
        let delivery = FakeDelivery {
            fixed_id: Some("db-1".into()),
            ..FakeDelivery::new(&[])
        };

        assert_eq!(session.send(&juan, &delivery).await.unwrap().as_str(), "db-1");
        let kept = session.send(&ana, &delivery).await.unwrap();
        assert_eq!(kept, ana);

        let stored = session.get(&ana).unwrap();
        assert!(stored.email_sent);
        let ids: Vec<&ParticipantId> = session.participants().iter().map(|p| &p.id).collect();
        assert_eq!(ids, vec![&ParticipantId("db-1".into()), &ana]);
    }

    #[tokio::test]
    async fn test_send_bulk_partial_failure() {
        let mut session = loaded_session();
        session.set_template(template());
        let ids: Vec<ParticipantId> = session.participants().iter().map(|p| p.id.clone()).collect();
        let delivery = FakeDelivery::new(&["ana@x.com"]);

        let report = session.send_bulk(&ids, &delivery, Duration::ZERO).await;
        assert_eq!(report.total, 2);
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.errors[0].name, "Ana Quispe");
        assert_eq!(
            *delivery.calls.lock().unwrap(),
            vec!["juan@x.com".to_string(), "ana@x.com".to_string()]
        );

        let ana = session.participants().iter().find(|p| p.full_name == "Ana Quispe").unwrap();
        assert!(!ana.email_sent);
    }

    #[tokio::test]
    async fn test_download_all_writes_files() {
        let mut session = loaded_session();
        session.set_template(template());
        let dir = std::env::temp_dir().join(format!("certforge-download-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let report = session.download_all(&dir, Duration::ZERO).await;
        assert_eq!(report.succeeded, 2);
        assert!(dir.join("certificado_Juan_Pérez.png").exists());
        assert!(dir.join("certificado_Ana_Quispe.png").exists());
    }

    #[tokio::test]
    async fn test_download_all_keeps_slashes_inside_dir() {
        let mut session = loaded_session();
        session.set_template(template());
        let id = id_of(&session, "Ana Quispe");
        session
            .update_participant(
                &id,
                ParticipantPatch {
                    full_name: Some("AC/DC".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        let dir = std::env::temp_dir().join(format!("certforge-slashes-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();

        let report = session.download_all(&dir, Duration::ZERO).await;
        assert!(report.is_complete_success());
        assert!(dir.join("certificado_AC_DC.png").exists());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_download_all_without_template_reports_each() {
        let mut session = loaded_session();
        let report = session.download_all(&std::env::temp_dir(), Duration::ZERO).await;
        assert_eq!(report.failed, 2);
        assert_eq!(report.succeeded, 0);
    }
}
