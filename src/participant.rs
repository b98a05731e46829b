//! # Participant Data Model
//!
//! Canonical participant records plus the event-level inputs shared by every
//! render. The serde names follow the field names the delivery collaborator
//! stores, so a `Participant` serializes straight into the `participantData`
//! blob.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque participant identifier.
///
/// Assigned once at ingestion (`temp-<uuid>`) and replaced by the persisted
/// identifier after a successful delivery.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(pub String);

impl ParticipantId {
    /// Generate a fresh in-memory identifier.
    pub fn temporary() -> Self {
        Self(format!("temp-{}", Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ParticipantId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// One row of canonical participant data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    #[serde(rename = "marca_temporal")]
    pub submitted_at: String,
    #[serde(rename = "correo")]
    pub email: String,
    #[serde(rename = "nombres_apellidos")]
    pub full_name: String,
    #[serde(rename = "documento_identidad")]
    pub document_id: String,
    #[serde(rename = "genero")]
    pub gender: String,
    #[serde(rename = "numero_celular")]
    pub phone: String,
    #[serde(rename = "regimen_laboral")]
    pub employment_regime: String,
    #[serde(rename = "organo_unidad")]
    pub org_unit: String,
    #[serde(rename = "cargo")]
    pub role: String,
    #[serde(rename = "encuesta_satisfaccion")]
    pub survey: String,
    /// URL encoded into the certificate's QR code. Empty means no QR code.
    #[serde(rename = "qr_code")]
    pub qr_payload: String,
    #[serde(rename = "emailSent")]
    pub email_sent: bool,
    #[serde(rename = "emailSentAt")]
    pub email_sent_at: Option<DateTime<Utc>>,
    #[serde(rename = "savedToDB")]
    pub persisted: bool,
}

impl Participant {
    /// A participant with only a name and email, everything else blank.
    pub fn new(full_name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: ParticipantId::temporary(),
            submitted_at: String::new(),
            email: email.into(),
            full_name: full_name.into(),
            document_id: String::new(),
            gender: String::new(),
            phone: String::new(),
            employment_regime: String::new(),
            org_unit: String::new(),
            role: String::new(),
            survey: String::new(),
            qr_payload: String::new(),
            email_sent: false,
            email_sent_at: None,
            persisted: false,
        }
    }

    /// Deterministic PNG file name for this participant's certificate.
    ///
    /// Runs of whitespace collapse to a single underscore. Path separators,
    /// control characters and characters Windows forbids in file names become
    /// `_`, so the result is always a single path component.
    pub fn certificate_file_name(&self) -> String {
        let mut out = String::from("certificado_");
        let mut in_space = false;
        for ch in self.full_name.chars() {
            if ch.is_whitespace() {
                if !in_space {
                    out.push('_');
                }
                in_space = true;
            } else {
                let forbidden = ch.is_control()
                    || matches!(ch, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|');
                out.push(if forbidden { '_' } else { ch });
                in_space = false;
            }
        }
        out.push_str(".png");
        out
    }

    /// Apply a manual edit. Only fields present in the patch change.
    pub fn apply(&mut self, patch: ParticipantPatch) {
        let ParticipantPatch {
            email,
            full_name,
            document_id,
            gender,
            phone,
            employment_regime,
            org_unit,
            role,
            survey,
        } = patch;
        let fields = [
            (email, &mut self.email),
            (full_name, &mut self.full_name),
            (document_id, &mut self.document_id),
            (gender, &mut self.gender),
            (phone, &mut self.phone),
            (employment_regime, &mut self.employment_regime),
            (org_unit, &mut self.org_unit),
            (role, &mut self.role),
            (survey, &mut self.survey),
        ];
        for (value, slot) in fields {
            if let Some(v) = value {
                *slot = v;
            }
        }
    }
}

/// Build the QR payload URL for a participant identifier.
pub fn qr_payload_for(public_url: &str, id: &ParticipantId) -> String {
    format!("{}/certificate/{}", public_url.trim_end_matches('/'), id)
}

/// Partial update of the user-editable participant fields.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ParticipantPatch {
    #[serde(rename = "correo")]
    pub email: Option<String>,
    #[serde(rename = "nombres_apellidos")]
    pub full_name: Option<String>,
    #[serde(rename = "documento_identidad")]
    pub document_id: Option<String>,
    #[serde(rename = "genero")]
    pub gender: Option<String>,
    #[serde(rename = "numero_celular")]
    pub phone: Option<String>,
    #[serde(rename = "regimen_laboral")]
    pub employment_regime: Option<String>,
    #[serde(rename = "organo_unidad")]
    pub org_unit: Option<String>,
    #[serde(rename = "cargo")]
    pub role: Option<String>,
    #[serde(rename = "encuesta_satisfaccion")]
    pub survey: Option<String>,
}

/// Event-level text fields. Identical for every participant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EventConfig {
    pub event_title: String,
    pub event_date: String,
    pub issue_date: String,
    pub issue_location: String,
    pub duration: String,
    pub footer_text: String,
}

impl EventConfig {
    /// The `"{location}, {date}"` line, present only when both parts are.
    pub fn issue_line(&self) -> Option<String> {
        if self.issue_location.is_empty() || self.issue_date.is_empty() {
            return None;
        }
        Some(format!("{}, {}", self.issue_location, self.issue_date))
    }
}

/// Logo image references forwarded to the delivery collaborator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Logos {
    pub left: Option<String>,
    pub right: Option<String>,
}

/// A signatory forwarded to the delivery collaborator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Signature {
    pub name: String,
    pub title: String,
    pub image: Option<String>,
}

/// Everything known about the event: the render inputs plus the metadata
/// that only travels to the delivery collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EventProfile {
    pub event_id: String,
    pub config: EventConfig,
    pub logos: Logos,
    pub signatures: Vec<Signature>,
}

impl Default for EventProfile {
    fn default() -> Self {
        Self {
            event_id: "default-event".to_string(),
            config: EventConfig::default(),
            logos: Logos::default(),
            signatures: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_certificate_file_name_collapses_whitespace() {
        let p = Participant::new("Juan   Carlos\tPérez", "juan@x.com");
        assert_eq!(p.certificate_file_name(), "certificado_Juan_Carlos_Pérez.png");
    }

    #[test]
    fn test_certificate_file_name_is_one_path_component() {
        let p = Participant::new("AC/DC", "a@x.com");
        assert_eq!(p.certificate_file_name(), "certificado_AC_DC.png");

        let p = Participant::new("x/../../y", "a@x.com");
        let name = p.certificate_file_name();
        assert_eq!(name, "certificado_x_.._.._y.png");
        assert_eq!(std::path::Path::new(&name).components().count(), 1);

        let p = Participant::new("a\\b:c*d?e\"f<g>h|i", "a@x.com");
        assert_eq!(p.certificate_file_name(), "certificado_a_b_c_d_e_f_g_h_i.png");
    }

    #[test]
    fn test_issue_line_requires_both_parts() {
        let mut cfg = EventConfig {
            issue_location: "Abancay".into(),
            issue_date: "12 de marzo de 2025".into(),
            ..Default::default()
        };
        assert_eq!(cfg.issue_line().as_deref(), Some("Abancay, 12 de marzo de 2025"));

        cfg.issue_date.clear();
        assert_eq!(cfg.issue_line(), None);

        cfg.issue_date = "hoy".into();
        cfg.issue_location.clear();
        assert_eq!(cfg.issue_line(), None);
    }

    #[test]
    fn test_apply_patch_only_touches_given_fields() {
        let mut p = Participant::new("Ana", "ana@x.com");
        p.role = "Juez".into();
        p.apply(ParticipantPatch {
            email: Some("ana@poder.pe".into()),
            ..Default::default()
        });
        assert_eq!(p.email, "ana@poder.pe");
        assert_eq!(p.full_name, "Ana");
        assert_eq!(p.role, "Juez");
    }

    #[test]
    fn test_participant_wire_names() {
        let p = Participant::new("Ana", "ana@x.com");
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["nombres_apellidos"], "Ana");
        assert_eq!(json["correo"], "ana@x.com");
        assert_eq!(json["savedToDB"], false);
        assert!(json["id"].as_str().unwrap().starts_with("temp-"));
    }

    #[test]
    fn test_qr_payload_for_trims_trailing_slash() {
        let id = ParticipantId::from("temp-1");
        assert_eq!(
            qr_payload_for("https://certs.example/", &id),
            "https://certs.example/certificate/temp-1"
        );
    }
}
