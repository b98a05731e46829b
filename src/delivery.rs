//! # Delivery Collaborator
//!
//! The boundary to the service that emails a certificate and stores the
//! participant. The core only knows the [`DeliveryClient`] trait;
//! [`HttpDelivery`] is the multipart/JSON implementation.
//!
//! ## Request (multipart/form-data)
//!
//! | Part | Content |
//! |------|---------|
//! | `certificate` | PNG file `certificado_<name>.png` |
//! | `email` | destination address |
//! | `name` | participant display name |
//! | `eventTitle` | event title |
//! | `certificateBase64` | PNG as a `data:` URL |
//! | `participantData` | JSON: participant + event id, config, logos, signatures, template |
//!
//! ## Response
//!
//! `{"participantId": "...", "qrCode": "..."}` on success. A non-2xx status
//! or an `error` field means the delivery failed.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CertError;
use crate::participant::{EventConfig, EventProfile, Logos, Participant, Signature};

/// Everything the collaborator receives for one certificate.
#[derive(Debug, Clone)]
pub struct DeliveryRequest {
    pub participant: Participant,
    pub profile: EventProfile,
    pub png: Vec<u8>,
    /// The template as a `data:` URL.
    pub template_image: String,
}

/// What the collaborator returns on success.
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryReceipt {
    pub participant_id: String,
    pub qr_code: Option<String>,
}

#[async_trait]
pub trait DeliveryClient: Send + Sync {
    async fn deliver(&self, request: DeliveryRequest) -> Result<DeliveryReceipt, CertError>;
}

/// The `participantData` JSON blob.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ParticipantData<'a> {
    #[serde(flatten)]
    participant: &'a Participant,
    event_id: &'a str,
    event_config: &'a EventConfig,
    logos: &'a Logos,
    signatures: &'a [Signature],
    template_image: &'a str,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeliveryResponse {
    participant_id: Option<String>,
    qr_code: Option<String>,
    error: Option<String>,
    details: Option<String>,
}

/// Delivery over HTTP to a single endpoint.
#[derive(Debug, Clone)]
pub struct HttpDelivery {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpDelivery {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, CertError> {
        let client = reqwest::Client::builder()
            .user_agent("certforge/0.1")
            .build()
            .map_err(|e| CertError::Config(format!("HTTP client error: {}", e)))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn form(request: &DeliveryRequest) -> Result<reqwest::multipart::Form, CertError> {
        let participant = &request.participant;
        let data = ParticipantData {
            participant,
            event_id: &request.profile.event_id,
            event_config: &request.profile.config,
            logos: &request.profile.logos,
            signatures: &request.profile.signatures,
            template_image: &request.template_image,
        };
        let data = serde_json::to_string(&data)
            .map_err(|e| CertError::Delivery(format!("Failed to serialize participant: {}", e)))?;

        let file = reqwest::multipart::Part::bytes(request.png.clone())
            .file_name(format!("certificado_{}.png", participant.full_name))
            .mime_str("image/png")
            .map_err(|e| CertError::Delivery(e.to_string()))?;

        Ok(reqwest::multipart::Form::new()
            .part("certificate", file)
            .text("email", participant.email.clone())
            .text("name", participant.full_name.clone())
            .text("eventTitle", request.profile.config.event_title.clone())
            .text(
                "certificateBase64",
                crate::render::data_url("image/png", &request.png),
            )
            .text("participantData", data))
    }
}

#[async_trait]
impl DeliveryClient for HttpDelivery {
    async fn deliver(&self, request: DeliveryRequest) -> Result<DeliveryReceipt, CertError> {
        let form = Self::form(&request)?;
        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| CertError::Delivery(format!("Request failed: {}", e)))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let parsed: DeliveryResponse = serde_json::from_str(&body).unwrap_or_default();
        interpret(status, parsed)
    }
}

fn interpret(status: reqwest::StatusCode, body: DeliveryResponse) -> Result<DeliveryReceipt, CertError> {
    if !status.is_success() || body.error.is_some() {
        let message = body
            .error
            .or(body.details)
            .unwrap_or_else(|| format!("endpoint returned {}", status));
        return Err(CertError::Delivery(message));
    }
    match body.participant_id {
        Some(participant_id) => Ok(DeliveryReceipt {
            participant_id,
            qr_code: body.qr_code,
        }),
        None => Err(CertError::Delivery(
            "response did not include a participantId".to_string(),
        )),
    }
}
