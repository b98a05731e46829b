//! # Spreadsheet Ingestion
//!
//! ```text
//! bytes → workbook::read_first_sheet → Sheet
//!       → resolve::ResolvedRecord (per row)
//!       → validate::filter_valid
//!       → Vec<Participant>
//! ```
//!
//! Ingestion is all-or-nothing: an empty sheet or a sheet without a single
//! valid row fails as a whole and nothing is loaded.

pub mod resolve;
pub mod validate;
pub mod workbook;

use crate::error::CertError;
use crate::participant::{Participant, ParticipantId, qr_payload_for};

use resolve::ResolvedRecord;
use workbook::Sheet;

/// Result of a successful upload.
#[derive(Debug, Clone)]
pub struct IngestReport {
    pub participants: Vec<Participant>,
    /// Rows dropped by validation.
    pub skipped: usize,
    /// Headers detected in the sheet, in column order.
    pub headers: Vec<String>,
}

/// Read a workbook and turn its first sheet into participants.
pub fn ingest_workbook(
    bytes: &[u8],
    file_name: Option<&str>,
    public_url: &str,
) -> Result<IngestReport, CertError> {
    let sheet = workbook::read_first_sheet(bytes, file_name)?;
    ingest_sheet(&sheet, public_url)
}

/// Resolve and validate every row of an already-read sheet.
pub fn ingest_sheet(sheet: &Sheet, public_url: &str) -> Result<IngestReport, CertError> {
    if sheet.rows.is_empty() {
        return Err(CertError::IngestionEmpty);
    }

    let records = sheet.rows.iter().map(ResolvedRecord::from_row).collect();
    let (valid, skipped) = validate::filter_valid(records);

    if valid.is_empty() {
        tracing::warn!(
            rows = sheet.rows.len(),
            headers = ?sheet.headers,
            "no valid participants in upload"
        );
        return Err(CertError::NoValidRecords {
            headers: sheet.headers.clone(),
        });
    }

    let participants: Vec<Participant> = valid
        .into_iter()
        .map(|record| into_participant(record, public_url))
        .collect();

    tracing::info!(
        rows = sheet.rows.len(),
        accepted = participants.len(),
        skipped,
        "participants loaded"
    );

    Ok(IngestReport {
        participants,
        skipped,
        headers: sheet.headers.clone(),
    })
}

fn into_participant(record: ResolvedRecord, public_url: &str) -> Participant {
    let id = ParticipantId::temporary();
    let qr_payload = qr_payload_for(public_url, &id);
    Participant {
        id,
        submitted_at: record.timestamp,
        email: record.email,
        full_name: record.full_name,
        document_id: record.document_id,
        gender: record.gender,
        phone: record.phone,
        employment_regime: record.employment_regime,
        org_unit: record.org_unit,
        role: record.role,
        survey: record.survey,
        qr_payload,
        email_sent: false,
        email_sent_at: None,
        persisted: false,
    }
}
