//! Participant API handlers.

use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::batch::{BatchReport, SEND_PACING};
use crate::participant::{Participant, ParticipantId, ParticipantPatch};
use crate::session::LoadSummary;

use super::super::state::AppState;
use super::{png_response, read_upload, reject};

/// POST /api/participants/upload - Load participants from a workbook (field `file`).
pub async fn upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<LoadSummary>, (StatusCode, String)> {
    let (file_name, bytes) = read_upload(&mut multipart, "file").await?;
    let mut session = state.session.lock().await;
    let summary = session
        .load_spreadsheet(&bytes, file_name.as_deref())
        .map_err(reject)?;
    Ok(Json(summary))
}

/// GET /api/participants - All participants in the session.
pub async fn list(State(state): State<Arc<AppState>>) -> Json<Vec<Participant>> {
    Json(state.session.lock().await.participants().to_vec())
}

/// PATCH /api/participants/:id - Edit a participant.
pub async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(patch): Json<ParticipantPatch>,
) -> Result<Json<Participant>, (StatusCode, String)> {
    let mut session = state.session.lock().await;
    let participant = session
        .update_participant(&ParticipantId(id), patch)
        .map_err(reject)?;
    Ok(Json(participant.clone()))
}

/// DELETE /api/participants/:id - Remove a participant from the session.
pub async fn delete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Participant>, (StatusCode, String)> {
    let mut session = state.session.lock().await;
    let removed = session
        .delete_participant(&ParticipantId(id))
        .map_err(reject)?;
    Ok(Json(removed))
}

/// GET /api/participants/:id/preview - Render a certificate as PNG.
pub async fn preview(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let mut session = state.session.lock().await;
    let png = session.preview(&ParticipantId(id)).await.map_err(reject)?;
    Ok(png_response(png))
}

/// GET /api/participants/:id/download - Render a certificate as an attachment.
pub async fn download(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let mut session = state.session.lock().await;
    let (file_name, png) = session.download(&ParticipantId(id)).await.map_err(reject)?;
    let disposition = format!("attachment; filename=\"{}\"", file_name.replace('"', ""));
    Ok((
        [
            (header::CONTENT_TYPE, "image/png".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        png,
    ))
}

#[derive(Debug, Serialize)]
pub struct SendResponse {
    pub participant: Participant,
}

/// POST /api/participants/:id/send - Deliver one certificate.
pub async fn send(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SendResponse>, (StatusCode, String)> {
    let mut session = state.session.lock().await;
    let new_id = session
        .send(&ParticipantId(id), state.delivery.as_ref())
        .await
        .map_err(reject)?;
    let participant = session.get(&new_id).map_err(reject)?.clone();
    Ok(Json(SendResponse { participant }))
}

#[derive(Debug, Deserialize)]
pub struct BulkRequest {
    pub ids: Vec<String>,
}

/// POST /api/send-bulk - Deliver many certificates, one at a time.
pub async fn send_bulk(
    State(state): State<Arc<AppState>>,
    Json(req): Json<BulkRequest>,
) -> Result<Json<BatchReport>, (StatusCode, String)> {
    if req.ids.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Select at least one participant".to_string(),
        ));
    }
    let ids: Vec<ParticipantId> = req.ids.into_iter().map(ParticipantId).collect();
    let mut session = state.session.lock().await;
    let report = session
        .send_bulk(&ids, state.delivery.as_ref(), SEND_PACING)
        .await;
    Ok(Json(report))
}
