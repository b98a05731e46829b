//! Template upload handler.

use axum::{
    Json,
    extract::{Multipart, State},
    http::StatusCode,
};
use serde::Serialize;
use std::sync::Arc;

use crate::render::Template;

use super::super::state::AppState;
use super::read_upload;

#[derive(Debug, Serialize)]
pub struct TemplateResponse {
    pub filename: String,
    pub width: u32,
    pub height: u32,
}

/// POST /api/template - Upload the certificate background (field `image`).
///
/// The image is decoded once here so a broken upload is rejected up front.
pub async fn upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<TemplateResponse>, (StatusCode, String)> {
    let (file_name, bytes) = read_upload(&mut multipart, "image").await?;

    let (width, height) = image::load_from_memory(&bytes)
        .map(|img| (img.width(), img.height()))
        .map_err(|e| (StatusCode::BAD_REQUEST, format!("Failed to decode image: {}", e)))?;

    let mut session = state.session.lock().await;
    session.set_template(Template::from_bytes(bytes));
    tracing::info!(width, height, "template loaded");

    Ok(Json(TemplateResponse {
        filename: file_name.unwrap_or_else(|| "unknown".to_string()),
        width,
        height,
    }))
}
