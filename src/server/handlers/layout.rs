//! Layout API handlers.

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::layout::LayoutConfig;

use super::super::state::AppState;
use super::{png_response, reject};

/// GET /api/layout - Current layout.
pub async fn get(State(state): State<Arc<AppState>>) -> Json<LayoutConfig> {
    Json(state.session.lock().await.layout())
}

/// PUT /api/layout - Change the layout for subsequent renders (not persisted).
pub async fn put(
    State(state): State<Arc<AppState>>,
    Json(layout): Json<LayoutConfig>,
) -> Result<Json<LayoutConfig>, (StatusCode, String)> {
    state.session.lock().await.set_layout(layout).map_err(reject)?;
    Ok(Json(layout))
}

/// POST /api/layout/save - Persist the current layout.
pub async fn save(
    State(state): State<Arc<AppState>>,
) -> Result<Json<LayoutConfig>, (StatusCode, String)> {
    let layout = state.session.lock().await.layout();
    state.layout_store.save(&layout).map_err(reject)?;
    Ok(Json(layout))
}

#[derive(Debug, Deserialize)]
pub struct PreviewQuery {
    pub name: Option<String>,
}

/// GET /api/layout/preview - Render the layout with a sample name.
pub async fn preview(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PreviewQuery>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let mut session = state.session.lock().await;
    let png = session
        .layout_preview(query.name.as_deref())
        .await
        .map_err(reject)?;
    Ok(png_response(png))
}
