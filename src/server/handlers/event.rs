//! Event profile API handlers.

use axum::{Json, extract::State};
use std::sync::Arc;

use crate::participant::EventProfile;

use super::super::state::AppState;

/// GET /api/event - Current event profile.
pub async fn get(State(state): State<Arc<AppState>>) -> Json<EventProfile> {
    let session = state.session.lock().await;
    Json(session.profile().clone())
}

/// PUT /api/event - Replace the event profile.
pub async fn put(
    State(state): State<Arc<AppState>>,
    Json(profile): Json<EventProfile>,
) -> Json<EventProfile> {
    let mut session = state.session.lock().await;
    session.set_profile(profile.clone());
    Json(profile)
}
