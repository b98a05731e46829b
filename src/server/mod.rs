//! # HTTP Server for Certificate Generation
//!
//! A thin JSON/multipart API over one shared [`Session`](crate::session::Session).
//!
//! ## Usage
//!
//! ```bash
//! certforge serve --listen 0.0.0.0:8080 --endpoint https://mailer.example/api/send-certificate
//! ```

mod handlers;
mod state;

pub use state::{AppState, ServerConfig};

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, patch, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::error::CertError;

/// Build the API router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        // Participants (25MB limit for workbooks)
        .route(
            "/api/participants/upload",
            post(handlers::participants::upload).layer(DefaultBodyLimit::max(25 * 1024 * 1024)),
        )
        .route("/api/participants", get(handlers::participants::list))
        .route(
            "/api/participants/:id",
            patch(handlers::participants::update).delete(handlers::participants::delete),
        )
        .route(
            "/api/participants/:id/preview",
            get(handlers::participants::preview),
        )
        .route(
            "/api/participants/:id/download",
            get(handlers::participants::download),
        )
        .route(
            "/api/participants/:id/send",
            post(handlers::participants::send),
        )
        .route("/api/send-bulk", post(handlers::participants::send_bulk))
        // Template (50MB limit for images)
        .route(
            "/api/template",
            post(handlers::template::upload).layer(DefaultBodyLimit::max(50 * 1024 * 1024)),
        )
        // Event and layout
        .route(
            "/api/event",
            get(handlers::event::get).put(handlers::event::put),
        )
        .route(
            "/api/layout",
            get(handlers::layout::get).put(handlers::layout::put),
        )
        .route("/api/layout/save", post(handlers::layout::save))
        .route("/api/layout/preview", get(handlers::layout::preview))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server.
pub async fn serve(config: ServerConfig, state: Arc<AppState>) -> Result<(), CertError> {
    let app = router(state);

    tracing::info!(listen = %config.listen_addr, "certforge HTTP server starting");

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .map_err(|e| CertError::Config(format!("Failed to bind to {}: {}", config.listen_addr, e)))?;

    axum::serve(listener, app).await?;

    Ok(())
}
