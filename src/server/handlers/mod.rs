//! HTTP handlers for the server.

pub mod event;
pub mod layout;
pub mod participants;
pub mod template;

use axum::{
    extract::Multipart,
    http::{StatusCode, header},
    response::IntoResponse,
};

use crate::error::CertError;

/// Map a library error onto an HTTP error response.
pub fn reject(err: CertError) -> (StatusCode, String) {
    let status = match &err {
        CertError::IngestionEmpty
        | CertError::NoValidRecords { .. }
        | CertError::Spreadsheet(_)
        | CertError::TemplateMissing
        | CertError::Decode(_)
        | CertError::InvalidLayout(_)
        | CertError::InvalidEmail(_) => StatusCode::UNPROCESSABLE_ENTITY,
        CertError::NotFound(_) => StatusCode::NOT_FOUND,
        CertError::Delivery(_) => StatusCode::BAD_GATEWAY,
        CertError::Image(_) | CertError::Font(_) | CertError::Config(_) | CertError::Io(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, err.to_string())
}

/// Read the first multipart field called `field`: `(file name, bytes)`.
pub async fn read_upload(
    multipart: &mut Multipart,
    field: &str,
) -> Result<(Option<String>, Vec<u8>), (StatusCode, String)> {
    while let Some(part) = multipart
        .next_field()
        .await
        .map_err(|e| (StatusCode::BAD_REQUEST, format!("Multipart error: {}", e)))?
    {
        if part.name() == Some(field) {
            let file_name = part.file_name().map(str::to_string);
            let bytes = part
                .bytes()
                .await
                .map_err(|e| (StatusCode::BAD_REQUEST, format!("Failed to read upload: {}", e)))?;
            return Ok((file_name, bytes.to_vec()));
        }
    }
    Err((StatusCode::BAD_REQUEST, format!("No {} field found", field)))
}

pub fn png_response(png: Vec<u8>) -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "image/png")], png)
}
