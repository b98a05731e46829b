//! # Error Types
//!
//! This module defines error types used throughout the certforge library.
//!
//! | Variant | Scope | Fatal for |
//! |---------|-------|-----------|
//! | `IngestionEmpty` | upload | the whole upload |
//! | `NoValidRecords` | upload | the whole upload |
//! | `TemplateMissing` | render | one render |
//! | `Decode` | render | one render (template only) |
//! | `InvalidLayout` | layout edit | that edit |
//! | `InvalidEmail` | send (pre-flight) | one participant |
//! | `Delivery` | send | one participant |
//!
//! QR generation problems never surface here: the renderer logs them and
//! carries on without the code.

use thiserror::Error;

/// Main error type for certforge operations
#[derive(Debug, Error)]
pub enum CertError {
    /// The first sheet had a header row but no data rows
    #[error("Spreadsheet is empty")]
    IngestionEmpty,

    /// Every row failed validation
    #[error(
        "No valid participants found. A name column and an email column containing '@' are required. Detected columns: {}",
        .headers.join(", ")
    )]
    NoValidRecords { headers: Vec<String> },

    /// The workbook could not be opened or read
    #[error("Spreadsheet error: {0}")]
    Spreadsheet(String),

    /// A render was attempted before a template was loaded
    #[error("No certificate template loaded")]
    TemplateMissing,

    /// The template image could not be decoded
    #[error("Image decode error: {0}")]
    Decode(String),

    /// Image encoding or processing error
    #[error("Image error: {0}")]
    Image(String),

    /// Font loading error
    #[error("Font error: {0}")]
    Font(String),

    /// A layout parameter is out of range
    #[error("Invalid layout: {0}")]
    InvalidLayout(String),

    /// The participant's email cannot be sent to
    #[error("Invalid email address: '{0}'")]
    InvalidEmail(String),

    /// The delivery collaborator rejected or failed a certificate
    #[error("Delivery failed: {0}")]
    Delivery(String),

    /// No participant with the given identifier
    #[error("Participant not found: {0}")]
    NotFound(String),

    /// Invalid configuration or settings file
    #[error("Config error: {0}")]
    Config(String),

    /// I/O error wrapper
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
