//! # Certforge - Participant Certificates from Spreadsheets
//!
//! Certforge reads a spreadsheet of event participants whose columns can be
//! named almost anything, reconciles it with a fixed participant schema, and
//! renders one certificate image per participant on top of a template. It
//! provides:
//!
//! - **Ingestion**: fuzzy column resolution and record validation
//! - **Rendering**: template + upper-cased name + issue line + QR code
//! - **Batches**: sequential, paced download/delivery with failure tallies
//! - **Delivery**: a multipart HTTP client for the mailing collaborator
//!
//! ## Quick Start
//!
//! ```no_run
//! use certforge::{
//!     layout::LayoutConfig,
//!     render::{encode_png, font::FontSet, Template},
//!     session::Session,
//! };
//!
//! # async fn example() -> Result<(), certforge::CertError> {
//! let mut session = Session::new("https://certs.example", FontSet::Bitmap, LayoutConfig::default());
//! session.load_spreadsheet(&std::fs::read("participants.xlsx")?, Some("participants.xlsx"))?;
//! session.set_template(Template::from_bytes(std::fs::read("template.png")?));
//!
//! let id = session.participants()[0].id.clone();
//! let (file_name, png) = session.download(&id).await?;
//! std::fs::write(file_name, png)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`ingest`] | Workbook reading, column resolution, validation |
//! | [`participant`] | Participant and event data model |
//! | [`layout`] | Text placement parameters and their persistence |
//! | [`render`] | Certificate compositing |
//! | [`batch`] | Sequential batch orchestration |
//! | [`delivery`] | Delivery collaborator client |
//! | [`session`] | In-memory participant set and single/bulk operations |
//! | [`server`] | HTTP API |
//! | [`error`] | Error types |

pub mod batch;
pub mod delivery;
pub mod error;
pub mod ingest;
pub mod layout;
pub mod participant;
pub mod render;
pub mod server;
pub mod session;

// Re-exports for convenience
pub use error::CertError;
pub use layout::LayoutConfig;
pub use participant::{EventConfig, Participant};
pub use session::Session;
