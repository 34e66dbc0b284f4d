pub mod orchestrator;
pub mod pdf;
pub mod renderer;

pub use orchestrator::*;
pub use pdf::*;
pub use renderer::*;

use thiserror::Error;

use crate::archive::ArchiveError;
use crate::models::ValidationErrors;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("PDF font error: {0}")]
    Font(String),

    #[error("PDF save error: {0}")]
    Pdf(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Report is not ready for export: {0}")]
    Validation(ValidationErrors),

    #[error("An export is already in progress")]
    Busy,

    #[error("Rendering failed: {0}")]
    Render(#[from] RenderError),

    #[error("Render task failed: {0}")]
    Join(String),

    #[error("Archive error: {0}")]
    Archive(#[from] ArchiveError),

    #[error("Archived report not found: {0}")]
    NotFound(String),
}
