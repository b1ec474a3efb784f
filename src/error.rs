use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("input PDF not found: {}", .0.display())]
    MissingInput(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON write error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("XLSX write error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("failed to load PDF: {0}")]
    PdfLoad(#[from] lopdf::Error),

    #[error("invalid option: {0}")]
    InvalidOption(String),

    #[error("no pages available after applying selection")]
    NoPagesSelected,
}

/// Failure of a single extraction backend. Never aborts a run; the pipeline
/// turns it into a warning and continues with the remaining backends.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("page {page}: content stream could not be read: {message}")]
    Content { page: u32, message: String },

    #[error("document has no text layer")]
    NoTextLayer,

    #[error("no ruling lines found in document")]
    NoRulings,
}
