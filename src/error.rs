use std::path::PathBuf;
use thiserror::Error;

/// Failures while reading, transforming or writing PDF documents.
#[derive(Debug, Error)]
pub enum PdfError {
    /// The file could not be parsed as a PDF (corrupt, truncated, unsupported).
    #[error("failed to parse PDF '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: lopdf::Error,
    },

    /// Serialising a document to its destination failed.
    #[error("failed to write PDF '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Filesystem failure around a PDF operation.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The document parsed fine but has no pages to work with.
    #[error("PDF '{path}' contains no pages")]
    EmptyDocument { path: PathBuf },

    #[error("page {page} is out of range (1-{total})")]
    PageOutOfRange { page: u32, total: u32 },

    /// Merging needs at least two inputs.
    #[error("merging needs at least 2 documents, got {got}")]
    NotEnoughInputs { got: usize },
}

/// Rejections produced by upload validation, before anything touches disk.
/// The display text is the message shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadError {
    #[error("No file selected.")]
    NoFileSelected,

    #[error("Invalid file format. Only PDF files are allowed.")]
    InvalidFormat { filename: String },

    #[error("Please select at least two PDF files.")]
    InsufficientFiles { got: usize },
}
