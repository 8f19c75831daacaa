//! Error types for the letterguard library.
//!
//! A letter that fails the layout check is **not** an error: it is an
//! expected outcome and is returned as a value
//! ([`crate::report::ValidationResult::Invalid`]). [`SanitiseError`] covers
//! everything else, grouped by who is at fault:
//!
//! * **Input**: the caller sent something unusable (empty body, not a PDF,
//!   a page number the document does not have).
//! * **Rendering**: the document could not even be evaluated (corrupt PDF,
//!   renderer failure, timed-out external tool).
//! * **Internal**: configuration or unexpected failures on our side.
//!
//! [`SanitiseError::kind`] exposes the grouping so an outer HTTP layer can map
//! it onto a status code without matching every variant.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the letterguard library.
#[derive(Debug, Error)]
pub enum SanitiseError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The request body was empty.
    #[error("No PDF data supplied")]
    EmptyInput,

    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The bytes do not start with the PDF magic.
    #[error("Data is not a valid PDF. First bytes: {magic:?}")]
    NotAPdf { magic: [u8; 4] },

    /// The document has no pages at all.
    #[error("PDF has no pages")]
    NoPages,

    /// A 1-indexed page number outside the document.
    #[error("Letter does not have a page {page} (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    /// A requested output format the pipeline does not produce.
    #[error("Unsupported file type '{0}': expected 'pdf' or 'png'")]
    UnsupportedFileType(String),

    // ── Rendering errors ──────────────────────────────────────────────────
    /// The PDF could not be parsed by the engine.
    #[error("Unable to read the PDF data: {detail}")]
    CorruptPdf { detail: String },

    /// The PDF is encrypted.
    #[error("PDF is password protected and cannot be checked")]
    PasswordProtected,

    /// The engine failed to rasterise a page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    /// The engine failed to draw onto a page.
    #[error("Drawing onto page {page} failed: {detail}")]
    DrawingFailed { page: usize, detail: String },

    /// Text could not be extracted from a page region.
    #[error("Text extraction failed for page {page}: {detail}")]
    TextExtractionFailed { page: usize, detail: String },

    /// The colour conversion tool exited unsuccessfully.
    #[error("CMYK conversion failed (exit code {code:?}): {stderr}")]
    ColourConversionFailed { code: Option<i32>, stderr: String },

    /// A blocking stage did not finish within its time limit.
    #[error("{stage} timed out after {secs}s")]
    Timeout { stage: &'static str, secs: u64 },

    // ── Configuration errors ──────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// No logo is registered for the organisation code.
    #[error("No logo registered for organisation '{0}'")]
    UnknownLogo(String),

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Set LETTERGUARD_PDFIUM_LIB_PATH=/path/to/libpdfium or install pdfium system-wide.\n\
Pre-built libraries: https://github.com/bblanchon/pdfium-binaries/releases\n"
    )]
    EngineBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Who is responsible for a [`SanitiseError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The caller's request was unusable; do not retry.
    Input,
    /// The document could not be evaluated.
    Rendering,
    /// Our fault.
    Internal,
}

impl ErrorKind {
    /// HTTP status an outer web layer should answer with.
    pub fn http_status(self) -> u16 {
        match self {
            ErrorKind::Input | ErrorKind::Rendering => 400,
            ErrorKind::Internal => 500,
        }
    }
}

impl SanitiseError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SanitiseError::EmptyInput
            | SanitiseError::FileNotFound { .. }
            | SanitiseError::PermissionDenied { .. }
            | SanitiseError::NotAPdf { .. }
            | SanitiseError::NoPages
            | SanitiseError::PageOutOfRange { .. }
            | SanitiseError::UnsupportedFileType(_) => ErrorKind::Input,

            SanitiseError::CorruptPdf { .. }
            | SanitiseError::PasswordProtected
            | SanitiseError::RasterisationFailed { .. }
            | SanitiseError::DrawingFailed { .. }
            | SanitiseError::TextExtractionFailed { .. }
            | SanitiseError::ColourConversionFailed { .. }
            | SanitiseError::Timeout { .. } => ErrorKind::Rendering,

            SanitiseError::InvalidConfig(_)
            | SanitiseError::UnknownLogo(_)
            | SanitiseError::EngineBindingFailed(_)
            | SanitiseError::Internal(_) => ErrorKind::Internal,
        }
    }
}
