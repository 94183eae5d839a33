//! Error types for the yearbook-tables library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`YearbookError`] is **fatal**: a stage cannot proceed at all (pdfium
//!   could not be bound, the manifest is unreadable, the dataset is empty
//!   where output was requested, an output file cannot be written). Returned
//!   as `Err(YearbookError)` from the top-level entry points.
//!
//! * [`ExtractionError`] is **non-fatal**: one source document could not be
//!   read (missing, corrupt, encrypted) but the rest of the batch is fine.
//!   Stored inside [`crate::output::YearStatus`] so a run over six yearbooks
//!   still produces a dataset when one of them is broken.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the yearbook-tables library.
///
/// Document-level failures use [`ExtractionError`] and are stored in the
/// batch summary rather than propagated here.
#[derive(Debug, Error)]
pub enum YearbookError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The manifest file could not be read.
    #[error("Failed to read manifest '{path}': {source}")]
    ManifestRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The manifest file was read but is not a valid year → path mapping.
    #[error("Invalid manifest '{path}': {detail}")]
    InvalidManifest { path: PathBuf, detail: String },

    /// A dataset CSV could not be parsed.
    #[error("Failed to read dataset '{path}': {detail}")]
    DatasetRead { path: PathBuf, detail: String },

    // ── Data errors ───────────────────────────────────────────────────────
    /// A downstream stage was handed an empty dataset.
    ///
    /// Consolidation itself never returns this: an empty batch is a valid
    /// result. Chart and report stages refuse to render nothing.
    #[error("Dataset is empty; nothing to {stage}")]
    EmptyDataset { stage: &'static str },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not create or write an output file (CSV, PNG or PDF).
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The CSV writer rejected a record.
    #[error("Failed to serialise dataset to '{path}': {detail}")]
    CsvWrite { path: PathBuf, detail: String },

    /// pdfium failed while painting or rasterising a chart.
    #[error("Chart '{name}' could not be rendered: {detail}")]
    ChartRenderFailed { name: String, detail: String },

    /// pdfium failed while assembling the report document.
    #[error("Report '{path}' could not be assembled: {detail}")]
    ReportFailed { path: PathBuf, detail: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium (or its directory), place the library\n\
next to the executable, or install it system-wide.\n\
Pre-built libraries: https://github.com/bblanchon/pdfium-binaries/releases\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single source document.
///
/// The consolidator records it against the year and moves on to the next
/// manifest entry.
#[derive(Debug, Clone, PartialEq, Error, serde::Serialize, serde::Deserialize)]
pub enum ExtractionError {
    /// The document path does not exist.
    #[error("{path}: file not found")]
    NotFound { path: PathBuf },

    /// The file exists but does not start with `%PDF`.
    #[error("{path}: not a PDF (first bytes {magic:?})")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    /// The process cannot read the file.
    #[error("{path}: permission denied")]
    PermissionDenied { path: PathBuf },

    /// The PDF is encrypted and no (or a wrong) password was configured.
    #[error("{path}: encrypted, password required")]
    PasswordRequired { path: PathBuf },

    /// pdfium could not open the document.
    #[error("{path}: corrupt PDF: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// A selected page could not be read.
    #[error("{path}: page {page} unreadable: {detail}")]
    PageUnreadable {
        path: PathBuf,
        page: usize,
        detail: String,
    },
}
