//! Error types for the edgequake-layout library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`LayoutError`] — **Fatal**: the operation cannot proceed at all
//!   (credentials missing, input file absent, the service rejected the
//!   document, a mandatory field is missing). Returned as `Err(LayoutError)`
//!   from the top-level `analyze*` and `visualize*` functions.
//!
//! * [`ShapeError`] — **Non-fatal**: one overlay shape could not be drawn,
//!   but every other shape is fine. Stored in
//!   [`crate::pipeline::overlay::OverlayStats`] so the annotated PDF is still
//!   written with whatever was drawn.
//!
//! Degenerate geometry (an empty or single-point polygon) is neither: it is
//! skipped and counted, because partial detections are routine.

use crate::pipeline::overlay::ElementCategory;
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-layout library.
#[derive(Debug, Error)]
pub enum LayoutError {
    // ── Configuration errors ──────────────────────────────────────────────
    /// Endpoint and/or key are not configured; no request was attempted.
    #[error("Missing service credentials: {missing} not set.\n{hint}")]
    MissingCredentials { missing: String, hint: String },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Input errors ──────────────────────────────────────────────────────
    /// Source document was not found at the given path.
    #[error("Document not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Persisted analysis file was not found at the given path.
    #[error("Analysis file not found: '{path}'\nRun `doclayout analyze` first.")]
    AnalysisNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a usable file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// The overlay source exists but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    /// The overlay output would overwrite the source PDF.
    #[error("Output path '{path}' is the input PDF; choose a different output file")]
    OutputIsInput { path: PathBuf },

    // ── Remote analysis errors ────────────────────────────────────────────
    /// Transport-level failure talking to the service.
    #[error("Layout service request failed: {detail}")]
    ServiceRequest { detail: String },

    /// The service answered with a non-success HTTP status.
    #[error(
        "Layout service returned HTTP {status}{}: {message}",
        code.as_ref().map(|c| format!(" ({c})")).unwrap_or_default()
    )]
    ServiceStatus {
        status: u16,
        code: Option<String>,
        message: String,
    },

    /// The analyze request was accepted without an `Operation-Location` header.
    #[error("Layout service accepted the request but returned no Operation-Location header")]
    MissingOperationLocation,

    /// The service finished the operation with status `failed`.
    #[error("Layout analysis failed: {code}: {message}")]
    AnalysisFailed { code: String, message: String },

    /// The operation was still running after the configured number of polls.
    #[error("Layout analysis still running after {attempts} status checks\nIncrease --max-polls.")]
    PollLimitExceeded { attempts: u32 },

    /// The service response could not be decoded.
    #[error("Malformed layout service response: {detail}")]
    MalformedResponse { detail: String },

    // ── Shaping errors ────────────────────────────────────────────────────
    /// A field the schema requires is absent from the service result.
    #[error("{element} #{index} on page {page} has no {field}")]
    MissingField {
        element: &'static str,
        page: u32,
        index: usize,
        field: &'static str,
    },

    // ── Loading errors ────────────────────────────────────────────────────
    /// A persisted analysis file exists but could not be parsed.
    #[error("Could not read analysis '{path}': {detail}")]
    AnalysisParse { path: PathBuf, detail: String },

    // ── Rendering errors ──────────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
You can:\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium (or the directory containing it).\n\
  • Place libpdfium next to the binary or install it system-wide.\n"
    )]
    PdfiumBindingFailed(String),

    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// The page to annotate could not be opened.
    #[error("Page {page} could not be opened: {detail}")]
    PageUnavailable { page: usize, detail: String },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Serialization of the analysis or the PDF failed.
    #[error("Serialization failed: {0}")]
    Serialize(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl LayoutError {
    /// The pipeline stage that failed, for user-facing reports.
    pub fn stage(&self) -> &'static str {
        use LayoutError::*;
        match self {
            MissingCredentials { .. } | InvalidConfig(_) => "configuration",
            FileNotFound { .. }
            | AnalysisNotFound { .. }
            | PermissionDenied { .. }
            | InvalidInput { .. }
            | NotAPdf { .. }
            | OutputIsInput { .. } => "input",
            ServiceRequest { .. }
            | ServiceStatus { .. }
            | MissingOperationLocation
            | AnalysisFailed { .. }
            | PollLimitExceeded { .. }
            | MalformedResponse { .. } => "analysis",
            MissingField { .. } => "shaping",
            AnalysisParse { .. } => "loading",
            PdfiumBindingFailed(_) | CorruptPdf { .. } | PageUnavailable { .. } => "rendering",
            OutputWriteFailed { .. } | Serialize(_) => "output",
            Internal(_) => "internal",
        }
    }
}

/// A non-fatal error for a single overlay shape.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum ShapeError {
    /// pdfium refused to build or attach the path object.
    #[error("{category} #{index}: drawing failed: {detail}")]
    DrawFailed {
        category: ElementCategory,
        index: usize,
        detail: String,
    },
}
