//! Error types for the rxverify library.
//!
//! Every failure is terminal for the request that raised it; the core never
//! retries OCR or rasterisation. Variants fall into two groups:
//!
//! * **Request errors**: the caller sent something the pipeline cannot
//!   verify (unsupported document, malformed item list, missing
//!   prescription). [`VerifyError::is_caller_error`] returns `true` for these.
//!
//! * **Runtime errors**: OCR/rasterisation failed on a recognised document,
//!   the process is misconfigured, or the semantic strategy's provider could
//!   not produce a judgement.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the rxverify library.
#[derive(Debug, Error)]
pub enum VerifyError {
    // ── Request errors ────────────────────────────────────────────────────
    /// The classifier could not identify an image or PDF.
    #[error("Unsupported file type for '{filename}' (detected: {detected})\nUpload an image or a PDF.")]
    UnsupportedDocument { filename: String, detected: String },

    /// The desired-items payload is malformed or missing required fields.
    #[error("Invalid desired items: {0}")]
    InvalidInput(String),

    /// Policy requires a prescription but no document was supplied.
    #[error(
        "Prescription is required for one or more medications but not provided: {}",
        medicines.join(", ")
    )]
    PrescriptionRequired { medicines: Vec<String> },

    // ── Extraction errors ─────────────────────────────────────────────────
    /// OCR or rasterisation failed on a recognised document type.
    #[error("Text extraction failed for '{filename}': {detail}")]
    Extraction { filename: String, detail: String },

    // ── Startup / configuration errors ────────────────────────────────────
    /// The prescription requirement table could not be read or parsed.
    #[error("Failed to load prescription requirement map '{path}': {detail}")]
    RequirementMap { path: PathBuf, detail: String },

    /// The OCR engine could not be initialised.
    #[error("OCR engine unavailable: {0}\nInstall tesseract or pass --tesseract /path/to/tesseract.")]
    OcrUnavailable(String),

    /// The semantic strategy's provider is not configured (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The semantic strategy failed after retries or returned an unusable answer.
    #[error("Semantic verification failed: {message}")]
    SemanticVerifier { message: String },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl VerifyError {
    /// `true` when the request itself was at fault rather than the service.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            VerifyError::UnsupportedDocument { .. }
                | VerifyError::InvalidInput(_)
                | VerifyError::PrescriptionRequired { .. }
        )
    }

    pub(crate) fn extraction(filename: &str, detail: impl Into<String>) -> Self {
        VerifyError::Extraction {
            filename: filename.to_string(),
            detail: detail.into(),
        }
    }
}
