//! Document classification by magic-number sniffing.
//!
//! Uploaded filenames and declared content types are client-controlled and
//! routinely wrong, so the decision is made from the leading bytes. The
//! `.pdf` extension is consulted only when no signature is recognised at all
//! (e.g. a PDF with junk before its `%PDF` header).

use crate::error::VerifyError;
use tracing::debug;

/// Number of leading bytes inspected. Enough for every signature `infer` knows.
pub const SNIFF_LEN: usize = 261;

/// What kind of document an upload is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Image,
    Pdf,
    Unsupported,
}

/// Classify an upload from its leading bytes, falling back to the filename.
pub fn classify(bytes: &[u8], filename: &str) -> DocumentKind {
    classify_detailed(bytes, filename).0
}

/// Like [`classify`], also returning the sniffed MIME type if any.
pub fn classify_detailed(bytes: &[u8], filename: &str) -> (DocumentKind, Option<&'static str>) {
    let prefix = &bytes[..bytes.len().min(SNIFF_LEN)];

    let kind = match infer::get(prefix) {
        Some(t) if t.matcher_type() == infer::MatcherType::Image => {
            (DocumentKind::Image, Some(t.mime_type()))
        }
        Some(t) if t.mime_type() == "application/pdf" => (DocumentKind::Pdf, Some(t.mime_type())),
        Some(t) => (DocumentKind::Unsupported, Some(t.mime_type())),
        None if has_pdf_extension(filename) => (DocumentKind::Pdf, None),
        None => (DocumentKind::Unsupported, None),
    };

    debug!(
        "Classified '{}' as {:?} (sniffed: {})",
        filename,
        kind.0,
        kind.1.unwrap_or("unknown")
    );
    kind
}

/// Classify and reject unsupported uploads with a typed error.
pub fn require_supported(bytes: &[u8], filename: &str) -> Result<DocumentKind, VerifyError> {
    match classify_detailed(bytes, filename) {
        (DocumentKind::Unsupported, detected) => Err(VerifyError::UnsupportedDocument {
            filename: filename.to_string(),
            detected: detected.unwrap_or("unknown").to_string(),
        }),
        (kind, _) => Ok(kind),
    }
}

fn has_pdf_extension(filename: &str) -> bool {
    filename.to_ascii_lowercase().ends_with(".pdf")
}
