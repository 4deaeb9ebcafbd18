//! Text extraction: classified document → [`ExtractedText`].
//!
//! ## Image path
//! Decode, convert to RGB8, recognise once.
//!
//! ## PDF path
//! pdfium needs a file-system path, so the upload is written to a
//! [`tempfile::NamedTempFile`] whose name carries the request id plus a
//! random suffix. The handle deletes the file when dropped, on success, on
//! `?` early-return and during unwinding alike. Every page is rendered at
//! the configured DPI and recognised; any page failure fails the document.

use crate::error::VerifyError;
use crate::model::{ExtractedText, UploadedDocument};
use crate::pipeline::classify::DocumentKind;
use crate::pipeline::ocr::OcrEngine;
use crate::pipeline::render::{self, RenderOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Runs OCR over images and rasterised PDFs. Cheap to clone.
#[derive(Clone)]
pub struct TextExtractor {
    ocr: Arc<dyn OcrEngine>,
    render: RenderOptions,
    pdfium_lib_path: Option<PathBuf>,
    temp_dir: Option<PathBuf>,
}

impl TextExtractor {
    pub fn new(ocr: Arc<dyn OcrEngine>, render: RenderOptions) -> Self {
        Self {
            ocr,
            render,
            pdfium_lib_path: None,
            temp_dir: None,
        }
    }

    pub fn with_pdfium_lib_path(mut self, path: Option<PathBuf>) -> Self {
        self.pdfium_lib_path = path;
        self
    }

    /// Directory for rasterisation temp files; the system temp dir if unset.
    pub fn with_temp_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.temp_dir = dir;
        self
    }

    /// Extract text from one document. Blocking.
    ///
    /// `request_id` only labels temp files and logs.
    pub fn extract(
        &self,
        doc: &UploadedDocument,
        kind: DocumentKind,
        request_id: &str,
    ) -> Result<ExtractedText, VerifyError> {
        if let Some(hint) = doc.mime_hint() {
            debug!("'{}' declared as {} (ignored)", doc.filename(), hint);
        }
        let text = match kind {
            DocumentKind::Image => self.extract_image(doc)?,
            DocumentKind::Pdf => self.extract_pdf(doc, request_id)?,
            DocumentKind::Unsupported => {
                return Err(VerifyError::UnsupportedDocument {
                    filename: doc.filename().to_string(),
                    detected: "unknown".to_string(),
                })
            }
        };
        info!(
            "Extracted {} chars from '{}'",
            text.as_str().len(),
            doc.filename()
        );
        Ok(text)
    }

    fn extract_image(&self, doc: &UploadedDocument) -> Result<ExtractedText, VerifyError> {
        let image = image::load_from_memory(doc.bytes()).map_err(|e| {
            VerifyError::extraction(doc.filename(), format!("cannot decode image: {e}"))
        })?;
        let rgb = image.to_rgb8();
        let fragments = self
            .ocr
            .recognize(&rgb)
            .map_err(|e| relabel(e, doc.filename()))?;
        Ok(ExtractedText::from_fragments(fragments))
    }

    fn extract_pdf(
        &self,
        doc: &UploadedDocument,
        request_id: &str,
    ) -> Result<ExtractedText, VerifyError> {
        let filename = doc.filename();
        let io_err = |what: &str, e: std::io::Error| {
            VerifyError::extraction(filename, format!("{what}: {e}"))
        };

        let prefix = format!("rx-{request_id}-");
        let mut builder = tempfile::Builder::new();
        builder.prefix(&prefix).suffix(".pdf");
        let mut tmp = match &self.temp_dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
        .map_err(|e| io_err("cannot create temp file", e))?;

        tmp.write_all(doc.bytes())
            .map_err(|e| io_err("cannot write temp file", e))?;
        tmp.flush().map_err(|e| io_err("cannot flush temp file", e))?;
        debug!("Wrote '{}' to {}", filename, tmp.path().display());

        let pdfium = render::bind_pdfium(self.pdfium_lib_path.as_deref())
            .map_err(|e| VerifyError::extraction(filename, e))?;

        let mut page_texts: Vec<String> = Vec::new();
        let mut ocr_failure: Option<VerifyError> = None;
        let rendered = render::render_each_page(&pdfium, tmp.path(), self.render, |page, image| {
            let rgb = image.to_rgb8();
            match self.ocr.recognize(&rgb) {
                Ok(fragments) => {
                    debug!("Page {}: {} fragments", page, fragments.len());
                    page_texts.push(fragments.join(" "));
                    Ok(())
                }
                Err(e) => {
                    let msg = format!("OCR failed on page {page}");
                    ocr_failure = Some(e);
                    Err(msg)
                }
            }
        });

        let result = match (rendered, ocr_failure) {
            (_, Some(e)) => Err(relabel(e, filename)),
            (Err(detail), None) => Err(VerifyError::extraction(filename, detail)),
            (Ok(pages), None) => {
                info!("OCR complete for '{}': {} pages", filename, pages);
                Ok(ExtractedText::from_fragments(page_texts))
            }
        };

        if let Err(e) = tmp.close() {
            warn!("Failed to remove rasterisation temp file: {}", e);
        }
        result
    }
}

/// Attach the document's filename to an extraction error from a lower stage.
fn relabel(err: VerifyError, filename: &str) -> VerifyError {
    match err {
        VerifyError::Extraction { detail, .. } => VerifyError::extraction(filename, detail),
        other => other,
    }
}
