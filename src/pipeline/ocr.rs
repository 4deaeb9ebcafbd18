//! Optical character recognition behind a small trait.
//!
//! The pipeline only needs "image in, text fragments out". [`OcrEngine`] is
//! synchronous because recognition is CPU-bound; callers run it inside
//! `spawn_blocking`. One engine instance is created at startup and shared
//! read-only by every request.
//!
//! [`TesseractEngine`] shells out to the `tesseract` CLI, writing each image
//! to a private temp directory that is removed when the call returns. The
//! binary is probed on first use, so a request that never reaches OCR works
//! on a host without tesseract.

use crate::error::VerifyError;
use image::RgbImage;
use once_cell::sync::OnceCell;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info};

/// A text recogniser.
pub trait OcrEngine: Send + Sync {
    /// Engine identifier for logs.
    fn name(&self) -> &'static str;

    /// Recognise text in a 3-channel image.
    ///
    /// Returns fragments in reading order (top-to-bottom, left-to-right as
    /// the recogniser produces them). An image with no text yields an empty
    /// vector, not an error.
    fn recognize(&self, image: &RgbImage) -> Result<Vec<String>, VerifyError>;
}

/// OCR engine wrapping the `tesseract` command-line tool.
#[derive(Debug, Clone)]
pub struct TesseractEngine {
    binary: PathBuf,
    language: String,
    /// Outcome of the one `--version` probe.
    version: OnceCell<Result<String, String>>,
}

impl TesseractEngine {
    /// Create the engine. Nothing is executed until [`check`](Self::check)
    /// or the first recognition.
    pub fn new(binary: impl Into<PathBuf>, language: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            language: language.into(),
            version: OnceCell::new(),
        }
    }

    /// Run the `--version` probe (once) and report whether tesseract works.
    pub fn check(&self) -> Result<&str, VerifyError> {
        self.version
            .get_or_init(|| {
                let probed = self.probe();
                if let Ok(ref version) = probed {
                    info!("OCR engine ready: {}", version);
                }
                probed
            })
            .as_deref()
            .map_err(|detail| VerifyError::OcrUnavailable(detail.to_string()))
    }

    fn probe(&self) -> Result<String, String> {
        let output = Command::new(&self.binary)
            .arg("--version")
            .output()
            .map_err(|e| format!("cannot run {}: {e}", self.binary.display()))?;
        if !output.status.success() {
            return Err(format!(
                "{} --version exited with {}",
                self.binary.display(),
                output.status
            ));
        }
        // Older releases print the banner on stderr.
        let banner = if output.stdout.is_empty() {
            output.stderr
        } else {
            output.stdout
        };
        Ok(String::from_utf8_lossy(&banner)
            .lines()
            .next()
            .unwrap_or("tesseract")
            .trim()
            .to_string())
    }

    fn run(&self, input_path: &Path) -> Result<String, String> {
        let output = Command::new(&self.binary)
            .arg(input_path)
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .output()
            .map_err(|e| format!("cannot run tesseract: {e}"))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(format!(
                "tesseract exited with {}: {}",
                output.status,
                stderr.trim()
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl OcrEngine for TesseractEngine {
    fn name(&self) -> &'static str {
        "tesseract"
    }

    fn recognize(&self, image: &RgbImage) -> Result<Vec<String>, VerifyError> {
        self.check()?;
        let ocr_err = |detail: String| VerifyError::extraction("<page image>", detail);

        let tmpdir = tempfile::TempDir::with_prefix("rx-ocr")
            .map_err(|e| ocr_err(format!("cannot create OCR temp dir: {e}")))?;
        let input_path = tmpdir.path().join("page.png");
        image
            .save_with_format(&input_path, image::ImageFormat::Png)
            .map_err(|e| ocr_err(format!("cannot write OCR input image: {e}")))?;

        let text = self.run(&input_path).map_err(ocr_err)?;
        let fragments = split_fragments(&text);
        debug!(
            "tesseract: {}x{} px → {} fragments",
            image.width(),
            image.height(),
            fragments.len()
        );
        Ok(fragments)
    }
}

/// Recognised lines, trimmed, blanks dropped.
fn split_fragments(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}
