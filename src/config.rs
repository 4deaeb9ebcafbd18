//! Configuration types for prescription verification.
//!
//! Every knob lives in [`VerifierConfig`], built via its
//! [`VerifierConfigBuilder`]. The config is read once at process start and
//! shared by all requests; nothing in it changes per request.

use crate::error::VerifyError;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Resolution used when rasterising PDF pages for OCR.
pub const DEFAULT_DPI: u32 = 300;

/// Default location of the prescription requirement table.
pub const DEFAULT_REQUIREMENTS_PATH: &str = "prescription_required.json";

/// Configuration for a [`crate::Verifier`].
///
/// # Example
/// ```rust
/// use rxverify::{Strategy, VerifierConfig};
///
/// let config = VerifierConfig::builder()
///     .dpi(300)
///     .strategy(Strategy::Matcher)
///     .format_check(true)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct VerifierConfig {
    /// How requested items are judged against the extracted text. Default: [`Strategy::Matcher`].
    pub strategy: Strategy,

    /// Rasterisation DPI for PDF pages. Range: 72–600. Default: 300.
    ///
    /// Small label fonts on scanned prescriptions stop being legible to the
    /// recogniser below roughly 300 DPI.
    pub dpi: u32,

    /// Cap on the longest edge of a rendered page, in pixels. Default: 5000.
    pub max_rendered_pixels: u32,

    /// Run the prescription format heuristic and report it in the verdict. Default: false.
    pub format_check: bool,

    /// Number of documents of one request extracted at once. Default: 2.
    pub concurrency: usize,

    /// Path to the JSON name→bool prescription requirement table.
    pub requirements_path: PathBuf,

    /// `tesseract` executable. Default: `tesseract` on `PATH`.
    pub tesseract_bin: PathBuf,

    /// Recogniser language. Fixed to English.
    pub ocr_language: String,

    /// Explicit pdfium shared library. If None, binds `./libpdfium` or the system copy.
    pub pdfium_lib_path: Option<PathBuf>,

    /// Directory for PDF rasterisation temp files. If None, the system temp dir.
    pub temp_dir: Option<PathBuf>,

    // ── Semantic strategy ─────────────────────────────────────────────────
    /// LLM model identifier. If None, uses provider default.
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature. Default: 0.0.
    pub temperature: f32,

    /// Maximum tokens the model may generate. Default: 1024.
    pub max_tokens: usize,

    /// Retries on a failed provider call. Default: 2.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled per attempt. Default: 500.
    pub retry_backoff_ms: u64,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::default(),
            dpi: DEFAULT_DPI,
            max_rendered_pixels: 5000,
            format_check: false,
            concurrency: 2,
            requirements_path: PathBuf::from(DEFAULT_REQUIREMENTS_PATH),
            tesseract_bin: PathBuf::from("tesseract"),
            ocr_language: "eng".to_string(),
            pdfium_lib_path: None,
            temp_dir: None,
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.0,
            max_tokens: 1024,
            max_retries: 2,
            retry_backoff_ms: 500,
        }
    }
}

impl fmt::Debug for VerifierConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerifierConfig")
            .field("strategy", &self.strategy)
            .field("dpi", &self.dpi)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("format_check", &self.format_check)
            .field("concurrency", &self.concurrency)
            .field("requirements_path", &self.requirements_path)
            .field("tesseract_bin", &self.tesseract_bin)
            .field("pdfium_lib_path", &self.pdfium_lib_path)
            .field("temp_dir", &self.temp_dir)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

impl VerifierConfig {
    pub fn builder() -> VerifierConfigBuilder {
        VerifierConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`VerifierConfig`].
#[derive(Debug)]
pub struct VerifierConfigBuilder {
    config: VerifierConfig,
}

impl VerifierConfigBuilder {
    pub fn strategy(mut self, strategy: Strategy) -> Self {
        self.config.strategy = strategy;
        self
    }

    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi;
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn format_check(mut self, v: bool) -> Self {
        self.config.format_check = v;
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n;
        self
    }

    pub fn requirements_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.requirements_path = path.into();
        self
    }

    pub fn tesseract_bin(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.tesseract_bin = path.into();
        self
    }

    pub fn pdfium_lib_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_lib_path = Some(path.into());
        self
    }

    pub fn temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.temp_dir = Some(dir.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<VerifierConfig, VerifyError> {
        let c = &self.config;
        if c.dpi < 72 || c.dpi > 600 {
            return Err(VerifyError::InvalidConfig(format!(
                "DPI must be 72–600, got {}",
                c.dpi
            )));
        }
        if c.concurrency == 0 {
            return Err(VerifyError::InvalidConfig("Concurrency must be ≥ 1".into()));
        }
        if c.ocr_language.is_empty() {
            return Err(VerifyError::InvalidConfig("OCR language must be set".into()));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// How requested medications are judged against the prescription text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Case-insensitive substring matching. (default)
    #[default]
    Matcher,
    /// Ask a structured-output LLM which items the document prescribes.
    Semantic,
}

impl std::str::FromStr for Strategy {
    type Err = VerifyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "matcher" | "substring" => Ok(Strategy::Matcher),
            "semantic" | "llm" => Ok(Strategy::Semantic),
            other => Err(VerifyError::InvalidConfig(format!(
                "unknown strategy '{other}' (expected matcher or semantic)"
            ))),
        }
    }
}
