//! Verification entry points.
//!
//! A [`Verifier`] is built once at process start. It owns the read-only
//! requirement map, the OCR engine and (for the semantic strategy) the LLM
//! provider, and is shared by every request. Each call to
//! [`Verifier::verify`] is independent.

use crate::config::{Strategy, VerifierConfig};
use crate::error::VerifyError;
use crate::model::{parse_desired_items, validate_desired_items, DesiredItem, ExtractedText, UploadedDocument};
use crate::output::VerificationVerdict;
use crate::pipeline::classify::{require_supported, DocumentKind};
use crate::pipeline::compose::compose;
use crate::pipeline::extract::TextExtractor;
use crate::pipeline::heuristic::looks_like_prescription;
use crate::pipeline::matcher::match_items;
use crate::pipeline::ocr::{OcrEngine, TesseractEngine};
use crate::pipeline::policy::{check_precondition, classify_requirement, PrescriptionRequirementMap};
use crate::pipeline::render::RenderOptions;
use crate::pipeline::semantic::SemanticVerifier;
use edgequake_llm::{LLMProvider, ProviderFactory};
use futures::stream::{self, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, info_span, Instrument};
use uuid::Uuid;

/// Default model for the semantic strategy when none is configured.
pub const DEFAULT_SEMANTIC_MODEL: &str = "gpt-4.1-nano";

/// The document-to-verdict pipeline. `Send + Sync`; share it via `Arc`.
pub struct Verifier {
    config: VerifierConfig,
    requirements: Arc<PrescriptionRequirementMap>,
    extractor: TextExtractor,
    semantic: Option<SemanticVerifier>,
}

impl Verifier {
    /// Assemble a verifier from already-initialised process-wide state.
    ///
    /// Resolves the LLM provider up front when the semantic strategy is
    /// selected, so a missing API key fails at startup rather than per request.
    pub fn new(
        config: VerifierConfig,
        requirements: Arc<PrescriptionRequirementMap>,
        ocr: Arc<dyn OcrEngine>,
    ) -> Result<Self, VerifyError> {
        info!("OCR engine: {}", ocr.name());
        let extractor = TextExtractor::new(
            ocr,
            RenderOptions {
                dpi: config.dpi,
                max_rendered_pixels: config.max_rendered_pixels,
            },
        )
        .with_pdfium_lib_path(config.pdfium_lib_path.clone())
        .with_temp_dir(config.temp_dir.clone());

        let semantic = match config.strategy {
            Strategy::Matcher => None,
            Strategy::Semantic => {
                let provider = resolve_provider(&config)?;
                Some(SemanticVerifier::new(provider, &config))
            }
        };

        Ok(Self {
            config,
            requirements,
            extractor,
            semantic,
        })
    }

    /// Load the requirement map and set up tesseract as configured.
    ///
    /// tesseract is probed when the first document is recognised, not here.
    pub fn from_config(config: VerifierConfig) -> Result<Self, VerifyError> {
        let requirements = Arc::new(PrescriptionRequirementMap::load(&config.requirements_path)?);
        let ocr: Arc<dyn OcrEngine> = Arc::new(TesseractEngine::new(
            config.tesseract_bin.clone(),
            config.ocr_language.clone(),
        ));
        Self::new(config, requirements, ocr)
    }

    /// Verify an order against zero or more uploaded documents.
    ///
    /// Checks run cheapest first: item validation, the prescription
    /// precondition and document classification all complete before any
    /// OCR starts.
    ///
    /// # Errors
    /// - [`VerifyError::InvalidInput`] for a blank item name
    /// - [`VerifyError::PrescriptionRequired`] when policy needs a document and none was sent
    /// - [`VerifyError::UnsupportedDocument`] for an upload that is neither image nor PDF
    /// - [`VerifyError::Extraction`] when OCR or rasterisation fails
    /// - [`VerifyError::SemanticVerifier`] when the semantic strategy fails
    pub async fn verify(
        &self,
        documents: &[UploadedDocument],
        desired: &[DesiredItem],
    ) -> Result<VerificationVerdict, VerifyError> {
        let request_id = Uuid::new_v4().simple().to_string();
        let span = info_span!("verify", request_id = %request_id);
        self.verify_inner(documents, desired, request_id)
            .instrument(span)
            .await
    }

    /// Like [`Verifier::verify`], taking the item list as JSON text.
    pub async fn verify_json(
        &self,
        documents: &[UploadedDocument],
        desired_items_json: &str,
    ) -> Result<VerificationVerdict, VerifyError> {
        let desired = parse_desired_items(desired_items_json)?;
        self.verify(documents, &desired).await
    }

    /// Synchronous wrapper around [`Verifier::verify`].
    ///
    /// Creates a temporary tokio runtime internally.
    pub fn verify_sync(
        &self,
        documents: &[UploadedDocument],
        desired: &[DesiredItem],
    ) -> Result<VerificationVerdict, VerifyError> {
        tokio::runtime::Runtime::new()
            .map_err(|e| VerifyError::Internal(format!("Failed to create tokio runtime: {}", e)))?
            .block_on(self.verify(documents, desired))
    }

    async fn verify_inner(
        &self,
        documents: &[UploadedDocument],
        desired: &[DesiredItem],
        request_id: String,
    ) -> Result<VerificationVerdict, VerifyError> {
        let start = Instant::now();
        info!(
            "Verifying {} items against {} documents",
            desired.len(),
            documents.len()
        );

        // ── Step 1: Validate items and apply the policy ──────────────────
        validate_desired_items(desired)?;
        let policy = classify_requirement(desired, &self.requirements);
        check_precondition(&policy, documents.len())?;
        debug!("Prescription required: {}", policy.required);

        // ── Step 2: Classify every upload before any OCR ─────────────────
        let kinds = documents
            .iter()
            .map(|doc| require_supported(doc.bytes(), doc.filename()))
            .collect::<Result<Vec<_>, _>>()?;

        // ── Step 3: Extract text, preserving upload order ────────────────
        let extract_start = Instant::now();
        let texts = self.extract_all(documents, kinds, &request_id).await?;
        let text = ExtractedText::from_fragments(texts.iter().map(ExtractedText::as_str));
        info!(
            "Extracted {} chars in {}ms",
            text.as_str().len(),
            extract_start.elapsed().as_millis()
        );

        // ── Step 4: Judge the order ──────────────────────────────────────
        let mut verdict = match &self.semantic {
            Some(semantic) => semantic.verify(&text, desired, &policy).await?,
            None => compose(&text, desired, &match_items(desired, &text), &policy),
        };

        // ── Step 5: Optional format heuristic ────────────────────────────
        if self.config.format_check {
            verdict.looks_like_prescription = Some(looks_like_prescription(text.as_str()));
        }

        info!(
            "Verification complete: {} ({}/{} matched) in {}ms",
            verdict.verification_result.verification_details,
            verdict.verification_result.matched_items.len(),
            desired.len(),
            start.elapsed().as_millis()
        );
        Ok(verdict)
    }

    /// Extract every document with bounded concurrency.
    ///
    /// Returns only once no extraction task is running, so every temp file
    /// is gone when this returns. After the first failure, documents not yet
    /// started are skipped; the error reported is the earliest failure in
    /// upload order.
    async fn extract_all(
        &self,
        documents: &[UploadedDocument],
        kinds: Vec<DocumentKind>,
        request_id: &str,
    ) -> Result<Vec<ExtractedText>, VerifyError> {
        let failed = Arc::new(AtomicBool::new(false));
        let outcomes: Vec<Option<Result<ExtractedText, VerifyError>>> =
            stream::iter(documents.iter().cloned().zip(kinds))
                .map(|(doc, kind)| {
                    let extractor = self.extractor.clone();
                    let request_id = request_id.to_string();
                    let failed = Arc::clone(&failed);
                    async move {
                        if failed.load(Ordering::SeqCst) {
                            debug!("Skipping '{}' after an earlier failure", doc.filename());
                            return None;
                        }
                        let outcome = tokio::task::spawn_blocking(move || {
                            extractor.extract(&doc, kind, &request_id)
                        })
                        .await
                        .unwrap_or_else(|e| {
                            Err(VerifyError::Internal(format!("extraction task failed: {e}")))
                        });
                        if outcome.is_err() {
                            failed.store(true, Ordering::SeqCst);
                        }
                        Some(outcome)
                    }
                })
                .buffered(self.config.concurrency)
                .collect()
                .await;

        // A skipped document always follows the failure that caused the skip.
        outcomes
            .into_iter()
            .flatten()
            .collect::<Result<Vec<_>, _>>()
    }
}

// ── Internal helpers ─────────────────────────────────────────────────────

fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, VerifyError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        VerifyError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("the semantic strategy cannot use model '{model}': {e}"),
        }
    })
}

/// Pick the provider for the semantic strategy.
///
/// An injected provider wins, then an explicitly named one. Otherwise the
/// environment decides: OpenAI if `OPENAI_API_KEY` is set, else whatever
/// `ProviderFactory::from_env` detects. The CLI maps `EDGEQUAKE_LLM_PROVIDER`
/// and `EDGEQUAKE_MODEL` onto the named form.
fn resolve_provider(config: &VerifierConfig) -> Result<Arc<dyn LLMProvider>, VerifyError> {
    let model = config.model.as_deref().unwrap_or(DEFAULT_SEMANTIC_MODEL);
    match (&config.provider, &config.provider_name) {
        (Some(provider), _) => Ok(Arc::clone(provider)),
        (None, Some(name)) => create_provider(name, model),
        (None, None) if std::env::var("OPENAI_API_KEY").is_ok_and(|k| !k.is_empty()) => {
            create_provider("openai", model)
        }
        (None, None) => ProviderFactory::from_env()
            .map(|(llm, _embedding)| llm)
            .map_err(|e| VerifyError::ProviderNotConfigured {
                provider: "auto".to_string(),
                hint: format!(
                    "--strategy semantic needs an LLM. Pass --provider/--model or set \
                     OPENAI_API_KEY. Auto-detection failed: {e}"
                ),
            }),
    }
}
