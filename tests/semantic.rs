//! Integration tests for the semantic (LLM) strategy.
//!
//! The provider is injected through `VerifierConfig::provider`: either
//! edgequake-llm's `MockProvider` with queued answers, or a local provider
//! that fails a set number of times before answering.

use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, LLMResponse, LlmError, MockProvider};
use image::{DynamicImage, Rgb, RgbImage};
use rxverify::{
    DesiredItem, OcrEngine, PrescriptionRequirementMap, Strategy, UploadedDocument,
    VerificationDetails, VerificationVerdict, Verifier, VerifierConfig, VerifyError,
};
use std::collections::BTreeSet;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Returns the same fragments for every image.
struct FixedOcr(Vec<&'static str>);

impl OcrEngine for FixedOcr {
    fn name(&self) -> &'static str {
        "fixed"
    }

    fn recognize(&self, _image: &RgbImage) -> Result<Vec<String>, VerifyError> {
        Ok(self.0.iter().map(|s| s.to_string()).collect())
    }
}

/// Fails with a network error `failures` times, then answers.
struct FlakyProvider {
    failures: usize,
    answer: &'static str,
    calls: AtomicUsize,
}

impl FlakyProvider {
    fn new(failures: usize, answer: &'static str) -> Self {
        Self {
            failures,
            answer,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl LLMProvider for FlakyProvider {
    fn name(&self) -> &str {
        "flaky"
    }

    fn model(&self) -> &str {
        "flaky-model"
    }

    fn max_context_length(&self) -> usize {
        4096
    }

    async fn complete(&self, _prompt: &str) -> edgequake_llm::Result<LLMResponse> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            Err(LlmError::NetworkError("connection reset".to_string()))
        } else {
            Ok(LLMResponse::new(self.answer, "flaky-model"))
        }
    }

    async fn complete_with_options(
        &self,
        prompt: &str,
        _options: &CompletionOptions,
    ) -> edgequake_llm::Result<LLMResponse> {
        self.complete(prompt).await
    }

    async fn chat(
        &self,
        _messages: &[ChatMessage],
        _options: Option<&CompletionOptions>,
    ) -> edgequake_llm::Result<LLMResponse> {
        self.complete("").await
    }
}

fn png() -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(16, 8, Rgb([255, 255, 255])));
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .expect("encode png");
    buf
}

fn items(names: &[&str]) -> Vec<DesiredItem> {
    names.iter().map(|n| DesiredItem::new(*n)).collect()
}

fn semantic_verifier(provider: Arc<dyn LLMProvider>, ocr_text: Vec<&'static str>) -> Verifier {
    let config = VerifierConfig::builder()
        .strategy(Strategy::Semantic)
        .provider(provider)
        .max_retries(2)
        .retry_backoff_ms(1)
        .build()
        .unwrap();
    let map = PrescriptionRequirementMap::from_json_str(r#"{"amoxicillin": true}"#).unwrap();
    Verifier::new(config, Arc::new(map), Arc::new(FixedOcr(ocr_text))).unwrap()
}

fn json_keys(verdict: &VerificationVerdict) -> (BTreeSet<String>, BTreeSet<String>) {
    let value = serde_json::to_value(verdict).unwrap();
    let top = value.as_object().unwrap().keys().cloned().collect();
    let nested = value["verification_result"]
        .as_object()
        .unwrap()
        .keys()
        .cloned()
        .collect();
    (top, nested)
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn judgement_tolerates_misspelt_ocr_text() {
    let provider = MockProvider::new();
    provider
        .add_response("```json\n{\"matched_items\": [\"Amoxicillin\", \"Ibuprofen\"]}\n```")
        .await;
    let v = semantic_verifier(Arc::new(provider), vec!["Amoxycilin 500 mg", "1 cap tds"]);

    let verdict = v
        .verify(
            &[UploadedDocument::new(png(), "rx.png")],
            &items(&["Amoxicillin", "Vitamin C"]),
        )
        .await
        .expect("verdict");

    let r = &verdict.verification_result;
    assert_eq!(r.matched_items, vec!["Amoxicillin"]);
    assert_eq!(r.unmatched_desired_items, items(&["Vitamin C"]));
    assert_eq!(r.verification_details, VerificationDetails::PartialMatch);
    assert!(r.is_valid_order);
    // Policy is applied independently of the model.
    assert!(verdict.prescription_required);
    assert_eq!(verdict.medicines_requiring_prescription, vec!["amoxicillin"]);
}

#[tokio::test]
async fn both_strategies_yield_the_same_shape() {
    let provider = MockProvider::new();
    provider.add_response(r#"{"matched_items": ["Zinc"]}"#).await;
    let semantic = semantic_verifier(Arc::new(provider), vec!["Zinc 20mg"]);

    let matcher = Verifier::new(
        VerifierConfig::default(),
        Arc::new(PrescriptionRequirementMap::default()),
        Arc::new(FixedOcr(vec!["Zinc 20mg"])),
    )
    .unwrap();

    let docs = [UploadedDocument::new(png(), "rx.png")];
    let desired = items(&["Zinc"]);
    let a = semantic.verify(&docs, &desired).await.expect("semantic verdict");
    let b = matcher.verify(&docs, &desired).await.expect("matcher verdict");

    assert_eq!(json_keys(&a), json_keys(&b));
    assert_eq!(a.verification_result, b.verification_result);
}

#[tokio::test]
async fn blank_text_skips_the_provider() {
    let provider = MockProvider::new();
    // Would fail to parse if the provider were called.
    provider.add_response("not json at all").await;
    let v = semantic_verifier(Arc::new(provider), vec![]);

    let verdict = v
        .verify(
            &[UploadedDocument::new(png(), "blank.png")],
            &items(&["Ibuprofen"]),
        )
        .await
        .expect("verdict");
    assert_eq!(
        verdict.verification_result.verification_details,
        VerificationDetails::NoMatches
    );
    assert_eq!(verdict.verification_result.unmatched_desired_items, items(&["Ibuprofen"]));
}

#[tokio::test]
async fn empty_order_skips_the_provider() {
    let provider = Arc::new(FlakyProvider::new(usize::MAX, "{}"));
    let v = semantic_verifier(provider.clone(), vec!["Paracetamol"]);

    let verdict = v
        .verify(&[UploadedDocument::new(png(), "rx.png")], &[])
        .await
        .expect("verdict");
    assert!(!verdict.verification_result.is_valid_order);
    assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn malformed_answer_is_not_retried() {
    let provider = MockProvider::new();
    provider.add_response("Sorry, I cannot read this prescription.").await;
    provider.add_response(r#"{"matched_items": ["Paracetamol"]}"#).await;
    let v = semantic_verifier(Arc::new(provider), vec!["Paracetamol 500mg"]);

    let err = v
        .verify(
            &[UploadedDocument::new(png(), "rx.png")],
            &items(&["Paracetamol"]),
        )
        .await
        .expect_err("unparseable answer");
    assert!(matches!(err, VerifyError::SemanticVerifier { .. }), "{err:?}");
    assert!(!err.is_caller_error());
}

#[tokio::test]
async fn transient_provider_errors_are_retried() {
    let provider = Arc::new(FlakyProvider::new(2, r#"{"matched_items": ["Paracetamol"]}"#));
    let v = semantic_verifier(provider.clone(), vec!["Paracetamol 500mg"]);

    let verdict = v
        .verify(
            &[UploadedDocument::new(png(), "rx.png")],
            &items(&["Paracetamol"]),
        )
        .await
        .expect("third attempt succeeds");
    assert_eq!(
        verdict.verification_result.verification_details,
        VerificationDetails::AllFound
    );
    assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn provider_failure_after_retries_is_reported() {
    let provider = Arc::new(FlakyProvider::new(usize::MAX, "{}"));
    let v = semantic_verifier(provider.clone(), vec!["Paracetamol 500mg"]);

    let err = v
        .verify(
            &[UploadedDocument::new(png(), "rx.png")],
            &items(&["Paracetamol"]),
        )
        .await
        .expect_err("provider never answers");
    match err {
        VerifyError::SemanticVerifier { message } => {
            assert!(message.contains("connection reset"), "{message}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    // One attempt plus two retries.
    assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
}
