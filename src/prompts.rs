//! Prompts for the semantic verification strategy.
//!
//! Kept apart from the call/retry logic in
//! [`crate::pipeline::semantic`] so they can be inspected in tests without a
//! live provider.

use crate::model::DesiredItem;

/// System prompt asking the model for a structured judgement.
pub const SEMANTIC_SYSTEM_PROMPT: &str = r#"You are a pharmacy assistant verifying customer orders against prescriptions.

You receive text read from a prescription by OCR, and the list of medications the customer wants to buy.
Decide which of the requested medications the prescription actually prescribes.

Rules:
1. The OCR text is noisy. Accept obvious misspellings, abbreviations, and brand/generic equivalents
   (e.g. "Amoxil" for "Amoxicillin", "PCM" for "Paracetamol").
2. Only count a medication if the prescription names it. Do not guess from symptoms or diagnoses.
3. Use the requested names exactly as given when listing matches.

Respond with ONLY a JSON object, no commentary and no code fences:
{"matched_items": ["<requested name>", ...]}"#;

/// Build the user message: requested names plus the OCR text.
pub fn semantic_user_message(ocr_text: &str, desired: &[DesiredItem]) -> String {
    let names: Vec<&str> = desired.iter().map(|i| i.name.as_str()).collect();
    let names_json = serde_json::to_string(&names).unwrap_or_else(|_| "[]".to_string());
    format!(
        "Requested medications: {names_json}\n\nPrescription text:\n\"\"\"{}\"\"\"",
        ocr_text
    )
}
