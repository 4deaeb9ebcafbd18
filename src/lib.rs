//! # rxverify
//!
//! Verify a pharmacy order against an uploaded prescription: OCR the
//! document, check that every requested medication is actually prescribed,
//! and decide whether a prescription was needed at all.
//!
//! ## Pipeline Overview
//!
//! ```text
//! order + uploads
//!  │
//!  ├─ 1. Validate   item schema, prescription-required precondition
//!  ├─ 2. Classify   image / PDF / unsupported by magic number
//!  ├─ 3. Extract    OCR images; rasterise PDFs at 300 DPI via pdfium, OCR each page
//!  ├─ 4. Judge      substring matcher, or the semantic (LLM) strategy
//!  ├─ 5. Compose    structured verdict
//!  └─ 6. Heuristic  optional "looks like a prescription" flag
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rxverify::{DesiredItem, UploadedDocument, Verifier, VerifierConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Loads prescription_required.json; tesseract runs on first use.
//!     let verifier = Verifier::from_config(VerifierConfig::default())?;
//!     let doc = UploadedDocument::from_path("prescription.jpg")?;
//!     let items = vec![DesiredItem::new("Amoxicillin").with_quantity("1")];
//!     let verdict = verifier.verify(&[doc], &items).await?;
//!     println!("{}", serde_json::to_string_pretty(&verdict)?);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `rxverify` binary (clap + anyhow + tracing-subscriber) |
//!
//! ## External tools
//!
//! OCR runs through the `tesseract` CLI with the English language pack. PDF
//! rasterisation needs a pdfium shared library: `./libpdfium`, the system
//! copy, or an explicit path via [`VerifierConfig::pdfium_lib_path`].

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod model;
pub mod output;
pub mod pipeline;
pub mod prompts;
pub mod verify;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{Strategy, VerifierConfig, VerifierConfigBuilder};
pub use error::VerifyError;
pub use model::{parse_desired_items, DesiredItem, ExtractedText, UploadedDocument};
pub use output::{PrescribedItem, VerificationDetails, VerificationResult, VerificationVerdict};
pub use pipeline::classify::{classify, DocumentKind};
pub use pipeline::heuristic::looks_like_prescription;
pub use pipeline::matcher::{match_items, MatchResult};
pub use pipeline::ocr::{OcrEngine, TesseractEngine};
pub use pipeline::policy::{classify_requirement, PolicyOutcome, PrescriptionRequirementMap};
pub use verify::Verifier;
