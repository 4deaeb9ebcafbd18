//! Pipeline stages for prescription verification.
//!
//! Each submodule implements exactly one step, so each is testable alone and
//! the matching strategy can be swapped without touching extraction.
//!
//! ## Data Flow
//!
//! ```text
//! classify ──▶ extract ──▶ matcher + policy ──▶ compose
//! (magic)     (OCR)        │                    (verdict)
//!                          └─ or semantic (LLM) ─┘
//! ```
//!
//! 1. [`classify`]: image / PDF / unsupported from the leading bytes
//! 2. [`extract`]: OCR an image once, or every rasterised PDF page
//!    ([`render`] + [`ocr`])
//! 3. [`heuristic`]: optional "does this look like a prescription" check
//! 4. [`matcher`]: case-insensitive substring matching of requested names
//! 5. [`policy`]: which requested items need a prescription
//! 6. [`compose`]: assemble the verdict
//! 7. [`semantic`]: LLM alternative to the matcher

pub mod classify;
pub mod compose;
pub mod extract;
pub mod heuristic;
pub mod matcher;
pub mod ocr;
pub mod policy;
pub mod render;
pub mod semantic;
