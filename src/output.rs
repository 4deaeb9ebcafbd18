//! Verdict types returned by the verification pipeline.

use crate::model::DesiredItem;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Message attached to every completed verification.
pub const VERIFICATION_COMPLETE: &str = "Verification complete";

/// The structured outcome of one verification request.
///
/// Serialises to the response body shape:
/// `{ocr_text, desired_items, prescription_required,
/// medicines_requiring_prescription, verification_result: {..}, message}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationVerdict {
    /// All recognised text, in upload and page order.
    pub ocr_text: String,
    /// The requested items exactly as received.
    pub desired_items: Vec<DesiredItem>,
    pub prescription_required: bool,
    /// Normalised names the requirement map marks as prescription-only.
    pub medicines_requiring_prescription: Vec<String>,
    pub verification_result: VerificationResult,
    /// Outcome of the prescription format heuristic, when it was run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub looks_like_prescription: Option<bool>,
    pub message: String,
}

/// Per-item outcome nested under `verification_result`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub is_valid_order: bool,
    pub identified_prescribed_items: Vec<PrescribedItem>,
    pub verification_details: VerificationDetails,
    /// Title-cased names of matched items, in request order.
    pub matched_items: Vec<String>,
    pub unmatched_desired_items: Vec<DesiredItem>,
    pub additional_notes: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrescribedItem {
    pub medication_name: String,
}

/// Summary classification of how many requested items were found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerificationDetails {
    #[serde(rename = "All medications found in prescription")]
    AllFound,
    #[serde(rename = "Partial match found")]
    PartialMatch,
    #[serde(rename = "No matches found")]
    NoMatches,
}

impl VerificationDetails {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationDetails::AllFound => "All medications found in prescription",
            VerificationDetails::PartialMatch => "Partial match found",
            VerificationDetails::NoMatches => "No matches found",
        }
    }
}

impl fmt::Display for VerificationDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
