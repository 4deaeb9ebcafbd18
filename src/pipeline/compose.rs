//! Verdict composition: pure assembly of the response record.

use crate::model::{DesiredItem, ExtractedText};
use crate::output::{VerificationDetails, VerificationResult, VerificationVerdict, VERIFICATION_COMPLETE};
use crate::pipeline::matcher::MatchResult;
use crate::pipeline::policy::PolicyOutcome;

pub const NOTES_ALL_VALID: &str = "All requested medications are valid";
pub const NOTES_SOME_MISSING: &str = "Some items missing";

/// Classify how much of the order was found.
///
/// "All found" needs a non-empty order; an empty order is "no matches".
pub fn verification_details(desired_len: usize, matched_len: usize) -> VerificationDetails {
    if desired_len > 0 && matched_len == desired_len {
        VerificationDetails::AllFound
    } else if matched_len > 0 {
        VerificationDetails::PartialMatch
    } else {
        VerificationDetails::NoMatches
    }
}

/// Build the verdict. Total over its inputs: empty text and empty orders
/// still produce a well-formed record.
pub fn compose(
    text: &ExtractedText,
    desired: &[DesiredItem],
    matches: &MatchResult,
    policy: &PolicyOutcome,
) -> VerificationVerdict {
    let additional_notes = if matches.unmatched.is_empty() {
        NOTES_ALL_VALID
    } else {
        NOTES_SOME_MISSING
    };

    VerificationVerdict {
        ocr_text: text.as_str().to_string(),
        desired_items: desired.to_vec(),
        prescription_required: policy.required,
        medicines_requiring_prescription: policy.requiring_names.clone(),
        verification_result: VerificationResult {
            is_valid_order: matches.is_valid_order(),
            identified_prescribed_items: matches.identified_prescribed_items(),
            verification_details: verification_details(desired.len(), matches.matched.len()),
            matched_items: matches.matched_labels(),
            unmatched_desired_items: matches.unmatched.clone(),
            additional_notes: additional_notes.to_string(),
        },
        looks_like_prescription: None,
        message: VERIFICATION_COMPLETE.to_string(),
    }
}
