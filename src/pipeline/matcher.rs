//! Medication matching: case-insensitive substring containment.
//!
//! Each desired name is normalised and searched for as a whole substring of
//! the lower-cased text. There is no stemming, tokenisation or edit
//! distance, so short names can match inside unrelated words and OCR
//! misreads go unmatched. The semantic strategy exists for noisy scans.

use crate::model::{title_case, DesiredItem, ExtractedText};
use crate::output::PrescribedItem;

/// Partition of the desired items by whether they appear in the text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchResult {
    /// Normalised names of matched items, in request order.
    pub matched: Vec<String>,
    /// Items not found, as received, in request order.
    pub unmatched: Vec<DesiredItem>,
}

impl MatchResult {
    /// Split `desired` by a per-item predicate, preserving order.
    pub fn partition<F>(desired: &[DesiredItem], mut found: F) -> Self
    where
        F: FnMut(&DesiredItem) -> bool,
    {
        let mut result = MatchResult::default();
        for item in desired {
            if found(item) {
                result.matched.push(item.normalized_name());
            } else {
                result.unmatched.push(item.clone());
            }
        }
        result
    }

    /// Matched names title-cased for display.
    pub fn matched_labels(&self) -> Vec<String> {
        self.matched.iter().map(|n| title_case(n)).collect()
    }

    pub fn identified_prescribed_items(&self) -> Vec<PrescribedItem> {
        self.matched_labels()
            .into_iter()
            .map(|medication_name| PrescribedItem { medication_name })
            .collect()
    }

    pub fn is_valid_order(&self) -> bool {
        !self.matched.is_empty()
    }
}

/// Test every desired item for presence in the extracted text.
pub fn match_items(desired: &[DesiredItem], text: &ExtractedText) -> MatchResult {
    let haystack = text.to_lowercase();
    MatchResult::partition(desired, |item| haystack.contains(&item.normalized_name()))
}
