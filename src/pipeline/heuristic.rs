//! Format heuristic: does the text look like a prescription at all?
//!
//! This answers a different question from the matcher. The checks run in a
//! fixed order against the lower-cased text and stop at the first hit. Any
//! single signal is enough.

use once_cell::sync::Lazy;
use regex::Regex;

/// Which check recognised the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrescriptionSignal {
    /// The "Rx" abbreviation.
    RxMarker,
    /// "Dr" / "Dr." followed by a name.
    DoctorPrefix,
    /// A number followed by a mass or volume unit, e.g. "500 mg".
    DosageQuantity,
    /// A dosing frequency, e.g. "twice daily", "bd", "every 8 hours".
    DosingFrequency,
    /// A dosage form word: tablet, capsule, syrup.
    DosageForm,
}

static RE_RX_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\brx\b").unwrap());

static RE_DOCTOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bdr(?:\.\s*|\s+)[a-z]{2,}").unwrap());

static RE_DOSAGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b\d+(?:[.,]\d+)?\s*(?:mg|mcg|µg|ug|g|ml|iu|units?)\b").unwrap()
});

static RE_FREQUENCY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"\b(?:once|twice|thrice|\d+\s*times?)\s+(?:a\s+)?(?:daily|day|weekly)\b",
        r"|\b(?:od|bd|bid|tid|tds|qid|qds|prn|hs)\b",
        r"|\bevery\s+\d+\s*(?:hours?|hrs?|h)\b",
        r"|\bat\s+(?:bed\s*time|night)\b",
        r"|\b(?:before|after)\s+(?:meals?|food|breakfast|dinner)\b",
    ))
    .unwrap()
});

static RE_DOSAGE_FORM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:tab(?:let)?s?|cap(?:sule)?s?|syrup)\b").unwrap());

/// Return the first check that recognises `text`, in evaluation order.
pub fn first_signal(text: &str) -> Option<PrescriptionSignal> {
    let lower = text.to_lowercase();
    let checks: [(&Lazy<Regex>, PrescriptionSignal); 5] = [
        (&RE_RX_MARKER, PrescriptionSignal::RxMarker),
        (&RE_DOCTOR, PrescriptionSignal::DoctorPrefix),
        (&RE_DOSAGE, PrescriptionSignal::DosageQuantity),
        (&RE_FREQUENCY, PrescriptionSignal::DosingFrequency),
        (&RE_DOSAGE_FORM, PrescriptionSignal::DosageForm),
    ];
    checks
        .iter()
        .find(|(re, _)| re.is_match(&lower))
        .map(|(_, signal)| *signal)
}

/// `true` if any prescription signal is present.
pub fn looks_like_prescription(text: &str) -> bool {
    first_signal(text).is_some()
}
