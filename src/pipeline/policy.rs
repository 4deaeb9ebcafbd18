//! Prescription policy: which requested items need a prescription.
//!
//! The requirement map is a best-effort allow-list loaded once at startup,
//! not an exhaustive catalogue; names it does not know are treated as
//! over-the-counter.

use crate::error::VerifyError;
use crate::model::{normalize_name, DesiredItem};
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

/// Static normalised-name → "requires prescription" table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrescriptionRequirementMap {
    entries: HashMap<String, bool>,
}

impl PrescriptionRequirementMap {
    /// Load a JSON object of `{"name": bool}` pairs from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, VerifyError> {
        let path = path.as_ref();
        let map_err = |detail: String| VerifyError::RequirementMap {
            path: path.to_path_buf(),
            detail,
        };
        let raw = std::fs::read_to_string(path).map_err(|e| map_err(e.to_string()))?;
        let map = Self::from_json_str(&raw).map_err(map_err)?;
        info!(
            "Loaded {} prescription requirement entries from {}",
            map.len(),
            path.display()
        );
        Ok(map)
    }

    /// Parse a JSON object of `{"name": bool}` pairs.
    pub fn from_json_str(json: &str) -> Result<Self, String> {
        let raw: HashMap<String, bool> = serde_json::from_str(json).map_err(|e| e.to_string())?;
        Ok(raw.into_iter().collect())
    }

    pub fn requires_prescription(&self, name: &str) -> bool {
        self.entries
            .get(&normalize_name(name))
            .copied()
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<S: AsRef<str>> FromIterator<(S, bool)> for PrescriptionRequirementMap {
    fn from_iter<I: IntoIterator<Item = (S, bool)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(name, required)| (normalize_name(name.as_ref()), required))
                .collect(),
        }
    }
}

/// Outcome of applying the policy to one order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicyOutcome {
    pub required: bool,
    /// Normalised names requiring a prescription, in request order.
    pub requiring_names: Vec<String>,
}

/// Decide which desired items require a prescription.
pub fn classify_requirement(
    desired: &[DesiredItem],
    map: &PrescriptionRequirementMap,
) -> PolicyOutcome {
    let requiring_names: Vec<String> = desired
        .iter()
        .map(DesiredItem::normalized_name)
        .filter(|name| map.requires_prescription(name))
        .collect();
    PolicyOutcome {
        required: !requiring_names.is_empty(),
        requiring_names,
    }
}

/// Reject an order that needs a prescription when none was uploaded.
pub fn check_precondition(outcome: &PolicyOutcome, document_count: usize) -> Result<(), VerifyError> {
    if outcome.required && document_count == 0 {
        return Err(VerifyError::PrescriptionRequired {
            medicines: outcome.requiring_names.clone(),
        });
    }
    Ok(())
}
