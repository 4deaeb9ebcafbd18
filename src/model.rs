//! Request-side data: uploaded documents, desired items and extracted text.
//!
//! The item list arrives as JSON text from whatever transport sits in front
//! of the library. [`parse_desired_items`] is the schema boundary: anything
//! that is not an array of `{name, quantity?}` records becomes
//! [`VerifyError::InvalidInput`] before a single byte of OCR work is done.

use crate::error::VerifyError;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;

/// A document uploaded alongside the order. Immutable once received.
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    bytes: Vec<u8>,
    filename: String,
    mime_hint: Option<String>,
}

impl UploadedDocument {
    pub fn new(bytes: Vec<u8>, filename: impl Into<String>) -> Self {
        Self {
            bytes,
            filename: filename.into(),
            mime_hint: None,
        }
    }

    /// Attach the client-declared content type. Logged, never trusted.
    pub fn with_mime_hint(mut self, mime: impl Into<String>) -> Self {
        self.mime_hint = Some(mime.into());
        self
    }

    /// Read a document from disk, using the file name as the declared name.
    pub fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::new(bytes, filename))
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn mime_hint(&self) -> Option<&str> {
        self.mime_hint.as_deref()
    }
}

/// One requested medication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesiredItem {
    pub name: String,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "quantity_as_text"
    )]
    pub quantity: Option<String>,
}

impl DesiredItem {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            quantity: None,
        }
    }

    pub fn with_quantity(mut self, quantity: impl Into<String>) -> Self {
        self.quantity = Some(quantity.into());
        self
    }

    /// The form used for every comparison and map lookup.
    pub fn normalized_name(&self) -> String {
        normalize_name(&self.name)
    }
}

/// Accept `"2"`, `2` or `2.5` for `quantity`; store the textual form.
fn quantity_as_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Quantity {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(Option::<Quantity>::deserialize(deserializer)?.map(|q| match q {
        Quantity::Text(s) => s,
        Quantity::Number(n) => n.to_string(),
    }))
}

/// Parse the desired-items JSON payload.
///
/// # Errors
/// [`VerifyError::InvalidInput`] when the payload is not a JSON array of
/// records, a record lacks `name`, or a `name` is blank.
pub fn parse_desired_items(json: &str) -> Result<Vec<DesiredItem>, VerifyError> {
    let items: Vec<DesiredItem> = serde_json::from_str(json)
        .map_err(|e| VerifyError::InvalidInput(format!("invalid JSON format: {e}")))?;
    validate_desired_items(&items)?;
    Ok(items)
}

/// Reject blank names; an empty name would match every document.
pub fn validate_desired_items(items: &[DesiredItem]) -> Result<(), VerifyError> {
    if let Some(pos) = items.iter().position(|i| i.name.trim().is_empty()) {
        return Err(VerifyError::InvalidInput(format!(
            "item {} has an empty 'name'",
            pos + 1
        )));
    }
    Ok(())
}

/// Normalise a medication name for comparison: trim, then lower-case.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Title-case a name for display: `"vitamin c"` → `"Vitamin C"`.
///
/// A letter is upper-cased when the preceding character is not a letter,
/// otherwise lower-cased.
pub fn title_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut prev_alpha = false;
    for c in name.chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out
}

/// Text recognised across every page of every uploaded document.
///
/// Whitespace runs are collapsed to single spaces on construction; case is
/// preserved so the verdict can echo what was read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedText(String);

impl ExtractedText {
    pub fn new(text: impl AsRef<str>) -> Self {
        Self(collapse_whitespace(text.as_ref()))
    }

    /// Join fragments (OCR lines, pages, documents) with single spaces.
    pub fn from_fragments<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut joined = String::new();
        for fragment in fragments {
            joined.push(' ');
            joined.push_str(fragment.as_ref());
        }
        Self::new(joined)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The lower-cased form every matcher compares against.
    pub fn to_lowercase(&self) -> String {
        self.0.to_lowercase()
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
