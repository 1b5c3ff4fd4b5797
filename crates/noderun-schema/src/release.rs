//! The remote release catalog (`index.json`).
//!
//! Every element of the document is parsed on its own. An element with a
//! missing or malformed `version`, or a shape we do not understand, is
//! dropped from the catalog instead of failing the whole document.

use serde_json::Value;
use thiserror::Error;

use crate::version::NodeVersion;

/// Errors for the index document as a whole.
#[derive(Error, Debug)]
pub enum IndexError {
    /// The body is not valid JSON.
    #[error("release index is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The body is JSON but not an array of releases.
    #[error("release index is not a JSON array")]
    NotAnArray,
}

/// One release row from the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseIndexEntry {
    /// Parsed release version.
    pub version: NodeVersion,
    /// LTS codename, `None` for non-LTS releases.
    pub lts: Option<String>,
}

impl ReleaseIndexEntry {
    /// Parse a single catalog element.
    ///
    /// Returns `None` when the element cannot be used as a candidate.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let version = NodeVersion::parse(obj.get("version")?.as_str()?).ok()?;
        let lts = obj.get("lts").and_then(lts_label);
        Some(Self { version, lts })
    }

    /// Whether this release is flagged as long-term support.
    pub fn is_lts(&self) -> bool {
        self.lts.is_some()
    }

    /// Major release line.
    pub fn major(&self) -> u64 {
        self.version.major
    }
}

/// Interpret the `lts` field.
///
/// Strings are codenames unless empty or the literal `"false"`; `true` has
/// no codename and is reported as `"true"`.
fn lts_label(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() && s != "false" => Some(s.clone()),
        Value::Bool(true) => Some("true".to_string()),
        _ => None,
    }
}

/// The parsed catalog, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReleaseIndex {
    /// Usable entries, in the order the remote document lists them.
    pub entries: Vec<ReleaseIndexEntry>,
    /// Number of elements dropped as unusable.
    pub skipped: usize,
}

impl ReleaseIndex {
    /// Parse the raw `index.json` body.
    ///
    /// # Errors
    ///
    /// Fails only when the document is not JSON or not an array. Individual
    /// malformed elements are skipped.
    pub fn from_json(body: &str) -> Result<Self, IndexError> {
        let doc: Value = serde_json::from_str(body)?;
        let Value::Array(items) = doc else {
            return Err(IndexError::NotAnArray);
        };

        let entries: Vec<_> = items
            .iter()
            .filter_map(ReleaseIndexEntry::from_value)
            .collect();
        Ok(Self {
            skipped: items.len() - entries.len(),
            entries,
        })
    }

    /// Build an index directly from entries.
    pub fn from_entries(entries: Vec<ReleaseIndexEntry>) -> Self {
        Self {
            entries,
            skipped: 0,
        }
    }

    /// LTS entries only, in document order.
    pub fn lts(&self) -> impl Iterator<Item = &ReleaseIndexEntry> {
        self.entries.iter().filter(|e| e.is_lts())
    }

    /// Number of usable entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index has no usable entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
