use serde::{Deserialize, Serialize};

/// A citation backing a generated claim
///
/// Two records are the same citation when `source_id` and `url` match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvidenceRecord {
    /// Search result identifier (e.g. "SRC-001")
    pub source_id: String,
    pub title: String,
    pub url: String,
    /// Excerpt from the source document
    pub snippet: String,
    /// Model-written summary of why the source supports the claim
    pub justification: String,
}

impl EvidenceRecord {
    /// Key used for deduplication
    pub fn dedup_key(&self) -> (&str, &str) {
        (self.source_id.as_str(), self.url.as_str())
    }

    /// Summary text for display, preferring the justification
    pub fn summary(&self) -> String {
        if !self.justification.trim().is_empty() {
            self.justification.trim().to_string()
        } else {
            self.snippet.replace('\n', " ").trim().to_string()
        }
    }
}
