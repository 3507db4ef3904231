use serde::{Deserialize, Serialize};

use super::EvidenceRecord;

/// A web search hit, numbered so prompts can cite it by `source_id`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchResult {
    pub source_id: String,
    pub title: String,
    pub url: String,
    pub content: String,
    pub score: f64,
}

impl SearchResult {
    /// Evidence record citing this result, with the given justification
    pub fn to_evidence(&self, justification: &str) -> EvidenceRecord {
        EvidenceRecord {
            source_id: self.source_id.clone(),
            title: self.title.clone(),
            url: self.url.clone(),
            snippet: truncate(&self.content, 300),
            justification: justification.to_string(),
        }
    }
}

/// Truncate to at most `limit` characters, marking the cut with "..."
pub fn truncate(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let kept: String = text.chars().take(limit.saturating_sub(3)).collect();
    format!("{}...", kept)
}
