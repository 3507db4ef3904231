use std::collections::{HashMap, HashSet};

use serde_json::Value;

use crate::models::{EvidenceRecord, SearchResult, truncate};

/// Deduplicates evidence by `(source_id, url)`, keeping first-seen order
#[derive(Debug, Default)]
pub struct EvidenceMerger {
    seen: HashSet<(String, String)>,
    merged: Vec<EvidenceRecord>,
}

impl EvidenceMerger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one record; returns false if an equal key was already present
    pub fn push(&mut self, record: &EvidenceRecord) -> bool {
        let (source_id, url) = record.dedup_key();
        if !self.seen.insert((source_id.to_string(), url.to_string())) {
            return false;
        }
        self.merged.push(record.clone());
        true
    }

    pub fn extend<'a>(&mut self, records: impl IntoIterator<Item = &'a EvidenceRecord>) {
        for record in records {
            self.push(record);
        }
    }

    pub fn len(&self) -> usize {
        self.merged.len()
    }

    pub fn is_empty(&self) -> bool {
        self.merged.is_empty()
    }

    pub fn finish(self) -> Vec<EvidenceRecord> {
        self.merged
    }
}

/// Merge several evidence lists into one deduplicated list
pub fn merge_evidence<'a, I, L>(lists: I) -> Vec<EvidenceRecord>
where
    I: IntoIterator<Item = L>,
    L: IntoIterator<Item = &'a EvidenceRecord>,
{
    let mut merger = EvidenceMerger::new();
    for list in lists {
        merger.extend(list);
    }
    merger.finish()
}

/// Source metadata by `source_id`, used to resolve model citations
#[derive(Debug, Clone, Default)]
pub struct SourceLookup {
    sources: HashMap<String, EvidenceRecord>,
}

impl SourceLookup {
    pub fn from_search_results(results: &[SearchResult]) -> Self {
        let sources = results
            .iter()
            .filter(|r| !r.source_id.is_empty())
            .map(|r| (r.source_id.clone(), r.to_evidence("")))
            .collect();
        Self { sources }
    }

    pub fn from_evidence(evidence: &[EvidenceRecord]) -> Self {
        let sources = evidence
            .iter()
            .filter(|e| !e.source_id.is_empty())
            .map(|e| (e.source_id.clone(), e.clone()))
            .collect();
        Self { sources }
    }

    pub fn get(&self, source_id: &str) -> Option<&EvidenceRecord> {
        self.sources.get(source_id)
    }

    /// Source whose URL matches, if any
    pub fn by_url(&self, url: &str) -> Option<&EvidenceRecord> {
        let mut matches: Vec<&EvidenceRecord> =
            self.sources.values().filter(|e| e.url == url).collect();
        matches.sort_by(|a, b| a.source_id.cmp(&b.source_id));
        matches.into_iter().next()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

/// Convert a model-written `evidence` field into evidence records
///
/// Accepts objects (`source_id` plus `justification` or `excerpt`), bare
/// strings starting with a `SRC-nnn` id, or a list of either. Title, url and
/// snippet come from `lookup`, never from the model.
pub fn normalize_evidence(raw: Option<&Value>, lookup: &SourceLookup) -> Vec<EvidenceRecord> {
    let entries: Vec<&Value> = match raw {
        None | Some(Value::Null) => return Vec::new(),
        Some(Value::Array(items)) => items.iter().collect(),
        Some(other) => vec![other],
    };

    entries
        .into_iter()
        .filter_map(|entry| {
            let (source_id, justification) = match entry {
                Value::Object(map) => {
                    let source_id = map
                        .get("source_id")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .trim()
                        .to_string();
                    let justification = ["justification", "excerpt"]
                        .iter()
                        .find_map(|key| map.get(*key).and_then(Value::as_str))
                        .filter(|s| !s.trim().is_empty())
                        .unwrap_or_default()
                        .trim()
                        .to_string();
                    (source_id, justification)
                }
                Value::String(text) => (leading_source_id(text), text.trim().to_string()),
                _ => return None,
            };

            if source_id.is_empty() && justification.is_empty() {
                return None;
            }

            let meta = lookup.get(&source_id);
            Some(EvidenceRecord {
                title: meta.map(|m| m.title.clone()).unwrap_or_default(),
                url: meta.map(|m| m.url.clone()).unwrap_or_default(),
                snippet: meta.map(|m| truncate(&m.snippet, 300)).unwrap_or_default(),
                source_id,
                justification,
            })
        })
        .collect()
}

/// `SRC-<digits>` at the start of `text`, or an empty string
fn leading_source_id(text: &str) -> String {
    let text = text.trim_start();
    let Some(rest) = text.strip_prefix("SRC-") else {
        return String::new();
    };
    let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
    if digits.is_empty() {
        String::new()
    } else {
        format!("SRC-{}", digits)
    }
}
