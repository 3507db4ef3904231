//! Turns untrusted model output into flat lists of JSON records.
//!
//! Nothing here fails: text that cannot be parsed normalizes to an empty
//! list and the caller decides whether that means "skip this item".

pub mod fields;

pub use fields::*;

use serde_json::{Map, Value};

/// One normalized object from a model response
pub type Record = Map<String, Value>;

/// Wrapper keys models commonly put around the list we asked for
pub const WRAPPER_KEYS: &[&str] = &[
    "items",
    "data",
    "results",
    "regulations",
    "checklists",
    "tasks",
];

/// Remove a surrounding ``` fence and its language tag, if present
///
/// Only a fence that opens a line counts, so backticks inside a JSON
/// string are left alone.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(start) = line_start_fences(trimmed).next() else {
        return trimmed;
    };

    let after_open = &trimmed[start + 3..];
    // Language tag runs to the end of the opening line
    let body_start = match after_open.find('\n') {
        Some(newline) if after_open[..newline].chars().all(|c| c.is_alphanumeric()) => {
            newline + 1
        }
        _ => after_open
            .find(|c: char| !c.is_alphanumeric())
            .unwrap_or(after_open.len()),
    };
    let body = &after_open[body_start..];

    let close = line_start_fences(body).next().or_else(|| body.rfind("```"));
    match close {
        Some(close) => body[..close].trim(),
        None => body.trim(),
    }
}

/// Byte offsets of ``` markers with only whitespace before them on their line
fn line_start_fences(text: &str) -> impl Iterator<Item = usize> + '_ {
    text.match_indices("```").map(|(i, _)| i).filter(|&i| {
        let before = &text[..i];
        before[before.rfind('\n').map_or(0, |n| n + 1)..].trim().is_empty()
    })
}

/// Parse a JSON value out of a response
///
/// Tries a strict parse of the whole text, then of the unfenced body, then
/// the span from the first opening bracket to the last matching closing
/// bracket.
pub fn extract_json(text: &str) -> Option<Value> {
    if let Ok(value) = serde_json::from_str(text.trim()) {
        return Some(value);
    }

    let body = strip_code_fence(text);
    if let Ok(value) = serde_json::from_str(body) {
        return Some(value);
    }

    let start = body.find(['{', '['])?;
    let close = if body[start..].starts_with('{') { '}' } else { ']' };
    let end = body.rfind(close)?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&body[start..=end]).ok()
}

/// Normalize a raw response into a flat list of records
pub fn normalize(text: &str) -> Vec<Record> {
    extract_json(text).map(ensure_record_list).unwrap_or_default()
}

/// Coerce any JSON value into a flat list of objects
///
/// Objects holding a list under a wrapper key are unwrapped; other objects
/// become a one-element list. Nested lists are flattened and non-object
/// entries dropped.
pub fn ensure_record_list(value: Value) -> Vec<Record> {
    let mut records = Vec::new();
    collect_records(value, &mut records);
    records
}

fn collect_records(value: Value, out: &mut Vec<Record>) {
    match value {
        Value::Array(items) => {
            for item in items {
                match item {
                    Value::Array(_) => collect_records(item, out),
                    Value::Object(map) => out.push(map),
                    _ => {}
                }
            }
        }
        Value::Object(mut map) => {
            let wrapped = WRAPPER_KEYS
                .iter()
                .find(|key| matches!(map.get(**key), Some(Value::Array(_))))
                .and_then(|key| map.remove(*key));
            match wrapped {
                Some(list) => collect_records(list, out),
                None => out.push(map),
            }
        }
        _ => {}
    }
}

/// Normalize a response expected to hold a single object
///
/// Returns `None` when nothing object-shaped could be recovered.
pub fn normalize_object(text: &str) -> Option<Record> {
    match extract_json(text)? {
        Value::Object(map) => Some(map),
        Value::Array(items) => items.into_iter().find_map(|item| match item {
            Value::Object(map) => Some(map),
            _ => None,
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_json_is_empty() {
        assert!(normalize("not json").is_empty());
        assert!(normalize("").is_empty());
        assert!(normalize_object("sorry, I cannot help").is_none());
    }

    #[test]
    fn test_wrapper_drops_non_objects() {
        let records = normalize(r#"{"items":[{"a":1},"x",{"a":2}]}"#);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["a"], 1);
        assert_eq!(records[1]["a"], 2);
    }

    #[test]
    fn test_single_object_is_one_record() {
        let records = normalize(r#"{"name": "RoHS"}"#);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["name"], "RoHS");
    }

    #[test]
    fn test_nested_lists_are_flattened() {
        let records = normalize(r#"[[{"a":1},{"a":2}],[{"a":3}], 4, null]"#);
        assert_eq!(records.len(), 3);
    }

    #[test]
    fn test_fenced_with_language_tag() {
        let text = "Here you go:\n```json\n[{\"a\": 1}]\n```\nLet me know!";
        assert_eq!(strip_code_fence(text), "[{\"a\": 1}]");
        assert_eq!(normalize(text).len(), 1);
    }

    #[test]
    fn test_fence_tag_on_same_line() {
        assert_eq!(strip_code_fence("```json{\"a\": 1}```"), "{\"a\": 1}");
        assert_eq!(strip_code_fence("```\n[1]\n```"), "[1]");
    }

    #[test]
    fn test_backticks_inside_string_are_not_a_fence() {
        let text =
            r#"[{"task_name": "Document build", "method": ["Run ```make report``` nightly"]}]"#;
        let records = normalize(text);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["method"][0], "Run ```make report``` nightly");
    }

    #[test]
    fn test_fenced_body_with_inner_backticks() {
        let text = "Sure:\n```json\n[{\"method\": \"Run ```make``` daily\"}]\n```\nDone.";
        let records = normalize(text);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["method"], "Run ```make``` daily");
    }

    #[test]
    fn test_json_embedded_in_prose() {
        let text = "The answer is {\"risk_score\": 8} as requested.";
        let record = normalize_object(text).unwrap();
        assert_eq!(record["risk_score"], 8);
    }

    #[test]
    fn test_other_wrapper_keys() {
        assert_eq!(normalize(r#"{"checklists":[{"a":1}]}"#).len(), 1);
        assert_eq!(normalize(r#"{"data":[{"a":1},{"b":2}]}"#).len(), 2);
        // A wrapper key holding a non-list is just a field
        let records = normalize(r#"{"items": "none", "name": "x"}"#);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["name"], "x");
    }

    #[test]
    fn test_object_from_list_takes_first_object() {
        let record = normalize_object(r#"["x", {"a": 1}, {"a": 2}]"#).unwrap();
        assert_eq!(record["a"], 1);
    }

    #[test]
    fn test_truncated_json_is_empty() {
        assert!(normalize(r#"[{"a": 1}, {"a": "#).is_empty());
    }
}
