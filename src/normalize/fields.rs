use serde_json::Value;

use super::Record;

/// First non-blank string found under any of `keys`
///
/// Numbers and booleans are stringified; everything else is ignored.
pub fn str_field(record: &Record, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match record.get(*key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}

/// String field with a default for missing or blank values
pub fn str_or(record: &Record, keys: &[&str], default: &str) -> String {
    str_field(record, keys).unwrap_or_else(|| default.to_string())
}

/// List of strings under the first present key
///
/// A lone string is treated as a one-element list; blank entries are dropped.
pub fn string_list(record: &Record, keys: &[&str]) -> Vec<String> {
    let Some(value) = keys.iter().find_map(|key| record.get(*key)) else {
        return Vec::new();
    };
    value_strings(value)
}

fn value_strings(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => vec![s.trim().to_string()],
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Numeric field, accepting numbers and numeric strings
pub fn f64_field(record: &Record, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|key| match record.get(*key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

pub fn f64_or(record: &Record, keys: &[&str], default: f64) -> f64 {
    f64_field(record, keys)
        .filter(|v| v.is_finite())
        .unwrap_or(default)
}

/// Task id references in whatever shape the model used
///
/// Accepts `"1, 2 3"`, `["1", 2]`, nested lists and numbers. Order is kept
/// and duplicates removed.
pub fn task_ids(value: Option<&Value>) -> Vec<String> {
    let mut ids = Vec::new();
    if let Some(value) = value {
        collect_ids(value, &mut ids);
    }
    ids
}

fn collect_ids(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) => {
            for part in s.split(|c: char| c == ',' || c.is_whitespace()) {
                push_unique(out, part.trim());
            }
        }
        Value::Number(n) => push_unique(out, &n.to_string()),
        Value::Array(items) => items.iter().for_each(|item| collect_ids(item, out)),
        _ => {}
    }
}

fn push_unique(out: &mut Vec<String>, id: &str) {
    if !id.is_empty() && !out.iter().any(|existing| existing == id) {
        out.push(id.to_string());
    }
}
