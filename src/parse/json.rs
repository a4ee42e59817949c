//! Shape-tolerant JSON record extraction.
//!
//! The project CLI's JSON output has no stable top-level shape: depending on
//! version it emits a bare array, an object keyed by a list name, or an
//! alias-to-record map. Some versions also print banner text before the JSON.
//! Extraction tries each interpretation in a fixed order; `None` means no
//! candidate parsed as JSON at all and the caller falls back to text parsing.

use serde_json::{Map, Value};

/// Extract an ordered sequence of entity-like values (objects or strings)
/// from raw CLI stdout.
///
/// `preferred_key` names the top-level key most likely to hold the list
/// (e.g. `"orgs"` for an org listing).
///
/// `None` means no candidate parsed as JSON; `Some` with an empty vector is a
/// genuinely empty JSON listing. Callers must not text-parse the latter.
pub fn extract_records(raw: &str, preferred_key: &str) -> Option<Vec<Value>> {
    let parsed = parse_candidates(raw)?;
    Some(match parsed {
        Value::Array(items) => items,
        Value::Object(map) => extract_from_object(map, preferred_key),
        // A bare scalar is not a record listing.
        _ => Vec::new(),
    })
}

/// Extract a single JSON object from raw CLI stdout, tolerating banner text
/// before the first `{`. Used by detail commands (`org info`, `service info`).
pub fn extract_object(raw: &str) -> Option<Map<String, Value>> {
    match parse_candidates(raw)? {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

/// Try the full trimmed text, then the text from the first `{`, then from the
/// first `[`. Any candidate's parse error silently advances to the next.
fn parse_candidates(raw: &str) -> Option<Value> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Some(value);
    }
    for open in ['{', '['] {
        if let Some(start) = trimmed.find(open) {
            if let Ok(value) = serde_json::from_str::<Value>(&trimmed[start..]) {
                return Some(value);
            }
        }
    }
    None
}

fn extract_from_object(map: Map<String, Value>, preferred_key: &str) -> Vec<Value> {
    // 1. Preferred key holding an array wins outright.
    match map.get(preferred_key) {
        Some(Value::Array(items)) => return items.clone(),
        // 2. Preferred key holding a non-array object is an alias -> record map.
        Some(Value::Object(inner)) => return record_map_to_records(inner),
        _ => {}
    }

    // 3. First array-typed top-level value, in key order.
    for value in map.values() {
        if let Value::Array(items) = value {
            return items.clone();
        }
    }

    // 4. The whole object may itself be an alias -> record map.
    if looks_like_record_map(&map) {
        return record_map_to_records(&map);
    }

    // 5. Otherwise treat the object as one single record.
    vec![Value::Object(map)]
}

/// Heuristic: an object whose values are all non-array objects is treated as
/// a map from alias to record. Documented caveat: a single legitimate record
/// whose fields all happen to be nested objects will misfire into this rule.
pub(crate) fn looks_like_record_map(map: &Map<String, Value>) -> bool {
    !map.is_empty() && map.values().all(|v| matches!(v, Value::Object(_)))
}

/// Convert an alias -> record map into records, injecting the map key as
/// `alias` and `name` fallback fields only where the entry lacks its own.
fn record_map_to_records(map: &Map<String, Value>) -> Vec<Value> {
    map.iter()
        .map(|(key, value)| {
            let mut record = match value {
                Value::Object(fields) => fields.clone(),
                other => {
                    let mut fields = Map::new();
                    fields.insert("value".to_string(), other.clone());
                    fields
                }
            };
            record
                .entry("alias".to_string())
                .or_insert_with(|| Value::String(key.clone()));
            record
                .entry("name".to_string())
                .or_insert_with(|| Value::String(key.clone()));
            Value::Object(record)
        })
        .collect()
}
