//! Shared types for reconciled entities.
//!
//! Entities are dynamic key/value records rather than rigid structs: the
//! project CLI's output shape varies across versions, and reconciliation must
//! carry unknown fields through untouched. Typed DTOs appear only at the
//! derived-state and presentation layers.

use serde_json::{Map, Value};

/// One entity record: a mapping from field name to scalar/array/object value.
pub type Record = Map<String, Value>;

/// Entity kinds surfaced by the project CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Org,
    Task,
    Flow,
    Service,
}

impl EntityKind {
    /// Singular noun used in CLI arguments (`proj task list`, `proj org info`).
    pub fn noun(&self) -> &'static str {
        match self {
            EntityKind::Org => "org",
            EntityKind::Task => "task",
            EntityKind::Flow => "flow",
            EntityKind::Service => "service",
        }
    }
}

/// Prioritized keys that can hold a task/flow name in live CLI records.
pub const NAME_KEYS: &[&str] = &["name", "task", "flow", "id"];

/// Prioritized keys that can hold an org alias in live CLI records.
pub const ALIAS_KEYS: &[&str] = &["alias", "username", "name"];

/// Keys that can hold a resolvable org domain / instance URL.
pub const DOMAIN_KEYS: &[&str] = &["domain", "instance_url", "instance url", "login_url"];

/// Keys that can hold an explicit org-active signal.
pub const ACTIVE_KEYS: &[&str] = &["active", "is_active"];

/// Keys that can hold an org scratch flag.
pub const SCRATCH_KEYS: &[&str] = &["is_scratch", "scratch"];

/// Placeholder group assigned when no grouping information exists.
pub const UNGROUPED: &str = "Ungrouped";

/// Normalize an identity key: trimmed, lowercased for case-insensitive
/// matching. Returns `None` for empty/whitespace-only input so that records
/// without a derivable identity can be discarded before reconciliation.
pub fn normalize_identity(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

/// First non-empty string value found under any of the given keys.
pub fn record_str<'a>(record: &'a Record, keys: &[&str]) -> Option<&'a str> {
    for key in keys {
        if let Some(Value::String(s)) = record.get(*key) {
            if !s.trim().is_empty() {
                return Some(s.as_str());
            }
        }
    }
    None
}

/// First boolean value found under any of the given keys. String forms
/// `"true"` / `"false"` (any case) are accepted because the CLI's text
/// fallback path produces strings.
pub fn record_flag(record: &Record, keys: &[&str]) -> Option<bool> {
    for key in keys {
        match record.get(*key) {
            Some(Value::Bool(b)) => return Some(*b),
            Some(Value::String(s)) => match s.trim().to_lowercase().as_str() {
                "true" => return Some(true),
                "false" => return Some(false),
                _ => {}
            },
            _ => {}
        }
    }
    None
}

/// `record_flag` defaulted to false.
pub fn record_is(record: &Record, keys: &[&str]) -> bool {
    record_flag(record, keys).unwrap_or(false)
}
