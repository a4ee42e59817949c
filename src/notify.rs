//! Expiry-notice deduplication.
//!
//! A scratch org nearing expiry should produce one notice per distinct
//! remaining-day count, not one per refresh. The cache maps alias to the
//! last-notified count; the read and the overwrite happen under one lock
//! acquisition so no interleaved writer can slip between them. Lifecycle
//! (persisting across sessions, if desired) is the caller's responsibility.

use crate::derive::parse_day_counts;
use crate::types::{normalize_identity, record_is, record_str, Record, SCRATCH_KEYS};
use parking_lot::Mutex;
use std::collections::HashMap;

/// Alias -> last-notified remaining day count.
pub trait ExpiryNoticeStore: Send + Sync {
    /// Returns the previously recorded count and unconditionally overwrites
    /// it with `remaining`, atomically.
    fn swap_notice(&self, alias: &str, remaining: u32) -> Option<u32>;
}

/// In-memory per-session store.
#[derive(Debug, Default)]
pub struct InMemoryNoticeStore {
    entries: Mutex<HashMap<String, u32>>,
}

impl InMemoryNoticeStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ExpiryNoticeStore for InMemoryNoticeStore {
    fn swap_notice(&self, alias: &str, remaining: u32) -> Option<u32> {
        let mut entries = self.entries.lock();
        entries.insert(alias.to_string(), remaining)
    }
}

/// Produce a user-facing expiry notice for one reconciled org record, or
/// `None` when no notice is due (not a scratch org, far from expiry, or the
/// same count was already notified this session).
pub fn expiry_notice(
    record: &Record,
    threshold_days: u32,
    store: &dyn ExpiryNoticeStore,
) -> Option<String> {
    if !record_is(record, SCRATCH_KEYS) || record_is(record, &["definition_only"]) {
        return None;
    }
    let alias = record_str(record, &["alias"])?;
    let key = normalize_identity(alias)?;
    let remaining = parse_day_counts(record_str(record, &["days"])).remaining?;
    if remaining > threshold_days {
        return None;
    }
    if store.swap_notice(&key, remaining) == Some(remaining) {
        return None;
    }
    Some(if remaining == 0 {
        format!("Scratch org '{}' has expired", alias)
    } else {
        format!(
            "Scratch org '{}' expires in {} day{}",
            alias,
            remaining,
            if remaining == 1 { "" } else { "s" }
        )
    })
}
