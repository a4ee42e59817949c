//! Derived org state.
//!
//! Presentation-level facts computed from one reconciled org record: has the
//! org actually been provisioned, how many days remain, and what to show in a
//! short status line and an extended description. Signals are heterogeneous
//! and optional; absence is never an error.

use crate::types::{
    record_flag, record_is, record_str, Record, ACTIVE_KEYS, DOMAIN_KEYS, SCRATCH_KEYS,
};
use serde::Serialize;

/// Expiry-day breakdown. All fields stay unset when the source field is
/// absent or unparseable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DayBreakdown {
    pub remaining: Option<u32>,
    pub total: Option<u32>,
    pub used: Option<u32>,
}

/// Derived org facts for display.
#[derive(Debug, Clone, Serialize)]
pub struct OrgStatus {
    /// Provisioned and reachable.
    pub org_created: bool,
    pub days: DayBreakdown,
    /// Short status line (e.g. `3/10 days left`, `Expired`, `Connected`).
    pub status_line: String,
    /// Extended multi-line description.
    pub description: Vec<String>,
}

/// Parse a day-count field: either a `remaining/total` fraction string or a
/// bare integer interpreted as `total` with `remaining = total`.
pub fn parse_day_counts(raw: Option<&str>) -> DayBreakdown {
    let raw = match raw {
        Some(raw) => raw.trim(),
        None => return DayBreakdown::default(),
    };
    if let Some((left, right)) = raw.split_once('/') {
        match (left.trim().parse::<u32>(), right.trim().parse::<u32>()) {
            (Ok(remaining), Ok(total)) => DayBreakdown {
                remaining: Some(remaining),
                total: Some(total),
                used: Some(total.saturating_sub(remaining)),
            },
            _ => DayBreakdown::default(),
        }
    } else {
        match raw.parse::<u32>() {
            Ok(total) => DayBreakdown {
                remaining: Some(total),
                total: Some(total),
                used: Some(0),
            },
            Err(_) => DayBreakdown::default(),
        }
    }
}

/// Human display string for a day breakdown. `None` when nothing is known.
pub fn format_days(days: &DayBreakdown) -> Option<String> {
    let remaining = days.remaining?;
    match days.total {
        Some(0) => Some("Expired".to_string()),
        Some(total) if total != remaining => Some(format!("{}/{} days left", remaining, total)),
        // remaining == total, or total unknown.
        _ => Some(format!(
            "{} day{} left",
            remaining,
            if remaining == 1 { "" } else { "s" }
        )),
    }
}

/// Decide whether an org has actually been provisioned and is reachable.
///
/// Evaluated in order: definition-missing/definition-only force false; a
/// missing domain forces false regardless of any other signal; an explicit
/// active flag wins next; otherwise scratch orgs require a domain and no
/// expiry, non-scratch orgs just a domain.
pub fn org_created(record: &Record) -> bool {
    if record_is(record, &["definition_missing"]) || record_is(record, &["definition_only"]) {
        return false;
    }
    if record_str(record, DOMAIN_KEYS).is_none() {
        return false;
    }
    if let Some(active) = record_flag(record, ACTIVE_KEYS) {
        return active;
    }
    if record_is(record, SCRATCH_KEYS) {
        return !is_expired(record);
    }
    true
}

fn is_expired(record: &Record) -> bool {
    if let Some(expired) = record_flag(record, &["expired"]) {
        return expired;
    }
    let days = parse_day_counts(record_str(record, &["days"]));
    days.total == Some(0)
}

/// Compute the full derived status for one reconciled org record.
pub fn org_status(record: &Record) -> OrgStatus {
    let days = parse_day_counts(record_str(record, &["days"]));
    let created = org_created(record);
    let definition_only = record_is(record, &["definition_only"]);

    let status_line = if definition_only {
        "Not created".to_string()
    } else {
        match format_days(&days) {
            Some(line) => line,
            None if created => "Connected".to_string(),
            None => "Not created".to_string(),
        }
    };

    let mut description = Vec::new();
    if let Some(alias) = record_str(record, &["alias"]) {
        description.push(format!("Alias: {}", alias));
    }
    if let Some(domain) = record_str(record, DOMAIN_KEYS) {
        description.push(format!("Instance: {}", domain));
    }
    if let Some(line) = format_days(&days) {
        description.push(line);
    }
    if record_is(record, SCRATCH_KEYS) {
        description.push("Scratch org".to_string());
    }
    if record_is(record, &["is_default", "default"]) {
        description.push("Default org".to_string());
    }
    if definition_only {
        description.push("Defined in config, not yet created".to_string());
    }
    if record_is(record, &["definition_missing"]) {
        description.push("No local definition file found".to_string());
    }
    if let Some(serde_json::Value::Array(sources)) = record.get("config_sources") {
        let labels: Vec<&str> = sources.iter().filter_map(|v| v.as_str()).collect();
        if !labels.is_empty() {
            description.push(format!("Defined in: {}", labels.join(", ")));
        }
    }

    OrgStatus {
        org_created: created,
        days,
        status_line,
        description,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: serde_json::Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_parse_day_counts_fraction() {
        let days = parse_day_counts(Some("3/10"));
        assert_eq!(days.remaining, Some(3));
        assert_eq!(days.total, Some(10));
        assert_eq!(days.used, Some(7));
    }

    #[test]
    fn test_parse_day_counts_bare_integer_is_total() {
        let days = parse_day_counts(Some("5"));
        assert_eq!(days.remaining, Some(5));
        assert_eq!(days.total, Some(5));
        assert_eq!(days.used, Some(0));
    }

    #[test]
    fn test_parse_day_counts_garbage_is_all_unset() {
        assert_eq!(parse_day_counts(Some("soon")), DayBreakdown::default());
        assert_eq!(parse_day_counts(Some("3/x")), DayBreakdown::default());
        assert_eq!(parse_day_counts(None), DayBreakdown::default());
    }

    #[test]
    fn test_format_days_rules() {
        assert_eq!(
            format_days(&parse_day_counts(Some("3/10"))).as_deref(),
            Some("3/10 days left")
        );
        assert_eq!(
            format_days(&parse_day_counts(Some("0"))).as_deref(),
            Some("Expired")
        );
        assert_eq!(
            format_days(&parse_day_counts(Some("5"))).as_deref(),
            Some("5 days left")
        );
        assert_eq!(
            format_days(&parse_day_counts(Some("1/1"))).as_deref(),
            Some("1 day left")
        );
        assert_eq!(
            format_days(&parse_day_counts(Some("0/7"))).as_deref(),
            Some("0/7 days left")
        );
        assert_eq!(format_days(&DayBreakdown::default()), None);
    }

    #[test]
    fn test_org_created_requires_domain_even_when_active() {
        let rec = record(json!({"alias": "qa", "active": true}));
        assert!(!org_created(&rec));
    }

    #[test]
    fn test_org_created_explicit_active_wins_with_domain() {
        let rec = record(json!({"alias": "qa", "domain": "qa.example.test", "active": false}));
        assert!(!org_created(&rec));
        let rec = record(json!({"alias": "qa", "domain": "qa.example.test", "is_active": true}));
        assert!(org_created(&rec));
    }

    #[test]
    fn test_org_created_scratch_needs_unexpired() {
        let rec = record(json!({
            "alias": "qa", "domain": "qa.example.test", "is_scratch": true, "days": "3/7"
        }));
        assert!(org_created(&rec));
        let rec = record(json!({
            "alias": "qa", "domain": "qa.example.test", "is_scratch": true, "expired": true
        }));
        assert!(!org_created(&rec));
        let rec = record(json!({
            "alias": "qa", "domain": "qa.example.test", "is_scratch": true, "days": "0"
        }));
        assert!(!org_created(&rec));
    }

    #[test]
    fn test_org_created_non_scratch_needs_only_domain() {
        let rec = record(json!({"alias": "prod", "instance_url": "https://prod.example"}));
        assert!(org_created(&rec));
    }

    #[test]
    fn test_org_created_definition_flags_force_false() {
        let rec = record(json!({
            "alias": "qa", "domain": "qa.example.test", "active": true, "definition_only": true
        }));
        assert!(!org_created(&rec));
        let rec = record(json!({
            "alias": "qa", "domain": "qa.example.test", "active": true, "definition_missing": true
        }));
        assert!(!org_created(&rec));
    }

    #[test]
    fn test_org_status_lines() {
        let status = org_status(&record(json!({
            "alias": "qa", "domain": "qa.example.test", "is_scratch": true, "days": "3/7"
        })));
        assert_eq!(status.status_line, "3/7 days left");
        assert!(status.org_created);
        assert!(status.description.contains(&"Alias: qa".to_string()));
        assert!(status.description.contains(&"Scratch org".to_string()));

        let status = org_status(&record(json!({"alias": "qa", "definition_only": true})));
        assert_eq!(status.status_line, "Not created");
        assert!(!status.org_created);

        let status = org_status(&record(json!({
            "alias": "prod", "instance_url": "https://prod.example", "is_default": true
        })));
        assert_eq!(status.status_line, "Connected");
        assert!(status.description.contains(&"Default org".to_string()));
    }
}
