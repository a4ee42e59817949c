//! Listing and detail orchestration.
//!
//! Each entity kind has a canonical list invocation tried first with the
//! machine-readable flag; when the failure text implicates the flag itself,
//! the listing is re-invoked without it and the plain text output goes
//! through the table parser (services) or line splitting (orgs/tasks/flows).
//! Live records are then reconciled with declarative config. Multiple
//! workspace roots are processed sequentially, with per-root failure
//! isolation.

use crate::declarative::DeclarativeConfig;
use crate::error::ApiError;
use crate::notify::{expiry_notice, InMemoryNoticeStore};
use crate::parse::{
    extract_object, extract_records, is_default_marker, is_rule_line, parse_key_value,
    parse_table, strip_ansi,
};
use crate::reconcile::{reconcile_named, reconcile_orgs};
use crate::runner::CliRunner;
use crate::settings::Settings;
use crate::types::{record_flag, record_str, EntityKind, Record};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Text-fallback column headers for the services table.
const SERVICE_TABLE_HEADERS: &[&str] = &["Default", "Type", "Name", "Description"];

/// Header vocabulary used to recognize header-looking lines in plain-text
/// listing fallbacks.
const HEADER_WORDS: &[&str] = &[
    "name", "alias", "username", "default", "description", "type", "status", "expires", "days",
    "domain", "org", "group",
];

/// One attribute of a service type's schema, independent of any connected
/// instance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceAttributeSpec {
    pub name: String,
    pub required: bool,
    pub sensitive: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_factory: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// One connected service instance. Identity is the (type, name) pair; the
/// default flag is enforced by the CLI and only reflected here.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceRecord {
    pub service_type: String,
    pub name: String,
    pub is_default: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<ServiceAttributeSpec>,
}

/// Services bucketed by type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceTypeGroup {
    pub service_type: String,
    pub services: Vec<ServiceRecord>,
}

/// Outcome of one workspace root's listing: entities or that root's error.
#[derive(Debug)]
pub struct RootListing {
    pub root: PathBuf,
    pub outcome: Result<Vec<Record>, ApiError>,
}

/// Listing service over a CLI runner. Lookup structures are rebuilt per call;
/// the only state carried across calls is the expiry-notice dedup store.
pub struct ListingService {
    runner: Arc<dyn CliRunner>,
    settings: Settings,
    notices: InMemoryNoticeStore,
}

impl ListingService {
    pub fn new(runner: Arc<dyn CliRunner>, settings: Settings) -> Self {
        ListingService {
            runner,
            settings,
            notices: InMemoryNoticeStore::new(),
        }
    }

    /// Due expiry notices for a batch of reconciled orgs, deduplicated per
    /// session through the notice store. The threshold comes from settings.
    pub fn expiry_notices(&self, orgs: &[Record]) -> Vec<String> {
        orgs.iter()
            .filter_map(|org| {
                expiry_notice(org, self.settings.expiry_notice_days, &self.notices)
            })
            .collect()
    }

    /// Reconciled org records for one workspace root.
    pub async fn list_orgs(&self, root: &Path) -> Result<Vec<Record>, ApiError> {
        let live = self.live_records(root, EntityKind::Org).await?;
        let config = DeclarativeConfig::load(root);
        Ok(reconcile_orgs(live, config.scratch_definitions()))
    }

    /// Reconciled task records for one workspace root.
    pub async fn list_tasks(&self, root: &Path) -> Result<Vec<Record>, ApiError> {
        let live = self.live_records(root, EntityKind::Task).await?;
        let config = DeclarativeConfig::load(root);
        Ok(reconcile_named(live, config.task_stubs()))
    }

    /// Reconciled flow records for one workspace root.
    pub async fn list_flows(&self, root: &Path) -> Result<Vec<Record>, ApiError> {
        let live = self.live_records(root, EntityKind::Flow).await?;
        let config = DeclarativeConfig::load(root);
        Ok(reconcile_named(live, config.flow_stubs()))
    }

    /// Connected services for one workspace root, bucketed by type.
    pub async fn list_services(&self, root: &Path) -> Result<Vec<ServiceTypeGroup>, ApiError> {
        let live = self.live_records(root, EntityKind::Service).await?;
        Ok(group_services(live))
    }

    /// Org detail: JSON object if available, otherwise the key/value table.
    pub async fn org_info(&self, root: &Path, alias: &str) -> Result<Record, ApiError> {
        self.detail(root, EntityKind::Org, &[alias]).await
    }

    /// Service detail for one (type, name) pair.
    pub async fn service_info(
        &self,
        root: &Path,
        service_type: &str,
        name: &str,
    ) -> Result<Record, ApiError> {
        self.detail(root, EntityKind::Service, &[service_type, name])
            .await
    }

    /// List one entity kind across several workspace roots, sequentially.
    /// One root's failure is captured in its own entry; the rest still load.
    pub async fn list_roots(&self, kind: EntityKind, roots: &[PathBuf]) -> Vec<RootListing> {
        let mut listings = Vec::with_capacity(roots.len());
        for root in roots {
            let outcome = match kind {
                EntityKind::Org => self.list_orgs(root).await,
                EntityKind::Task => self.list_tasks(root).await,
                EntityKind::Flow => self.list_flows(root).await,
                EntityKind::Service => self
                    .list_services(root)
                    .await
                    .map(|groups| service_groups_to_records(&groups)),
            };
            if let Err(err) = &outcome {
                warn!(root = %root.display(), error = %err, "listing failed for root");
            }
            listings.push(RootListing {
                root: root.clone(),
                outcome,
            });
        }
        listings
    }

    /// Run the list invocation for one kind, preferring machine-readable
    /// output and falling back to text parsing when the flag is unsupported.
    async fn live_records(&self, root: &Path, kind: EntityKind) -> Result<Vec<Value>, ApiError> {
        let base: Vec<String> = vec![kind.noun().to_string(), "list".to_string()];
        let mut with_flag = base.clone();
        with_flag.push(self.settings.cli.json_flag.clone());

        match self.runner.run(root, &with_flag).await {
            Ok(output) => match extract_records(&output.stdout, plural(kind)) {
                // JSON parsed; an empty vector is a genuinely empty listing.
                Some(records) => Ok(records),
                // No JSON anywhere: the flag was accepted but the output is
                // a plain listing after all.
                None => Ok(parse_text_listing(kind, &output.stdout)),
            },
            Err(ApiError::ToolFailed(message)) if self.flag_unsupported(&message) => {
                debug!(kind = ?kind, "machine-readable flag unsupported, re-invoking plain");
                let output = self.runner.run(root, &base).await?;
                Ok(parse_text_listing(kind, &output.stdout))
            }
            Err(err) => Err(err),
        }
    }

    async fn detail(
        &self,
        root: &Path,
        kind: EntityKind,
        names: &[&str],
    ) -> Result<Record, ApiError> {
        let mut base: Vec<String> = vec![kind.noun().to_string(), "info".to_string()];
        base.extend(names.iter().map(|n| n.to_string()));
        let mut with_flag = base.clone();
        with_flag.push(self.settings.cli.json_flag.clone());

        match self.runner.run(root, &with_flag).await {
            Ok(output) => match extract_object(&output.stdout) {
                Some(object) => Ok(object),
                None => Ok(key_value_record(&output.stdout)),
            },
            Err(ApiError::ToolFailed(message)) if self.flag_unsupported(&message) => {
                let output = self.runner.run(root, &base).await?;
                Ok(key_value_record(&output.stdout))
            }
            Err(err) => Err(err),
        }
    }

    /// Heuristic: does this failure text mean the machine-readable flag
    /// itself is unsupported (older CLI), rather than a genuine failure?
    fn flag_unsupported(&self, message: &str) -> bool {
        let lowered = message.to_lowercase();
        lowered.contains(&self.settings.cli.json_flag.to_lowercase())
            || lowered.contains("no such option")
    }
}

fn plural(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Org => "orgs",
        EntityKind::Task => "tasks",
        EntityKind::Flow => "flows",
        EntityKind::Service => "services",
    }
}

/// Parse a plain-text listing into raw records.
fn parse_text_listing(kind: EntityKind, text: &str) -> Vec<Value> {
    match kind {
        EntityKind::Service => parse_table(text, SERVICE_TABLE_HEADERS)
            .into_iter()
            .filter_map(|row| {
                let name = row.get("Name").cloned().unwrap_or_default();
                if name.is_empty() {
                    return None;
                }
                let mut record = Record::new();
                record.insert("name".to_string(), Value::String(name));
                if let Some(service_type) = row.get("Type").filter(|t| !t.is_empty()) {
                    record.insert("type".to_string(), Value::String(service_type.clone()));
                }
                if let Some(description) = row.get("Description").filter(|d| !d.is_empty()) {
                    record.insert(
                        "description".to_string(),
                        Value::String(description.clone()),
                    );
                }
                let default = row
                    .get("Default")
                    .map(|cell| is_default_marker(cell))
                    .unwrap_or(false);
                record.insert("default".to_string(), Value::Bool(default));
                Some(Value::Object(record))
            })
            .collect(),
        _ => parse_line_listing(kind, text),
    }
}

/// Line-splitting fallback for orgs/tasks/flows: each content line is one
/// record, skipping separator rules and header-looking lines. A leading
/// marker glyph denotes the default row.
fn parse_line_listing(kind: EntityKind, text: &str) -> Vec<Value> {
    let identity_key = if kind == EntityKind::Org { "alias" } else { "name" };
    let stripped = strip_ansi(text);
    let mut records = Vec::new();
    for line in stripped.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty()
            || is_rule_line(trimmed)
            || trimmed.ends_with(':')
            || looks_like_header(trimmed)
        {
            continue;
        }

        let (is_default, rest) = match trimmed.split_whitespace().next() {
            Some(first) if is_default_marker(first) => (true, trimmed[first.len()..].trim_start()),
            _ => (false, trimmed),
        };
        let mut tokens = rest.split_whitespace();
        let identity = match tokens.next() {
            Some(identity) => identity.to_string(),
            None => continue,
        };

        let mut record = Record::new();
        record.insert(identity_key.to_string(), Value::String(identity));
        if is_default {
            record.insert("is_default".to_string(), Value::Bool(true));
        }
        let remainder = tokens.collect::<Vec<_>>().join(" ");
        if !remainder.is_empty() && kind != EntityKind::Org {
            record.insert("description".to_string(), Value::String(remainder));
        }
        records.push(Value::Object(record));
    }
    records
}

/// A line mentioning two or more known column words is a header, not data.
fn looks_like_header(line: &str) -> bool {
    let mut hits = 0;
    for token in line.split_whitespace() {
        if HEADER_WORDS.contains(&token.to_lowercase().as_str()) {
            hits += 1;
            if hits >= 2 {
                return true;
            }
        }
    }
    false
}

/// Key/value table fallback for detail output.
fn key_value_record(text: &str) -> Record {
    let mut record = Record::new();
    for (key, value) in parse_key_value(text, "Key", "Value") {
        record.insert(key.to_lowercase().replace(' ', "_"), Value::String(value));
    }
    record
}

/// Bucket raw service records by type, resolving attribute schemas.
fn group_services(live: Vec<Value>) -> Vec<ServiceTypeGroup> {
    let mut by_type: BTreeMap<String, Vec<ServiceRecord>> = BTreeMap::new();
    for value in live {
        let record = match value {
            Value::Object(record) => record,
            _ => continue,
        };
        let name = match record_str(&record, &["name", "alias"]) {
            Some(name) => name.trim().to_string(),
            None => continue,
        };
        let service_type = match record_str(&record, &["type", "service_type"]) {
            Some(service_type) => service_type.trim().to_string(),
            None => continue,
        };
        let is_default = record_flag(&record, &["default", "is_default"])
            .unwrap_or_else(|| {
                record_str(&record, &["default"])
                    .map(is_default_marker)
                    .unwrap_or(false)
            });
        let description = record_str(&record, &["description"]).map(str::to_string);
        let attributes = match record.get("attributes") {
            Some(Value::Object(attributes)) => attribute_specs(attributes),
            _ => Vec::new(),
        };
        by_type.entry(service_type.clone()).or_default().push(ServiceRecord {
            service_type,
            name,
            is_default,
            description,
            attributes,
        });
    }

    by_type
        .into_iter()
        .map(|(service_type, mut services)| {
            services.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
            ServiceTypeGroup {
                service_type,
                services,
            }
        })
        .collect()
}

fn attribute_specs(attributes: &serde_json::Map<String, Value>) -> Vec<ServiceAttributeSpec> {
    attributes
        .iter()
        .map(|(name, spec)| {
            let fields = spec.as_object();
            let get_str = |key: &str| {
                fields
                    .and_then(|f| f.get(key))
                    .and_then(Value::as_str)
                    .map(str::to_string)
            };
            let get_flag = |key: &str| {
                fields
                    .and_then(|f| f.get(key))
                    .and_then(Value::as_bool)
                    .unwrap_or(false)
            };
            ServiceAttributeSpec {
                name: name.clone(),
                required: get_flag("required"),
                sensitive: get_flag("sensitive"),
                default_value: get_str("default_value").or_else(|| get_str("default")),
                default_factory: get_str("default_factory"),
                description: get_str("description"),
            }
        })
        .collect()
}

fn service_groups_to_records(groups: &[ServiceTypeGroup]) -> Vec<Record> {
    groups
        .iter()
        .flat_map(|group| &group.services)
        .filter_map(|service| match serde_json::to_value(service) {
            Ok(Value::Object(record)) => Some(record),
            _ => None,
        })
        .collect()
}
