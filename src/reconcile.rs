//! Entity reconciler.
//!
//! Merges live CLI records with declarative stubs into exactly one record per
//! normalized identity. Precedence is fixed: live CLI data outranks
//! declarative data for fields already present, declarative data fills gaps,
//! and declarative-only entities survive as placeholder records so the user
//! can still act on them (e.g. create the org).

use crate::declarative::{ConfigStub, OrgDefinitionMeta};
use crate::types::{
    normalize_identity, record_is, record_str, Record, ALIAS_KEYS, NAME_KEYS, SCRATCH_KEYS,
    UNGROUPED,
};
use serde_json::Value;
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::debug;

/// Reconcile live task/flow records with declarative stubs.
///
/// Every live record survives (even without a declarative counterpart) and
/// every unmatched stub is appended as a standalone record. Records with no
/// derivable name are dropped.
pub fn reconcile_named(live: Vec<Value>, stubs: Vec<ConfigStub>) -> Vec<Record> {
    let mut stub_index: HashMap<String, usize> = HashMap::new();
    for (idx, stub) in stubs.iter().enumerate() {
        if let Some(key) = normalize_identity(&stub.name) {
            stub_index.entry(key).or_insert(idx);
        }
    }
    let mut consumed = vec![false; stubs.len()];

    let mut seen: HashSet<String> = HashSet::new();
    let mut merged: Vec<Record> = Vec::new();

    for value in live {
        let mut record = match normalize_live(value, "name") {
            Some(record) => record,
            None => continue,
        };
        let name = match record_str(&record, NAME_KEYS) {
            Some(name) => name.to_string(),
            None => continue,
        };
        let key = match normalize_identity(&name) {
            Some(key) => key,
            None => continue,
        };
        if !seen.insert(key.clone()) {
            debug!(name = %name, "duplicate live record dropped");
            continue;
        }
        if let Some(&idx) = stub_index.get(&key) {
            if !consumed[idx] {
                consumed[idx] = true;
                merge_stub_into(&mut record, &stubs[idx]);
            }
        }
        merged.push(record);
    }

    // Unmatched stubs surface as standalone declarative-only records.
    for (idx, stub) in stubs.iter().enumerate() {
        if consumed[idx] {
            continue;
        }
        let key = match normalize_identity(&stub.name) {
            Some(key) => key,
            None => continue,
        };
        if !seen.insert(key) {
            continue;
        }
        merged.push(stub_record(stub));
    }

    merged
}

/// Merge declarative fields into a live record, filling only where the live
/// record is silent. The origin tag and opaque definition blob always copy
/// through.
fn merge_stub_into(record: &mut Record, stub: &ConfigStub) {
    if record_str(record, &["description"]).is_none() {
        if let Some(description) = &stub.description {
            record.insert(
                "description".to_string(),
                Value::String(description.clone()),
            );
        }
    }
    let group_unset = match record_str(record, &["group"]) {
        None => true,
        Some(group) => group == UNGROUPED,
    };
    if group_unset {
        record.insert("group".to_string(), Value::String(stub.group.clone()));
    }
    record.insert(
        "config_source".to_string(),
        Value::String(stub.scope.tag().to_string()),
    );
    if let Some(definition) = &stub.definition {
        record.insert("config_definition".to_string(), definition.clone());
    }
}

fn stub_record(stub: &ConfigStub) -> Record {
    let mut record = Record::new();
    record.insert("name".to_string(), Value::String(stub.name.clone()));
    if let Some(description) = &stub.description {
        record.insert(
            "description".to_string(),
            Value::String(description.clone()),
        );
    }
    record.insert("group".to_string(), Value::String(stub.group.clone()));
    record.insert(
        "config_source".to_string(),
        Value::String(stub.scope.tag().to_string()),
    );
    if let Some(definition) = &stub.definition {
        record.insert("config_definition".to_string(), definition.clone());
    }
    record
}

/// Merge scratch definitions among themselves by normalized alias: the first
/// seen config path wins, the first stated scratch flag wins, and source
/// label sets union.
pub fn merge_definitions(definitions: Vec<OrgDefinitionMeta>) -> Vec<OrgDefinitionMeta> {
    let mut order: Vec<String> = Vec::new();
    let mut by_alias: HashMap<String, OrgDefinitionMeta> = HashMap::new();

    for definition in definitions {
        let key = match normalize_identity(&definition.alias) {
            Some(key) => key,
            None => continue,
        };
        match by_alias.get_mut(&key) {
            Some(existing) => {
                if existing.config_file.is_none() {
                    existing.config_file = definition.config_file;
                }
                if existing.scratch.is_none() {
                    existing.scratch = definition.scratch;
                }
                existing.sources.extend(definition.sources);
            }
            None => {
                order.push(key.clone());
                by_alias.insert(key, definition);
            }
        }
    }

    order
        .into_iter()
        .filter_map(|key| by_alias.remove(&key))
        .collect()
}

/// Reconcile live org records with scratch definitions.
///
/// Definitions are pre-merged by alias, joined against live records (filling
/// a missing config path, overwriting the scratch flag when the definition
/// states one, unioning source labels), and any unconsumed definition becomes
/// a definition-only stub org. The result is deduplicated by normalized alias
/// and sorted alphabetically.
pub fn reconcile_orgs(live: Vec<Value>, definitions: Vec<OrgDefinitionMeta>) -> Vec<Record> {
    let definitions = merge_definitions(definitions);
    let mut definition_index: HashMap<String, usize> = HashMap::new();
    for (idx, definition) in definitions.iter().enumerate() {
        if let Some(key) = normalize_identity(&definition.alias) {
            definition_index.entry(key).or_insert(idx);
        }
    }
    let mut consumed = vec![false; definitions.len()];

    let mut seen: HashSet<String> = HashSet::new();
    let mut merged: Vec<Record> = Vec::new();

    for value in live {
        let mut record = match normalize_live(value, "alias") {
            Some(record) => record,
            None => continue,
        };
        let alias = match record_str(&record, ALIAS_KEYS) {
            Some(alias) => alias.trim().to_string(),
            None => continue,
        };
        let key = match normalize_identity(&alias) {
            Some(key) => key,
            None => continue,
        };
        if !seen.insert(key.clone()) {
            debug!(alias = %alias, "duplicate live org dropped");
            continue;
        }
        record.insert("alias".to_string(), Value::String(alias));

        match definition_index.get(&key) {
            Some(&idx) if !consumed[idx] => {
                consumed[idx] = true;
                join_definition(&mut record, &definitions[idx]);
            }
            _ => {
                // Live scratch org with no local definition file.
                if record_is(&record, SCRATCH_KEYS) {
                    record.insert("definition_missing".to_string(), Value::Bool(true));
                }
            }
        }
        merged.push(record);
    }

    // Unconsumed definitions become definition-only stub orgs: known from
    // config, never yet created.
    for (idx, definition) in definitions.iter().enumerate() {
        if consumed[idx] {
            continue;
        }
        let key = match normalize_identity(&definition.alias) {
            Some(key) => key,
            None => continue,
        };
        if !seen.insert(key) {
            continue;
        }
        merged.push(definition_only_record(definition));
    }

    merged.sort_by_key(|record| {
        record_str(record, &["alias"])
            .map(|alias| alias.to_lowercase())
            .unwrap_or_default()
    });
    merged
}

fn join_definition(record: &mut Record, definition: &OrgDefinitionMeta) {
    if record_str(record, &["config_file"]).is_none() {
        if let Some(config_file) = &definition.config_file {
            record.insert(
                "config_file".to_string(),
                Value::String(config_file.clone()),
            );
        }
    }
    if let Some(scratch) = definition.scratch {
        record.insert("is_scratch".to_string(), Value::Bool(scratch));
    }
    let mut sources: BTreeSet<String> = definition.sources.clone();
    if let Some(Value::Array(existing)) = record.get("config_sources") {
        for value in existing {
            if let Value::String(label) = value {
                sources.insert(label.clone());
            }
        }
    }
    if !sources.is_empty() {
        record.insert(
            "config_sources".to_string(),
            Value::Array(sources.into_iter().map(Value::String).collect()),
        );
    }
}

fn definition_only_record(definition: &OrgDefinitionMeta) -> Record {
    let mut record = Record::new();
    record.insert(
        "alias".to_string(),
        Value::String(definition.alias.trim().to_string()),
    );
    record.insert(
        "is_scratch".to_string(),
        Value::Bool(definition.scratch.unwrap_or(true)),
    );
    if let Some(config_file) = &definition.config_file {
        record.insert(
            "config_file".to_string(),
            Value::String(config_file.clone()),
        );
    }
    if !definition.sources.is_empty() {
        record.insert(
            "config_sources".to_string(),
            Value::Array(
                definition
                    .sources
                    .iter()
                    .cloned()
                    .map(Value::String)
                    .collect(),
            ),
        );
    }
    record.insert("definition_only".to_string(), Value::Bool(true));
    record.insert("expired".to_string(), Value::Bool(false));
    record.insert("org_created".to_string(), Value::Bool(false));
    record
}

/// Normalize one live value: a bare string becomes a single-field record
/// under `identity_key`, an object is taken as-is, anything else is dropped.
fn normalize_live(value: Value, identity_key: &str) -> Option<Record> {
    match value {
        Value::String(text) => {
            let mut record = Record::new();
            record.insert(identity_key.to_string(), Value::String(text));
            Some(record)
        }
        Value::Object(record) => Some(record),
        _ => None,
    }
}
