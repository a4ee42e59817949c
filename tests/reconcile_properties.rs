//! Property-based tests for reconciliation guarantees: idempotence and
//! identity uniqueness across arbitrary live/declarative input mixes.

use projtree::declarative::{ConfigScope, ConfigStub, OrgDefinitionMeta};
use projtree::reconcile::{reconcile_named, reconcile_orgs};
use projtree::types::{normalize_identity, record_str, ALIAS_KEYS, NAME_KEYS};
use proptest::prelude::*;
use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::collections::HashSet;

fn identifier() -> impl Strategy<Value = String> {
    "[A-Za-z][A-Za-z0-9_-]{0,8}"
}

/// Live values: bare strings, records with a name, and junk without one.
fn live_value(key: &'static str) -> impl Strategy<Value = Value> {
    prop_oneof![
        identifier().prop_map(Value::String),
        identifier().prop_map(move |name| json!({ key: name, "description": "live" })),
        Just(json!({"description": "nameless"})),
        Just(json!(17)),
    ]
}

fn stub(name: String) -> ConfigStub {
    ConfigStub {
        name,
        description: Some("config".to_string()),
        group: "Project Config".to_string(),
        scope: ConfigScope::Project,
        definition: None,
    }
}

fn definition(alias: String) -> OrgDefinitionMeta {
    let mut sources = BTreeSet::new();
    sources.insert("proj.yml".to_string());
    OrgDefinitionMeta {
        alias,
        config_file: None,
        scratch: Some(true),
        sources,
    }
}

proptest! {
    #[test]
    fn reconcile_named_is_idempotent(
        live in prop::collection::vec(live_value("name"), 0..12),
        stub_names in prop::collection::vec(identifier(), 0..6),
    ) {
        let stubs: Vec<ConfigStub> = stub_names.iter().cloned().map(stub).collect();
        let first = reconcile_named(live.clone(), stubs.clone());
        let second = reconcile_named(live.clone(), stubs.clone());
        prop_assert_eq!(&first, &second);

        // Reconciling the output again with the same stubs changes nothing
        // observable about identity.
        let replay: Vec<Value> = first.iter().cloned().map(Value::Object).collect();
        let again = reconcile_named(replay, stubs);
        prop_assert_eq!(first.len(), again.len());
    }

    #[test]
    fn reconcile_named_identities_are_unique(
        live in prop::collection::vec(live_value("name"), 0..12),
        stub_names in prop::collection::vec(identifier(), 0..6),
    ) {
        let stubs: Vec<ConfigStub> = stub_names.iter().cloned().map(stub).collect();
        let merged = reconcile_named(live, stubs);
        let mut seen = HashSet::new();
        for record in &merged {
            let name = record_str(record, NAME_KEYS).expect("merged record has a name");
            let key = normalize_identity(name).expect("identity is non-empty");
            prop_assert!(seen.insert(key), "duplicate identity: {}", name);
        }
    }

    #[test]
    fn reconcile_orgs_is_idempotent_and_sorted(
        live in prop::collection::vec(live_value("alias"), 0..12),
        def_aliases in prop::collection::vec(identifier(), 0..6),
    ) {
        let definitions: Vec<OrgDefinitionMeta> =
            def_aliases.iter().cloned().map(definition).collect();
        let first = reconcile_orgs(live.clone(), definitions.clone());
        let second = reconcile_orgs(live, definitions);
        prop_assert_eq!(&first, &second);

        let keys: Vec<String> = first
            .iter()
            .filter_map(|record| record_str(record, ALIAS_KEYS))
            .map(|alias| alias.to_lowercase())
            .collect();
        let mut sorted = keys.clone();
        sorted.sort();
        prop_assert_eq!(&keys, &sorted);

        let unique: HashSet<&String> = keys.iter().collect();
        prop_assert_eq!(unique.len(), keys.len());
    }

    #[test]
    fn declarative_only_definitions_always_survive(
        def_aliases in prop::collection::vec(identifier(), 1..6),
    ) {
        let definitions: Vec<OrgDefinitionMeta> =
            def_aliases.iter().cloned().map(definition).collect();
        let merged = reconcile_orgs(Vec::new(), definitions);

        let expected: HashSet<String> = def_aliases
            .iter()
            .filter_map(|alias| normalize_identity(alias))
            .collect();
        prop_assert_eq!(merged.len(), expected.len());
        for record in &merged {
            prop_assert_eq!(record.get("definition_only"), Some(&json!(true)));
            prop_assert_eq!(record.get("org_created"), Some(&json!(false)));
        }
    }
}
