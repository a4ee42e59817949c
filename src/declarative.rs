//! Declarative config loader.
//!
//! Two optional YAML documents describe tasks, flows, and scratch org
//! definitions: a project-scope document in the workspace root (checked as
//! `proj.yml` then `proj.yaml`) and a user-scope document at `~/.proj/proj.yml`.
//! A conventional `orgs/` directory contributes one scratch definition per
//! `<alias>.(yml|yaml|json)` file. Absence of any of these is a normal state:
//! missing, unreadable, or unparseable documents yield empty results for that
//! scope, never errors.

use crate::types::UNGROUPED;
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Project-scope document candidates, in priority order.
pub const PROJECT_CONFIG_CANDIDATES: &[&str] = &["proj.yml", "proj.yaml"];

/// User-scope document, relative to the home directory.
pub const GLOBAL_CONFIG_RELATIVE: &str = ".proj/proj.yml";

/// Conventional scratch-definition directory under the workspace root.
pub const DEFINITIONS_DIR: &str = "orgs";

/// Which declarative document a stub came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigScope {
    Project,
    Global,
}

impl ConfigScope {
    /// Origin tag recorded on merged records.
    pub fn tag(&self) -> &'static str {
        match self {
            ConfigScope::Project => "project",
            ConfigScope::Global => "global",
        }
    }

    /// Synthesized group label for entries with no explicit group.
    pub fn default_group(&self) -> &'static str {
        match self {
            ConfigScope::Project => "Project Config",
            ConfigScope::Global => "Workspace Config",
        }
    }

    /// Source-location label for scratch definitions from this scope.
    fn source_label(&self) -> &'static str {
        match self {
            ConfigScope::Project => "proj.yml",
            ConfigScope::Global => "~/.proj/proj.yml",
        }
    }
}

/// Normalized task/flow stub derived purely from declarative config.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigStub {
    pub name: String,
    pub description: Option<String>,
    /// Explicit group, or the scope-derived default label.
    pub group: String,
    pub scope: ConfigScope,
    /// Unrecognized entry fields, preserved opaquely for later display.
    pub definition: Option<Value>,
}

/// Intermediate scratch-org definition, merged by alias before being joined
/// against live org records. Owned and discarded within one reconciliation
/// pass.
#[derive(Debug, Clone, PartialEq)]
pub struct OrgDefinitionMeta {
    pub alias: String,
    pub config_file: Option<String>,
    pub scratch: Option<bool>,
    pub sources: BTreeSet<String>,
}

impl OrgDefinitionMeta {
    fn new(alias: impl Into<String>) -> Self {
        OrgDefinitionMeta {
            alias: alias.into(),
            config_file: None,
            scratch: None,
            sources: BTreeSet::new(),
        }
    }
}

/// Loaded declarative configuration for one workspace root.
#[derive(Debug, Clone, Default)]
pub struct DeclarativeConfig {
    root: PathBuf,
    project: Option<Value>,
    global: Option<Value>,
}

impl DeclarativeConfig {
    /// Load both scopes for a workspace root. Never fails; scopes that cannot
    /// be read simply stay empty.
    pub fn load(root: &Path) -> Self {
        let project = PROJECT_CONFIG_CANDIDATES
            .iter()
            .find_map(|name| load_yaml(&root.join(name)));
        let global = global_config_path().and_then(|path| load_yaml(&path));
        DeclarativeConfig {
            root: root.to_path_buf(),
            project,
            global,
        }
    }

    /// Build from already-parsed documents. Used by tests and by callers that
    /// manage document reading themselves.
    pub fn from_documents(root: &Path, project: Option<Value>, global: Option<Value>) -> Self {
        DeclarativeConfig {
            root: root.to_path_buf(),
            project,
            global,
        }
    }

    /// Task stubs from both scopes, project scope first.
    pub fn task_stubs(&self) -> Vec<ConfigStub> {
        self.section_stubs("tasks")
    }

    /// Flow stubs from both scopes, project scope first.
    pub fn flow_stubs(&self) -> Vec<ConfigStub> {
        self.section_stubs("flows")
    }

    /// Scratch-org definitions: `orgs.scratch` entries from both documents
    /// plus one definition per file in the definitions directory.
    pub fn scratch_definitions(&self) -> Vec<OrgDefinitionMeta> {
        let mut definitions = Vec::new();
        for (scope, document) in self.scoped_documents() {
            let scratch = document
                .get("orgs")
                .and_then(|orgs| orgs.get("scratch"));
            if let Some(scratch) = scratch {
                definitions.extend(scratch_entries(scratch, scope));
            }
        }
        definitions.extend(scan_definitions_dir(&self.root));
        definitions
    }

    fn scoped_documents(&self) -> Vec<(ConfigScope, &Value)> {
        let mut documents = Vec::new();
        if let Some(project) = &self.project {
            documents.push((ConfigScope::Project, project));
        }
        if let Some(global) = &self.global {
            documents.push((ConfigScope::Global, global));
        }
        documents
    }

    fn section_stubs(&self, section: &str) -> Vec<ConfigStub> {
        let mut stubs = Vec::new();
        for (scope, document) in self.scoped_documents() {
            let entries = match document.get(section) {
                Some(Value::Object(entries)) => entries,
                _ => continue,
            };
            for (name, entry) in entries {
                stubs.push(entry_to_stub(name, entry, scope));
            }
        }
        stubs
    }
}

/// Normalize one section entry. A bare string is a description-only stub; a
/// mapping contributes `description` and `group`, with every other field
/// preserved as an opaque definition blob.
fn entry_to_stub(name: &str, entry: &Value, scope: ConfigScope) -> ConfigStub {
    match entry {
        Value::String(description) => ConfigStub {
            name: name.to_string(),
            description: Some(description.clone()),
            group: scope.default_group().to_string(),
            scope,
            definition: None,
        },
        Value::Object(fields) => {
            let description = fields
                .get("description")
                .and_then(Value::as_str)
                .map(str::to_string);
            let group = fields
                .get("group")
                .and_then(Value::as_str)
                .filter(|g| !g.trim().is_empty() && *g != UNGROUPED)
                .map(str::to_string)
                .unwrap_or_else(|| scope.default_group().to_string());
            let rest: Map<String, Value> = fields
                .iter()
                .filter(|(key, _)| key.as_str() != "description" && key.as_str() != "group")
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect();
            ConfigStub {
                name: name.to_string(),
                description,
                group,
                scope,
                definition: if rest.is_empty() {
                    None
                } else {
                    Some(Value::Object(rest))
                },
            }
        }
        _ => ConfigStub {
            name: name.to_string(),
            description: None,
            group: scope.default_group().to_string(),
            scope,
            definition: None,
        },
    }
}

/// Normalize the three accepted `orgs.scratch` shapes (sequence of alias
/// strings, sequence of single-key mappings, mapping of alias to spec) to one
/// definition shape.
fn scratch_entries(scratch: &Value, scope: ConfigScope) -> Vec<OrgDefinitionMeta> {
    let mut definitions = Vec::new();
    match scratch {
        Value::Array(items) => {
            for item in items {
                match item {
                    Value::String(alias) => {
                        definitions.push(scratch_definition(alias, None, scope));
                    }
                    Value::Object(entry) => {
                        for (alias, spec) in entry {
                            definitions.push(scratch_definition(alias, Some(spec), scope));
                        }
                    }
                    _ => {}
                }
            }
        }
        Value::Object(entries) => {
            for (alias, spec) in entries {
                definitions.push(scratch_definition(alias, Some(spec), scope));
            }
        }
        _ => {}
    }
    definitions
}

fn scratch_definition(alias: &str, spec: Option<&Value>, scope: ConfigScope) -> OrgDefinitionMeta {
    let mut definition = OrgDefinitionMeta::new(alias);
    definition.scratch = Some(true);
    definition.sources.insert(scope.source_label().to_string());
    if let Some(Value::Object(fields)) = spec {
        definition.config_file = fields
            .get("config_file")
            .and_then(Value::as_str)
            .map(str::to_string);
    }
    definition
}

/// One synthesized definition per `<alias>.(yml|yaml|json)` file in the
/// definitions directory, implicitly scratch, sourced at its relative path.
fn scan_definitions_dir(root: &Path) -> Vec<OrgDefinitionMeta> {
    let dir = root.join(DEFINITIONS_DIR);
    let mut definitions = Vec::new();
    for entry in WalkDir::new(&dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
    {
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default();
        if !matches!(extension, "yml" | "yaml" | "json") {
            continue;
        }
        let alias = match path.file_stem().and_then(|stem| stem.to_str()) {
            Some(stem) if !stem.is_empty() => stem.to_string(),
            _ => continue,
        };
        let relative = format!(
            "{}/{}",
            DEFINITIONS_DIR,
            entry.file_name().to_string_lossy()
        );
        let mut definition = OrgDefinitionMeta::new(alias);
        definition.scratch = Some(true);
        definition.config_file = Some(relative.clone());
        definition.sources.insert(relative);
        definitions.push(definition);
    }
    definitions
}

/// Read and parse one YAML document to a JSON value. Any failure logs at
/// debug level and yields `None`; optional config being absent is normal.
fn load_yaml(path: &Path) -> Option<Value> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) => {
            debug!(path = %path.display(), error = %err, "declarative config not readable");
            return None;
        }
    };
    match serde_yaml::from_str::<serde_yaml::Value>(&text) {
        Ok(value) => Some(yaml_to_json(value)),
        Err(err) => {
            debug!(path = %path.display(), error = %err, "declarative config not parseable");
            None
        }
    }
}

/// Path to the user-scope document.
pub fn global_config_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|dirs| dirs.home_dir().join(GLOBAL_CONFIG_RELATIVE))
}

/// Convert a YAML value to a JSON value. Non-string mapping keys are
/// stringified; tagged values collapse to their inner value.
fn yaml_to_json(value: serde_yaml::Value) -> Value {
    match value {
        serde_yaml::Value::Null => Value::Null,
        serde_yaml::Value::Bool(b) => Value::Bool(b),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::from(i)
            } else if let Some(u) = n.as_u64() {
                Value::from(u)
            } else if let Some(f) = n.as_f64() {
                serde_json::Number::from_f64(f)
                    .map(Value::Number)
                    .unwrap_or(Value::Null)
            } else {
                Value::Null
            }
        }
        serde_yaml::Value::String(s) => Value::String(s),
        serde_yaml::Value::Sequence(items) => {
            Value::Array(items.into_iter().map(yaml_to_json).collect())
        }
        serde_yaml::Value::Mapping(mapping) => {
            let mut map = Map::new();
            for (key, value) in mapping {
                let key = match key {
                    serde_yaml::Value::String(s) => s,
                    other => yaml_scalar_to_string(&other),
                };
                map.insert(key, yaml_to_json(value));
            }
            Value::Object(map)
        }
        serde_yaml::Value::Tagged(tagged) => yaml_to_json(tagged.value),
    }
}

fn yaml_scalar_to_string(value: &serde_yaml::Value) -> String {
    match value {
        serde_yaml::Value::Bool(b) => b.to_string(),
        serde_yaml::Value::Number(n) => n.to_string(),
        serde_yaml::Value::Null => String::new(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
    }
}
