//! Grouping/ordering presenter.
//!
//! Buckets reconciled task/flow records into a display hierarchy. The two
//! origin-derived buckets always sort first (project before workspace),
//! remaining buckets alphabetically; items within a bucket sort by label. A
//! lone "Ungrouped" bucket flattens to a plain alphabetical list with no
//! group headers.

use crate::error::ApiError;
use crate::types::{record_str, Record, NAME_KEYS, UNGROUPED};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Origin bucket labels, in their fixed display order.
const ORIGIN_GROUPS: &[&str] = &["Project Config", "Workspace Config"];

/// One node of the display hierarchy. Rendering is the editor's concern;
/// this is the complete shape it consumes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TreeNode {
    Group {
        label: String,
        children: Vec<TreeNode>,
    },
    Item {
        label: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    /// Inline explanatory leaf for a failure scoped to one workspace root.
    Error { message: String },
}

/// Bucket and order reconciled task/flow records.
pub fn group_named_records(records: &[Record]) -> Vec<TreeNode> {
    let mut buckets: BTreeMap<String, Vec<TreeNode>> = BTreeMap::new();
    for record in records {
        let label = match record_str(record, NAME_KEYS) {
            Some(name) => name.to_string(),
            None => continue,
        };
        let group = record_str(record, &["group"])
            .filter(|g| !g.trim().is_empty())
            .unwrap_or(UNGROUPED)
            .to_string();
        let description = record_str(record, &["description"]).map(str::to_string);
        buckets
            .entry(group)
            .or_default()
            .push(TreeNode::Item { label, description });
    }

    for items in buckets.values_mut() {
        items.sort_by(|a, b| node_label(a).to_lowercase().cmp(&node_label(b).to_lowercase()));
    }

    // A single "Ungrouped" bucket flattens: no headers shown.
    if buckets.len() == 1 && buckets.contains_key(UNGROUPED) {
        return buckets.remove(UNGROUPED).unwrap_or_default();
    }

    let mut nodes = Vec::new();
    for origin in ORIGIN_GROUPS {
        if let Some(children) = buckets.remove(*origin) {
            nodes.push(TreeNode::Group {
                label: origin.to_string(),
                children,
            });
        }
    }
    // BTreeMap iteration keeps the remaining buckets alphabetical.
    for (label, children) in buckets {
        nodes.push(TreeNode::Group { label, children });
    }
    nodes
}

/// Placeholder leaf for a root whose listing failed; other roots still render.
pub fn root_error_node(root: &Path, error: &ApiError) -> TreeNode {
    TreeNode::Error {
        message: format!("{}: {}", root.display(), error),
    }
}

fn node_label(node: &TreeNode) -> &str {
    match node {
        TreeNode::Group { label, .. } | TreeNode::Item { label, .. } => label,
        TreeNode::Error { message } => message,
    }
}
