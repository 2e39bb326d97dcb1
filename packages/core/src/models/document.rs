//! Document Shape
//!
//! A mindmap document is held as a plain `serde_json::Value` object graph
//! (the "document object"). Both serialization dialects parse into this same
//! shape. This module names the persisted fields, fixes their canonical
//! order and builds the dot/bracket paths used by diagnostics.
//!
//! # Example
//!
//! ```json
//! {
//!   "version": "1.0",
//!   "title": "Roadmap",
//!   "tags": [{ "name": "urgent", "color": "#ff0000" }],
//!   "root": {
//!     "id": "root",
//!     "title": "Roadmap",
//!     "children": [{ "id": "n1", "title": "Q1", "tags": ["urgent"] }]
//!   }
//! }
//! ```

use serde_json::Value;

/// Top-level document fields
pub mod doc_fields {
    pub const VERSION: &str = "version";
    pub const TITLE: &str = "title";
    pub const METADATA: &str = "metadata";
    pub const SCHEMA: &str = "schema";
    pub const TAGS: &str = "tags";
    pub const ROOT: &str = "root";
    pub const SETTINGS: &str = "settings";
}

/// Per-node fields
pub mod node_fields {
    pub const ID: &str = "id";
    pub const TITLE: &str = "title";
    pub const DESCRIPTION: &str = "description";
    pub const TAGS: &str = "tags";
    pub const CUSTOM_FIELDS: &str = "customFields";
    pub const CHILDREN: &str = "children";
    pub const METADATA: &str = "metadata";
}

/// Canonical emission order for document fields; unknown keys follow, sorted
pub const DOCUMENT_FIELD_ORDER: &[&str] = &[
    doc_fields::VERSION,
    doc_fields::TITLE,
    doc_fields::METADATA,
    doc_fields::SCHEMA,
    doc_fields::TAGS,
    doc_fields::ROOT,
    doc_fields::SETTINGS,
];

/// Canonical emission order for node fields; unknown keys follow, sorted
pub const NODE_FIELD_ORDER: &[&str] = &[
    node_fields::ID,
    node_fields::TITLE,
    node_fields::DESCRIPTION,
    node_fields::TAGS,
    node_fields::CUSTOM_FIELDS,
    node_fields::CHILDREN,
    node_fields::METADATA,
];

/// Canonical order for tag palette entries
pub const TAG_FIELD_ORDER: &[&str] = &["name", "color", "description"];

/// Canonical order for schema field definitions
pub const SCHEMA_FIELD_ORDER: &[&str] = &["name", "type", "description", "required", "options"];

/// Canonical order for the schema descriptor itself
pub const SCHEMA_ORDER: &[&str] = &["strict", "fields"];

/// Path of the root node
pub const ROOT_PATH: &str = "root";

/// Path of the `index`-th child of the node at `parent`
pub fn child_path(parent: &str, index: usize) -> String {
    format!("{}.{}[{}]", parent, node_fields::CHILDREN, index)
}

/// Path of a named field below `parent`
pub fn field_path(parent: &str, field: &str) -> String {
    if parent.is_empty() {
        field.to_string()
    } else {
        format!("{}.{}", parent, field)
    }
}

/// Every node id with its path, in the order the `id` keys appear in the
/// source text
///
/// Object maps keep their parsed key order, so a node written with
/// `children` ahead of `id` lists its descendants before itself.
pub fn ids_in_source_order(doc: &Value) -> Vec<(&str, String)> {
    let mut ids = Vec::new();
    if let Some(root) = doc.get(doc_fields::ROOT) {
        collect_source_order(root, ROOT_PATH.to_string(), &mut ids);
    }
    ids
}

fn collect_source_order<'a>(node: &'a Value, path: String, ids: &mut Vec<(&'a str, String)>) {
    let Some(map) = node.as_object() else {
        return;
    };
    for (key, value) in map {
        match (key.as_str(), value) {
            (node_fields::ID, Value::String(id)) => ids.push((id.as_str(), path.clone())),
            (node_fields::CHILDREN, Value::Array(children)) => {
                for (i, child) in children.iter().enumerate() {
                    collect_source_order(child, child_path(&path, i), ids);
                }
            }
            _ => {}
        }
    }
}

/// Rank of the node at `path` among the nodes sharing its id, in source order
pub fn source_occurrence(doc: &Value, id: &str, path: &str) -> Option<usize> {
    ids_in_source_order(doc)
        .into_iter()
        .filter(|(candidate, _)| *candidate == id)
        .position(|(_, candidate_path)| candidate_path == path)
}
