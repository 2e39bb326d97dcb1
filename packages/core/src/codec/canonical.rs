//! Canonical key ordering
//!
//! `serde_json` is built with `preserve_order`, so emitted key order is the
//! insertion order of each map. Before serializing, the document is rebuilt
//! with known fields in their fixed order and everything else sorted, which
//! makes output a pure function of the logical content.

use crate::models::document::{
    doc_fields, node_fields, DOCUMENT_FIELD_ORDER, NODE_FIELD_ORDER, SCHEMA_FIELD_ORDER,
    SCHEMA_ORDER, TAG_FIELD_ORDER,
};
use serde_json::{Map, Value};

/// Rebuild a document object in canonical key order
pub fn canonicalize_document(doc: &Value) -> Value {
    match doc {
        Value::Object(map) => ordered(map, DOCUMENT_FIELD_ORDER, |key, value| match key {
            doc_fields::ROOT => canonicalize_node(value),
            doc_fields::TAGS => map_array(value, |entry| with_order(entry, TAG_FIELD_ORDER)),
            doc_fields::SCHEMA => canonicalize_schema(value),
            _ => sorted(value),
        }),
        other => sorted(other),
    }
}

/// Rebuild a node object (and its subtree) in canonical key order
pub fn canonicalize_node(node: &Value) -> Value {
    match node {
        Value::Object(map) => ordered(map, NODE_FIELD_ORDER, |key, value| match key {
            node_fields::CHILDREN => map_array(value, canonicalize_node),
            node_fields::TAGS => value.clone(),
            _ => sorted(value),
        }),
        other => sorted(other),
    }
}

fn canonicalize_schema(schema: &Value) -> Value {
    match schema {
        Value::Object(map) => ordered(map, SCHEMA_ORDER, |key, value| match key {
            "fields" => map_array(value, |entry| with_order(entry, SCHEMA_FIELD_ORDER)),
            _ => sorted(value),
        }),
        other => sorted(other),
    }
}

fn with_order(value: &Value, order: &[&str]) -> Value {
    match value {
        Value::Object(map) => ordered(map, order, |_, v| sorted(v)),
        other => sorted(other),
    }
}

fn map_array(value: &Value, f: impl Fn(&Value) -> Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.iter().map(f).collect()),
        other => sorted(other),
    }
}

/// Known keys first in `order`, then the remaining keys lexicographically
fn ordered(map: &Map<String, Value>, order: &[&str], f: impl Fn(&str, &Value) -> Value) -> Value {
    let mut out = Map::new();
    for key in order {
        if let Some(value) = map.get(*key) {
            out.insert((*key).to_string(), f(key, value));
        }
    }

    let mut rest: Vec<(&String, &Value)> = map
        .iter()
        .filter(|(key, _)| !order.contains(&key.as_str()))
        .collect();
    rest.sort_by(|a, b| a.0.cmp(b.0));
    for (key, value) in rest {
        out.insert(key.clone(), sorted(value));
    }

    Value::Object(out)
}

/// Recursively sort object keys
fn sorted(value: &Value) -> Value {
    match value {
        Value::Object(map) => ordered(map, &[], |_, v| sorted(v)),
        Value::Array(items) => Value::Array(items.iter().map(sorted).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn keys(value: &Value) -> Vec<&str> {
        value
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect()
    }

    #[test]
    fn test_document_keys_follow_fixed_order() {
        let doc = json!({
            "settings": {}, "zeta": 1, "root": {"id": "r", "title": "R"},
            "alpha": 2, "version": "1.0", "title": "T"
        });

        let canonical = canonicalize_document(&doc);
        assert_eq!(
            keys(&canonical),
            vec!["version", "title", "root", "settings", "alpha", "zeta"]
        );
    }

    #[test]
    fn test_node_keys_follow_fixed_order_recursively() {
        let doc = json!({
            "root": {
                "children": [{"title": "C", "extra": true, "id": "c"}],
                "title": "R",
                "id": "r"
            }
        });

        let canonical = canonicalize_document(&doc);
        assert_eq!(keys(&canonical["root"]), vec!["id", "title", "children"]);
        assert_eq!(
            keys(&canonical["root"]["children"][0]),
            vec!["id", "title", "extra"]
        );
    }

    #[test]
    fn test_free_form_maps_are_sorted() {
        let doc = json!({"root": {"id": "r", "title": "R", "customFields": {"b": 1, "a": 2}}});
        let canonical = canonicalize_document(&doc);
        assert_eq!(keys(&canonical["root"]["customFields"]), vec!["a", "b"]);
    }

    #[test]
    fn test_canonicalization_preserves_content() {
        let doc = json!({"title": "T", "root": {"title": "R", "id": "r", "tags": ["z", "a"]}});
        assert_eq!(canonicalize_document(&doc), doc);
    }
}
