//! Schema Validator
//!
//! Pure validation of a document object against the mindmap schema. Produces
//! errors (the document must not be built into a tree) and warnings (the
//! document is usable, but something looks off).
//!
//! # Rules
//!
//! - `root` must exist and be an object with non-empty `id` and `title`
//! - every node id is unique across the whole document; each occurrence of a
//!   duplicate gets its own diagnostic referencing the other paths
//! - node fields have the right JSON types
//! - `customFields` are checked against the `schema` descriptor when one is
//!   present; undeclared fields are warnings unless the schema is `strict`
//! - node tags missing from the tag palette are warnings

use crate::models::document::{
    child_path, doc_fields, field_path, ids_in_source_order, node_fields, ROOT_PATH,
};
use crate::models::{FieldType, ParseDiagnostic, SchemaDescriptor, ValidationResult};
use serde_json::{json, Map, Value};
use std::collections::{HashMap, HashSet};

/// Stateless document validator
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaValidator;

impl SchemaValidator {
    pub fn new() -> Self {
        Self
    }

    /// Validate a document object; never mutates its input
    pub fn validate(&self, doc: &Value) -> ValidationResult {
        let mut pass = ValidationPass::default();
        pass.check_document(doc);
        let result = ValidationResult::from_diagnostics(pass.finish());

        tracing::debug!(
            "Validation finished: {} error(s), {} warning(s)",
            result.errors.len(),
            result.warnings.len()
        );
        result
    }
}

#[derive(Default)]
struct ValidationPass<'a> {
    diagnostics: Vec<ParseDiagnostic>,
    /// id -> paths, in order of first appearance
    id_index: HashMap<&'a str, usize>,
    id_paths: Vec<(&'a str, Vec<String>)>,
    /// Node ids in the order they appear in the source text
    source_ids: Vec<(&'a str, String)>,
    schema: Option<SchemaDescriptor>,
    palette: Option<HashSet<String>>,
}

impl<'a> ValidationPass<'a> {
    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.diagnostics
            .push(ParseDiagnostic::error(message).with_path(path));
    }

    fn warning(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.diagnostics
            .push(ParseDiagnostic::warning(message).with_path(path));
    }

    /// Error in strict mode, warning otherwise
    fn schema_issue(&mut self, strict: bool, diagnostic: ParseDiagnostic) {
        let diagnostic = if strict {
            diagnostic
        } else {
            ParseDiagnostic {
                severity: crate::models::Severity::Warning,
                ..diagnostic
            }
        };
        self.diagnostics.push(diagnostic);
    }

    fn check_document(&mut self, doc: &'a Value) {
        let Some(map) = doc.as_object() else {
            self.error("", "Document must be an object");
            return;
        };

        for field in [doc_fields::VERSION, doc_fields::TITLE] {
            if let Some(value) = map.get(field) {
                if !value.is_string() {
                    self.warning(field, format!("'{}' should be a string", field));
                }
            }
        }
        for field in [doc_fields::METADATA, doc_fields::SETTINGS] {
            if let Some(value) = map.get(field) {
                if !value.is_object() {
                    self.warning(field, format!("'{}' should be an object", field));
                }
            }
        }

        if let Some(schema) = map.get(doc_fields::SCHEMA) {
            self.check_schema(schema);
        }
        if let Some(tags) = map.get(doc_fields::TAGS) {
            self.check_palette(tags);
        }

        match map.get(doc_fields::ROOT) {
            None => self.error(ROOT_PATH, "Document is missing required 'root' node"),
            Some(root) if !root.is_object() => {
                self.error(ROOT_PATH, "'root' must be an object")
            }
            Some(root) => {
                self.source_ids = ids_in_source_order(doc);
                self.check_node(root, ROOT_PATH.to_string());
            }
        }
    }

    fn check_schema(&mut self, schema: &Value) {
        let path = doc_fields::SCHEMA;
        if !schema.is_object() {
            self.error(path, "'schema' must be an object");
            return;
        }

        let descriptor: SchemaDescriptor = match serde_json::from_value(schema.clone()) {
            Ok(descriptor) => descriptor,
            Err(e) => {
                self.error(path, format!("Invalid schema descriptor: {}", e));
                return;
            }
        };

        let mut seen = HashSet::new();
        for (i, field) in descriptor.fields.iter().enumerate() {
            let entry_path = format!("{}.fields[{}]", path, i);
            if !seen.insert(field.name.as_str()) {
                self.warning(
                    &entry_path,
                    format!("Custom field '{}' is declared more than once", field.name),
                );
            }
            match FieldType::parse(&field.field_type) {
                None => self.warning(
                    format!("{}.type", entry_path),
                    format!(
                        "Unknown field type '{}' for custom field '{}'",
                        field.field_type, field.name
                    ),
                ),
                Some(FieldType::Enum) if field.options.as_ref().map_or(true, Vec::is_empty) => {
                    self.warning(
                        &entry_path,
                        format!("Enum field '{}' declares no options", field.name),
                    )
                }
                Some(_) => {}
            }
        }

        self.schema = Some(descriptor);
    }

    fn check_palette(&mut self, tags: &Value) {
        let path = doc_fields::TAGS;
        let Some(entries) = tags.as_array() else {
            self.error(path, "'tags' must be an array of tag definitions");
            return;
        };

        let mut palette = HashSet::new();
        for (i, entry) in entries.iter().enumerate() {
            let entry_path = format!("{}[{}]", path, i);
            match entry.get("name").and_then(Value::as_str) {
                Some(name) if !name.trim().is_empty() => {
                    if !palette.insert(name.to_string()) {
                        self.warning(&entry_path, format!("Tag '{}' is defined more than once", name));
                    }
                }
                _ => self.error(&entry_path, "Tag definition requires a non-empty 'name'"),
            }
        }
        self.palette = Some(palette);
    }

    fn check_node(&mut self, node: &'a Value, path: String) {
        let Some(map) = node.as_object() else {
            self.error(path, "Node must be an object");
            return;
        };

        match map.get(node_fields::ID) {
            None => self.error(field_path(&path, node_fields::ID), "Node is missing required 'id'"),
            Some(Value::String(id)) if id.trim().is_empty() => {
                self.error(field_path(&path, node_fields::ID), "Node 'id' must not be empty")
            }
            Some(Value::String(id)) => self.record_id(id, &path),
            Some(_) => self.error(field_path(&path, node_fields::ID), "Node 'id' must be a string"),
        }

        match map.get(node_fields::TITLE) {
            None => self.error(
                field_path(&path, node_fields::TITLE),
                "Node is missing required 'title'",
            ),
            Some(Value::String(title)) if title.trim().is_empty() => self.error(
                field_path(&path, node_fields::TITLE),
                "Node 'title' must not be empty",
            ),
            Some(Value::String(_)) => {}
            Some(_) => self.error(
                field_path(&path, node_fields::TITLE),
                "Node 'title' must be a string",
            ),
        }

        if let Some(description) = map.get(node_fields::DESCRIPTION) {
            if !(description.is_string() || description.is_null()) {
                self.error(
                    field_path(&path, node_fields::DESCRIPTION),
                    "Node 'description' must be a string",
                );
            }
        }

        if let Some(tags) = map.get(node_fields::TAGS) {
            self.check_node_tags(tags, &path);
        }

        match map.get(node_fields::CUSTOM_FIELDS) {
            Some(Value::Object(fields)) => self.check_custom_fields(Some(fields), &path),
            Some(_) => self.error(
                field_path(&path, node_fields::CUSTOM_FIELDS),
                "Node 'customFields' must be an object",
            ),
            None => self.check_custom_fields(None, &path),
        }

        if let Some(metadata) = map.get(node_fields::METADATA) {
            if !metadata.is_object() {
                self.warning(
                    field_path(&path, node_fields::METADATA),
                    "Node 'metadata' should be an object",
                );
            }
        }

        match map.get(node_fields::CHILDREN) {
            None => {}
            Some(Value::Array(children)) => {
                for (i, child) in children.iter().enumerate() {
                    self.check_node(child, child_path(&path, i));
                }
            }
            Some(_) => self.error(
                field_path(&path, node_fields::CHILDREN),
                "Node 'children' must be an array",
            ),
        }
    }

    fn record_id(&mut self, id: &'a str, path: &str) {
        match self.id_index.get(id) {
            Some(&idx) => self.id_paths[idx].1.push(path.to_string()),
            None => {
                self.id_index.insert(id, self.id_paths.len());
                self.id_paths.push((id, vec![path.to_string()]));
            }
        }
    }

    fn check_node_tags(&mut self, tags: &Value, path: &str) {
        let tags_path = field_path(path, node_fields::TAGS);
        let Some(items) = tags.as_array() else {
            self.error(tags_path, "Node 'tags' must be an array of strings");
            return;
        };

        let mut seen = HashSet::new();
        for (i, tag) in items.iter().enumerate() {
            let tag_path = format!("{}[{}]", tags_path, i);
            let Some(name) = tag.as_str() else {
                self.error(tag_path, "Tag must be a string");
                continue;
            };
            if !seen.insert(name) {
                self.warning(&tag_path, format!("Tag '{}' is listed more than once", name));
            }
            let undefined = self
                .palette
                .as_ref()
                .map_or(false, |palette| !palette.contains(name));
            if undefined {
                self.warning(
                    tag_path,
                    format!("Tag '{}' is not defined in the tag palette", name),
                );
            }
        }
    }

    fn check_custom_fields(&mut self, fields: Option<&Map<String, Value>>, path: &str) {
        let Some(schema) = self.schema.clone() else {
            return;
        };
        let base = field_path(path, node_fields::CUSTOM_FIELDS);

        if let Some(fields) = fields {
            for (name, value) in fields {
                let value_path = field_path(&base, name);
                let Some(definition) = schema.field(name) else {
                    self.schema_issue(
                        schema.strict,
                        ParseDiagnostic::error(format!(
                            "Custom field '{}' is not declared in the schema",
                            name
                        ))
                        .with_path(value_path),
                    );
                    continue;
                };
                let Some(field_type) = FieldType::parse(&definition.field_type) else {
                    continue;
                };
                if value.is_null() {
                    continue;
                }
                if !matches_type(value, &field_type) {
                    self.error(
                        value_path,
                        format!(
                            "Custom field '{}' expects {}, found {}",
                            name,
                            field_type.as_str(),
                            json_type_name(value)
                        ),
                    );
                } else if field_type == FieldType::Enum {
                    let allowed = definition.options.as_deref().unwrap_or(&[]);
                    if !allowed.is_empty() && !allowed.contains(value) {
                        self.diagnostics.push(
                            ParseDiagnostic::error(format!(
                                "Custom field '{}' has value {} which is not one of its options",
                                name, value
                            ))
                            .with_path(value_path)
                            .with_details(json!({ "options": allowed })),
                        );
                    }
                }
            }
        }

        for definition in schema.fields.iter().filter(|f| f.required) {
            let present = fields
                .and_then(|f| f.get(&definition.name))
                .map_or(false, |v| !v.is_null());
            if !present {
                self.schema_issue(
                    schema.strict,
                    ParseDiagnostic::error(format!(
                        "Required custom field '{}' is missing",
                        definition.name
                    ))
                    .with_path(base.clone()),
                );
            }
        }
    }

    fn finish(mut self) -> Vec<ParseDiagnostic> {
        for (id, paths) in std::mem::take(&mut self.id_paths) {
            if paths.len() < 2 {
                continue;
            }
            for (index, path) in paths.iter().enumerate() {
                // Rank among this id's occurrences in text order
                let occurrence = self
                    .source_ids
                    .iter()
                    .filter(|(candidate, _)| *candidate == id)
                    .position(|(_, candidate_path)| candidate_path == path)
                    .unwrap_or(index);
                let others: Vec<&str> = paths
                    .iter()
                    .filter(|p| *p != path)
                    .map(String::as_str)
                    .collect();
                self.diagnostics.push(
                    ParseDiagnostic::error(format!(
                        "Duplicate node id '{}' (also used at {})",
                        id,
                        others.join(", ")
                    ))
                    .with_path(path.clone())
                    .with_details(json!({
                        "nodeId": id,
                        "occurrence": occurrence,
                        "paths": paths,
                    })),
                );
            }
        }
        self.diagnostics
    }
}

fn matches_type(value: &Value, field_type: &FieldType) -> bool {
    match field_type {
        FieldType::String | FieldType::Enum => value.is_string(),
        FieldType::Number => value.is_number(),
        FieldType::Boolean => value.is_boolean(),
        FieldType::Array => value.is_array(),
        FieldType::Object => value.is_object(),
        FieldType::Date => value.as_str().map_or(false, is_date),
    }
}

fn is_date(s: &str) -> bool {
    chrono::DateTime::parse_from_rfc3339(s).is_ok()
        || chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
#[path = "schema_validator_test.rs"]
mod schema_validator_test;
