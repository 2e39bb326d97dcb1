//! Mutation Engine
//!
//! High-level document operations over raw text. Every operation runs the
//! whole pipeline as one unit:
//!
//! ```text
//! raw text -> parse -> validate -> build tree -> mutate -> validate -> serialize
//! ```
//!
//! The input text is never modified. A mutation either returns a complete new
//! text or a [`MindmapError`]; in particular a mutation whose *result* fails
//! validation is rejected, so callers never observe a partial write.

use crate::codec::{
    canonicalize_node, locate_node_occurrence, CodecOptions, Dialect, FormatCodec,
};
use crate::config::EngineConfig;
use crate::models::document::{child_path, doc_fields, node_fields, source_occurrence, ROOT_PATH};
use crate::models::{ParseDiagnostic, ValidationResult};
use crate::services::search::{search_tree, SearchHit, SearchQuery};
use crate::services::{MindmapError, SchemaValidator};
use crate::tree::{InsertPosition, NodePatch, NodeTree, TreeNode};
use chrono::Utc;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashSet;

/// Parameters for [`MutationEngine::create_node`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreateNodeParams {
    pub parent_id: String,
    pub title: String,
    pub description: Option<String>,
    pub custom_fields: Option<Map<String, Value>>,
    pub tags: Option<Vec<String>>,
    pub position: InsertPosition,
}

impl CreateNodeParams {
    pub fn new(parent_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            parent_id: parent_id.into(),
            title: title.into(),
            ..Default::default()
        }
    }
}

/// A structural edit from the tree channel
#[derive(Debug, Clone, PartialEq)]
pub enum TreeEdit {
    Create(CreateNodeParams),
    Update {
        node_id: String,
        patch: NodePatch,
    },
    Delete {
        node_id: String,
        delete_children: bool,
    },
    Move {
        node_id: String,
        new_parent_id: String,
        position: InsertPosition,
    },
}

impl TreeEdit {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Create(_) => "create",
            Self::Update { .. } => "update",
            Self::Delete { .. } => "delete",
            Self::Move { .. } => "move",
        }
    }
}

/// Result of a successful mutation
#[derive(Debug, Clone, PartialEq)]
pub struct MutationOutcome {
    /// The complete new document text
    pub text: String,
    /// Created, updated, moved or deleted node
    pub node_id: String,
    /// Ids that left the document
    pub removed_ids: Vec<String>,
    /// Warnings on the resulting document
    pub warnings: Vec<ParseDiagnostic>,
    /// The mutated tree the text was serialized from
    pub tree: NodeTree,
}

/// A node together with its position in the tree
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeView {
    pub node: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    /// Ancestor ids from the root down to the node
    pub path: Vec<String>,
    pub depth: usize,
}

/// Validation outcome for raw text, with positions attached where possible
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub valid: bool,
    /// True for a blank or comment-only text
    pub empty: bool,
    pub errors: Vec<ParseDiagnostic>,
    pub warnings: Vec<ParseDiagnostic>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_count: Option<usize>,
}

/// Stateless orchestrator over codec, validator and tree
#[derive(Debug, Clone)]
pub struct MutationEngine {
    codec: FormatCodec,
    validator: SchemaValidator,
    config: EngineConfig,
}

impl Default for MutationEngine {
    fn default() -> Self {
        Self::new(CodecOptions::default(), EngineConfig::default())
    }
}

impl MutationEngine {
    pub fn new(codec_options: CodecOptions, config: EngineConfig) -> Self {
        Self {
            codec: FormatCodec::new(codec_options),
            validator: SchemaValidator::new(),
            config,
        }
    }

    pub fn codec(&self) -> &FormatCodec {
        &self.codec
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Parse, validate and build; the common front half of every operation
    pub fn load(&self, raw: &str, dialect: Dialect) -> Result<NodeTree, MindmapError> {
        let doc = self
            .codec
            .parse(raw, dialect)?
            .into_document()
            .ok_or_else(|| MindmapError::validation("Document is empty", Vec::new()))?;

        let mut result = self.validator.validate(&doc);
        if !result.valid {
            locate_diagnostics(raw, dialect, &doc, &mut result);
            let message = summarize(&result.errors);
            return Err(MindmapError::validation(message, result.errors));
        }

        Ok(NodeTree::build(&doc)?)
    }

    /// Validate the mutated tree and serialize it; the back half
    fn commit(
        &self,
        tree: &NodeTree,
        dialect: Dialect,
    ) -> Result<(String, Vec<ParseDiagnostic>), MindmapError> {
        let doc = tree.to_document();
        let result = self.validator.validate(&doc);
        if !result.valid {
            let message = format!(
                "Resulting document would be invalid: {}",
                summarize(&result.errors)
            );
            return Err(MindmapError::validation(message, result.errors));
        }

        let text = self.codec.serialize(&doc, dialect)?;
        Ok((text, result.warnings))
    }

    fn now() -> Value {
        Value::String(Utc::now().to_rfc3339())
    }

    /// Add a node under `parent_id` with an engine-generated id
    pub fn create_node(
        &self,
        raw: &str,
        dialect: Dialect,
        params: CreateNodeParams,
    ) -> Result<MutationOutcome, MindmapError> {
        self.apply(raw, dialect, &TreeEdit::Create(params), &HashSet::new())
    }

    pub fn update_node(
        &self,
        raw: &str,
        dialect: Dialect,
        node_id: &str,
        patch: NodePatch,
    ) -> Result<MutationOutcome, MindmapError> {
        let edit = TreeEdit::Update {
            node_id: node_id.to_string(),
            patch,
        };
        self.apply(raw, dialect, &edit, &HashSet::new())
    }

    /// Remove a node; without `delete_children` its children are promoted
    pub fn delete_node(
        &self,
        raw: &str,
        dialect: Dialect,
        node_id: &str,
        delete_children: bool,
    ) -> Result<MutationOutcome, MindmapError> {
        let edit = TreeEdit::Delete {
            node_id: node_id.to_string(),
            delete_children,
        };
        self.apply(raw, dialect, &edit, &HashSet::new())
    }

    pub fn move_node(
        &self,
        raw: &str,
        dialect: Dialect,
        node_id: &str,
        new_parent_id: &str,
        position: InsertPosition,
    ) -> Result<MutationOutcome, MindmapError> {
        let edit = TreeEdit::Move {
            node_id: node_id.to_string(),
            new_parent_id: new_parent_id.to_string(),
            position,
        };
        self.apply(raw, dialect, &edit, &HashSet::new())
    }

    /// Run one structural edit
    ///
    /// `retired` carries ids removed earlier in the document's lifetime so
    /// they are neither accepted nor generated again.
    pub fn apply(
        &self,
        raw: &str,
        dialect: Dialect,
        edit: &TreeEdit,
        retired: &HashSet<String>,
    ) -> Result<MutationOutcome, MindmapError> {
        let mut tree = self.load(raw, dialect)?;
        tree.retire_ids(retired.iter().cloned());

        let mut removed_ids = Vec::new();
        let node_id = match edit {
            TreeEdit::Create(params) => {
                let id = tree.generate_id();
                let mut node = TreeNode::new(id.clone(), params.title.clone());
                if let Some(description) = &params.description {
                    node = node.with_description(description.clone());
                }
                if let Some(tags) = &params.tags {
                    node = node.with_tags(tags.clone());
                }
                if let Some(custom_fields) = &params.custom_fields {
                    node = node.with_custom_fields(custom_fields.clone());
                }
                if self.config.stamp_timestamps {
                    let now = Self::now();
                    node.set_metadata("created", now.clone());
                    node.set_metadata("updated", now);
                }
                tree.insert(&params.parent_id, node, params.position.clone())?;
                id
            }
            TreeEdit::Update { node_id, patch } => {
                tree.update(node_id, patch.clone())?;
                if self.config.stamp_timestamps {
                    if let Some(node) = tree.node_mut(node_id) {
                        node.set_metadata("updated", Self::now());
                    }
                }
                node_id.clone()
            }
            TreeEdit::Delete {
                node_id,
                delete_children,
            } => {
                let removed = tree.remove(node_id, *delete_children)?;
                removed_ids = removed.removed_ids;
                node_id.clone()
            }
            TreeEdit::Move {
                node_id,
                new_parent_id,
                position,
            } => {
                tree.move_node(node_id, new_parent_id, position.clone())?;
                node_id.clone()
            }
        };

        let (text, warnings) = self.commit(&tree, dialect).map_err(|e| {
            tracing::warn!("⚠️  Rejected {} of {}: {}", edit.kind(), node_id, e);
            e
        })?;

        tracing::info!("✅ Applied {} to node {}", edit.kind(), node_id);
        Ok(MutationOutcome {
            text,
            node_id,
            removed_ids,
            warnings,
            tree,
        })
    }

    /// Look a node up with its subtree and position
    pub fn get_node(
        &self,
        raw: &str,
        dialect: Dialect,
        node_id: &str,
    ) -> Result<NodeView, MindmapError> {
        let tree = self.load(raw, dialect)?;
        let node = tree
            .subtree_value(node_id)
            .ok_or_else(|| MindmapError::node_not_found(node_id))?;
        let path = tree
            .path_of(node_id)
            .ok_or_else(|| MindmapError::node_not_found(node_id))?;

        Ok(NodeView {
            node: canonicalize_node(&node),
            parent_id: tree.parent_of(node_id).map(str::to_string),
            depth: path.len() - 1,
            path,
        })
    }

    pub fn search_nodes(
        &self,
        raw: &str,
        dialect: Dialect,
        query: &SearchQuery,
    ) -> Result<Vec<SearchHit>, MindmapError> {
        let tree = self.load(raw, dialect)?;
        let limit = query
            .limit
            .unwrap_or(self.config.default_search_limit)
            .min(self.config.max_search_limit);

        let hits = search_tree(&tree, query, limit);
        tracing::debug!("Search '{}' matched {} node(s)", query.query, hits.len());
        Ok(hits)
    }

    /// Parse and validate without building; never fails
    pub fn validate(&self, raw: &str, dialect: Dialect) -> ValidationReport {
        let doc = match self.codec.parse(raw, dialect) {
            Ok(outcome) => match outcome.into_document() {
                Some(doc) => doc,
                None => {
                    return ValidationReport {
                        valid: true,
                        empty: true,
                        errors: Vec::new(),
                        warnings: Vec::new(),
                        node_count: None,
                    }
                }
            },
            Err(e) => {
                return ValidationReport {
                    valid: false,
                    empty: false,
                    errors: e.diagnostics().to_vec(),
                    warnings: Vec::new(),
                    node_count: None,
                }
            }
        };

        let mut result = self.validator.validate(&doc);
        locate_diagnostics(raw, dialect, &doc, &mut result);
        let node_count = result
            .valid
            .then(|| NodeTree::build(&doc).ok().map(|tree| tree.len()))
            .flatten();

        ValidationReport {
            valid: result.valid,
            empty: false,
            errors: result.errors,
            warnings: result.warnings,
            node_count,
        }
    }
}

fn summarize(errors: &[ParseDiagnostic]) -> String {
    match errors {
        [] => "unknown validation failure".to_string(),
        [only] => only.to_string(),
        [first, rest @ ..] => format!("{} (and {} more)", first, rest.len()),
    }
}

/// Attach line/column to semantic diagnostics by finding the offending
/// node's id in the raw text
pub fn locate_diagnostics(
    raw: &str,
    dialect: Dialect,
    doc: &Value,
    result: &mut ValidationResult,
) {
    for diagnostic in result.diagnostics_mut() {
        if diagnostic.has_position() {
            continue;
        }

        let (node_id, occurrence) = match diagnostic.details.as_ref().and_then(|d| {
            d.get("nodeId").and_then(Value::as_str).map(|id| {
                let occurrence = d.get("occurrence").and_then(Value::as_u64).unwrap_or(0);
                (id.to_string(), occurrence as usize)
            })
        }) {
            Some(found) => found,
            None => match diagnostic
                .path
                .as_deref()
                .and_then(|path| node_at_path(doc, path))
            {
                Some((id, node_path)) => {
                    let occurrence = source_occurrence(doc, id, &node_path).unwrap_or(0);
                    (id.to_string(), occurrence)
                }
                None => continue,
            },
        };

        if let Some(location) = locate_node_occurrence(raw, dialect, &node_id, occurrence) {
            diagnostic.line = Some(location.line);
            diagnostic.column = Some(location.column);
        }
    }
}

/// Id and path of the deepest node named by a diagnostic path such as
/// `root.children[1].customFields.owner`
fn node_at_path<'a>(doc: &'a Value, path: &str) -> Option<(&'a str, String)> {
    let mut segments = path.split('.');
    if segments.next()? != doc_fields::ROOT {
        return None;
    }

    let mut node = doc.get(doc_fields::ROOT)?;
    let mut node_path = ROOT_PATH.to_string();
    let prefix = format!("{}[", node_fields::CHILDREN);
    for segment in segments {
        let Some(index) = segment
            .strip_prefix(&prefix)
            .and_then(|rest| rest.strip_suffix(']'))
            .and_then(|index| index.parse::<usize>().ok())
        else {
            break;
        };
        match node.get(node_fields::CHILDREN).and_then(|c| c.get(index)) {
            Some(child) => {
                node = child;
                node_path = child_path(&node_path, index);
            }
            None => break,
        }
    }

    let id = node.get(node_fields::ID).and_then(Value::as_str)?;
    Some((id, node_path))
}

#[cfg(test)]
#[path = "mutation_engine_test.rs"]
mod mutation_engine_test;
