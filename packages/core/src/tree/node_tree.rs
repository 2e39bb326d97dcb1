//! Arena-backed node tree
//!
//! Nodes live in a flat map keyed by id; each record holds the ordered ids of
//! its children. The tree keeps every field it does not model (on nodes and
//! on the document itself) so that `to_document` is lossless.
//!
//! # Example
//!
//! ```rust
//! use mindmap_core::tree::{InsertPosition, NodeTree, TreeNode};
//! use serde_json::json;
//!
//! let mut tree = NodeTree::build(&json!({
//!     "root": {"id": "root", "title": "Root", "children": []}
//! })).unwrap();
//!
//! tree.insert("root", TreeNode::new("n1", "Child"), InsertPosition::Append).unwrap();
//! assert_eq!(tree.depth_of("n1"), Some(1));
//! ```

use super::NodeError;
use crate::models::document::{child_path, doc_fields, node_fields, ROOT_PATH};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};

/// Where a node goes among its new siblings
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "target", rename_all = "camelCase")]
pub enum InsertPosition {
    /// After the last child
    #[default]
    Append,
    /// Before the first child
    First,
    /// At a 0-based index; `len` is allowed and means append
    Index(usize),
    /// Immediately before an existing sibling
    Before(String),
    /// Immediately after an existing sibling
    After(String),
}

/// One node record in the arena
#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    id: String,
    title: String,
    children: Vec<String>,
    /// Whether the node carried a `children` key; keeps leaf nodes lossless
    has_children_key: bool,
    /// Every other field, including ones the tree does not understand
    fields: Map<String, Value>,
}

impl TreeNode {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            children: Vec::new(),
            has_children_key: true,
            fields: Map::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.set_description(Some(description.into()));
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.set_tags(tags);
        self
    }

    pub fn with_custom_fields(mut self, custom_fields: Map<String, Value>) -> Self {
        self.fields.insert(
            node_fields::CUSTOM_FIELDS.to_string(),
            Value::Object(custom_fields),
        );
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn children(&self) -> &[String] {
        &self.children
    }

    pub fn description(&self) -> Option<&str> {
        self.fields
            .get(node_fields::DESCRIPTION)
            .and_then(Value::as_str)
    }

    pub fn tags(&self) -> Vec<&str> {
        self.fields
            .get(node_fields::TAGS)
            .and_then(Value::as_array)
            .map(|tags| tags.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    pub fn custom_fields(&self) -> Option<&Map<String, Value>> {
        self.fields
            .get(node_fields::CUSTOM_FIELDS)
            .and_then(Value::as_object)
    }

    pub fn metadata(&self) -> Option<&Map<String, Value>> {
        self.fields
            .get(node_fields::METADATA)
            .and_then(Value::as_object)
    }

    /// Any field other than id, title and children
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    /// `None` removes the description
    pub fn set_description(&mut self, description: Option<String>) {
        match description {
            Some(text) => {
                self.fields
                    .insert(node_fields::DESCRIPTION.to_string(), Value::String(text));
            }
            None => {
                self.fields.remove(node_fields::DESCRIPTION);
            }
        }
    }

    pub fn set_tags(&mut self, tags: Vec<String>) {
        self.fields.insert(
            node_fields::TAGS.to_string(),
            Value::Array(tags.into_iter().map(Value::String).collect()),
        );
    }

    /// Merge entries into `customFields`; a `null` value removes the key
    pub fn merge_custom_fields(&mut self, patch: Map<String, Value>) {
        let entry = self
            .fields
            .entry(node_fields::CUSTOM_FIELDS.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        if let Value::Object(fields) = entry {
            for (key, value) in patch {
                if value.is_null() {
                    fields.remove(&key);
                } else {
                    fields.insert(key, value);
                }
            }
        }
    }

    /// Set one key of the node's `metadata` object, creating it when absent
    pub fn set_metadata(&mut self, key: &str, value: Value) {
        let entry = self
            .fields
            .entry(node_fields::METADATA.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        if let Value::Object(metadata) = entry {
            metadata.insert(key.to_string(), value);
        }
    }
}

/// Field changes for [`NodeTree::update`]
///
/// `id` exists only so that attempts to change identity are rejected
/// explicitly instead of being silently ignored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodePatch {
    pub id: Option<String>,
    pub title: Option<String>,
    /// `Some(None)` clears the description
    pub description: Option<Option<String>>,
    /// Replaces the tag list
    pub tags: Option<Vec<String>>,
    /// Merged into existing custom fields; `null` values remove keys
    pub custom_fields: Option<Map<String, Value>>,
}

impl NodePatch {
    pub fn is_empty(&self) -> bool {
        self.id.is_none()
            && self.title.is_none()
            && self.description.is_none()
            && self.tags.is_none()
            && self.custom_fields.is_none()
    }
}

/// What [`NodeTree::remove`] took out of the tree
#[derive(Debug, Clone, PartialEq)]
pub struct RemovedSubtree {
    pub id: String,
    pub parent_id: String,
    /// Former index among the parent's children
    pub index: usize,
    /// The removed node as a document object (with its subtree when cascading)
    pub node: Value,
    /// Every id that left the tree, pre-order
    pub removed_ids: Vec<String>,
}

/// Mutable tree of identity-bearing nodes
#[derive(Debug, Clone, PartialEq)]
pub struct NodeTree {
    /// Document fields other than `root`
    header: Map<String, Value>,
    root_id: String,
    nodes: HashMap<String, TreeNode>,
    /// Ids removed during this tree's lifetime; never handed out again
    retired: HashSet<String>,
}

impl NodeTree {
    /// Build a tree from a document object
    ///
    /// Assumes the document passed validation; still refuses input that
    /// cannot form a tree (missing root, non-string ids, duplicate ids).
    pub fn build(doc: &Value) -> Result<Self, NodeError> {
        let map = doc
            .as_object()
            .ok_or_else(|| NodeError::malformed("", "document must be an object"))?;
        let root = map
            .get(doc_fields::ROOT)
            .ok_or_else(|| NodeError::malformed(ROOT_PATH, "document has no root node"))?;

        let mut header = map.clone();
        header.remove(doc_fields::ROOT);

        let mut nodes = HashMap::new();
        let root_id = Self::collect(root, ROOT_PATH.to_string(), &mut nodes)?;

        Ok(Self {
            header,
            root_id,
            nodes,
            retired: HashSet::new(),
        })
    }

    fn collect(
        value: &Value,
        path: String,
        nodes: &mut HashMap<String, TreeNode>,
    ) -> Result<String, NodeError> {
        let map = value
            .as_object()
            .ok_or_else(|| NodeError::malformed(&path, "node must be an object"))?;

        let id = match map.get(node_fields::ID) {
            Some(Value::String(id)) if !id.is_empty() => id.clone(),
            _ => return Err(NodeError::malformed(&path, "node needs a non-empty string id")),
        };
        if nodes.contains_key(&id) {
            return Err(NodeError::duplicate_id(id));
        }

        let title = map
            .get(node_fields::TITLE)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let mut fields = map.clone();
        fields.remove(node_fields::ID);
        fields.remove(node_fields::TITLE);

        let has_children_key = fields.contains_key(node_fields::CHILDREN);
        let child_values = match fields.remove(node_fields::CHILDREN) {
            None => Vec::new(),
            Some(Value::Array(children)) => children,
            Some(_) => {
                return Err(NodeError::malformed(&path, "children must be an array"));
            }
        };

        // Reserve the id before descending so a descendant reusing it is caught
        nodes.insert(id.clone(), TreeNode::new(id.clone(), title.clone()));

        let mut children = Vec::with_capacity(child_values.len());
        for (i, child) in child_values.iter().enumerate() {
            children.push(Self::collect(child, child_path(&path, i), nodes)?);
        }

        nodes.insert(
            id.clone(),
            TreeNode {
                id: id.clone(),
                title,
                children,
                has_children_key,
                fields,
            },
        );
        Ok(id)
    }

    /// Inverse of [`build`](Self::build)
    pub fn to_document(&self) -> Value {
        let mut doc = self.header.clone();
        doc.insert(doc_fields::ROOT.to_string(), self.node_to_value(&self.root_id));
        Value::Object(doc)
    }

    /// The subtree rooted at `id` as a document object
    pub fn subtree_value(&self, id: &str) -> Option<Value> {
        self.nodes.contains_key(id).then(|| self.node_to_value(id))
    }

    fn node_to_value(&self, id: &str) -> Value {
        let Some(node) = self.nodes.get(id) else {
            return Value::Null;
        };

        let mut map = Map::new();
        map.insert(node_fields::ID.to_string(), Value::String(node.id.clone()));
        map.insert(
            node_fields::TITLE.to_string(),
            Value::String(node.title.clone()),
        );
        for (key, value) in &node.fields {
            map.insert(key.clone(), value.clone());
        }
        if node.has_children_key || !node.children.is_empty() {
            map.insert(
                node_fields::CHILDREN.to_string(),
                Value::Array(
                    node.children
                        .iter()
                        .map(|child| self.node_to_value(child))
                        .collect(),
                ),
            );
        }
        Value::Object(map)
    }

    pub fn root_id(&self) -> &str {
        &self.root_id
    }

    pub fn root(&self) -> Option<&TreeNode> {
        self.nodes.get(&self.root_id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn find_by_id(&self, id: &str) -> Option<&TreeNode> {
        self.nodes.get(id)
    }

    /// Mutable access for field edits; structure is only changed through the
    /// tree's own operations
    pub fn node_mut(&mut self, id: &str) -> Option<&mut TreeNode> {
        self.nodes.get_mut(id)
    }

    pub fn parent_of(&self, id: &str) -> Option<&str> {
        self.nodes
            .values()
            .find(|node| node.children.iter().any(|child| child == id))
            .map(|node| node.id.as_str())
    }

    /// Ids from the root down to `id`, inclusive
    pub fn path_of(&self, id: &str) -> Option<Vec<String>> {
        if !self.nodes.contains_key(id) {
            return None;
        }
        let mut path = vec![id.to_string()];
        let mut current = id;
        while let Some(parent) = self.parent_of(current) {
            path.push(parent.to_string());
            current = parent;
        }
        path.reverse();
        Some(path)
    }

    /// Distance from the root; the root is depth 0
    pub fn depth_of(&self, id: &str) -> Option<usize> {
        self.path_of(id).map(|path| path.len() - 1)
    }

    /// Depth-first pre-order listing of `(depth, node)`
    pub fn preorder(&self) -> Vec<(usize, &TreeNode)> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![(0usize, self.root_id.as_str())];
        while let Some((depth, id)) = stack.pop() {
            let Some(node) = self.nodes.get(id) else {
                continue;
            };
            out.push((depth, node));
            for child in node.children.iter().rev() {
                stack.push((depth + 1, child.as_str()));
            }
        }
        out
    }

    fn is_in_subtree(&self, ancestor: &str, id: &str) -> bool {
        let mut stack = vec![ancestor];
        while let Some(current) = stack.pop() {
            if current == id {
                return true;
            }
            if let Some(node) = self.nodes.get(current) {
                stack.extend(node.children.iter().map(String::as_str));
            }
        }
        false
    }

    pub fn is_retired(&self, id: &str) -> bool {
        self.retired.contains(id)
    }

    pub fn retired(&self) -> &HashSet<String> {
        &self.retired
    }

    /// Carry retired ids over from an earlier tree of the same document
    pub fn retire_ids<I, S>(&mut self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for id in ids {
            let id = id.into();
            if !self.nodes.contains_key(&id) {
                self.retired.insert(id);
            }
        }
    }

    /// Fresh id that collides with neither a live nor a retired node
    pub fn generate_id(&self) -> String {
        loop {
            let candidate = format!("node-{}", uuid::Uuid::new_v4().simple());
            if !self.nodes.contains_key(&candidate) && !self.retired.contains(&candidate) {
                return candidate;
            }
        }
    }

    fn resolve_position(
        parent: &TreeNode,
        position: &InsertPosition,
    ) -> Result<usize, NodeError> {
        let siblings = &parent.children;
        let sibling_index = |sibling: &str| {
            siblings.iter().position(|s| s == sibling).ok_or_else(|| {
                NodeError::invalid_position(
                    &parent.id,
                    format!("'{}' is not a child of '{}'", sibling, parent.id),
                )
            })
        };

        match position {
            InsertPosition::Append => Ok(siblings.len()),
            InsertPosition::First => Ok(0),
            InsertPosition::Index(index) if *index <= siblings.len() => Ok(*index),
            InsertPosition::Index(index) => Err(NodeError::invalid_position(
                &parent.id,
                format!("index {} is past the end ({} children)", index, siblings.len()),
            )),
            InsertPosition::Before(sibling) => sibling_index(sibling),
            InsertPosition::After(sibling) => sibling_index(sibling).map(|i| i + 1),
        }
    }

    /// Insert a new leaf node under `parent_id`
    pub fn insert(
        &mut self,
        parent_id: &str,
        node: TreeNode,
        position: InsertPosition,
    ) -> Result<(), NodeError> {
        if node.id.is_empty() {
            return Err(NodeError::malformed(parent_id, "node id must not be empty"));
        }
        if !node.children.is_empty() {
            return Err(NodeError::malformed(
                &node.id,
                "only leaf nodes can be inserted",
            ));
        }
        if self.nodes.contains_key(&node.id) {
            return Err(NodeError::duplicate_id(&node.id));
        }
        if self.retired.contains(&node.id) {
            return Err(NodeError::retired_id(&node.id));
        }

        let parent = self
            .nodes
            .get(parent_id)
            .ok_or_else(|| NodeError::node_not_found(parent_id))?;
        let index = Self::resolve_position(parent, &position)?;

        let id = node.id.clone();
        self.nodes.insert(id.clone(), node);
        if let Some(parent) = self.nodes.get_mut(parent_id) {
            parent.children.insert(index, id.clone());
            parent.has_children_key = true;
        }

        tracing::debug!("Inserted node {} under {} at {}", id, parent_id, index);
        Ok(())
    }

    /// Remove a node
    ///
    /// With `cascade` the whole subtree goes; without it the node's children
    /// are promoted into its place under the former parent, keeping order.
    pub fn remove(&mut self, id: &str, cascade: bool) -> Result<RemovedSubtree, NodeError> {
        if id == self.root_id {
            return Err(NodeError::root_not_removable(id));
        }
        if !self.nodes.contains_key(id) {
            return Err(NodeError::node_not_found(id));
        }
        let parent_id = self
            .parent_of(id)
            .map(str::to_string)
            .ok_or_else(|| NodeError::node_not_found(id))?;

        let node_value = if cascade {
            self.node_to_value(id)
        } else {
            let mut value = self.node_to_value(id);
            if let Some(map) = value.as_object_mut() {
                map.insert(node_fields::CHILDREN.to_string(), Value::Array(Vec::new()));
            }
            value
        };

        let removed_ids: Vec<String> = if cascade {
            self.subtree_ids(id)
        } else {
            vec![id.to_string()]
        };

        let promoted = if cascade {
            Vec::new()
        } else {
            self.nodes
                .get(id)
                .map(|node| node.children.clone())
                .unwrap_or_default()
        };

        let mut index = 0;
        if let Some(parent) = self.nodes.get_mut(&parent_id) {
            index = parent
                .children
                .iter()
                .position(|child| child == id)
                .unwrap_or(parent.children.len());
            parent.children.remove(index);
            for (offset, child) in promoted.into_iter().enumerate() {
                parent.children.insert(index + offset, child);
            }
        }

        for removed in &removed_ids {
            self.nodes.remove(removed);
            self.retired.insert(removed.clone());
        }

        tracing::debug!(
            "Removed {} node(s) starting at {} (cascade: {})",
            removed_ids.len(),
            id,
            cascade
        );

        Ok(RemovedSubtree {
            id: id.to_string(),
            parent_id,
            index,
            node: node_value,
            removed_ids,
        })
    }

    fn subtree_ids(&self, id: &str) -> Vec<String> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            out.push(current.to_string());
            if let Some(node) = self.nodes.get(current) {
                stack.extend(node.children.iter().rev().map(String::as_str));
            }
        }
        out
    }

    /// Apply a field patch to a node
    pub fn update(&mut self, id: &str, patch: NodePatch) -> Result<(), NodeError> {
        let node = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| NodeError::node_not_found(id))?;

        if let Some(requested) = &patch.id {
            if requested != id {
                return Err(NodeError::id_immutable(id, requested));
            }
        }

        if let Some(title) = patch.title {
            node.set_title(title);
        }
        if let Some(description) = patch.description {
            node.set_description(description);
        }
        if let Some(tags) = patch.tags {
            node.set_tags(tags);
        }
        if let Some(custom_fields) = patch.custom_fields {
            node.merge_custom_fields(custom_fields);
        }
        Ok(())
    }

    /// Re-parent a node (with its subtree)
    pub fn move_node(
        &mut self,
        id: &str,
        new_parent_id: &str,
        position: InsertPosition,
    ) -> Result<(), NodeError> {
        if !self.nodes.contains_key(id) {
            return Err(NodeError::node_not_found(id));
        }
        if !self.nodes.contains_key(new_parent_id) {
            return Err(NodeError::node_not_found(new_parent_id));
        }
        if self.is_in_subtree(id, new_parent_id) {
            return Err(NodeError::cycle_detected(id, new_parent_id));
        }
        match &position {
            InsertPosition::Before(sibling) | InsertPosition::After(sibling) if sibling == id => {
                return Err(NodeError::invalid_position(
                    new_parent_id,
                    "a node cannot be positioned relative to itself",
                ));
            }
            _ => {}
        }

        let old_parent_id = self
            .parent_of(id)
            .map(str::to_string)
            .ok_or_else(|| NodeError::node_not_found(id))?;

        // Resolve against the sibling list as it looks once the node is gone
        let mut target = self
            .nodes
            .get(new_parent_id)
            .cloned()
            .ok_or_else(|| NodeError::node_not_found(new_parent_id))?;
        target.children.retain(|child| child != id);
        let index = Self::resolve_position(&target, &position)?;

        if let Some(old_parent) = self.nodes.get_mut(&old_parent_id) {
            old_parent.children.retain(|child| child != id);
        }
        if let Some(new_parent) = self.nodes.get_mut(new_parent_id) {
            new_parent.children.insert(index, id.to_string());
            new_parent.has_children_key = true;
        }

        tracing::debug!(
            "Moved node {} from {} to {} at {}",
            id,
            old_parent_id,
            new_parent_id,
            index
        );
        Ok(())
    }
}

#[cfg(test)]
#[path = "node_tree_test.rs"]
mod node_tree_test;
