//! Error types for NodeTree operations
//!
//! Structural rule violations raised by the in-memory tree. These are mapped
//! onto the external error taxonomy by the mutation engine.

use thiserror::Error;

/// Errors that can occur while building or mutating a [`NodeTree`](super::NodeTree)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NodeError {
    /// Referenced node does not exist
    #[error("Node '{id}' not found")]
    NodeNotFound { id: String },

    /// Inserting would give two nodes the same id
    #[error("Node id '{id}' already exists in the tree")]
    DuplicateId { id: String },

    /// The id belonged to a node removed earlier; ids are never reused
    #[error("Node id '{id}' was used by a removed node and cannot be reused")]
    RetiredId { id: String },

    /// A document must always retain its root
    #[error("Root node '{id}' cannot be removed")]
    RootNotRemovable { id: String },

    /// Node ids are immutable after creation
    #[error("Node id '{id}' is immutable and cannot be changed to '{requested}'")]
    IdImmutable { id: String, requested: String },

    /// Re-parenting would make a node its own ancestor
    #[error("Moving node '{id}' under '{new_parent_id}' would create a cycle")]
    CycleDetected { id: String, new_parent_id: String },

    /// Insert position does not resolve within the parent's children
    #[error("Invalid position under '{parent_id}': {reason}")]
    InvalidPosition { parent_id: String, reason: String },

    /// Input could not be interpreted as a node tree
    #[error("Malformed node at {path}: {reason}")]
    Malformed { path: String, reason: String },
}

impl NodeError {
    pub fn node_not_found(id: impl Into<String>) -> Self {
        Self::NodeNotFound { id: id.into() }
    }

    pub fn duplicate_id(id: impl Into<String>) -> Self {
        Self::DuplicateId { id: id.into() }
    }

    pub fn retired_id(id: impl Into<String>) -> Self {
        Self::RetiredId { id: id.into() }
    }

    pub fn root_not_removable(id: impl Into<String>) -> Self {
        Self::RootNotRemovable { id: id.into() }
    }

    pub fn id_immutable(id: impl Into<String>, requested: impl Into<String>) -> Self {
        Self::IdImmutable {
            id: id.into(),
            requested: requested.into(),
        }
    }

    pub fn cycle_detected(id: impl Into<String>, new_parent_id: impl Into<String>) -> Self {
        Self::CycleDetected {
            id: id.into(),
            new_parent_id: new_parent_id.into(),
        }
    }

    pub fn invalid_position(parent_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPosition {
            parent_id: parent_id.into(),
            reason: reason.into(),
        }
    }

    pub fn malformed(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Malformed {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
