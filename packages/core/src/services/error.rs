//! Service Layer Error Types
//!
//! The external error taxonomy. Every failure that crosses the mutation
//! engine boundary (tool invocation, editor host) is one of these, with a
//! stable string code and an optional structured `details` payload.

use crate::codec::CodecError;
use crate::models::ParseDiagnostic;
use crate::tree::NodeError;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::io;
use std::path::Path;
use thiserror::Error;

/// Mindmap operation errors
#[derive(Error, Debug, Clone)]
pub enum MindmapError {
    /// Raw text failed dialect parsing
    #[error("Parse error: {message}")]
    Parse {
        message: String,
        diagnostics: Vec<ParseDiagnostic>,
    },

    /// Parsed but structurally or semantically invalid
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        diagnostics: Vec<ParseDiagnostic>,
    },

    /// A referenced node id is absent (or cannot be targeted)
    #[error("{message}")]
    NodeNotFound { id: String, message: String },

    /// An insert would break id uniqueness
    #[error("Duplicate node id: {id}")]
    DuplicateId { id: String },

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("Permission denied: {path}")]
    Permission { path: String },

    #[error("File error for {path}: {message}")]
    File { path: String, message: String },

    /// Anything unexpected, wrapped before it reaches a boundary
    #[error("Internal error: {0}")]
    Internal(String),
}

impl MindmapError {
    pub fn parse(message: impl Into<String>, diagnostics: Vec<ParseDiagnostic>) -> Self {
        Self::Parse {
            message: message.into(),
            diagnostics,
        }
    }

    pub fn validation(message: impl Into<String>, diagnostics: Vec<ParseDiagnostic>) -> Self {
        Self::Validation {
            message: message.into(),
            diagnostics,
        }
    }

    pub fn node_not_found(id: impl Into<String>) -> Self {
        let id = id.into();
        Self::NodeNotFound {
            message: format!("Node not found: {}", id),
            id,
        }
    }

    pub fn duplicate_id(id: impl Into<String>) -> Self {
        Self::DuplicateId { id: id.into() }
    }

    pub fn file_not_found(path: impl Into<String>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    pub fn file(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::File {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Classify an I/O failure on `path`
    pub fn from_io(path: &Path, err: &io::Error) -> Self {
        let path = path.display().to_string();
        match err.kind() {
            io::ErrorKind::NotFound => Self::FileNotFound { path },
            io::ErrorKind::PermissionDenied => Self::Permission { path },
            _ => Self::File {
                path,
                message: err.to_string(),
            },
        }
    }

    /// Stable code used on the wire
    pub fn code(&self) -> &'static str {
        match self {
            Self::Parse { .. } => "PARSE_ERROR",
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::NodeNotFound { .. } => "NODE_NOT_FOUND",
            Self::DuplicateId { .. } => "DUPLICATE_ID",
            Self::FileNotFound { .. } => "FILE_NOT_FOUND",
            Self::Permission { .. } => "PERMISSION_DENIED",
            Self::File { .. } => "FILE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn diagnostics(&self) -> &[ParseDiagnostic] {
        match self {
            Self::Parse { diagnostics, .. } | Self::Validation { diagnostics, .. } => diagnostics,
            _ => &[],
        }
    }

    /// Structured payload for the `details` field
    pub fn details(&self) -> Option<Value> {
        match self {
            Self::Parse { diagnostics, .. } | Self::Validation { diagnostics, .. } => {
                Some(json!({ "diagnostics": diagnostics }))
            }
            Self::NodeNotFound { id, .. } | Self::DuplicateId { id } => {
                Some(json!({ "nodeId": id }))
            }
            Self::FileNotFound { path } | Self::Permission { path } | Self::File { path, .. } => {
                Some(json!({ "filePath": path }))
            }
            Self::Internal(_) => None,
        }
    }

    pub fn to_tool_error(&self) -> ToolError {
        ToolError {
            code: self.code().to_string(),
            message: self.to_string(),
            details: self.details(),
        }
    }
}

impl From<CodecError> for MindmapError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::Parse { .. } => {
                let message = err.to_string();
                let diagnostics = err.diagnostics().to_vec();
                Self::Parse {
                    message,
                    diagnostics,
                }
            }
            CodecError::Serialize(message) => Self::Internal(message),
        }
    }
}

impl From<NodeError> for MindmapError {
    fn from(err: NodeError) -> Self {
        match err {
            NodeError::NodeNotFound { id } => Self::node_not_found(id),
            NodeError::DuplicateId { id } | NodeError::RetiredId { id } => Self::DuplicateId { id },
            NodeError::RootNotRemovable { id } => Self::NodeNotFound {
                message: format!("Node '{}' is the root and cannot be deleted", id),
                id,
            },
            other @ (NodeError::IdImmutable { .. }
            | NodeError::CycleDetected { .. }
            | NodeError::InvalidPosition { .. }
            | NodeError::Malformed { .. }) => {
                let message = other.to_string();
                Self::Validation {
                    diagnostics: vec![ParseDiagnostic::error(message.clone())],
                    message,
                }
            }
        }
    }
}

/// Wire shape of a failed operation: `{code, message, details?}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolError {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl From<&MindmapError> for ToolError {
    fn from(err: &MindmapError) -> Self {
        err.to_tool_error()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(MindmapError::node_not_found("x").code(), "NODE_NOT_FOUND");
        assert_eq!(MindmapError::duplicate_id("x").code(), "DUPLICATE_ID");
        assert_eq!(MindmapError::internal("boom").code(), "INTERNAL_ERROR");
        assert_eq!(
            MindmapError::validation("bad", vec![]).code(),
            "VALIDATION_ERROR"
        );
    }

    #[test]
    fn test_node_error_mapping() {
        let root: MindmapError = NodeError::root_not_removable("root").into();
        assert_eq!(root.code(), "NODE_NOT_FOUND");
        assert!(root.to_string().contains("root"));

        let retired: MindmapError = NodeError::retired_id("gone").into();
        assert_eq!(retired.code(), "DUPLICATE_ID");

        let cycle: MindmapError = NodeError::cycle_detected("a", "b").into();
        assert_eq!(cycle.code(), "VALIDATION_ERROR");
        assert_eq!(cycle.diagnostics().len(), 1);
    }

    #[test]
    fn test_io_classification() {
        let path = Path::new("/tmp/map.yaml");
        let missing = io::Error::new(io::ErrorKind::NotFound, "nope");
        let denied = io::Error::new(io::ErrorKind::PermissionDenied, "nope");
        let other = io::Error::new(io::ErrorKind::Other, "disk on fire");

        assert_eq!(MindmapError::from_io(path, &missing).code(), "FILE_NOT_FOUND");
        assert_eq!(MindmapError::from_io(path, &denied).code(), "PERMISSION_DENIED");
        let file = MindmapError::from_io(path, &other);
        assert_eq!(file.code(), "FILE_ERROR");
        assert!(file.to_string().contains("disk on fire"));
    }

    #[test]
    fn test_tool_error_shape() {
        let tool = MindmapError::node_not_found("n1").to_tool_error();
        let value = serde_json::to_value(&tool).unwrap();
        assert_eq!(value["code"], "NODE_NOT_FOUND");
        assert_eq!(value["details"]["nodeId"], "n1");

        let internal = serde_json::to_value(MindmapError::internal("x").to_tool_error()).unwrap();
        assert!(internal.get("details").is_none());
    }
}
