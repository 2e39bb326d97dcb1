//! MCP JSON-RPC 2.0 Types
//!
//! Type definitions for Model Context Protocol communication.
//! Implements JSON-RPC 2.0 specification for stdio-based MCP transport.

use crate::services::MindmapError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// JSON-RPC 2.0 request structure
///
/// A request without an `id` is a notification and gets no response.
///
/// # Example
///
/// ```json
/// {
///     "jsonrpc": "2.0",
///     "id": 7,
///     "method": "tools/call",
///     "params": {
///         "name": "create_node",
///         "arguments": { "filePath": "plan.yaml", "parentId": "root", "title": "Child" }
///     }
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct MCPRequest {
    /// JSON-RPC version (must be "2.0")
    pub jsonrpc: String,

    /// Request identifier (used to match responses)
    #[serde(default)]
    pub id: Option<u64>,

    /// Method name to invoke
    pub method: String,

    /// Method parameters as JSON value
    #[serde(default)]
    pub params: Value,
}

impl MCPRequest {
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// JSON-RPC 2.0 response structure
#[derive(Debug, Serialize, Deserialize)]
pub struct MCPResponse {
    /// JSON-RPC version (always "2.0")
    pub jsonrpc: String,

    /// Request identifier (matches request)
    pub id: u64,

    /// Success result (mutually exclusive with error)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,

    /// Error information (mutually exclusive with result)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<MCPError>,
}

/// JSON-RPC 2.0 error structure
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct MCPError {
    /// Error code (standard JSON-RPC or mindmap-specific)
    pub code: i32,

    /// Human-readable error message
    pub message: String,

    /// Structured document error (`{code, message, details?}`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

// JSON-RPC 2.0 standard error codes
pub const PARSE_ERROR: i32 = -32700;
pub const INVALID_REQUEST: i32 = -32600;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;
pub const INTERNAL_ERROR: i32 = -32603;

// Mindmap application errors (-32000 to -32099)
pub const NODE_NOT_FOUND: i32 = -32000;
pub const DOCUMENT_PARSE_ERROR: i32 = -32001;
pub const VALIDATION_ERROR: i32 = -32002;
pub const DUPLICATE_ID: i32 = -32003;
pub const FILE_ERROR: i32 = -32004;

impl MCPError {
    fn new(code: i32, message: String) -> Self {
        Self {
            code,
            message,
            data: None,
        }
    }

    /// Create a parse error
    pub fn parse_error(message: String) -> Self {
        Self::new(PARSE_ERROR, message)
    }

    /// Create an invalid request error
    pub fn invalid_request(message: String) -> Self {
        Self::new(INVALID_REQUEST, message)
    }

    /// Create a method not found error
    pub fn method_not_found(method: &str) -> Self {
        Self::new(METHOD_NOT_FOUND, format!("Method not found: {}", method))
    }

    /// Create an invalid params error
    pub fn invalid_params(message: String) -> Self {
        Self::new(INVALID_PARAMS, message)
    }

    /// Create an internal error
    pub fn internal_error(message: String) -> Self {
        Self::new(INTERNAL_ERROR, message)
    }

    /// Whether this error carries a structured tool failure
    pub fn is_tool_failure(&self) -> bool {
        self.data.is_some()
    }
}

impl From<MindmapError> for MCPError {
    fn from(err: MindmapError) -> Self {
        let code = match &err {
            MindmapError::NodeNotFound { .. } => NODE_NOT_FOUND,
            MindmapError::Parse { .. } => DOCUMENT_PARSE_ERROR,
            MindmapError::Validation { .. } => VALIDATION_ERROR,
            MindmapError::DuplicateId { .. } => DUPLICATE_ID,
            MindmapError::FileNotFound { .. }
            | MindmapError::Permission { .. }
            | MindmapError::File { .. } => FILE_ERROR,
            MindmapError::Internal(_) => INTERNAL_ERROR,
        };
        Self {
            code,
            message: err.to_string(),
            data: serde_json::to_value(err.to_tool_error()).ok(),
        }
    }
}

impl MCPResponse {
    /// Create a success response
    pub fn success(id: u64, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response
    pub fn error(id: u64, error: MCPError) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }
}

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;
