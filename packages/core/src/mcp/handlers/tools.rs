//! MCP Tools Handler
//!
//! Implements MCP-compliant tools/list and tools/call methods.
//!
//! Tool failures (the document could not be read, parsed, validated or
//! mutated) come back as a successful JSON-RPC response whose content holds
//! the structured `{code, message, details?}` error and `isError: true`.
//! Malformed calls (unknown tool, bad arguments) are JSON-RPC errors.

use crate::mcp::handlers::{documents, nodes, search};
use crate::mcp::types::MCPError;
use crate::services::MutationEngine;
use serde_json::{json, Value};
use std::sync::Arc;

/// Every tool this server exposes, in tools/list order
pub const TOOL_NAMES: &[&str] = &[
    "create_node",
    "get_node",
    "update_node",
    "delete_node",
    "move_node",
    "search_nodes",
    "validate_mindmap",
];

/// Run a tool by name; `None` if no such tool exists
pub async fn dispatch_tool(
    engine: &Arc<MutationEngine>,
    name: &str,
    arguments: Value,
) -> Option<Result<Value, MCPError>> {
    let result = match name {
        "create_node" => nodes::handle_create_node(engine, arguments).await,
        "get_node" => nodes::handle_get_node(engine, arguments).await,
        "update_node" => nodes::handle_update_node(engine, arguments).await,
        "delete_node" => nodes::handle_delete_node(engine, arguments).await,
        "move_node" => nodes::handle_move_node(engine, arguments).await,
        "search_nodes" => search::handle_search_nodes(engine, arguments).await,
        "validate_mindmap" => documents::handle_validate_mindmap(engine, arguments).await,
        _ => return None,
    };
    Some(result)
}

/// Handle tools/list MCP request
pub fn handle_tools_list(_params: Value) -> Result<Value, MCPError> {
    Ok(json!({
        "tools": get_tool_schemas()
    }))
}

/// Handle tools/call MCP request
///
/// Request format:
/// ```json
/// {
///   "name": "tool_name",
///   "arguments": { ... }
/// }
/// ```
///
/// Response format:
/// ```json
/// {
///   "content": [{ "type": "text", "text": "..." }],
///   "isError": false
/// }
/// ```
pub async fn handle_tools_call(
    engine: &Arc<MutationEngine>,
    params: Value,
) -> Result<Value, MCPError> {
    let tool_name = params["name"]
        .as_str()
        .ok_or_else(|| MCPError::invalid_params("Missing 'name' parameter".to_string()))?;

    let arguments = params.get("arguments").cloned().unwrap_or(json!({}));

    let result = dispatch_tool(engine, tool_name, arguments)
        .await
        .ok_or_else(|| MCPError::invalid_params(format!("Unknown tool: {}", tool_name)))?;

    match result {
        Ok(data) => {
            let text = serde_json::to_string_pretty(&data).map_err(|e| {
                MCPError::internal_error(format!("JSON serialization failed: {}", e))
            })?;

            Ok(json!({
                "content": [{
                    "type": "text",
                    "text": text
                }],
                "isError": false
            }))
        }
        Err(e) if e.is_tool_failure() => {
            let payload = e.data.unwrap_or(Value::Null);
            let text = serde_json::to_string_pretty(&payload).map_err(|e| {
                MCPError::internal_error(format!("JSON serialization failed: {}", e))
            })?;

            Ok(json!({
                "content": [{
                    "type": "text",
                    "text": text
                }],
                "isError": true
            }))
        }
        Err(e) => Err(e),
    }
}

fn position_schema() -> Value {
    json!({
        "type": "object",
        "description": "Where to place the node among its siblings. Defaults to append.",
        "properties": {
            "kind": {
                "type": "string",
                "enum": ["append", "first", "index", "before", "after"]
            },
            "target": {
                "description": "Index for 'index', sibling node id for 'before'/'after'"
            }
        },
        "required": ["kind"]
    })
}

fn file_path_schema() -> Value {
    json!({
        "type": "string",
        "description": "Path to the mindmap document (.json, .yaml, .yml or .mindmap)"
    })
}

/// JSON schemas for all available MCP tools
fn get_tool_schemas() -> Value {
    json!([
        {
            "name": "create_node",
            "description": "Create a node under an existing parent. The id is generated by the server.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "filePath": file_path_schema(),
                    "parentId": { "type": "string", "description": "Id of the parent node" },
                    "title": { "type": "string", "description": "Non-empty node title" },
                    "description": { "type": "string" },
                    "customFields": {
                        "type": "object",
                        "description": "Values checked against the document's schema, if it has one"
                    },
                    "tags": { "type": "array", "items": { "type": "string" } },
                    "position": position_schema()
                },
                "required": ["filePath", "parentId", "title"]
            }
        },
        {
            "name": "get_node",
            "description": "Retrieve a node with its subtree, ancestor path and depth",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "filePath": file_path_schema(),
                    "nodeId": { "type": "string" }
                },
                "required": ["filePath", "nodeId"]
            }
        },
        {
            "name": "update_node",
            "description": "Update a node's title, description, tags or custom fields. Ids cannot change.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "filePath": file_path_schema(),
                    "nodeId": { "type": "string" },
                    "title": { "type": "string" },
                    "description": {
                        "type": ["string", "null"],
                        "description": "null removes the description"
                    },
                    "tags": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Replaces the tag list"
                    },
                    "customFields": {
                        "type": "object",
                        "description": "Merged into existing fields; null values remove a field"
                    }
                },
                "required": ["filePath", "nodeId"]
            }
        },
        {
            "name": "delete_node",
            "description": "Delete a node. Without deleteChildren its children take its place in the parent.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "filePath": file_path_schema(),
                    "nodeId": { "type": "string" },
                    "deleteChildren": { "type": "boolean", "default": false }
                },
                "required": ["filePath", "nodeId"]
            }
        },
        {
            "name": "move_node",
            "description": "Move a node (with its subtree) under a new parent",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "filePath": file_path_schema(),
                    "nodeId": { "type": "string" },
                    "newParentId": { "type": "string" },
                    "position": position_schema()
                },
                "required": ["filePath", "nodeId", "newParentId"]
            }
        },
        {
            "name": "search_nodes",
            "description": "Case-insensitive search over titles and descriptions, best matches first",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "filePath": file_path_schema(),
                    "query": { "type": "string" },
                    "filters": {
                        "type": "object",
                        "properties": {
                            "tags": {
                                "type": "array",
                                "items": { "type": "string" },
                                "description": "Node must have all of these tags"
                            },
                            "customFields": {
                                "type": "object",
                                "description": "Every pair must match exactly"
                            },
                            "maxDepth": {
                                "type": "integer",
                                "minimum": 0,
                                "description": "Deepest level to include; the root is 0"
                            }
                        }
                    },
                    "limit": { "type": "integer", "minimum": 1 }
                },
                "required": ["filePath"]
            }
        },
        {
            "name": "validate_mindmap",
            "description": "Check a document and report errors and warnings with line/column positions",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "filePath": file_path_schema()
                },
                "required": ["filePath"]
            }
        }
    ])
}

#[cfg(test)]
#[path = "tools_test.rs"]
mod tools_test;
