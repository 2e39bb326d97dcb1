//! MCP Node Handlers
//!
//! Wraps the MutationEngine node operations for MCP protocol access.
//! Mutating handlers write the document back only when the engine accepted
//! the edit; on any failure the file is left untouched.

use super::documents::{load_document, parse_params, store_document, LoadedDocument};
use crate::mcp::types::MCPError;
use crate::services::{CreateNodeParams as EngineCreateParams, MutationEngine, MutationOutcome};
use crate::tree::{InsertPosition, NodePatch};
use serde::{Deserialize, Deserializer};
use serde_json::{json, Map, Value};
use std::sync::Arc;

/// Parameters for create_node method
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNodeParams {
    pub file_path: String,
    pub parent_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub custom_fields: Option<Map<String, Value>>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub position: InsertPosition,
}

/// Parameters for get_node method
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetNodeParams {
    pub file_path: String,
    pub node_id: String,
}

/// Parameters for update_node method
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateNodeParams {
    pub file_path: String,
    pub node_id: String,
    #[serde(default)]
    pub title: Option<String>,
    /// Absent leaves it alone, `null` clears it
    #[serde(default, deserialize_with = "present_or_null")]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub custom_fields: Option<Map<String, Value>>,
    /// Rejected if it differs from `nodeId`; ids are immutable
    #[serde(default)]
    pub id: Option<String>,
}

/// Parameters for delete_node method
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteNodeParams {
    pub file_path: String,
    pub node_id: String,
    #[serde(default)]
    pub delete_children: bool,
}

/// Parameters for move_node method
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveNodeParams {
    pub file_path: String,
    pub node_id: String,
    pub new_parent_id: String,
    #[serde(default)]
    pub position: InsertPosition,
}

fn present_or_null<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

/// Persist a successful mutation and describe it
async fn commit(document: &LoadedDocument, outcome: MutationOutcome) -> Result<Value, MCPError> {
    store_document(document, &outcome.text).await?;

    Ok(json!({
        "success": true,
        "filePath": document.display_path(),
        "nodeId": outcome.node_id,
        "removedIds": outcome.removed_ids,
        "warnings": outcome.warnings,
        "content": outcome.text,
    }))
}

/// Handle create_node MCP request
pub async fn handle_create_node(
    engine: &Arc<MutationEngine>,
    params: Value,
) -> Result<Value, MCPError> {
    let params: CreateNodeParams = parse_params(params)?;
    let document = load_document(&params.file_path).await?;

    let create = EngineCreateParams {
        parent_id: params.parent_id,
        title: params.title,
        description: params.description,
        custom_fields: params.custom_fields,
        tags: params.tags,
        position: params.position,
    };
    let outcome = engine.create_node(&document.text, document.dialect, create)?;
    commit(&document, outcome).await
}

/// Handle get_node MCP request
pub async fn handle_get_node(
    engine: &Arc<MutationEngine>,
    params: Value,
) -> Result<Value, MCPError> {
    let params: GetNodeParams = parse_params(params)?;
    let document = load_document(&params.file_path).await?;

    let view = engine.get_node(&document.text, document.dialect, &params.node_id)?;
    serde_json::to_value(view)
        .map_err(|e| MCPError::internal_error(format!("JSON serialization failed: {}", e)))
}

/// Handle update_node MCP request
pub async fn handle_update_node(
    engine: &Arc<MutationEngine>,
    params: Value,
) -> Result<Value, MCPError> {
    let params: UpdateNodeParams = parse_params(params)?;

    let patch = NodePatch {
        id: params.id,
        title: params.title,
        description: params.description,
        tags: params.tags,
        custom_fields: params.custom_fields,
    };
    if patch.is_empty() {
        return Err(MCPError::invalid_params(
            "update_node needs at least one of title, description, tags, customFields".to_string(),
        ));
    }

    let document = load_document(&params.file_path).await?;
    let outcome = engine.update_node(&document.text, document.dialect, &params.node_id, patch)?;
    commit(&document, outcome).await
}

/// Handle delete_node MCP request
pub async fn handle_delete_node(
    engine: &Arc<MutationEngine>,
    params: Value,
) -> Result<Value, MCPError> {
    let params: DeleteNodeParams = parse_params(params)?;
    let document = load_document(&params.file_path).await?;

    let outcome = engine.delete_node(
        &document.text,
        document.dialect,
        &params.node_id,
        params.delete_children,
    )?;
    commit(&document, outcome).await
}

/// Handle move_node MCP request
pub async fn handle_move_node(
    engine: &Arc<MutationEngine>,
    params: Value,
) -> Result<Value, MCPError> {
    let params: MoveNodeParams = parse_params(params)?;
    let document = load_document(&params.file_path).await?;

    let outcome = engine.move_node(
        &document.text,
        document.dialect,
        &params.node_id,
        &params.new_parent_id,
        params.position,
    )?;
    commit(&document, outcome).await
}

#[cfg(test)]
#[path = "nodes_test.rs"]
mod nodes_test;
