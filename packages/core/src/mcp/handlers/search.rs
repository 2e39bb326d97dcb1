//! MCP Search Handlers
//!
//! Text search over one document for AI agent access.

use super::documents::{load_document, parse_params};
use crate::mcp::types::MCPError;
use crate::services::{MutationEngine, SearchFilters, SearchQuery};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

/// Parameters for search_nodes method
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchNodesParams {
    pub file_path: String,

    /// Case-insensitive text matched against titles and descriptions
    #[serde(default)]
    pub query: String,

    #[serde(default)]
    pub filters: SearchFilters,

    /// Maximum number of results
    /// Default and ceiling come from the engine config
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Search a document's nodes
///
/// # Example
///
/// ```ignore
/// let params = json!({
///     "filePath": "plan.yaml",
///     "query": "launch",
///     "filters": { "tags": ["urgent"], "maxDepth": 2 },
///     "limit": 10
/// });
/// let result = handle_search_nodes(&engine, params).await?;
/// ```
pub async fn handle_search_nodes(
    engine: &Arc<MutationEngine>,
    params: Value,
) -> Result<Value, MCPError> {
    let params: SearchNodesParams = parse_params(params)?;
    let document = load_document(&params.file_path).await?;

    let query = SearchQuery {
        query: params.query,
        filters: params.filters,
        limit: params.limit,
    };
    let hits = engine.search_nodes(&document.text, document.dialect, &query)?;

    Ok(json!({
        "filePath": document.display_path(),
        "query": query.query,
        "count": hits.len(),
        "results": hits,
    }))
}
