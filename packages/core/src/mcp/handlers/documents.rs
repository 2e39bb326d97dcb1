//! MCP Document Handlers
//!
//! File plumbing shared by every tool, plus `validate_mindmap`.
//!
//! Each tool names its document with `filePath`. The dialect is picked from
//! the extension, the text is read through [`DocumentFiles`], and mutating
//! tools write the new text back only after the engine succeeded.

use crate::codec::Dialect;
use crate::mcp::types::MCPError;
use crate::services::{DocumentFiles, MutationEngine};
use serde::Deserialize;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;

/// A document file read for one tool call
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    pub path: PathBuf,
    pub dialect: Dialect,
    pub text: String,
}

impl LoadedDocument {
    pub fn display_path(&self) -> String {
        self.path.display().to_string()
    }
}

/// Parameters for validate_mindmap
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateParams {
    pub file_path: String,
}

/// Deserialize tool arguments, mapping failures to invalid params
pub fn parse_params<T: serde::de::DeserializeOwned>(params: Value) -> Result<T, MCPError> {
    serde_json::from_value(params)
        .map_err(|e| MCPError::invalid_params(format!("Invalid parameters: {}", e)))
}

pub async fn load_document(file_path: &str) -> Result<LoadedDocument, MCPError> {
    let files = DocumentFiles::new();
    let path = PathBuf::from(file_path);
    let dialect = files.dialect_for(&path)?;
    let text = files.read(&path).await?;
    Ok(LoadedDocument {
        path,
        dialect,
        text,
    })
}

pub async fn store_document(document: &LoadedDocument, text: &str) -> Result<(), MCPError> {
    DocumentFiles::new()
        .write_atomic(&document.path, text)
        .await?;
    tracing::debug!("Wrote {}", document.path.display());
    Ok(())
}

/// Handle validate_mindmap MCP request
///
/// Never writes. An invalid document is a successful call whose report
/// says `valid: false`.
pub async fn handle_validate_mindmap(
    engine: &Arc<MutationEngine>,
    params: Value,
) -> Result<Value, MCPError> {
    let params: ValidateParams = parse_params(params)?;
    let document = load_document(&params.file_path).await?;

    let report = engine.validate(&document.text, document.dialect);
    let mut value = serde_json::to_value(&report)
        .map_err(|e| MCPError::internal_error(format!("JSON serialization failed: {}", e)))?;
    if let Some(object) = value.as_object_mut() {
        object.insert("filePath".to_string(), Value::String(document.display_path()));
    }
    Ok(value)
}
