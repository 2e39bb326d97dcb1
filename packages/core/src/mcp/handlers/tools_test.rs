//! Tests for MCP Tools Handler
//!
//! Tests tools/list and tools/call methods for MCP protocol compliance.

use super::*;
use crate::mcp::types::INVALID_PARAMS;
use serde_json::json;

fn engine() -> Arc<MutationEngine> {
    Arc::new(MutationEngine::default())
}

#[test]
fn test_tools_list_returns_all_schemas() {
    let response = handle_tools_list(json!({})).unwrap();
    let tools = response["tools"].as_array().unwrap();

    let tool_names: Vec<&str> = tools.iter().map(|t| t["name"].as_str().unwrap()).collect();
    assert_eq!(tool_names, TOOL_NAMES);
}

#[test]
fn test_tools_list_tool_schema_structure() {
    let result = handle_tools_list(json!({})).unwrap();
    let tools = result["tools"].as_array().unwrap();

    for tool in tools {
        assert!(tool["name"].is_string(), "Tool missing name");
        assert!(tool["description"].is_string(), "Tool missing description");
        assert_eq!(tool["inputSchema"]["type"], "object");

        let required = tool["inputSchema"]["required"].as_array().unwrap();
        assert!(
            required.contains(&json!("filePath")),
            "{} must require filePath",
            tool["name"]
        );
    }
}

#[tokio::test]
async fn test_tools_call_with_unknown_tool() {
    let err = handle_tools_call(&engine(), json!({"name": "unknown_tool", "arguments": {}}))
        .await
        .unwrap_err();

    assert_eq!(err.code, INVALID_PARAMS);
    assert!(err.message.contains("unknown_tool"));
}

#[tokio::test]
async fn test_tools_call_missing_name() {
    let err = handle_tools_call(&engine(), json!({"arguments": {}}))
        .await
        .unwrap_err();
    assert_eq!(err.code, INVALID_PARAMS);
}

#[tokio::test]
async fn test_tools_call_missing_arguments_is_protocol_error() {
    // Arguments default to {}, which lacks filePath
    let err = handle_tools_call(&engine(), json!({"name": "get_node"}))
        .await
        .unwrap_err();
    assert_eq!(err.code, INVALID_PARAMS);
    assert!(!err.is_tool_failure());
}

#[tokio::test]
async fn test_tools_call_missing_file_is_tool_failure() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.yaml");

    let result = handle_tools_call(
        &engine(),
        json!({
            "name": "get_node",
            "arguments": { "filePath": path.display().to_string(), "nodeId": "root" }
        }),
    )
    .await
    .unwrap();

    assert_eq!(result["isError"], true);
    let error: Value =
        serde_json::from_str(result["content"][0]["text"].as_str().unwrap()).unwrap();
    assert_eq!(error["code"], "FILE_NOT_FOUND");
    assert!(error["message"].as_str().unwrap().contains("absent.yaml"));
}

#[tokio::test]
async fn test_tools_call_success_wraps_content() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("map.json");
    std::fs::write(
        &path,
        r#"{"root":{"id":"root","title":"Root","children":[]}}"#,
    )
    .unwrap();

    let result = handle_tools_call(
        &engine(),
        json!({
            "name": "get_node",
            "arguments": { "filePath": path.display().to_string(), "nodeId": "root" }
        }),
    )
    .await
    .unwrap();

    assert_eq!(result["isError"], false);
    assert_eq!(result["content"][0]["type"], "text");
    let view: Value = serde_json::from_str(result["content"][0]["text"].as_str().unwrap()).unwrap();
    assert_eq!(view["node"]["title"], "Root");
    assert_eq!(view["depth"], 0);
}
