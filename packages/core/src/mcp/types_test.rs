//! Tests for MCP types module
//!
//! Verifies JSON-RPC 2.0 request/response parsing and the mapping from
//! document errors onto JSON-RPC errors.

#[cfg(test)]
mod tests {
    use crate::mcp::types::{
        MCPError, MCPRequest, MCPResponse, DOCUMENT_PARSE_ERROR, DUPLICATE_ID, FILE_ERROR,
        INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST, METHOD_NOT_FOUND, NODE_NOT_FOUND,
        PARSE_ERROR, VALIDATION_ERROR,
    };
    use crate::models::ParseDiagnostic;
    use crate::services::MindmapError;
    use serde_json::json;

    #[test]
    fn test_parse_valid_request() {
        let json_str = r#"{
            "jsonrpc": "2.0",
            "id": 123,
            "method": "create_node",
            "params": {
                "filePath": "plan.yaml",
                "parentId": "root",
                "title": "Child"
            }
        }"#;

        let request: MCPRequest = serde_json::from_str(json_str).unwrap();

        assert_eq!(request.jsonrpc, "2.0");
        assert_eq!(request.id, Some(123));
        assert_eq!(request.method, "create_node");
        assert!(request.params.is_object());
        assert!(!request.is_notification());
    }

    #[test]
    fn test_parse_request_missing_jsonrpc() {
        let json_str = r#"{
            "id": 123,
            "method": "create_node",
            "params": {}
        }"#;

        let result: Result<MCPRequest, _> = serde_json::from_str(json_str);
        assert!(result.is_err());
    }

    #[test]
    fn test_request_without_id_is_notification() {
        let json_str = r#"{
            "jsonrpc": "2.0",
            "method": "notifications/initialized"
        }"#;

        let request: MCPRequest = serde_json::from_str(json_str).unwrap();
        assert!(request.is_notification());
        assert!(request.params.is_null());
    }

    #[test]
    fn test_serialize_success_response() {
        let response = MCPResponse::success(42, json!({"nodeId": "abc123"}));

        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["jsonrpc"], "2.0");
        assert_eq!(json["id"], 42);
        assert_eq!(json["result"]["nodeId"], "abc123");
        assert!(json.get("error").is_none()); // Should be omitted
    }

    #[test]
    fn test_serialize_error_response() {
        let response = MCPResponse::error(99, MCPError::method_not_found("nope"));

        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["id"], 99);
        assert_eq!(json["error"]["code"], METHOD_NOT_FOUND);
        assert_eq!(json["error"]["message"], "Method not found: nope");
        assert!(json["error"].get("data").is_none());
        assert!(json.get("result").is_none());
    }

    #[test]
    fn test_error_codes_constants() {
        assert_eq!(PARSE_ERROR, -32700);
        assert_eq!(INVALID_REQUEST, -32600);
        assert_eq!(METHOD_NOT_FOUND, -32601);
        assert_eq!(INVALID_PARAMS, -32602);
        assert_eq!(INTERNAL_ERROR, -32603);

        // Application codes live in the reserved -32000..-32099 range
        for code in [
            NODE_NOT_FOUND,
            DOCUMENT_PARSE_ERROR,
            VALIDATION_ERROR,
            DUPLICATE_ID,
            FILE_ERROR,
        ] {
            assert!((-32099..=-32000).contains(&code));
        }
    }

    #[test]
    fn test_mcp_error_helper_methods() {
        let parse_err = MCPError::parse_error("Invalid JSON".to_string());
        assert_eq!(parse_err.code, PARSE_ERROR);
        assert!(!parse_err.is_tool_failure());

        let invalid_params = MCPError::invalid_params("Missing field".to_string());
        assert_eq!(invalid_params.code, INVALID_PARAMS);

        let invalid_request = MCPError::invalid_request("bad".to_string());
        assert_eq!(invalid_request.code, INVALID_REQUEST);
    }

    #[test]
    fn test_node_not_found_maps_with_data() {
        let error = MCPError::from(MindmapError::node_not_found("ghost"));

        assert_eq!(error.code, NODE_NOT_FOUND);
        assert!(error.is_tool_failure());
        let data = error.data.unwrap();
        assert_eq!(data["code"], "NODE_NOT_FOUND");
        assert_eq!(data["details"]["nodeId"], "ghost");
    }

    #[test]
    fn test_document_errors_map_to_application_codes() {
        let diag = ParseDiagnostic::error("bad").with_position(3, 1);

        let parse = MCPError::from(MindmapError::parse("bad", vec![diag.clone()]));
        assert_eq!(parse.code, DOCUMENT_PARSE_ERROR);
        assert_eq!(parse.data.unwrap()["details"]["diagnostics"][0]["line"], 3);

        let validation = MCPError::from(MindmapError::validation("bad", vec![diag]));
        assert_eq!(validation.code, VALIDATION_ERROR);

        let duplicate = MCPError::from(MindmapError::duplicate_id("x"));
        assert_eq!(duplicate.code, DUPLICATE_ID);

        let missing = MCPError::from(MindmapError::file_not_found("/tmp/none.yaml"));
        assert_eq!(missing.code, FILE_ERROR);
        assert_eq!(missing.data.unwrap()["code"], "FILE_NOT_FOUND");

        let internal = MCPError::from(MindmapError::internal("boom"));
        assert_eq!(internal.code, INTERNAL_ERROR);
        assert!(internal.data.unwrap().get("details").is_none());
    }
}
