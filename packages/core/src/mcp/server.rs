//! MCP stdio Server
//!
//! Async Tokio task that handles JSON-RPC 2.0 requests, one per line.
//! Requests are handled in arrival order, so two tool calls on the same file
//! never interleave.

use crate::mcp::handlers::{initialize, tools};
use crate::mcp::types::{MCPError, MCPRequest, MCPResponse};
use crate::services::MutationEngine;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};
use tracing::{debug, error, info, instrument, warn};

/// Run the MCP server on stdin/stdout
///
/// Runs until EOF on stdin. Logging must not go to stdout.
#[instrument(skip(engine))]
pub async fn run_mcp_server(engine: Arc<MutationEngine>) -> anyhow::Result<()> {
    let reader = BufReader::new(tokio::io::stdin());
    let writer = BufWriter::new(tokio::io::stdout());
    serve(engine, reader, writer).await
}

/// Serve line-delimited JSON-RPC from any reader to any writer
pub async fn serve<R, W>(
    engine: Arc<MutationEngine>,
    reader: R,
    mut writer: W,
) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    info!("🔌 MCP server started");

    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        debug!("📥 MCP request: {}", line);

        let request: MCPRequest = match serde_json::from_str(&line) {
            Ok(req) => req,
            Err(e) => {
                warn!("❌ Failed to parse JSON-RPC request: {}", e);
                let error_response = MCPResponse::error(
                    0, // Unknown ID since parsing failed
                    MCPError::parse_error(format!("Invalid JSON: {}", e)),
                );
                write_response(&mut writer, &error_response).await?;
                continue;
            }
        };

        let Some(request_id) = request.id else {
            debug!("📭 MCP notification: {}", request.method);
            continue;
        };
        let method = request.method.clone();

        let response = handle_request(&engine, request_id, request).await;

        debug!("📤 MCP response for method '{}' (id={})", method, request_id);
        write_response(&mut writer, &response).await?;
    }

    info!("🔌 MCP server stopped (input closed)");
    Ok(())
}

/// Handle a JSON-RPC request and return a response
///
/// Tool names are also accepted as direct methods; there, tool failures are
/// JSON-RPC errors whose `data` holds the structured error.
#[instrument(skip_all, fields(method = %request.method, id = %id))]
pub async fn handle_request(
    engine: &Arc<MutationEngine>,
    id: u64,
    request: MCPRequest,
) -> MCPResponse {
    if request.jsonrpc != "2.0" {
        return MCPResponse::error(
            id,
            MCPError::invalid_request(format!("Unsupported jsonrpc version: {}", request.jsonrpc)),
        );
    }

    let result = match request.method.as_str() {
        "initialize" => initialize::handle_initialize(request.params),
        "ping" => Ok(serde_json::json!({})),
        "tools/list" => tools::handle_tools_list(request.params),
        "tools/call" => tools::handle_tools_call(engine, request.params).await,
        method => match tools::dispatch_tool(engine, method, request.params).await {
            Some(result) => result,
            None => {
                warn!("⚠️  Unknown MCP method: {}", method);
                Err(MCPError::method_not_found(method))
            }
        },
    };

    match result {
        Ok(result) => {
            debug!("✅ MCP request {} succeeded", id);
            MCPResponse::success(id, result)
        }
        Err(error) => {
            error!(
                "❌ MCP request {} failed: {} (code: {})",
                id, error.message, error.code
            );
            MCPResponse::error(id, error)
        }
    }
}

async fn write_response<W>(writer: &mut W, response: &MCPResponse) -> anyhow::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let json = serde_json::to_string(response)?;
    writer.write_all(json.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}
