//! Mindmap MCP Server
//!
//! Standalone MCP (Model Context Protocol) server giving AI agents
//! structured access to mindmap files.
//!
//! Architecture:
//!   AI Agent → stdin (JSON-RPC, one request per line) → MutationEngine → file
//!   AI Agent ← stdout (JSON-RPC responses)
//!
//! Logs go to stderr; stdout carries only protocol messages.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin mindmap-mcp
//!
//! # With a config file and verbose logging
//! MINDMAP_CONFIG=mindmap.json RUST_LOG=mindmap_core=debug cargo run --bin mindmap-mcp
//! ```

use mindmap_core::mcp::run_mcp_server;
use mindmap_core::{MindmapConfig, MutationEngine};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("mindmap_mcp=info,mindmap_core=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = MindmapConfig::load()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;

    tracing::info!(
        "🚀 Starting mindmap MCP server (line width {}, search limit {}/{})",
        config.codec.line_width,
        config.engine.default_search_limit,
        config.engine.max_search_limit
    );

    let engine = Arc::new(MutationEngine::new(config.codec, config.engine));
    run_mcp_server(engine).await
}
