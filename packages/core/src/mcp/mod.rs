//! Model Context Protocol (MCP) Integration
//!
//! JSON-RPC 2.0 server exposing mindmap file operations to AI agents.
//!
//! # Architecture
//!
//! - **Stateless**: every tool call names its document with `filePath` and
//!   runs one atomic [`MutationEngine`](crate::services::MutationEngine)
//!   operation over the file's text
//! - **stdio transport**: line-delimited JSON-RPC 2.0 over stdin/stdout
//! - **Write on success only**: a rejected edit never touches the file
//!
//! # Usage
//!
//! ```json
//! {
//!   "jsonrpc": "2.0",
//!   "id": 1,
//!   "method": "tools/call",
//!   "params": {
//!     "name": "create_node",
//!     "arguments": { "filePath": "plan.yaml", "parentId": "root", "title": "Ship it" }
//!   }
//! }
//! ```

pub mod handlers;
pub mod server;
pub mod types;

pub use server::{handle_request, run_mcp_server, serve};
pub use types::{MCPError, MCPRequest, MCPResponse};
