//! MCP Request Handlers
//!
//! Handler modules for different MCP operations.

pub mod documents;
pub mod initialize;
pub mod nodes;
pub mod search;
pub mod tools;
