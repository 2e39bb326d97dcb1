//! Mindmap Core
//!
//! Parsing, validation, tree mutation and two-channel synchronization for
//! mindmap documents.
//!
//! # Architecture
//!
//! - **Two dialects, one codec**: a strict JSON form and an authorable YAML
//!   form of the same document, serialized canonically
//! - **Arena tree**: nodes live in a flat map keyed by their immutable id,
//!   each holding an ordered list of child ids
//! - **Atomic mutations**: every operation is parse → validate → mutate →
//!   validate → serialize over raw text, returning new text or an error
//! - **Actor per document**: text and tree edits converge on one
//!   single-writer state machine with debounce and stale-result discard
//!
//! # Modules
//!
//! - [`models`] - Diagnostics, schema descriptor, document field names
//! - [`codec`] - Dialect parsing, canonical serialization, node location
//! - [`tree`] - NodeTree arena and structural edits
//! - [`services`] - SchemaValidator, MutationEngine, search, file access, errors
//! - [`sync`] - SyncCoordinator actors and events
//! - [`mcp`] - MCP stdio server for AI agent integration
//! - [`config`] - Layered runtime configuration

pub mod codec;
pub mod config;
pub mod mcp;
pub mod models;
pub mod services;
pub mod sync;
pub mod tree;

// Re-export commonly used types
pub use codec::{CodecOptions, Dialect, FormatCodec};
pub use config::MindmapConfig;
pub use models::*;
pub use services::*;
pub use sync::{DocumentHandle, SyncCoordinator, SyncEvent, SyncPhase};
pub use tree::{InsertPosition, NodePatch, NodeTree};
