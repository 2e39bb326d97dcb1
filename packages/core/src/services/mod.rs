//! Business Services
//!
//! This module contains the document-level services:
//!
//! - `SchemaValidator` - semantic validation with path-addressed diagnostics
//! - `MutationEngine` - atomic create/update/delete/move/search over raw text
//! - `DocumentFiles` - file read and atomic write with classified failures
//!
//! Services are stateless; they are handed text or document objects and hand
//! back new ones. Per-document state lives in the sync coordinator.

pub mod error;
pub mod file_access;
pub mod mutation_engine;
pub mod schema_validator;
pub mod search;

pub use error::{MindmapError, ToolError};
pub use file_access::DocumentFiles;
pub use mutation_engine::{
    locate_diagnostics, CreateNodeParams, MutationEngine, MutationOutcome, NodeView, TreeEdit,
    ValidationReport,
};
pub use schema_validator::SchemaValidator;
pub use search::{SearchFilters, SearchHit, SearchQuery};
