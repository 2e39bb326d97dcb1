//! Data Models
//!
//! - [`document`] - persisted field names, canonical order and diagnostic paths
//! - [`schema`] - custom-field schema descriptor and tag palette
//! - [`diagnostic`] - parse/validation diagnostics shared by every stage

pub mod diagnostic;
pub mod document;
pub mod schema;

pub use diagnostic::{ParseDiagnostic, Severity, ValidationResult};
pub use schema::{FieldDefinition, FieldType, SchemaDescriptor, TagDefinition};
