//! Schema Descriptor Types
//!
//! A document may carry an optional `schema` describing the custom fields its
//! nodes use, and an optional tag palette. Both are advisory unless the
//! descriptor is marked `strict`.
//!
//! ## Example
//!
//! ```yaml
//! schema:
//!   strict: false
//!   fields:
//!     - name: "priority"
//!       type: "enum"
//!       options: ["low", "high"]
//!     - name: "estimate"
//!       type: "number"
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Value type a custom field is declared with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Boolean,
    /// RFC 3339 timestamp or `YYYY-MM-DD`
    Date,
    Array,
    Object,
    /// String constrained to the definition's `options`
    Enum,
}

impl FieldType {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "string" | "text" => Some(Self::String),
            "number" | "integer" => Some(Self::Number),
            "boolean" | "bool" => Some(Self::Boolean),
            "date" | "datetime" => Some(Self::Date),
            "array" | "list" => Some(Self::Array),
            "object" => Some(Self::Object),
            "enum" | "select" => Some(Self::Enum),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::Array => "array",
            Self::Object => "object",
            Self::Enum => "enum",
        }
    }
}

/// One declared custom field
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub name: String,

    /// Raw type name as written; resolved with [`FieldType::parse`]
    #[serde(rename = "type")]
    pub field_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub required: bool,

    /// Allowed values for `enum` fields
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<Value>>,
}

/// The document-level `schema` block
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaDescriptor {
    /// When true, unknown custom fields and missing required fields are errors
    #[serde(default)]
    pub strict: bool,

    #[serde(default)]
    pub fields: Vec<FieldDefinition>,
}

impl SchemaDescriptor {
    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Entry of the document-level tag palette
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagDefinition {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_type_aliases() {
        assert_eq!(FieldType::parse("select"), Some(FieldType::Enum));
        assert_eq!(FieldType::parse("integer"), Some(FieldType::Number));
        assert_eq!(FieldType::parse("person"), None);
    }

    #[test]
    fn test_descriptor_deserializes_with_defaults() {
        let descriptor: SchemaDescriptor = serde_json::from_value(json!({
            "fields": [{ "name": "priority", "type": "enum", "options": ["low", "high"] }]
        }))
        .unwrap();

        assert!(!descriptor.strict);
        let field = descriptor.field("priority").unwrap();
        assert!(!field.required);
        assert_eq!(field.options.as_ref().unwrap().len(), 2);
    }
}
