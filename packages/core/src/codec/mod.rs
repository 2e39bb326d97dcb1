//! Format Codec
//!
//! Bidirectional conversion between raw text and the document object graph
//! for both serialization dialects:
//!
//! - [`Dialect::Strict`] - JSON; strict structural parse, no comments
//! - [`Dialect::Authorable`] - YAML; comments, block scalars, anchors on input
//!
//! Both dialects parse into the same `serde_json::Value` shape. Serialization
//! is deterministic: the document is put into canonical key order first and
//! then written with fixed formatting, so the same logical content always
//! produces the same bytes.
//!
//! Parse failures never escape as raw parser errors; they are wrapped into
//! [`ParseDiagnostic`]s carrying the parser's line and column.

mod canonical;
mod locate;
mod yaml;

pub use canonical::{canonicalize_document, canonicalize_node};
pub use locate::{locate_node, locate_node_occurrence, MatchStrategy, TextLocation};

use crate::models::ParseDiagnostic;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// Default cap for folding long scalars in the authorable dialect
pub const DEFAULT_LINE_WIDTH: usize = 120;

/// Textual serialization of a mindmap document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// JSON
    Strict,
    /// YAML
    Authorable,
}

impl Dialect {
    /// Pick the dialect from a file extension (`.json`, `.yaml`, `.yml`, `.mindmap`)
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "json" => Some(Self::Strict),
            "yaml" | "yml" | "mindmap" => Some(Self::Authorable),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::Authorable => "authorable",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Codec failures
#[derive(Error, Debug, Clone)]
pub enum CodecError {
    #[error("Failed to parse {dialect} document: {}", first_message(.diagnostics))]
    Parse {
        dialect: Dialect,
        diagnostics: Vec<ParseDiagnostic>,
    },

    #[error("Failed to serialize document: {0}")]
    Serialize(String),
}

fn first_message(diagnostics: &[ParseDiagnostic]) -> String {
    diagnostics
        .first()
        .map(ToString::to_string)
        .unwrap_or_else(|| "unknown error".to_string())
}

impl CodecError {
    pub fn diagnostics(&self) -> &[ParseDiagnostic] {
        match self {
            Self::Parse { diagnostics, .. } => diagnostics,
            Self::Serialize(_) => &[],
        }
    }
}

/// Result of parsing raw text
///
/// An empty or comment-only text is not an error: it means there is
/// nothing to show.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    Document(Value),
    Empty,
}

impl ParseOutcome {
    pub fn into_document(self) -> Option<Value> {
        match self {
            Self::Document(doc) => Some(doc),
            Self::Empty => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

/// Formatting options applied on serialization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodecOptions {
    /// Soft cap for long string scalars in the authorable dialect
    #[serde(default = "default_line_width")]
    pub line_width: usize,
}

fn default_line_width() -> usize {
    DEFAULT_LINE_WIDTH
}

impl Default for CodecOptions {
    fn default() -> Self {
        Self {
            line_width: DEFAULT_LINE_WIDTH,
        }
    }
}

/// Dialect-dispatching parser/serializer
#[derive(Debug, Clone, Default)]
pub struct FormatCodec {
    options: CodecOptions,
}

impl FormatCodec {
    pub fn new(options: CodecOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &CodecOptions {
        &self.options
    }

    /// Parse raw text into a document object
    pub fn parse(&self, raw: &str, dialect: Dialect) -> Result<ParseOutcome, CodecError> {
        if is_blank_document(raw, dialect) {
            return Ok(ParseOutcome::Empty);
        }

        let parsed = match dialect {
            Dialect::Strict => parse_strict(raw),
            Dialect::Authorable => parse_authorable(raw),
        };

        match parsed {
            Ok(Value::Null) => Ok(ParseOutcome::Empty),
            Ok(doc) => Ok(ParseOutcome::Document(doc)),
            Err(diagnostic) => {
                tracing::warn!("{} parse failed: {}", dialect, diagnostic);
                Err(CodecError::Parse {
                    dialect,
                    diagnostics: vec![diagnostic],
                })
            }
        }
    }

    /// Serialize a document object; output is byte-stable for equal input
    pub fn serialize(&self, doc: &Value, dialect: Dialect) -> Result<String, CodecError> {
        let canonical = canonicalize_document(doc);
        match dialect {
            Dialect::Strict => {
                let mut text = serde_json::to_string_pretty(&canonical)
                    .map_err(|e| CodecError::Serialize(e.to_string()))?;
                text.push('\n');
                Ok(text)
            }
            Dialect::Authorable => Ok(yaml::emit(&canonical, self.options.line_width)),
        }
    }
}

fn parse_strict(raw: &str) -> Result<Value, ParseDiagnostic> {
    serde_json::from_str(raw).map_err(|e| {
        let mut diagnostic =
            ParseDiagnostic::error(format!("Invalid JSON: {}", strip_position(&e.to_string())));
        if e.line() > 0 {
            diagnostic = diagnostic.with_position(e.line(), e.column().max(1));
        }
        diagnostic.with_details(serde_json::json!({ "category": format!("{:?}", e.classify()) }))
    })
}

fn parse_authorable(raw: &str) -> Result<Value, ParseDiagnostic> {
    serde_yaml::from_str(raw).map_err(|e| {
        let mut diagnostic = ParseDiagnostic::error(format!("Invalid YAML: {}", e));
        if let Some(location) = e.location() {
            diagnostic = diagnostic.with_position(location.line(), location.column());
        }
        diagnostic
    })
}

/// JSON parser messages end with "at line X column Y"; the position is
/// carried separately on the diagnostic.
fn strip_position(message: &str) -> String {
    match message.rfind(" at line ") {
        Some(idx) => message[..idx].to_string(),
        None => message.to_string(),
    }
}

fn is_blank_document(raw: &str, dialect: Dialect) -> bool {
    match dialect {
        Dialect::Strict => raw.trim().is_empty(),
        Dialect::Authorable => raw.lines().all(|line| {
            let line = line.trim();
            line.is_empty() || line.starts_with('#') || line == "---" || line == "..."
        }),
    }
}
