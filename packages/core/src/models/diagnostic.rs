//! Diagnostics
//!
//! Shared diagnostic shape produced by the codec (syntax-level problems) and
//! the schema validator (semantic problems). Diagnostics never mutate the
//! document they describe.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Diagnostic severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A single problem found while parsing or validating a document
///
/// `line` and `column` are 1-based. They are `None` when the position is
/// unknown, which is the case for semantic diagnostics until they are
/// located against the raw text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseDiagnostic {
    pub line: Option<usize>,
    pub column: Option<usize>,
    pub message: String,
    pub severity: Severity,

    /// Dot/bracket path into the document, e.g. `root.children[1].title`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ParseDiagnostic {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            line: None,
            column: None,
            message: message.into(),
            severity: Severity::Error,
            path: None,
            details: None,
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(message)
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_position(mut self, line: usize, column: usize) -> Self {
        self.line = Some(line);
        self.column = Some(column);
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    pub fn has_position(&self) -> bool {
        self.line.is_some()
    }
}

impl std::fmt::Display for ParseDiagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let (Some(line), Some(column)) = (self.line, self.column) {
            write!(f, "{}:{}: ", line, column)?;
        }
        if let Some(path) = &self.path {
            write!(f, "{}: ", path)?;
        }
        f.write_str(&self.message)
    }
}

/// Outcome of validating a document object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<ParseDiagnostic>,
    pub warnings: Vec<ParseDiagnostic>,
}

impl ValidationResult {
    /// Split a flat diagnostic list into errors and warnings
    pub fn from_diagnostics(diagnostics: Vec<ParseDiagnostic>) -> Self {
        let (errors, warnings): (Vec<_>, Vec<_>) =
            diagnostics.into_iter().partition(ParseDiagnostic::is_error);
        Self {
            valid: errors.is_empty(),
            errors,
            warnings,
        }
    }

    /// All diagnostics, errors first
    pub fn diagnostics(&self) -> impl Iterator<Item = &ParseDiagnostic> {
        self.errors.iter().chain(self.warnings.iter())
    }

    pub fn diagnostics_mut(&mut self) -> impl Iterator<Item = &mut ParseDiagnostic> {
        self.errors.iter_mut().chain(self.warnings.iter_mut())
    }

    pub fn into_diagnostics(self) -> Vec<ParseDiagnostic> {
        let mut all = self.errors;
        all.extend(self.warnings);
        all
    }
}
