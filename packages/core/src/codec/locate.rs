//! Node location in raw text
//!
//! Best-effort mapping from a node id to its position in the serialized
//! text, used for jump-to-node requests and for attaching line/column to
//! semantic diagnostics. Three strategies are tried in order and the first
//! hit wins:
//!
//! 1. exact key-value match (`"id": "x"`, `id: x`, `id: 'x'`)
//! 2. loose key match (an `id` key followed by a value starting with `x`)
//! 3. bare substring match

use super::Dialect;
use regex::Regex;
use serde::Serialize;

/// Which strategy produced a location
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MatchStrategy {
    ExactKeyValue,
    LooseKey,
    Substring,
}

/// Position of a node in the raw text; `line` and `column` are 1-based
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextLocation {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
    pub strategy: MatchStrategy,
}

/// Locate the first occurrence of `node_id`
pub fn locate_node(text: &str, dialect: Dialect, node_id: &str) -> Option<TextLocation> {
    locate_node_occurrence(text, dialect, node_id, 0)
}

/// Locate the `occurrence`-th (0-based) exact occurrence of `node_id`,
/// falling back to the looser strategies for the first match
pub fn locate_node_occurrence(
    text: &str,
    dialect: Dialect,
    node_id: &str,
    occurrence: usize,
) -> Option<TextLocation> {
    if node_id.is_empty() {
        return None;
    }

    // Strict text holds ids JSON-escaped
    let needle = match dialect {
        Dialect::Strict => {
            let quoted = serde_json::to_string(node_id).ok()?;
            quoted[1..quoted.len() - 1].to_string()
        }
        Dialect::Authorable => node_id.to_string(),
    };
    let escaped = regex::escape(&needle);
    let exact = match dialect {
        Dialect::Strict => format!(r#""id"\s*:\s*"{}""#, escaped),
        Dialect::Authorable => format!(
            r#"(?m)["']?\bid["']?[ \t]*:[ \t]*(?:"{id}"|'{id}'|{id}[ \t]*(?:$|[,}}#]))"#,
            id = escaped
        ),
    };

    if let Some(offset) = nth_match(&exact, text, occurrence) {
        return Some(to_location(text, offset, MatchStrategy::ExactKeyValue));
    }
    if occurrence > 0 {
        return None;
    }

    let loose = format!(r#"["']?\bid["']?\s*:\s*["']?{}"#, escaped);
    if let Some(offset) = nth_match(&loose, text, 0) {
        return Some(to_location(text, offset, MatchStrategy::LooseKey));
    }

    text.find(&needle)
        .map(|offset| to_location(text, offset, MatchStrategy::Substring))
}

fn nth_match(pattern: &str, text: &str, n: usize) -> Option<usize> {
    match Regex::new(pattern) {
        Ok(re) => re.find_iter(text).nth(n).map(|m| m.start()),
        Err(e) => {
            tracing::warn!("Node locator pattern failed to compile: {}", e);
            None
        }
    }
}

/// Convert a byte offset into a 1-based line/column location
pub fn to_location(text: &str, offset: usize, strategy: MatchStrategy) -> TextLocation {
    let before = &text[..offset.min(text.len())];
    let line = before.matches('\n').count() + 1;
    let line_start = before.rfind('\n').map_or(0, |idx| idx + 1);
    let column = before[line_start..].chars().count() + 1;
    TextLocation {
        offset,
        line,
        column,
        strategy,
    }
}
