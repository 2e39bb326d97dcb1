//! Node search
//!
//! Case-insensitive substring match on title and description, narrowed by
//! tag, custom-field and depth filters. Results are scored, sorted by score
//! and then by pre-order position, and truncated.

use crate::tree::{NodeTree, TreeNode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Title equals the query, ignoring case
pub const SCORE_EXACT_TITLE: u32 = 3;
/// Title contains the query
pub const SCORE_TITLE: u32 = 2;
/// Only the description contains the query
pub const SCORE_DESCRIPTION: u32 = 1;

/// Narrowing filters; every present filter must hold
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchFilters {
    /// Node must carry ALL of these tags
    #[serde(default)]
    pub tags: Vec<String>,

    /// Every pair must equal the node's custom field exactly
    #[serde(default)]
    pub custom_fields: Map<String, Value>,

    /// Maximum depth from the root (root is 0)
    #[serde(default, alias = "depth")]
    pub max_depth: Option<usize>,
}

/// A search request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    /// Text to match; blank matches every node that passes the filters
    #[serde(default)]
    pub query: String,

    #[serde(default)]
    pub filters: SearchFilters,

    #[serde(default)]
    pub limit: Option<usize>,
}

impl SearchQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    pub fn with_filters(mut self, filters: SearchFilters) -> Self {
        self.filters = filters;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// One matching node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub depth: usize,
    /// Ancestor ids from the root down to the node
    pub path: Vec<String>,
    pub score: u32,
}

/// Run a search over a built tree; `limit` is already resolved
pub fn search_tree(tree: &NodeTree, query: &SearchQuery, limit: usize) -> Vec<SearchHit> {
    let needle = query.query.trim().to_lowercase();
    let mut path: Vec<&str> = Vec::new();
    let mut hits: Vec<(u32, usize, SearchHit)> = Vec::new();

    for (order, (depth, node)) in tree.preorder().into_iter().enumerate() {
        // pre-order: the ancestor stack is exactly `depth` long before pushing
        path.truncate(depth);
        path.push(node.id());

        if query.filters.max_depth.is_some_and(|max| depth > max) {
            continue;
        }
        if !passes_filters(node, &query.filters) {
            continue;
        }
        let Some(score) = score(node, &needle) else {
            continue;
        };

        hits.push((
            score,
            order,
            SearchHit {
                id: node.id().to_string(),
                title: node.title().to_string(),
                description: node.description().map(str::to_string),
                tags: node.tags().into_iter().map(str::to_string).collect(),
                depth,
                path: path.iter().map(|id| id.to_string()).collect(),
                score,
            },
        ));
    }

    hits.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
    hits.into_iter()
        .take(limit)
        .map(|(_, _, hit)| hit)
        .collect()
}

fn passes_filters(node: &TreeNode, filters: &SearchFilters) -> bool {
    let tags = node.tags();
    if !filters.tags.iter().all(|wanted| tags.contains(&wanted.as_str())) {
        return false;
    }

    if filters.custom_fields.is_empty() {
        return true;
    }
    let Some(fields) = node.custom_fields() else {
        return false;
    };
    filters
        .custom_fields
        .iter()
        .all(|(key, expected)| fields.get(key) == Some(expected))
}

fn score(node: &TreeNode, needle: &str) -> Option<u32> {
    if needle.is_empty() {
        return Some(0);
    }

    let title = node.title().to_lowercase();
    if title == needle {
        return Some(SCORE_EXACT_TITLE);
    }
    if title.contains(needle) {
        return Some(SCORE_TITLE);
    }
    node.description()
        .filter(|d| d.to_lowercase().contains(needle))
        .map(|_| SCORE_DESCRIPTION)
}
