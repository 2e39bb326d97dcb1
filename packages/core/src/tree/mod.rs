//! Node Tree
//!
//! In-memory structural model of a document: a flat arena of nodes keyed by
//! id, each holding the ordered ids of its children. Parent, depth and path
//! are computed on demand by traversal and never stored.

mod error;
mod node_tree;

pub use error::NodeError;
pub use node_tree::{InsertPosition, NodePatch, NodeTree, RemovedSubtree, TreeNode};
