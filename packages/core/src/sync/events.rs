//! Sync Events
//!
//! Outbound notifications from a document's coordinator, delivered on a
//! tokio broadcast channel so the text surface, the tree surface and any
//! other observer can subscribe independently.

use super::SyncPhase;
use crate::codec::TextLocation;
use crate::models::ParseDiagnostic;
use crate::services::ToolError;
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SyncEvent {
    /// The document moved between sync phases
    #[serde(rename_all = "camelCase")]
    PhaseChanged {
        from: SyncPhase,
        to: SyncPhase,
        revision: u64,
    },

    /// New canonical text, produced by a tree edit; the text surface should
    /// replace its buffer
    TextChanged { revision: u64, text: String },

    /// New good document for the tree surface
    TreeChanged { revision: u64, document: Value },

    /// Current diagnostics; empty when the document is clean
    Diagnostics {
        revision: u64,
        diagnostics: Vec<ParseDiagnostic>,
    },

    ReconcileStarted { revision: u64 },

    /// A reconcile finished after a newer edit was accepted; its result was dropped
    ReconcileDiscarded { revision: u64, latest: u64 },

    #[serde(rename_all = "camelCase")]
    EditApplied {
        revision: u64,
        kind: String,
        node_id: String,
    },

    EditRejected { kind: String, error: ToolError },

    #[serde(rename_all = "camelCase")]
    NodeLocated {
        node_id: String,
        location: Option<TextLocation>,
    },

    SaveCompleted { revision: u64, path: PathBuf },

    SaveFailed { error: ToolError },
}

impl SyncEvent {
    /// Get a string representation of the event type
    pub fn event_type(&self) -> &str {
        match self {
            SyncEvent::PhaseChanged { .. } => "sync:phase-changed",
            SyncEvent::TextChanged { .. } => "text:changed",
            SyncEvent::TreeChanged { .. } => "tree:changed",
            SyncEvent::Diagnostics { .. } => "document:diagnostics",
            SyncEvent::ReconcileStarted { .. } => "reconcile:started",
            SyncEvent::ReconcileDiscarded { .. } => "reconcile:discarded",
            SyncEvent::EditApplied { .. } => "edit:applied",
            SyncEvent::EditRejected { .. } => "edit:rejected",
            SyncEvent::NodeLocated { .. } => "node:located",
            SyncEvent::SaveCompleted { .. } => "save:completed",
            SyncEvent::SaveFailed { .. } => "save:failed",
        }
    }
}
