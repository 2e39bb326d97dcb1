//! Per-document sync state
//!
//! Pure state machine; no I/O and no timers. The coordinator feeds it edits
//! and reconcile results and acts on the decisions it returns.
//!
//! ```text
//!            text edit                 debounce expiry
//!   Clean ─────────────► TextDirty ───────────────────► Reconciling
//!     ▲                                                  │      │
//!     │            ok                                    │      │ errors
//!     └──────────────────────────────────────────────────┘      ▼
//!     ▲                                                       Invalid
//!     │ serialize                                               │ text edit
//!  Reconciling ◄── TreeDirty ◄── tree edit (not while Invalid)  ▼
//!                                                             TextDirty
//! ```

use super::reconciler::{ReconcileJob, ReconcileOutcome, ReconcileResult};
use crate::codec::Dialect;
use crate::models::ParseDiagnostic;
use crate::tree::NodeTree;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Lifecycle phase of an open document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SyncPhase {
    /// Text and tree agree; nothing pending
    Clean,
    /// A text edit is accepted but not yet parsed into the tree
    TextDirty,
    /// A structural edit is applied but not yet serialized to text
    TreeDirty,
    /// The parse/serialize pipeline is running
    Reconciling,
    /// The current text fails parsing or validation
    Invalid,
}

impl SyncPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Clean => "clean",
            Self::TextDirty => "textDirty",
            Self::TreeDirty => "treeDirty",
            Self::Reconciling => "reconciling",
            Self::Invalid => "invalid",
        }
    }
}

impl std::fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened to a text-channel edit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextDecision {
    /// Identical to the current text; no revision was assigned
    Ignored,
    /// Accepted; a debounced reconcile should be (re)scheduled
    Scheduled { revision: u64 },
    /// Accepted while a reconcile is in flight; runs once it completes
    Queued { revision: u64 },
}

/// What happened to a finished reconcile
#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileDecision {
    /// Result matched the latest revision and was applied
    Applied { revision: u64, phase: SyncPhase },
    /// Result was for an older revision and was dropped; `rerun` asks for an
    /// immediate reconcile of the queued text
    Discarded {
        revision: u64,
        latest: u64,
        rerun: bool,
    },
}

#[derive(Debug, Clone)]
pub struct SyncState {
    dialect: Dialect,
    /// Canonical text; always the latest accepted edit, valid or not
    text: String,
    /// Last known good tree; survives invalid edits
    tree: Option<NodeTree>,
    diagnostics: Vec<ParseDiagnostic>,
    phase: SyncPhase,
    /// Revision of the latest accepted edit
    revision: u64,
    /// Revision of the reconcile currently running
    in_flight: Option<u64>,
    /// The current text has not been reconciled yet
    needs_reconcile: bool,
    /// Ids that have left the document; carried into tree edits
    retired: HashSet<String>,
    reconcile_count: u64,
    transitions: Vec<(SyncPhase, SyncPhase)>,
}

impl SyncState {
    /// State for a freshly opened document; its text still needs a reconcile
    pub fn new(dialect: Dialect, text: impl Into<String>) -> Self {
        Self {
            dialect,
            text: text.into(),
            tree: None,
            diagnostics: Vec::new(),
            phase: SyncPhase::TextDirty,
            revision: 0,
            in_flight: None,
            needs_reconcile: true,
            retired: HashSet::new(),
            reconcile_count: 0,
            transitions: Vec::new(),
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn tree(&self) -> Option<&NodeTree> {
        self.tree.as_ref()
    }

    pub fn diagnostics(&self) -> &[ParseDiagnostic] {
        &self.diagnostics
    }

    pub fn phase(&self) -> SyncPhase {
        self.phase
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn in_flight(&self) -> Option<u64> {
        self.in_flight
    }

    pub fn retired(&self) -> &HashSet<String> {
        &self.retired
    }

    pub fn reconcile_count(&self) -> u64 {
        self.reconcile_count
    }

    /// Phase changes since the last call, oldest first
    pub fn take_transitions(&mut self) -> Vec<(SyncPhase, SyncPhase)> {
        std::mem::take(&mut self.transitions)
    }

    fn set_phase(&mut self, to: SyncPhase) {
        if self.phase != to {
            tracing::debug!("Sync phase {} -> {} (rev {})", self.phase, to, self.revision);
            self.transitions.push((self.phase, to));
            self.phase = to;
        }
    }

    /// Accept a text-channel edit
    pub fn accept_text(&mut self, text: String) -> TextDecision {
        if text == self.text {
            return TextDecision::Ignored;
        }

        self.revision += 1;
        self.text = text;
        self.needs_reconcile = true;

        if self.in_flight.is_some() {
            // Only the newest queued text matters; it is already in `self.text`
            if self.phase != SyncPhase::Reconciling {
                self.set_phase(SyncPhase::TextDirty);
            }
            TextDecision::Queued {
                revision: self.revision,
            }
        } else {
            self.set_phase(SyncPhase::TextDirty);
            TextDecision::Scheduled {
                revision: self.revision,
            }
        }
    }

    /// Start a reconcile of the current text, if one is needed and none is running
    pub fn begin_reconcile(&mut self) -> Option<ReconcileJob> {
        if self.in_flight.is_some() || !self.needs_reconcile {
            return None;
        }

        self.needs_reconcile = false;
        self.in_flight = Some(self.revision);
        self.reconcile_count += 1;
        self.set_phase(SyncPhase::Reconciling);

        Some(ReconcileJob {
            revision: self.revision,
            dialect: self.dialect,
            text: self.text.clone(),
        })
    }

    /// Fold a finished reconcile back in, discarding it if it is stale
    pub fn complete_reconcile(&mut self, outcome: ReconcileOutcome) -> ReconcileDecision {
        if self.in_flight == Some(outcome.revision) {
            self.in_flight = None;
        }

        if outcome.revision < self.revision {
            tracing::debug!(
                "Discarding stale reconcile for rev {} (latest {})",
                outcome.revision,
                self.revision
            );
            return ReconcileDecision::Discarded {
                revision: outcome.revision,
                latest: self.revision,
                rerun: self.needs_reconcile && self.in_flight.is_none(),
            };
        }

        match outcome.result {
            ReconcileResult::Valid { tree, warnings } => {
                self.adopt_tree(tree);
                self.diagnostics = warnings;
                self.set_phase(SyncPhase::Clean);
            }
            ReconcileResult::Empty => {
                if let Some(previous) = self.tree.take() {
                    self.retire_all(&previous);
                }
                self.diagnostics.clear();
                self.set_phase(SyncPhase::Clean);
            }
            ReconcileResult::Invalid { diagnostics } => {
                self.diagnostics = diagnostics;
                self.set_phase(SyncPhase::Invalid);
            }
        }

        ReconcileDecision::Applied {
            revision: outcome.revision,
            phase: self.phase,
        }
    }

    /// Whether tree-channel edits are currently accepted
    pub fn tree_edits_allowed(&self) -> Result<(), String> {
        match self.phase {
            SyncPhase::Invalid => Err(
                "Document text is invalid; structural edits are suspended until it is fixed"
                    .to_string(),
            ),
            _ => Ok(()),
        }
    }

    /// Record a tree-channel edit that has been applied and serialized
    ///
    /// Returns the revision assigned to the edit. Any reconcile still running
    /// is now stale, and any queued text edit has been superseded.
    pub fn apply_tree_edit(
        &mut self,
        text: String,
        tree: NodeTree,
        removed_ids: &[String],
        warnings: Vec<ParseDiagnostic>,
    ) -> u64 {
        self.revision += 1;
        self.set_phase(SyncPhase::TreeDirty);
        self.set_phase(SyncPhase::Reconciling);

        self.text = text;
        self.retired.extend(removed_ids.iter().cloned());
        self.adopt_tree(tree);
        self.diagnostics = warnings;
        self.needs_reconcile = false;

        self.set_phase(SyncPhase::Clean);
        self.revision
    }

    /// Replace the good tree, retiring ids that disappeared from it
    fn adopt_tree(&mut self, tree: NodeTree) {
        if let Some(previous) = &self.tree {
            let gone: Vec<String> = previous
                .preorder()
                .into_iter()
                .map(|(_, node)| node.id())
                .filter(|id| !tree.contains(id))
                .map(str::to_string)
                .collect();
            self.retired.extend(gone);
        }
        for (_, node) in tree.preorder() {
            self.retired.remove(node.id());
        }
        self.tree = Some(tree);
    }

    fn retire_all(&mut self, tree: &NodeTree) {
        self.retired
            .extend(tree.preorder().into_iter().map(|(_, node)| node.id().to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tree(ids: &[&str]) -> NodeTree {
        let children: Vec<_> = ids[1..]
            .iter()
            .map(|id| json!({"id": id, "title": id}))
            .collect();
        NodeTree::build(&json!({"root": {"id": ids[0], "title": "Root", "children": children}}))
            .unwrap()
    }

    fn valid(revision: u64, ids: &[&str]) -> ReconcileOutcome {
        ReconcileOutcome {
            revision,
            result: ReconcileResult::Valid {
                tree: tree(ids),
                warnings: vec![],
            },
        }
    }

    fn opened() -> SyncState {
        let mut state = SyncState::new(Dialect::Strict, "v0");
        let job = state.begin_reconcile().unwrap();
        state.complete_reconcile(valid(job.revision, &["root"]));
        state.take_transitions();
        state
    }

    #[test]
    fn test_open_reconciles_initial_text() {
        let mut state = SyncState::new(Dialect::Strict, "v0");
        assert_eq!(state.phase(), SyncPhase::TextDirty);

        let job = state.begin_reconcile().unwrap();
        assert_eq!(job.revision, 0);
        assert_eq!(state.phase(), SyncPhase::Reconciling);
        assert!(state.begin_reconcile().is_none());

        let decision = state.complete_reconcile(valid(0, &["root"]));
        assert_eq!(
            decision,
            ReconcileDecision::Applied {
                revision: 0,
                phase: SyncPhase::Clean
            }
        );
        assert_eq!(
            state.take_transitions(),
            vec![
                (SyncPhase::TextDirty, SyncPhase::Reconciling),
                (SyncPhase::Reconciling, SyncPhase::Clean)
            ]
        );
    }

    #[test]
    fn test_identical_text_is_ignored() {
        let mut state = opened();
        assert_eq!(state.accept_text("v0".into()), TextDecision::Ignored);
        assert_eq!(state.revision(), 0);
        assert_eq!(state.phase(), SyncPhase::Clean);
    }

    #[test]
    fn test_text_edits_bump_revision_and_coalesce() {
        let mut state = opened();
        assert_eq!(
            state.accept_text("v1".into()),
            TextDecision::Scheduled { revision: 1 }
        );
        assert_eq!(
            state.accept_text("v2".into()),
            TextDecision::Scheduled { revision: 2 }
        );

        let job = state.begin_reconcile().unwrap();
        assert_eq!(job.text, "v2");
        assert_eq!(job.revision, 2);
        assert_eq!(state.reconcile_count(), 2);
    }

    #[test]
    fn test_edit_during_reconcile_is_queued_and_stale_result_discarded() {
        let mut state = opened();
        state.accept_text("v1".into());
        let first = state.begin_reconcile().unwrap();

        assert_eq!(
            state.accept_text("v2".into()),
            TextDecision::Queued { revision: 2 }
        );
        assert_eq!(
            state.accept_text("v3".into()),
            TextDecision::Queued { revision: 3 }
        );

        let decision = state.complete_reconcile(valid(first.revision, &["root", "stale"]));
        assert_eq!(
            decision,
            ReconcileDecision::Discarded {
                revision: 1,
                latest: 3,
                rerun: true
            }
        );
        assert!(state.tree().unwrap().find_by_id("stale").is_none());

        let second = state.begin_reconcile().unwrap();
        assert_eq!(second.text, "v3");
        state.complete_reconcile(valid(second.revision, &["root", "fresh"]));
        assert!(state.tree().unwrap().contains("fresh"));
        assert_eq!(state.phase(), SyncPhase::Clean);
    }

    #[test]
    fn test_invalid_text_keeps_last_good_tree() {
        let mut state = opened();
        state.accept_text("broken".into());
        let job = state.begin_reconcile().unwrap();
        state.complete_reconcile(ReconcileOutcome {
            revision: job.revision,
            result: ReconcileResult::Invalid {
                diagnostics: vec![ParseDiagnostic::error("bad")],
            },
        });

        assert_eq!(state.phase(), SyncPhase::Invalid);
        assert_eq!(state.text(), "broken");
        assert_eq!(state.tree().unwrap().root_id(), "root");
        assert_eq!(state.diagnostics().len(), 1);
        assert!(state.tree_edits_allowed().is_err());

        state.accept_text("fixed".into());
        assert_eq!(state.phase(), SyncPhase::TextDirty);
        assert!(state.tree_edits_allowed().is_ok());
    }

    #[test]
    fn test_tree_edit_supersedes_in_flight_reconcile() {
        let mut state = opened();
        state.accept_text("typed".into());
        let job = state.begin_reconcile().unwrap();
        state.take_transitions();

        let revision = state.apply_tree_edit("edited".into(), tree(&["root", "n"]), &[], vec![]);
        assert_eq!(revision, 2);
        assert_eq!(state.phase(), SyncPhase::Clean);
        assert_eq!(
            state.take_transitions(),
            vec![
                (SyncPhase::Reconciling, SyncPhase::TreeDirty),
                (SyncPhase::TreeDirty, SyncPhase::Reconciling),
                (SyncPhase::Reconciling, SyncPhase::Clean)
            ]
        );

        let decision = state.complete_reconcile(valid(job.revision, &["root"]));
        assert_eq!(
            decision,
            ReconcileDecision::Discarded {
                revision: 1,
                latest: 2,
                rerun: false
            }
        );
        assert_eq!(state.text(), "edited");
        assert!(state.tree().unwrap().contains("n"));
    }

    #[test]
    fn test_ids_leaving_the_document_are_retired() {
        let mut state = opened();
        state.apply_tree_edit("a".into(), tree(&["root", "x", "y"]), &[], vec![]);
        state.apply_tree_edit("b".into(), tree(&["root", "y"]), &["x".to_string()], vec![]);
        assert!(state.retired().contains("x"));

        state.accept_text("c".into());
        let job = state.begin_reconcile().unwrap();
        state.complete_reconcile(valid(job.revision, &["root"]));
        assert!(state.retired().contains("y"));
    }
}
