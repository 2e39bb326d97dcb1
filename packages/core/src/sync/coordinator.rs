//! Sync Coordinator
//!
//! One actor task per open document. The actor exclusively owns the
//! document's [`SyncState`]; producers talk to it through a cloneable
//! [`DocumentHandle`] whose submit methods never block, and observe it
//! through a broadcast channel of [`SyncEvent`]s.
//!
//! ## Event loop
//!
//! ```text
//! commands ──┐
//! results ───┼──► select! ──► SyncState ──► SyncEvent broadcast
//! debounce ──┘
//! ```
//!
//! - text edits reset the debounce timer; expiry starts a reconcile
//! - tree edits run the mutation engine immediately and push new text out
//! - at most one reconcile runs at a time; results for superseded revisions
//!   are discarded
//!
//! Documents are fully independent: each has its own actor, channels and
//! state.

use super::events::SyncEvent;
use super::reconciler::{PipelineReconciler, ReconcileOutcome, Reconciler};
use super::state::{ReconcileDecision, SyncPhase, SyncState, TextDecision};
use super::timer::DebounceTimer;
use crate::codec::{locate_node, Dialect};
use crate::config::SyncConfig;
use crate::models::ParseDiagnostic;
use crate::services::{DocumentFiles, MindmapError, MutationEngine, TreeEdit};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot, RwLock};

/// Sync-layer failures seen by producers
#[derive(Error, Debug, Clone)]
pub enum SyncError {
    /// The document's actor has shut down
    #[error("Document '{key}' is closed")]
    Closed { key: String },

    #[error(transparent)]
    Document(#[from] MindmapError),
}

impl SyncError {
    pub fn closed(key: impl Into<String>) -> Self {
        Self::Closed { key: key.into() }
    }
}

/// Point-in-time view of a document's sync state
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncSnapshot {
    pub key: String,
    pub phase: SyncPhase,
    pub revision: u64,
    pub text: String,
    /// Last known good document, if any
    pub document: Option<Value>,
    pub diagnostics: Vec<ParseDiagnostic>,
    pub reconcile_count: u64,
}

enum Command {
    Text(String),
    Tree(TreeEdit),
    Jump(String),
    Save,
    Snapshot(oneshot::Sender<SyncSnapshot>),
    Close,
}

/// Cloneable producer/observer handle for one open document
#[derive(Clone)]
pub struct DocumentHandle {
    key: String,
    commands: mpsc::UnboundedSender<Command>,
    events: broadcast::Sender<SyncEvent>,
}

impl std::fmt::Debug for DocumentHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentHandle")
            .field("key", &self.key)
            .finish()
    }
}

impl DocumentHandle {
    pub fn key(&self) -> &str {
        &self.key
    }

    fn send(&self, command: Command) -> Result<(), SyncError> {
        self.commands
            .send(command)
            .map_err(|_| SyncError::closed(&self.key))
    }

    /// "External text changed to X"
    pub fn submit_text(&self, text: impl Into<String>) -> Result<(), SyncError> {
        self.send(Command::Text(text.into()))
    }

    /// "User requested structural edit Y"
    pub fn submit_tree_edit(&self, edit: TreeEdit) -> Result<(), SyncError> {
        self.send(Command::Tree(edit))
    }

    /// "User requested jump-to-node Z"; answered with [`SyncEvent::NodeLocated`]
    pub fn request_jump(&self, node_id: impl Into<String>) -> Result<(), SyncError> {
        self.send(Command::Jump(node_id.into()))
    }

    /// Write the canonical text to the document's file
    pub fn request_save(&self) -> Result<(), SyncError> {
        self.send(Command::Save)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    /// Ask the actor for its current state; answered after every command
    /// submitted before this call
    pub async fn snapshot(&self) -> Result<SyncSnapshot, SyncError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Snapshot(tx))?;
        rx.await.map_err(|_| SyncError::closed(&self.key))
    }

    fn close(&self) {
        let _ = self.commands.send(Command::Close);
    }

    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }
}

/// Registry of open documents, one actor each
pub struct SyncCoordinator {
    engine: Arc<MutationEngine>,
    reconciler: Arc<dyn Reconciler>,
    files: DocumentFiles,
    config: SyncConfig,
    documents: RwLock<HashMap<String, DocumentHandle>>,
}

impl SyncCoordinator {
    pub fn new(engine: Arc<MutationEngine>, config: SyncConfig) -> Self {
        let reconciler = Arc::new(PipelineReconciler::new(engine.codec().options().clone()));
        Self {
            engine,
            reconciler,
            files: DocumentFiles::new(),
            config,
            documents: RwLock::new(HashMap::new()),
        }
    }

    /// Replace the reconcile pipeline
    pub fn with_reconciler(mut self, reconciler: Arc<dyn Reconciler>) -> Self {
        self.reconciler = reconciler;
        self
    }

    /// Open an in-memory document
    ///
    /// The initial text is reconciled before this returns, so the handle
    /// starts out `Clean` or `Invalid`. Opening a key that is already open
    /// returns the existing handle.
    pub async fn open(
        &self,
        key: impl Into<String>,
        dialect: Dialect,
        text: impl Into<String>,
    ) -> DocumentHandle {
        self.open_inner(key.into(), dialect, text.into(), None).await
    }

    /// Open a document file; the path is both the key and the save target
    pub async fn open_file(&self, path: impl AsRef<Path>) -> Result<DocumentHandle, SyncError> {
        let path = path.as_ref();
        let key = path.display().to_string();
        if let Some(existing) = self.get(&key).await {
            return Ok(existing);
        }

        let dialect = self.files.dialect_for(path)?;
        let text = self.files.read(path).await?;
        Ok(self
            .open_inner(key, dialect, text, Some(path.to_path_buf()))
            .await)
    }

    async fn open_inner(
        &self,
        key: String,
        dialect: Dialect,
        text: String,
        save_path: Option<PathBuf>,
    ) -> DocumentHandle {
        if let Some(existing) = self.get(&key).await {
            tracing::debug!("Document {} already open", key);
            return existing;
        }

        // Initial reconcile runs without holding the registry lock
        let mut state = SyncState::new(dialect, text);
        if let Some(job) = state.begin_reconcile() {
            let revision = job.revision;
            let result = self.reconciler.reconcile(job).await;
            state.complete_reconcile(ReconcileOutcome { revision, result });
        }
        state.take_transitions();

        let mut documents = self.documents.write().await;
        if let Some(existing) = documents.get(&key) {
            if !existing.is_closed() {
                tracing::debug!("Document {} opened concurrently; keeping the first", key);
                return existing.clone();
            }
        }

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, _) = broadcast::channel(self.config.event_capacity);
        let handle = DocumentHandle {
            key: key.clone(),
            commands: command_tx,
            events: event_tx.clone(),
        };

        tracing::info!(
            "📄 Opened {} ({} dialect, phase {})",
            key,
            dialect,
            state.phase()
        );

        let actor = DocumentActor {
            key: key.clone(),
            state,
            engine: Arc::clone(&self.engine),
            reconciler: Arc::clone(&self.reconciler),
            files: self.files,
            save_path,
            timer: DebounceTimer::new(self.config.debounce()),
            events: event_tx,
        };
        tokio::spawn(actor.run(command_rx));

        documents.insert(key, handle.clone());
        handle
    }

    pub async fn get(&self, key: &str) -> Option<DocumentHandle> {
        self.documents
            .read()
            .await
            .get(key)
            .filter(|handle| !handle.is_closed())
            .cloned()
    }

    /// Close a document and stop its actor; returns whether it was open
    pub async fn close(&self, key: &str) -> bool {
        match self.documents.write().await.remove(key) {
            Some(handle) => {
                handle.close();
                tracing::info!("Closed {}", key);
                true
            }
            None => false,
        }
    }

    pub async fn open_documents(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .documents
            .read()
            .await
            .iter()
            .filter(|(_, handle)| !handle.is_closed())
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        keys
    }
}

/// The per-document actor; sole owner of its state
struct DocumentActor {
    key: String,
    state: SyncState,
    engine: Arc<MutationEngine>,
    reconciler: Arc<dyn Reconciler>,
    files: DocumentFiles,
    save_path: Option<PathBuf>,
    timer: DebounceTimer,
    events: broadcast::Sender<SyncEvent>,
}

impl DocumentActor {
    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        let (result_tx, mut results) = mpsc::unbounded_channel::<ReconcileOutcome>();

        loop {
            tokio::select! {
                biased;

                command = commands.recv() => match command {
                    None | Some(Command::Close) => break,
                    Some(command) => self.handle_command(command, &result_tx).await,
                },

                Some(outcome) = results.recv() => self.finish_reconcile(outcome, &result_tx),

                _ = self.timer.expired(), if self.timer.is_armed() => {
                    self.timer.cancel();
                    tracing::debug!("Debounce expired for {}", self.key);
                    self.start_reconcile(&result_tx);
                }
            }
        }

        tracing::debug!("Sync actor for {} stopped", self.key);
    }

    fn emit(&self, event: SyncEvent) {
        // No subscribers is fine; events are notifications, not requests
        let _ = self.events.send(event);
    }

    fn emit_transitions(&mut self) {
        let revision = self.state.revision();
        for (from, to) in self.state.take_transitions() {
            self.emit(SyncEvent::PhaseChanged { from, to, revision });
        }
    }

    fn emit_document(&self) {
        let revision = self.state.revision();
        if let Some(tree) = self.state.tree() {
            self.emit(SyncEvent::TreeChanged {
                revision,
                document: tree.to_document(),
            });
        }
        self.emit(SyncEvent::Diagnostics {
            revision,
            diagnostics: self.state.diagnostics().to_vec(),
        });
    }

    async fn handle_command(
        &mut self,
        command: Command,
        result_tx: &mpsc::UnboundedSender<ReconcileOutcome>,
    ) {
        match command {
            Command::Text(text) => self.handle_text(text),
            Command::Tree(edit) => self.handle_tree_edit(edit),
            Command::Jump(node_id) => self.handle_jump(node_id),
            Command::Save => self.handle_save().await,
            Command::Snapshot(reply) => {
                let _ = reply.send(self.snapshot());
            }
            Command::Close => {}
        }
        // A completed reconcile may have left queued work behind
        if self.state.in_flight().is_none() && !self.timer.is_armed() {
            self.start_reconcile(result_tx);
        }
    }

    fn handle_text(&mut self, text: String) {
        match self.state.accept_text(text) {
            TextDecision::Ignored => {
                tracing::debug!("Ignoring unchanged text for {}", self.key);
            }
            TextDecision::Scheduled { revision } => {
                tracing::debug!(
                    "Text edit rev {} for {}; reconciling in {:?}",
                    revision,
                    self.key,
                    self.timer.delay()
                );
                self.timer.reset();
            }
            TextDecision::Queued { revision } => {
                tracing::debug!("Text edit rev {} for {} queued behind reconcile", revision, self.key);
            }
        }
        self.emit_transitions();
    }

    fn handle_tree_edit(&mut self, edit: TreeEdit) {
        let kind = edit.kind().to_string();

        if let Err(reason) = self.state.tree_edits_allowed() {
            tracing::warn!("Rejected {} on {}: {}", kind, self.key, reason);
            let error = MindmapError::validation(reason, self.state.diagnostics().to_vec());
            self.emit(SyncEvent::EditRejected {
                kind,
                error: error.to_tool_error(),
            });
            return;
        }

        let result = self.engine.apply(
            self.state.text(),
            self.state.dialect(),
            &edit,
            self.state.retired(),
        );

        match result {
            Ok(outcome) => {
                self.timer.cancel();
                let revision = self.state.apply_tree_edit(
                    outcome.text,
                    outcome.tree,
                    &outcome.removed_ids,
                    outcome.warnings,
                );
                self.emit_transitions();
                self.emit(SyncEvent::EditApplied {
                    revision,
                    kind,
                    node_id: outcome.node_id,
                });
                self.emit(SyncEvent::TextChanged {
                    revision,
                    text: self.state.text().to_string(),
                });
                self.emit_document();
            }
            Err(e) => {
                tracing::warn!("Rejected {} on {}: {}", kind, self.key, e);
                self.emit(SyncEvent::EditRejected {
                    kind,
                    error: e.to_tool_error(),
                });
            }
        }
    }

    fn handle_jump(&self, node_id: String) {
        let location = locate_node(self.state.text(), self.state.dialect(), &node_id);
        if location.is_none() {
            tracing::debug!("Node {} not found in text of {}", node_id, self.key);
        }
        self.emit(SyncEvent::NodeLocated { node_id, location });
    }

    async fn handle_save(&self) {
        let revision = self.state.revision();
        let Some(path) = self.save_path.clone() else {
            let error = MindmapError::file(&self.key, "document has no file to save to");
            self.emit(SyncEvent::SaveFailed {
                error: error.to_tool_error(),
            });
            return;
        };

        match self.files.write_atomic(&path, self.state.text()).await {
            Ok(()) => {
                tracing::info!("💾 Saved {} at rev {}", path.display(), revision);
                self.emit(SyncEvent::SaveCompleted { revision, path });
            }
            Err(e) => {
                tracing::error!("Save of {} failed: {}", path.display(), e);
                self.emit(SyncEvent::SaveFailed {
                    error: e.to_tool_error(),
                });
            }
        }
    }

    fn start_reconcile(&mut self, result_tx: &mpsc::UnboundedSender<ReconcileOutcome>) {
        let Some(job) = self.state.begin_reconcile() else {
            return;
        };
        let revision = job.revision;
        self.emit_transitions();
        self.emit(SyncEvent::ReconcileStarted { revision });

        let reconciler = Arc::clone(&self.reconciler);
        let tx = result_tx.clone();
        tokio::spawn(async move {
            let result = reconciler.reconcile(job).await;
            // The actor may have closed meanwhile
            let _ = tx.send(ReconcileOutcome { revision, result });
        });
    }

    fn finish_reconcile(
        &mut self,
        outcome: ReconcileOutcome,
        result_tx: &mpsc::UnboundedSender<ReconcileOutcome>,
    ) {
        match self.state.complete_reconcile(outcome) {
            ReconcileDecision::Applied { revision, phase } => {
                tracing::debug!("Reconciled {} at rev {} -> {}", self.key, revision, phase);
                self.emit_transitions();
                if phase == SyncPhase::Invalid {
                    self.emit(SyncEvent::Diagnostics {
                        revision,
                        diagnostics: self.state.diagnostics().to_vec(),
                    });
                } else {
                    self.emit_document();
                }
            }
            ReconcileDecision::Discarded {
                revision,
                latest,
                rerun,
            } => {
                self.emit(SyncEvent::ReconcileDiscarded { revision, latest });
                if rerun {
                    self.start_reconcile(result_tx);
                }
            }
        }
    }

    fn snapshot(&self) -> SyncSnapshot {
        SyncSnapshot {
            key: self.key.clone(),
            phase: self.state.phase(),
            revision: self.state.revision(),
            text: self.state.text().to_string(),
            document: self.state.tree().map(|tree| tree.to_document()),
            diagnostics: self.state.diagnostics().to_vec(),
            reconcile_count: self.state.reconcile_count(),
        }
    }
}
