//! Two-channel document synchronization
//!
//! A document can change through its text (someone typed) or through its
//! tree (a structural edit). Both channels converge on one state machine
//! per document, run by an actor that debounces text edits, reconciles
//! text into a tree, and pushes tree edits back out as canonical text.

mod coordinator;
mod events;
mod reconciler;
mod state;
mod timer;

pub use coordinator::{DocumentHandle, SyncCoordinator, SyncError, SyncSnapshot};
pub use events::SyncEvent;
pub use reconciler::{
    PipelineReconciler, ReconcileJob, ReconcileOutcome, ReconcileResult, Reconciler,
};
pub use state::{ReconcileDecision, SyncPhase, SyncState, TextDecision};
pub use timer::DebounceTimer;
