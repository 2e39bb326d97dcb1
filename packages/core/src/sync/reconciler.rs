//! Reconcile pipeline
//!
//! Parse, validate and rebuild the tree for one revision of the canonical
//! text. The coordinator runs this off its own task and ignores results that
//! come back for a superseded revision.

use crate::codec::{CodecOptions, Dialect, FormatCodec};
use crate::models::ParseDiagnostic;
use crate::services::{locate_diagnostics, SchemaValidator};
use crate::tree::NodeTree;
use async_trait::async_trait;

/// Input for one reconcile run
#[derive(Debug, Clone, PartialEq)]
pub struct ReconcileJob {
    pub revision: u64,
    pub dialect: Dialect,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileResult {
    /// Text parsed and validated; warnings may still be present
    Valid {
        tree: NodeTree,
        warnings: Vec<ParseDiagnostic>,
    },
    /// Blank or comment-only text: nothing to show
    Empty,
    /// Parse or validation errors; the previous good tree stays in place
    Invalid { diagnostics: Vec<ParseDiagnostic> },
}

/// A finished reconcile, tagged with the revision it ran for
#[derive(Debug, Clone, PartialEq)]
pub struct ReconcileOutcome {
    pub revision: u64,
    pub result: ReconcileResult,
}

/// Runs the reconcile pipeline
///
/// The default implementation is [`PipelineReconciler`]; tests substitute
/// implementations that count calls or hold results back.
#[async_trait]
pub trait Reconciler: Send + Sync {
    async fn reconcile(&self, job: ReconcileJob) -> ReconcileResult;
}

/// Codec + validator + tree build
#[derive(Debug, Clone, Default)]
pub struct PipelineReconciler {
    codec: FormatCodec,
    validator: SchemaValidator,
}

impl PipelineReconciler {
    pub fn new(options: CodecOptions) -> Self {
        Self {
            codec: FormatCodec::new(options),
            validator: SchemaValidator::new(),
        }
    }

    /// Synchronous pipeline body
    pub fn run(&self, job: &ReconcileJob) -> ReconcileResult {
        let doc = match self.codec.parse(&job.text, job.dialect) {
            Ok(outcome) => match outcome.into_document() {
                Some(doc) => doc,
                None => return ReconcileResult::Empty,
            },
            Err(e) => {
                return ReconcileResult::Invalid {
                    diagnostics: e.diagnostics().to_vec(),
                }
            }
        };

        let mut result = self.validator.validate(&doc);
        locate_diagnostics(&job.text, job.dialect, &doc, &mut result);
        if !result.valid {
            return ReconcileResult::Invalid {
                diagnostics: result.into_diagnostics(),
            };
        }

        match NodeTree::build(&doc) {
            Ok(tree) => ReconcileResult::Valid {
                tree,
                warnings: result.warnings,
            },
            Err(e) => ReconcileResult::Invalid {
                diagnostics: vec![ParseDiagnostic::error(e.to_string())],
            },
        }
    }
}

#[async_trait]
impl Reconciler for PipelineReconciler {
    async fn reconcile(&self, job: ReconcileJob) -> ReconcileResult {
        let pipeline = self.clone();
        match tokio::task::spawn_blocking(move || pipeline.run(&job)).await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!("Reconcile task failed: {}", e);
                ReconcileResult::Invalid {
                    diagnostics: vec![ParseDiagnostic::error(format!(
                        "Internal error while reconciling: {}",
                        e
                    ))],
                }
            }
        }
    }
}
