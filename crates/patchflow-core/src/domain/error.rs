//! Error taxonomy for patchflow.

use super::step::Step;

/// Reasons a [`ChangePlan`](super::plan::ChangePlan) or edit path is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlanError {
    #[error("ticket id must not be empty")]
    EmptyTicketId,

    #[error("plan must contain at least one edit")]
    NoEdits,

    #[error("invalid path {path:?}: {reason}")]
    InvalidPath { path: String, reason: &'static str },

    #[error("edit for {path} has no intent")]
    EmptyIntent { path: String },

    #[error("plan ticket {plan} does not match task ticket {task}")]
    TicketMismatch { plan: String, task: String },

    #[error("plans with edits must include a test-related check")]
    MissingTestCheck,
}

/// Terminal failures of a pipeline run.
///
/// The first four variants are workflow outcomes (the pipeline did what it was
/// told and the answer was "no"). `ContractViolation` and `MissingArtifact`
/// are integration faults. `Capability` carries a collaborator's own error
/// unchanged so the host can decide whether to retry.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("plan for {ticket_id} failed validation: {source}")]
    InvalidPlan {
        ticket_id: String,
        #[source]
        source: PlanError,
    },

    #[error("CI failed for commit {commit_sha}; aborting before PR creation")]
    CiFailed {
        commit_sha: String,
        url: Option<String>,
        details: Option<String>,
    },

    #[error("review rejected {pr_url} and no remediation path is configured")]
    ReviewRejected {
        pr_url: String,
        feedback: Option<String>,
    },

    #[error("changes requested on {pr_url} remain unresolved")]
    ChangesUnresolved {
        pr_url: String,
        feedback: Option<String>,
    },

    #[error("contract violation in {step}: {reason}")]
    ContractViolation { step: Step, reason: String },

    #[error("runtime did not capture required artifact: {artifact}")]
    MissingArtifact { artifact: &'static str },

    #[error("{step} failed: {source}")]
    Capability {
        step: Step,
        #[source]
        source: anyhow::Error,
    },
}

impl PipelineError {
    /// The step at which the run stopped, when one applies.
    pub fn step(&self) -> Option<Step> {
        match self {
            PipelineError::InvalidPlan { .. } => Some(Step::PlanChanges),
            PipelineError::CiFailed { .. } => Some(Step::RunCi),
            PipelineError::ReviewRejected { .. } => Some(Step::AwaitReview),
            PipelineError::ChangesUnresolved { .. } => Some(Step::AddressFeedback),
            PipelineError::ContractViolation { step, .. } => Some(*step),
            PipelineError::Capability { step, .. } => Some(*step),
            PipelineError::MissingArtifact { .. } => None,
        }
    }

    /// Short machine-friendly label for logs and alerts.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::InvalidPlan { .. } => "invalid_plan",
            PipelineError::CiFailed { .. } => "ci_failed",
            PipelineError::ReviewRejected { .. } => "review_rejected",
            PipelineError::ChangesUnresolved { .. } => "changes_unresolved",
            PipelineError::ContractViolation { .. } => "contract_violation",
            PipelineError::MissingArtifact { .. } => "missing_artifact",
            PipelineError::Capability { .. } => "capability",
        }
    }

    /// Policy failures: validation, CI, rejected or unresolved review.
    pub fn is_workflow_failure(&self) -> bool {
        matches!(
            self,
            PipelineError::InvalidPlan { .. }
                | PipelineError::CiFailed { .. }
                | PipelineError::ReviewRejected { .. }
                | PipelineError::ChangesUnresolved { .. }
        )
    }

    /// Programming or integration faults, never a workflow outcome.
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            PipelineError::ContractViolation { .. } | PipelineError::MissingArtifact { .. }
        )
    }

    /// Unwrap a collaborator error, handing back everything else unchanged.
    pub fn into_source(self) -> std::result::Result<anyhow::Error, PipelineError> {
        match self {
            PipelineError::Capability { source, .. } => Ok(source),
            other => Err(other),
        }
    }
}

/// Result type for pipeline runs.
pub type Result<T> = std::result::Result<T, PipelineError>;
