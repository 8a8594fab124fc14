//! Names of the pipeline steps shared by the orchestrator, runtime and
//! workflow specification.

use serde::{Deserialize, Serialize};

/// One step of the coding-task pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Step {
    PlanChanges,
    FetchContext,
    ApplyDiffs,
    #[serde(rename = "RunCI")]
    RunCi,
    #[serde(rename = "OpenPR")]
    OpenPr,
    AwaitReview,
    AddressFeedback,
}

impl Step {
    /// Every step in pipeline order. `AddressFeedback` only runs after a rejection.
    pub const ALL: [Step; 7] = [
        Step::PlanChanges,
        Step::FetchContext,
        Step::ApplyDiffs,
        Step::RunCi,
        Step::OpenPr,
        Step::AwaitReview,
        Step::AddressFeedback,
    ];

    /// The wire name used in notifications, logs and workflow activities.
    pub fn as_str(&self) -> &'static str {
        match self {
            Step::PlanChanges => "PlanChanges",
            Step::FetchContext => "FetchContext",
            Step::ApplyDiffs => "ApplyDiffs",
            Step::RunCi => "RunCI",
            Step::OpenPr => "OpenPR",
            Step::AwaitReview => "AwaitReview",
            Step::AddressFeedback => "AddressFeedback",
        }
    }

    /// Whether the step touches VCS, CI or the review channel.
    pub fn has_side_effects(&self) -> bool {
        !matches!(self, Step::PlanChanges | Step::FetchContext)
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
