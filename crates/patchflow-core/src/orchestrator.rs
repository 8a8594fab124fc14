//! The coding-task state machine.
//!
//! ```text
//! Start → Planned → ContextFetched → DiffsApplied → CiEvaluated → PrCreated
//!       → ReviewEvaluated → Done
//!                         ↘ FeedbackAddressed → ReviewEvaluated → Done | Failed
//!                         ↘ Failed
//! ```
//!
//! Steps run strictly one after another. The orchestrator never retries a
//! step and never reads the workflow specification; retries and timeouts
//! belong to whatever host runs it. Exactly one remediation attempt is made
//! after a rejected review.

use serde::Serialize;
use tracing::{debug, warn, Instrument};

use crate::domain::{PipelineError, Result, Step, TaskInput};
use crate::metrics::METRICS;
use crate::obs;
use crate::toolkit::Toolkit;

/// States visited by a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Start,
    Planned,
    ContextFetched,
    DiffsApplied,
    CiEvaluated,
    PrCreated,
    ReviewEvaluated,
    FeedbackAddressed,
    Done,
    Failed,
}

impl PipelineState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineState::Start => "start",
            PipelineState::Planned => "planned",
            PipelineState::ContextFetched => "context_fetched",
            PipelineState::DiffsApplied => "diffs_applied",
            PipelineState::CiEvaluated => "ci_evaluated",
            PipelineState::PrCreated => "pr_created",
            PipelineState::ReviewEvaluated => "review_evaluated",
            PipelineState::FeedbackAddressed => "feedback_addressed",
            PipelineState::Done => "done",
            PipelineState::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Done | PipelineState::Failed)
    }
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a run plus every state it passed through.
#[derive(Debug)]
pub struct RunTrace {
    pub states: Vec<PipelineState>,
    pub outcome: Result<String>,
}

impl RunTrace {
    pub fn final_state(&self) -> PipelineState {
        self.states.last().copied().unwrap_or(PipelineState::Start)
    }
}

/// Records transitions as they happen.
struct Transitions {
    states: Vec<PipelineState>,
}

impl Transitions {
    fn new() -> Self {
        Self {
            states: vec![PipelineState::Start],
        }
    }

    fn current(&self) -> PipelineState {
        self.states.last().copied().unwrap_or(PipelineState::Start)
    }

    /// Terminal states are final; later transitions are dropped.
    fn advance(&mut self, to: PipelineState) {
        let from = self.current();
        if from.is_terminal() {
            warn!(from = %from, to = %to, "ignoring transition out of terminal state");
            return;
        }
        obs::emit_transition(from.as_str(), to.as_str(), to.is_terminal());
        self.states.push(to);
    }
}

fn capability(step: Step) -> impl FnOnce(anyhow::Error) -> PipelineError {
    move |source| PipelineError::Capability { step, source }
}

fn require_non_empty(step: Step, what: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(PipelineError::ContractViolation {
            step,
            reason: format!("{what} must not be empty"),
        });
    }
    Ok(())
}

/// Sequences one task through the toolkit.
pub struct Orchestrator<T: Toolkit> {
    toolkit: T,
}

impl<T: Toolkit> Orchestrator<T> {
    pub fn new(toolkit: T) -> Self {
        Self { toolkit }
    }

    pub fn toolkit(&self) -> &T {
        &self.toolkit
    }

    pub fn into_toolkit(self) -> T {
        self.toolkit
    }

    /// Drive `task` to a terminal state and return the pull request URL.
    pub async fn run(&self, task: &TaskInput) -> Result<String> {
        self.run_traced(task).await.outcome
    }

    /// Like [`Orchestrator::run`], also returning the visited states.
    pub async fn run_traced(&self, task: &TaskInput) -> RunTrace {
        let run_id = uuid::Uuid::new_v4().to_string();
        let span = obs::task_span(&task.ticket_id, &run_id);

        async {
            METRICS.inc_runs_started();
            obs::emit_run_started(&task.ticket_id, &task.repository, &task.base_branch);

            let mut transitions = Transitions::new();
            let outcome = self.drive(task, &mut transitions).await;

            match &outcome {
                Ok(pr_url) => {
                    let remediated = transitions
                        .states
                        .contains(&PipelineState::FeedbackAddressed);
                    transitions.advance(PipelineState::Done);
                    METRICS.inc_runs_succeeded();
                    obs::emit_run_finished(&task.ticket_id, pr_url, remediated);
                }
                Err(err) => {
                    transitions.advance(PipelineState::Failed);
                    METRICS.inc_runs_failed();
                    obs::emit_run_failed(&task.ticket_id, err);
                }
            }

            RunTrace {
                states: transitions.states,
                outcome,
            }
        }
        .instrument(span)
        .await
    }

    async fn drive(&self, task: &TaskInput, transitions: &mut Transitions) -> Result<String> {
        require_non_empty(Step::PlanChanges, "task ticket id", &task.ticket_id)?;

        obs::emit_step_started(Step::PlanChanges);
        let plan = self
            .toolkit
            .plan_changes(task)
            .await
            .map_err(capability(Step::PlanChanges))?;
        plan.validate_for(&task.ticket_id)
            .map_err(|source| PipelineError::InvalidPlan {
                ticket_id: task.ticket_id.clone(),
                source,
            })?;
        transitions.advance(PipelineState::Planned);
        debug!(plan_digest = %plan.digest(), edits = plan.edits.len(), "plan accepted");

        obs::emit_step_started(Step::FetchContext);
        let context = self
            .toolkit
            .fetch_context(task, &plan)
            .await
            .map_err(capability(Step::FetchContext))?;
        transitions.advance(PipelineState::ContextFetched);

        obs::emit_step_started(Step::ApplyDiffs);
        let commit_sha = self
            .toolkit
            .apply_diffs(task, &plan, &context)
            .await
            .map_err(capability(Step::ApplyDiffs))?;
        require_non_empty(Step::ApplyDiffs, "commit sha", &commit_sha)?;
        transitions.advance(PipelineState::DiffsApplied);

        obs::emit_step_started(Step::RunCi);
        let ci = self
            .toolkit
            .run_ci(task, &plan, &commit_sha)
            .await
            .map_err(capability(Step::RunCi))?;
        transitions.advance(PipelineState::CiEvaluated);
        if !ci.passed {
            return Err(PipelineError::CiFailed {
                commit_sha,
                url: ci.url,
                details: ci.details,
            });
        }

        obs::emit_step_started(Step::OpenPr);
        let pr_url = self
            .toolkit
            .open_pr(task, &plan, &commit_sha, &ci)
            .await
            .map_err(capability(Step::OpenPr))?;
        require_non_empty(Step::OpenPr, "pull request url", &pr_url)?;
        transitions.advance(PipelineState::PrCreated);

        obs::emit_step_started(Step::AwaitReview);
        let review = self
            .toolkit
            .await_review(task, &pr_url)
            .await
            .map_err(capability(Step::AwaitReview))?;
        transitions.advance(PipelineState::ReviewEvaluated);
        if review.approved {
            return Ok(pr_url);
        }

        if !self.toolkit.supports_remediation() {
            return Err(PipelineError::ReviewRejected {
                pr_url,
                feedback: review.feedback,
            });
        }

        obs::emit_step_started(Step::AddressFeedback);
        METRICS.inc_remediations();
        let updated = self
            .toolkit
            .address_feedback(task, &pr_url, &review)
            .await
            .map_err(capability(Step::AddressFeedback))?;
        transitions.advance(PipelineState::FeedbackAddressed);
        transitions.advance(PipelineState::ReviewEvaluated);
        if !updated.approved {
            return Err(PipelineError::ChangesUnresolved {
                pr_url,
                feedback: updated.feedback,
            });
        }

        Ok(pr_url)
    }
}
