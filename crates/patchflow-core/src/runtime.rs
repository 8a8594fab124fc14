//! Runtime composition: step notifications around the orchestrator and a
//! richer [`RunResult`].
//!
//! The runtime wraps the caller's toolkit in an observing toolkit that
//! notifies an [`ExecutionObserver`] before each step and captures the plan,
//! commit and CI result on the way past. Observer errors are logged and
//! counted, never propagated.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::domain::{ChangePlan, CiResult, PipelineError, Result, ReviewResult, Step, TaskInput};
use crate::metrics::METRICS;
use crate::obs;
use crate::orchestrator::Orchestrator;
use crate::toolkit::Toolkit;

/// Receives a notification before every toolkit call.
pub trait ExecutionObserver: Send + Sync {
    /// Called with the step name and a small step-specific payload.
    ///
    /// Returning an error does not affect the run.
    fn on_step(&self, step: Step, payload: &Value) -> anyhow::Result<()>;
}

/// Everything a successful run produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub plan: ChangePlan,
    pub plan_digest: String,
    pub commit_sha: String,
    pub ci_result: CiResult,
    pub pr_url: String,
    /// Whether the single remediation attempt ran.
    pub remediated: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Captured {
    plan: Option<ChangePlan>,
    commit_sha: Option<String>,
    ci_result: Option<CiResult>,
    remediated: bool,
}

/// Toolkit decorator used for a single `execute` call.
struct ObservedToolkit<'a, T: Toolkit> {
    inner: &'a T,
    observer: Option<&'a dyn ExecutionObserver>,
    captured: Mutex<Captured>,
}

impl<'a, T: Toolkit> ObservedToolkit<'a, T> {
    fn new(inner: &'a T, observer: Option<&'a dyn ExecutionObserver>) -> Self {
        Self {
            inner,
            observer,
            captured: Mutex::new(Captured::default()),
        }
    }

    fn notify(&self, step: Step, payload: Value) {
        let Some(observer) = self.observer else {
            return;
        };
        if let Err(err) = observer.on_step(step, &payload) {
            METRICS.inc_observer_errors();
            obs::emit_observer_error(step, &err);
        }
    }

    fn captured(&self) -> MutexGuard<'_, Captured> {
        // Steps run one at a time; a poisoned lock still holds valid captures.
        self.captured.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn into_captured(self) -> Captured {
        self.captured.into_inner().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl<'a, T: Toolkit> Toolkit for ObservedToolkit<'a, T> {
    type Context = T::Context;

    async fn plan_changes(&self, task: &TaskInput) -> anyhow::Result<ChangePlan> {
        self.notify(Step::PlanChanges, json!({ "ticket_id": task.ticket_id }));
        let plan = self.inner.plan_changes(task).await?;
        self.captured().plan = Some(plan.clone());
        Ok(plan)
    }

    async fn fetch_context(
        &self,
        task: &TaskInput,
        plan: &ChangePlan,
    ) -> anyhow::Result<Self::Context> {
        self.notify(Step::FetchContext, json!({ "edits": plan.edits.len() }));
        self.inner.fetch_context(task, plan).await
    }

    async fn apply_diffs(
        &self,
        task: &TaskInput,
        plan: &ChangePlan,
        context: &Self::Context,
    ) -> anyhow::Result<String> {
        self.notify(Step::ApplyDiffs, json!({ "files": plan.edit_paths() }));
        let commit_sha = self.inner.apply_diffs(task, plan, context).await?;
        self.captured().commit_sha = Some(commit_sha.clone());
        Ok(commit_sha)
    }

    async fn run_ci(
        &self,
        task: &TaskInput,
        plan: &ChangePlan,
        commit_sha: &str,
    ) -> anyhow::Result<CiResult> {
        self.notify(Step::RunCi, json!({ "commit": commit_sha }));
        let ci = self.inner.run_ci(task, plan, commit_sha).await?;
        self.captured().ci_result = Some(ci.clone());
        Ok(ci)
    }

    async fn open_pr(
        &self,
        task: &TaskInput,
        plan: &ChangePlan,
        commit_sha: &str,
        ci: &CiResult,
    ) -> anyhow::Result<String> {
        self.notify(Step::OpenPr, json!({ "ci_url": ci.url }));
        self.inner.open_pr(task, plan, commit_sha, ci).await
    }

    async fn await_review(&self, task: &TaskInput, pr_url: &str) -> anyhow::Result<ReviewResult> {
        self.notify(Step::AwaitReview, json!({ "pr_url": pr_url }));
        self.inner.await_review(task, pr_url).await
    }

    fn supports_remediation(&self) -> bool {
        self.inner.supports_remediation()
    }

    async fn address_feedback(
        &self,
        task: &TaskInput,
        pr_url: &str,
        review: &ReviewResult,
    ) -> anyhow::Result<ReviewResult> {
        self.notify(Step::AddressFeedback, json!({ "feedback": review.feedback }));
        self.captured().remediated = true;
        self.inner.address_feedback(task, pr_url, review).await
    }
}

/// Binds a toolkit to the orchestrator and reports each step.
pub struct Runtime<T: Toolkit> {
    toolkit: T,
    observer: Option<Arc<dyn ExecutionObserver>>,
}

impl<T: Toolkit> Runtime<T> {
    pub fn new(toolkit: T) -> Self {
        Self {
            toolkit,
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn ExecutionObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn toolkit(&self) -> &T {
        &self.toolkit
    }

    /// Run `task` to completion and assemble the [`RunResult`].
    ///
    /// Reaching `Done` without a captured plan, commit or CI result is an
    /// internal fault and returns [`PipelineError::MissingArtifact`].
    pub async fn execute(&self, task: &TaskInput) -> Result<RunResult> {
        let started_at = Utc::now();
        let observed = ObservedToolkit::new(&self.toolkit, self.observer.as_deref());
        let orchestrator = Orchestrator::new(observed);

        let pr_url = orchestrator.run(task).await?;
        let captured = orchestrator.into_toolkit().into_captured();

        let plan = captured
            .plan
            .ok_or(PipelineError::MissingArtifact { artifact: "plan" })?;
        let commit_sha = captured
            .commit_sha
            .ok_or(PipelineError::MissingArtifact {
                artifact: "commit_sha",
            })?;
        let ci_result = captured
            .ci_result
            .ok_or(PipelineError::MissingArtifact {
                artifact: "ci_result",
            })?;

        Ok(RunResult {
            plan_digest: plan.digest(),
            plan,
            commit_sha,
            ci_result,
            pr_url,
            remediated: captured.remediated,
            started_at,
            finished_at: Utc::now(),
        })
    }
}
