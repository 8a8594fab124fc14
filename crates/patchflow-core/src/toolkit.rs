//! The capability record the orchestrator delegates every step to.
//!
//! A `Toolkit` performs no validation, retries or sequencing of its own. Its
//! only job is to bind real agents, VCS, CI and the review channel to the
//! step contracts, so the orchestrator can be built and tested without them.
//! Errors are plain `anyhow::Error` and reach the caller unchanged.

use async_trait::async_trait;

use crate::domain::{ChangePlan, CiResult, ReviewResult, TaskInput};

/// One async method per pipeline step.
#[async_trait]
pub trait Toolkit: Send + Sync {
    /// Whatever the retriever hands the coder. The orchestrator never looks inside.
    type Context: Send + Sync;

    async fn plan_changes(&self, task: &TaskInput) -> anyhow::Result<ChangePlan>;

    async fn fetch_context(
        &self,
        task: &TaskInput,
        plan: &ChangePlan,
    ) -> anyhow::Result<Self::Context>;

    /// Apply the plan and return the resulting commit SHA.
    async fn apply_diffs(
        &self,
        task: &TaskInput,
        plan: &ChangePlan,
        context: &Self::Context,
    ) -> anyhow::Result<String>;

    async fn run_ci(
        &self,
        task: &TaskInput,
        plan: &ChangePlan,
        commit_sha: &str,
    ) -> anyhow::Result<CiResult>;

    /// Open a pull request and return its URL.
    async fn open_pr(
        &self,
        task: &TaskInput,
        plan: &ChangePlan,
        commit_sha: &str,
        ci: &CiResult,
    ) -> anyhow::Result<String>;

    /// Wait for a reviewer decision. In production this parks on a signal.
    async fn await_review(&self, task: &TaskInput, pr_url: &str) -> anyhow::Result<ReviewResult>;

    /// Whether [`Toolkit::address_feedback`] is backed by a real capability.
    fn supports_remediation(&self) -> bool {
        false
    }

    async fn address_feedback(
        &self,
        _task: &TaskInput,
        _pr_url: &str,
        _review: &ReviewResult,
    ) -> anyhow::Result<ReviewResult> {
        anyhow::bail!("address_feedback capability is not configured")
    }
}
