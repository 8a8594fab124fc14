//! Shared fixtures: sample plans and a call-recording stub toolkit.

#![allow(dead_code)]

use std::sync::Mutex;

use async_trait::async_trait;
use patchflow_core::{ChangePlan, CiResult, ReviewResult, TaskInput, Toolkit};
use serde_json::{json, Value};

pub fn feature_plan() -> ChangePlan {
    ChangePlan::new("ENG-1423", "Add retries to payment client")
        .with_constraint("no API change")
        .with_constraint("add unit tests")
        .with_edit("pkg/payments/client.py", "wrap calls with retry")
        .with_edit("tests/test_payments_client.py", "add flaky API test")
        .with_risk("timeout propagation")
        .with_risk("idempotency")
        .with_check("pytest -k payments")
        .with_check("lint")
}

pub fn task(ticket_id: &str) -> TaskInput {
    TaskInput::new(ticket_id, "git@example/repo", "main")
}

/// Deterministic toolkit that records every call by step name.
pub struct StubToolkit {
    pub plan: ChangePlan,
    pub commit_sha: String,
    pub ci: CiResult,
    pub review: ReviewResult,
    pub remediation: Option<ReviewResult>,
    pub fail_step: Option<&'static str>,
    calls: Mutex<Vec<&'static str>>,
}

impl StubToolkit {
    /// All steps succeed; no remediation capability.
    pub fn passing(plan: ChangePlan) -> Self {
        Self {
            plan,
            commit_sha: "demo-commit-sha".to_string(),
            ci: CiResult::passed().with_url("https://ci.example/jobs/123"),
            review: ReviewResult::approved(),
            remediation: None,
            fail_step: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_ci(mut self, ci: CiResult) -> Self {
        self.ci = ci;
        self
    }

    pub fn with_review(mut self, review: ReviewResult) -> Self {
        self.review = review;
        self
    }

    pub fn with_remediation(mut self, review: ReviewResult) -> Self {
        self.remediation = Some(review);
        self
    }

    pub fn with_commit_sha(mut self, sha: &str) -> Self {
        self.commit_sha = sha.to_string();
        self
    }

    /// Make the named step return a collaborator error.
    pub fn failing_at(mut self, step: &'static str) -> Self {
        self.fail_step = Some(step);
        self
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, name: &str) -> usize {
        self.calls().iter().filter(|c| **c == name).count()
    }

    fn record(&self, name: &'static str) -> anyhow::Result<()> {
        self.calls.lock().unwrap().push(name);
        if self.fail_step == Some(name) {
            anyhow::bail!("{name} backend unavailable");
        }
        Ok(())
    }
}

#[async_trait]
impl Toolkit for StubToolkit {
    type Context = Value;

    async fn plan_changes(&self, _task: &TaskInput) -> anyhow::Result<ChangePlan> {
        self.record("plan")?;
        Ok(self.plan.clone())
    }

    async fn fetch_context(&self, _task: &TaskInput, plan: &ChangePlan) -> anyhow::Result<Value> {
        self.record("fetch")?;
        Ok(json!({ "files": plan.edit_paths() }))
    }

    async fn apply_diffs(
        &self,
        _task: &TaskInput,
        _plan: &ChangePlan,
        _context: &Value,
    ) -> anyhow::Result<String> {
        self.record("apply")?;
        Ok(self.commit_sha.clone())
    }

    async fn run_ci(
        &self,
        _task: &TaskInput,
        _plan: &ChangePlan,
        _commit_sha: &str,
    ) -> anyhow::Result<CiResult> {
        self.record("ci")?;
        Ok(self.ci.clone())
    }

    async fn open_pr(
        &self,
        task: &TaskInput,
        _plan: &ChangePlan,
        _commit_sha: &str,
        _ci: &CiResult,
    ) -> anyhow::Result<String> {
        self.record("pr")?;
        Ok(format!("https://git.example/{}/pull/1", task.ticket_id))
    }

    async fn await_review(&self, _task: &TaskInput, _pr_url: &str) -> anyhow::Result<ReviewResult> {
        self.record("await")?;
        Ok(self.review.clone())
    }

    fn supports_remediation(&self) -> bool {
        self.remediation.is_some()
    }

    async fn address_feedback(
        &self,
        _task: &TaskInput,
        _pr_url: &str,
        _review: &ReviewResult,
    ) -> anyhow::Result<ReviewResult> {
        self.record("feedback")?;
        self.remediation
            .clone()
            .ok_or_else(|| anyhow::anyhow!("no remediation configured"))
    }
}
