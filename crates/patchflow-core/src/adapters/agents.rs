//! Agent-facing adapter traits and the toolkit that composes them.
//!
//! Each collaborator (planner, retriever, coder, CI runner, pull request
//! service, review channel, feedback resolver) gets its own narrow trait.
//! [`AgentsToolkitBuilder`] assembles them into an [`AgentsToolkit`], which
//! implements [`Toolkit`] by pure delegation.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{ChangePlan, CiResult, ReviewResult, TaskInput};
use crate::toolkit::Toolkit;

#[async_trait]
pub trait Planner: Send + Sync {
    async fn plan(&self, task: &TaskInput) -> anyhow::Result<ChangePlan>;
}

/// Fetches code context (search/read) for a plan.
#[async_trait]
pub trait Retriever<C>: Send + Sync {
    async fn fetch(&self, task: &TaskInput, plan: &ChangePlan) -> anyhow::Result<C>;
}

/// Applies diffs and returns the resulting commit SHA.
#[async_trait]
pub trait Coder<C>: Send + Sync {
    async fn apply(&self, task: &TaskInput, plan: &ChangePlan, context: &C)
        -> anyhow::Result<String>;
}

/// Build and test execution.
#[async_trait]
pub trait CiRunner: Send + Sync {
    async fn execute(
        &self,
        task: &TaskInput,
        plan: &ChangePlan,
        commit_sha: &str,
    ) -> anyhow::Result<CiResult>;
}

#[async_trait]
pub trait PullRequests: Send + Sync {
    async fn open(
        &self,
        task: &TaskInput,
        plan: &ChangePlan,
        commit_sha: &str,
        ci: &CiResult,
    ) -> anyhow::Result<String>;
}

/// Where reviewer decisions come from.
#[async_trait]
pub trait ReviewChannel: Send + Sync {
    async fn resolve(&self, task: &TaskInput, pr_url: &str) -> anyhow::Result<ReviewResult>;
}

/// Addresses reviewer feedback and reports the updated review state.
#[async_trait]
pub trait FeedbackResolver: Send + Sync {
    async fn fix(
        &self,
        task: &TaskInput,
        pr_url: &str,
        review: &ReviewResult,
    ) -> anyhow::Result<ReviewResult>;
}

/// Errors from [`AgentsToolkitBuilder::build`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ToolkitBuildError {
    #[error("toolkit is missing the {0} adapter")]
    MissingAdapter(&'static str),
}

/// A [`Toolkit`] backed by one adapter per capability.
pub struct AgentsToolkit<C> {
    planner: Arc<dyn Planner>,
    retriever: Arc<dyn Retriever<C>>,
    coder: Arc<dyn Coder<C>>,
    runner: Arc<dyn CiRunner>,
    pull_requests: Arc<dyn PullRequests>,
    reviewers: Arc<dyn ReviewChannel>,
    feedback: Option<Arc<dyn FeedbackResolver>>,
}

impl<C> AgentsToolkit<C> {
    pub fn builder() -> AgentsToolkitBuilder<C> {
        AgentsToolkitBuilder::default()
    }
}

#[async_trait]
impl<C: Send + Sync> Toolkit for AgentsToolkit<C> {
    type Context = C;

    async fn plan_changes(&self, task: &TaskInput) -> anyhow::Result<ChangePlan> {
        self.planner.plan(task).await
    }

    async fn fetch_context(&self, task: &TaskInput, plan: &ChangePlan) -> anyhow::Result<C> {
        self.retriever.fetch(task, plan).await
    }

    async fn apply_diffs(
        &self,
        task: &TaskInput,
        plan: &ChangePlan,
        context: &C,
    ) -> anyhow::Result<String> {
        self.coder.apply(task, plan, context).await
    }

    async fn run_ci(
        &self,
        task: &TaskInput,
        plan: &ChangePlan,
        commit_sha: &str,
    ) -> anyhow::Result<CiResult> {
        self.runner.execute(task, plan, commit_sha).await
    }

    async fn open_pr(
        &self,
        task: &TaskInput,
        plan: &ChangePlan,
        commit_sha: &str,
        ci: &CiResult,
    ) -> anyhow::Result<String> {
        self.pull_requests.open(task, plan, commit_sha, ci).await
    }

    async fn await_review(&self, task: &TaskInput, pr_url: &str) -> anyhow::Result<ReviewResult> {
        self.reviewers.resolve(task, pr_url).await
    }

    fn supports_remediation(&self) -> bool {
        self.feedback.is_some()
    }

    async fn address_feedback(
        &self,
        task: &TaskInput,
        pr_url: &str,
        review: &ReviewResult,
    ) -> anyhow::Result<ReviewResult> {
        match &self.feedback {
            Some(resolver) => resolver.fix(task, pr_url, review).await,
            None => anyhow::bail!("address_feedback adapter not configured"),
        }
    }
}

/// Collects adapters for an [`AgentsToolkit`]. The feedback resolver is optional.
pub struct AgentsToolkitBuilder<C> {
    planner: Option<Arc<dyn Planner>>,
    retriever: Option<Arc<dyn Retriever<C>>>,
    coder: Option<Arc<dyn Coder<C>>>,
    runner: Option<Arc<dyn CiRunner>>,
    pull_requests: Option<Arc<dyn PullRequests>>,
    reviewers: Option<Arc<dyn ReviewChannel>>,
    feedback: Option<Arc<dyn FeedbackResolver>>,
}

impl<C> Default for AgentsToolkitBuilder<C> {
    fn default() -> Self {
        Self {
            planner: None,
            retriever: None,
            coder: None,
            runner: None,
            pull_requests: None,
            reviewers: None,
            feedback: None,
        }
    }
}

impl<C> AgentsToolkitBuilder<C> {
    pub fn planner(mut self, planner: Arc<dyn Planner>) -> Self {
        self.planner = Some(planner);
        self
    }

    pub fn retriever(mut self, retriever: Arc<dyn Retriever<C>>) -> Self {
        self.retriever = Some(retriever);
        self
    }

    pub fn coder(mut self, coder: Arc<dyn Coder<C>>) -> Self {
        self.coder = Some(coder);
        self
    }

    pub fn runner(mut self, runner: Arc<dyn CiRunner>) -> Self {
        self.runner = Some(runner);
        self
    }

    pub fn pull_requests(mut self, pull_requests: Arc<dyn PullRequests>) -> Self {
        self.pull_requests = Some(pull_requests);
        self
    }

    pub fn reviewers(mut self, reviewers: Arc<dyn ReviewChannel>) -> Self {
        self.reviewers = Some(reviewers);
        self
    }

    pub fn feedback(mut self, feedback: Arc<dyn FeedbackResolver>) -> Self {
        self.feedback = Some(feedback);
        self
    }

    pub fn build(self) -> Result<AgentsToolkit<C>, ToolkitBuildError> {
        use ToolkitBuildError::MissingAdapter;
        Ok(AgentsToolkit {
            planner: self.planner.ok_or(MissingAdapter("planner"))?,
            retriever: self.retriever.ok_or(MissingAdapter("retriever"))?,
            coder: self.coder.ok_or(MissingAdapter("coder"))?,
            runner: self.runner.ok_or(MissingAdapter("runner"))?,
            pull_requests: self.pull_requests.ok_or(MissingAdapter("pull_requests"))?,
            reviewers: self.reviewers.ok_or(MissingAdapter("reviewers"))?,
            feedback: self.feedback,
        })
    }
}
