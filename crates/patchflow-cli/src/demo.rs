//! Demo adapters: deterministic agents for every capability, a printing
//! observer, and a background reviewer that answers through the signal
//! gateway.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use patchflow_core::{
    AgentsToolkit, ChangePlan, CiResult, CiRunner, Coder, ExecutionObserver, FeedbackResolver,
    InProcessSignalGateway, Planner, PullRequests, Retriever, ReviewAwaiter, ReviewResult,
    RunResult, Runtime, Step, TaskInput, WorkflowSpec,
};
use serde_json::{json, Value};
use tracing::{debug, info};

pub const DEMO_COMMIT_SHA: &str = "demo-commit-sha";
pub const DEMO_CI_URL: &str = "https://ci.example/jobs/123";

/// Knobs for the demo run.
#[derive(Debug, Clone, Default)]
pub struct DemoOptions {
    pub fail_ci: bool,
    pub reject_review: bool,
    pub remediate: bool,
}

/// The plan every demo run produces for its ticket.
pub fn demo_plan(ticket_id: &str) -> ChangePlan {
    ChangePlan::new(ticket_id, "Add retries to payment client")
        .with_constraint("no API change")
        .with_constraint("add unit tests")
        .with_edit("pkg/payments/client.py", "wrap calls with retry")
        .with_edit("tests/test_payments_client.py", "add flaky API test")
        .with_risk("timeout propagation")
        .with_risk("idempotency")
        .with_check("pytest -k payments")
        .with_check("lint")
}

struct DemoAgents {
    options: DemoOptions,
}

#[async_trait]
impl Planner for DemoAgents {
    async fn plan(&self, task: &TaskInput) -> Result<ChangePlan> {
        Ok(demo_plan(&task.ticket_id))
    }
}

#[async_trait]
impl Retriever<Value> for DemoAgents {
    async fn fetch(&self, _task: &TaskInput, plan: &ChangePlan) -> Result<Value> {
        Ok(json!({ "files": plan.edit_paths() }))
    }
}

#[async_trait]
impl Coder<Value> for DemoAgents {
    async fn apply(
        &self,
        _task: &TaskInput,
        _plan: &ChangePlan,
        context: &Value,
    ) -> Result<String> {
        debug!(context = %context, "applying demo diffs");
        Ok(DEMO_COMMIT_SHA.to_string())
    }
}

#[async_trait]
impl CiRunner for DemoAgents {
    async fn execute(
        &self,
        _task: &TaskInput,
        plan: &ChangePlan,
        _commit_sha: &str,
    ) -> Result<CiResult> {
        let ci = if self.options.fail_ci {
            CiResult::failed(format!("{} failed", plan.checks.join(", ")))
        } else {
            CiResult::passed()
        };
        Ok(ci.with_url(DEMO_CI_URL))
    }
}

#[async_trait]
impl PullRequests for DemoAgents {
    async fn open(
        &self,
        task: &TaskInput,
        _plan: &ChangePlan,
        _commit_sha: &str,
        _ci: &CiResult,
    ) -> Result<String> {
        Ok(format!("https://git.example/{}/pull/1", task.ticket_id))
    }
}

#[async_trait]
impl FeedbackResolver for DemoAgents {
    async fn fix(
        &self,
        _task: &TaskInput,
        pr_url: &str,
        review: &ReviewResult,
    ) -> Result<ReviewResult> {
        info!(
            pr_url = %pr_url,
            feedback = review.feedback.as_deref().unwrap_or(""),
            "addressing review feedback"
        );
        Ok(ReviewResult::approved())
    }
}

/// Prints each step notification as `Step: key=value, ...`.
pub struct PrintObserver;

impl PrintObserver {
    pub fn format(step: Step, payload: &Value) -> String {
        let details = payload
            .as_object()
            .map(|fields| {
                fields
                    .iter()
                    .filter(|(_, value)| !value.is_null())
                    .map(|(key, value)| match value {
                        Value::String(s) => format!("{key}={s}"),
                        other => format!("{key}={other}"),
                    })
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .unwrap_or_default();
        format!("{step}: {details}")
    }
}

impl ExecutionObserver for PrintObserver {
    fn on_step(&self, step: Step, payload: &Value) -> Result<()> {
        println!("{}", Self::format(step, payload));
        Ok(())
    }
}

/// Answer every parked review on `gateway` until the run finishes.
async fn reviewer(gateway: Arc<InProcessSignalGateway>, reject: bool) -> Result<()> {
    loop {
        for key in gateway.pending().await {
            let review = if reject {
                ReviewResult::changes_requested("please add a regression test for retries")
            } else {
                ReviewResult::approved()
            };
            debug!(key = %key, approved = review.approved, "reviewer responding");
            gateway.deliver(key, review).await?;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Run one task through the demo toolkit.
///
/// When `observer` is set every step is reported to it.
pub async fn run_demo(
    task: &TaskInput,
    options: DemoOptions,
    observer: Option<Arc<dyn ExecutionObserver>>,
) -> Result<RunResult> {
    let review_timeout = WorkflowSpec::default()
        .review_timeout()
        .context("workflow spec has no AwaitReview activity")?;
    let gateway = Arc::new(InProcessSignalGateway::new().with_timeout(review_timeout));

    let agents = Arc::new(DemoAgents {
        options: options.clone(),
    });
    let mut builder = AgentsToolkit::<Value>::builder()
        .planner(agents.clone())
        .retriever(agents.clone())
        .coder(agents.clone())
        .runner(agents.clone())
        .pull_requests(agents.clone())
        .reviewers(Arc::new(ReviewAwaiter::new(gateway.clone())));
    if options.remediate {
        builder = builder.feedback(agents);
    }
    let toolkit = builder.build()?;

    let mut runtime = Runtime::new(toolkit);
    if let Some(observer) = observer {
        runtime = runtime.with_observer(observer);
    }

    let reviewer = tokio::spawn(reviewer(gateway, options.reject_review));
    let result = runtime.execute(task).await;
    reviewer.abort();

    Ok(result?)
}
