//! Adapter composition and signal-gateway tests.

mod common;

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use common::{feature_plan, task};
use patchflow_core::{
    AgentsToolkit, ChangePlan, CiResult, CiRunner, Coder, FeedbackResolver, GatewayError,
    InProcessSignalGateway, Planner, PullRequests, Retriever, ReviewAwaiter, ReviewChannel,
    ReviewCorrelation, ReviewResult, ReviewSignalGateway, Runtime, TaskInput, Toolkit,
};

type Counters = Arc<Mutex<BTreeMap<&'static str, u32>>>;

fn bump(counters: &Counters, name: &'static str) {
    *counters.lock().unwrap().entry(name).or_insert(0) += 1;
}

struct Agents {
    counters: Counters,
    pr_url: &'static str,
    review: ReviewResult,
}

#[async_trait]
impl Planner for Agents {
    async fn plan(&self, _task: &TaskInput) -> anyhow::Result<ChangePlan> {
        bump(&self.counters, "plan");
        Ok(feature_plan())
    }
}

#[async_trait]
impl Retriever<Vec<String>> for Agents {
    async fn fetch(&self, _task: &TaskInput, plan: &ChangePlan) -> anyhow::Result<Vec<String>> {
        bump(&self.counters, "fetch");
        Ok(plan.edit_paths().into_iter().map(String::from).collect())
    }
}

#[async_trait]
impl Coder<Vec<String>> for Agents {
    async fn apply(
        &self,
        _task: &TaskInput,
        _plan: &ChangePlan,
        files: &Vec<String>,
    ) -> anyhow::Result<String> {
        bump(&self.counters, "apply");
        Ok(format!("commit-{}", files.len()))
    }
}

#[async_trait]
impl CiRunner for Agents {
    async fn execute(
        &self,
        _task: &TaskInput,
        _plan: &ChangePlan,
        _commit_sha: &str,
    ) -> anyhow::Result<CiResult> {
        bump(&self.counters, "ci");
        Ok(CiResult::passed())
    }
}

#[async_trait]
impl PullRequests for Agents {
    async fn open(
        &self,
        _task: &TaskInput,
        _plan: &ChangePlan,
        _commit_sha: &str,
        _ci: &CiResult,
    ) -> anyhow::Result<String> {
        bump(&self.counters, "pr");
        Ok(self.pr_url.to_string())
    }
}

#[async_trait]
impl ReviewChannel for Agents {
    async fn resolve(&self, _task: &TaskInput, _pr_url: &str) -> anyhow::Result<ReviewResult> {
        bump(&self.counters, "review");
        Ok(self.review.clone())
    }
}

#[async_trait]
impl FeedbackResolver for Agents {
    async fn fix(
        &self,
        _task: &TaskInput,
        _pr_url: &str,
        _review: &ReviewResult,
    ) -> anyhow::Result<ReviewResult> {
        bump(&self.counters, "fix");
        Ok(ReviewResult::approved())
    }
}

fn agents(pr_url: &'static str, review: ReviewResult) -> (Arc<Agents>, Counters) {
    let counters: Counters = Arc::default();
    let agents = Arc::new(Agents {
        counters: counters.clone(),
        pr_url,
        review,
    });
    (agents, counters)
}

#[tokio::test]
async fn test_toolkit_builder_wires_every_adapter() {
    let (a, counters) = agents(
        "https://example.com/pr/5",
        ReviewResult::changes_requested("rename"),
    );
    let toolkit = AgentsToolkit::<Vec<String>>::builder()
        .planner(a.clone())
        .retriever(a.clone())
        .coder(a.clone())
        .runner(a.clone())
        .pull_requests(a.clone())
        .reviewers(a.clone())
        .feedback(a)
        .build()
        .unwrap();
    assert!(toolkit.supports_remediation());

    let result = Runtime::new(toolkit)
        .execute(&task("ENG-1423"))
        .await
        .unwrap();

    assert_eq!(result.pr_url, "https://example.com/pr/5");
    assert_eq!(result.commit_sha, "commit-2");
    let counts = counters.lock().unwrap().clone();
    for name in ["plan", "fetch", "apply", "ci", "pr", "review", "fix"] {
        assert_eq!(counts.get(name), Some(&1), "{name} should run exactly once");
    }
}

#[tokio::test]
async fn test_toolkit_without_feedback_adapter_has_no_remediation() {
    let (a, _) = agents("https://example.com/pr/7", ReviewResult::approved());
    let toolkit = AgentsToolkit::<Vec<String>>::builder()
        .planner(a.clone())
        .retriever(a.clone())
        .coder(a.clone())
        .runner(a.clone())
        .pull_requests(a.clone())
        .reviewers(a)
        .build()
        .unwrap();

    assert!(!toolkit.supports_remediation());
    let err = toolkit
        .address_feedback(&task("ENG-1"), "url", &ReviewResult::default())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("not configured"));
}

#[tokio::test]
async fn test_review_awaiter_resumes_on_signal() {
    let (a, _) = agents("https://example.com/pr/6", ReviewResult::approved());
    let gateway = Arc::new(InProcessSignalGateway::new());
    let toolkit = AgentsToolkit::<Vec<String>>::builder()
        .planner(a.clone())
        .retriever(a.clone())
        .coder(a.clone())
        .runner(a.clone())
        .pull_requests(a)
        .reviewers(Arc::new(ReviewAwaiter::new(gateway.clone())))
        .build()
        .unwrap();
    let runtime = Runtime::new(toolkit);

    let run = tokio::spawn(async move { runtime.execute(&task("ENG-1423")).await });

    let key = ReviewCorrelation::new("ENG-1423", "https://example.com/pr/6");
    loop {
        if gateway.pending().await.contains(&key) {
            break;
        }
        tokio::task::yield_now().await;
    }
    gateway
        .deliver(key, ReviewResult::approved())
        .await
        .unwrap();

    let result = run.await.unwrap().unwrap();
    assert_eq!(result.pr_url, "https://example.com/pr/6");
    assert!(gateway.pending().await.is_empty());
}

#[tokio::test]
async fn test_signal_delivered_before_wait_is_consumed() {
    let gateway = InProcessSignalGateway::new();
    let key = ReviewCorrelation::new("ENG-2", "https://example.com/pr/2");
    gateway
        .deliver(key.clone(), ReviewResult::changes_requested("fix naming"))
        .await
        .unwrap();

    let awaiter = ReviewAwaiter::new(gateway);
    let review = awaiter
        .resolve(&task("ENG-2"), "https://example.com/pr/2")
        .await
        .unwrap();

    assert!(!review.approved);
    assert_eq!(review.feedback.as_deref(), Some("fix naming"));
}

#[tokio::test(start_paused = true)]
async fn test_wait_times_out_and_frees_the_key() {
    let gateway = InProcessSignalGateway::new().with_timeout(Duration::from_secs(60));
    let key = ReviewCorrelation::new("ENG-3", "https://example.com/pr/3");

    let err = gateway.wait_for_review(&key).await.unwrap_err();

    assert_eq!(
        err,
        GatewayError::TimedOut {
            key: key.to_string(),
            timeout_secs: 60,
        }
    );
    assert!(gateway.pending().await.is_empty());
}

#[tokio::test]
async fn test_second_waiter_on_same_key_is_rejected() {
    let gateway = Arc::new(InProcessSignalGateway::new());
    let key = ReviewCorrelation::new("ENG-4", "https://example.com/pr/4");

    let first = {
        let gateway = gateway.clone();
        let key = key.clone();
        tokio::spawn(async move { gateway.wait_for_review(&key).await })
    };
    while gateway.pending().await.is_empty() {
        tokio::task::yield_now().await;
    }

    let err = gateway.wait_for_review(&key).await.unwrap_err();
    assert!(matches!(err, GatewayError::AlreadyWaiting { .. }));

    gateway.deliver(key, ReviewResult::approved()).await.unwrap();
    assert!(first.await.unwrap().unwrap().approved);
}

#[tokio::test]
async fn test_aborted_waiter_does_not_block_a_new_wait() {
    let gateway = Arc::new(InProcessSignalGateway::new());
    let key = ReviewCorrelation::new("ENG-8", "https://example.com/pr/8");

    let spawn_waiter = || {
        let gateway = gateway.clone();
        let key = key.clone();
        tokio::spawn(async move { gateway.wait_for_review(&key).await })
    };

    let first = spawn_waiter();
    while gateway.pending().await.is_empty() {
        tokio::task::yield_now().await;
    }
    first.abort();
    assert!(first.await.unwrap_err().is_cancelled());
    assert!(gateway.pending().await.is_empty());

    let second = spawn_waiter();
    while gateway.pending().await.is_empty() {
        tokio::task::yield_now().await;
    }
    assert_eq!(gateway.pending().await, vec![key.clone()]);

    gateway
        .deliver(key, ReviewResult::changes_requested("split the commit"))
        .await
        .unwrap();
    let review = second.await.unwrap().unwrap();
    assert_eq!(review.feedback.as_deref(), Some("split the commit"));
}
