//! Runtime tests: step notifications, artifact capture, and the ENG-1423
//! demo scenario.

mod common;

use std::sync::{Arc, Mutex};

use common::{feature_plan, task, StubToolkit};
use patchflow_core::{
    CiResult, ExecutionObserver, PipelineError, ReviewResult, Runtime, Step,
};
use serde_json::{json, Value};

#[derive(Default)]
struct RecordingObserver {
    events: Mutex<Vec<(Step, Value)>>,
}

impl RecordingObserver {
    fn steps(&self) -> Vec<&'static str> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|(step, _)| step.as_str())
            .collect()
    }

    fn payload(&self, step: Step) -> Value {
        self.events
            .lock()
            .unwrap()
            .iter()
            .find(|(s, _)| *s == step)
            .map(|(_, p)| p.clone())
            .unwrap()
    }
}

impl ExecutionObserver for RecordingObserver {
    fn on_step(&self, step: Step, payload: &Value) -> anyhow::Result<()> {
        self.events.lock().unwrap().push((step, payload.clone()));
        Ok(())
    }
}

#[tokio::test]
async fn test_runtime_executes_toolkit_and_emits_steps() {
    let observer = Arc::new(RecordingObserver::default());
    let runtime = Runtime::new(StubToolkit::passing(feature_plan())).with_observer(observer.clone());

    let result = runtime.execute(&task("ENG-1423")).await.unwrap();

    assert_eq!(result.pr_url, "https://git.example/ENG-1423/pull/1");
    assert_eq!(
        runtime.toolkit().calls(),
        vec!["plan", "fetch", "apply", "ci", "pr", "await"]
    );
    assert_eq!(
        observer.steps(),
        vec!["PlanChanges", "FetchContext", "ApplyDiffs", "RunCI", "OpenPR", "AwaitReview"]
    );
}

#[tokio::test]
async fn test_demo_scenario_produces_expected_artifacts() {
    let runtime = Runtime::new(StubToolkit::passing(feature_plan()));

    let result = runtime.execute(&task("ENG-1423")).await.unwrap();

    assert_eq!(result.pr_url, "https://git.example/ENG-1423/pull/1");
    assert_eq!(result.commit_sha, "demo-commit-sha");
    assert_eq!(result.plan, feature_plan());
    assert_eq!(result.plan_digest, feature_plan().digest());
    assert!(result.ci_result.passed);
    assert_eq!(
        result.ci_result.url.as_deref(),
        Some("https://ci.example/jobs/123")
    );
    assert!(!result.remediated);
}

#[tokio::test]
async fn test_demo_scenario_with_failing_ci_never_opens_pr() {
    let toolkit = StubToolkit::passing(feature_plan()).with_ci(CiResult::failed("payments flaky"));
    let runtime = Runtime::new(toolkit);

    let err = runtime.execute(&task("ENG-1423")).await.unwrap_err();

    assert!(matches!(err, PipelineError::CiFailed { .. }));
    assert_eq!(runtime.toolkit().count("pr"), 0);
}

#[tokio::test]
async fn test_step_payloads() {
    let observer = Arc::new(RecordingObserver::default());
    let toolkit = StubToolkit::passing(feature_plan())
        .with_review(ReviewResult::changes_requested("needs tests"))
        .with_remediation(ReviewResult::approved());
    let runtime = Runtime::new(toolkit).with_observer(observer.clone());

    let result = runtime.execute(&task("ENG-1423")).await.unwrap();

    assert!(result.remediated);
    assert_eq!(
        observer.payload(Step::PlanChanges),
        json!({ "ticket_id": "ENG-1423" })
    );
    assert_eq!(observer.payload(Step::FetchContext), json!({ "edits": 2 }));
    assert_eq!(
        observer.payload(Step::ApplyDiffs),
        json!({ "files": ["pkg/payments/client.py", "tests/test_payments_client.py"] })
    );
    assert_eq!(
        observer.payload(Step::RunCi),
        json!({ "commit": "demo-commit-sha" })
    );
    assert_eq!(
        observer.payload(Step::OpenPr),
        json!({ "ci_url": "https://ci.example/jobs/123" })
    );
    assert_eq!(
        observer.payload(Step::AwaitReview),
        json!({ "pr_url": "https://git.example/ENG-1423/pull/1" })
    );
    assert_eq!(
        observer.payload(Step::AddressFeedback),
        json!({ "feedback": "needs tests" })
    );
    assert_eq!(observer.steps().last(), Some(&"AddressFeedback"));
}

#[tokio::test]
async fn test_runtime_handles_review_feedback_loop() {
    let toolkit = StubToolkit::passing(feature_plan())
        .with_review(ReviewResult::changes_requested("needs tests"))
        .with_remediation(ReviewResult::approved());
    let runtime = Runtime::new(toolkit);

    let result = runtime.execute(&task("ENG-1423")).await.unwrap();

    assert_eq!(result.pr_url, "https://git.example/ENG-1423/pull/1");
    assert_eq!(runtime.toolkit().count("feedback"), 1);
}

#[tokio::test]
async fn test_runtime_fails_when_feedback_missing() {
    let toolkit =
        StubToolkit::passing(feature_plan()).with_review(ReviewResult::changes_requested("no"));
    let observer = Arc::new(RecordingObserver::default());
    let runtime = Runtime::new(toolkit).with_observer(observer.clone());

    let err = runtime.execute(&task("ENG-1423")).await.unwrap_err();

    assert!(matches!(err, PipelineError::ReviewRejected { .. }));
    assert!(!observer.steps().contains(&"AddressFeedback"));
}

#[tokio::test]
async fn test_validation_failure_notifies_only_planning() {
    let plan = feature_plan();
    let plan = patchflow_core::ChangePlan {
        checks: vec!["lint".to_string()],
        ..plan
    };
    let observer = Arc::new(RecordingObserver::default());
    let runtime = Runtime::new(StubToolkit::passing(plan)).with_observer(observer.clone());

    let err = runtime.execute(&task("ENG-1423")).await.unwrap_err();

    assert!(matches!(err, PipelineError::InvalidPlan { .. }));
    assert_eq!(observer.steps(), vec!["PlanChanges"]);
}
