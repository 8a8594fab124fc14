//! patchflow core library
//!
//! Drives one code-change task through plan → context → diffs → CI → pull
//! request → review → optional remediation, delegating every step to a
//! [`Toolkit`].

pub mod adapters;
pub mod contracts;
pub mod domain;
pub mod metrics;
pub mod obs;
pub mod orchestrator;
pub mod runtime;
pub mod telemetry;
pub mod toolkit;
pub mod workflow;

pub use adapters::{
    AgentsToolkit, AgentsToolkitBuilder, CiRunner, Coder, FeedbackResolver, GatewayError,
    InProcessSignalGateway, Planner, PullRequests, Retriever, ReviewAwaiter, ReviewChannel,
    ReviewCorrelation, ReviewSignalGateway, ToolkitBuildError,
};
pub use contracts::{
    CodeSearchQuery, CodeSearchResponse, CodeSearchResult, ContractError, RepoReadRequest,
    RepoReadResponse, RepoWriteRequest, RunnerCommandRequest,
};
pub use domain::{
    validate_relative_path, ChangePlan, CiResult, PipelineError, PlanError, PlannedEdit, Result,
    ReviewResult, Step, TaskInput,
};
pub use metrics::METRICS;
pub use orchestrator::{Orchestrator, PipelineState, RunTrace};
pub use runtime::{ExecutionObserver, RunResult, Runtime};
pub use telemetry::init_tracing;
pub use toolkit::Toolkit;
pub use workflow::{
    RetryPolicy, WorkflowActivity, WorkflowSignal, WorkflowSpec, WorkflowSpecError, REVIEW_SIGNAL,
};

/// patchflow version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
