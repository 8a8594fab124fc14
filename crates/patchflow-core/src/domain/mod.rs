//! Domain models for patchflow.
//!
//! - `TaskInput`: identity of one workflow instance
//! - `ChangePlan` / `PlannedEdit`: the planner's contract with every later step
//! - `CiResult`, `ReviewResult`: per-attempt snapshots
//! - `Step`: pipeline step names

pub mod error;
pub mod plan;
pub mod step;
pub mod task;

pub use error::{PipelineError, PlanError, Result};
pub use plan::{validate_relative_path, ChangePlan, PlannedEdit};
pub use step::Step;
pub use task::{CiResult, ReviewResult, TaskInput};
