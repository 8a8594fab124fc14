//! Structured observability hooks for the task pipeline.
//!
//! Events are emitted at `info!` level unless noted. Filter with `PATCHFLOW_LOG`;
//! see [`crate::telemetry::init_tracing`] for JSON output.

use tracing::{info, warn};

use crate::domain::{PipelineError, Step};

/// Span covering one task run. Attach it with `tracing::Instrument` so it
/// stays correct across await points.
pub fn task_span(ticket_id: &str, run_id: &str) -> tracing::Span {
    tracing::info_span!("patchflow.task", ticket_id = %ticket_id, run_id = %run_id)
}

/// Emit event: a run started for a ticket.
pub fn emit_run_started(ticket_id: &str, repository: &str, base_branch: &str) {
    info!(
        event = "run.started",
        ticket_id = %ticket_id,
        repository = %repository,
        base_branch = %base_branch,
    );
}

/// Emit event: a toolkit step is about to be invoked.
pub fn emit_step_started(step: Step) {
    info!(
        event = "step.started",
        step = %step,
        side_effects = step.has_side_effects()
    );
}

/// Emit event: the state machine moved to a new state.
pub fn emit_transition(from: &str, to: &str, terminal: bool) {
    info!(event = "state.transition", from = %from, to = %to, terminal);
}

/// Emit event: the run reached `Done`.
pub fn emit_run_finished(ticket_id: &str, pr_url: &str, remediated: bool) {
    info!(
        event = "run.finished",
        ticket_id = %ticket_id,
        pr_url = %pr_url,
        remediated = remediated,
    );
}

/// Emit event: the run reached `Failed` (warning level).
pub fn emit_run_failed(ticket_id: &str, error: &PipelineError) {
    let step = error.step().map(|s| s.as_str()).unwrap_or("runtime");
    warn!(
        event = "run.failed",
        ticket_id = %ticket_id,
        step = %step,
        kind = error.kind(),
        error = %error,
    );
}

/// Emit event: an observer rejected a notification (warning level).
pub fn emit_observer_error(step: Step, error: &dyn std::fmt::Display) {
    warn!(event = "observer.error", step = %step, error = %error);
}
