//! patchflow - command-line demos for the orchestration core
//!
//! ## Commands
//!
//! - `demo`: run one task end to end against deterministic demo adapters
//! - `spec`: print the workflow specification as JSON
//! - `validate-plan`: check a ChangePlan JSON file against the plan rules

mod demo;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use patchflow_core::{ChangePlan, ExecutionObserver, TaskInput, WorkflowSpec, METRICS};
use tracing::{info, Level};

use crate::demo::{DemoOptions, PrintObserver};

#[derive(Parser)]
#[command(name = "patchflow")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Durable orchestration for agent-driven code changes", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true, env = "PATCHFLOW_LOG_JSON")]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a task through the pipeline with demo adapters
    Demo {
        /// Ticket to work on
        #[arg(long, default_value = "ENG-1423")]
        ticket: String,

        /// Repository the change targets
        #[arg(long, default_value = "git@example/repo")]
        repository: String,

        /// Branch the pull request is opened against
        #[arg(long, default_value = "main")]
        base_branch: String,

        /// Make the CI run fail
        #[arg(long)]
        fail_ci: bool,

        /// Have the reviewer request changes
        #[arg(long)]
        reject_review: bool,

        /// Enable the feedback resolver for one remediation attempt
        #[arg(long)]
        remediate: bool,

        /// Print the run result as JSON instead of step lines
        #[arg(long)]
        output_json: bool,
    },

    /// Print the workflow specification as JSON
    Spec,

    /// Validate a ChangePlan JSON file
    ValidatePlan {
        /// Path to the plan file
        path: PathBuf,

        /// Ticket the plan must belong to
        #[arg(long)]
        ticket: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    patchflow_core::init_tracing(cli.json, level);

    let outcome = match cli.command {
        Commands::Demo {
            ticket,
            repository,
            base_branch,
            fail_ci,
            reject_review,
            remediate,
            output_json,
        } => {
            let task = TaskInput::new(ticket, repository, base_branch);
            let options = DemoOptions {
                fail_ci,
                reject_review,
                remediate,
            };
            cmd_demo(&task, options, output_json).await
        }
        Commands::Spec => cmd_spec(),
        Commands::ValidatePlan { path, ticket } => {
            cmd_validate_plan(&path, ticket.as_deref()).map(|plan| {
                println!(
                    "Plan {} is valid ({} edits, digest {})",
                    plan.ticket_id,
                    plan.edits.len(),
                    plan.digest()
                );
            })
        }
    };

    METRICS.flush();
    outcome
}

async fn cmd_demo(task: &TaskInput, options: DemoOptions, output_json: bool) -> Result<()> {
    let observer: Option<Arc<dyn ExecutionObserver>> = if output_json {
        None
    } else {
        Some(Arc::new(PrintObserver))
    };

    let result = demo::run_demo(task, options, observer)
        .await
        .with_context(|| format!("Task {} did not complete", task.ticket_id))?;

    if output_json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("PR ready at {}", result.pr_url);
    }
    info!(pr_url = %result.pr_url, remediated = result.remediated, "demo finished");
    Ok(())
}

fn cmd_spec() -> Result<()> {
    let spec = WorkflowSpec::default();
    spec.validate().context("Built-in workflow spec is invalid")?;
    println!("{}", spec.to_json_pretty()?);
    Ok(())
}

fn cmd_validate_plan(path: &Path, ticket: Option<&str>) -> Result<ChangePlan> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read plan file: {:?}", path))?;
    let plan = ChangePlan::from_json(&raw)
        .with_context(|| format!("Plan file is not a valid ChangePlan: {:?}", path))?;

    match ticket {
        Some(ticket) => plan.validate_for(ticket),
        None => plan.validate(),
    }
    .with_context(|| format!("Plan {} failed validation", plan.ticket_id))?;

    Ok(plan)
}
