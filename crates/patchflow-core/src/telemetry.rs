//! Log setup for the patchflow CLI and embedding hosts.
//!
//! Pipeline events (`run.started`, `step.started`, `state.transition`) are plain
//! `tracing` events under the `patchflow_core` target. [`init_tracing`] routes
//! them to stderr, leaving stdout to `patchflow spec` and `demo --output-json`.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Environment variable that overrides the default filter.
pub const LOG_ENV: &str = "PATCHFLOW_LOG";

/// Filter used when [`LOG_ENV`] is unset: patchflow crates at `level`,
/// everything else at `warn`.
pub fn default_directives(level: Level) -> String {
    let level = level.as_str().to_ascii_lowercase();
    format!("warn,patchflow_core={level},patchflow={level}")
}

/// Install the global subscriber. Only the first call in a process wins.
///
/// `json` switches to newline-delimited JSON so run logs can be shipped
/// alongside the `RunResult` JSON a host persists.
pub fn init_tracing(json: bool, level: Level) {
    let env_filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_directives(level)));

    let layer = fmt::layer().with_target(false).with_writer(std::io::stderr);
    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(layer.json())
            .try_init()
            .ok();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(layer)
            .try_init()
            .ok();
    }
}
