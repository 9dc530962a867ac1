mod config;
mod cycle;
mod error;
mod locator;
mod naming;
mod rotation;
mod sensor;
mod writer;

use crate::config::Config;
use crate::cycle::CycleOutcome;
use anyhow::Result;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,templog=info";

/// Maps `LOG_LEVEL` names (`DEBUG`, `WARNING`, ...) to a filter directive.
fn log_level_directive(raw: &str) -> Option<&'static str> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "trace" => Some("trace"),
        "debug" => Some("debug"),
        "info" => Some("info"),
        "warn" | "warning" => Some("warn"),
        "error" | "critical" => Some("error"),
        _ => None,
    }
}

fn init_tracing() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        std::env::var("LOG_LEVEL")
            .ok()
            .as_deref()
            .and_then(log_level_directive)
            .unwrap_or(DEFAULT_FILTER)
            .into()
    });
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .try_init()
        .map_err(|err| anyhow::anyhow!(err.to_string()))?;
    Ok(())
}

fn main() -> Result<()> {
    init_tracing()?;
    let config = Config::from_env().inspect_err(|err| {
        tracing::error!(error = %format!("{err:#}"), "failed to load configuration");
    })?;
    let client = sensor::build_client(config.request_timeout)?;

    let outcome = cycle::poll(&config, &client, || chrono::Local::now().naive_local()).inspect_err(|err| {
        tracing::error!(kind = err.kind(), error = %err, "poll cycle failed");
    })?;
    match outcome {
        CycleOutcome::Appended { path } => {
            tracing::debug!(path = %path.display(), "appended row");
        }
        CycleOutcome::Created { path, index } => {
            tracing::debug!(path = %path.display(), index, "started new output file");
        }
    }
    Ok(())
}
