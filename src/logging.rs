// src/logging.rs

//! Diagnostics for the scheduler itself. Job output never passes through
//! here: every job writes its own log file, and stdout is kept for dry-run
//! command lines and status tables.
//!
//! `--log-level` sets one level for everything. Without it, `LAZYDAG_LOG`
//! is read as a filter, so `LAZYDAG_LOG=info,lazydag::exec=debug` shows
//! permit and process details without the graph walk.

use anyhow::Result;
use tracing_subscriber::{EnvFilter, fmt};

use crate::cli::LogLevel;

pub const LOG_ENV: &str = "LAZYDAG_LOG";

const DEFAULT_DIRECTIVE: &str = "info";

/// Install the global subscriber, writing to stderr. Fails if one is
/// already installed.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let env = std::env::var(LOG_ENV).ok();
    let filter = build_filter(cli_level, env.as_deref());

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("initialising logging: {e}"))
}

/// An unparsable `LAZYDAG_LOG` falls back to `info` rather than failing the
/// run.
fn build_filter(cli_level: Option<LogLevel>, env: Option<&str>) -> EnvFilter {
    if let Some(level) = cli_level {
        return EnvFilter::new(level_directive(level));
    }
    env.map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| EnvFilter::try_new(s).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_DIRECTIVE))
}

fn level_directive(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    }
}
