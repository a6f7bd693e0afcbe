// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Command-line arguments for `lazydag`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "lazydag",
    version,
    about = "Lazily schedule a DAG of batch jobs, skipping what is already done.",
    long_about = None
)]
pub struct CliArgs {
    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `LAZYDAG_LOG` or a default level will be used.
    #[arg(long, global = true, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Start a fresh run of a workflow and wait for it.
    Run {
        /// Workflow description (TOML).
        #[arg(long, value_name = "PATH")]
        workflow: PathBuf,

        /// Also expose the saved state at this path (must not exist).
        #[arg(long, value_name = "PATH")]
        state_link: Option<PathBuf>,

        /// Copy the state file to `--state-link` instead of symlinking it.
        #[arg(long, requires = "state_link")]
        copy: bool,

        /// Only run these jobs (and what they need). Default: every sink.
        #[arg(long, value_name = "NAME", num_args = 1..)]
        jobs: Vec<String>,

        /// Skip the finalization step of a staged run.
        #[arg(long)]
        no_finalize: bool,

        /// Parse + validate, print the jobs, but don't execute anything.
        #[arg(long)]
        dry_run: bool,
    },

    /// Resume a run from its saved state.
    Restart {
        /// State file written by `run`.
        #[arg(long, value_name = "PATH")]
        state: PathBuf,

        /// TOML file with an `[engine]` section replacing the saved one.
        #[arg(long, value_name = "PATH")]
        engine_config: Option<PathBuf>,

        #[arg(long, value_name = "NAME", num_args = 1..)]
        jobs: Vec<String>,

        #[arg(long)]
        no_finalize: bool,
    },

    /// Print a status breakdown of a saved run.
    Status {
        #[arg(long, value_name = "PATH")]
        state: PathBuf,

        /// Re-resolve from logs and the repository instead of monitoring.
        #[arg(long)]
        use_logs: bool,
    },

    /// Print the monitoring breakdown of a workflow by task type.
    Summary {
        /// Workflow/run name as recorded in the monitoring store.
        workflow_name: String,

        #[arg(long, value_name = "PATH", default_value = "monitoring.jsonl")]
        db: PathBuf,

        /// Task types to list first, or `discover`.
        #[arg(long, value_name = "NAME", num_args = 1..)]
        tasks: Vec<String>,
    },
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_accepts_multiple_jobs() {
        let args = CliArgs::try_parse_from([
            "lazydag", "run", "--workflow", "wf.toml", "--jobs", "a", "b", "--no-finalize",
        ])
        .unwrap();
        match args.command {
            Command::Run {
                workflow,
                jobs,
                no_finalize,
                copy,
                ..
            } => {
                assert_eq!(workflow, PathBuf::from("wf.toml"));
                assert_eq!(jobs, vec!["a", "b"]);
                assert!(no_finalize);
                assert!(!copy);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn copy_requires_state_link() {
        assert!(CliArgs::try_parse_from(["lazydag", "run", "--workflow", "w", "--copy"]).is_err());
    }

    #[test]
    fn log_level_is_global() {
        let args =
            CliArgs::try_parse_from(["lazydag", "summary", "wf", "--log-level", "debug"]).unwrap();
        assert!(matches!(args.log_level, Some(LogLevel::Debug)));
    }
}
