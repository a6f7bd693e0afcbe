// src/errors.rs

//! Crate-wide error aliases and helpers.

use std::path::PathBuf;

use thiserror::Error;

use crate::exec::HandleOutcome;

#[derive(Error, Debug)]
pub enum LazydagError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Cycle detected in DAG: {0}")]
    DagCycle(String),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerError(#[from] toml::ser::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("workflow description not found: {}", .0.display())]
    MissingWorkflow(PathBuf),

    #[error("state file already exists: {}", .0.display())]
    StateFileExists(PathBuf),

    #[error("monitoring information unavailable: {0}")]
    MonitoringUnavailable(String),

    #[error("initialization job '{job}' failed (exit code {code:?})")]
    InitFailed { job: String, code: Option<i32> },

    #[error("job '{job}' did not succeed: {outcome}")]
    JobFailed { job: String, outcome: HandleOutcome },

    #[error("finalization failed: {0}")]
    FinalizationFailed(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, LazydagError>;
