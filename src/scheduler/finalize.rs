// src/scheduler/finalize.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use crate::errors::{LazydagError, Result};
use crate::exec::task_runner::shell;
use crate::fs::FileSystem;
use crate::workflow::RunSection;

/// Consolidating transfer step of a staged run, followed by removal of the
/// per-job repository copies. Failure is fatal and not retried.
#[derive(Debug, Clone)]
pub struct Finalizer {
    command: String,
    temp_dir: PathBuf,
    fs: Arc<dyn FileSystem>,
}

impl Finalizer {
    pub fn new(command: impl Into<String>, temp_dir: impl Into<PathBuf>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            command: command.into(),
            temp_dir: temp_dir.into(),
            fs,
        }
    }

    /// `None` unless the run stages outputs.
    pub fn from_run(run: &RunSection, fs: Arc<dyn FileSystem>) -> Option<Self> {
        let temp_dir = run.staging_tmp_dir()?;
        let command = run.finalize_command.clone()?;
        Some(Self::new(command, temp_dir, fs))
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }

    pub async fn run(&self) -> Result<()> {
        info!(cmd = %self.command, "running finalization step");
        let status = shell(&self.command)
            .status()
            .await
            .with_context(|| format!("spawning finalization command '{}'", self.command))?;

        if !status.success() {
            return Err(LazydagError::FinalizationFailed(format!(
                "'{}' exited with {}",
                self.command, status
            )));
        }

        if self.fs.is_dir(&self.temp_dir) {
            self.fs.remove_dir_all(&self.temp_dir)?;
            info!(dir = %self.temp_dir.display(), "removed staged repository copies");
        } else {
            warn!(dir = %self.temp_dir.display(), "no staged repository copies to remove");
        }
        Ok(())
    }
}
