// src/persist.rs

//! As-run state: enough to rebuild the same graph after a crash.
//!
//! Only the workflow location and the `[run]`/`[engine]` sections are saved.
//! Job statuses are never persisted; a restored graph re-resolves them.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::{LazydagError, Result};
use crate::types::LinkMode;
use crate::workflow::{EngineSection, RunSection, WorkflowFile, load_from_path, validate_engine};

/// Name of the master state file inside the submit directory.
pub const STATE_FILE: &str = "dag_state.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedState {
    /// Absolute path of the workflow description.
    pub workflow_path: PathBuf,
    pub saved_at: DateTime<Utc>,
    pub run: RunSection,
    pub engine: EngineSection,
}

impl PersistedState {
    pub fn new(workflow_path: &Path, workflow: &WorkflowFile) -> Result<Self> {
        let workflow_path = fs::canonicalize(workflow_path)
            .map_err(|_| LazydagError::MissingWorkflow(workflow_path.to_path_buf()))?;
        Ok(Self {
            workflow_path,
            saved_at: Utc::now(),
            run: workflow.run.clone(),
            engine: workflow.engine.clone(),
        })
    }

    pub fn master_path(&self) -> PathBuf {
        self.run.submit_dir.join(STATE_FILE)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let text = toml::to_string_pretty(self)?;
        fs::write(path, text)?;
        debug!(path = %path.display(), "saved run state");
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }

    /// Write the master state file and, if requested, a link or copy of it
    /// at `outfile`, which must not exist yet. Returns the master path.
    pub fn save_as_run(&self, outfile: Option<&Path>, mode: LinkMode) -> Result<PathBuf> {
        if let Some(out) = outfile {
            if out.symlink_metadata().is_ok() {
                return Err(LazydagError::StateFileExists(out.to_path_buf()));
            }
        }

        let master = self.master_path();
        self.save(&master)?;

        if let Some(out) = outfile {
            if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            match mode {
                LinkMode::Symlink => symlink(&master, out)?,
                LinkMode::Copy => {
                    fs::copy(&master, out)?;
                }
            }
            info!(state = %out.display(), ?mode, "state file linked");
        }
        Ok(master)
    }

    /// Re-read the workflow description and re-apply the persisted sections.
    ///
    /// Fails with [`LazydagError::MissingWorkflow`] if the description is
    /// gone.
    pub fn restore_workflow(&self, engine: Option<EngineSection>) -> Result<WorkflowFile> {
        let mut raw = load_from_path(&self.workflow_path)?;
        raw.run = self.run.clone();
        raw.engine = engine.unwrap_or_else(|| self.engine.clone());
        WorkflowFile::try_from(raw)
    }
}

#[cfg(unix)]
fn symlink(target: &Path, link: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(not(unix))]
fn symlink(target: &Path, link: &Path) -> std::io::Result<()> {
    fs::copy(target, link).map(|_| ())
}

#[derive(Debug, Deserialize)]
struct EngineFile {
    #[serde(default)]
    engine: EngineSection,
}

/// Read a replacement `[engine]` section from a TOML file.
pub fn load_engine_override(path: &Path) -> Result<EngineSection> {
    let text = fs::read_to_string(path).map_err(|e| {
        LazydagError::ConfigError(format!("reading engine config {}: {e}", path.display()))
    })?;
    let file: EngineFile = toml::from_str(&text)?;
    validate_engine(&file.engine)?;
    Ok(file.engine)
}
