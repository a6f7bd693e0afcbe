// src/pipeline.rs

//! Wiring of a complete run on the local machine: workflow file, init step,
//! persisted state, monitoring store and local engine.

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::errors::{LazydagError, Result};
use crate::exec::LocalEngine;
use crate::fs::{FileSystem, RealFileSystem};
use crate::persist::{PersistedState, load_engine_override};
use crate::scheduler::{LazyScheduler, run_init_job};
use crate::status::{FsRepository, JsonlMonitoringStore, MonitoringStore};
use crate::types::LinkMode;
use crate::workflow::{WorkflowFile, load_and_validate};

/// Start a fresh run of the workflow at `workflow_path`.
///
/// Runs the init precondition, saves the as-run state (optionally linked or
/// copied to `outfile`) and returns a scheduler ready to `run`.
pub async fn start_pipeline(
    workflow_path: &Path,
    outfile: Option<&Path>,
    mode: LinkMode,
) -> Result<LazyScheduler> {
    let workflow = load_and_validate(workflow_path)?;
    let state = PersistedState::new(workflow_path, &workflow)?;
    if let Some(out) = outfile {
        if out.symlink_metadata().is_ok() {
            return Err(LazydagError::StateFileExists(out.to_path_buf()));
        }
    }

    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let repository = FsRepository::new(workflow.run.repository.clone(), fs.clone());
    run_init_job(&workflow, &repository).await?;

    let master = state.save_as_run(outfile, mode)?;
    info!(workflow = %workflow.run.name, state = %master.display(), "pipeline started");
    local_scheduler(workflow, fs)
}

/// Rebuild a run from a saved state file. The init step is not repeated.
pub fn restore_pipeline(state_path: &Path, engine_config: Option<&Path>) -> Result<LazyScheduler> {
    let state = PersistedState::load(state_path)?;
    let engine = engine_config.map(load_engine_override).transpose()?;
    let workflow = state.restore_workflow(engine)?;
    info!(
        workflow = %workflow.run.name,
        saved_at = %state.saved_at,
        "pipeline restored"
    );
    local_scheduler(workflow, Arc::new(RealFileSystem))
}

fn local_scheduler(workflow: WorkflowFile, fs: Arc<dyn FileSystem>) -> Result<LazyScheduler> {
    let store: Arc<dyn MonitoringStore> = Arc::new(JsonlMonitoringStore::new(
        workflow.run.monitoring_db.clone(),
        fs.clone(),
    ));
    let engine = LocalEngine::from_config(&workflow.engine)
        .with_monitoring(store.clone(), &workflow.run.name);
    Ok(LazyScheduler::from_workflow(workflow, fs, Arc::new(engine))?.with_monitoring(store))
}
