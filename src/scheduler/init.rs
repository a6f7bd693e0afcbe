// src/scheduler/init.rs

//! Initialization precondition, run once before a fresh run is ingested.

use std::fs::{self, OpenOptions};
use std::path::Path;
use std::process::Stdio;

use anyhow::Context;
use tracing::info;

use crate::errors::{LazydagError, Result};
use crate::exec::task_runner::shell;
use crate::status::DataRepository;
use crate::status::repository::all_outputs_exist;
use crate::workflow::WorkflowFile;
use crate::workflow::command::job_command_line;

/// Whether the init job has to run.
///
/// Skipped when it declares outputs and all exist, or declares none and the
/// output collection already exists.
pub fn init_needed(workflow: &WorkflowFile, repository: &dyn DataRepository) -> Result<bool> {
    let Some((_, spec)) = workflow.init_job() else {
        return Ok(false);
    };
    let collection = &workflow.run.output_collection;
    let satisfied = if spec.outputs.is_empty() {
        repository.has_collection(collection)?
    } else {
        all_outputs_exist(repository, &spec.outputs, collection)?
    };
    Ok(!satisfied)
}

/// Run the init job synchronously if needed. Returns whether it ran.
pub async fn run_init_job(workflow: &WorkflowFile, repository: &dyn DataRepository) -> Result<bool> {
    let Some((name, spec)) = workflow.init_job() else {
        return Ok(false);
    };
    if !init_needed(workflow, repository)? {
        info!(job = name, "init job already satisfied; skipping");
        return Ok(false);
    }

    let run = &workflow.run;
    let stderr_path = run.stderr_log(name);
    fs::create_dir_all(run.log_dir())
        .with_context(|| format!("creating log dir {:?}", run.log_dir()))?;
    let open = |path: &Path| {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("opening log {:?}", path))
    };
    let stderr = open(stderr_path.as_path())?;
    let stdout = open(run.stdout_log(name).as_path())?;

    let command = job_command_line(spec, run, None);
    info!(job = name, cmd = %command, "running init job");
    let status = shell(&command)
        .stdin(Stdio::null())
        .stdout(Stdio::from(stdout))
        .stderr(Stdio::from(stderr))
        .status()
        .await
        .with_context(|| format!("spawning init job '{name}'"))?;

    if !status.success() {
        return Err(LazydagError::InitFailed {
            job: name.to_string(),
            code: status.code(),
        });
    }
    info!(job = name, "init job finished");
    Ok(true)
}
