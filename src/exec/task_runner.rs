// src/exec/task_runner.rs

//! Single submission runner: waits for inputs, takes pool capacity, runs the
//! command with its output appended to the job's log files.

use std::fs::{self, File, OpenOptions};
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::process::Command;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use crate::exec::backend::SubmitRequest;
use crate::exec::handle::HandleOutcome;
use crate::status::monitoring::{MonitorStatus, MonitoringEvent, MonitoringStore};

/// Build a shell command appropriate for the platform.
pub(crate) fn shell(command: &str) -> Command {
    if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(command);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(command);
        c
    }
}

/// Writes engine-side status transitions to the monitoring store.
#[derive(Debug, Clone)]
pub struct EventRecorder {
    store: Arc<dyn MonitoringStore>,
    workflow: String,
}

impl EventRecorder {
    pub fn new(store: Arc<dyn MonitoringStore>, workflow: impl Into<String>) -> Self {
        Self {
            store,
            workflow: workflow.into(),
        }
    }

    pub fn record(&self, job: &str, status: MonitorStatus) {
        let event = MonitoringEvent::now(&self.workflow, job, status);
        if let Err(e) = self.store.record(&event) {
            warn!(job, %status, error = %e, "failed to record monitoring event");
        }
    }
}

/// Capacity a submission must hold while its command runs.
#[derive(Debug, Clone)]
pub(crate) struct PoolSlot {
    pub pool: String,
    pub semaphore: Arc<Semaphore>,
    pub permits: u32,
}

/// Run one submission to completion and report its outcome.
pub(crate) async fn run_submission(
    request: SubmitRequest,
    slot: PoolSlot,
    recorder: Option<EventRecorder>,
) -> HandleOutcome {
    let record = |status: MonitorStatus| {
        if let Some(recorder) = &recorder {
            recorder.record(&request.job, status);
        }
    };

    record(MonitorStatus::Pending);

    for input in &request.inputs {
        let outcome = input.wait().await;
        if !outcome.is_success() {
            info!(
                job = %request.job,
                input = input.label(),
                %outcome,
                "prerequisite did not succeed; not starting"
            );
            record(MonitorStatus::DependencyFailed);
            return HandleOutcome::DependencyFailed;
        }
    }

    let _permit = match slot.semaphore.clone().acquire_many_owned(slot.permits).await {
        Ok(permit) => permit,
        Err(e) => {
            error!(job = %request.job, pool = %slot.pool, error = %e, "pool closed");
            record(MonitorStatus::Failed);
            return HandleOutcome::Failed { exit_code: None };
        }
    };

    record(MonitorStatus::Launched);
    info!(
        job = %request.job,
        pool = %slot.pool,
        cmd = %request.command,
        "starting job process"
    );

    let outcome = match spawn_and_wait(&request, || record(MonitorStatus::Running)).await {
        Ok(status) if status.success() => HandleOutcome::Succeeded,
        Ok(status) => HandleOutcome::Failed {
            exit_code: status.code(),
        },
        Err(err) => {
            error!(job = %request.job, error = %err, "job execution error");
            HandleOutcome::Failed { exit_code: None }
        }
    };

    info!(job = %request.job, %outcome, "job process exited");
    record(if outcome.is_success() {
        MonitorStatus::Completed
    } else {
        MonitorStatus::Failed
    });
    outcome
}

fn open_log(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating log dir {:?}", parent))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening log {:?}", path))
}

async fn spawn_and_wait(request: &SubmitRequest, on_spawn: impl FnOnce()) -> Result<ExitStatus> {
    let stdout = open_log(&request.stdout)?;
    let stderr = open_log(&request.stderr)?;

    let mut cmd = shell(&request.command);
    cmd.stdin(Stdio::null())
        .stdout(Stdio::from(stdout))
        .stderr(Stdio::from(stderr))
        .kill_on_drop(true);

    let mut child = cmd
        .spawn()
        .with_context(|| format!("spawning process for job '{}'", request.job))?;
    debug!(job = %request.job, pid = child.id(), "job process spawned");
    on_spawn();

    child
        .wait()
        .await
        .with_context(|| format!("waiting for process of job '{}'", request.job))
}
