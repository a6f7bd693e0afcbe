// src/status/monitoring.rs

//! Monitoring store: timestamped status events per job.
//!
//! The store is a JSON-lines file, one [`MonitoringEvent`] per line, appended
//! by the execution engine and queried by the status resolver and the
//! summary command.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::errors::{LazydagError, Result};
use crate::fs::FileSystem;
use crate::types::{JobName, JobStatus};

/// Status vocabulary recorded in the monitoring store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MonitorStatus {
    Pending,
    Launched,
    Running,
    Completed,
    Failed,
    DependencyFailed,
}

impl MonitorStatus {
    pub const ALL: [MonitorStatus; 6] = [
        MonitorStatus::Pending,
        MonitorStatus::Launched,
        MonitorStatus::Running,
        MonitorStatus::Completed,
        MonitorStatus::Failed,
        MonitorStatus::DependencyFailed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MonitorStatus::Pending => "pending",
            MonitorStatus::Launched => "launched",
            MonitorStatus::Running => "running",
            MonitorStatus::Completed => "completed",
            MonitorStatus::Failed => "failed",
            MonitorStatus::DependencyFailed => "dependency-failed",
        }
    }

    /// Job status implied by a recorded event, before any output check.
    ///
    /// A dependency failure means the job never ran, so it is still pending.
    pub fn tentative_job_status(self) -> JobStatus {
        match self {
            MonitorStatus::Pending | MonitorStatus::DependencyFailed => JobStatus::Pending,
            MonitorStatus::Launched => JobStatus::Scheduled,
            MonitorStatus::Running => JobStatus::Running,
            MonitorStatus::Completed => JobStatus::Succeeded,
            MonitorStatus::Failed => JobStatus::Failed,
        }
    }
}

impl fmt::Display for MonitorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One line of the monitoring store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitoringEvent {
    pub workflow: String,
    pub job: JobName,
    pub status: MonitorStatus,
    pub timestamp: DateTime<Utc>,
}

impl MonitoringEvent {
    pub fn now(workflow: impl Into<String>, job: impl Into<JobName>, status: MonitorStatus) -> Self {
        Self {
            workflow: workflow.into(),
            job: job.into(),
            status,
            timestamp: Utc::now(),
        }
    }
}

/// Latest recorded event for one job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitoringRow {
    pub status: MonitorStatus,
    pub timestamp: DateTime<Utc>,
}

/// Latest status of every job of a workflow, as of one query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MonitoringSnapshot {
    rows: BTreeMap<JobName, MonitoringRow>,
}

impl MonitoringSnapshot {
    /// Fold events into latest-per-job rows. Later events win timestamp ties.
    pub fn from_events<'a>(events: impl IntoIterator<Item = &'a MonitoringEvent>) -> Self {
        let mut rows: BTreeMap<JobName, MonitoringRow> = BTreeMap::new();
        for event in events {
            let row = MonitoringRow {
                status: event.status,
                timestamp: event.timestamp,
            };
            match rows.get_mut(&event.job) {
                Some(existing) if existing.timestamp > event.timestamp => {}
                Some(existing) => *existing = row,
                None => {
                    rows.insert(event.job.clone(), row);
                }
            }
        }
        Self { rows }
    }

    pub fn get(&self, job: &str) -> Option<&MonitoringRow> {
        self.rows.get(job)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MonitoringRow)> {
        self.rows.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Query/record interface of the monitoring datastore.
pub trait MonitoringStore: Send + Sync + fmt::Debug {
    fn record(&self, event: &MonitoringEvent) -> Result<()>;

    /// Latest status per job for `workflow`.
    ///
    /// Returns [`LazydagError::MonitoringUnavailable`] when the store does not
    /// exist or holds no rows for the workflow.
    fn query(&self, workflow: &str) -> Result<MonitoringSnapshot>;
}

/// JSON-lines monitoring store.
#[derive(Debug)]
pub struct JsonlMonitoringStore {
    path: PathBuf,
    fs: Arc<dyn FileSystem>,
    write_lock: Mutex<()>,
}

impl JsonlMonitoringStore {
    pub fn new(path: impl Into<PathBuf>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            path: path.into(),
            fs,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl MonitoringStore for JsonlMonitoringStore {
    fn record(&self, event: &MonitoringEvent) -> Result<()> {
        let mut line = serde_json::to_vec(event)?;
        line.push(b'\n');
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        self.fs.append(&self.path, &line)?;
        Ok(())
    }

    fn query(&self, workflow: &str) -> Result<MonitoringSnapshot> {
        if !self.fs.is_file(&self.path) {
            return Err(LazydagError::MonitoringUnavailable(format!(
                "{} not found",
                self.path.display()
            )));
        }
        let contents = self.fs.read_to_string(&self.path)?;

        let mut events = Vec::new();
        for (lineno, line) in contents.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<MonitoringEvent>(line) {
                Ok(event) if event.workflow == workflow => events.push(event),
                Ok(_) => {}
                Err(e) => {
                    // A writer may be mid-line; skip rather than fail the query.
                    warn!(
                        path = %self.path.display(),
                        line = lineno + 1,
                        error = %e,
                        "skipping unreadable monitoring record"
                    );
                }
            }
        }

        if events.is_empty() {
            return Err(LazydagError::MonitoringUnavailable(format!(
                "workflow {workflow} not in {}",
                self.path.display()
            )));
        }

        let snapshot = MonitoringSnapshot::from_events(&events);
        debug!(
            workflow,
            events = events.len(),
            jobs = snapshot.len(),
            "queried monitoring store"
        );
        Ok(snapshot)
    }
}
