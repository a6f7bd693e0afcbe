// src/dag/job.rs

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, OnceLock};

use crate::exec::{Handle, HandleOutcome};
use crate::status::StatusResolver;
use crate::types::{JobName, JobStatus, ResourceRequest};
use crate::workflow::{JobSpec, task_type_from_name};

/// Index of a job inside its [`DependencyGraph`](super::DependencyGraph).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(pub(crate) usize);

impl JobId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Task type reported for staging jobs.
pub const STAGE_TASK_TYPE: &str = "stage";

#[derive(Debug, Clone, PartialEq)]
pub enum JobKind {
    /// A job described in the workflow file.
    Workflow(JobSpec),
    /// Copies the staging template into the job's private repository.
    Stage { source: PathBuf, dest: PathBuf },
    /// Referenced by name but never described. Never submitted.
    Placeholder,
}

/// One node of the dependency graph.
///
/// Edges only ever grow. The status moves forward except for the
/// `Failed -> Succeeded` correction applied when all outputs exist. The
/// handle is created at most once.
#[derive(Debug)]
pub struct Job {
    id: JobId,
    name: JobName,
    kind: JobKind,
    dependents: BTreeSet<JobId>,
    prerequisites: BTreeSet<JobId>,
    status: Mutex<JobStatus>,
    handle: OnceLock<Handle>,
}

impl Job {
    pub(crate) fn new(id: JobId, name: JobName, kind: JobKind) -> Self {
        Self {
            id,
            name,
            kind,
            dependents: BTreeSet::new(),
            prerequisites: BTreeSet::new(),
            status: Mutex::new(JobStatus::Pending),
            handle: OnceLock::new(),
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &JobKind {
        &self.kind
    }

    pub fn spec(&self) -> Option<&JobSpec> {
        match &self.kind {
            JobKind::Workflow(spec) => Some(spec),
            _ => None,
        }
    }

    pub fn is_staging(&self) -> bool {
        matches!(self.kind, JobKind::Stage { .. })
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self.kind, JobKind::Placeholder)
    }

    pub fn task_type(&self) -> &str {
        match &self.kind {
            JobKind::Workflow(spec) => spec.task_type(&self.name),
            JobKind::Stage { .. } => STAGE_TASK_TYPE,
            JobKind::Placeholder => task_type_from_name(&self.name),
        }
    }

    /// Declared outputs; empty for staging jobs and placeholders.
    pub fn outputs(&self) -> &[String] {
        self.spec().map(|s| s.outputs.as_slice()).unwrap_or(&[])
    }

    pub fn resources(&self) -> ResourceRequest {
        self.spec().map(|s| s.resources).unwrap_or_default()
    }

    /// Record that `id` requires this job. Returns whether the edge is new.
    pub(crate) fn add_dependency(&mut self, id: JobId) -> bool {
        self.dependents.insert(id)
    }

    /// Record that this job requires `id`. Returns whether the edge is new.
    pub(crate) fn add_prerequisite(&mut self, id: JobId) -> bool {
        self.prerequisites.insert(id)
    }

    pub fn dependents(&self) -> &BTreeSet<JobId> {
        &self.dependents
    }

    pub fn prerequisites(&self) -> &BTreeSet<JobId> {
        &self.prerequisites
    }

    fn lock_status(&self) -> MutexGuard<'_, JobStatus> {
        self.status.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Last known status, without consulting any source.
    pub fn status(&self) -> JobStatus {
        *self.lock_status()
    }

    pub(crate) fn mark_scheduled(&self) {
        let mut status = self.lock_status();
        if *status == JobStatus::Pending {
            *status = JobStatus::Scheduled;
        }
    }

    /// Whether the job is known to have succeeded.
    ///
    /// Terminal statuses are cached. A job holding a handle from this run is
    /// judged by that handle only; otherwise the resolver is consulted.
    pub fn is_done(&self, resolver: &StatusResolver) -> bool {
        if let Some(handle) = self.handle.get() {
            if let Some(outcome) = handle.outcome() {
                self.record_outcome(outcome, resolver);
            }
            return self.status() == JobStatus::Succeeded;
        }

        let mut status = self.lock_status();
        if !status.is_terminal() {
            let resolved = resolver.resolve(self);
            // Sources that know nothing never move a job backwards.
            if resolved != JobStatus::Pending {
                *status = resolved;
            }
        }
        *status == JobStatus::Succeeded
    }

    /// Fold a resolved handle outcome into the status.
    pub(crate) fn record_outcome(&self, outcome: HandleOutcome, resolver: &StatusResolver) {
        if self.status() == JobStatus::Succeeded {
            return;
        }
        let next = match outcome {
            HandleOutcome::Succeeded => JobStatus::Succeeded,
            HandleOutcome::Failed { .. } => resolver.reconcile_failure(self),
            // Never ran.
            HandleOutcome::DependencyFailed => JobStatus::Pending,
        };
        *self.lock_status() = next;
    }

    pub fn handle(&self) -> Option<&Handle> {
        self.handle.get()
    }

    pub(crate) fn handle_or_init(&self, init: impl FnOnce() -> Handle) -> &Handle {
        self.handle.get_or_init(init)
    }
}
