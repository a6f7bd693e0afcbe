// src/exec/backend.rs

//! Pluggable execution engine abstraction.
//!
//! The scheduler talks to an `ExecutionEngine` instead of spawning processes
//! itself. Production code uses [`LocalEngine`](super::LocalEngine); tests
//! provide an engine that records submissions and resolves handles directly.

use std::path::PathBuf;

use crate::exec::handle::Handle;
use crate::types::{JobName, ResourceHint};

/// Where a submission should run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoolTarget {
    /// A discrete named pool (e.g. `"small"`, or the local submit-node pool).
    Named(String),
    /// The single elastic pool, with the job's resource hint passed through
    /// and tagged with its logical task type.
    Elastic { hint: ResourceHint, task_type: String },
}

impl PoolTarget {
    pub fn name(&self) -> &str {
        match self {
            PoolTarget::Named(name) => name,
            PoolTarget::Elastic { .. } => "elastic",
        }
    }
}

/// One job submission.
#[derive(Debug, Clone)]
pub struct SubmitRequest {
    pub job: JobName,
    pub task_type: String,
    /// Fully evaluated shell command line.
    pub command: String,
    /// Prerequisite handles; the command must not start before all of them
    /// have succeeded.
    pub inputs: Vec<Handle>,
    pub stdout: PathBuf,
    pub stderr: PathBuf,
}

/// The external concurrent execution substrate.
pub trait ExecutionEngine: Send + Sync {
    /// Submit a job and return its handle immediately.
    fn submit(&self, target: &PoolTarget, request: SubmitRequest) -> Handle;

    /// A handle that is already satisfied, tagged with the job's task type so
    /// that per-type statistics can tell no-ops apart.
    fn no_op(&self, task_type: &str) -> Handle;
}
