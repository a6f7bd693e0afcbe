// src/exec/mod.rs

//! Execution layer.
//!
//! - [`handle`] defines the resolve-once [`Handle`] returned for every job.
//! - [`backend`] provides the [`ExecutionEngine`] trait the scheduler submits
//!   to, so tests can swap in an engine that never spawns processes.
//! - [`local`] is the production engine: semaphore-bounded pools running
//!   shell commands with tokio.
//! - [`task_runner`] runs a single submission.

pub mod backend;
pub mod handle;
pub mod local;
pub mod task_runner;

pub use backend::{ExecutionEngine, PoolTarget, SubmitRequest};
pub use handle::{Handle, HandleKind, HandleOutcome};
pub use local::LocalEngine;
pub use task_runner::EventRecorder;
