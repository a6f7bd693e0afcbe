// src/workflow/mod.rs

//! Workflow description loading and validation.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a workflow file from disk (`loader.rs`).
//! - Validate invariants like DAG acyclicity and pool ordering (`validate.rs`).
//! - Evaluate job command templates (`command.rs`).

pub mod command;
pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path};
pub use model::{
    EngineSection, ExecutorKind, JobSpec, LOCAL_POOL, PoolConfig, RawWorkflowFile, RunSection,
    WorkflowFile, stage_job_name, task_type_from_name,
};
pub use validate::validate_engine;
