// src/scheduler/mod.rs

//! Lazy scheduling on top of the dependency graph.
//!
//! - [`lazy`] obtains one handle per job, prerequisites first.
//! - [`init`] runs the initialization precondition of a fresh run.
//! - [`finalize`] runs the consolidating step of a staged run.

pub mod finalize;
pub mod init;
pub mod lazy;

pub use finalize::Finalizer;
pub use init::{init_needed, run_init_job};
pub use lazy::{LazyScheduler, RunOptions, RunReport};
