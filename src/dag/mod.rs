// src/dag/mod.rs

//! Dependency graph of jobs.
//!
//! - [`job`] holds one node: description, edges, status and handle slot.
//! - [`graph`] is the arena that owns every node and builds it from a
//!   workflow description.

pub mod graph;
pub mod job;

pub use graph::DependencyGraph;
pub use job::{Job, JobId, JobKind, STAGE_TASK_TYPE};
