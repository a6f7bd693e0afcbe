// src/workflow/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::errors::{LazydagError, Result};
use crate::workflow::model::{RawWorkflowFile, WorkflowFile};

/// Load a workflow description and return the raw `RawWorkflowFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawWorkflowFile> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(LazydagError::MissingWorkflow(path.to_path_buf()));
    }
    let contents = fs::read_to_string(path)?;

    let workflow: RawWorkflowFile = toml::from_str(&contents)?;

    Ok(workflow)
}

/// Load a workflow description from path and validate it.
///
/// - Reads TOML.
/// - Applies defaults (handled by `serde` + `Default` impls).
/// - Checks successor references, cycles, pool and staging settings.
/// - Resolves relative `[run]` paths against the file's directory.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<WorkflowFile> {
    let path = path.as_ref();
    let raw = load_from_path(path)?;
    let mut workflow = WorkflowFile::try_from(raw)?;
    workflow.run.resolve_paths(&base_dir(path));
    debug!(
        path = %path.display(),
        jobs = workflow.job.len(),
        "loaded workflow description"
    );
    Ok(workflow)
}

/// Directory that relative paths in a workflow file are resolved against.
///
/// A bare filename like `"workflow.toml"` has an empty parent, in which case
/// the current working directory is used.
pub fn base_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}
