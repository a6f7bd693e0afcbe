// src/status/repository.rs

//! Data-repository interface: existence queries for job outputs.

use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::errors::Result;
use crate::fs::FileSystem;

pub trait DataRepository: Send + Sync + Debug {
    /// Whether `output` exists in `collection`.
    fn exists(&self, output: &str, collection: &str) -> Result<bool>;

    /// Whether `collection` exists at all.
    fn has_collection(&self, collection: &str) -> Result<bool>;
}

/// Repository laid out on a file system as `<root>/<collection>/<output>`.
#[derive(Debug, Clone)]
pub struct FsRepository {
    root: PathBuf,
    fs: Arc<dyn FileSystem>,
}

impl FsRepository {
    pub fn new(root: impl Into<PathBuf>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            root: root.into(),
            fs,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn output_path(&self, output: &str, collection: &str) -> PathBuf {
        self.root.join(collection).join(output)
    }
}

impl DataRepository for FsRepository {
    fn exists(&self, output: &str, collection: &str) -> Result<bool> {
        Ok(self.fs.exists(&self.output_path(output, collection)))
    }

    fn has_collection(&self, collection: &str) -> Result<bool> {
        Ok(self.fs.is_dir(&self.root.join(collection)))
    }
}

/// Whether every one of `outputs` exists. Short-circuits on the first miss.
pub fn all_outputs_exist(
    repository: &dyn DataRepository,
    outputs: &[String],
    collection: &str,
) -> Result<bool> {
    for output in outputs {
        if !repository.exists(output, collection)? {
            return Ok(false);
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    #[test]
    fn outputs_are_files_under_collection() {
        let fs = Arc::new(MockFileSystem::new());
        fs.add_file("/repo/u/run/calexp/1", "x");
        let repo = FsRepository::new("/repo", fs);

        assert!(repo.exists("calexp/1", "u/run").unwrap());
        assert!(!repo.exists("calexp/2", "u/run").unwrap());
        assert!(repo.has_collection("u/run").unwrap());
        assert!(!repo.has_collection("u/other").unwrap());

        let outputs = vec!["calexp/1".to_string(), "calexp/2".to_string()];
        assert!(!all_outputs_exist(&repo, &outputs, "u/run").unwrap());
        assert!(all_outputs_exist(&repo, &outputs[..1], "u/run").unwrap());
    }
}
