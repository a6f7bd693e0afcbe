// src/status/logs.rs

//! Per-job stderr log inspection.

use std::path::Path;

use tracing::warn;

use crate::fs::FileSystem;
use crate::workflow::command::{FAILURE_MARKER, SUCCESS_MARKER};

/// What a job's stderr log says about it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogVerdict {
    /// No log file: the job has not started (or ran elsewhere).
    Missing,
    Success,
    Failure,
    /// Log present without a final marker: still running, or cut off.
    Incomplete,
}

/// Last line of `text` with non-whitespace content.
pub fn last_non_empty_line(text: &str) -> Option<&str> {
    text.lines().rev().find(|line| !line.trim().is_empty())
}

pub fn classify_line(line: &str) -> LogVerdict {
    let line = line.trim_start();
    if line.starts_with(SUCCESS_MARKER) {
        LogVerdict::Success
    } else if line.starts_with(FAILURE_MARKER) {
        LogVerdict::Failure
    } else {
        LogVerdict::Incomplete
    }
}

pub fn inspect_log(fs: &dyn FileSystem, path: &Path) -> LogVerdict {
    if !fs.is_file(path) {
        return LogVerdict::Missing;
    }
    match fs.read_to_string(path) {
        Ok(text) => last_non_empty_line(&text)
            .map(classify_line)
            .unwrap_or(LogVerdict::Incomplete),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "could not read job log");
            LogVerdict::Incomplete
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    #[test]
    fn verdict_follows_last_non_empty_line() {
        let fs = MockFileSystem::new();
        fs.add_file("/l/ok.stderr", "warming up\nsuccess\n\n");
        fs.add_file("/l/bad.stderr", "success\nfailure\n");
        fs.add_file("/l/busy.stderr", "processing visit 12\n");
        fs.add_file("/l/empty.stderr", "");

        assert_eq!(inspect_log(&fs, Path::new("/l/ok.stderr")), LogVerdict::Success);
        assert_eq!(inspect_log(&fs, Path::new("/l/bad.stderr")), LogVerdict::Failure);
        assert_eq!(inspect_log(&fs, Path::new("/l/busy.stderr")), LogVerdict::Incomplete);
        assert_eq!(inspect_log(&fs, Path::new("/l/empty.stderr")), LogVerdict::Incomplete);
        assert_eq!(inspect_log(&fs, Path::new("/l/none.stderr")), LogVerdict::Missing);
    }
}
