use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Canonical job name type used throughout the crate.
pub type JobName = String;

/// Scheduling status of a job.
///
/// `Succeeded` and `Failed` are terminal. The only backwards move allowed is
/// `Failed -> Succeeded`, when every declared output turns out to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum JobStatus {
    /// Not yet known to be running or done.
    #[default]
    Pending,
    /// A handle exists but has not resolved.
    Scheduled,
    Running,
    Succeeded,
    Failed,
}

impl JobStatus {
    pub const ALL: [JobStatus; 5] = [
        JobStatus::Pending,
        JobStatus::Scheduled,
        JobStatus::Running,
        JobStatus::Succeeded,
        JobStatus::Failed,
    ];

    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Scheduled => "scheduled",
            JobStatus::Running => "running",
            JobStatus::Succeeded => "succeeded",
            JobStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(JobStatus::Pending),
            "scheduled" => Ok(JobStatus::Scheduled),
            "running" => Ok(JobStatus::Running),
            "succeeded" => Ok(JobStatus::Succeeded),
            "failed" => Ok(JobStatus::Failed),
            other => Err(format!("invalid job status: {other}")),
        }
    }
}

/// Declared resource request of a job: memory (MB), cpu cores, disk (MB).
///
/// Absent components mean "no constraint".
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ResourceRequest {
    #[serde(default)]
    pub memory: Option<u64>,
    #[serde(default)]
    pub cpus: Option<u32>,
    #[serde(default)]
    pub disk: Option<u64>,
}

impl ResourceRequest {
    /// Requested memory in GB, zero when unconstrained.
    pub fn memory_gb(&self) -> f64 {
        self.memory.unwrap_or(0) as f64 / 1024.0
    }

    /// Hint with absent components replaced by zero.
    pub fn hint(&self) -> ResourceHint {
        ResourceHint {
            memory: self.memory.unwrap_or(0),
            cores: self.cpus.unwrap_or(0),
            disk: self.disk.unwrap_or(0),
        }
    }
}

/// Resource triple handed to an elastic pool. Zero means "no limit applied".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResourceHint {
    pub memory: u64,
    pub cores: u32,
    pub disk: u64,
}

/// How a local copy of the persisted state file is made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkMode {
    #[default]
    Symlink,
    Copy,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_resources_become_zero_hint() {
        let req = ResourceRequest {
            memory: Some(4096),
            cpus: None,
            disk: None,
        };
        assert_eq!(
            req.hint(),
            ResourceHint {
                memory: 4096,
                cores: 0,
                disk: 0
            }
        );
        assert_eq!(req.memory_gb(), 4.0);
        assert_eq!(ResourceRequest::default().memory_gb(), 0.0);
    }

    #[test]
    fn only_succeeded_and_failed_are_terminal() {
        let terminal: Vec<_> = JobStatus::ALL
            .iter()
            .filter(|s| s.is_terminal())
            .collect();
        assert_eq!(terminal, vec![&JobStatus::Succeeded, &JobStatus::Failed]);
        assert_eq!("Running".parse::<JobStatus>(), Ok(JobStatus::Running));
    }
}
