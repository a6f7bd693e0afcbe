// src/workflow/model.rs

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::types::{JobName, ResourceRequest};

/// Name of the local pool that runs no-op handles and staging jobs.
pub const LOCAL_POOL: &str = "submit-node";

/// Top-level workflow description as read from a TOML file.
///
/// ```toml
/// [run]
/// name = "u/demo/run1"
/// submit_dir = "submit/run1"
/// repository = "repo"
/// output_collection = "u/demo/run1"
///
/// [engine]
/// executor = "pools"
/// [[engine.pools]]
/// name = "small"
/// max_workers = 4
/// mem_per_worker = 4.0
///
/// [job.isr_1]
/// cmd = "run_isr --visit 1"
/// successors = ["calibrate_1"]
/// ```
///
/// This type is **unvalidated**. Use [`WorkflowFile::try_from`] to get a
/// validated [`WorkflowFile`].
#[derive(Debug, Clone, Deserialize)]
pub struct RawWorkflowFile {
    pub run: RunSection,

    #[serde(default)]
    pub engine: EngineSection,

    /// All jobs from `[job.<name>]`, keyed by job name.
    #[serde(default)]
    pub job: BTreeMap<JobName, JobSpec>,
}

/// Validated workflow description.
///
/// Can only be constructed through `TryFrom<RawWorkflowFile>` (see
/// `workflow::validate`), so holders may assume successor references are
/// valid and the graph is acyclic.
#[derive(Debug, Clone)]
pub struct WorkflowFile {
    pub run: RunSection,
    pub engine: EngineSection,
    pub job: BTreeMap<JobName, JobSpec>,
}

impl WorkflowFile {
    pub(crate) fn new_unchecked(
        run: RunSection,
        engine: EngineSection,
        job: BTreeMap<JobName, JobSpec>,
    ) -> Self {
        Self { run, engine, job }
    }

    /// The initialization job, if one is configured.
    pub fn init_job(&self) -> Option<(&str, &JobSpec)> {
        let name = self.run.init_job.as_deref()?;
        self.job.get(name).map(|spec| (name, spec))
    }

    /// Whether `name` is the designated initialization node.
    pub fn is_init_job(&self, name: &str) -> bool {
        self.run.init_job.as_deref() == Some(name)
    }
}

/// `[run]` section: identity of the run and where its artifacts live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSection {
    /// Workflow/run identifier used to query the monitoring store.
    pub name: String,

    /// Directory holding per-job logs (`logging/`) and the persisted state.
    pub submit_dir: PathBuf,

    /// Root of the data repository.
    pub repository: PathBuf,

    /// Collection in which job outputs are looked up.
    pub output_collection: String,

    /// Designated initialization node, run once before ingestion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub init_job: Option<JobName>,

    /// Prefix for every job command line (e.g. `"time"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command_prepend: Option<String>,

    /// Monitoring store location (JSON lines).
    #[serde(default = "default_monitoring_db")]
    pub monitoring_db: PathBuf,

    /// Template repository copied per job when outputs are staged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staging_dir: Option<PathBuf>,

    /// Consolidating transfer step run after a staged run completes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finalize_command: Option<String>,

    /// Preferred ordering of task types in status summaries.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub task_order: Vec<String>,
}

fn default_monitoring_db() -> PathBuf {
    PathBuf::from("monitoring.jsonl")
}

impl RunSection {
    /// Directory holding `<job>.stderr` / `<job>.stdout`.
    pub fn log_dir(&self) -> PathBuf {
        self.submit_dir.join("logging")
    }

    /// Standard-error log of a job.
    pub fn stderr_log(&self, job: &str) -> PathBuf {
        self.log_dir().join(format!("{job}.stderr"))
    }

    /// Standard-output log of a job.
    pub fn stdout_log(&self, job: &str) -> PathBuf {
        self.log_dir().join(format!("{job}.stdout"))
    }

    /// Parent of the per-job staged repository copies.
    pub fn staging_tmp_dir(&self) -> Option<PathBuf> {
        let staging = self.staging_dir.as_ref()?;
        let parent = staging.parent().unwrap_or_else(|| Path::new("."));
        Some(parent.join("tmp_repos"))
    }

    /// Resolve relative paths against `base` (the workflow file directory).
    pub fn resolve_paths(&mut self, base: &Path) {
        fn resolve(base: &Path, p: &mut PathBuf) {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        }
        resolve(base, &mut self.submit_dir);
        resolve(base, &mut self.repository);
        resolve(base, &mut self.monitoring_db);
        if let Some(staging) = self.staging_dir.as_mut() {
            resolve(base, staging);
        }
    }
}

/// Kind of execution substrate the dispatcher routes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutorKind {
    /// Discrete named pools with memory ceilings.
    Pools,
    /// One pool that accepts per-job resource hints.
    #[default]
    Elastic,
}

/// `[engine]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSection {
    #[serde(default)]
    pub executor: ExecutorKind,

    /// Capacity of the submit-node pool.
    #[serde(default = "default_local_workers")]
    pub local_workers: usize,

    /// Core capacity of the elastic pool.
    #[serde(default = "default_elastic_cores")]
    pub elastic_cores: u32,

    /// Named pools, in increasing-size order.
    #[serde(default)]
    pub pools: Vec<PoolConfig>,
}

fn default_local_workers() -> usize {
    1
}

fn default_elastic_cores() -> u32 {
    4
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            executor: ExecutorKind::default(),
            local_workers: default_local_workers(),
            elastic_cores: default_elastic_cores(),
            pools: Vec::new(),
        }
    }
}

/// `[[engine.pools]]` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolConfig {
    pub name: String,

    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    /// Per-worker memory ceiling in GB; `None` means unconstrained.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mem_per_worker: Option<f64>,
}

fn default_max_workers() -> usize {
    1
}

/// `[job.<name>]` section: one node of the generic workflow.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct JobSpec {
    /// Command line template (opaque to the scheduler).
    pub cmd: String,

    /// Logical task type; derived from the job name when absent.
    #[serde(default)]
    pub label: Option<String>,

    /// Jobs that require this one.
    #[serde(default)]
    pub successors: Vec<JobName>,

    /// Output identifiers looked up in the output collection.
    #[serde(default)]
    pub outputs: Vec<String>,

    #[serde(default)]
    pub resources: ResourceRequest,

    /// `{key}` substitutions for `cmd`.
    #[serde(default)]
    pub cmdvals: BTreeMap<String, String>,

    /// `<FILE:key>` substitutions for `cmd`.
    #[serde(default)]
    pub inputs: BTreeMap<String, String>,
}

/// Task type of a job name following the `<prefix>_<task>_<dataId...>`
/// convention; falls back to the whole name.
pub fn task_type_from_name(name: &str) -> &str {
    name.split('_').nth(1).filter(|s| !s.is_empty()).unwrap_or(name)
}

/// Name of the staging job that prepares `name`'s private repository.
pub fn stage_job_name(name: &str) -> String {
    format!("{name}_stage")
}

impl JobSpec {
    pub fn task_type<'a>(&'a self, name: &'a str) -> &'a str {
        self.label.as_deref().unwrap_or_else(|| task_type_from_name(name))
    }
}
