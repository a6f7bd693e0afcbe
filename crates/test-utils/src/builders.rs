#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use lazydag::types::ResourceRequest;
use lazydag::workflow::{
    EngineSection, ExecutorKind, JobSpec, PoolConfig, RawWorkflowFile, RunSection, WorkflowFile,
};

/// Builder for `WorkflowFile` to simplify test setup.
///
/// Paths default to `/submit`, `/repo` and `/submit/monitoring.jsonl`, which
/// suits a `MockFileSystem`; use [`WorkflowBuilder::rooted_at`] for tests
/// touching the real file system.
pub struct WorkflowBuilder {
    workflow: RawWorkflowFile,
}

impl WorkflowBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            workflow: RawWorkflowFile {
                run: RunSection {
                    name: name.to_string(),
                    submit_dir: PathBuf::from("/submit"),
                    repository: PathBuf::from("/repo"),
                    output_collection: "out".to_string(),
                    init_job: None,
                    command_prepend: None,
                    monitoring_db: PathBuf::from("/submit/monitoring.jsonl"),
                    staging_dir: None,
                    finalize_command: None,
                    task_order: Vec::new(),
                },
                engine: EngineSection::default(),
                job: BTreeMap::new(),
            },
        }
    }

    /// Put submit dir, repository and monitoring store under `root`.
    pub fn rooted_at(mut self, root: &Path) -> Self {
        let run = &mut self.workflow.run;
        run.submit_dir = root.join("submit");
        run.repository = root.join("repo");
        run.monitoring_db = root.join("submit").join("monitoring.jsonl");
        self
    }

    pub fn with_job(mut self, name: &str, spec: JobSpec) -> Self {
        self.workflow.job.insert(name.to_string(), spec);
        self
    }

    pub fn with_init_job(mut self, name: &str, spec: JobSpec) -> Self {
        self.workflow.run.init_job = Some(name.to_string());
        self.with_job(name, spec)
    }

    pub fn with_staging(mut self, staging_dir: impl Into<PathBuf>, finalize: &str) -> Self {
        self.workflow.run.staging_dir = Some(staging_dir.into());
        self.workflow.run.finalize_command = Some(finalize.to_string());
        self
    }

    pub fn with_collection(mut self, collection: &str) -> Self {
        self.workflow.run.output_collection = collection.to_string();
        self
    }

    /// Discrete pools as `(name, mem_per_worker GB)`, smallest first.
    pub fn with_pools(mut self, pools: &[(&str, Option<f64>)]) -> Self {
        self.workflow.engine.executor = ExecutorKind::Pools;
        self.workflow.engine.pools = pools
            .iter()
            .map(|(name, mem)| PoolConfig {
                name: name.to_string(),
                max_workers: 2,
                mem_per_worker: *mem,
            })
            .collect();
        self
    }

    pub fn with_elastic_cores(mut self, cores: u32) -> Self {
        self.workflow.engine.executor = ExecutorKind::Elastic;
        self.workflow.engine.elastic_cores = cores;
        self
    }

    pub fn raw(self) -> RawWorkflowFile {
        self.workflow
    }

    pub fn build(self) -> WorkflowFile {
        WorkflowFile::try_from(self.workflow).expect("Failed to build valid workflow from builder")
    }
}

/// Builder for `JobSpec`.
pub struct JobSpecBuilder {
    spec: JobSpec,
}

impl JobSpecBuilder {
    pub fn new(cmd: &str) -> Self {
        Self {
            spec: JobSpec {
                cmd: cmd.to_string(),
                ..Default::default()
            },
        }
    }

    pub fn successor(mut self, name: &str) -> Self {
        self.spec.successors.push(name.to_string());
        self
    }

    pub fn output(mut self, output: &str) -> Self {
        self.spec.outputs.push(output.to_string());
        self
    }

    pub fn label(mut self, label: &str) -> Self {
        self.spec.label = Some(label.to_string());
        self
    }

    pub fn memory_mb(mut self, mb: u64) -> Self {
        self.spec.resources = ResourceRequest {
            memory: Some(mb),
            ..self.spec.resources
        };
        self
    }

    pub fn cpus(mut self, cpus: u32) -> Self {
        self.spec.resources.cpus = Some(cpus);
        self
    }

    pub fn cmdval(mut self, key: &str, value: &str) -> Self {
        self.spec.cmdvals.insert(key.to_string(), value.to_string());
        self
    }

    pub fn build(self) -> JobSpec {
        self.spec
    }
}

/// Workflow of a linear chain `names[0] -> names[1] -> ...`.
pub fn chain(workflow: &str, names: &[&str]) -> WorkflowBuilder {
    let mut builder = WorkflowBuilder::new(workflow);
    for (idx, name) in names.iter().enumerate() {
        let mut spec = JobSpecBuilder::new(&format!("echo {name}")).output(&format!("{name}.out"));
        if let Some(next) = names.get(idx + 1) {
            spec = spec.successor(next);
        }
        builder = builder.with_job(name, spec.build());
    }
    builder
}
