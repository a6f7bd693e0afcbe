// src/dag/graph.rs

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::dag::job::{Job, JobId, JobKind};
use crate::types::{JobName, JobStatus};
use crate::workflow::{RunSection, WorkflowFile, stage_job_name};

/// Arena of jobs addressed by [`JobId`], with a name index.
///
/// Every job reachable from the workflow description appears exactly once.
/// Names referenced as successors but never described become placeholders.
#[derive(Debug)]
pub struct DependencyGraph {
    workflow: WorkflowFile,
    jobs: Vec<Job>,
    index: HashMap<JobName, JobId>,
}

impl DependencyGraph {
    /// Build the graph for a validated workflow.
    pub fn from_workflow(workflow: WorkflowFile) -> Self {
        let mut graph = Self {
            workflow,
            jobs: Vec::new(),
            index: HashMap::new(),
        };
        graph.ingest();
        graph
    }

    /// Get-or-create the job named `name`.
    pub fn get(&mut self, name: &str) -> JobId {
        if let Some(id) = self.index.get(name) {
            return *id;
        }
        let kind = match self.workflow.job.get(name) {
            Some(spec) => JobKind::Workflow(spec.clone()),
            None => {
                warn!(job = name, "job referenced but not described; adding placeholder");
                JobKind::Placeholder
            }
        };
        self.insert(name.to_string(), kind)
    }

    fn insert(&mut self, name: JobName, kind: JobKind) -> JobId {
        let id = JobId(self.jobs.len());
        self.jobs.push(Job::new(id, name.clone(), kind));
        self.index.insert(name, id);
        id
    }

    /// Add the edge `prerequisite -> dependent` on both endpoints.
    fn link(&mut self, prerequisite: JobId, dependent: JobId) {
        self.jobs[prerequisite.0].add_dependency(dependent);
        self.jobs[dependent.0].add_prerequisite(prerequisite);
    }

    fn ingest(&mut self) {
        let staging = match (
            self.workflow.run.staging_dir.clone(),
            self.workflow.run.staging_tmp_dir(),
        ) {
            (Some(source), Some(tmp)) => Some((source, tmp)),
            _ => None,
        };

        let names: Vec<JobName> = self
            .workflow
            .job
            .keys()
            .filter(|name| !self.workflow.is_init_job(name))
            .cloned()
            .collect();

        for name in names {
            let id = self.get(&name);

            if let Some((source, tmp)) = &staging {
                let stage_name = stage_job_name(&name);
                let stage = match self.index.get(&stage_name) {
                    Some(existing) => *existing,
                    None => self.insert(
                        stage_name,
                        JobKind::Stage {
                            source: source.clone(),
                            dest: tmp.join(&name),
                        },
                    ),
                };
                self.link(stage, id);
            }

            let successors = self.workflow.job[&name].successors.clone();
            for successor in successors {
                if self.workflow.is_init_job(&successor) {
                    continue;
                }
                let succ = self.get(&successor);
                self.link(id, succ);
            }
        }

        debug!(
            jobs = self.jobs.len(),
            staged = staging.is_some(),
            "built dependency graph"
        );
    }

    pub fn job(&self, id: JobId) -> &Job {
        &self.jobs[id.0]
    }

    pub fn lookup(&self, name: &str) -> Option<&Job> {
        self.index.get(name).map(|id| &self.jobs[id.0])
    }

    pub fn id_of(&self, name: &str) -> Option<JobId> {
        self.index.get(name).copied()
    }

    pub fn jobs(&self) -> impl Iterator<Item = &Job> {
        self.jobs.iter()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Jobs nothing depends on, in insertion order.
    pub fn sinks(&self) -> Vec<JobId> {
        self.jobs
            .iter()
            .filter(|job| job.dependents().is_empty())
            .map(Job::id)
            .collect()
    }

    /// Names of jobs with the given task type and, optionally, last known
    /// status.
    pub fn jobs_with(&self, task_type: &str, status: Option<JobStatus>) -> Vec<JobName> {
        self.jobs
            .iter()
            .filter(|job| job.task_type() == task_type)
            .filter(|job| status.is_none_or(|s| job.status() == s))
            .map(|job| job.name().to_string())
            .collect()
    }

    pub fn workflow(&self) -> &WorkflowFile {
        &self.workflow
    }

    pub fn run(&self) -> &RunSection {
        &self.workflow.run
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::{EngineSection, JobSpec};
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    fn run(staging: bool) -> RunSection {
        RunSection {
            name: "wf".into(),
            submit_dir: PathBuf::from("/submit"),
            repository: PathBuf::from("/repo"),
            output_collection: "out".into(),
            init_job: Some("init".into()),
            command_prepend: None,
            monitoring_db: PathBuf::from("/submit/m.jsonl"),
            staging_dir: staging.then(|| PathBuf::from("/data/exec_template")),
            finalize_command: staging.then(|| "final_job.bash".to_string()),
            task_order: Vec::new(),
        }
    }

    fn spec(successors: &[&str]) -> JobSpec {
        JobSpec {
            cmd: "true".into(),
            successors: successors.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    fn workflow(staging: bool, jobs: &[(&str, &[&str])]) -> WorkflowFile {
        let job: BTreeMap<_, _> = jobs
            .iter()
            .map(|(name, succ)| (name.to_string(), spec(succ)))
            .collect();
        WorkflowFile::new_unchecked(run(staging), EngineSection::default(), job)
    }

    #[test]
    fn edges_are_recorded_on_both_ends_and_init_is_skipped() {
        let graph = DependencyGraph::from_workflow(workflow(
            false,
            &[("init", &["job_a_1"]), ("job_a_1", &["job_b_1"]), ("job_b_1", &[])],
        ));

        assert!(graph.lookup("init").is_none());
        let a = graph.lookup("job_a_1").unwrap();
        let b = graph.lookup("job_b_1").unwrap();
        assert!(a.dependents().contains(&b.id()));
        assert!(b.prerequisites().contains(&a.id()));
        assert_eq!(graph.sinks(), vec![b.id()]);
    }

    #[test]
    fn unknown_successor_becomes_placeholder() {
        let mut graph = DependencyGraph::from_workflow(workflow(false, &[("job_a_1", &["ghost"])]));
        let ghost = graph.lookup("ghost").unwrap();
        assert!(ghost.is_placeholder());
        let ghost_id = ghost.id();
        let before = graph.len();
        let again = graph.get("ghost");
        assert_eq!(again, ghost_id);
        assert_eq!(graph.len(), before);
    }

    #[test]
    fn staging_adds_one_stage_job_per_workflow_job() {
        let graph = DependencyGraph::from_workflow(workflow(
            true,
            &[("job_a_1", &["job_b_1"]), ("job_b_1", &[])],
        ));
        assert_eq!(graph.len(), 4);
        let stage = graph.lookup("job_a_1_stage").unwrap();
        match stage.kind() {
            JobKind::Stage { dest, .. } => {
                assert_eq!(dest, &PathBuf::from("/data/tmp_repos/job_a_1"))
            }
            other => panic!("unexpected kind {other:?}"),
        }
        let a = graph.lookup("job_a_1").unwrap();
        assert!(a.prerequisites().contains(&stage.id()));
        assert_eq!(graph.jobs_with("stage", None).len(), 2);
        assert_eq!(graph.jobs_with("a", Some(JobStatus::Pending)), vec!["job_a_1"]);
    }
}
