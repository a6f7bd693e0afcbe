// src/scheduler/lazy.rs

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::dag::{DependencyGraph, Job, JobId, JobKind};
use crate::dispatch::Dispatcher;
use crate::errors::{LazydagError, Result};
use crate::exec::{ExecutionEngine, Handle, HandleKind, HandleOutcome, SubmitRequest};
use crate::fs::FileSystem;
use crate::scheduler::finalize::Finalizer;
use crate::status::{FsRepository, MonitorStatus, MonitoringStore, StatusResolver};
use crate::summary::{StatusSummary, TaskOrder};
use crate::types::{JobName, JobStatus};
use crate::workflow::WorkflowFile;
use crate::workflow::command::{job_command_line, staging_command};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    /// Wait for every requested handle before returning.
    pub block: bool,
    /// Run the finalization step after a successful blocking run.
    pub finalize: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            block: false,
            finalize: true,
        }
    }
}

#[derive(Debug)]
pub struct RunReport {
    /// Requested jobs and their handles, in request order.
    pub requested: Vec<(JobName, Handle)>,
    /// Jobs given a real submission by this graph so far.
    pub submitted: usize,
    /// Jobs given a no-op handle by this graph so far.
    pub no_ops: usize,
    pub finalized: bool,
}

/// Walks the graph from the requested jobs toward their prerequisites,
/// obtaining exactly one handle per job.
pub struct LazyScheduler {
    graph: DependencyGraph,
    resolver: StatusResolver,
    dispatcher: Dispatcher,
    engine: Arc<dyn ExecutionEngine>,
    finalizer: Option<Finalizer>,
    monitoring: Option<Arc<dyn MonitoringStore>>,
}

impl fmt::Debug for LazyScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyScheduler")
            .field("graph", &self.graph)
            .field("resolver", &self.resolver)
            .field("dispatcher", &self.dispatcher)
            .field("finalizer", &self.finalizer)
            .field("monitoring", &self.monitoring)
            .finish_non_exhaustive()
    }
}

impl LazyScheduler {
    pub fn new(
        graph: DependencyGraph,
        resolver: StatusResolver,
        dispatcher: Dispatcher,
        engine: Arc<dyn ExecutionEngine>,
    ) -> Self {
        Self {
            graph,
            resolver,
            dispatcher,
            engine,
            finalizer: None,
            monitoring: None,
        }
    }

    /// Scheduler for `workflow` with a file-system data repository and the
    /// finalization step implied by its `[run]` section.
    pub fn from_workflow(
        workflow: WorkflowFile,
        fs: Arc<dyn FileSystem>,
        engine: Arc<dyn ExecutionEngine>,
    ) -> Result<Self> {
        let dispatcher = Dispatcher::from_engine_config(&workflow.engine)?;
        let repository = Arc::new(FsRepository::new(
            workflow.run.repository.clone(),
            fs.clone(),
        ));
        let resolver = StatusResolver::new(&workflow.run, fs.clone(), repository);
        let finalizer = Finalizer::from_run(&workflow.run, fs);
        let graph = DependencyGraph::from_workflow(workflow);
        Ok(Self::new(graph, resolver, dispatcher, engine).with_finalizer(finalizer))
    }

    pub fn with_finalizer(mut self, finalizer: Option<Finalizer>) -> Self {
        self.finalizer = finalizer;
        self
    }

    /// Attach a monitoring store and load its current snapshot.
    pub fn with_monitoring(mut self, store: Arc<dyn MonitoringStore>) -> Self {
        self.resolver
            .refresh_monitoring(store.as_ref(), &self.graph.run().name);
        self.monitoring = Some(store);
        self
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    pub fn resolver(&self) -> &StatusResolver {
        &self.resolver
    }

    pub fn is_done(&self, id: JobId) -> bool {
        self.graph.job(id).is_done(&self.resolver)
    }

    /// Memoized handle of `id`.
    ///
    /// A done job gets a no-op handle. Otherwise handles for all
    /// prerequisites are obtained first and passed as inputs to this job's
    /// submission. The walk uses an explicit stack so deep graphs do not
    /// grow the call stack.
    pub fn get_handle(&self, id: JobId) -> Handle {
        let mut stack = vec![(id, false)];
        while let Some((current, expanded)) = stack.pop() {
            let job = self.graph.job(current);
            if job.handle().is_some() {
                continue;
            }
            if !expanded {
                if job.is_done(&self.resolver) {
                    job.handle_or_init(|| self.engine.no_op(job.task_type()));
                    continue;
                }
                stack.push((current, true));
                for prereq in job.prerequisites() {
                    if self.graph.job(*prereq).handle().is_none() {
                        stack.push((*prereq, false));
                    }
                }
                continue;
            }
            job.handle_or_init(|| self.submit(job));
        }

        let job = self.graph.job(id);
        job.handle_or_init(|| self.submit(job)).clone()
    }

    /// Handle of the job named `name`.
    pub fn handle_for(&self, name: &str) -> Result<Handle> {
        let id = self
            .graph
            .id_of(name)
            .ok_or_else(|| LazydagError::JobNotFound(name.to_string()))?;
        Ok(self.get_handle(id))
    }

    fn staged_repo(&self, name: &str) -> Option<PathBuf> {
        self.graph.run().staging_tmp_dir().map(|tmp| tmp.join(name))
    }

    fn submit(&self, job: &Job) -> Handle {
        let run = self.graph.run();
        let command = match job.kind() {
            JobKind::Workflow(spec) => {
                let staged = self.staged_repo(job.name());
                let staged = staged.as_ref().map(|p| p.to_string_lossy());
                job_command_line(spec, run, staged.as_deref())
            }
            JobKind::Stage { source, dest } => {
                staging_command(&source.to_string_lossy(), &dest.to_string_lossy())
            }
            JobKind::Placeholder => {
                warn!(job = job.name(), "job has no description; cannot submit");
                return Handle::resolved(
                    job.name(),
                    HandleKind::Submitted,
                    HandleOutcome::Failed { exit_code: None },
                );
            }
        };

        // Every prerequisite already holds a handle: the walk in
        // `get_handle` visits prerequisites first.
        let inputs: Vec<Handle> = job
            .prerequisites()
            .iter()
            .filter_map(|p| self.graph.job(*p).handle().cloned())
            .collect();
        debug_assert_eq!(inputs.len(), job.prerequisites().len());

        let request = SubmitRequest {
            job: job.name().to_string(),
            task_type: job.task_type().to_string(),
            command,
            inputs,
            stdout: run.stdout_log(job.name()),
            stderr: run.stderr_log(job.name()),
        };

        job.mark_scheduled();
        let submitter = self.dispatcher.route(job);
        debug!(
            job = job.name(),
            pool = submitter.target().name(),
            inputs = request.inputs.len(),
            "submitting job"
        );
        submitter.submit(self.engine.as_ref(), request)
    }

    pub async fn run(&self, targets: Option<&[JobName]>, block: bool) -> Result<RunReport> {
        self.run_with(
            targets,
            RunOptions {
                block,
                ..RunOptions::default()
            },
        )
        .await
    }

    /// Request handles for `targets` (default: every sink of the graph).
    ///
    /// In blocking mode, waits for all of them; the first requested job that
    /// did not succeed is returned as [`LazydagError::JobFailed`]. The
    /// finalization step runs only after every requested job succeeded.
    pub async fn run_with(
        &self,
        targets: Option<&[JobName]>,
        options: RunOptions,
    ) -> Result<RunReport> {
        let ids: Vec<JobId> = match targets {
            None => self.graph.sinks(),
            Some(names) => names
                .iter()
                .map(|name| {
                    self.graph
                        .id_of(name)
                        .ok_or_else(|| LazydagError::JobNotFound(name.clone()))
                })
                .collect::<Result<_>>()?,
        };

        info!(targets = ids.len(), block = options.block, "requesting handles");
        let requested: Vec<(JobName, Handle)> = ids
            .iter()
            .map(|id| (self.graph.job(*id).name().to_string(), self.get_handle(*id)))
            .collect();

        let (submitted, no_ops) = self.handle_counts();
        info!(submitted, no_ops, "handles obtained");

        let mut report = RunReport {
            requested,
            submitted,
            no_ops,
            finalized: false,
        };
        if !options.block {
            return Ok(report);
        }

        for (_, handle) in &report.requested {
            handle.wait().await;
        }
        self.record_handle_outcomes();

        let failures: Vec<&(JobName, Handle)> = report
            .requested
            .iter()
            .filter(|(name, _)| {
                self.graph
                    .lookup(name)
                    .is_none_or(|job| job.status() != JobStatus::Succeeded)
            })
            .collect();
        if let Some((name, handle)) = failures.first() {
            let outcome = handle
                .outcome()
                .unwrap_or(HandleOutcome::Failed { exit_code: None });
            error!(
                job = %name,
                %outcome,
                failed = failures.len(),
                "requested jobs did not all succeed"
            );
            return Err(LazydagError::JobFailed {
                job: name.clone(),
                outcome,
            });
        }

        if options.finalize {
            if let Some(finalizer) = &self.finalizer {
                finalizer.run().await?;
                report.finalized = true;
            }
        }
        info!("run complete");
        Ok(report)
    }

    fn handle_counts(&self) -> (usize, usize) {
        self.graph
            .jobs()
            .filter_map(Job::handle)
            .fold((0, 0), |(submitted, no_ops), h| match h.kind() {
                HandleKind::Submitted => (submitted + 1, no_ops),
                HandleKind::NoOp => (submitted, no_ops + 1),
            })
    }

    fn record_handle_outcomes(&self) {
        for job in self.graph.jobs() {
            if let Some(outcome) = job.handle().and_then(Handle::outcome) {
                job.record_outcome(outcome, &self.resolver);
            }
        }
    }

    /// Re-resolve every job: monitoring snapshot reloaded, handles folded in,
    /// non-terminal jobs without a handle asked of the resolver again.
    pub fn refresh_statuses(&self) {
        if let Some(store) = &self.monitoring {
            self.resolver
                .refresh_monitoring(store.as_ref(), &self.graph.run().name);
        }
        for job in self.graph.jobs() {
            job.is_done(&self.resolver);
        }
    }

    fn task_order(&self) -> TaskOrder {
        TaskOrder::from_names(&self.graph.run().task_order)
    }

    /// Job-status breakdown from the last known statuses.
    pub fn status_summary(&self) -> StatusSummary {
        StatusSummary::from_graph(&self.graph, &self.task_order())
    }

    /// Monitoring breakdown over the graph's jobs, if monitoring information
    /// is available. Jobs without a record count as pending.
    pub fn monitoring_summary(&self) -> Option<StatusSummary> {
        let store = self.monitoring.as_ref()?;
        if !self
            .resolver
            .refresh_monitoring(store.as_ref(), &self.graph.run().name)
        {
            return None;
        }
        let snapshot = self.resolver.monitoring_snapshot()?;
        let entries = self
            .graph
            .jobs()
            .filter(|job| !job.is_staging())
            .map(|job| {
                let status = snapshot
                    .get(job.name())
                    .map(|row| row.status)
                    .unwrap_or(MonitorStatus::Pending);
                (job.task_type().to_string(), status)
            });
        Some(StatusSummary::from_monitoring(entries, &self.task_order()))
    }

    /// Monitoring breakdown when available and not `use_logs`; job-status
    /// breakdown otherwise.
    pub fn status(&self, use_logs: bool) -> StatusSummary {
        if !use_logs {
            if let Some(summary) = self.monitoring_summary() {
                return summary;
            }
        }
        self.refresh_statuses();
        self.status_summary()
    }

    /// Names of jobs of `task_type`, optionally with the given status.
    pub fn jobs_with(&self, task_type: &str, status: Option<JobStatus>) -> Vec<JobName> {
        self.graph.jobs_with(task_type, status)
    }
}
