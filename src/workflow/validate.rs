// src/workflow/validate.rs

use std::collections::HashSet;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::errors::{LazydagError, Result};
use crate::workflow::model::{
    EngineSection, ExecutorKind, LOCAL_POOL, RawWorkflowFile, WorkflowFile, stage_job_name,
};

impl TryFrom<RawWorkflowFile> for WorkflowFile {
    type Error = LazydagError;

    fn try_from(raw: RawWorkflowFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_workflow(&raw)?;
        Ok(WorkflowFile::new_unchecked(raw.run, raw.engine, raw.job))
    }
}

fn validate_raw_workflow(wf: &RawWorkflowFile) -> Result<()> {
    ensure_has_jobs(wf)?;
    validate_run_section(wf)?;
    validate_engine(&wf.engine)?;
    validate_successors(wf)?;
    validate_dag(wf)?;
    Ok(())
}

fn ensure_has_jobs(wf: &RawWorkflowFile) -> Result<()> {
    if wf.job.is_empty() {
        return Err(LazydagError::ConfigError(
            "workflow must contain at least one [job.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_run_section(wf: &RawWorkflowFile) -> Result<()> {
    if wf.run.name.trim().is_empty() {
        return Err(LazydagError::ConfigError(
            "[run].name must not be empty".to_string(),
        ));
    }
    if wf.run.staging_dir.is_some() && wf.run.finalize_command.is_none() {
        return Err(LazydagError::ConfigError(
            "[run].staging_dir requires [run].finalize_command".to_string(),
        ));
    }
    if let Some(init) = wf.run.init_job.as_ref() {
        if !wf.job.contains_key(init) {
            return Err(LazydagError::ConfigError(format!(
                "[run].init_job '{init}' is not a job in the workflow"
            )));
        }
    }
    if wf.run.staging_dir.is_some() {
        validate_stage_names(wf)?;
    }
    Ok(())
}

/// Staging adds a `<job>_stage` node per job; a described job must not
/// already own that name.
fn validate_stage_names(wf: &RawWorkflowFile) -> Result<()> {
    for name in wf.job.keys() {
        if wf.run.init_job.as_deref() == Some(name.as_str()) {
            continue;
        }
        let stage = stage_job_name(name);
        if wf.job.contains_key(&stage) {
            return Err(LazydagError::ConfigError(format!(
                "job '{stage}' collides with the staging job of '{name}'"
            )));
        }
    }
    Ok(())
}

/// Check the `[engine]` section. Also applied to engine overrides read at
/// restore time.
pub fn validate_engine(engine: &EngineSection) -> Result<()> {
    if engine.local_workers == 0 {
        return Err(LazydagError::ConfigError(
            "[engine].local_workers must be >= 1 (got 0)".to_string(),
        ));
    }

    match engine.executor {
        ExecutorKind::Elastic => {
            if engine.elastic_cores == 0 {
                return Err(LazydagError::ConfigError(
                    "[engine].elastic_cores must be >= 1 (got 0)".to_string(),
                ));
            }
        }
        ExecutorKind::Pools => {
            if engine.pools.is_empty() {
                return Err(LazydagError::ConfigError(
                    "executor \"pools\" requires at least one [[engine.pools]] entry"
                        .to_string(),
                ));
            }
            let mut seen = HashSet::new();
            let mut last_ceiling: Option<f64> = None;
            for pool in &engine.pools {
                if pool.name == LOCAL_POOL || !seen.insert(pool.name.as_str()) {
                    return Err(LazydagError::ConfigError(format!(
                        "duplicate or reserved pool name '{}'",
                        pool.name
                    )));
                }
                if pool.max_workers == 0 {
                    return Err(LazydagError::ConfigError(format!(
                        "pool '{}' must have max_workers >= 1",
                        pool.name
                    )));
                }
                if let Some(ceiling) = pool.mem_per_worker {
                    if let Some(prev) = last_ceiling {
                        if ceiling < prev {
                            return Err(LazydagError::ConfigError(format!(
                                "pools must be listed in increasing mem_per_worker order \
                                 ('{}' has {} GB after {} GB)",
                                pool.name, ceiling, prev
                            )));
                        }
                    }
                    last_ceiling = Some(ceiling);
                }
            }
        }
    }

    Ok(())
}

fn validate_successors(wf: &RawWorkflowFile) -> Result<()> {
    for (name, job) in wf.job.iter() {
        for succ in job.successors.iter() {
            if !wf.job.contains_key(succ) {
                return Err(LazydagError::ConfigError(format!(
                    "job '{}' has unknown successor '{}'",
                    name, succ
                )));
            }
            if succ == name {
                return Err(LazydagError::ConfigError(format!(
                    "job '{}' cannot be its own successor",
                    name
                )));
            }
        }
    }
    Ok(())
}

fn validate_dag(wf: &RawWorkflowFile) -> Result<()> {
    // Edge direction: job -> successor.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in wf.job.keys() {
        graph.add_node(name.as_str());
    }

    for (name, job) in wf.job.iter() {
        for succ in job.successors.iter() {
            graph.add_edge(name.as_str(), succ.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => Err(LazydagError::DagCycle(format!(
            "cycle detected in workflow involving job '{}'",
            cycle.node_id()
        ))),
    }
}
