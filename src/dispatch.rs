// src/dispatch.rs

//! Routing of jobs to execution pools.
//!
//! With discrete pools, a job goes to the first pool (in increasing-size
//! order) whose per-worker memory ceiling covers the job's request; the last
//! pool is the fallback. With an elastic pool, the job's resource request is
//! passed through as a hint. Staging jobs always run on the local pool.

use tracing::debug;

use crate::dag::Job;
use crate::errors::Result;
use crate::exec::{ExecutionEngine, Handle, PoolTarget, SubmitRequest};
use crate::types::ResourceRequest;
use crate::workflow::{EngineSection, ExecutorKind, LOCAL_POOL, validate_engine};

#[derive(Debug, Clone, PartialEq)]
struct Tier {
    name: String,
    ceiling_gb: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
enum DispatchMode {
    Tiered(Vec<Tier>),
    Elastic,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dispatcher {
    mode: DispatchMode,
}

impl Dispatcher {
    pub fn from_engine_config(engine: &EngineSection) -> Result<Self> {
        validate_engine(engine)?;
        let mode = match engine.executor {
            ExecutorKind::Pools => DispatchMode::Tiered(
                engine
                    .pools
                    .iter()
                    .map(|p| Tier {
                        name: p.name.clone(),
                        ceiling_gb: p.mem_per_worker,
                    })
                    .collect(),
            ),
            ExecutorKind::Elastic => DispatchMode::Elastic,
        };
        Ok(Self { mode })
    }

    /// Pool name for a memory request under tiered dispatch. `None` in
    /// elastic mode.
    pub fn select_pool(&self, request: &ResourceRequest) -> Option<&str> {
        let DispatchMode::Tiered(tiers) = &self.mode else {
            return None;
        };
        let fallback = tiers.last()?;
        let mem_gb = request.memory_gb();
        for tier in tiers {
            match tier.ceiling_gb {
                None => break,
                Some(ceiling) if mem_gb <= ceiling => return Some(tier.name.as_str()),
                Some(_) => {}
            }
        }
        Some(fallback.name.as_str())
    }

    pub fn target_for(&self, job: &Job) -> PoolTarget {
        if job.is_staging() {
            return PoolTarget::Named(LOCAL_POOL.to_string());
        }
        let resources = job.resources();
        match &self.mode {
            DispatchMode::Elastic => PoolTarget::Elastic {
                hint: resources.hint(),
                task_type: job.task_type().to_string(),
            },
            DispatchMode::Tiered(_) => PoolTarget::Named(
                self.select_pool(&resources)
                    .unwrap_or(LOCAL_POOL)
                    .to_string(),
            ),
        }
    }

    /// Submission callable bound to the pool chosen for `job`.
    pub fn route(&self, job: &Job) -> Submitter {
        let target = self.target_for(job);
        debug!(job = job.name(), pool = target.name(), "routed job");
        Submitter { target }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Submitter {
    target: PoolTarget,
}

impl Submitter {
    pub fn target(&self) -> &PoolTarget {
        &self.target
    }

    pub fn submit(&self, engine: &dyn ExecutionEngine, request: SubmitRequest) -> Handle {
        engine.submit(&self.target, request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::PoolConfig;

    fn pools(ceilings: &[(&str, Option<f64>)]) -> EngineSection {
        EngineSection {
            executor: ExecutorKind::Pools,
            pools: ceilings
                .iter()
                .map(|(name, ceiling)| PoolConfig {
                    name: name.to_string(),
                    max_workers: 1,
                    mem_per_worker: *ceiling,
                })
                .collect(),
            ..Default::default()
        }
    }

    fn mem(mb: u64) -> ResourceRequest {
        ResourceRequest {
            memory: Some(mb),
            ..Default::default()
        }
    }

    #[test]
    fn first_fitting_tier_wins() {
        let d = Dispatcher::from_engine_config(&pools(&[
            ("small", Some(2.0)),
            ("medium", Some(8.0)),
            ("large", Some(32.0)),
        ]))
        .unwrap();
        assert_eq!(d.select_pool(&ResourceRequest::default()), Some("small"));
        assert_eq!(d.select_pool(&mem(2048)), Some("small"));
        assert_eq!(d.select_pool(&mem(3000)), Some("medium"));
        assert_eq!(d.select_pool(&mem(20_000)), Some("large"));
        assert_eq!(d.select_pool(&mem(100_000)), Some("large"));
    }

    #[test]
    fn unconstrained_tier_sends_everything_to_fallback() {
        let d = Dispatcher::from_engine_config(&pools(&[("only", None), ("big", None)])).unwrap();
        assert_eq!(d.select_pool(&mem(1)), Some("big"));
    }

    #[test]
    fn elastic_mode_has_no_tiers() {
        let d = Dispatcher::from_engine_config(&EngineSection::default()).unwrap();
        assert_eq!(d.select_pool(&mem(1)), None);
    }
}
