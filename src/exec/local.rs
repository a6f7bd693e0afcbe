// src/exec/local.rs

//! Engine that runs jobs as local shell processes.
//!
//! Every pool is a semaphore. Named pools hand one permit per job. The
//! elastic pool has one permit per core and a job takes as many as its
//! resource hint asks for, capped at the pool size.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{debug, error};

use crate::exec::backend::{ExecutionEngine, PoolTarget, SubmitRequest};
use crate::exec::handle::{Handle, HandleKind, HandleOutcome};
use crate::exec::task_runner::{EventRecorder, PoolSlot, run_submission};
use crate::status::monitoring::MonitoringStore;
use crate::workflow::{EngineSection, ExecutorKind, LOCAL_POOL};

#[derive(Debug)]
struct ElasticPool {
    semaphore: Arc<Semaphore>,
    cores: u32,
}

#[derive(Debug)]
pub struct LocalEngine {
    pools: HashMap<String, Arc<Semaphore>>,
    elastic: Option<ElasticPool>,
    recorder: Option<EventRecorder>,
}

impl LocalEngine {
    pub fn from_config(engine: &EngineSection) -> Self {
        let mut pools = HashMap::new();
        pools.insert(
            LOCAL_POOL.to_string(),
            Arc::new(Semaphore::new(engine.local_workers.max(1))),
        );

        let elastic = match engine.executor {
            ExecutorKind::Pools => {
                for pool in &engine.pools {
                    pools.insert(
                        pool.name.clone(),
                        Arc::new(Semaphore::new(pool.max_workers.max(1))),
                    );
                }
                None
            }
            ExecutorKind::Elastic => {
                let cores = engine.elastic_cores.max(1);
                Some(ElasticPool {
                    semaphore: Arc::new(Semaphore::new(cores as usize)),
                    cores,
                })
            }
        };

        debug!(
            pools = pools.len(),
            elastic = elastic.is_some(),
            "local engine configured"
        );

        Self {
            pools,
            elastic,
            recorder: None,
        }
    }

    /// Record status transitions of every submission under `workflow`.
    pub fn with_monitoring(mut self, store: Arc<dyn MonitoringStore>, workflow: &str) -> Self {
        self.recorder = Some(EventRecorder::new(store, workflow));
        self
    }

    fn slot_for(&self, target: &PoolTarget) -> Option<PoolSlot> {
        match target {
            PoolTarget::Named(name) => self.pools.get(name).map(|semaphore| PoolSlot {
                pool: name.clone(),
                semaphore: semaphore.clone(),
                permits: 1,
            }),
            PoolTarget::Elastic { hint, .. } => self.elastic.as_ref().map(|pool| PoolSlot {
                pool: target.name().to_string(),
                semaphore: pool.semaphore.clone(),
                permits: hint.cores.clamp(1, pool.cores),
            }),
        }
    }
}

impl ExecutionEngine for LocalEngine {
    fn submit(&self, target: &PoolTarget, request: SubmitRequest) -> Handle {
        let Some(slot) = self.slot_for(target) else {
            error!(job = %request.job, pool = target.name(), "no such pool");
            return Handle::resolved(
                request.job,
                HandleKind::Submitted,
                HandleOutcome::Failed { exit_code: None },
            );
        };

        let handle = Handle::pending(request.job.clone(), HandleKind::Submitted);
        let resolver = handle.clone();
        let recorder = self.recorder.clone();
        tokio::spawn(async move {
            let outcome = run_submission(request, slot, recorder).await;
            resolver.resolve(outcome);
        });
        handle
    }

    fn no_op(&self, task_type: &str) -> Handle {
        Handle::resolved(
            format!("{task_type}_no_op"),
            HandleKind::NoOp,
            HandleOutcome::Succeeded,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ResourceHint;
    use crate::workflow::PoolConfig;

    #[test]
    fn pools_mode_registers_named_pools_and_local_pool() {
        let engine = LocalEngine::from_config(&EngineSection {
            executor: ExecutorKind::Pools,
            pools: vec![PoolConfig {
                name: "small".into(),
                max_workers: 2,
                mem_per_worker: Some(2.0),
            }],
            ..Default::default()
        });
        assert!(engine.slot_for(&PoolTarget::Named("small".into())).is_some());
        assert!(engine.slot_for(&PoolTarget::Named(LOCAL_POOL.into())).is_some());
        assert!(engine.slot_for(&PoolTarget::Named("large".into())).is_none());
        assert!(
            engine
                .slot_for(&PoolTarget::Elastic {
                    hint: ResourceHint::default(),
                    task_type: "isr".into(),
                })
                .is_none()
        );
    }

    #[test]
    fn elastic_permits_follow_cores_hint() {
        let engine = LocalEngine::from_config(&EngineSection {
            elastic_cores: 4,
            ..Default::default()
        });
        let slot = |cores| {
            engine
                .slot_for(&PoolTarget::Elastic {
                    hint: ResourceHint {
                        cores,
                        ..Default::default()
                    },
                    task_type: "isr".into(),
                })
                .unwrap()
                .permits
        };
        assert_eq!(slot(0), 1);
        assert_eq!(slot(2), 2);
        assert_eq!(slot(16), 4);
    }

    #[tokio::test]
    async fn no_op_is_resolved_and_tagged() {
        let engine = LocalEngine::from_config(&EngineSection::default());
        let handle = engine.no_op("isr");
        assert_eq!(handle.kind(), HandleKind::NoOp);
        assert_eq!(handle.label(), "isr_no_op");
        assert_eq!(handle.wait().await, HandleOutcome::Succeeded);
    }

    #[tokio::test]
    async fn unknown_pool_fails_immediately() {
        let engine = LocalEngine::from_config(&EngineSection::default());
        let handle = engine.submit(
            &PoolTarget::Named("nowhere".into()),
            SubmitRequest {
                job: "j".into(),
                task_type: "j".into(),
                command: "true".into(),
                inputs: Vec::new(),
                stdout: "/dev/null".into(),
                stderr: "/dev/null".into(),
            },
        );
        assert_eq!(
            handle.outcome(),
            Some(HandleOutcome::Failed { exit_code: None })
        );
    }
}
