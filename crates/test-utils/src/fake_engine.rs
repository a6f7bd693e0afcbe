use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use lazydag::exec::{
    ExecutionEngine, Handle, HandleKind, HandleOutcome, PoolTarget, SubmitRequest,
};

/// One recorded submission.
#[derive(Debug, Clone)]
pub struct Submission {
    pub job: String,
    pub target: PoolTarget,
    pub command: String,
    pub inputs: Vec<String>,
}

#[derive(Debug, Default)]
struct Recorded {
    submissions: Vec<Submission>,
    no_ops: Vec<String>,
}

/// A fake engine that:
/// - records every submission and no-op request, in order
/// - resolves handles immediately: `DependencyFailed` if an input did not
///   succeed, else the configured outcome for the job (default: success).
#[derive(Debug, Clone, Default)]
pub struct FakeEngine {
    recorded: Arc<Mutex<Recorded>>,
    outcomes: Arc<Mutex<HashMap<String, HandleOutcome>>>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `job` resolve with `outcome` when submitted.
    pub fn set_outcome(&self, job: &str, outcome: HandleOutcome) {
        self.outcomes.lock().unwrap().insert(job.to_string(), outcome);
    }

    pub fn fail(&self, job: &str) {
        self.set_outcome(job, HandleOutcome::Failed { exit_code: Some(1) });
    }

    pub fn submissions(&self) -> Vec<Submission> {
        self.recorded.lock().unwrap().submissions.clone()
    }

    /// Submitted job names, in submission order.
    pub fn submitted(&self) -> Vec<String> {
        self.submissions().into_iter().map(|s| s.job).collect()
    }

    /// Task types of the no-op handles requested, in order.
    pub fn no_ops(&self) -> Vec<String> {
        self.recorded.lock().unwrap().no_ops.clone()
    }
}

impl ExecutionEngine for FakeEngine {
    fn submit(&self, target: &PoolTarget, request: SubmitRequest) -> Handle {
        let inputs_ok = request
            .inputs
            .iter()
            .all(|h| h.outcome().is_some_and(HandleOutcome::is_success));
        let outcome = if inputs_ok {
            self.outcomes
                .lock()
                .unwrap()
                .get(&request.job)
                .copied()
                .unwrap_or(HandleOutcome::Succeeded)
        } else {
            HandleOutcome::DependencyFailed
        };

        self.recorded.lock().unwrap().submissions.push(Submission {
            job: request.job.clone(),
            target: target.clone(),
            command: request.command.clone(),
            inputs: request.inputs.iter().map(|h| h.label().to_string()).collect(),
        });

        Handle::resolved(request.job, HandleKind::Submitted, outcome)
    }

    fn no_op(&self, task_type: &str) -> Handle {
        self.recorded.lock().unwrap().no_ops.push(task_type.to_string());
        Handle::resolved(
            format!("{task_type}_no_op"),
            HandleKind::NoOp,
            HandleOutcome::Succeeded,
        )
    }
}
