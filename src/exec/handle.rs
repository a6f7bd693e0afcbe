// src/exec/handle.rs

//! Asynchronous job handles.
//!
//! A [`Handle`] is a cheap clone of a shared, resolve-once cell. The engine
//! resolves it when the job finishes; any number of holders can `wait()` on
//! it. Clones of the same handle compare equal under [`Handle::same`].

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::watch;

static NEXT_HANDLE_ID: AtomicU64 = AtomicU64::new(1);

/// Final result of a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleOutcome {
    Succeeded,
    /// The command ran and failed (exit code, if the process reported one).
    Failed { exit_code: Option<i32> },
    /// A prerequisite did not succeed, so the command was never started.
    DependencyFailed,
}

impl HandleOutcome {
    pub fn is_success(self) -> bool {
        matches!(self, HandleOutcome::Succeeded)
    }
}

impl fmt::Display for HandleOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandleOutcome::Succeeded => f.write_str("succeeded"),
            HandleOutcome::Failed {
                exit_code: Some(code),
            } => write!(f, "failed with exit code {code}"),
            HandleOutcome::Failed { exit_code: None } => f.write_str("failed"),
            HandleOutcome::DependencyFailed => f.write_str("dependency failed"),
        }
    }
}

/// Whether a handle stands for real work or an already-satisfied job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleKind {
    Submitted,
    NoOp,
}

struct HandleInner {
    id: u64,
    label: String,
    kind: HandleKind,
    state: watch::Sender<Option<HandleOutcome>>,
}

#[derive(Clone)]
pub struct Handle {
    inner: Arc<HandleInner>,
}

impl Handle {
    /// A handle that resolves later via [`Handle::resolve`].
    pub fn pending(label: impl Into<String>, kind: HandleKind) -> Self {
        let (state, _rx) = watch::channel(None);
        Self {
            inner: Arc::new(HandleInner {
                id: NEXT_HANDLE_ID.fetch_add(1, Ordering::Relaxed),
                label: label.into(),
                kind,
                state,
            }),
        }
    }

    /// A handle that is already resolved.
    pub fn resolved(label: impl Into<String>, kind: HandleKind, outcome: HandleOutcome) -> Self {
        let handle = Self::pending(label, kind);
        handle.resolve(outcome);
        handle
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn label(&self) -> &str {
        &self.inner.label
    }

    pub fn kind(&self) -> HandleKind {
        self.inner.kind
    }

    /// Resolve the handle. Only the first resolution sticks; returns whether
    /// this call was it.
    pub fn resolve(&self, outcome: HandleOutcome) -> bool {
        self.inner.state.send_if_modified(|state| {
            if state.is_none() {
                *state = Some(outcome);
                true
            } else {
                false
            }
        })
    }

    /// Outcome if already resolved.
    pub fn outcome(&self) -> Option<HandleOutcome> {
        *self.inner.state.borrow()
    }

    pub fn is_resolved(&self) -> bool {
        self.outcome().is_some()
    }

    /// Wait until the handle resolves.
    pub async fn wait(&self) -> HandleOutcome {
        let mut rx = self.inner.state.subscribe();
        match rx.wait_for(Option::is_some).await {
            Ok(state) => (*state).unwrap_or(HandleOutcome::Failed { exit_code: None }),
            // The sender lives as long as `self`, so this is unreachable.
            Err(_) => HandleOutcome::Failed { exit_code: None },
        }
    }

    /// Whether two handles are clones of the same underlying handle.
    pub fn same(&self, other: &Handle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("id", &self.inner.id)
            .field("label", &self.inner.label)
            .field("kind", &self.inner.kind)
            .field("outcome", &self.outcome())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn waiters_see_the_first_resolution() {
        let handle = Handle::pending("a", HandleKind::Submitted);
        let waiter = {
            let h = handle.clone();
            tokio::spawn(async move { h.wait().await })
        };
        assert!(handle.resolve(HandleOutcome::Failed { exit_code: Some(2) }));
        assert!(!handle.resolve(HandleOutcome::Succeeded));
        assert_eq!(
            waiter.await.unwrap(),
            HandleOutcome::Failed { exit_code: Some(2) }
        );
    }

    #[test]
    fn clones_are_the_same_handle() {
        let a = Handle::resolved("a", HandleKind::NoOp, HandleOutcome::Succeeded);
        let b = Handle::resolved("a", HandleKind::NoOp, HandleOutcome::Succeeded);
        assert!(a.same(&a.clone()));
        assert!(!a.same(&b));
        assert_ne!(a.id(), b.id());
    }
}
