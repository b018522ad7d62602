//! Job control: the cancellation / completion handle shared between a worker
//! thread and the supervisor.

use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct ControlState {
    finished: bool,
    canceled: bool,
}

/// Cooperative cancel and completion flags for one job. Cheap to clone; all
/// clones observe the same state.
#[derive(Debug, Clone, Default)]
pub struct Controller {
    state: Arc<Mutex<ControlState>>,
}

impl Controller {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, ControlState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Request cancellation. The worker notices at its next chunk boundary.
    /// Idempotent.
    pub fn cancel(&self) {
        self.state().canceled = true;
    }

    pub fn is_canceled(&self) -> bool {
        self.state().canceled
    }

    /// Mark the job as exited. Called by the worker on every exit path.
    pub fn finish(&self) {
        self.state().finished = true;
    }

    pub fn is_finished(&self) -> bool {
        self.state().finished
    }

    /// True when both handles refer to the same job.
    pub fn same_job(&self, other: &Controller) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }
}

/// Calls [`Controller::finish`] when dropped, so the flag is set on success,
/// error and panic alike.
pub(crate) struct FinishGuard {
    pub(crate) controller: Controller,
}

impl Drop for FinishGuard {
    fn drop(&mut self) {
        self.controller.finish();
    }
}
