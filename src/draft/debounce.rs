use std::future::Future;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Cancellable trailing-edge timer.
///
/// Each `schedule` aborts whatever is still waiting and starts a fresh
/// delay, so only the last task in a quiet window runs. Tasks go to the
/// runtime of the calling context, else to the runtime the debouncer was
/// created in.
pub struct Debouncer {
    delay: Duration,
    runtime: Option<Handle>,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            runtime: Handle::try_current().ok(),
            pending: Mutex::new(None),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    fn slot(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        // The slot only ever holds a handle; a poisoned lock leaves it usable.
        self.pending.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Replace any pending task with `task`, to run after the delay.
    ///
    /// Returns false, dropping `task` unrun, when no runtime is reachable.
    /// Whatever was pending is cancelled either way.
    pub fn schedule<F, Fut>(&self, task: F) -> bool
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let delay = self.delay;
        let mut slot = self.slot();
        if let Some(previous) = slot.take() {
            previous.abort();
        }
        let Some(runtime) = Handle::try_current().ok().or_else(|| self.runtime.clone()) else {
            return false;
        };
        *slot = Some(runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            task().await;
        }));
        true
    }

    /// Abort the pending task. Returns true if one was still waiting.
    pub fn cancel(&self) -> bool {
        match self.slot().take() {
            Some(handle) => {
                let was_pending = !handle.is_finished();
                handle.abort();
                was_pending
            }
            None => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.slot().as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        if let Some(handle) = self.slot().take() {
            handle.abort();
        }
    }
}
