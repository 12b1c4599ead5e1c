use std::time::Duration;

use tokio::runtime::Handle;

pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Runs a task once after a delay. Used for per-entry expiry.
pub trait ExpiryScheduler: Send + Sync {
    fn schedule(&self, delay: Duration, task: Task);
}

/// Schedules on a tokio runtime, so paused test time drives it too.
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    handle: Handle,
}

impl TokioScheduler {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Binds to the runtime of the calling task.
    ///
    /// # Panics
    /// Outside a tokio runtime.
    pub fn current() -> Self {
        Self::new(Handle::current())
    }
}

impl ExpiryScheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, task: Task) {
        self.handle.spawn(async move {
            tokio::time::sleep(delay).await;
            task();
        });
    }
}
