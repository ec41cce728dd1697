//! Background task handle that cannot outlive its owner.

use tokio::task::JoinHandle;

/// Wraps a spawned task; aborts it on drop so that a cancelled loop never
/// leaves its background task running.
pub(crate) struct TaskGuard {
    handle: Option<JoinHandle<()>>,
}

impl TaskGuard {
    pub(crate) fn new(handle: JoinHandle<()>) -> Self {
        Self {
            handle: Some(handle),
        }
    }

    /// Abort the task and wait for it to finish.
    pub(crate) async fn join(mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            let _ = handle.await;
        }
    }
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        if let Some(handle) = &self.handle {
            handle.abort();
        }
    }
}
