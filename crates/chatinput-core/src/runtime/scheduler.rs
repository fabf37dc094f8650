//! One-shot timers that fire onto the main loop.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::runtime::{Handle, TryCurrentError};
use tokio::task::AbortHandle;

use super::MainLoopHandle;
use crate::host::{ScheduledTask, TaskHandle};

/// Sleeps on a tokio task, then dispatches the callback to the main loop.
#[derive(Clone)]
pub struct TokioScheduler {
    runtime: Handle,
    main: MainLoopHandle,
}

/// Cancellation handle for a [`TokioScheduler`] timer.
///
/// Cancelling aborts the sleeping task. A callback already queued on the
/// main loop checks the flag again before running.
pub struct TokioTaskHandle {
    cancelled: Arc<AtomicBool>,
    abort_handle: AbortHandle,
}

impl TokioScheduler {
    pub fn new(runtime: Handle, main: MainLoopHandle) -> Self {
        Self { runtime, main }
    }

    /// Scheduler on the runtime the caller is running in.
    pub fn current(main: MainLoopHandle) -> Result<Self, TryCurrentError> {
        Ok(Self::new(Handle::try_current()?, main))
    }

    pub fn schedule(&self, delay: Duration, task: ScheduledTask) -> TokioTaskHandle {
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = cancelled.clone();
        let main = self.main.clone();

        let join = self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if flag.load(Ordering::SeqCst) {
                return;
            }
            main.dispatch(Box::new(move || {
                if !flag.load(Ordering::SeqCst) {
                    task();
                }
            }));
        });

        TokioTaskHandle {
            cancelled,
            abort_handle: join.abort_handle(),
        }
    }
}

impl TaskHandle for TokioTaskHandle {
    fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.abort_handle.abort();
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
