//! Serialized main context on top of a tokio task.

use std::panic::{AssertUnwindSafe, catch_unwind};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::host::Task;

/// Receiving end: runs queued tasks one at a time, in submission order.
pub struct MainLoop {
    rx: mpsc::UnboundedReceiver<Task>,
}

/// Sending end, cloned into every component that needs the main context.
#[derive(Clone)]
pub struct MainLoopHandle {
    tx: mpsc::UnboundedSender<Task>,
}

impl MainLoop {
    pub fn new() -> (Self, MainLoopHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { rx }, MainLoopHandle { tx })
    }

    /// Run until every handle is dropped.
    ///
    /// A panicking task is logged and skipped; the loop keeps going.
    pub async fn run(mut self) {
        debug!("main loop started");
        while let Some(task) = self.rx.recv().await {
            if let Err(panic) = catch_unwind(AssertUnwindSafe(task)) {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "non-string panic payload".to_string());
                error!(panic = %message, "main loop task panicked");
            }
        }
        debug!("main loop stopped");
    }

    /// Spawn [`MainLoop::run`] on the current runtime.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}

impl MainLoopHandle {
    /// Queue `task`. Returns false once the loop has stopped.
    pub fn dispatch(&self, task: Task) -> bool {
        if self.tx.send(task).is_err() {
            warn!("main loop stopped; dropping task");
            return false;
        }
        true
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
