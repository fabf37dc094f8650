//! Host integration contract.
//!
//! The coordinator never talks to a network, a game loop or a clock directly.
//! Everything it needs from the surrounding application goes through [`Host`]:
//!
//! ```text
//! host event ──► EventListener (Coordinator) ──► run_on_main ──► session slot
//!                                                    ▲
//! schedule_once(delay) ── fires ─────────────────────┘
//! ```
//!
//! Implementations must funnel `run_on_main` tasks and fired scheduled tasks
//! onto one serialized execution context. Receivers and validators run there
//! without a time bound, so a slow callback stalls that context; keeping them
//! short is the caller's obligation.

use std::sync::Arc;
use std::time::Duration;

use crate::types::{Disposition, UserId};

/// One-shot unit of work dispatched onto the main context.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Callback handed to the scheduler.
///
/// `Fn` rather than `FnOnce` so a misbehaving scheduler that fires twice
/// stays observable; the coordinator's callbacks are idempotent.
pub type ScheduledTask = Arc<dyn Fn() + Send + Sync + 'static>;

/// Handle to a scheduled task.
pub trait TaskHandle: Send + Sync {
    /// Request cancellation. Safe to call repeatedly and after the task fired.
    fn cancel(&self);

    /// Whether `cancel` has been called.
    fn is_cancelled(&self) -> bool;
}

/// Receiver of host events. Implemented by the coordinator.
pub trait EventListener: Send + Sync {
    /// A user sent a chat message. May be called off the main context.
    fn on_message(&self, user: UserId, text: &str) -> Disposition;

    /// A user left. Called on the main context.
    fn on_disconnect(&self, user: UserId);
}

/// Services the coordinator consumes from the embedding application.
pub trait Host: Send + Sync + 'static {
    /// Deliver a message to a user. Delivery failures stay inside the host.
    fn send_message(&self, user: UserId, text: &str);

    /// Run `task` once on the main context after `delay`.
    fn schedule_once(&self, delay: Duration, task: ScheduledTask) -> Box<dyn TaskHandle>;

    /// Run `task` on the main context as soon as possible.
    fn run_on_main(&self, task: Task);

    /// Register the listener for message and disconnect events.
    fn subscribe(&self, listener: Arc<dyn EventListener>);
}
