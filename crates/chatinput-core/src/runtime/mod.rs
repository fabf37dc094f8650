//! Tokio building blocks for hosts.
//!
//! A host built on tokio needs two things the coordinator cannot provide
//! itself: a serialized main context and a cancellable one-shot timer that
//! fires onto it.
//!
//! ```text
//! reader tasks ──dispatch──┐
//!                          ▼
//! TokioScheduler ──sleep──► MainLoop (one task, runs jobs in order)
//! ```

mod main_loop;
mod scheduler;

pub use main_loop::{MainLoop, MainLoopHandle};
pub use scheduler::{TokioScheduler, TokioTaskHandle};
