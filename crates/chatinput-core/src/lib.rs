//! chatinput-core - Per-User Chat Input Capture
//!
//! Lets application code ask a user a question and receive that user's next
//! chat message as the answer, instead of the message reaching the public
//! channel. Each user has at most one pending request at a time.
//!
//! # Modules
//!
//! - **coordinator** - Session registry and the resolution protocol
//! - **context** - Pending requests and their builder
//! - **session** - Per-user slot holding the active request
//! - **host** - Traits the embedding application implements
//! - **formatting** - Alternate color-code translation
//! - **runtime** - Tokio main loop and scheduler (feature `runtime`)
//! - **testing** - Deterministic in-memory host
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use chatinput_core::{Host, UserId, ValidationResult};
//!
//! fn ask(host: Arc<dyn Host>, user: UserId) {
//!     let coordinator = chatinput_core::initialize(host);
//!
//!     let context = coordinator
//!         .builder(user, |reply, text| reply.send(format!("&aHello, {text}!")))
//!         .name("greeting")
//!         .prompt("&eWhat is your name?")
//!         .validator(|_, text| {
//!             if text.trim().is_empty() {
//!                 ValidationResult::fail("Say something.")
//!             } else {
//!                 ValidationResult::ok()
//!             }
//!         })
//!         .timeout_secs(&coordinator, 30, "&cToo slow.")
//!         .build();
//!
//!     coordinator.register(context);
//! }
//! ```

// ─────────────────────────────────────────────────────────────────────────────
// Modules
// ─────────────────────────────────────────────────────────────────────────────

pub mod config;
pub mod context;
pub mod coordinator;
pub mod error;
pub mod formatting;
pub mod host;
pub mod session;
pub mod testing;
pub mod types;
pub mod validation;

#[cfg(feature = "runtime")]
pub mod runtime;

// ─────────────────────────────────────────────────────────────────────────────
// Re-exports
// ─────────────────────────────────────────────────────────────────────────────

pub use config::{ConfigValidationError, CoordinatorConfig};
pub use context::{ContextBuilder, Reply, RequestContext};
pub use coordinator::{Coordinator, WeakCoordinator, initialize, initialize_with, instance};
pub use error::{InputError, Result};
pub use host::{EventListener, Host, ScheduledTask, Task, TaskHandle};
pub use session::UserSession;
pub use types::{CancelCause, ContextId, Disposition, UserId};
pub use validation::ValidationResult;
