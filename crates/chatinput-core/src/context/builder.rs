//! Fluent builder for [`RequestContext`].
//!
//! # Example
//!
//! ```rust,no_run
//! use chatinput_core::{ContextBuilder, Coordinator, UserId, ValidationResult};
//!
//! fn ask_age(coordinator: &Coordinator, user: UserId) {
//!     let context = ContextBuilder::new(user, |reply, text| {
//!         reply.send(format!("&aThanks, age {text} recorded"));
//!     })
//!     .name("age")
//!     .prompt("&eHow old are you? &7(type 'exit' to cancel)")
//!     .validator(|_, text| match text.parse::<u8>() {
//!         Ok(_) => ValidationResult::ok(),
//!         Err(_) => ValidationResult::fail("Please enter a number."),
//!     })
//!     .canceller(|reply, _cause| reply.send("Cancelled."))
//!     .timeout_secs(coordinator, 30, "&cYou took too long.")
//!     .build();
//!
//!     coordinator.register(context);
//! }
//! ```

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use super::{InputCanceller, InputReceiver, InputValidator, Reply, RequestContext, TimeoutGuard};
use crate::config::{DEFAULT_CANCEL_KEYWORD, DEFAULT_COLOR_CODE_CHAR};
use crate::coordinator::Coordinator;
use crate::formatting::translate_alternate_codes;
use crate::types::{CancelCause, ContextId, UserId};
use crate::validation::ValidationResult;

/// Builder for creating `RequestContext` instances with fluent API
pub struct ContextBuilder {
    id: ContextId,
    owner: UserId,
    receiver: InputReceiver,
    name: Option<String>,
    prompt: Option<String>,
    validator: Option<InputValidator>,
    canceller: Option<InputCanceller>,
    cancel_keyword: String,
    color_code_char: Option<char>,
    timeout: TimeoutGuard,
}

impl ContextBuilder {
    /// Create a new builder for `owner`.
    ///
    /// # Arguments
    /// * `owner` - User whose next message is captured
    /// * `receiver` - Called once with the accepted answer
    pub fn new<F>(owner: UserId, receiver: F) -> Self
    where
        F: Fn(&Reply<'_>, &str) + Send + Sync + 'static,
    {
        Self {
            id: ContextId::next(),
            owner,
            receiver: Box::new(receiver),
            name: None,
            prompt: None,
            validator: None,
            canceller: None,
            cancel_keyword: DEFAULT_CANCEL_KEYWORD.to_string(),
            color_code_char: Some(DEFAULT_COLOR_CODE_CHAR),
            timeout: TimeoutGuard::default(),
        }
    }

    /// Id the built context will carry
    pub fn id(&self) -> ContextId {
        self.id
    }

    /// Set a name used by `Coordinator::has_active_context`
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the message sent when the context is registered
    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    /// Set the validator run on every candidate answer
    pub fn validator<F>(mut self, validator: F) -> Self
    where
        F: Fn(UserId, &str) -> ValidationResult + Send + Sync + 'static,
    {
        self.validator = Some(Box::new(validator));
        self
    }

    /// Set the handler run when the context ends without an answer
    pub fn canceller<F>(mut self, canceller: F) -> Self
    where
        F: Fn(&Reply<'_>, CancelCause) + Send + Sync + 'static,
    {
        self.canceller = Some(Box::new(canceller));
        self
    }

    /// Set the keyword that cancels the context (default: "exit")
    pub fn cancel_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.cancel_keyword = keyword.into();
        self
    }

    /// Set or disable the alternate color-code prefix applied to the prompt
    pub fn color_codes(mut self, prefix: Option<char>) -> Self {
        self.color_code_char = prefix;
        self
    }

    /// Schedule the timeout that cancels this context after `delay`.
    ///
    /// The callback is scheduled immediately. When it fires it only touches
    /// the owner's session if this very context is still active there, so a
    /// timeout that loses the race against an answer is a no-op. Calling
    /// `timeout` again replaces (and cancels) the earlier schedule, and a
    /// builder dropped without `build` cancels it too.
    pub fn timeout(
        mut self,
        coordinator: &Coordinator,
        delay: Duration,
        message: impl Into<String>,
    ) -> Self {
        let weak = coordinator.downgrade();
        let owner = self.owner;
        let id = self.id;
        let message = message.into();

        let handle = coordinator.host().schedule_once(
            delay,
            Arc::new(move || {
                if let Some(coordinator) = weak.upgrade() {
                    coordinator.expire(owner, id, &message);
                }
            }),
        );
        debug!(user = %owner, context = %id, ?delay, "scheduled input timeout");

        self.timeout.replace(handle);
        self
    }

    /// `timeout` with a delay in whole seconds
    pub fn timeout_secs(
        self,
        coordinator: &Coordinator,
        seconds: u64,
        message: impl Into<String>,
    ) -> Self {
        self.timeout(coordinator, Duration::from_secs(seconds), message)
    }

    /// Build the context. Registration is the coordinator's job.
    pub fn build(self) -> RequestContext {
        let prompt = match (self.prompt, self.color_code_char) {
            (Some(prompt), Some(prefix)) => Some(translate_alternate_codes(prefix, &prompt)),
            (prompt, _) => prompt,
        };

        RequestContext {
            id: self.id,
            owner: self.owner,
            name: self.name,
            prompt,
            receiver: self.receiver,
            validator: self.validator,
            canceller: self.canceller,
            cancel_keyword: self.cancel_keyword,
            timeout: self.timeout,
        }
    }
}
