//! Request contexts: one pending "answer my next message" request.
//!
//! Contexts are assembled with [`ContextBuilder`] and become active once
//! handed to `Coordinator::register`. After construction nothing about a
//! context changes; its only live resource is the optional timeout handle,
//! which is cancelled as soon as the context is resolved or dropped.

mod builder;

pub use builder::ContextBuilder;

use std::fmt;

use tracing::debug;

use crate::coordinator::Coordinator;
use crate::host::TaskHandle;
use crate::types::{CancelCause, ContextId, UserId};
use crate::validation::ValidationResult;

/// Terminal success handler, invoked once with the accepted text.
pub type InputReceiver = Box<dyn Fn(&Reply<'_>, &str) + Send + Sync>;

/// Checks a candidate answer. A failure keeps the context pending.
pub type InputValidator = Box<dyn Fn(UserId, &str) -> ValidationResult + Send + Sync>;

/// Invoked once when the context ends without an answer.
pub type InputCanceller = Box<dyn Fn(&Reply<'_>, CancelCause) + Send + Sync>;

/// Handle given to receivers and cancellers.
///
/// Messages must go through [`Reply::send`]: a reply created for a silent
/// cancellation drops them.
pub struct Reply<'a> {
    user: UserId,
    coordinator: &'a Coordinator,
    muted: bool,
}

impl<'a> Reply<'a> {
    pub(crate) fn new(user: UserId, coordinator: &'a Coordinator) -> Self {
        Self {
            user,
            coordinator,
            muted: false,
        }
    }

    pub(crate) fn muted(user: UserId, coordinator: &'a Coordinator) -> Self {
        Self {
            user,
            coordinator,
            muted: true,
        }
    }

    /// The user this context belonged to.
    pub fn user(&self) -> UserId {
        self.user
    }

    /// Whether messages sent through this reply are suppressed.
    pub fn is_muted(&self) -> bool {
        self.muted
    }

    /// Send a message to the user unless muted. The text is delivered as is.
    pub fn send(&self, text: impl AsRef<str>) {
        if self.muted {
            debug!(user = %self.user, "suppressed message during silent displacement");
            return;
        }
        self.coordinator.send_message(self.user, text.as_ref());
    }

    /// Coordinator that resolved the context, for registering follow-ups.
    pub fn coordinator(&self) -> &'a Coordinator {
        self.coordinator
    }
}

/// A pending input request for one user.
pub struct RequestContext {
    id: ContextId,
    owner: UserId,
    name: Option<String>,
    prompt: Option<String>,
    receiver: InputReceiver,
    validator: Option<InputValidator>,
    canceller: Option<InputCanceller>,
    cancel_keyword: String,
    timeout: TimeoutGuard,
}

impl RequestContext {
    pub fn id(&self) -> ContextId {
        self.id
    }

    pub fn owner(&self) -> UserId {
        self.owner
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Prompt sent when the context is registered.
    pub fn prompt(&self) -> Option<&str> {
        self.prompt.as_deref()
    }

    pub fn cancel_keyword(&self) -> &str {
        &self.cancel_keyword
    }

    pub fn has_validator(&self) -> bool {
        self.validator.is_some()
    }

    pub fn has_canceller(&self) -> bool {
        self.canceller.is_some()
    }

    pub fn has_timeout(&self) -> bool {
        self.timeout.is_set()
    }

    /// Case-insensitive name comparison; unnamed contexts never match.
    pub fn is_named(&self, name: &str) -> bool {
        self.name.as_deref().is_some_and(|own| eq_ignore_case(own, name))
    }

    /// Whether `text` is the cancel keyword (case-insensitive).
    pub fn is_cancel_keyword(&self, text: &str) -> bool {
        !self.cancel_keyword.is_empty() && eq_ignore_case(&self.cancel_keyword, text)
    }

    pub(crate) fn validate(&self, text: &str) -> ValidationResult {
        match &self.validator {
            Some(validator) => validator(self.owner, text),
            None => ValidationResult::ok(),
        }
    }

    pub(crate) fn receive(&self, reply: &Reply<'_>, text: &str) {
        (self.receiver)(reply, text);
    }

    pub(crate) fn notify_cancelled(&self, reply: &Reply<'_>, cause: CancelCause) {
        if let Some(canceller) = &self.canceller {
            canceller(reply, cause);
        }
    }

    /// Cancel the scheduled timeout, if any. Idempotent.
    pub(crate) fn cancel_timeout(&self) {
        self.timeout.cancel();
    }
}

/// Scheduled timeout owned by a builder or context; cancelled on drop.
#[derive(Default)]
pub(crate) struct TimeoutGuard(Option<Box<dyn TaskHandle>>);

impl TimeoutGuard {
    pub(crate) fn is_set(&self) -> bool {
        self.0.is_some()
    }

    /// Store `handle`, cancelling the one it replaces.
    pub(crate) fn replace(&mut self, handle: Box<dyn TaskHandle>) {
        if let Some(previous) = self.0.replace(handle) {
            previous.cancel();
        }
    }

    pub(crate) fn cancel(&self) {
        if let Some(handle) = &self.0 {
            handle.cancel();
        }
    }
}

impl Drop for TimeoutGuard {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("id", &self.id)
            .field("owner", &self.owner)
            .field("name", &self.name)
            .field("prompt", &self.prompt)
            .field("cancel_keyword", &self.cancel_keyword)
            .field("validator", &self.validator.is_some())
            .field("canceller", &self.canceller.is_some())
            .field("timeout", &self.timeout.is_set())
            .finish()
    }
}

fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.chars()
        .flat_map(char::to_lowercase)
        .eq(b.chars().flat_map(char::to_lowercase))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eq_ignore_case() {
        assert!(eq_ignore_case("exit", "EXIT"));
        assert!(eq_ignore_case("ÉTÉ", "été"));
        assert!(!eq_ignore_case("exit", "exits"));
    }

    #[test]
    fn test_keyword_and_name_matching() {
        let ctx = ContextBuilder::new(UserId::new(), |_, _| {})
            .name("Nickname")
            .cancel_keyword("Stop")
            .build();

        assert!(ctx.is_cancel_keyword("stop"));
        assert!(ctx.is_cancel_keyword("STOP"));
        assert!(!ctx.is_cancel_keyword("stop please"));
        assert!(ctx.is_named("nickname"));
        assert!(!ctx.is_named("survey"));
    }

    #[test]
    fn test_empty_keyword_never_matches() {
        let ctx = ContextBuilder::new(UserId::new(), |_, _| {})
            .cancel_keyword("")
            .build();
        assert!(!ctx.is_cancel_keyword(""));
    }

    #[test]
    fn test_validate_without_validator_accepts() {
        let ctx = ContextBuilder::new(UserId::new(), |_, _| {}).build();
        assert!(ctx.validate("anything").is_valid());
        assert!(!ctx.has_validator());
    }

    #[test]
    fn test_debug_omits_closures() {
        let ctx = ContextBuilder::new(UserId::new(), |_, _| {})
            .validator(|_, _| ValidationResult::ok())
            .build();
        let rendered = format!("{ctx:?}");
        assert!(rendered.contains("validator: true"));
        assert!(rendered.contains("canceller: false"));
    }
}
