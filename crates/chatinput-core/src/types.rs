//! Identifiers and small value types shared across the crate.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// Stable identifier of a user known to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(Uuid);

impl UserId {
    /// Generate a fresh random user id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID.
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// The underlying UUID.
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for UserId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for UserId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Process-unique identifier of one request context.
///
/// Assigned when the builder is created, so a timeout scheduled during
/// construction can name the context it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(u64);

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

impl ContextId {
    pub(crate) fn next() -> Self {
        Self(NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ctx-{}", self.0)
    }
}

/// Why a pending context ended without a successful answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelCause {
    /// The user typed the context's cancel keyword.
    Keyword,
    /// Application code called `Coordinator::cancel`.
    Explicit,
    /// The scheduled timeout fired first.
    Timeout,
    /// The user disconnected.
    Disconnect,
    /// A new context was registered for the same user.
    Displaced,
}

impl CancelCause {
    /// Silent causes must not produce user-visible output.
    pub fn is_silent(self) -> bool {
        matches!(self, CancelCause::Displaced)
    }
}

impl fmt::Display for CancelCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancelCause::Keyword => write!(f, "keyword"),
            CancelCause::Explicit => write!(f, "explicit"),
            CancelCause::Timeout => write!(f, "timeout"),
            CancelCause::Disconnect => write!(f, "disconnect"),
            CancelCause::Displaced => write!(f, "displaced"),
        }
    }
}

/// What the host should do with an incoming message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// The message answers a pending context; suppress normal handling.
    Consumed,
    /// No context is pending; handle the message normally.
    PassThrough,
}

impl Disposition {
    pub fn is_consumed(self) -> bool {
        matches!(self, Disposition::Consumed)
    }
}
