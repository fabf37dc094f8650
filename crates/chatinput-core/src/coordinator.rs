//! The coordinator: session registry plus the resolution protocol.
//!
//! ## Lifecycle per user
//!
//! ```text
//! Idle ──register──► Active ──┬─ answer accepted ─────► Idle (receiver)
//!                             ├─ cancel keyword ──────► Idle (canceller)
//!                             ├─ Coordinator::cancel ─► Idle (canceller)
//!                             ├─ timeout ─────────────► Idle (canceller + message)
//!                             ├─ disconnect ──────────► session removed (canceller)
//!                             └─ register again ──────► Active (old canceller, muted)
//! ```
//!
//! Every transition out of `Active` takes the context out of the session slot
//! with one atomic swap before any handler runs. Whoever wins the swap owns
//! the context's resolution; everyone else finds the slot empty (or holding a
//! different context) and does nothing. No map guard or slot lock is held
//! while handlers run, so handlers may call back into the coordinator.

use std::fmt;
use std::sync::{Arc, OnceLock, Weak};

use dashmap::DashMap;
use tracing::{debug, info};

use crate::config::CoordinatorConfig;
use crate::context::{ContextBuilder, Reply, RequestContext};
use crate::error::Result;
use crate::host::{EventListener, Host};
use crate::session::UserSession;
use crate::types::{CancelCause, ContextId, Disposition, UserId};
use crate::validation::ValidationResult;

struct Inner {
    host: Arc<dyn Host>,
    config: CoordinatorConfig,
    sessions: DashMap<UserId, Arc<UserSession>>,
}

/// Shared handle to the input coordinator. Cloning is cheap.
#[derive(Clone)]
pub struct Coordinator {
    inner: Arc<Inner>,
}

/// Non-owning coordinator handle held by scheduled callbacks.
#[derive(Clone)]
pub struct WeakCoordinator {
    inner: Weak<Inner>,
}

impl WeakCoordinator {
    pub fn upgrade(&self) -> Option<Coordinator> {
        self.inner.upgrade().map(|inner| Coordinator { inner })
    }
}

/// Listener registered with the host. Weak so the host never keeps the
/// coordinator alive.
struct Subscription(WeakCoordinator);

impl EventListener for Subscription {
    fn on_message(&self, user: UserId, text: &str) -> Disposition {
        match self.0.upgrade() {
            Some(coordinator) => coordinator.on_incoming_message(user, text),
            None => Disposition::PassThrough,
        }
    }

    fn on_disconnect(&self, user: UserId) {
        if let Some(coordinator) = self.0.upgrade() {
            coordinator.on_disconnect(user);
        }
    }
}

impl Coordinator {
    /// Create a coordinator and subscribe it to the host's events.
    ///
    /// The configuration is used as given; see [`Coordinator::try_new`].
    pub fn new(host: Arc<dyn Host>, config: CoordinatorConfig) -> Self {
        let coordinator = Self {
            inner: Arc::new(Inner {
                host,
                config,
                sessions: DashMap::new(),
            }),
        };

        let listener = Arc::new(Subscription(coordinator.downgrade()));
        coordinator.inner.host.subscribe(listener);
        coordinator
    }

    /// Create a coordinator after validating `config`.
    pub fn try_new(host: Arc<dyn Host>, config: CoordinatorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(host, config))
    }

    /// Create with default configuration.
    pub fn with_defaults(host: Arc<dyn Host>) -> Self {
        Self::new(host, CoordinatorConfig::default())
    }

    pub fn host(&self) -> &Arc<dyn Host> {
        &self.inner.host
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.inner.config
    }

    pub fn downgrade(&self) -> WeakCoordinator {
        WeakCoordinator {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Whether both handles point at the same coordinator.
    pub fn ptr_eq(&self, other: &Coordinator) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Start a context for `owner` seeded with this coordinator's defaults.
    pub fn builder<F>(&self, owner: UserId, receiver: F) -> ContextBuilder
    where
        F: Fn(&Reply<'_>, &str) + Send + Sync + 'static,
    {
        ContextBuilder::new(owner, receiver)
            .cancel_keyword(self.inner.config.cancel_keyword.clone())
            .color_codes(self.inner.config.color_code_char)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Session registry
    // ─────────────────────────────────────────────────────────────────────────

    /// Get the user's session, creating an empty one on first access.
    pub fn session(&self, user: UserId) -> Arc<UserSession> {
        self.inner
            .sessions
            .entry(user)
            .or_insert_with(|| Arc::new(UserSession::new(user)))
            .clone()
    }

    /// Get the user's session without creating it.
    pub fn find_session(&self, user: UserId) -> Option<Arc<UserSession>> {
        self.inner.sessions.get(&user).map(|entry| entry.value().clone())
    }

    /// Number of known sessions.
    pub fn session_count(&self) -> usize {
        self.inner.sessions.len()
    }

    /// Number of sessions with a pending context.
    pub fn pending_count(&self) -> usize {
        self.inner
            .sessions
            .iter()
            .filter(|entry| entry.value().has_active_context())
            .count()
    }

    /// Whether the user's pending context is named `name` (case-insensitive).
    pub fn has_active_context(&self, user: UserId, name: &str) -> bool {
        self.find_session(user)
            .and_then(|session| session.active_context())
            .is_some_and(|ctx| ctx.is_named(name))
    }

    /// Whether the user's next message will be captured.
    pub fn is_awaiting_input(&self, user: UserId) -> bool {
        self.find_session(user)
            .is_some_and(|session| session.has_active_context())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Resolution protocol
    // ─────────────────────────────────────────────────────────────────────────

    /// Make `context` the owner's pending context and send its prompt.
    ///
    /// A context already pending for the same user is displaced: its timeout
    /// is cancelled and its canceller runs with [`CancelCause::Displaced`]
    /// through a muted reply, so the user only sees the new prompt.
    ///
    /// While the owner is disconnecting, the context is cancelled with
    /// [`CancelCause::Disconnect`] right away and its prompt is not sent.
    pub fn register(&self, context: RequestContext) {
        let owner = context.owner();
        let id = context.id();
        let prompt = context.prompt().map(str::to_owned);
        let session = self.session(owner);

        match session.set_active_context(Arc::new(context)) {
            Ok(Some(old)) => {
                debug!(
                    user = %owner,
                    context = %id,
                    displaced = %old.id(),
                    "displaced pending context"
                );
                self.finish_cancelled(&old, CancelCause::Displaced);
            }
            Ok(None) => debug!(user = %owner, context = %id, "registered context"),
            Err(refused) => {
                debug!(user = %owner, context = %id, "registered while disconnecting");
                self.finish_cancelled(&refused, CancelCause::Disconnect);
                return;
            }
        }

        if let Some(prompt) = prompt {
            self.inner.host.send_message(owner, &prompt);
        }
    }

    /// Cancel the user's pending context. Returns false if none was pending.
    ///
    /// Call on the main context.
    pub fn cancel(&self, user: UserId) -> bool {
        self.cancel_active(user, CancelCause::Explicit)
    }

    /// Message event. Returns whether the host must suppress the message.
    ///
    /// Safe to call from any thread: the answer itself is processed on the
    /// main context via [`Host::run_on_main`].
    pub fn on_incoming_message(&self, user: UserId, text: &str) -> Disposition {
        if !self.is_awaiting_input(user) {
            return Disposition::PassThrough;
        }

        let coordinator = self.clone();
        let text = text.to_owned();
        self.inner
            .host
            .run_on_main(Box::new(move || coordinator.resolve_message(user, &text)));

        Disposition::Consumed
    }

    /// Disconnect event: cancel the pending context and forget the session.
    ///
    /// The session is closed first, so a context the canceller registers is
    /// itself cancelled with [`CancelCause::Disconnect`] instead of pending
    /// for a user who is gone.
    pub fn on_disconnect(&self, user: UserId) {
        let Some(session) = self.find_session(user) else {
            return;
        };

        if let Some(ctx) = session.close() {
            self.finish_cancelled(&ctx, CancelCause::Disconnect);
        }

        self.inner
            .sessions
            .remove_if(&user, |_, stored| Arc::ptr_eq(stored, &session));
        debug!(user = %user, "session removed");
    }

    fn resolve_message(&self, user: UserId, text: &str) {
        let Some(session) = self.find_session(user) else {
            info!(
                user = %user,
                len = text.len(),
                "dropping captured message; user left before it was processed"
            );
            return;
        };
        let Some(pending) = session.active_context() else {
            info!(
                user = %user,
                len = text.len(),
                "dropping captured message; context already resolved"
            );
            return;
        };
        let id = pending.id();

        if pending.is_cancel_keyword(text) {
            drop(pending);
            if let Some(ctx) = session.clear_if(id) {
                self.finish_cancelled(&ctx, CancelCause::Keyword);
            }
            return;
        }

        if let ValidationResult::Invalid(reason) = pending.validate(text) {
            debug!(user = %user, context = %id, "answer rejected by validator");
            self.send_message(user, &reason);
            return;
        }
        drop(pending);

        let Some(ctx) = session.clear_if(id) else {
            info!(
                user = %user,
                context = %id,
                "dropping captured message; context replaced while validating"
            );
            return;
        };
        ctx.cancel_timeout();
        debug!(user = %user, context = %id, "answer accepted");
        ctx.receive(&Reply::new(user, self), text);
    }

    /// Timeout callback body. No-op unless context `id` is still pending.
    pub(crate) fn expire(&self, user: UserId, id: ContextId, message: &str) {
        let Some(ctx) = self
            .find_session(user)
            .and_then(|session| session.clear_if(id))
        else {
            debug!(user = %user, context = %id, "timeout fired for resolved context");
            return;
        };

        self.finish_cancelled(&ctx, CancelCause::Timeout);
        if !message.is_empty() {
            self.send_message(user, message);
        }
    }

    fn cancel_active(&self, user: UserId, cause: CancelCause) -> bool {
        let Some(ctx) = self
            .find_session(user)
            .and_then(|session| session.clear_context())
        else {
            return false;
        };

        self.finish_cancelled(&ctx, cause);
        true
    }

    fn finish_cancelled(&self, ctx: &RequestContext, cause: CancelCause) {
        ctx.cancel_timeout();
        debug!(user = %ctx.owner(), context = %ctx.id(), %cause, "context cancelled");

        let reply = if cause.is_silent() {
            Reply::muted(ctx.owner(), self)
        } else {
            Reply::new(ctx.owner(), self)
        };
        ctx.notify_cancelled(&reply, cause);
    }

    /// Send `text` to `user` unchanged. Only prompts get color translation,
    /// at build time.
    pub fn send_message(&self, user: UserId, text: &str) {
        self.inner.host.send_message(user, text);
    }
}

impl EventListener for Coordinator {
    fn on_message(&self, user: UserId, text: &str) -> Disposition {
        self.on_incoming_message(user, text)
    }

    fn on_disconnect(&self, user: UserId) {
        Coordinator::on_disconnect(self, user);
    }
}

impl fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Coordinator")
            .field("config", &self.inner.config)
            .field("sessions", &self.inner.sessions.len())
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Process-wide instance
// ─────────────────────────────────────────────────────────────────────────────

static INSTANCE: OnceLock<Coordinator> = OnceLock::new();

/// Initialize the process-wide coordinator with default configuration.
///
/// The first call wins; later calls return the existing coordinator.
pub fn initialize(host: Arc<dyn Host>) -> Coordinator {
    initialize_with(host, CoordinatorConfig::default())
}

/// Initialize the process-wide coordinator with `config`.
pub fn initialize_with(host: Arc<dyn Host>, config: CoordinatorConfig) -> Coordinator {
    let mut created = false;
    let coordinator = INSTANCE.get_or_init(|| {
        created = true;
        Coordinator::new(host, config)
    });

    if !created {
        debug!("input coordinator already initialized; ignoring new host");
    }
    coordinator.clone()
}

/// The process-wide coordinator.
pub fn instance() -> Result<Coordinator> {
    INSTANCE
        .get()
        .cloned()
        .ok_or(crate::error::InputError::NotInitialized)
}
