//! `Host` implementation backed by TCP connections.
//!
//! Each connection owns an unbounded outbound queue drained by its writer
//! task. Everything that touches chat state runs on the core's main loop;
//! reader tasks only forward lines.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use chatinput_core::formatting::{strip_codes, to_ansi};
use chatinput_core::runtime::{MainLoopHandle, TokioScheduler};
use chatinput_core::{Disposition, EventListener, Host, ScheduledTask, Task, TaskHandle, UserId};
use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// A connected client
struct Client {
    nick: Option<String>,
    outbound: mpsc::UnboundedSender<String>,
}

/// Chat host shared by all connections.
pub struct ServerHost {
    clients: DashMap<UserId, Client>,
    main: MainLoopHandle,
    scheduler: TokioScheduler,
    listener: OnceLock<Arc<dyn EventListener>>,
    ansi_colors: bool,
}

impl ServerHost {
    pub fn new(main: MainLoopHandle, scheduler: TokioScheduler, ansi_colors: bool) -> Self {
        Self {
            clients: DashMap::new(),
            main,
            scheduler,
            listener: OnceLock::new(),
            ansi_colors,
        }
    }

    /// Register a connection and return its outbound line queue.
    pub fn connect(&self, user: UserId) -> mpsc::UnboundedReceiver<String> {
        let (outbound, rx) = mpsc::unbounded_channel();
        self.clients.insert(
            user,
            Client {
                nick: None,
                outbound,
            },
        );
        rx
    }

    /// Forget a connection. Returns its nickname, if it had one.
    ///
    /// Dropping the queue sender lets the writer task finish.
    pub fn remove(&self, user: UserId) -> Option<String> {
        self.clients.remove(&user).and_then(|(_, client)| client.nick)
    }

    pub fn is_connected(&self, user: UserId) -> bool {
        self.clients.contains_key(&user)
    }

    pub fn nick(&self, user: UserId) -> Option<String> {
        self.clients.get(&user).and_then(|client| client.nick.clone())
    }

    /// Set the nickname, returning the previous one.
    pub fn set_nick(&self, user: UserId, nick: impl Into<String>) -> Option<String> {
        self.clients
            .get_mut(&user)
            .and_then(|mut client| client.nick.replace(nick.into()))
    }

    /// Whether a user other than `except` already uses `nick` (case-insensitive).
    pub fn is_nick_taken(&self, nick: &str, except: UserId) -> bool {
        self.clients.iter().any(|entry| {
            *entry.key() != except
                && entry
                    .value()
                    .nick
                    .as_deref()
                    .is_some_and(|taken| taken.eq_ignore_ascii_case(nick))
        })
    }

    /// Sorted nicknames of everyone who has one.
    pub fn roster(&self) -> Vec<String> {
        let mut nicks: Vec<String> = self
            .clients
            .iter()
            .filter_map(|entry| entry.value().nick.clone())
            .collect();
        nicks.sort_by_key(|nick| nick.to_lowercase());
        nicks
    }

    /// Send `text` to every named user except `from`.
    pub fn broadcast(&self, from: UserId, text: &str) {
        let recipients: Vec<UserId> = self
            .clients
            .iter()
            .filter(|entry| *entry.key() != from && entry.value().nick.is_some())
            .map(|entry| *entry.key())
            .collect();

        for user in recipients {
            self.send_message(user, text);
        }
    }

    /// Queue work on the main loop.
    pub fn dispatch(&self, task: Task) -> bool {
        self.main.dispatch(task)
    }

    /// Offer a line to the coordinator. Safe off the main loop.
    pub fn message_event(&self, user: UserId, text: &str) -> Disposition {
        match self.listener.get() {
            Some(listener) => listener.on_message(user, text),
            None => Disposition::PassThrough,
        }
    }

    /// Tell the coordinator a user left. Call on the main loop.
    pub fn disconnect_event(&self, user: UserId) {
        if let Some(listener) = self.listener.get() {
            listener.on_disconnect(user);
        }
    }

    fn render(&self, text: &str) -> String {
        if self.ansi_colors {
            to_ansi(text)
        } else {
            strip_codes(text)
        }
    }
}

impl Host for ServerHost {
    fn send_message(&self, user: UserId, text: &str) {
        let line = self.render(text);
        let Some(client) = self.clients.get(&user) else {
            debug!(user = %user, "dropping message for disconnected user");
            return;
        };
        if client.outbound.send(line).is_err() {
            debug!(user = %user, "writer closed; message dropped");
        }
    }

    fn schedule_once(&self, delay: Duration, task: ScheduledTask) -> Box<dyn TaskHandle> {
        Box::new(self.scheduler.schedule(delay, task))
    }

    fn run_on_main(&self, task: Task) {
        self.main.dispatch(task);
    }

    fn subscribe(&self, listener: Arc<dyn EventListener>) {
        if self.listener.set(listener).is_err() {
            warn!("host already has a listener; ignoring second subscription");
        }
    }
}
