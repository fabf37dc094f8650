//! Deterministic in-memory [`Host`] for tests.
//!
//! `ManualHost` keeps a virtual clock. Nothing happens until the test drives
//! it: [`ManualHost::run_pending`] drains the main-context queue and
//! [`ManualHost::advance`] moves the clock, firing due timers in order.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;

use crate::host::{EventListener, Host, ScheduledTask, Task, TaskHandle};
use crate::types::{Disposition, UserId};

struct Timer {
    due: Duration,
    seq: u64,
    task: ScheduledTask,
    cancelled: Arc<AtomicBool>,
    fired: bool,
}

#[derive(Default)]
struct State {
    now: Duration,
    next_seq: u64,
    timers: Vec<Timer>,
    main_queue: VecDeque<Task>,
    outbox: Vec<(UserId, String)>,
    listener: Option<Arc<dyn EventListener>>,
}

/// Host whose clock and main context are driven by the test.
#[derive(Default)]
pub struct ManualHost {
    state: Mutex<State>,
}

struct ManualTaskHandle {
    cancelled: Arc<AtomicBool>,
}

impl TaskHandle for ManualTaskHandle {
    fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

impl ManualHost {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Current virtual time.
    pub fn now(&self) -> Duration {
        self.state.lock().now
    }

    /// Deliver a chat message to the subscribed listener.
    pub fn deliver(&self, user: UserId, text: &str) -> Disposition {
        let listener = self.state.lock().listener.clone();
        match listener {
            Some(listener) => listener.on_message(user, text),
            None => Disposition::PassThrough,
        }
    }

    /// Deliver a message and drain the main context.
    pub fn chat(&self, user: UserId, text: &str) -> Disposition {
        let disposition = self.deliver(user, text);
        self.run_pending();
        disposition
    }

    /// Signal a disconnect on the main context and drain it.
    pub fn disconnect(&self, user: UserId) {
        let listener = self.state.lock().listener.clone();
        if let Some(listener) = listener {
            self.run_on_main(Box::new(move || listener.on_disconnect(user)));
        }
        self.run_pending();
    }

    /// Run queued main-context tasks, including ones queued while running.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        loop {
            let next = self.state.lock().main_queue.pop_front();
            let Some(task) = next else {
                return ran;
            };
            task();
            ran += 1;
        }
    }

    /// Move the clock forward, firing due timers, then drain the main context.
    pub fn advance(&self, by: Duration) {
        let target = self.state.lock().now + by;

        loop {
            let task = {
                let mut state = self.state.lock();
                let next = state
                    .timers
                    .iter_mut()
                    .filter(|t| !t.fired && !t.cancelled.load(Ordering::SeqCst) && t.due <= target)
                    .min_by_key(|t| (t.due, t.seq));
                match next {
                    Some(timer) => {
                        timer.fired = true;
                        let (due, task) = (timer.due, timer.task.clone());
                        state.now = due;
                        task
                    }
                    None => break,
                }
            };
            task();
            self.run_pending();
        }

        self.state.lock().now = target;
        self.run_pending();
    }

    /// Fire every already-fired timer a second time, ignoring cancellation.
    pub fn refire(&self) -> usize {
        let tasks: Vec<ScheduledTask> = self
            .state
            .lock()
            .timers
            .iter()
            .filter(|t| t.fired)
            .map(|t| t.task.clone())
            .collect();

        for task in &tasks {
            task();
        }
        self.run_pending();
        tasks.len()
    }

    /// Timers neither fired nor cancelled.
    pub fn pending_timers(&self) -> usize {
        self.state
            .lock()
            .timers
            .iter()
            .filter(|t| !t.fired && !t.cancelled.load(Ordering::SeqCst))
            .count()
    }

    /// Messages sent to `user`, in order.
    pub fn messages_for(&self, user: UserId) -> Vec<String> {
        self.state
            .lock()
            .outbox
            .iter()
            .filter(|(to, _)| *to == user)
            .map(|(_, text)| text.clone())
            .collect()
    }

    /// Drain every sent message.
    pub fn take_messages(&self) -> Vec<(UserId, String)> {
        std::mem::take(&mut self.state.lock().outbox)
    }
}

impl Host for ManualHost {
    fn send_message(&self, user: UserId, text: &str) {
        self.state.lock().outbox.push((user, text.to_string()));
    }

    fn schedule_once(&self, delay: Duration, task: ScheduledTask) -> Box<dyn TaskHandle> {
        let cancelled = Arc::new(AtomicBool::new(false));
        let mut state = self.state.lock();
        let seq = state.next_seq;
        state.next_seq += 1;
        let due = state.now + delay;
        state.timers.push(Timer {
            due,
            seq,
            task,
            cancelled: cancelled.clone(),
            fired: false,
        });
        Box::new(ManualTaskHandle { cancelled })
    }

    fn run_on_main(&self, task: Task) {
        self.state.lock().main_queue.push_back(task);
    }

    fn subscribe(&self, listener: Arc<dyn EventListener>) {
        self.state.lock().listener = Some(listener);
    }
}
