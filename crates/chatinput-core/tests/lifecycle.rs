//! End-to-end lifecycle of a pending context against the manual host.

use std::sync::Arc;
use std::time::Duration;

use chatinput_core::testing::ManualHost;
use chatinput_core::{CancelCause, Coordinator, Disposition, UserId, ValidationResult};
use parking_lot::Mutex;

type Log = Arc<Mutex<Vec<String>>>;

fn setup() -> (Arc<ManualHost>, Coordinator, UserId) {
    let host = ManualHost::new();
    let coordinator = Coordinator::with_defaults(host.clone());
    (host, coordinator, UserId::new())
}

fn log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

#[test]
fn fresh_register_sends_prompt_without_cancelling() {
    let (host, coordinator, user) = setup();
    let events = log();

    let sink = events.clone();
    coordinator.register(
        coordinator
            .builder(user, |_, _| {})
            .prompt("Pick a color")
            .canceller(move |_, cause| sink.lock().push(format!("cancel:{cause}")))
            .build(),
    );

    assert_eq!(host.messages_for(user), vec!["Pick a color"]);
    assert!(events.lock().is_empty());
}

#[test]
fn displacement_is_silent() {
    let (host, coordinator, user) = setup();
    let causes = Arc::new(Mutex::new(Vec::new()));

    let sink = causes.clone();
    coordinator.register(
        coordinator
            .builder(user, |_, _| {})
            .name("a")
            .prompt("Prompt A")
            .canceller(move |reply, cause| {
                sink.lock().push(cause);
                reply.send("A cancelled");
            })
            .build(),
    );
    coordinator.register(
        coordinator
            .builder(user, |_, _| {})
            .name("b")
            .prompt("Prompt B")
            .build(),
    );

    assert_eq!(*causes.lock(), vec![CancelCause::Displaced]);
    assert_eq!(host.messages_for(user), vec!["Prompt A", "Prompt B"]);
    assert!(coordinator.has_active_context(user, "b"));
    assert!(!coordinator.has_active_context(user, "a"));
}

#[test]
fn displaced_timeout_never_fires() {
    let (host, coordinator, user) = setup();
    let events = log();

    let sink = events.clone();
    coordinator.register(
        coordinator
            .builder(user, |_, _| {})
            .canceller(move |_, cause| sink.lock().push(cause.to_string()))
            .timeout_secs(&coordinator, 5, "A timed out")
            .build(),
    );
    coordinator.register(coordinator.builder(user, |_, _| {}).build());

    host.advance(Duration::from_secs(10));
    assert_eq!(*events.lock(), vec!["displaced"]);
    assert!(!host.messages_for(user).contains(&"A timed out".to_string()));
    assert!(coordinator.is_awaiting_input(user));
}

#[test]
fn cancel_keyword_is_case_insensitive() {
    let (host, coordinator, user) = setup();
    let events = log();

    let sink = events.clone();
    let received = log();
    let answers = received.clone();
    coordinator.register(
        coordinator
            .builder(user, move |_, text| answers.lock().push(text.to_string()))
            .canceller(move |reply, cause| {
                sink.lock().push(cause.to_string());
                reply.send("Cancelled.");
            })
            .build(),
    );

    assert_eq!(host.chat(user, "EXIT"), Disposition::Consumed);
    assert_eq!(*events.lock(), vec!["keyword"]);
    assert_eq!(host.messages_for(user), vec!["Cancelled."]);
    assert!(!coordinator.is_awaiting_input(user));

    assert_eq!(host.chat(user, "hello everyone"), Disposition::PassThrough);
    assert!(received.lock().is_empty());
}

#[test]
fn custom_cancel_keyword() {
    let (host, coordinator, user) = setup();
    let events = log();

    let sink = events.clone();
    coordinator.register(
        coordinator
            .builder(user, |_, _| {})
            .cancel_keyword("stop")
            .canceller(move |_, cause| sink.lock().push(cause.to_string()))
            .build(),
    );

    host.chat(user, "exit");
    assert!(events.lock().is_empty());
    assert!(!coordinator.is_awaiting_input(user));

    coordinator.register(
        coordinator
            .builder(user, |_, _| {})
            .cancel_keyword("stop")
            .canceller({
                let sink = events.clone();
                move |_, cause| sink.lock().push(cause.to_string())
            })
            .build(),
    );
    host.chat(user, "Stop");
    assert_eq!(*events.lock(), vec!["keyword"]);
}

#[test]
fn failed_validation_allows_retry() {
    let (host, coordinator, user) = setup();
    let received = log();

    let answers = received.clone();
    coordinator.register(
        coordinator
            .builder(user, move |_, text| answers.lock().push(text.to_string()))
            .validator(|_, text| {
                if text.len() < 3 {
                    ValidationResult::fail("too short")
                } else {
                    ValidationResult::ok()
                }
            })
            .build(),
    );

    assert_eq!(host.chat(user, "x"), Disposition::Consumed);
    assert_eq!(host.messages_for(user), vec!["too short"]);
    assert!(coordinator.is_awaiting_input(user));
    assert!(received.lock().is_empty());

    host.chat(user, "hello");
    assert_eq!(*received.lock(), vec!["hello"]);
    assert!(!coordinator.is_awaiting_input(user));
}

#[test]
fn answer_cancels_pending_timeout() {
    let (host, coordinator, user) = setup();
    let events = log();
    let received = log();

    let sink = events.clone();
    let answers = received.clone();
    coordinator.register(
        coordinator
            .builder(user, move |_, text| answers.lock().push(text.to_string()))
            .canceller(move |_, cause| sink.lock().push(cause.to_string()))
            .timeout_secs(&coordinator, 5, "Too slow")
            .build(),
    );

    host.advance(Duration::from_secs(1));
    host.chat(user, "blue");
    assert_eq!(host.pending_timers(), 0);

    host.advance(Duration::from_secs(5));
    assert_eq!(*received.lock(), vec!["blue"]);
    assert!(events.lock().is_empty());
    assert!(!host.messages_for(user).contains(&"Too slow".to_string()));
}

#[test]
fn timeout_cancels_and_sends_message() {
    let (host, coordinator, user) = setup();
    let events = log();

    let sink = events.clone();
    coordinator.register(
        coordinator
            .builder(user, |_, _| {})
            .canceller(move |_, cause| sink.lock().push(cause.to_string()))
            .timeout_secs(&coordinator, 5, "Too slow")
            .build(),
    );

    host.advance(Duration::from_secs(4));
    assert!(coordinator.is_awaiting_input(user));

    host.advance(Duration::from_secs(1));
    assert_eq!(*events.lock(), vec!["timeout"]);
    assert_eq!(host.messages_for(user), vec!["Too slow"]);
    assert!(!coordinator.is_awaiting_input(user));
}

#[test]
fn empty_timeout_message_is_not_sent() {
    let (host, coordinator, user) = setup();

    coordinator.register(
        coordinator
            .builder(user, |_, _| {})
            .timeout_secs(&coordinator, 1, "")
            .build(),
    );

    host.advance(Duration::from_secs(2));
    assert!(host.messages_for(user).is_empty());
    assert!(!coordinator.is_awaiting_input(user));
}

#[test]
fn timeout_replayed_is_idempotent() {
    let (host, coordinator, user) = setup();
    let events = log();

    let sink = events.clone();
    coordinator.register(
        coordinator
            .builder(user, |_, _| {})
            .canceller(move |_, cause| sink.lock().push(cause.to_string()))
            .timeout_secs(&coordinator, 5, "Too slow")
            .build(),
    );

    host.advance(Duration::from_secs(5));
    assert_eq!(host.refire(), 1);
    assert_eq!(host.refire(), 1);

    assert_eq!(*events.lock(), vec!["timeout"]);
    assert_eq!(host.messages_for(user), vec!["Too slow"]);
}

#[test]
fn stale_timeout_ignores_newer_context() {
    let (host, coordinator, user) = setup();
    let events = log();

    coordinator.register(
        coordinator
            .builder(user, |_, _| {})
            .timeout_secs(&coordinator, 5, "first timed out")
            .build(),
    );
    host.advance(Duration::from_secs(5));

    let sink = events.clone();
    coordinator.register(
        coordinator
            .builder(user, |_, _| {})
            .canceller(move |_, cause| sink.lock().push(cause.to_string()))
            .build(),
    );

    host.refire();
    assert!(events.lock().is_empty());
    assert!(coordinator.is_awaiting_input(user));
}

#[test]
fn disconnect_clears_session() {
    let (host, coordinator, user) = setup();
    let events = log();

    let sink = events.clone();
    coordinator.register(
        coordinator
            .builder(user, |_, _| {})
            .canceller(move |_, cause| sink.lock().push(cause.to_string()))
            .timeout_secs(&coordinator, 5, "Too slow")
            .build(),
    );

    host.disconnect(user);
    assert_eq!(*events.lock(), vec!["disconnect"]);
    assert_eq!(coordinator.session_count(), 0);
    assert_eq!(host.pending_timers(), 0);

    let session = coordinator.session(user);
    assert!(!session.has_active_context());
    assert_eq!(host.chat(user, "back again"), Disposition::PassThrough);
}

#[test]
fn message_queued_before_disconnect_is_dropped() {
    let (host, coordinator, user) = setup();
    let received = log();

    let answers = received.clone();
    coordinator.register(
        coordinator
            .builder(user, move |_, text| answers.lock().push(text.to_string()))
            .build(),
    );

    assert_eq!(host.deliver(user, "late answer"), Disposition::Consumed);
    coordinator.on_disconnect(user);
    host.run_pending();

    assert!(received.lock().is_empty());
}

#[test]
fn message_queued_before_timeout_is_dropped() {
    let (host, coordinator, user) = setup();
    let received = log();
    let events = log();

    let answers = received.clone();
    let sink = events.clone();
    coordinator.register(
        coordinator
            .builder(user, move |_, text| answers.lock().push(text.to_string()))
            .canceller(move |_, cause| sink.lock().push(cause.to_string()))
            .timeout_secs(&coordinator, 5, "")
            .build(),
    );

    assert_eq!(host.deliver(user, "just in time"), Disposition::Consumed);
    host.advance(Duration::from_secs(5));

    assert_eq!(*events.lock(), vec!["timeout"]);
    assert!(received.lock().is_empty());
    assert!(host.messages_for(user).is_empty());
}

#[test]
fn explicit_cancel_runs_canceller_once() {
    let (_host, coordinator, user) = setup();
    let events = log();

    let sink = events.clone();
    coordinator.register(
        coordinator
            .builder(user, |_, _| {})
            .canceller(move |_, cause| sink.lock().push(cause.to_string()))
            .build(),
    );

    assert!(coordinator.cancel(user));
    assert!(!coordinator.cancel(user));
    assert_eq!(*events.lock(), vec!["explicit"]);
}

#[test]
fn canceller_may_register_follow_up() {
    let (host, coordinator, user) = setup();

    coordinator.register(
        coordinator
            .builder(user, |_, _| {})
            .canceller(|reply, _| {
                let coordinator = reply.coordinator();
                coordinator.register(
                    coordinator
                        .builder(reply.user(), |_, _| {})
                        .name("retry")
                        .prompt("Try again?")
                        .build(),
                );
            })
            .timeout_secs(&coordinator, 1, "")
            .build(),
    );

    host.advance(Duration::from_secs(1));
    assert!(coordinator.has_active_context(user, "retry"));
    assert_eq!(host.messages_for(user), vec!["Try again?"]);
}

#[test]
fn users_are_independent() {
    let (host, coordinator, alice) = setup();
    let bob = UserId::new();
    let received = log();

    for user in [alice, bob] {
        let answers = received.clone();
        coordinator.register(
            coordinator
                .builder(user, move |reply, text| {
                    answers.lock().push(format!("{}:{text}", reply.user()))
                })
                .build(),
        );
    }

    host.chat(alice, "one");
    assert!(coordinator.is_awaiting_input(bob));
    assert_eq!(coordinator.pending_count(), 1);

    host.chat(bob, "two");
    assert_eq!(
        *received.lock(),
        vec![format!("{alice}:one"), format!("{bob}:two")]
    );
}
