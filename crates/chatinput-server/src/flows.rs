//! Chat behaviour built on the input coordinator.
//!
//! Every function here runs on the main loop.

use std::sync::Arc;

use chatinput_core::formatting::{strip_codes, translate_alternate_codes};
use chatinput_core::{CancelCause, Coordinator, UserId, ValidationResult};
use tracing::info;

use crate::config::PromptConfig;
use crate::host::ServerHost;

/// Name of the nickname context
pub const NICKNAME_CONTEXT: &str = "nickname";

/// Name of the feedback context
pub const FEEDBACK_CONTEXT: &str = "feedback";

pub const NICK_MIN_LEN: usize = 3;
pub const NICK_MAX_LEN: usize = 16;

/// State shared by connection tasks and flows.
pub struct ChatState {
    pub host: Arc<ServerHost>,
    pub coordinator: Coordinator,
    pub prompts: PromptConfig,
}

/// A line that did not answer a prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatLine<'a> {
    Nick,
    Feedback,
    Who,
    Quit,
    Unknown(&'a str),
    Say(&'a str),
}

impl<'a> ChatLine<'a> {
    pub fn parse(line: &'a str) -> Self {
        let trimmed = line.trim();
        let Some(command) = trimmed.strip_prefix('/') else {
            return Self::Say(line);
        };

        let name = command.split_whitespace().next().unwrap_or_default();
        match name.to_ascii_lowercase().as_str() {
            "nick" => Self::Nick,
            "feedback" => Self::Feedback,
            "who" => Self::Who,
            "quit" => Self::Quit,
            _ => Self::Unknown(name),
        }
    }
}

/// Translate `text` with the configured alternate color char, if any.
pub fn colored(prefix: Option<char>, text: &str) -> String {
    match prefix {
        Some(prefix) => translate_alternate_codes(prefix, text),
        None => text.to_owned(),
    }
}

fn colored_reason(prefix: Option<char>, result: ValidationResult) -> ValidationResult {
    match result {
        ValidationResult::Invalid(reason) => ValidationResult::fail(colored(prefix, &reason)),
        valid => valid,
    }
}

/// Tell `user` something written with alternate color codes.
pub fn notify(coordinator: &Coordinator, user: UserId, text: &str) {
    coordinator.send_message(user, &colored(coordinator.config().color_code_char, text));
}

/// Check a proposed nickname for `user`.
pub fn validate_nickname(host: &ServerHost, user: UserId, text: &str) -> ValidationResult {
    let len = text.chars().count();
    if !(NICK_MIN_LEN..=NICK_MAX_LEN).contains(&len) {
        return ValidationResult::fail(format!(
            "&cNickname must be {NICK_MIN_LEN}-{NICK_MAX_LEN} characters."
        ));
    }
    if !text.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return ValidationResult::fail("&cUse only letters, digits and _.");
    }
    if host.is_nick_taken(text, user) {
        return ValidationResult::fail("&cThat nickname is taken.");
    }
    ValidationResult::ok()
}

/// Free `guest-xxxx` name derived from the user id.
pub fn guest_name(host: &ServerHost, user: UserId) -> String {
    let hex = user.as_uuid().simple().to_string();
    (4..=hex.len())
        .map(|len| format!("guest-{}", &hex[..len]))
        .find(|name| !host.is_nick_taken(name, user))
        .unwrap_or_else(|| format!("guest-{hex}"))
}

/// Greet a new connection and ask for a nickname.
pub fn welcome(state: &ChatState, user: UserId) {
    notify(&state.coordinator, user, "&6Welcome to chatinput!");
    ask_nickname(state, user);
}

/// Register the nickname prompt for `user`.
pub fn ask_nickname(state: &ChatState, user: UserId) {
    let coordinator = &state.coordinator;
    let keyword = coordinator.config().cancel_keyword.clone();
    let prefix = coordinator.config().color_code_char;

    let validate_host = state.host.clone();
    let receive_host = state.host.clone();
    let cancel_host = state.host.clone();

    let mut builder = coordinator
        .builder(user, move |reply, text| {
            let user = reply.user();
            let announcement = match receive_host.set_nick(user, text) {
                Some(old) => format!("* {old} is now known as {text}"),
                None => format!("* {text} joined"),
            };
            receive_host.broadcast(user, &announcement);
            info!(user = %user, nick = %text, "nickname set");
            reply.send(colored(prefix, &format!("&aYou are now known as {text}.")));
        })
        .name(NICKNAME_CONTEXT)
        .prompt(format!(
            "&eChoose a nickname &7({NICK_MIN_LEN}-{NICK_MAX_LEN} letters, digits or _; '{keyword}' to skip)"
        ))
        .validator(move |user, text| {
            colored_reason(prefix, validate_nickname(&validate_host, user, text))
        })
        .canceller(move |reply, cause| {
            let user = reply.user();
            if matches!(cause, CancelCause::Disconnect | CancelCause::Displaced) {
                return;
            }
            if cancel_host.nick(user).is_some() {
                reply.send(colored(prefix, "&7Nickname unchanged."));
                return;
            }

            let guest = guest_name(&cancel_host, user);
            cancel_host.set_nick(user, guest.as_str());
            cancel_host.broadcast(user, &format!("* {guest} joined"));
            if cause == CancelCause::Timeout {
                let text = format!("&cNo nickname chosen in time; you are now known as {guest}.");
                reply.send(colored(prefix, &text));
            } else {
                reply.send(colored(prefix, &format!("&7You are now known as {guest}.")));
            }
        });

    if state.prompts.nickname_timeout_secs > 0 {
        builder = builder.timeout_secs(coordinator, state.prompts.nickname_timeout_secs, "");
    }

    coordinator.register(builder.build());
}

/// Register the one-shot feedback prompt for `user`.
pub fn ask_feedback(state: &ChatState, user: UserId) {
    let coordinator = &state.coordinator;
    let prefix = coordinator.config().color_code_char;

    let mut builder = coordinator
        .builder(user, move |reply, text| {
            info!(user = %reply.user(), feedback = %text.trim(), "feedback received");
            reply.send(colored(prefix, "&aThanks for the feedback!"));
        })
        .name(FEEDBACK_CONTEXT)
        .prompt("&eWhat do you think of this server?")
        .validator(move |_, text| {
            let text = text.trim();
            let result = if text.is_empty() {
                ValidationResult::fail("&cFeedback cannot be empty.")
            } else if text.chars().count() > 200 {
                ValidationResult::fail("&cPlease keep it under 200 characters.")
            } else {
                ValidationResult::ok()
            };
            colored_reason(prefix, result)
        })
        .canceller(move |reply, cause| {
            if matches!(cause, CancelCause::Keyword | CancelCause::Explicit) {
                reply.send(colored(prefix, "&7Feedback cancelled."));
            }
        });

    if state.prompts.feedback_timeout_secs > 0 {
        builder = builder.timeout_secs(
            coordinator,
            state.prompts.feedback_timeout_secs,
            colored(prefix, "&7Feedback prompt expired."),
        );
    }

    coordinator.register(builder.build());
}

/// Handle a line the coordinator passed through.
pub fn handle_line(state: &ChatState, user: UserId, line: &str) {
    let coordinator = &state.coordinator;
    let host = &state.host;

    match ChatLine::parse(line) {
        ChatLine::Nick => {
            if coordinator.has_active_context(user, NICKNAME_CONTEXT) {
                notify(coordinator, user, "&cYou are already choosing a nickname.");
            } else {
                ask_nickname(state, user);
            }
        }
        ChatLine::Feedback => {
            if coordinator.is_awaiting_input(user) {
                notify(coordinator, user, "&cFinish your current prompt first.");
            } else {
                ask_feedback(state, user);
            }
        }
        ChatLine::Who => {
            let roster = host.roster().join(", ");
            notify(coordinator, user, &format!("&7Online: {roster}"));
        }
        ChatLine::Quit => notify(coordinator, user, "&7Bye."),
        ChatLine::Unknown(name) => {
            // The command name is user text; keep it out of the translation.
            let prefix = coordinator.config().color_code_char;
            let text = format!(
                "{}{name}. Try /nick, /feedback, /who or /quit.",
                colored(prefix, "&cUnknown command /")
            );
            coordinator.send_message(user, &text);
        }
        ChatLine::Say(text) => match host.nick(user) {
            Some(nick) => host.broadcast(user, &format!("<{nick}> {}", strip_codes(text))),
            None => notify(coordinator, user, "&cChoose a nickname first."),
        },
    }
}

/// A connection closed.
pub fn leave(state: &ChatState, user: UserId) {
    state.host.disconnect_event(user);
    if let Some(nick) = state.host.remove(user) {
        state.host.broadcast(user, &format!("* {nick} left"));
    }
    info!(user = %user, "client disconnected");
}
