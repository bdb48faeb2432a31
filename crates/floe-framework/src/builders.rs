//! Responder builder shorthands for common patterns.
//!
//! Each function starts a [`Responder`] on the given bus with the kind
//! filter (and, where applicable, the guard rule) already in place:
//!
//! ```rust,ignore
//! on_start_with(&bus, ["/ping"])
//!     .handle(|event: GroupMessageEvent| async move {
//!         // ...
//!     })
//!     .register();
//! ```

use floe_core::bus::EventBus;
use floe_core::event::{EventKind, MESSAGE_KINDS};

use crate::responder::Responder;
use crate::rule;

/// A responder over the given kinds.
pub fn on_kinds<I>(bus: &EventBus, kinds: I) -> Responder
where
    I: IntoIterator<Item = EventKind>,
{
    Responder::new(bus).on_kinds(kinds)
}

/// A responder over all three message kinds.
pub fn on_message(bus: &EventBus) -> Responder {
    on_kinds(bus, MESSAGE_KINDS)
}

/// A group-message responder for messages addressing the bot. The mention
/// is stripped before handlers run.
pub fn on_message_to_me(bus: &EventBus) -> Responder {
    on_kinds(bus, [EventKind::GroupMessage]).rule(rule::to_me(true))
}

/// A group-message responder for messages mentioning any of the given users.
pub fn on_message_to<I>(bus: &EventBus, targets: I) -> Responder
where
    I: IntoIterator<Item = u64>,
{
    on_kinds(bus, [EventKind::GroupMessage]).rule(rule::addressed_to(targets))
}

/// A group-message responder gated on a text prefix.
pub fn on_start_with<I, S>(bus: &EventBus, prefixes: I) -> Responder
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    on_kinds(bus, [EventKind::GroupMessage]).rule(rule::starts_with(prefixes))
}

/// A group-message responder gated on a text suffix.
pub fn on_end_with<I, S>(bus: &EventBus, suffixes: I) -> Responder
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    on_kinds(bus, [EventKind::GroupMessage]).rule(rule::ends_with(suffixes))
}

/// A group-message responder gated on exact text.
pub fn on_full_match<I, S>(bus: &EventBus, candidates: I) -> Responder
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    on_kinds(bus, [EventKind::GroupMessage]).rule(rule::full_match(candidates))
}

/// A group-message responder gated on any of the given keywords.
pub fn on_keyword<I, S>(bus: &EventBus, words: I) -> Responder
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    on_kinds(bus, [EventKind::GroupMessage]).rule(rule::keyword(words))
}

/// A group-message responder gated on all of the given keywords.
pub fn on_all_keywords<I, S>(bus: &EventBus, words: I) -> Responder
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    on_kinds(bus, [EventKind::GroupMessage]).rule(rule::all_keywords(words))
}

/// A responder over the four task lifecycle kinds.
pub fn on_task_events(bus: &EventBus) -> Responder {
    on_kinds(bus, floe_core::event::TASK_KINDS)
}
