//! Composable predicates over events.
//!
//! A [`Rule`] guards a responder's handlers: every rule must pass, in
//! registration order, before the typed handler runs. Rules receive the
//! event mutably so that addressing rules can normalize the message (for
//! example stripping the mention that addressed the bot) for the handlers
//! behind them.
//!
//! The builtin rules all target group messages; on any other event shape
//! they are simply false.

use std::sync::Arc;

use tracing::warn;

use floe_core::event::{Event, GroupMessageEvent};
use floe_core::view::EventView;

/// A predicate over an event, cheap to clone.
#[derive(Clone)]
pub struct Rule {
    check: Arc<dyn Fn(&mut Event) -> bool + Send + Sync>,
}

impl Rule {
    /// Wraps a predicate over the whole event union.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&mut Event) -> bool + Send + Sync + 'static,
    {
        Self { check: Arc::new(f) }
    }

    /// Adapts a predicate over a typed view. Events whose kind does not
    /// admit the view fail the rule. When the predicate passes, changes it
    /// made to the view are written back into the event.
    pub fn for_view<V, F>(f: F) -> Self
    where
        V: EventView,
        F: Fn(&mut V) -> bool + Send + Sync + 'static,
    {
        Self::new(move |event| match V::extract(event) {
            Some(mut view) => {
                if f(&mut view) {
                    view.merge(event);
                    true
                } else {
                    false
                }
            }
            None => false,
        })
    }

    /// A rule that never passes.
    pub fn never() -> Self {
        Self::new(|_| false)
    }

    /// Evaluates the rule.
    pub fn check(&self, event: &mut Event) -> bool {
        (self.check)(event)
    }
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Rule")
    }
}

/// Passes when the group message mentions the receiving account.
///
/// With `strip` set, the mention segment (and the single space conventionally
/// following it) is removed before later rules and handlers see the body, so
/// text rules behind this one match the bare command.
pub fn to_me(strip: bool) -> Rule {
    Rule::for_view::<GroupMessageEvent, _>(move |event| {
        let self_id = event.message.core.self_id;
        if !event.message.body.mentions(self_id) {
            return false;
        }
        if strip {
            event.message.body.remove_mention(self_id);
        }
        true
    })
}

/// Passes when the group message mentions any of the given users.
pub fn addressed_to<I>(targets: I) -> Rule
where
    I: IntoIterator<Item = u64>,
{
    let targets: Vec<u64> = targets.into_iter().collect();
    if targets.is_empty() {
        warn!("addressed_to built with no targets, rule never matches");
        return Rule::never();
    }
    Rule::for_view::<GroupMessageEvent, _>(move |event| {
        targets.iter().any(|t| event.message.body.mentions(*t))
    })
}

fn single_text_rule<F>(check: F) -> Rule
where
    F: Fn(&str) -> bool + Send + Sync + 'static,
{
    Rule::for_view::<GroupMessageEvent, _>(move |event| {
        event.message.body.single_text().is_some_and(&check)
    })
}

fn collect_candidates<I, S>(candidates: I, rule_name: &str) -> Option<Vec<String>>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let candidates: Vec<String> = candidates.into_iter().map(Into::into).collect();
    if candidates.is_empty() {
        warn!(rule = rule_name, "rule built with no candidates, never matches");
        None
    } else {
        Some(candidates)
    }
}

/// Passes when the message is a single text segment starting with any of
/// the given prefixes. Plain prefix comparison: `"/help"` matches both
/// `/help` and `/help me`, while `help` matches neither.
pub fn starts_with<I, S>(prefixes: I) -> Rule
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    match collect_candidates(prefixes, "starts_with") {
        Some(prefixes) => {
            single_text_rule(move |text| prefixes.iter().any(|p| text.starts_with(p.as_str())))
        }
        None => Rule::never(),
    }
}

/// Passes when the message is a single text segment ending with any of the
/// given suffixes.
pub fn ends_with<I, S>(suffixes: I) -> Rule
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    match collect_candidates(suffixes, "ends_with") {
        Some(suffixes) => {
            single_text_rule(move |text| suffixes.iter().any(|s| text.ends_with(s.as_str())))
        }
        None => Rule::never(),
    }
}

/// Passes when the message is a single text segment equal to any of the
/// given candidates.
pub fn full_match<I, S>(candidates: I) -> Rule
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    match collect_candidates(candidates, "full_match") {
        Some(candidates) => {
            single_text_rule(move |text| candidates.iter().any(|c| text == c.as_str()))
        }
        None => Rule::never(),
    }
}

/// Passes when the message's plain text contains any of the given words.
pub fn keyword<I, S>(words: I) -> Rule
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    match collect_candidates(words, "keyword") {
        Some(words) => Rule::for_view::<GroupMessageEvent, _>(move |event| {
            let text = event.message.body.plain_text();
            words.iter().any(|w| text.contains(w.as_str()))
        }),
        None => Rule::never(),
    }
}

/// Passes when the message's plain text contains every one of the given
/// words.
pub fn all_keywords<I, S>(words: I) -> Rule
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    match collect_candidates(words, "all_keywords") {
        Some(words) => Rule::for_view::<GroupMessageEvent, _>(move |event| {
            let text = event.message.body.plain_text();
            words.iter().all(|w| text.contains(w.as_str()))
        }),
        None => Rule::never(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use floe_core::client::ClientId;
    use floe_core::event::{EventCore, MessageCore, PrivateMessageEvent};
    use floe_core::message::{MessageBody, Segment};

    const SELF_ID: u64 = 1000;

    fn group_message(body: MessageBody) -> Event {
        Event::GroupMessage(GroupMessageEvent {
            message: MessageCore {
                core: EventCore::new(ClientId::nil(), SELF_ID),
                message_id: 1,
                sender_id: 2,
                sender_name: "s".into(),
                sender_is_friend: false,
                group_id: 3,
                group_name: "g".into(),
                body,
            },
        })
    }

    fn text_message(text: &str) -> Event {
        group_message(MessageBody::from(text))
    }

    #[test]
    fn to_me_strips_mention_and_one_space() {
        let body = MessageBody::from(vec![
            Segment::mention(SELF_ID, "@bot"),
            Segment::text(" hello"),
        ]);
        let mut event = group_message(body);

        assert!(to_me(true).check(&mut event));
        assert_eq!(
            event.message_core().expect("message").body.plain_text(),
            "hello"
        );
    }

    #[test]
    fn to_me_without_strip_leaves_body_intact() {
        let body = MessageBody::from(vec![
            Segment::mention(SELF_ID, "@bot"),
            Segment::text(" hello"),
        ]);
        let mut event = group_message(body.clone());

        assert!(to_me(false).check(&mut event));
        assert_eq!(event.message_core().expect("message").body, body);
    }

    #[test]
    fn to_me_fails_when_someone_else_is_mentioned() {
        let body = MessageBody::from(vec![
            Segment::mention(2222, "@other"),
            Segment::text(" hello"),
        ]);
        let mut event = group_message(body.clone());

        assert!(!to_me(true).check(&mut event));
        assert_eq!(event.message_core().expect("message").body, body);
    }

    #[test]
    fn starts_with_is_a_plain_prefix() {
        let rule = starts_with(["/help"]);
        assert!(rule.check(&mut text_message("/help")));
        assert!(rule.check(&mut text_message("/help me")));
        assert!(!rule.check(&mut text_message("help")));
        assert!(!rule.check(&mut text_message(" /help")));
    }

    #[test]
    fn single_text_rules_reject_mixed_bodies() {
        let body = MessageBody::from(vec![
            Segment::text("/help"),
            Segment::mention(5, "@x"),
        ]);
        assert!(!starts_with(["/help"]).check(&mut group_message(body)));
    }

    #[test]
    fn full_match_and_ends_with() {
        assert!(full_match(["ping", "pong"]).check(&mut text_message("pong")));
        assert!(!full_match(["ping"]).check(&mut text_message("ping!")));
        assert!(ends_with(["?"]).check(&mut text_message("anyone here?")));
    }

    #[test]
    fn keyword_rules() {
        assert!(keyword(["deploy", "release"]).check(&mut text_message("release now")));
        assert!(!keyword(["deploy"]).check(&mut text_message("hold on")));
        assert!(
            all_keywords(["deploy", "prod"]).check(&mut text_message("deploy to prod"))
        );
        assert!(!all_keywords(["deploy", "prod"]).check(&mut text_message("deploy it")));
    }

    #[test]
    fn empty_candidate_lists_never_match() {
        let none: [&str; 0] = [];
        assert!(!starts_with(none).check(&mut text_message("/help")));
        assert!(!addressed_to([]).check(&mut text_message("hi")));
    }

    #[test]
    fn builtins_are_false_on_other_shapes() {
        let mut event = Event::PrivateMessage(PrivateMessageEvent {
            message: MessageCore {
                core: EventCore::new(ClientId::nil(), SELF_ID),
                message_id: 1,
                sender_id: 2,
                sender_name: "s".into(),
                sender_is_friend: true,
                group_id: 2,
                group_name: "s".into(),
                body: MessageBody::from("/help"),
            },
            target_id: SELF_ID,
        });
        assert!(!starts_with(["/help"]).check(&mut event));
        assert!(!to_me(true).check(&mut event));
    }
}
