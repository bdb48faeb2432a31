//! Typed projections over [`Event`].
//!
//! An [`EventView`] is a value a typed handler can receive instead of the
//! whole union: either a concrete variant payload, one of the shared bases,
//! or the union itself. Acceptance is decided per [`EventKind`] at
//! registration time, so dispatch is a tag comparison rather than any kind of
//! runtime type inspection, and unsupported pairings are unrepresentable.
//!
//! `extract` clones the projected data out of the event; `merge` writes a
//! (possibly modified) projection back, returning false when the event's
//! variant does not admit the view. Merging never changes the event's kind,
//! except for the [`Event`] impl itself, which replaces the whole value.

use crate::event::{
    ConnectedEvent, CustomEvent, DisconnectedEvent, Event, EventCore, EventKind,
    FriendAddedEvent, FriendRecallEvent, FriendRequestEvent, GroupInviteEvent,
    GroupMemberJoinedEvent, GroupMemberLeftEvent, GroupMessageEvent, GroupMuteEvent,
    GroupNameUpdatedEvent, GroupRecallEvent, MessageCore, PrivateMessageEvent,
    TaskEvent, TempMessageEvent, MESSAGE_KINDS, TASK_KINDS,
};

/// A typed slice of an [`Event`] that handlers can consume or transform.
pub trait EventView: Sized + Send + 'static {
    /// Whether events of this kind admit the view.
    fn accepts(kind: EventKind) -> bool;

    /// Clones the view out of the event; `None` when the kind is not accepted.
    fn extract(event: &Event) -> Option<Self>;

    /// Writes the view back into the event. Returns false (leaving the event
    /// untouched) when the kind is not accepted.
    fn merge(self, event: &mut Event) -> bool;
}

macro_rules! impl_event_view {
    ($ty:ty => $variant:ident) => {
        impl EventView for $ty {
            fn accepts(kind: EventKind) -> bool {
                kind == EventKind::$variant
            }

            fn extract(event: &Event) -> Option<Self> {
                match event {
                    Event::$variant(payload) => Some(payload.clone()),
                    _ => None,
                }
            }

            fn merge(self, event: &mut Event) -> bool {
                match event {
                    Event::$variant(slot) => {
                        *slot = self;
                        true
                    }
                    _ => false,
                }
            }
        }
    };
}

impl_event_view!(ConnectedEvent => Connected);
impl_event_view!(DisconnectedEvent => Disconnected);
impl_event_view!(PrivateMessageEvent => PrivateMessage);
impl_event_view!(GroupMessageEvent => GroupMessage);
impl_event_view!(TempMessageEvent => TempMessage);
impl_event_view!(FriendRequestEvent => FriendRequest);
impl_event_view!(FriendAddedEvent => FriendAdded);
impl_event_view!(FriendRecallEvent => FriendRecall);
impl_event_view!(GroupMuteEvent => GroupMute);
impl_event_view!(GroupRecallEvent => GroupRecall);
impl_event_view!(GroupNameUpdatedEvent => GroupNameUpdated);
impl_event_view!(GroupMemberJoinedEvent => GroupMemberJoined);
impl_event_view!(GroupMemberLeftEvent => GroupMemberLeft);
impl_event_view!(GroupInviteEvent => GroupInvite);
impl_event_view!(CustomEvent => Custom);

/// Base view shared by the three message-like kinds.
impl EventView for MessageCore {
    fn accepts(kind: EventKind) -> bool {
        MESSAGE_KINDS.contains(&kind)
    }

    fn extract(event: &Event) -> Option<Self> {
        event.message_core().cloned()
    }

    fn merge(self, event: &mut Event) -> bool {
        match event.message_core_mut() {
            Some(slot) => {
                *slot = self;
                true
            }
            None => false,
        }
    }
}

/// Base view shared by every kind.
impl EventView for EventCore {
    fn accepts(_kind: EventKind) -> bool {
        true
    }

    fn extract(event: &Event) -> Option<Self> {
        Some(event.core().clone())
    }

    fn merge(self, event: &mut Event) -> bool {
        *event.core_mut() = self;
        true
    }
}

/// Shared view over the four task lifecycle kinds. Merging keeps the
/// lifecycle variant of the target event.
impl EventView for TaskEvent {
    fn accepts(kind: EventKind) -> bool {
        TASK_KINDS.contains(&kind)
    }

    fn extract(event: &Event) -> Option<Self> {
        match event {
            Event::TaskRegistered(e)
            | Event::TaskSucceeded(e)
            | Event::TaskFailed(e)
            | Event::TaskStopped(e) => Some(e.clone()),
            _ => None,
        }
    }

    fn merge(self, event: &mut Event) -> bool {
        match event {
            Event::TaskRegistered(slot)
            | Event::TaskSucceeded(slot)
            | Event::TaskFailed(slot)
            | Event::TaskStopped(slot) => {
                *slot = self;
                true
            }
            _ => false,
        }
    }
}

/// The identity view: handlers that want the whole union.
impl EventView for Event {
    fn accepts(_kind: EventKind) -> bool {
        true
    }

    fn extract(event: &Event) -> Option<Self> {
        Some(event.clone())
    }

    fn merge(self, event: &mut Event) -> bool {
        *event = self;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientId;
    use crate::event::{TaskDescriptor, TaskStatus};
    use crate::message::MessageBody;
    use uuid::Uuid;

    fn group_message(text: &str) -> Event {
        Event::GroupMessage(GroupMessageEvent {
            message: MessageCore {
                core: EventCore::new(ClientId::nil(), 1000),
                message_id: 7,
                sender_id: 8,
                sender_name: "s".into(),
                sender_is_friend: false,
                group_id: 9,
                group_name: "g".into(),
                body: MessageBody::from(text),
            },
        })
    }

    #[test]
    fn concrete_view_roundtrip() {
        let mut event = group_message("hi");
        let mut view = GroupMessageEvent::extract(&event).expect("accepted kind");
        view.message.body.push_text(" there");
        assert!(view.merge(&mut event));
        assert_eq!(
            event.message_core().expect("message kind").body.plain_text(),
            "hi there"
        );
    }

    #[test]
    fn concrete_view_rejects_other_kinds() {
        let event = group_message("hi");
        assert!(PrivateMessageEvent::extract(&event).is_none());
        assert!(!PrivateMessageEvent::accepts(event.kind()));
    }

    #[test]
    fn base_view_spans_message_kinds() {
        for kind in MESSAGE_KINDS {
            assert!(MessageCore::accepts(kind));
        }
        assert!(!MessageCore::accepts(EventKind::Connected));

        let mut event = group_message("abc");
        let mut core = MessageCore::extract(&event).expect("accepted kind");
        core.sender_name = "renamed".into();
        assert!(core.merge(&mut event));
        assert_eq!(
            event.message_core().expect("message kind").sender_name,
            "renamed"
        );
    }

    #[test]
    fn task_merge_preserves_variant() {
        let task = TaskDescriptor {
            id: Uuid::new_v4(),
            name: "sync".into(),
            status: TaskStatus::Running,
        };
        let mut event =
            Event::task_lifecycle(EventKind::TaskFailed, task).expect("task kind");

        let mut view = TaskEvent::extract(&event).expect("accepted kind");
        view.task.status = TaskStatus::Stopped;
        assert!(view.merge(&mut event));

        assert_eq!(event.kind(), EventKind::TaskFailed);
        assert_eq!(
            event.task().expect("task kind").status,
            TaskStatus::Stopped
        );
    }

    #[test]
    fn identity_view_replaces_whole_event() {
        let mut event = group_message("a");
        let replacement = group_message("b");
        assert!(replacement.clone().merge(&mut event));
        assert_eq!(
            event.message_core().expect("message kind").body.plain_text(),
            "b"
        );
    }
}
