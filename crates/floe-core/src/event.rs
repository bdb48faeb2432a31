//! The event model.
//!
//! Every protocol notification and synthetic trigger is normalized into an
//! [`Event`], a closed tagged union. Each variant carries the shared
//! [`EventCore`] base (identity, tags, timestamp, origin client); the three
//! message-like variants additionally share a [`MessageCore`] base with the
//! sender, target and message body.
//!
//! Events are plain data: `Clone` produces a value-independent deep copy,
//! which is what the bus hands to each detached worker so that concurrent
//! phases can mutate their copy without interference.
//!
//! Routing is done over [`EventKind`], a flat classification with a stable
//! human-readable label per kind. Middleware filters store kinds; the typed
//! handler binder stores a kind-acceptance check plus a projection instead of
//! inspecting type names at dispatch time.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::client::ClientId;
use crate::message::MessageBody;

// ============================================================================
// Event Kind
// ============================================================================

/// Flat classification of every event variant.
///
/// Used as the routing key in middleware filters and as the acceptance tag
/// of typed handler projections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A client finished connecting.
    Connected,
    /// A client lost its connection.
    Disconnected,
    /// Direct message from a friend.
    PrivateMessage,
    /// Message in a group.
    GroupMessage,
    /// Temporary session message routed through a group.
    TempMessage,
    /// Incoming friend request.
    FriendRequest,
    /// A friend relation was established.
    FriendAdded,
    /// A friend recalled a message.
    FriendRecall,
    /// A group member was muted (or the whole group).
    GroupMute,
    /// A group message was recalled.
    GroupRecall,
    /// The group name changed.
    GroupNameUpdated,
    /// A member joined a group.
    GroupMemberJoined,
    /// A member left a group or was kicked.
    GroupMemberLeft,
    /// The client was invited into a group.
    GroupInvite,
    /// A scheduled task was registered with the runner.
    TaskRegistered,
    /// A scheduled task run completed successfully.
    TaskSucceeded,
    /// A scheduled task run returned an error.
    TaskFailed,
    /// A scheduled task was stopped.
    TaskStopped,
    /// Application-defined event.
    Custom,
}

/// The three message-like kinds, in the order producers emit them.
pub const MESSAGE_KINDS: [EventKind; 3] = [
    EventKind::PrivateMessage,
    EventKind::GroupMessage,
    EventKind::TempMessage,
];

/// The four task lifecycle kinds.
pub const TASK_KINDS: [EventKind; 4] = [
    EventKind::TaskRegistered,
    EventKind::TaskSucceeded,
    EventKind::TaskFailed,
    EventKind::TaskStopped,
];

impl EventKind {
    /// Stable human-readable label; injective over all kinds.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Connected => "connected",
            EventKind::Disconnected => "disconnected",
            EventKind::PrivateMessage => "private_message",
            EventKind::GroupMessage => "group_message",
            EventKind::TempMessage => "temp_message",
            EventKind::FriendRequest => "friend_request",
            EventKind::FriendAdded => "friend_added",
            EventKind::FriendRecall => "friend_recall",
            EventKind::GroupMute => "group_mute",
            EventKind::GroupRecall => "group_recall",
            EventKind::GroupNameUpdated => "group_name_updated",
            EventKind::GroupMemberJoined => "group_member_joined",
            EventKind::GroupMemberLeft => "group_member_left",
            EventKind::GroupInvite => "group_invite",
            EventKind::TaskRegistered => "task_registered",
            EventKind::TaskSucceeded => "task_succeeded",
            EventKind::TaskFailed => "task_failed",
            EventKind::TaskStopped => "task_stopped",
            EventKind::Custom => "custom",
        }
    }

    /// Returns true for the three message-like kinds.
    pub fn is_message(&self) -> bool {
        MESSAGE_KINDS.contains(self)
    }

    /// Every kind, for registry-style iteration.
    pub fn all() -> &'static [EventKind] {
        &[
            EventKind::Connected,
            EventKind::Disconnected,
            EventKind::PrivateMessage,
            EventKind::GroupMessage,
            EventKind::TempMessage,
            EventKind::FriendRequest,
            EventKind::FriendAdded,
            EventKind::FriendRecall,
            EventKind::GroupMute,
            EventKind::GroupRecall,
            EventKind::GroupNameUpdated,
            EventKind::GroupMemberJoined,
            EventKind::GroupMemberLeft,
            EventKind::GroupInvite,
            EventKind::TaskRegistered,
            EventKind::TaskSucceeded,
            EventKind::TaskFailed,
            EventKind::TaskStopped,
            EventKind::Custom,
        ]
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Shared bases
// ============================================================================

/// The base record present in every event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventCore {
    /// Unique per publish.
    pub event_id: Uuid,
    /// Free-form labels set by the producer.
    pub tags: Vec<String>,
    /// Unix timestamp (seconds) of the underlying notification.
    pub time: u64,
    /// Identifier of the client that produced the event. Handlers resolve
    /// the live client through a [`ClientRegistry`](crate::client::ClientRegistry);
    /// the event itself never owns the client.
    pub client: ClientId,
    /// The receiving client's own user id, used by addressing rules.
    pub self_id: u64,
}

impl EventCore {
    /// Creates a core with a fresh event id and the current time.
    pub fn new(client: ClientId, self_id: u64) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            tags: Vec::new(),
            time: now_unix(),
            client,
            self_id,
        }
    }

    /// Adds producer tags.
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }
}

fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// The shared base of the three message-like variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageCore {
    /// Event base.
    pub core: EventCore,
    /// Protocol message id.
    pub message_id: u64,
    /// Sender user id.
    pub sender_id: u64,
    /// Sender display name.
    pub sender_name: String,
    /// Whether the sender is a friend of the receiving client.
    pub sender_is_friend: bool,
    /// Group id; for private messages, the peer's user id.
    pub group_id: u64,
    /// Group name; for private messages, the peer's display name.
    pub group_name: String,
    /// The message content.
    pub body: MessageBody,
}

// ============================================================================
// Concrete variants
// ============================================================================

/// Payload of [`EventKind::Connected`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectedEvent {
    /// Event base.
    pub core: EventCore,
    /// Protocol/client version string.
    pub version: String,
}

/// Payload of [`EventKind::Disconnected`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisconnectedEvent {
    /// Event base.
    pub core: EventCore,
}

/// Payload of [`EventKind::PrivateMessage`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrivateMessageEvent {
    /// Message base.
    pub message: MessageCore,
    /// User id the message was addressed to.
    pub target_id: u64,
}

/// Payload of [`EventKind::GroupMessage`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupMessageEvent {
    /// Message base.
    pub message: MessageCore,
}

/// Payload of [`EventKind::TempMessage`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TempMessageEvent {
    /// Message base.
    pub message: MessageCore,
}

/// Payload of [`EventKind::FriendRequest`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FriendRequestEvent {
    /// Event base.
    pub core: EventCore,
    /// Requesting user id.
    pub user_id: u64,
    /// Requesting user's nickname.
    pub nickname: String,
    /// Verification message attached to the request.
    pub text: String,
    /// Where the request came from (search, group card, ...).
    pub source: String,
}

/// Payload of [`EventKind::FriendAdded`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FriendAddedEvent {
    /// Event base.
    pub core: EventCore,
    /// New friend's user id.
    pub user_id: u64,
    /// New friend's nickname.
    pub nickname: String,
    /// Greeting message, if any.
    pub text: String,
}

/// Payload of [`EventKind::FriendRecall`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FriendRecallEvent {
    /// Event base.
    pub core: EventCore,
    /// User who recalled the message.
    pub user_id: u64,
    /// Sequence number of the recalled message.
    pub sequence: u64,
}

/// Payload of [`EventKind::GroupMute`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupMuteEvent {
    /// Event base.
    pub core: EventCore,
    /// Group the mute happened in.
    pub group_id: u64,
    /// Operator who issued the mute.
    pub operator_id: u64,
    /// Muted user; zero when the whole group was muted.
    pub target_id: u64,
    /// Mute duration in seconds; zero lifts the mute.
    pub duration_secs: u32,
    /// True when the whole group was muted.
    pub mute_all: bool,
}

/// Payload of [`EventKind::GroupRecall`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupRecallEvent {
    /// Event base.
    pub core: EventCore,
    /// Group the recall happened in.
    pub group_id: u64,
    /// Operator who recalled the message.
    pub operator_id: u64,
    /// Original sender of the recalled message.
    pub sender_id: u64,
    /// Sequence number of the recalled message.
    pub sequence: u64,
}

/// Payload of [`EventKind::GroupNameUpdated`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupNameUpdatedEvent {
    /// Event base.
    pub core: EventCore,
    /// Group whose name changed.
    pub group_id: u64,
    /// The new name.
    pub new_name: String,
}

/// Payload of [`EventKind::GroupMemberJoined`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupMemberJoinedEvent {
    /// Event base.
    pub core: EventCore,
    /// Group that was joined.
    pub group_id: u64,
    /// Joining user id.
    pub user_id: u64,
    /// Inviter user id, zero when none.
    pub inviter_id: u64,
    /// True when the receiving client itself joined.
    pub is_self: bool,
}

/// Payload of [`EventKind::GroupMemberLeft`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupMemberLeftEvent {
    /// Event base.
    pub core: EventCore,
    /// Group that was left.
    pub group_id: u64,
    /// Leaving user id.
    pub user_id: u64,
    /// True when the receiving client itself left.
    pub is_self: bool,
    /// True when the member was kicked rather than leaving voluntarily.
    pub is_kicked: bool,
}

/// Payload of [`EventKind::GroupInvite`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupInviteEvent {
    /// Event base.
    pub core: EventCore,
    /// Group the client was invited into.
    pub group_id: u64,
    /// Group display name.
    pub group_name: String,
    /// Inviting user id.
    pub inviter_id: u64,
}

/// Lifecycle state of a scheduled task, as reported by the task runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Registered but not yet run.
    Pending,
    /// Currently executing.
    Running,
    /// Last run returned an error.
    Failed,
    /// Removed from the runner.
    Stopped,
}

/// Snapshot of a scheduled task's descriptor, carried by task events.
///
/// This is a value copy, not a handle into the runner; the runner remains an
/// external collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDescriptor {
    /// Task id assigned by the runner.
    pub id: Uuid,
    /// Human-readable task name.
    pub name: String,
    /// Status at the time the event was emitted.
    pub status: TaskStatus,
}

/// Shared payload of the four task lifecycle kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskEvent {
    /// Event base. Task events have no originating client; producers use
    /// [`ClientId::nil`](crate::client::ClientId::nil).
    pub core: EventCore,
    /// Descriptor of the task the notification is about.
    pub task: TaskDescriptor,
}

/// Payload of [`EventKind::Custom`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomEvent {
    /// Event base.
    pub core: EventCore,
    /// Application-chosen event name.
    pub name: String,
    /// Free-form payload.
    pub payload: serde_json::Value,
}

// ============================================================================
// The Event union
// ============================================================================

/// A single normalized event flowing through the bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    /// See [`ConnectedEvent`].
    Connected(ConnectedEvent),
    /// See [`DisconnectedEvent`].
    Disconnected(DisconnectedEvent),
    /// See [`PrivateMessageEvent`].
    PrivateMessage(PrivateMessageEvent),
    /// See [`GroupMessageEvent`].
    GroupMessage(GroupMessageEvent),
    /// See [`TempMessageEvent`].
    TempMessage(TempMessageEvent),
    /// See [`FriendRequestEvent`].
    FriendRequest(FriendRequestEvent),
    /// See [`FriendAddedEvent`].
    FriendAdded(FriendAddedEvent),
    /// See [`FriendRecallEvent`].
    FriendRecall(FriendRecallEvent),
    /// See [`GroupMuteEvent`].
    GroupMute(GroupMuteEvent),
    /// See [`GroupRecallEvent`].
    GroupRecall(GroupRecallEvent),
    /// See [`GroupNameUpdatedEvent`].
    GroupNameUpdated(GroupNameUpdatedEvent),
    /// See [`GroupMemberJoinedEvent`].
    GroupMemberJoined(GroupMemberJoinedEvent),
    /// See [`GroupMemberLeftEvent`].
    GroupMemberLeft(GroupMemberLeftEvent),
    /// See [`GroupInviteEvent`].
    GroupInvite(GroupInviteEvent),
    /// See [`TaskEvent`].
    TaskRegistered(TaskEvent),
    /// See [`TaskEvent`].
    TaskSucceeded(TaskEvent),
    /// See [`TaskEvent`].
    TaskFailed(TaskEvent),
    /// See [`TaskEvent`].
    TaskStopped(TaskEvent),
    /// See [`CustomEvent`].
    Custom(CustomEvent),
}

impl Event {
    /// Returns the kind tag of this event.
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Connected(_) => EventKind::Connected,
            Event::Disconnected(_) => EventKind::Disconnected,
            Event::PrivateMessage(_) => EventKind::PrivateMessage,
            Event::GroupMessage(_) => EventKind::GroupMessage,
            Event::TempMessage(_) => EventKind::TempMessage,
            Event::FriendRequest(_) => EventKind::FriendRequest,
            Event::FriendAdded(_) => EventKind::FriendAdded,
            Event::FriendRecall(_) => EventKind::FriendRecall,
            Event::GroupMute(_) => EventKind::GroupMute,
            Event::GroupRecall(_) => EventKind::GroupRecall,
            Event::GroupNameUpdated(_) => EventKind::GroupNameUpdated,
            Event::GroupMemberJoined(_) => EventKind::GroupMemberJoined,
            Event::GroupMemberLeft(_) => EventKind::GroupMemberLeft,
            Event::GroupInvite(_) => EventKind::GroupInvite,
            Event::TaskRegistered(_) => EventKind::TaskRegistered,
            Event::TaskSucceeded(_) => EventKind::TaskSucceeded,
            Event::TaskFailed(_) => EventKind::TaskFailed,
            Event::TaskStopped(_) => EventKind::TaskStopped,
            Event::Custom(_) => EventKind::Custom,
        }
    }

    /// Returns the shared event base.
    pub fn core(&self) -> &EventCore {
        match self {
            Event::Connected(e) => &e.core,
            Event::Disconnected(e) => &e.core,
            Event::PrivateMessage(e) => &e.message.core,
            Event::GroupMessage(e) => &e.message.core,
            Event::TempMessage(e) => &e.message.core,
            Event::FriendRequest(e) => &e.core,
            Event::FriendAdded(e) => &e.core,
            Event::FriendRecall(e) => &e.core,
            Event::GroupMute(e) => &e.core,
            Event::GroupRecall(e) => &e.core,
            Event::GroupNameUpdated(e) => &e.core,
            Event::GroupMemberJoined(e) => &e.core,
            Event::GroupMemberLeft(e) => &e.core,
            Event::GroupInvite(e) => &e.core,
            Event::TaskRegistered(e)
            | Event::TaskSucceeded(e)
            | Event::TaskFailed(e)
            | Event::TaskStopped(e) => &e.core,
            Event::Custom(e) => &e.core,
        }
    }

    /// Mutable access to the shared event base.
    pub fn core_mut(&mut self) -> &mut EventCore {
        match self {
            Event::Connected(e) => &mut e.core,
            Event::Disconnected(e) => &mut e.core,
            Event::PrivateMessage(e) => &mut e.message.core,
            Event::GroupMessage(e) => &mut e.message.core,
            Event::TempMessage(e) => &mut e.message.core,
            Event::FriendRequest(e) => &mut e.core,
            Event::FriendAdded(e) => &mut e.core,
            Event::FriendRecall(e) => &mut e.core,
            Event::GroupMute(e) => &mut e.core,
            Event::GroupRecall(e) => &mut e.core,
            Event::GroupNameUpdated(e) => &mut e.core,
            Event::GroupMemberJoined(e) => &mut e.core,
            Event::GroupMemberLeft(e) => &mut e.core,
            Event::GroupInvite(e) => &mut e.core,
            Event::TaskRegistered(e)
            | Event::TaskSucceeded(e)
            | Event::TaskFailed(e)
            | Event::TaskStopped(e) => &mut e.core,
            Event::Custom(e) => &mut e.core,
        }
    }

    /// Returns the shared message base for the three message-like kinds.
    pub fn message_core(&self) -> Option<&MessageCore> {
        match self {
            Event::PrivateMessage(e) => Some(&e.message),
            Event::GroupMessage(e) => Some(&e.message),
            Event::TempMessage(e) => Some(&e.message),
            _ => None,
        }
    }

    /// Mutable access to the shared message base.
    pub fn message_core_mut(&mut self) -> Option<&mut MessageCore> {
        match self {
            Event::PrivateMessage(e) => Some(&mut e.message),
            Event::GroupMessage(e) => Some(&mut e.message),
            Event::TempMessage(e) => Some(&mut e.message),
            _ => None,
        }
    }

    /// Returns the task descriptor for the four task lifecycle kinds.
    pub fn task(&self) -> Option<&TaskDescriptor> {
        match self {
            Event::TaskRegistered(e)
            | Event::TaskSucceeded(e)
            | Event::TaskFailed(e)
            | Event::TaskStopped(e) => Some(&e.task),
            _ => None,
        }
    }

    /// Builds a task lifecycle event for the given status transition.
    ///
    /// Task events have no originating client, so the core is built on the
    /// nil client id; this is the constructor the task-runner collaborator
    /// uses for its registered/succeeded/failed/stopped notifications.
    pub fn task_lifecycle(kind: EventKind, task: TaskDescriptor) -> Option<Event> {
        let payload = TaskEvent {
            core: EventCore::new(ClientId::nil(), 0)
                .with_tags(["task", kind.as_str()]),
            task,
        };
        match kind {
            EventKind::TaskRegistered => Some(Event::TaskRegistered(payload)),
            EventKind::TaskSucceeded => Some(Event::TaskSucceeded(payload)),
            EventKind::TaskFailed => Some(Event::TaskFailed(payload)),
            EventKind::TaskStopped => Some(Event::TaskStopped(payload)),
            _ => None,
        }
    }

    /// Builds a custom event.
    pub fn custom(
        core: EventCore,
        name: impl Into<String>,
        payload: serde_json::Value,
    ) -> Event {
        Event::Custom(CustomEvent {
            core,
            name: name.into(),
            payload,
        })
    }
}
