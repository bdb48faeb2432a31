//! # Floe Core
//!
//! The event engine of the Floe bot framework.
//!
//! This crate provides the normalized event model, the middleware chain
//! abstraction, and the four-phase publish pipeline that everything else in
//! Floe is built on.
//!
//! ## Pipeline
//!
//! Every event published on the [`EventBus`] traverses four middleware lanes:
//!
//! ```text
//!            ┌─────┐    ┌───────┐    ┌──────┐    ┌──────┐
//! publish ──▶│ pre │───▶│ async │───▶│ sync │───▶│ post │
//!            └─────┘    └───────┘    └──────┘    └──────┘
//!            awaited    detached     detached    awaited
//! ```
//!
//! The pre lane may transform or truncate the event; truncation cancels
//! every later lane. The async and sync lanes each run on detached workers
//! over clones of the event, supervised through the bus's fault channel.
//! [`EventBus::settled`] is the quiescent point for the detached lanes.
//!
//! ## Event model
//!
//! [`Event`] is a closed tagged union; routing keys off [`EventKind`], and
//! typed access goes through [`EventView`] projections instead of runtime
//! type inspection.
//!
//! ## Example
//!
//! ```rust,ignore
//! use floe_core::{EventBus, Middleware};
//!
//! #[tokio::main]
//! async fn main() {
//!     let bus = EventBus::new();
//!     bus.add_sync_middleware(Middleware::new().then_fn(|event| async move {
//!         if let Some(message) = event.message_core() {
//!             println!("{}: {}", message.sender_name, message.body);
//!         }
//!         Some(event)
//!     }));
//!
//!     // ... publish events from a protocol client ...
//!     bus.settled().await;
//! }
//! ```

pub mod bus;
pub mod client;
pub mod error;
pub mod event;
pub mod message;
pub mod middleware;
pub mod view;

pub use bus::{EventBus, Phase, PublishOutcome, WorkerFault};
pub use client::{Client, ClientId, ClientRegistry};
pub use error::{ClientError, ClientResult};
pub use event::{
    ConnectedEvent, CustomEvent, DisconnectedEvent, Event, EventCore, EventKind,
    FriendAddedEvent, FriendRecallEvent, FriendRequestEvent, GroupInviteEvent,
    GroupMemberJoinedEvent, GroupMemberLeftEvent, GroupMessageEvent, GroupMuteEvent,
    GroupNameUpdatedEvent, GroupRecallEvent, MessageCore, PrivateMessageEvent,
    TaskDescriptor, TaskEvent, TaskStatus, TempMessageEvent, MESSAGE_KINDS, TASK_KINDS,
};
pub use message::{MessageBody, Segment};
pub use middleware::{handler_fn, EventHandler, Middleware, MiddlewareId};
pub use view::EventView;

/// Prelude for common imports.
pub mod prelude {
    pub use super::bus::{EventBus, Phase, PublishOutcome};
    pub use super::client::{Client, ClientId, ClientRegistry};
    pub use super::event::{Event, EventCore, EventKind, MessageCore};
    pub use super::message::{MessageBody, Segment};
    pub use super::middleware::{handler_fn, Middleware};
    pub use super::view::EventView;
}
