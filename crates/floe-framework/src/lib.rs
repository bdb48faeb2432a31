//! # Floe Framework
//!
//! High-level responder surface for the Floe bot framework.
//!
//! This layer sits on top of [`floe_core`]'s event bus and provides:
//! - The [`Responder`] builder binding typed async handlers to bus lanes
//! - Composable [`Rule`] predicates with the common text and addressing
//!   rules built in
//! - Shorthand constructors for the usual patterns (`on_message`,
//!   `on_start_with`, ...)
//! - Stock logging middleware behind an explicit [`BusDefaults`] value
//!
//! ## Example
//!
//! ```rust,ignore
//! use floe_core::{EventBus, GroupMessageEvent};
//! use floe_framework::{install_defaults, on_message_to_me, BusDefaults};
//!
//! let bus = EventBus::new();
//! install_defaults(&bus, &BusDefaults::default());
//!
//! on_message_to_me(&bus)
//!     .handle(|event: GroupMessageEvent| async move {
//!         // the mention is already stripped here
//!         println!("{}", event.message.body);
//!     })
//!     .register();
//! ```

pub mod builders;
pub mod defaults;
pub mod responder;
pub mod rule;

pub use builders::{
    on_all_keywords, on_end_with, on_full_match, on_keyword, on_kinds, on_message,
    on_message_to, on_message_to_me, on_start_with, on_task_events,
};
pub use defaults::{install_defaults, BusDefaults, DEFAULTS_TAG};
pub use responder::{Responder, ResponderHandle, ResponderHandler};
pub use rule::Rule;

/// Prelude for common imports.
pub mod prelude {
    pub use super::builders::*;
    pub use super::defaults::{install_defaults, BusDefaults};
    pub use super::responder::{Responder, ResponderHandle};
    pub use super::rule::{self, Rule};
    pub use floe_core::prelude::*;
}
