//! Stock observability middleware.
//!
//! Mirrors what most deployments want out of the box: connection and message
//! logging on the pre lane, plus an optional structured dump of every event
//! for debugging. Which pieces are installed is decided by an explicit
//! [`BusDefaults`] value passed by the caller; there is no global
//! configuration state.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use floe_core::bus::EventBus;
use floe_core::event::{Event, EventKind, MESSAGE_KINDS};
use floe_core::middleware::Middleware;

/// Tag carried by every middleware installed by [`install_defaults`], so an
/// embedder can remove them all with
/// [`EventBus::remove_by_tag`].
pub const DEFAULTS_TAG: &str = "floe-defaults";

/// Which stock middleware to install.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusDefaults {
    /// Log client connect and disconnect events.
    pub log_connections: bool,
    /// Log incoming messages with sender and plain text.
    pub log_messages: bool,
    /// Dump every event as JSON at debug level.
    pub debug_events: bool,
}

impl Default for BusDefaults {
    fn default() -> Self {
        Self {
            log_connections: true,
            log_messages: true,
            debug_events: false,
        }
    }
}

/// Installs the selected stock middleware on the bus's pre lane.
pub fn install_defaults(bus: &EventBus, defaults: &BusDefaults) {
    if defaults.log_connections {
        bus.add_pre_middleware(
            Middleware::new()
                .on_kinds([EventKind::Connected, EventKind::Disconnected])
                .tagged([DEFAULTS_TAG])
                .then_fn(|event: Event| async move {
                    match &event {
                        Event::Connected(e) => {
                            info!(client = %e.core.client, version = %e.version, "client connected");
                        }
                        Event::Disconnected(e) => {
                            info!(client = %e.core.client, "client disconnected");
                        }
                        _ => {}
                    }
                    Some(event)
                }),
        );
    }

    if defaults.log_messages {
        bus.add_pre_middleware(
            Middleware::new()
                .on_kinds(MESSAGE_KINDS)
                .tagged([DEFAULTS_TAG])
                .then_fn(|event: Event| async move {
                    if let Some(message) = event.message_core() {
                        info!(
                            kind = %event.kind(),
                            sender = message.sender_id,
                            sender_name = %message.sender_name,
                            group = message.group_id,
                            text = %message.body.plain_text(),
                            "message received"
                        );
                    }
                    Some(event)
                }),
        );
    }

    if defaults.debug_events {
        bus.add_pre_middleware(
            Middleware::new()
                .tagged([DEFAULTS_TAG])
                .then_fn(|event: Event| async move {
                    match serde_json::to_string(&event) {
                        Ok(json) => debug!(kind = %event.kind(), %json, "event"),
                        Err(err) => debug!(kind = %event.kind(), %err, "event not serializable"),
                    }
                    Some(event)
                }),
        );
    }
}
