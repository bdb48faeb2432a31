//! The client boundary.
//!
//! Events carry a [`ClientId`], never a client handle. Handlers that need to
//! act on the originating connection resolve it through a [`ClientRegistry`]
//! injected at construction time; a stale id simply fails to resolve instead
//! of dangling.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ClientError, ClientResult};
use crate::message::MessageBody;

/// Opaque identity of a connected client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(Uuid);

impl ClientId {
    /// Allocates a fresh id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// The nil id, used by events with no originating connection.
    pub fn nil() -> Self {
        Self(Uuid::nil())
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A live chat connection.
///
/// Implementations wrap a protocol transport; the bus and framework only ever
/// see this trait object through the registry.
#[async_trait]
pub trait Client: Send + Sync {
    /// The registry identity of this connection.
    fn id(&self) -> ClientId;

    /// The logged-in account's own user id.
    fn self_id(&self) -> u64;

    /// The logged-in account's display name.
    fn nickname(&self) -> String;

    /// Sends a direct message to a user.
    async fn send_private(&self, target: u64, body: MessageBody) -> ClientResult<u64>;

    /// Sends a message into a group.
    async fn send_group(&self, group: u64, body: MessageBody) -> ClientResult<u64>;

    /// Pokes a group member.
    async fn poke(&self, group: u64, target: u64) -> ClientResult<()>;
}

/// Shared map from [`ClientId`] to live connections.
///
/// Cheap to clone; all copies observe the same set of clients.
#[derive(Clone, Default)]
pub struct ClientRegistry {
    inner: Arc<RwLock<HashMap<ClientId, Arc<dyn Client>>>>,
}

impl ClientRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a client, replacing any previous entry under the same id.
    pub fn register(&self, client: Arc<dyn Client>) {
        let id = client.id();
        self.inner.write().insert(id, client);
        tracing::debug!(%id, "client registered");
    }

    /// Removes a client. Returns false when the id was not present.
    pub fn unregister(&self, id: ClientId) -> bool {
        let removed = self.inner.write().remove(&id).is_some();
        if removed {
            tracing::debug!(%id, "client unregistered");
        }
        removed
    }

    /// Looks up a client, failing when the id is stale.
    pub fn resolve(&self, id: ClientId) -> ClientResult<Arc<dyn Client>> {
        self.inner
            .read()
            .get(&id)
            .cloned()
            .ok_or(ClientError::NotRegistered(id))
    }

    /// Number of registered clients.
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// True when no client is registered.
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

impl fmt::Debug for ClientRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientRegistry")
            .field("clients", &self.len())
            .finish()
    }
}
