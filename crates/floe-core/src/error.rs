//! Error types for the client boundary.

use thiserror::Error;

use crate::client::ClientId;

/// Errors surfaced by client send operations and registry lookups.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The client id is not present in the registry, usually because the
    /// client disconnected after the event was produced.
    #[error("client {0} is not registered")]
    NotRegistered(ClientId),

    /// The client exists but its connection is down.
    #[error("client {0} is not connected")]
    NotConnected(ClientId),

    /// The underlying transport rejected the operation.
    #[error("send failed: {0}")]
    SendFailed(String),
}

/// Convenience alias for client operations.
pub type ClientResult<T> = Result<T, ClientError>;
