//! # Error Definitions
//!
//! Recoverable failures of the RPC layer. Contract violations (a service
//! claimed by two nodes, a foreign proxy sent by value, an id resolved to the
//! wrong interface) are not represented here: they panic, since no retry can
//! fix a signature mismatch between peers.

use std::fmt;

use crate::transport::TransportError;
use crate::types::OpId;
use crate::types::ServiceId;
use crate::types::SlotId;

/// Operational failures within the RPC mechanism.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The byte codec failed (truncated or malformed payload).
    Codec(svcpack::Error),
    /// The transport refused the outbound message.
    Transport(TransportError),
    /// A connect handshake named a service the peer does not expose.
    ServiceNotFound(String),
    /// An INVOKE targeted a service id this node does not own.
    UnknownService(ServiceId),
    /// The service does not define this operation id.
    UnknownOperation { interface: &'static str, op: OpId },
    /// A message carried an unknown kind byte.
    UnknownKind(u8),
    /// The node behind a proxy or callback has been dropped.
    Detached,
    /// A proxy was used before being attached to a node.
    NotBound,
    /// The slot counter wrapped onto a slot that is still pending.
    SlotInUse(SlotId),
    /// Every service id is taken.
    ServiceIdsExhausted,
    /// A payload was longer than the declared signature.
    TrailingBytes(usize),
}

impl Error {
    /// Misses that are expected under normal churn and only merit a debug log.
    pub fn is_protocol_miss(&self) -> bool {
        matches!(
            self,
            Error::UnknownService(_) | Error::UnknownOperation { .. } | Error::UnknownKind(_)
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Codec(e) => write!(f, "codec error: {}", e),
            Error::Transport(e) => write!(f, "transport error: {}", e),
            Error::ServiceNotFound(name) => write!(f, "service not found: {}", name),
            Error::UnknownService(id) => write!(f, "unknown service id: {}", id),
            Error::UnknownOperation { interface, op } => write!(f, "{} has no operation {}", interface, op),
            Error::UnknownKind(kind) => write!(f, "unknown message kind: {}", kind),
            Error::Detached => write!(f, "node has been dropped"),
            Error::NotBound => write!(f, "service is not attached to a node"),
            Error::SlotInUse(id) => write!(f, "return slot {} is still pending", id),
            Error::ServiceIdsExhausted => write!(f, "no free service ids"),
            Error::TrailingBytes(n) => write!(f, "{} unread bytes after arguments", n),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Codec(e) => Some(e),
            Error::Transport(e) => Some(e),
            _ => None,
        }
    }
}

impl From<svcpack::Error> for Error {
    fn from(e: svcpack::Error) -> Self { Self::Codec(e) }
}

impl From<TransportError> for Error {
    fn from(e: TransportError) -> Self { Self::Transport(e) }
}

/// A specialized Result type for RPC operations.
pub type Result<T> = std::result::Result<T, Error>;
