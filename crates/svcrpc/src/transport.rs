//! # Transport Abstraction
//!
//! The minimal outbound interface the RPC layer needs from the network.
//!
//! ## Philosophy
//!
//! - **Byte-Oriented**: The transport knows nothing about services, slots or
//!   argument types. It moves opaque buffers to a named peer.
//! - **Fire-and-Forget**: `send` returns once the payload is handed over.
//!   Reliability, ordering, retransmission and backpressure are the
//!   transport's business, steered only by the [`Delivery`] hints.
//!
//! Inbound traffic flows the other way: whoever owns the socket calls
//! [`Node::on_message`](crate::Node::on_message) and
//! [`Node::on_peer_lost`](crate::Node::on_peer_lost).

use std::fmt;

use crate::types::PeerId;

/// Errors that occur at the network/transport layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The transport has no route to this peer.
    UnknownPeer(PeerId),
    /// The peer was reachable once but the connection has dropped.
    ConnectionLost(PeerId),
    /// The payload exceeds what the transport can carry in one packet.
    PayloadTooLarge(usize),
    /// Generic I/O error or internal transport failure.
    Io(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownPeer(peer) => write!(f, "Unknown peer: {}", peer),
            Self::ConnectionLost(peer) => write!(f, "Connection lost: {}", peer),
            Self::PayloadTooLarge(n) => write!(f, "Payload of {} bytes too large for transport", n),
            Self::Io(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for TransportError {}

/// How hard the transport should try.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Reliability {
    Unreliable,
    UnreliableSequenced,
    Reliable,
    #[default]
    ReliableOrdered,
    ReliableSequenced,
}

/// Scheduling priority relative to other traffic on the same transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Priority {
    Immediate,
    #[default]
    High,
    Medium,
    Low,
}

/// Delivery hints attached to every outbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Delivery {
    pub reliability: Reliability,
    pub priority: Priority,
    /// Ordering channel; messages on one channel are delivered in order.
    pub channel: u8,
}

/// A mechanism to hand a byte buffer to a peer.
///
/// This trait is designed to be object-safe (`Arc<dyn Transport>`).
///
/// # Invariants
/// - Must not interpret the payload.
/// - Must not call back into the node synchronously; inbound delivery happens
///   from the transport's own receive loop.
pub trait Transport: Send + Sync + 'static {
    fn send(&self, peer: PeerId, payload: Vec<u8>, delivery: Delivery) -> Result<(), TransportError>;
}
