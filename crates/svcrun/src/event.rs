//! Inbound events and the source they are read from.

use svcrpc::PeerId;

/// Something that happened on the network, addressed to one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Message { from: PeerId, payload: Vec<u8> },
    /// The transport gave up on `PeerId`.
    PeerLost(PeerId),
}

/// The receive half of a transport.
#[async_trait::async_trait]
pub trait Inbox: Send + Sync {
    /// Waits for the next event. `None` once the inbox is closed and drained.
    async fn recv(&self) -> Option<Event>;

    /// The next event if one is already queued.
    fn try_recv(&self) -> Option<Event>;
}
