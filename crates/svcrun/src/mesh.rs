//! # In-Memory Mesh
//!
//! A fully connected network of endpoints inside one process. Each endpoint
//! has an unbounded queue, so delivery is reliable and ordered per sender,
//! which is what the RPC layer expects from a transport.

use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use dashmap::DashMap;
use svcrpc::Delivery;
use svcrpc::PeerId;
use svcrpc::Transport;
use svcrpc::TransportError;
use tokio::sync::Mutex;
use tokio::sync::mpsc;
use tracing::debug;
use tracing::trace;

use crate::error::Error;
use crate::error::Result;
use crate::event::Event;
use crate::event::Inbox;

#[derive(Default)]
struct MeshInner {
    endpoints: DashMap<PeerId, mpsc::UnboundedSender<Event>>,
    next_peer: AtomicU64,
}

/// Handle to an in-memory network. Clones share the same network.
#[derive(Clone, Default)]
pub struct Mesh {
    inner: Arc<MeshInner>,
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an endpoint. Peer ids start at 1.
    pub fn join(&self) -> (PeerId, MeshTransport, MeshInbox) {
        let peer = PeerId(self.inner.next_peer.fetch_add(1, Ordering::Relaxed) + 1);
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.endpoints.insert(peer, tx);
        debug!(peer = %peer, "joined mesh");

        let transport = MeshTransport { mesh: self.clone(), from: peer };
        let inbox = MeshInbox { peer, rx: Mutex::new(rx) };
        (peer, transport, inbox)
    }

    /// Removes `peer` from the network.
    ///
    /// Every remaining endpoint receives [`Event::PeerLost`]. The removed
    /// endpoint's inbox closes once the events already queued are read.
    pub fn disconnect(&self, peer: PeerId) -> Result<()> {
        let (_, tx) = self.inner.endpoints.remove(&peer).ok_or(Error::UnknownPeer(peer))?;
        drop(tx);

        let others: Vec<_> = self.inner.endpoints.iter().map(|e| e.value().clone()).collect();
        for tx in others {
            let _ = tx.send(Event::PeerLost(peer));
        }
        debug!(peer = %peer, "left mesh");
        Ok(())
    }

    pub fn peers(&self) -> Vec<PeerId> {
        let mut peers: Vec<_> = self.inner.endpoints.iter().map(|e| *e.key()).collect();
        peers.sort();
        peers
    }

    fn sender(&self, peer: PeerId) -> Option<mpsc::UnboundedSender<Event>> {
        self.inner.endpoints.get(&peer).map(|e| e.value().clone())
    }
}

/// The send half of one mesh endpoint.
pub struct MeshTransport {
    mesh: Mesh,
    from: PeerId,
}

impl MeshTransport {
    pub fn peer(&self) -> PeerId {
        self.from
    }
}

impl Transport for MeshTransport {
    fn send(&self, peer: PeerId, payload: Vec<u8>, delivery: Delivery) -> std::result::Result<(), TransportError> {
        if self.mesh.sender(self.from).is_none() {
            return Err(TransportError::ConnectionLost(self.from));
        }
        let tx = self.mesh.sender(peer).ok_or(TransportError::UnknownPeer(peer))?;

        trace!(from = %self.from, to = %peer, len = payload.len(), channel = delivery.channel, "mesh send");
        tx.send(Event::Message { from: self.from, payload })
            .map_err(|_| TransportError::ConnectionLost(peer))
    }
}

/// The receive half of one mesh endpoint.
pub struct MeshInbox {
    peer: PeerId,
    rx: Mutex<mpsc::UnboundedReceiver<Event>>,
}

impl MeshInbox {
    pub fn peer(&self) -> PeerId {
        self.peer
    }
}

#[async_trait::async_trait]
impl Inbox for MeshInbox {
    async fn recv(&self) -> Option<Event> {
        let mut rx = self.rx.lock().await;
        rx.recv().await
    }

    fn try_recv(&self) -> Option<Event> {
        let mut rx = self.rx.try_lock().ok()?;
        rx.try_recv().ok()
    }
}
