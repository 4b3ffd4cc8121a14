//! # Pump
//!
//! The receive loop for one node. Events are handled one at a time, each to
//! completion, in arrival order.

use svcrpc::Node;
use svcrpc::Receipt;
use tokio::task::JoinHandle;
use tracing::debug;
use tracing::trace;

use crate::event::Event;
use crate::event::Inbox;

pub struct Pump<I> {
    node: Node,
    inbox: I,
}

impl<I: Inbox> Pump<I> {
    pub fn new(node: Node, inbox: I) -> Self {
        Self { node, inbox }
    }

    pub fn node(&self) -> &Node {
        &self.node
    }

    pub fn inbox(&self) -> &I {
        &self.inbox
    }

    /// Feeds one event to the node.
    pub fn dispatch(&self, event: Event) {
        match event {
            Event::Message { from, payload } => {
                if self.node.on_message(from, &payload) == Receipt::Ignored {
                    trace!(peer = %from, len = payload.len(), "not an rpc packet");
                }
            }
            Event::PeerLost(peer) => self.node.on_peer_lost(peer),
        }
    }

    /// Waits for and handles one event. Returns `false` once the inbox is
    /// closed.
    pub async fn step(&self) -> bool {
        match self.inbox.recv().await {
            Some(event) => {
                self.dispatch(event);
                true
            }
            None => false,
        }
    }

    /// Handles events until the inbox closes. Returns how many were handled.
    pub async fn run(self) -> usize {
        let mut handled = 0;
        while self.step().await {
            handled += 1;
        }
        debug!(handled, "pump stopped");
        handled
    }

    /// Handles every event already queued, without waiting.
    pub fn drain(&self) -> usize {
        let mut handled = 0;
        while let Some(event) = self.inbox.try_recv() {
            self.dispatch(event);
            handled += 1;
        }
        handled
    }
}

impl<I: Inbox + 'static> Pump<I> {
    /// Runs the pump on its own task.
    pub fn spawn(self) -> JoinHandle<usize> {
        tokio::spawn(self.run())
    }
}
