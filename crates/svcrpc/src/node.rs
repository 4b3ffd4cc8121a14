//! # Node
//!
//! The protocol dispatcher. A node owns the three tables (local services,
//! foreign proxies per peer, pending return slots), turns outbound calls into
//! messages, and interprets inbound messages against the tables.
//!
//! ## Concurrency
//! A `Node` is a cheap handle (`Arc`) and may be cloned into tasks. Every
//! table is a concurrent map and no map guard is held while user code runs
//! (handlers, `on_connect` hooks, continuations), so that code may re-enter
//! the node freely.
//!
//! ## Error Handling
//! [`Node::on_message`] never fails: protocol misses are logged at `debug`,
//! everything else at `warn`, and the message is dropped. Contract violations
//! panic, see [`Node::introduce`] and [`Node::foreign_or_insert`].

use std::fmt;
use std::sync::Arc;
use std::sync::Weak;

use svcpack::Reader;
use svcpack::Writer;
use tracing::debug;
use tracing::trace;
use tracing::warn;

use crate::config::Config;
use crate::error::Error;
use crate::error::Result;
use crate::marshal::ArgReader;
use crate::marshal::ArgWriter;
use crate::message::Header;
use crate::registry::ForeignEntry;
use crate::registry::ForeignTables;
use crate::registry::Registry;
use crate::service::CallContext;
use crate::service::Dispatch;
use crate::service::Interface;
use crate::service::Remote;
use crate::service::Service;
use crate::slots::Continuation;
use crate::slots::ReturnSlots;
use crate::transport::Transport;
use crate::types::OpId;
use crate::types::PeerId;
use crate::types::ServiceId;
use crate::types::SlotId;

/// What [`Node::on_message`] did with a packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Receipt {
    /// The packet carried this node's tag and was consumed (possibly dropped
    /// after logging).
    Handled,
    /// The packet belongs to some other protocol on the same transport.
    Ignored,
}

struct Shared {
    config: Config,
    transport: Arc<dyn Transport>,
    registry: Registry,
    foreign: ForeignTables,
    slots: ReturnSlots,
}

/// A handle to one protocol dispatcher.
#[derive(Clone)]
pub struct Node {
    shared: Arc<Shared>,
}

/// A non-owning handle, held by bindings, proxies and remote callbacks so
/// they do not keep their node alive.
#[derive(Clone)]
pub struct WeakNode(Weak<Shared>);

impl WeakNode {
    pub fn upgrade(&self) -> Option<Node> {
        self.0.upgrade().map(|shared| Node { shared })
    }

    /// `true` if this refers to the same dispatcher as `node`.
    pub fn is(&self, node: &Node) -> bool {
        std::ptr::eq(self.0.as_ptr(), Arc::as_ptr(&node.shared))
    }
}

impl Node {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self::with_config(transport, Config::default())
    }

    pub fn with_config(transport: Arc<dyn Transport>, config: Config) -> Self {
        let shared = Shared {
            registry: Registry::new(config.first_service_id),
            foreign: ForeignTables::new(),
            slots: ReturnSlots::new(config.first_slot_id),
            transport,
            config,
        };
        Self { shared: Arc::new(shared) }
    }

    pub fn downgrade(&self) -> WeakNode {
        WeakNode(Arc::downgrade(&self.shared))
    }

    pub fn config(&self) -> &Config {
        &self.shared.config
    }

    // ------------------------------------------------------------------------
    //  Service registry
    // ------------------------------------------------------------------------

    /// Publishes `service` under `name` for peers to connect to.
    ///
    /// The service is introduced first, so it gets an id even if the name is
    /// taken. A taken name is left bound to its current holder, which is
    /// returned. A service is bound under at most one name: registering one
    /// that already has a name binds nothing and returns it.
    ///
    /// Fails with [`Error::ServiceIdsExhausted`] if the service needs an id
    /// and none is left.
    pub fn register<I: Interface + ?Sized>(
        &self,
        name: &str,
        service: Arc<I>,
    ) -> Result<Option<Arc<dyn Service>>> {
        self.register_service(name, I::entry(service))
    }

    pub fn register_service(
        &self,
        name: &str,
        service: Arc<dyn Service>,
    ) -> Result<Option<Arc<dyn Service>>> {
        let id = self.introduce(service.clone())?;
        match self.shared.registry.bind_name(name, id, service) {
            Some(existing) => {
                debug!(name, id, "name or service already registered");
                Ok(Some(existing))
            }
            None => {
                debug!(name, id, "service registered");
                Ok(None)
            }
        }
    }

    pub fn lookup(&self, name: &str) -> Option<Arc<dyn Service>> {
        self.shared.registry.lookup(name)
    }

    /// Unbinds `name`. The service keeps its id and stays invokable through
    /// references peers already hold.
    pub fn remove(&self, name: &str) -> Option<Arc<dyn Service>> {
        let removed = self.shared.registry.remove_name(name);
        if removed.is_some() {
            debug!(name, "service unregistered");
        }
        removed
    }

    /// The name the local service `id` is registered under.
    pub fn name_of(&self, id: ServiceId) -> Option<String> {
        self.shared.registry.name_of(id)
    }

    /// Registered names, in no particular order.
    pub fn names(&self) -> Vec<String> {
        self.shared.registry.names()
    }

    /// Gives `service` an id in this node's id space, once.
    ///
    /// Calling it again for a service this node already owns returns the same
    /// id.
    ///
    /// # Panics
    /// If `service` is a foreign proxy, or is already owned by another node.
    pub fn introduce(&self, service: Arc<dyn Service>) -> Result<ServiceId> {
        assert!(
            !service.is_foreign(),
            "cannot introduce a proxy for a remote `{}`",
            service.descriptor().name,
        );

        loop {
            let binding = service.binding();
            if let Some(id) = binding.id() {
                assert!(
                    binding.is_owned_by(self),
                    "service `{}` (id {}) is already owned by another node",
                    service.descriptor().name,
                    id,
                );
                return Ok(id);
            }

            let id = self.shared.registry.allocate()?;
            self.shared.registry.insert_local(id, service.clone());
            if binding.attach(self.downgrade(), id, false) {
                debug!(id, service = service.descriptor().name, "service introduced");
                return Ok(id);
            }
            // Lost a race with a concurrent introduction; use whatever won.
            self.shared.registry.remove_local(id);
        }
    }

    /// The local service with this id.
    pub fn local(&self, id: ServiceId) -> Option<Arc<dyn Service>> {
        self.shared.registry.local(id)
    }

    /// Number of services that have been given an id.
    pub fn service_count(&self) -> usize {
        self.shared.registry.len()
    }

    // ------------------------------------------------------------------------
    //  Foreign tables
    // ------------------------------------------------------------------------

    /// The proxy for `peer`'s service `id`, if one has been created.
    pub fn foreign(&self, peer: PeerId, id: ServiceId) -> Option<Arc<dyn Service>> {
        self.shared.foreign.get(peer, id)
    }

    /// The proxy for `peer`'s service `id`, created on first use.
    ///
    /// Every call for the same pair returns the same `Arc`.
    ///
    /// # Panics
    /// If the pair was first resolved as a different interface: the two
    /// peers disagree on a signature.
    pub fn foreign_or_insert<I: Interface + ?Sized>(&self, peer: PeerId, id: ServiceId) -> Arc<I> {
        let make = || {
            let proxy = I::proxy(Remote::new(self.downgrade(), peer));
            assert!(
                I::binding(&proxy).attach(self.downgrade(), id, true),
                "fresh proxy for `{}` is already bound",
                I::descriptor().name,
            );
            debug!(peer = %peer, id, service = I::descriptor().name, "proxy created");
            ForeignEntry {
                service: I::entry(proxy.clone()),
                handle: Box::new(proxy),
            }
        };

        self.shared.foreign.insert_if_absent(peer, id, make, |handle| {
            match handle.downcast_ref::<Arc<I>>() {
                Some(proxy) => proxy.clone(),
                None => panic!(
                    "service {} of {} is already known under another interface, not `{}`",
                    id,
                    peer,
                    I::descriptor().name,
                ),
            }
        })
    }

    /// Number of proxies held for `peer`.
    pub fn foreign_count(&self, peer: PeerId) -> usize {
        self.shared.foreign.len(peer)
    }

    // ------------------------------------------------------------------------
    //  Return slots
    // ------------------------------------------------------------------------

    /// Parks `continuation` until `peer` answers the returned slot id.
    pub fn register_slot(&self, peer: PeerId, continuation: Continuation) -> Result<SlotId> {
        let slot = self.shared.slots.register(peer, continuation)?;
        trace!(slot, peer = %peer, "slot registered");
        Ok(slot)
    }

    /// Runs and removes the continuation for `slot` against `payload`.
    ///
    /// Returns `false` if the slot is not pending; the payload is dropped.
    pub fn consume(&self, slot: SlotId, sender: PeerId, payload: &[u8]) -> Result<bool> {
        let Some((expected, continuation)) = self.shared.slots.take(slot) else {
            debug!(slot, peer = %sender, "return for unknown slot dropped");
            return Ok(false);
        };
        if expected != sender {
            debug!(slot, expected = %expected, peer = %sender, "return from unexpected peer");
        }

        let mut args = ArgReader::new(self, sender, Reader::new(payload));
        continuation(&mut args)?;
        args.finish()?;
        Ok(true)
    }

    /// Drops a pending slot without running it.
    pub fn cancel(&self, slot: SlotId) -> bool {
        self.shared.slots.take(slot).is_some()
    }

    pub fn pending_slots(&self) -> usize {
        self.shared.slots.len()
    }

    pub fn is_pending(&self, slot: SlotId) -> bool {
        self.shared.slots.contains(slot)
    }

    // ------------------------------------------------------------------------
    //  Outbound
    // ------------------------------------------------------------------------

    /// Asks `peer` for the service registered under `name`.
    ///
    /// `on_result` runs when the reply arrives: with the proxy, or with
    /// [`Error::ServiceNotFound`] if `peer` has no such name. It never runs
    /// if the reply is lost or the peer goes away first.
    pub fn connect<I: Interface + ?Sized>(
        &self,
        name: &str,
        peer: PeerId,
        on_result: impl FnOnce(&CallContext, Result<Arc<I>>) + Send + 'static,
    ) -> Result<SlotId> {
        let wanted = name.to_owned();
        let slot = self.register_slot(
            peer,
            Box::new(move |r: &mut ArgReader<'_>| {
                let cx = r.context();
                let service = r.service::<I>()?;
                on_result(&cx, service.ok_or(Error::ServiceNotFound(wanted)));
                Ok(())
            }),
        )?;

        let mut w = Writer::new();
        let sent = Header::Connect { name, slot }
            .encode(self.shared.config.tag, &mut w)
            .and_then(|()| self.send(peer, w.into_bytes()));
        if let Err(e) = sent {
            self.cancel(slot);
            return Err(e);
        }

        debug!(name, slot, peer = %peer, "connect sent");
        Ok(slot)
    }

    pub(crate) fn send_invoke(
        &self,
        peer: PeerId,
        service: ServiceId,
        op: OpId,
        encode: impl FnOnce(&mut ArgWriter<'_>) -> Result<()>,
    ) -> Result<()> {
        self.send_with(peer, Header::Invoke { service, op }, encode)
    }

    pub(crate) fn send_return(
        &self,
        peer: PeerId,
        slot: SlotId,
        encode: impl FnOnce(&mut ArgWriter<'_>) -> Result<()>,
    ) -> Result<()> {
        self.send_with(peer, Header::Return { slot }, encode)
    }

    /// Encodes header and arguments and sends them. Slots registered by the
    /// arguments are released again if anything fails.
    fn send_with(
        &self,
        peer: PeerId,
        header: Header<'_>,
        encode: impl FnOnce(&mut ArgWriter<'_>) -> Result<()>,
    ) -> Result<()> {
        let mut w = ArgWriter::new(self, peer);
        let result = header
            .encode(self.shared.config.tag, w.writer())
            .and_then(|()| encode(&mut w));
        let (bytes, slots) = w.finish();

        let result = result.and_then(|()| self.send(peer, bytes));
        if result.is_err() {
            for slot in slots {
                self.cancel(slot);
            }
        }
        result
    }

    fn send(&self, peer: PeerId, bytes: Vec<u8>) -> Result<()> {
        trace!(peer = %peer, len = bytes.len(), "send");
        self.shared.transport.send(peer, bytes, self.shared.config.delivery())?;
        Ok(())
    }

    // ------------------------------------------------------------------------
    //  Inbound
    // ------------------------------------------------------------------------

    /// Processes one packet from `peer` to completion.
    pub fn on_message(&self, peer: PeerId, bytes: &[u8]) -> Receipt {
        match bytes.split_first() {
            Some((&tag, body)) if tag == self.shared.config.tag => {
                if let Err(e) = self.dispatch(peer, body) {
                    if e.is_protocol_miss() {
                        debug!(peer = %peer, error = %e, "message dropped");
                    } else {
                        warn!(peer = %peer, error = %e, "message failed");
                    }
                }
                Receipt::Handled
            }
            _ => Receipt::Ignored,
        }
    }

    /// Forgets everything tied to `peer`: its proxies and the slots waiting
    /// on it. Dropped continuations never run.
    pub fn on_peer_lost(&self, peer: PeerId) {
        let proxies = self.shared.foreign.remove_peer(peer);
        let slots = self.shared.slots.drain_peer(peer);
        debug!(
            peer = %peer,
            proxies = proxies.as_ref().map_or(0, |t| t.len()),
            slots = slots.len(),
            "peer lost",
        );
    }

    fn dispatch(&self, peer: PeerId, body: &[u8]) -> Result<()> {
        let mut r = Reader::new(body);
        let header = Header::decode(&mut r)?;
        trace!(peer = %peer, kind = ?header.kind(), "recv");

        match header {
            Header::Connect { name, slot } => self.handle_connect(peer, name, slot),
            Header::Return { slot } => self.consume(slot, peer, r.rest()).map(drop),
            Header::Invoke { service, op } => self.handle_invoke(peer, service, op, r.rest()),
            Header::Detach => {
                debug!(peer = %peer, "detach");
                Ok(())
            }
        }
    }

    fn handle_connect(&self, peer: PeerId, name: &str, slot: SlotId) -> Result<()> {
        let service = self.lookup(name);
        match &service {
            Some(service) => service.on_connect(&CallContext::remote(peer)),
            None => debug!(peer = %peer, name, "connect to unknown service"),
        }
        self.send_return(peer, slot, move |w| w.service(service))
    }

    fn handle_invoke(&self, peer: PeerId, id: ServiceId, op: OpId, payload: &[u8]) -> Result<()> {
        let service = self.local(id).ok_or(Error::UnknownService(id))?;
        let cx = CallContext::remote(peer);
        let mut args = ArgReader::new(self, peer, Reader::new(payload));

        match service.invoke(&cx, op, &mut args)? {
            Dispatch::Handled => args.finish(),
            Dispatch::NotHandled => Err(Error::UnknownOperation {
                interface: service.descriptor().name,
                op,
            }),
        }
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("tag", &self.shared.config.tag)
            .field("services", &self.shared.registry.len())
            .field("pending_slots", &self.shared.slots.len())
            .finish()
    }
}
