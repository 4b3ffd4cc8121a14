//! # Service Model
//!
//! A service is an object with a fixed, ordered set of operations. Each
//! interface is declared once with [`service!`](crate::service!), which
//! generates the interface trait, its proxy, and its operation table.
//!
//! Three pieces meet here:
//!
//! - [`Service`]: the object-safe, type-erased view the dispatcher works with.
//! - [`Interface`]: implemented for `dyn Iface`, it bridges a typed handle
//!   (`Arc<dyn Iface>`) to that erased view and knows how to build a proxy.
//! - [`Binding`]: the set-once attachment of an instance to its owning node.

use std::fmt;
use std::sync::Arc;
use std::sync::OnceLock;

use crate::error::Error;
use crate::error::Result;
use crate::marshal::ArgReader;
use crate::marshal::ArgWriter;
use crate::node::Node;
use crate::node::WeakNode;
use crate::types::OpId;
use crate::types::PeerId;
use crate::types::ServiceId;

/// Who sent the message currently being dispatched.
///
/// Passed explicitly to every handler and dropped when the handler returns,
/// so a reentrant or concurrent dispatch never observes a stale sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallContext {
    sender: Option<PeerId>,
}

impl CallContext {
    /// Context for a direct, in-process call.
    pub const fn local() -> Self {
        Self { sender: None }
    }

    /// Context for a call that arrived from `peer`.
    pub const fn remote(peer: PeerId) -> Self {
        Self { sender: Some(peer) }
    }

    /// The peer whose message is being dispatched, `None` for local calls.
    pub fn sender(&self) -> Option<PeerId> {
        self.sender
    }

    pub fn is_local(&self) -> bool {
        self.sender.is_none()
    }
}

/// Outcome of [`Service::invoke`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Handled,
    /// The operation id is not part of this interface.
    NotHandled,
}

/// Static metadata for one operation.
#[derive(Debug)]
pub struct Operation {
    pub id: OpId,
    pub name: &'static str,
    pub signature: &'static str,
}

/// Static metadata for an interface, generated once per service type.
#[derive(Debug)]
pub struct Descriptor {
    pub name: &'static str,
    pub operations: &'static [Operation],
}

impl Descriptor {
    pub fn operation(&self, id: OpId) -> Option<&'static Operation> {
        self.operations.iter().find(|op| op.id == id)
    }
}

impl fmt::Display for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "service {}", self.name)?;
        for op in self.operations {
            writeln!(f, "\t[{}] {}({})", op.id, op.name, op.signature)?;
        }
        Ok(())
    }
}

struct Attachment {
    node: WeakNode,
    id: ServiceId,
    foreign: bool,
}

/// The owner attachment of a service instance.
///
/// Starts out unbound. A node attaches it exactly once: when a local service
/// is introduced (registered by name, or first sent as an argument), or when
/// a proxy is created for a remote id. It never changes afterwards.
#[derive(Default)]
pub struct Binding {
    slot: OnceLock<Attachment>,
}

impl Binding {
    pub const fn new() -> Self {
        Self { slot: OnceLock::new() }
    }

    pub fn is_bound(&self) -> bool {
        self.slot.get().is_some()
    }

    /// The id in the owner's id space. For a proxy this is the remote owner's id.
    pub fn id(&self) -> Option<ServiceId> {
        self.slot.get().map(|a| a.id)
    }

    pub fn is_foreign(&self) -> bool {
        self.slot.get().is_some_and(|a| a.foreign)
    }

    pub fn is_owned_by(&self, node: &Node) -> bool {
        self.slot.get().is_some_and(|a| a.node.is(node))
    }

    /// Returns `false` if the binding was already attached.
    pub(crate) fn attach(&self, node: WeakNode, id: ServiceId, foreign: bool) -> bool {
        self.slot.set(Attachment { node, id, foreign }).is_ok()
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.slot.get() {
            Some(a) => f.debug_struct("Binding").field("id", &a.id).field("foreign", &a.foreign).finish(),
            None => f.write_str("Binding(unbound)"),
        }
    }
}

/// The type-erased view of a service the dispatcher works with.
///
/// Generated by [`service!`](crate::service!) for each interface; hand-written
/// implementations are possible for services that decode their own payloads.
pub trait Service: Send + Sync + 'static {
    fn binding(&self) -> &Binding;

    fn descriptor(&self) -> &'static Descriptor;

    /// `true` for proxies standing in for a remote instance.
    fn is_foreign(&self) -> bool {
        false
    }

    /// Called when a peer connects to this service by name.
    fn on_connect(&self, cx: &CallContext) {
        let _ = cx;
    }

    /// Decodes the arguments of `op` from `args` and calls it.
    fn invoke(&self, cx: &CallContext, op: OpId, args: &mut ArgReader<'_>) -> Result<Dispatch>;
}

/// Bridges a typed interface handle to the dispatcher.
///
/// Implemented for `dyn Iface` by [`service!`](crate::service!).
pub trait Interface: Send + Sync + 'static {
    fn descriptor() -> &'static Descriptor;

    fn binding(this: &Self) -> &Binding;

    /// Wraps a typed handle into the erased view stored in the node's tables.
    fn entry(this: Arc<Self>) -> Arc<dyn Service>;

    /// Builds an unbound proxy that forwards every operation over `remote`.
    fn proxy(remote: Remote) -> Arc<Self>;
}

/// Where a proxy sends its calls.
#[derive(Clone)]
pub struct Remote {
    node: WeakNode,
    peer: PeerId,
}

impl Remote {
    pub(crate) fn new(node: WeakNode, peer: PeerId) -> Self {
        Self { node, peer }
    }

    /// The peer that owns the real service.
    pub fn peer(&self) -> PeerId {
        self.peer
    }

    pub fn node(&self) -> Result<Node> {
        self.node.upgrade().ok_or(Error::Detached)
    }

    /// Encodes and sends an INVOKE of `op` on the service `binding` refers to.
    pub fn invoke(
        &self,
        binding: &Binding,
        op: OpId,
        encode: impl FnOnce(&mut ArgWriter<'_>) -> Result<()>,
    ) -> Result<()> {
        let node = self.node()?;
        let id = binding.id().ok_or(Error::NotBound)?;
        node.send_invoke(self.peer, id, op, encode)
    }
}

impl fmt::Debug for Remote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Remote").field("peer", &self.peer).finish()
    }
}
