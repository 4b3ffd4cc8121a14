//! # Callbacks
//!
//! A one-shot closure that can be passed as an operation argument.
//!
//! On the wire a callback is only a slot id. The sender keeps the closure in
//! its return-slot table; the receiver gets a [`Callback`] that, when called,
//! sends a `RETURN` for that slot back to the sender, carrying its arguments.

use std::fmt;

use tracing::debug;

use crate::error::Error;
use crate::error::Result;
use crate::marshal::ArgReader;
use crate::marshal::ArgWriter;
use crate::marshal::Marshal;
use crate::node::WeakNode;
use crate::service::CallContext;
use crate::types::PeerId;
use crate::types::SlotId;

type Closure<A> = Box<dyn FnOnce(&CallContext, A) + Send>;

enum Target<A> {
    /// Runs here.
    Local(Closure<A>),
    /// Answers slot `slot` on `peer`.
    Remote { node: WeakNode, peer: PeerId, slot: SlotId },
}

/// A one-shot continuation taking arguments `A` (a tuple for several values).
///
/// Calling it consumes it, so each callback fires at most once.
pub struct Callback<A> {
    target: Target<A>,
}

impl<A: Marshal + Send + 'static> Callback<A> {
    pub fn new(f: impl FnOnce(&CallContext, A) + Send + 'static) -> Self {
        Self { target: Target::Local(Box::new(f)) }
    }

    /// `true` if calling this sends a message rather than running a closure.
    pub fn is_remote(&self) -> bool {
        matches!(self.target, Target::Remote { .. })
    }

    /// Fires the callback.
    ///
    /// A local closure runs immediately in a local context. A remote callback
    /// encodes `args` and returns them to the peer that created it.
    pub fn call(self, args: A) -> Result<()> {
        match self.target {
            Target::Local(f) => {
                f(&CallContext::local(), args);
                Ok(())
            }
            Target::Remote { node, peer, slot } => {
                let node = node.upgrade().ok_or(Error::Detached)?;
                node.send_return(peer, slot, move |w| args.encode(w))
            }
        }
    }
}

impl<A: Marshal + Send + 'static> Marshal for Callback<A> {
    fn encode(self, w: &mut ArgWriter<'_>) -> Result<()> {
        let peer = w.peer();
        // A remote callback forwarded to a third party gets a fresh slot here
        // whose continuation relays the reply to the original creator.
        let slot = w.node().register_slot(
            peer,
            Box::new(move |r: &mut ArgReader<'_>| {
                let cx = r.context();
                let args = A::decode(r)?;
                match self.target {
                    Target::Local(f) => {
                        f(&cx, args);
                        Ok(())
                    }
                    remote => Callback { target: remote }.call(args),
                }
            }),
        )?;
        w.track_slot(slot);
        w.writer().u16(slot);
        Ok(())
    }

    fn decode(r: &mut ArgReader<'_>) -> Result<Self> {
        let slot = r.reader().u16()?;
        debug!(peer = %r.sender(), slot, "callback received");
        Ok(Self {
            target: Target::Remote {
                node: r.node().downgrade(),
                peer: r.sender(),
                slot,
            },
        })
    }
}

impl<A> fmt::Debug for Callback<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.target {
            Target::Local(_) => f.write_str("Callback(local)"),
            Target::Remote { peer, slot, .. } => {
                f.debug_struct("Callback").field("peer", peer).field("slot", slot).finish()
            }
        }
    }
}
