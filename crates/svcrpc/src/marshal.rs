//! # Argument Marshaller
//!
//! Type-directed encoding of an operation's argument list.
//!
//! The rule for each argument is picked by its declared static type, never by
//! inspecting the value, so the decoder (which only knows the signature) reads
//! the same bytes in the same order they were written:
//!
//! | declared type | wire |
//! |---------------|------|
//! | scalars, `String`, `Vec<u8>` | written directly by the codec |
//! | `Option<Arc<dyn Iface>>` | `is_null: bool`, then `id: u16` if present |
//! | [`Callback<A>`](crate::Callback) | `slot: u16` of a freshly registered return slot |
//! | tuples | each element in order |

use std::sync::Arc;

use svcpack::Reader;
use svcpack::Writer;

use crate::error::Error;
use crate::error::Result;
use crate::node::Node;
use crate::service::CallContext;
use crate::service::Interface;
use crate::service::Service;
use crate::types::PeerId;
use crate::types::SlotId;

/// A value that can cross the wire as an operation argument.
///
/// Encoding consumes the value: a callback is moved into a return slot, a
/// service reference may be published as a side effect.
pub trait Marshal: Sized {
    fn encode(self, w: &mut ArgWriter<'_>) -> Result<()>;
    fn decode(r: &mut ArgReader<'_>) -> Result<Self>;
}

/// Encoding state for one outbound message.
///
/// Knows the destination peer so callback slots can be tied to it, and
/// remembers the slots it registered so a failed send can release them.
pub struct ArgWriter<'a> {
    node: &'a Node,
    peer: PeerId,
    buf: Writer,
    slots: Vec<SlotId>,
}

impl<'a> ArgWriter<'a> {
    pub(crate) fn new(node: &'a Node, peer: PeerId) -> Self {
        Self { node, peer, buf: Writer::new(), slots: Vec::new() }
    }

    /// The raw codec, for primitive values.
    pub fn writer(&mut self) -> &mut Writer {
        &mut self.buf
    }

    /// The peer this message is addressed to.
    pub fn peer(&self) -> PeerId {
        self.peer
    }

    pub fn node(&self) -> &'a Node {
        self.node
    }

    pub(crate) fn track_slot(&mut self, slot: SlotId) {
        self.slots.push(slot);
    }

    pub(crate) fn finish(self) -> (Vec<u8>, Vec<SlotId>) {
        (self.buf.into_bytes(), self.slots)
    }

    /// Writes a service reference from its erased view.
    ///
    /// A local service that has never been introduced is introduced here:
    /// sending a fresh service publishes it.
    ///
    /// # Panics
    /// If `service` is a foreign proxy, or is owned by a different node. Only
    /// the owner may hand out a reference.
    pub fn service(&mut self, service: Option<Arc<dyn Service>>) -> Result<()> {
        let Some(service) = service else {
            self.buf.bool(true);
            return Ok(());
        };

        assert!(
            !service.is_foreign(),
            "cannot pass a proxy for a remote `{}` as an argument; only locally owned services can be sent",
            service.descriptor().name,
        );

        let id = self.node.introduce(service)?;
        self.buf.bool(false).u16(id);
        Ok(())
    }
}

/// Decoding state for one inbound message.
pub struct ArgReader<'a> {
    node: &'a Node,
    sender: PeerId,
    reader: Reader<'a>,
}

impl<'a> ArgReader<'a> {
    pub(crate) fn new(node: &'a Node, sender: PeerId, reader: Reader<'a>) -> Self {
        Self { node, sender, reader }
    }

    /// The raw codec, for primitive values.
    pub fn reader(&mut self) -> &mut Reader<'a> {
        &mut self.reader
    }

    /// The peer the message came from.
    pub fn sender(&self) -> PeerId {
        self.sender
    }

    pub fn node(&self) -> &'a Node {
        self.node
    }

    pub fn context(&self) -> CallContext {
        CallContext::remote(self.sender)
    }

    /// Fails if the payload held more than the signature consumed.
    pub(crate) fn finish(&self) -> Result<()> {
        match self.reader.remaining() {
            0 => Ok(()),
            n => Err(Error::TrailingBytes(n)),
        }
    }

    /// Reads a service reference, resolving it in the sender's foreign table.
    pub fn service<I: Interface + ?Sized>(&mut self) -> Result<Option<Arc<I>>> {
        if self.reader.bool()? {
            return Ok(None);
        }
        let id = self.reader.u16()?;
        Ok(Some(self.node.foreign_or_insert::<I>(self.sender, id)))
    }
}

// ============================================================================
//  PRIMITIVES
// ============================================================================

macro_rules! marshal_scalar {
    ($($ty:ty => $method:ident),* $(,)?) => {
        $(
            impl Marshal for $ty {
                fn encode(self, w: &mut ArgWriter<'_>) -> Result<()> {
                    w.writer().$method(self);
                    Ok(())
                }

                fn decode(r: &mut ArgReader<'_>) -> Result<Self> {
                    Ok(r.reader().$method()?)
                }
            }
        )*
    };
}

marshal_scalar! {
    bool => bool,
    u8 => u8,
    i8 => i8,
    u16 => u16,
    i16 => i16,
    u32 => u32,
    i32 => i32,
    u64 => u64,
    i64 => i64,
    f32 => f32,
    f64 => f64,
    char => char,
}

impl Marshal for String {
    fn encode(self, w: &mut ArgWriter<'_>) -> Result<()> {
        w.writer().str(&self)?;
        Ok(())
    }

    fn decode(r: &mut ArgReader<'_>) -> Result<Self> {
        Ok(r.reader().str()?.to_owned())
    }
}

impl Marshal for Vec<u8> {
    fn encode(self, w: &mut ArgWriter<'_>) -> Result<()> {
        w.writer().bytes(&self)?;
        Ok(())
    }

    fn decode(r: &mut ArgReader<'_>) -> Result<Self> {
        Ok(r.reader().bytes()?.to_vec())
    }
}

// ============================================================================
//  SERVICE REFERENCES
// ============================================================================

impl<I: Interface + ?Sized> Marshal for Option<Arc<I>> {
    fn encode(self, w: &mut ArgWriter<'_>) -> Result<()> {
        w.service(self.map(I::entry))
    }

    fn decode(r: &mut ArgReader<'_>) -> Result<Self> {
        r.service::<I>()
    }
}

// ============================================================================
//  TUPLES (argument lists)
// ============================================================================

macro_rules! marshal_tuple {
    ($($name:ident),*) => {
        impl<$($name: Marshal),*> Marshal for ($($name,)*) {
            #[allow(non_snake_case, unused_variables)]
            fn encode(self, w: &mut ArgWriter<'_>) -> Result<()> {
                let ($($name,)*) = self;
                $( $name.encode(w)?; )*
                Ok(())
            }

            #[allow(unused_variables)]
            fn decode(r: &mut ArgReader<'_>) -> Result<Self> {
                Ok(($($name::decode(r)?,)*))
            }
        }
    };
}

marshal_tuple!();
marshal_tuple!(A);
marshal_tuple!(A, B);
marshal_tuple!(A, B, C);
marshal_tuple!(A, B, C, D);
marshal_tuple!(A, B, C, D, E);
marshal_tuple!(A, B, C, D, E, F);
