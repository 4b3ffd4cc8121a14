//! # Protocol Frames
//!
//! The fixed part of every message: outer tag, kind, and the kind-specific
//! header fields. The argument payload that follows is positional and can only
//! be read by someone who knows the declared signature, see
//! [`marshal`](crate::marshal).
//!
//! ## Invariants
//! - **Panic Safety**: All decoding paths return `Result`, never panicking on unknown data.

use svcpack::Reader;
use svcpack::Writer;

use crate::error::Error;
use crate::error::Result;
use crate::types::OpId;
use crate::types::ServiceId;
use crate::types::SlotId;

/// The inner message kind byte.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Connect = 1,
    Return = 2,
    Invoke = 3,
    Detach = 4,
}

impl Kind {
    pub const fn from_u8(b: u8) -> Option<Self> {
        match b {
            1 => Some(Kind::Connect),
            2 => Some(Kind::Return),
            3 => Some(Kind::Invoke),
            4 => Some(Kind::Detach),
            _ => None,
        }
    }
}

/// A decoded message header. Whatever follows in the reader is the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Header<'a> {
    /// First contact: resolve `name` and answer on `slot`.
    Connect { name: &'a str, slot: SlotId },
    /// Fire the continuation waiting on `slot`.
    Return { slot: SlotId },
    /// Call operation `op` on local service `service`.
    Invoke { service: ServiceId, op: OpId },
    /// Reserved for peer teardown.
    Detach,
}

impl<'a> Header<'a> {
    pub fn kind(&self) -> Kind {
        match self {
            Header::Connect { .. } => Kind::Connect,
            Header::Return { .. } => Kind::Return,
            Header::Invoke { .. } => Kind::Invoke,
            Header::Detach => Kind::Detach,
        }
    }

    /// Writes the outer tag, the kind, and the header fields.
    pub fn encode(&self, tag: u8, w: &mut Writer) -> Result<()> {
        w.u8(tag).u8(self.kind() as u8);
        match self {
            Header::Connect { name, slot } => {
                w.str(name)?;
                w.u16(*slot);
            }
            Header::Return { slot } => {
                w.u16(*slot);
            }
            Header::Invoke { service, op } => {
                w.u16(*service).u8(*op);
            }
            Header::Detach => {}
        }
        Ok(())
    }

    /// Reads the kind and header fields. The outer tag must already be consumed.
    pub fn decode(r: &mut Reader<'a>) -> Result<Self> {
        let raw = r.u8()?;
        let kind = Kind::from_u8(raw).ok_or(Error::UnknownKind(raw))?;
        let header = match kind {
            Kind::Connect => {
                let name = r.str()?;
                let slot = r.u16()?;
                Header::Connect { name, slot }
            }
            Kind::Return => Header::Return { slot: r.u16()? },
            Kind::Invoke => {
                let service = r.u16()?;
                let op = r.u8()?;
                Header::Invoke { service, op }
            }
            Kind::Detach => Header::Detach,
        };
        Ok(header)
    }
}
