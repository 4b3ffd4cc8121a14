//! Identifiers shared across the protocol.

use std::fmt;

/// Id of a service within its owning node's id space.
pub type ServiceId = u16;

/// Id of an operation within a service interface.
pub type OpId = u8;

/// Id of a pending return slot.
pub type SlotId = u16;

/// Strong type for peer identifiers.
///
/// The transport maps these to whatever addresses it actually uses.
#[derive(Copy, Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct PeerId(pub u64);

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "peer-{}", self.0)
    }
}
