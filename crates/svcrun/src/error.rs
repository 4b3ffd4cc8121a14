//! Runtime errors.

use std::fmt;

use svcrpc::PeerId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The RPC layer failed.
    Rpc(svcrpc::Error),
    /// A reply can never arrive: its slot was dropped (peer lost or node gone).
    Closed,
    /// The mesh has no endpoint with this id.
    UnknownPeer(PeerId),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Rpc(e) => write!(f, "rpc error: {}", e),
            Error::Closed => write!(f, "reply channel closed"),
            Error::UnknownPeer(peer) => write!(f, "unknown peer: {}", peer),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Rpc(e) => Some(e),
            _ => None,
        }
    }
}

impl From<svcrpc::Error> for Error {
    fn from(e: svcrpc::Error) -> Self { Self::Rpc(e) }
}

pub type Result<T> = std::result::Result<T, Error>;
