//! # Svcrpc
//!
//! Service-oriented RPC over a packet transport.
//!
//! A [`Node`] owns a set of local services, addressable by name for first
//! contact and by a small integer id afterwards. A remote peer obtains a
//! proxy for such a service and calls its operations as if they were local:
//! every call becomes an `INVOKE` message. Arguments are encoded by their
//! declared static type ([`Marshal`]); two kinds are special:
//!
//! - **Service references** (`Option<Arc<dyn Iface>>`) travel as ids. Sending
//!   a fresh local service publishes it; receiving an id yields the one proxy
//!   for that `(peer, id)` pair, created lazily.
//! - **Callbacks** ([`Callback`]) travel as return-slot ids. Invoking the
//!   received callback sends a `RETURN` back, which fires the original
//!   closure exactly once.
//!
//! ## Wire Format
//!
//! `[tag: u8][kind: u8][kind fields...][payload...]`
//!
//! | kind | fields |
//! |------|--------|
//! | `CONNECT = 1` | `name: str`, `slot: u16` |
//! | `RETURN = 2` | `slot: u16`, payload |
//! | `INVOKE = 3` | `service: u16`, `op: u8`, payload |
//! | `DETACH = 4` | none |
//!
//! Services are declared with the [`service!`] macro.

mod macros;

pub mod callback;
pub mod config;
pub mod error;
pub mod marshal;
pub mod message;
pub mod node;
mod registry;
pub mod service;
pub mod slots;
pub mod transport;
pub mod types;

pub use crate::callback::Callback;
pub use crate::config::Config;
pub use crate::error::Error;
pub use crate::error::Result;
pub use crate::marshal::ArgReader;
pub use crate::marshal::ArgWriter;
pub use crate::marshal::Marshal;
pub use crate::message::Header;
pub use crate::message::Kind;
pub use crate::node::Node;
pub use crate::node::Receipt;
pub use crate::node::WeakNode;
pub use crate::service::Binding;
pub use crate::service::CallContext;
pub use crate::service::Descriptor;
pub use crate::service::Dispatch;
pub use crate::service::Interface;
pub use crate::service::Operation;
pub use crate::service::Remote;
pub use crate::service::Service;
pub use crate::slots::Continuation;
pub use crate::transport::Delivery;
pub use crate::transport::Priority;
pub use crate::transport::Reliability;
pub use crate::transport::Transport;
pub use crate::transport::TransportError;
pub use crate::types::OpId;
pub use crate::types::PeerId;
pub use crate::types::ServiceId;
pub use crate::types::SlotId;
