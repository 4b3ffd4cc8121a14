//! # Svcrun
//!
//! Drives [`svcrpc::Node`]s on tokio.
//!
//! A node is a synchronous state machine: something has to pull packets off
//! the network and feed them to it one at a time. That something is a
//! [`Pump`], reading [`Event`]s from an [`Inbox`]. [`Mesh`] is an in-memory
//! network whose endpoints provide both halves, a [`svcrpc::Transport`] for
//! the node and an [`Inbox`] for its pump.
//!
//! The async helpers [`connect`] and [`reply`] turn the continuation style of
//! the node into futures.

pub mod error;
pub mod event;
pub mod mesh;
pub mod pump;
pub mod wait;

pub use crate::error::Error;
pub use crate::error::Result;
pub use crate::event::Event;
pub use crate::event::Inbox;
pub use crate::mesh::Mesh;
pub use crate::mesh::MeshInbox;
pub use crate::mesh::MeshTransport;
pub use crate::pump::Pump;
pub use crate::wait::connect;
pub use crate::wait::reply;

use tracing_subscriber::EnvFilter;

/// Installs a `fmt` subscriber filtered by `RUST_LOG` (default `info`).
///
/// Does nothing if a global subscriber is already set, so tests may call it
/// freely.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

#[cfg(test)]
mod tests;
