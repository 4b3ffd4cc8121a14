//! Futures over the node's continuations.
//!
//! Both helpers rely on some pump delivering the reply; awaiting them on the
//! pump's own task would never finish.

use std::sync::Arc;

use svcrpc::CallContext;
use svcrpc::Callback;
use svcrpc::Interface;
use svcrpc::Marshal;
use svcrpc::Node;
use svcrpc::PeerId;
use tokio::sync::oneshot;

use crate::error::Error;
use crate::error::Result;

/// Connects to `name` on `peer` and waits for the proxy.
///
/// Resolves to [`Error::Closed`] if the peer is lost before answering.
pub async fn connect<I: Interface + ?Sized>(node: &Node, name: &str, peer: PeerId) -> Result<Arc<I>> {
    let (tx, rx) = oneshot::channel();
    node.connect::<I>(name, peer, move |_cx, result| {
        let _ = tx.send(result);
    })?;

    let proxy = rx.await.map_err(|_| Error::Closed)??;
    Ok(proxy)
}

/// A callback paired with the receiver its arguments are sent to.
///
/// The receiver fails if the callback is dropped without being called, for
/// example when its slot is discarded with a lost peer.
pub fn reply<A: Marshal + Send + 'static>() -> (Callback<A>, oneshot::Receiver<A>) {
    let (tx, rx) = oneshot::channel();
    let callback = Callback::new(move |_cx: &CallContext, args: A| {
        let _ = tx.send(args);
    });
    (callback, rx)
}
