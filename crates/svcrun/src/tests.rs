use svcrpc::Delivery;
use svcrpc::PeerId;
use svcrpc::Transport;
use svcrpc::TransportError;

use crate::Error;
use crate::Event;
use crate::Inbox;
use crate::Mesh;

#[tokio::test]
async fn test_mesh_delivers_in_order() {
    let mesh = Mesh::new();
    let (a, a_tx, _a_rx) = mesh.join();
    let (b, _b_tx, b_rx) = mesh.join();
    assert_eq!((a, b), (PeerId(1), PeerId(2)));

    a_tx.send(b, vec![1], Delivery::default()).unwrap();
    a_tx.send(b, vec![2], Delivery::default()).unwrap();

    assert_eq!(b_rx.recv().await, Some(Event::Message { from: a, payload: vec![1] }));
    assert_eq!(b_rx.try_recv(), Some(Event::Message { from: a, payload: vec![2] }));
    assert_eq!(b_rx.try_recv(), None);
}

#[tokio::test]
async fn test_mesh_unknown_peer() {
    let mesh = Mesh::new();
    let (_a, a_tx, _a_rx) = mesh.join();

    match a_tx.send(PeerId(99), vec![0], Delivery::default()) {
        Err(TransportError::UnknownPeer(PeerId(99))) => {}
        other => panic!("Expected UnknownPeer, got {:?}", other),
    }
    assert_eq!(mesh.disconnect(PeerId(99)), Err(Error::UnknownPeer(PeerId(99))));
}

#[tokio::test]
async fn test_disconnect_notifies_and_closes() {
    let mesh = Mesh::new();
    let (a, a_tx, a_rx) = mesh.join();
    let (b, b_tx, b_rx) = mesh.join();

    b_tx.send(a, vec![7], Delivery::default()).unwrap();
    mesh.disconnect(a).unwrap();
    assert_eq!(mesh.peers(), vec![b]);

    assert_eq!(b_rx.recv().await, Some(Event::PeerLost(a)));

    // Queued traffic is still readable, then the inbox ends.
    assert_eq!(a_rx.recv().await, Some(Event::Message { from: b, payload: vec![7] }));
    assert_eq!(a_rx.recv().await, None);

    assert!(matches!(b_tx.send(a, vec![], Delivery::default()), Err(TransportError::UnknownPeer(_))));
    assert!(matches!(a_tx.send(b, vec![], Delivery::default()), Err(TransportError::ConnectionLost(_))));
}

#[test]
fn test_init_tracing_is_repeatable() {
    crate::init_tracing();
    crate::init_tracing();
}
