//! Integration tests: nodes talking over the in-memory mesh.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tokio::sync::mpsc;
use tokio::time::timeout;

use svcrpc::Binding;
use svcrpc::CallContext;
use svcrpc::Callback;
use svcrpc::Delivery;
use svcrpc::Node;
use svcrpc::PeerId;
use svcrpc::Result;
use svcrpc::Transport;
use svcrpc::service;
use svcrun::Inbox;
use svcrun::Mesh;
use svcrun::MeshInbox;
use svcrun::Pump;

const WAIT: Duration = Duration::from_secs(5);

service! {
    pub trait Printer {
        proxy PrinterProxy;
        entry PrinterEntry;

        fn print(&self, cx: &CallContext, text: String, done: Callback<()>) -> Result<()> = 0;
    }
}

service! {
    pub trait Adder {
        proxy AdderProxy;
        entry AdderEntry;

        fn add(&self, cx: &CallContext, a: i64, b: i64, reply: Callback<i64>) -> Result<()> = 0;
    }
}

service! {
    /// Hands additions on to an adder living on another node.
    pub trait Gateway {
        proxy GatewayProxy;
        entry GatewayEntry;

        fn add_via(&self, cx: &CallContext, a: i64, b: i64, reply: Callback<i64>) -> Result<()> = 0;
    }
}

service! {
    pub trait Room {
        proxy RoomProxy;
        entry RoomEntry;

        fn join(&self, cx: &CallContext, member: Option<Arc<dyn Member>>, nick: String, joined: Callback<u32>) -> Result<()> = 0;
        fn say(&self, cx: &CallContext, text: String) -> Result<()> = 1;
    }
}

service! {
    pub trait Member {
        proxy MemberProxy;
        entry MemberEntry;

        fn hear(&self, cx: &CallContext, from: String, text: String) -> Result<()> = 0;
    }
}

// --- Fixtures ---

#[derive(Default)]
struct Paper {
    binding: Binding,
    lines: Mutex<Vec<String>>,
}

impl Printer for Paper {
    fn binding(&self) -> &Binding {
        &self.binding
    }

    fn print(&self, _cx: &CallContext, text: String, done: Callback<()>) -> Result<()> {
        self.lines.lock().unwrap().push(text);
        done.call(())
    }
}

#[derive(Default)]
struct Calculator {
    binding: Binding,
}

impl Adder for Calculator {
    fn binding(&self) -> &Binding {
        &self.binding
    }

    fn add(&self, _cx: &CallContext, a: i64, b: i64, reply: Callback<i64>) -> Result<()> {
        reply.call(a + b)
    }
}

struct Relay {
    binding: Binding,
    adder: Arc<dyn Adder>,
}

impl Gateway for Relay {
    fn binding(&self) -> &Binding {
        &self.binding
    }

    fn add_via(&self, cx: &CallContext, a: i64, b: i64, reply: Callback<i64>) -> Result<()> {
        self.adder.add(cx, a, b, reply)
    }
}

#[derive(Default)]
struct Lobby {
    binding: Binding,
    members: Mutex<Vec<(PeerId, String, Arc<dyn Member>)>>,
}

impl Room for Lobby {
    fn binding(&self) -> &Binding {
        &self.binding
    }

    fn join(&self, cx: &CallContext, member: Option<Arc<dyn Member>>, nick: String, joined: Callback<u32>) -> Result<()> {
        let count = {
            let mut members = self.members.lock().unwrap();
            if let (Some(peer), Some(member)) = (cx.sender(), member) {
                members.push((peer, nick, member));
            }
            members.len() as u32
        };
        joined.call(count)
    }

    fn say(&self, cx: &CallContext, text: String) -> Result<()> {
        let members = self.members.lock().unwrap().clone();
        let nick = members
            .iter()
            .find(|(peer, _, _)| Some(*peer) == cx.sender())
            .map(|(_, nick, _)| nick.clone())
            .unwrap_or_else(|| "anonymous".to_string());

        for (_, _, member) in members {
            member.hear(cx, nick.clone(), text.clone())?;
        }
        Ok(())
    }
}

struct Ear {
    binding: Binding,
    tx: mpsc::UnboundedSender<(String, String)>,
}

impl Member for Ear {
    fn binding(&self) -> &Binding {
        &self.binding
    }

    fn hear(&self, _cx: &CallContext, from: String, text: String) -> Result<()> {
        let _ = self.tx.send((from, text));
        Ok(())
    }
}

fn endpoint(mesh: &Mesh) -> (PeerId, Pump<MeshInbox>) {
    let (peer, transport, inbox) = mesh.join();
    let node = Node::new(Arc::new(transport));
    (peer, Pump::new(node, inbox))
}

fn ear() -> (Arc<dyn Member>, mpsc::UnboundedReceiver<(String, String)>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Arc::new(Ear { binding: Binding::new(), tx }), rx)
}

// --- Tests ---

#[tokio::test]
async fn test_printer_over_mesh() -> anyhow::Result<()> {
    svcrun::init_tracing();
    let mesh = Mesh::new();
    let (a, a_pump) = endpoint(&mesh);
    let (_b, b_pump) = endpoint(&mesh);

    let paper = Arc::new(Paper::default());
    let printer: Arc<dyn Printer> = paper.clone();
    a_pump.node().register("printer", printer)?;

    let b = b_pump.node().clone();
    let _a_task = a_pump.spawn();
    let _b_task = b_pump.spawn();

    let proxy = timeout(WAIT, svcrun::connect::<dyn Printer>(&b, "printer", a)).await??;
    let (done, rx) = svcrun::reply::<()>();
    proxy.print(&CallContext::local(), "hello".into(), done)?;
    timeout(WAIT, rx).await??;

    assert_eq!(*paper.lines.lock().unwrap(), vec!["hello".to_string()]);
    assert_eq!(b.pending_slots(), 0);
    Ok(())
}

#[tokio::test]
async fn test_connect_not_found() -> anyhow::Result<()> {
    let mesh = Mesh::new();
    let (a, a_pump) = endpoint(&mesh);
    let (_b, b_pump) = endpoint(&mesh);
    let b = b_pump.node().clone();
    let _a_task = a_pump.spawn();
    let _b_task = b_pump.spawn();

    match timeout(WAIT, svcrun::connect::<dyn Printer>(&b, "nobody", a)).await? {
        Err(svcrun::Error::Rpc(svcrpc::Error::ServiceNotFound(name))) => assert_eq!(name, "nobody"),
        other => panic!("Expected ServiceNotFound, got {:?}", other.map(|_| ())),
    }
    Ok(())
}

#[tokio::test]
async fn test_callback_forwarded_through_third_node() -> anyhow::Result<()> {
    let mesh = Mesh::new();
    let (a, a_pump) = endpoint(&mesh);
    let (_b, b_pump) = endpoint(&mesh);
    let (c, c_pump) = endpoint(&mesh);

    let adder: Arc<dyn Adder> = Arc::new(Calculator::default());
    c_pump.node().register("adder", adder)?;

    let a_node = a_pump.node().clone();
    let b_node = b_pump.node().clone();
    let c_node = c_pump.node().clone();
    let _tasks = [a_pump.spawn(), b_pump.spawn(), c_pump.spawn()];

    let remote_adder = timeout(WAIT, svcrun::connect::<dyn Adder>(&a_node, "adder", c)).await??;
    let gateway: Arc<dyn Gateway> = Arc::new(Relay { binding: Binding::new(), adder: remote_adder });
    a_node.register("gateway", gateway)?;

    let proxy = timeout(WAIT, svcrun::connect::<dyn Gateway>(&b_node, "gateway", a)).await??;
    let (reply, rx) = svcrun::reply::<i64>();
    proxy.add_via(&CallContext::local(), 2, 40, reply)?;

    assert_eq!(timeout(WAIT, rx).await??, 42);
    assert_eq!(a_node.pending_slots(), 0);
    assert_eq!(b_node.pending_slots(), 0);
    assert_eq!(c_node.pending_slots(), 0);
    Ok(())
}

#[tokio::test]
async fn test_chat_room_service_references() -> anyhow::Result<()> {
    let mesh = Mesh::new();
    let (a, a_pump) = endpoint(&mesh);
    let (b, b_pump) = endpoint(&mesh);
    let (c, c_pump) = endpoint(&mesh);

    let lobby = Arc::new(Lobby::default());
    let room: Arc<dyn Room> = lobby.clone();
    a_pump.node().register("lobby", room)?;

    let a_node = a_pump.node().clone();
    let b_node = b_pump.node().clone();
    let c_node = c_pump.node().clone();
    let _tasks = [a_pump.spawn(), b_pump.spawn(), c_pump.spawn()];

    let bob_room = timeout(WAIT, svcrun::connect::<dyn Room>(&b_node, "lobby", a)).await??;
    let cat_room = timeout(WAIT, svcrun::connect::<dyn Room>(&c_node, "lobby", a)).await??;

    let (bob, mut bob_rx) = ear();
    let (cat, mut cat_rx) = ear();

    let (joined, rx) = svcrun::reply::<u32>();
    bob_room.join(&CallContext::local(), Some(bob.clone()), "bob".into(), joined)?;
    assert_eq!(timeout(WAIT, rx).await??, 1);

    let (joined, rx) = svcrun::reply::<u32>();
    cat_room.join(&CallContext::local(), Some(cat.clone()), "cat".into(), joined)?;
    assert_eq!(timeout(WAIT, rx).await??, 2);

    // Sending a fresh member published it on its own node.
    assert!(bob.binding().is_owned_by(&b_node));
    assert!(cat.binding().is_owned_by(&c_node));
    assert_eq!(a_node.foreign_count(b), 1);
    assert_eq!(a_node.foreign_count(c), 1);

    bob_room.say(&CallContext::local(), "hi all".into())?;
    let heard = ("bob".to_string(), "hi all".to_string());
    assert_eq!(timeout(WAIT, bob_rx.recv()).await?, Some(heard.clone()));
    assert_eq!(timeout(WAIT, cat_rx.recv()).await?, Some(heard));

    assert_eq!(lobby.members.lock().unwrap().len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_connect_to_lost_peer_closes() -> anyhow::Result<()> {
    let mesh = Mesh::new();
    let (a, a_pump) = endpoint(&mesh);
    let (_b, b_pump) = endpoint(&mesh);
    let printer: Arc<dyn Printer> = Arc::new(Paper::default());
    a_pump.node().register("printer", printer)?;

    let b_node = b_pump.node().clone();
    let pending = tokio::spawn(async move {
        svcrun::connect::<dyn Printer>(&b_node, "printer", a).await.map(|_| ())
    });
    while b_pump.node().pending_slots() == 0 {
        tokio::task::yield_now().await;
    }

    mesh.disconnect(a)?;
    assert_eq!(b_pump.drain(), 1);
    assert_eq!(timeout(WAIT, pending).await??, Err(svcrun::Error::Closed));

    // `a` still sees the queued CONNECT, but its reply cannot leave.
    assert_eq!(a_pump.drain(), 1);
    assert_eq!(timeout(WAIT, a_pump.run()).await?, 0);
    Ok(())
}

#[tokio::test]
async fn test_peer_lost_discards_pending_callbacks() -> anyhow::Result<()> {
    let mesh = Mesh::new();
    let (a, a_pump) = endpoint(&mesh);
    let (_b, b_pump) = endpoint(&mesh);
    let paper = Arc::new(Paper::default());
    let printer: Arc<dyn Printer> = paper.clone();
    a_pump.node().register("printer", printer)?;

    let proxy = Arc::new(Mutex::new(None));
    let sink = proxy.clone();
    b_pump.node().connect::<dyn Printer>("printer", a, move |_cx, result| {
        *sink.lock().unwrap() = result.ok();
    })?;
    assert_eq!(a_pump.drain(), 1);
    assert_eq!(b_pump.drain(), 1);
    let proxy = proxy.lock().unwrap().take().expect("connect did not complete");

    let (done, rx) = svcrun::reply::<()>();
    proxy.print(&CallContext::local(), "last words".into(), done)?;

    mesh.disconnect(a)?;
    assert_eq!(b_pump.drain(), 1);
    assert_eq!(b_pump.node().pending_slots(), 0);
    assert_eq!(b_pump.node().foreign_count(a), 0);
    assert!(rx.await.is_err());

    assert_eq!(a_pump.drain(), 1);
    assert_eq!(*paper.lines.lock().unwrap(), vec!["last words".to_string()]);
    assert_eq!(b_pump.drain(), 0);
    Ok(())
}

#[tokio::test]
async fn test_shuffled_duplicate_returns_fire_once() -> anyhow::Result<()> {
    let mesh = Mesh::new();
    let (a, a_pump) = endpoint(&mesh);
    let (_b, b_pump) = endpoint(&mesh);
    let adder: Arc<dyn Adder> = Arc::new(Calculator::default());
    a_pump.node().register("adder", adder)?;

    let proxy = Arc::new(Mutex::new(None));
    let sink = proxy.clone();
    b_pump.node().connect::<dyn Adder>("adder", a, move |_cx, result| {
        *sink.lock().unwrap() = result.ok();
    })?;
    a_pump.drain();
    b_pump.drain();
    let proxy = proxy.lock().unwrap().take().expect("connect did not complete");

    let results = Arc::new(Mutex::new(Vec::new()));
    let calls = Arc::new(AtomicUsize::new(0));
    for i in 0..16 {
        let sink = results.clone();
        let calls = calls.clone();
        let reply = Callback::new(move |_cx: &CallContext, sum: i64| {
            calls.fetch_add(1, Ordering::SeqCst);
            sink.lock().unwrap().push(sum);
        });
        proxy.add(&CallContext::local(), i, 100, reply)?;
    }
    assert_eq!(a_pump.drain(), 16);

    let mut events = Vec::new();
    while let Some(event) = b_pump.inbox().try_recv() {
        events.push(event.clone());
        events.push(event.clone());
        events.push(event);
    }
    assert_eq!(events.len(), 48);
    events.shuffle(&mut StdRng::seed_from_u64(0x86));
    for event in events {
        b_pump.dispatch(event);
    }

    let mut sums = results.lock().unwrap().clone();
    sums.sort();
    assert_eq!(sums, (100..116).collect::<Vec<i64>>());
    assert_eq!(calls.load(Ordering::SeqCst), 16);
    assert_eq!(b_pump.node().pending_slots(), 0);
    Ok(())
}

#[tokio::test]
async fn test_foreign_traffic_is_skipped() -> anyhow::Result<()> {
    let mesh = Mesh::new();
    let (a, a_pump) = endpoint(&mesh);
    let (_b, b_transport, _b_inbox) = mesh.join();

    b_transport.send(a, vec![0x11, 0x22], Delivery::default())?;
    b_transport.send(a, vec![0x86, 4], Delivery::default())?;
    assert_eq!(a_pump.drain(), 2);
    assert_eq!(a_pump.node().service_count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_run_ends_when_inbox_closes() -> anyhow::Result<()> {
    let mesh = Mesh::new();
    let (a, a_pump) = endpoint(&mesh);
    let task = a_pump.spawn();

    mesh.disconnect(a)?;
    assert_eq!(timeout(WAIT, task).await??, 0);
    Ok(())
}
