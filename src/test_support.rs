//! Fixtures shared by the unit tests: a stub REST backend, an in-memory
//! STOMP broker and a few async helpers.

use std::{
    future::Future,
    net::SocketAddr,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use futures::future::BoxFuture;
use parking_lot::Mutex;
use tokio::{net::TcpListener, sync::mpsc};

use crate::{
    live::{Command, Connector, Frame, LiveError, TransportEvent, TransportHandle, frame},
    routes::Navigator,
};

/// Serve `router` on an ephemeral local port and return its origin.
pub async fn spawn_backend(router: axum::Router) -> String {
    let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
        .await
        .expect("bind stub backend");
    let addr = listener.local_addr().expect("stub backend address");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("stub backend");
    });
    format!("http://{addr}")
}

/// Poll `check` until it holds, failing the test after two seconds.
pub async fn eventually<F: FnMut() -> bool>(mut check: F) {
    for _ in 0..200 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached in time");
}

/// Next value from `rx`, failing the test after two seconds.
pub async fn recv_within<T>(rx: &mut mpsc::UnboundedReceiver<T>) -> T {
    within(rx.recv()).await.expect("channel closed")
}

/// Await `future`, failing the test after two seconds.
pub async fn within<F: Future>(future: F) -> F::Output {
    tokio::time::timeout(Duration::from_secs(2), future)
        .await
        .expect("timed out")
}

/// Navigator that only counts redirects.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    redirects: AtomicUsize,
}

impl RecordingNavigator {
    pub fn redirects(&self) -> usize {
        self.redirects.load(Ordering::SeqCst)
    }
}

impl Navigator for RecordingNavigator {
    fn redirect_to_login(&self) {
        self.redirects.fetch_add(1, Ordering::SeqCst);
    }
}

/// How the in-memory broker answers a CONNECT.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrokerMode {
    Accept,
    Reject(String),
    /// Never answers.
    Silent,
    /// Fails to open the transport at all.
    Refuse,
}

#[derive(Debug)]
struct BrokerState {
    mode: BrokerMode,
    /// `heart-beat` header sent back in CONNECTED.
    heart_beat: String,
    /// Bare EOL heartbeats received from clients.
    heartbeats: usize,
    frames: Vec<Frame>,
    /// Subscriptions on the current connection: (id, destination).
    subscriptions: Vec<(String, String)>,
    peer: Option<mpsc::UnboundedSender<TransportEvent>>,
}

/// STOMP broker living in process memory, used as a [`Connector`].
#[derive(Debug, Clone)]
pub struct MemoryBroker {
    state: Arc<Mutex<BrokerState>>,
    connections: Arc<AtomicUsize>,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(BrokerState {
                mode: BrokerMode::Accept,
                heart_beat: "0,0".into(),
                heartbeats: 0,
                frames: Vec::new(),
                subscriptions: Vec::new(),
                peer: None,
            })),
            connections: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn set_mode(&self, mode: BrokerMode) {
        self.state.lock().mode = mode;
    }

    /// Heart-beat offer (`cx,cy` in ms) returned with CONNECTED.
    pub fn set_heart_beat(&self, heart_beat: &str) {
        self.state.lock().heart_beat = heart_beat.to_owned();
    }

    /// Heartbeats received so far, across connections.
    pub fn heartbeats(&self) -> usize {
        self.state.lock().heartbeats
    }

    /// Answer a CONNECT still waiting on the current transport.
    pub fn send_connected(&self) {
        let state = self.state.lock();
        if let Some(peer) = state.peer.as_ref() {
            let _ = peer.send(TransportEvent::Text(connected_frame(&state).encode()));
        }
    }

    /// Transports opened so far, refused ones included.
    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    /// Every frame received from clients, in order.
    pub fn frames(&self) -> Vec<Frame> {
        self.state.lock().frames.clone()
    }

    pub fn commands(&self) -> Vec<Command> {
        self.state
            .lock()
            .frames
            .iter()
            .map(|frame| frame.command)
            .collect()
    }

    pub fn subscriptions(&self) -> Vec<(String, String)> {
        self.state.lock().subscriptions.clone()
    }

    /// Deliver `body` to every subscription on `destination`.
    pub fn publish(&self, destination: &str, body: &str) {
        let state = self.state.lock();
        let Some(peer) = state.peer.as_ref() else {
            return;
        };
        for (id, _) in state
            .subscriptions
            .iter()
            .filter(|(_, topic)| topic == destination)
        {
            let message = Frame::new(Command::Message)
                .header("destination", destination)
                .header("subscription", id.as_str())
                .header("message-id", format!("m-{id}"))
                .with_body(body);
            let _ = peer.send(TransportEvent::Text(message.encode()));
        }
    }

    /// Fail the current transport as a network drop would.
    pub fn drop_connection(&self) {
        let mut state = self.state.lock();
        state.subscriptions.clear();
        if let Some(peer) = state.peer.take() {
            let _ = peer.send(TransportEvent::Failed("connection reset".into()));
        }
    }

    fn receive(&self, text: &str, reply: &mpsc::UnboundedSender<TransportEvent>) {
        let mut state = self.state.lock();
        if !text.is_empty() && text.trim_matches(['\r', '\n']).is_empty() {
            state.heartbeats += 1;
            return;
        }
        let frames = frame::decode(text).unwrap_or_default();
        for frame in frames {
            match frame.command {
                Command::Connect | Command::Stomp => match &state.mode {
                    BrokerMode::Accept => {
                        let _ = reply.send(TransportEvent::Text(connected_frame(&state).encode()));
                    }
                    BrokerMode::Reject(message) => {
                        let error = Frame::new(Command::Error).header("message", message.as_str());
                        let _ = reply.send(TransportEvent::Text(error.encode()));
                    }
                    BrokerMode::Silent | BrokerMode::Refuse => {}
                },
                Command::Subscribe => {
                    if let (Some(id), Some(destination)) = (frame.get("id"), frame.get("destination")) {
                        state
                            .subscriptions
                            .push((id.to_owned(), destination.to_owned()));
                    }
                }
                Command::Unsubscribe => {
                    if let Some(id) = frame.get("id") {
                        state.subscriptions.retain(|(existing, _)| existing != id);
                    }
                }
                _ => {}
            }
            state.frames.push(frame);
        }
    }
}

fn connected_frame(state: &BrokerState) -> Frame {
    Frame::new(Command::Connected)
        .header("version", "1.2")
        .header("heart-beat", state.heart_beat.as_str())
}

impl Connector for MemoryBroker {
    fn open(&self, _url: &str) -> BoxFuture<'static, Result<TransportHandle, LiveError>> {
        let broker = self.clone();
        Box::pin(async move {
            broker.connections.fetch_add(1, Ordering::SeqCst);
            if broker.state.lock().mode == BrokerMode::Refuse {
                return Err(LiveError::Transport("connection refused".into()));
            }

            let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<String>();
            let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
            {
                let mut state = broker.state.lock();
                state.subscriptions.clear();
                state.peer = Some(inbound_tx.clone());
            }

            tokio::spawn(async move {
                while let Some(text) = outbound_rx.recv().await {
                    broker.receive(&text, &inbound_tx);
                }
            });

            Ok(TransportHandle {
                outbound: outbound_tx,
                inbound: inbound_rx,
            })
        })
    }
}
