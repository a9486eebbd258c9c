//! Live channel: one STOMP session over a WebSocket, multiplexing topic
//! subscriptions onto callbacks.

use std::{
    sync::{
        Arc, Weak,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    time::Duration,
};

use dashmap::DashMap;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
    time::{Instant, Interval, MissedTickBehavior, interval_at, sleep, timeout},
};
use tracing::{debug, error, info, warn};

mod error;
pub mod frame;
mod transport;

pub use self::{
    error::LiveError,
    frame::{Command, Frame, FrameError},
    transport::{Connector, TransportEvent, TransportHandle, WebSocketConnector},
};

/// Topic names published by the backend.
pub mod topics {
    use crate::dto::BoutId;

    /// Every bout change.
    pub const BOUTS: &str = "/topic/bouts";

    /// Changes to a single bout.
    pub fn bout(id: BoutId) -> String {
        format!("/topic/bout/{id}")
    }

    /// Score updates for a single bout.
    pub fn bout_scores(id: BoutId) -> String {
        format!("/topic/bout/{id}/scores")
    }
}

const ACCEPT_VERSION: &str = "1.2,1.1,1.0";

/// Settings for the live channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveConfig {
    /// Broker WebSocket endpoint.
    pub url: String,
    /// Bound on the whole handshake, transport open included.
    pub connect_timeout: Duration,
    /// Fixed delay between reconnect attempts; zero disables reconnection.
    pub reconnect_delay: Duration,
    /// Heartbeat interval we ask of the broker; zero disables.
    pub heartbeat_incoming: Duration,
    /// Heartbeat interval we offer to send; zero disables.
    pub heartbeat_outgoing: Duration,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            url: "ws://localhost:8081/ws/websocket".into(),
            connect_timeout: Duration::from_secs(5),
            reconnect_delay: Duration::from_secs(5),
            heartbeat_incoming: Duration::from_secs(4),
            heartbeat_outgoing: Duration::from_secs(4),
        }
    }
}

/// Message body handed to subscribers: JSON when it parses, raw text otherwise.
#[derive(Debug, Clone, PartialEq)]
pub enum LivePayload {
    /// Body parsed as JSON.
    Json(Value),
    /// Body that is not JSON, as received.
    Raw(String),
}

impl LivePayload {
    /// Parse a frame body, keeping the raw text when it is not JSON.
    pub fn parse(body: &str) -> Self {
        match serde_json::from_str(body) {
            Ok(value) => LivePayload::Json(value),
            Err(_) => LivePayload::Raw(body.to_owned()),
        }
    }

    /// Decode a JSON payload into `T`. Raw payloads never decode.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        match self {
            LivePayload::Json(value) => T::deserialize(value),
            LivePayload::Raw(text) => serde_json::from_str(text),
        }
    }

    /// JSON value of the payload; raw text becomes a JSON string.
    pub fn into_value(self) -> Value {
        match self {
            LivePayload::Json(value) => value,
            LivePayload::Raw(text) => Value::String(text),
        }
    }
}

/// Handle returned by [`LiveChannel::subscribe`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    /// Broker-side subscription id.
    pub id: String,
    /// Destination subscribed to.
    pub topic: String,
}

/// Connection state reported to watchers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// No session open.
    Disconnected,
    /// Handshake in progress, first connect or reconnect.
    Connecting,
    /// CONNECTED received; subscriptions may be made.
    Connected,
}

type Callback = Arc<dyn Fn(LivePayload) + Send + Sync>;

/// Heartbeat periods agreed with the broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Heartbeat {
    send: Option<Duration>,
    expect: Option<Duration>,
}

/// Combine our heart-beat offer with the broker's `heart-beat` header.
fn negotiate(config: &LiveConfig, server: Option<&str>) -> Heartbeat {
    let (sx, sy) = server
        .and_then(|raw| raw.split_once(','))
        .map(|(sx, sy)| {
            (
                sx.trim().parse::<u64>().unwrap_or(0),
                sy.trim().parse::<u64>().unwrap_or(0),
            )
        })
        .unwrap_or((0, 0));
    let pick = |ours: Duration, theirs: u64| {
        (!ours.is_zero() && theirs != 0).then(|| ours.max(Duration::from_millis(theirs)))
    };
    Heartbeat {
        send: pick(config.heartbeat_outgoing, sy),
        expect: pick(config.heartbeat_incoming, sx),
    }
}

fn error_message(frame: &Frame) -> String {
    frame
        .get("message")
        .map(str::to_owned)
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| frame.body.trim().to_owned())
}

struct Link {
    outbound: mpsc::UnboundedSender<String>,
    task: JoinHandle<()>,
    generation: u64,
}

struct Inner {
    config: LiveConfig,
    connector: Arc<dyn Connector>,
    link: Mutex<Option<Link>>,
    /// Latest subscription per topic.
    topics: DashMap<String, Subscription>,
    /// Callbacks per broker subscription id.
    handlers: DashMap<String, Callback>,
    next_subscription: AtomicU64,
    generation: AtomicU64,
    /// Cleared by `disconnect()`; stops reconnection.
    active: AtomicBool,
    status: watch::Sender<ConnectionStatus>,
    connect_gate: tokio::sync::Mutex<()>,
}

/// Shared handle on the live channel. Clones share one connection.
#[derive(Clone)]
pub struct LiveChannel {
    inner: Arc<Inner>,
}

impl LiveChannel {
    /// Channel over `connector`; nothing is opened until [`Self::connect`].
    pub fn new(config: LiveConfig, connector: Arc<dyn Connector>) -> Self {
        let (status, _rx) = watch::channel(ConnectionStatus::Disconnected);
        Self {
            inner: Arc::new(Inner {
                config,
                connector,
                link: Mutex::new(None),
                topics: DashMap::new(),
                handlers: DashMap::new(),
                next_subscription: AtomicU64::new(0),
                generation: AtomicU64::new(0),
                active: AtomicBool::new(false),
                status,
                connect_gate: tokio::sync::Mutex::new(()),
            }),
        }
    }

    /// Open the session. Resolves immediately when already connected.
    pub async fn connect(&self) -> Result<(), LiveError> {
        let _gate = self.inner.connect_gate.lock().await;
        if self.is_connected() {
            return Ok(());
        }

        self.inner.active.store(true, Ordering::SeqCst);
        self.inner.status.send_replace(ConnectionStatus::Connecting);
        match establish(&self.inner).await {
            Ok(()) => Ok(()),
            Err(err) => {
                self.inner.active.store(false, Ordering::SeqCst);
                self.inner.status.send_replace(ConnectionStatus::Disconnected);
                warn!(url = %self.inner.config.url, error = %err, "live channel connect failed");
                Err(err)
            }
        }
    }

    /// Whether a link is installed.
    pub fn is_connected(&self) -> bool {
        self.inner.link.lock().is_some()
    }

    /// Current connection status.
    pub fn status(&self) -> ConnectionStatus {
        *self.inner.status.borrow()
    }

    /// Watch connection status changes; resubscribe on `Connected`.
    pub fn status_watcher(&self) -> watch::Receiver<ConnectionStatus> {
        self.inner.status.subscribe()
    }

    /// Subscribe `callback` to `topic`. Returns `None` when not connected.
    ///
    /// Subscribing to a topic twice opens a second broker subscription; the
    /// first keeps delivering, but only the latest is tracked for the topic.
    pub fn subscribe<F>(&self, topic: &str, callback: F) -> Option<Subscription>
    where
        F: Fn(LivePayload) + Send + Sync + 'static,
    {
        let Some(outbound) = self.outbound() else {
            warn!(topic, "cannot subscribe: live channel not connected");
            return None;
        };

        let n = self.inner.next_subscription.fetch_add(1, Ordering::SeqCst);
        let id = format!("sub-{n}");
        self.inner.handlers.insert(id.clone(), Arc::new(callback));

        let frame = Frame::new(Command::Subscribe)
            .header("id", id.as_str())
            .header("destination", topic);
        if outbound.send(frame.encode()).is_err() {
            self.inner.handlers.remove(&id);
            warn!(topic, "cannot subscribe: live transport closed");
            return None;
        }

        let subscription = Subscription {
            id: id.clone(),
            topic: topic.to_owned(),
        };
        if let Some(previous) = self
            .inner
            .topics
            .insert(topic.to_owned(), subscription.clone())
        {
            debug!(topic, previous = %previous.id, "replacing tracked subscription");
        }
        info!(topic, id = %id, "subscribed");
        Some(subscription)
    }

    /// Drop the tracked subscription for `topic`. Returns whether one existed.
    pub fn unsubscribe(&self, topic: &str) -> bool {
        let Some((_, subscription)) = self.inner.topics.remove(topic) else {
            return false;
        };
        self.inner.handlers.remove(&subscription.id);
        if let Some(outbound) = self.outbound() {
            let frame = Frame::new(Command::Unsubscribe).header("id", subscription.id.as_str());
            let _ = outbound.send(frame.encode());
        }
        info!(topic, id = %subscription.id, "unsubscribed");
        true
    }

    /// Tracked subscription for `topic`, if any.
    pub fn subscription(&self, topic: &str) -> Option<Subscription> {
        self.inner.topics.get(topic).map(|entry| entry.value().clone())
    }

    /// Publish `payload` as JSON to `destination`. Does nothing when not connected.
    pub fn send<T: Serialize + ?Sized>(&self, destination: &str, payload: &T) {
        let Some(outbound) = self.outbound() else {
            debug!(destination, "dropping publish: live channel not connected");
            return;
        };
        let body = match serde_json::to_string(payload) {
            Ok(body) => body,
            Err(err) => {
                warn!(destination, error = %err, "failed to encode live payload");
                return;
            }
        };
        let frame = Frame::new(Command::Send)
            .header("destination", destination)
            .header("content-type", "application/json")
            .with_body(body);
        let _ = outbound.send(frame.encode());
    }

    /// Close the session and stop reconnecting. Every subscription is forgotten.
    pub fn disconnect(&self) {
        self.inner.active.store(false, Ordering::SeqCst);
        let link = self.inner.link.lock().take();
        if let Some(link) = link {
            for entry in self.inner.topics.iter() {
                let frame = Frame::new(Command::Unsubscribe).header("id", entry.value().id.as_str());
                let _ = link.outbound.send(frame.encode());
            }
            let _ = link.outbound.send(Frame::new(Command::Disconnect).encode());
            link.task.abort();
            info!(url = %self.inner.config.url, "live channel disconnected");
        }
        self.inner.forget_subscriptions();
        self.inner.status.send_replace(ConnectionStatus::Disconnected);
    }

    fn outbound(&self) -> Option<mpsc::UnboundedSender<String>> {
        self.inner
            .link
            .lock()
            .as_ref()
            .map(|link| link.outbound.clone())
    }
}

impl Inner {
    fn forget_subscriptions(&self) {
        self.topics.clear();
        self.handlers.clear();
    }

    fn handle_text(&self, text: &str) {
        let frames = match frame::decode(text) {
            Ok(frames) => frames,
            Err(err) => {
                warn!(error = %err, "dropping undecodable frame");
                return;
            }
        };

        for frame in frames {
            match frame.command {
                Command::Message => self.dispatch(&frame),
                Command::Error => {
                    error!(message = %error_message(&frame), "broker reported an error");
                }
                other => debug!(command = %other, "ignoring frame"),
            }
        }
    }

    fn dispatch(&self, frame: &Frame) {
        let Some(id) = frame.get("subscription") else {
            debug!("message without subscription header");
            return;
        };
        // Clone out so no map guard is held while the callback runs.
        let handler = self.handlers.get(id).map(|entry| entry.value().clone());
        match handler {
            Some(handler) => handler(LivePayload::parse(&frame.body)),
            None => debug!(id, "message for unknown subscription"),
        }
    }
}

/// Open a transport and exchange CONNECT/CONNECTED over it.
async fn handshake(inner: &Inner) -> Result<(TransportHandle, Frame), LiveError> {
    let config = &inner.config;
    let mut handle = inner.connector.open(&config.url).await?;
    let connect = Frame::new(Command::Connect)
        .header("accept-version", ACCEPT_VERSION)
        .header(
            "heart-beat",
            format!(
                "{},{}",
                config.heartbeat_outgoing.as_millis(),
                config.heartbeat_incoming.as_millis()
            ),
        );
    handle
        .outbound
        .send(connect.encode())
        .map_err(|_| LiveError::Closed)?;

    loop {
        match handle.inbound.recv().await {
            Some(TransportEvent::Text(text)) => {
                for frame in frame::decode(&text)? {
                    match frame.command {
                        Command::Connected => return Ok((handle, frame)),
                        Command::Error => return Err(LiveError::Broker(error_message(&frame))),
                        other => debug!(command = %other, "ignoring frame before CONNECTED"),
                    }
                }
            }
            Some(TransportEvent::Failed(reason)) => return Err(LiveError::Transport(reason)),
            Some(TransportEvent::Closed) | None => return Err(LiveError::Closed),
        }
    }
}

/// Run one handshake and install the resulting link.
async fn establish(inner: &Arc<Inner>) -> Result<(), LiveError> {
    let config = &inner.config;
    let (handle, connected) = timeout(config.connect_timeout, handshake(inner))
        .await
        .map_err(|_| LiveError::Timeout(config.connect_timeout))??;
    let heartbeat = negotiate(config, connected.get("heart-beat"));
    let generation = inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
    let TransportHandle { outbound, inbound } = handle;

    // Held across the spawn so a link that dies instantly still finds itself installed.
    let mut link = inner.link.lock();
    // `disconnect()` clears `active` before taking this lock.
    if !inner.active.load(Ordering::SeqCst) {
        drop(link);
        let _ = outbound.send(Frame::new(Command::Disconnect).encode());
        debug!(url = %config.url, "disconnected during handshake; dropping link");
        return Err(LiveError::Closed);
    }
    let task = tokio::spawn(run_link(
        Arc::downgrade(inner),
        inbound,
        outbound.clone(),
        heartbeat,
        generation,
    ));
    *link = Some(Link {
        outbound,
        task,
        generation,
    });
    inner.status.send_replace(ConnectionStatus::Connected);
    info!(
        url = %config.url,
        version = connected.get("version").unwrap_or("1.0"),
        heartbeat = ?heartbeat,
        "live channel connected"
    );
    Ok(())
}

async fn tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

fn periodic(period: Option<Duration>) -> Option<Interval> {
    period.map(|period| {
        let mut interval = interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval
    })
}

/// Reader loop for one link: dispatches frames, sends heartbeats and
/// watches for silence, then hands over to reconnection.
fn run_link(
    inner: Weak<Inner>,
    mut inbound: mpsc::UnboundedReceiver<TransportEvent>,
    outbound: mpsc::UnboundedSender<String>,
    heartbeat: Heartbeat,
    generation: u64,
) -> BoxFuture<'static, ()> {
    Box::pin(async move {
        let mut ping = periodic(heartbeat.send);
        let mut watchdog = periodic(heartbeat.expect);
        let mut last_seen = Instant::now();

        loop {
            tokio::select! {
                event = inbound.recv() => match event {
                    Some(TransportEvent::Text(text)) => {
                        last_seen = Instant::now();
                        let Some(inner) = inner.upgrade() else { return };
                        inner.handle_text(&text);
                    }
                    Some(TransportEvent::Failed(reason)) => {
                        warn!(reason = %reason, "live transport failed");
                        break;
                    }
                    Some(TransportEvent::Closed) | None => {
                        info!("live transport closed by peer");
                        break;
                    }
                },
                _ = tick(&mut ping) => {
                    if outbound.send(frame::HEARTBEAT.to_owned()).is_err() {
                        break;
                    }
                }
                _ = tick(&mut watchdog) => {
                    let limit = heartbeat.expect.unwrap_or_default() * 2;
                    if last_seen.elapsed() > limit {
                        warn!(silent_for = ?last_seen.elapsed(), "broker heartbeat missed");
                        break;
                    }
                }
            }
        }

        drop(outbound);
        link_lost(inner, generation).await;
    })
}

async fn link_lost(weak: Weak<Inner>, generation: u64) {
    let Some(inner) = weak.upgrade() else { return };
    {
        let mut link = inner.link.lock();
        match link.as_ref() {
            Some(current) if current.generation == generation => *link = None,
            // Superseded or closed on purpose.
            _ => return,
        }
    }
    inner.forget_subscriptions();
    inner.status.send_replace(ConnectionStatus::Disconnected);
    warn!(url = %inner.config.url, "live channel lost");

    let delay = inner.config.reconnect_delay;
    if delay.is_zero() {
        return;
    }
    drop(inner);

    let mut attempt = 0u32;
    loop {
        sleep(delay).await;
        let Some(inner) = weak.upgrade() else { return };
        if !inner.active.load(Ordering::SeqCst) {
            return;
        }
        let _gate = inner.connect_gate.lock().await;
        if !inner.active.load(Ordering::SeqCst) || inner.link.lock().is_some() {
            return;
        }

        attempt += 1;
        inner.status.send_replace(ConnectionStatus::Connecting);
        match establish(&inner).await {
            Ok(()) => {
                info!(attempt, "live channel reconnected");
                return;
            }
            Err(err) => {
                inner.status.send_replace(ConnectionStatus::Disconnected);
                warn!(attempt, error = %err, retry_in = ?delay, "live reconnect failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::sync::mpsc;

    use super::*;
    use crate::test_support::{BrokerMode, MemoryBroker, eventually, recv_within, within};

    fn channel_with(broker: &MemoryBroker, reconnect_delay: Duration) -> LiveChannel {
        let config = LiveConfig {
            url: "memory://broker".into(),
            connect_timeout: Duration::from_millis(300),
            reconnect_delay,
            ..LiveConfig::default()
        };
        LiveChannel::new(config, Arc::new(broker.clone()))
    }

    fn heartbeat_channel(
        broker: &MemoryBroker,
        incoming: Duration,
        outgoing: Duration,
        reconnect_delay: Duration,
    ) -> LiveChannel {
        let config = LiveConfig {
            url: "memory://broker".into(),
            connect_timeout: Duration::from_millis(300),
            reconnect_delay,
            heartbeat_incoming: incoming,
            heartbeat_outgoing: outgoing,
        };
        LiveChannel::new(config, Arc::new(broker.clone()))
    }

    fn collector() -> (
        impl Fn(LivePayload) + Send + Sync + 'static,
        mpsc::UnboundedReceiver<LivePayload>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            move |payload| {
                let _ = tx.send(payload);
            },
            rx,
        )
    }

    #[test]
    fn heartbeat_negotiation_takes_the_slower_side_and_zero_disables() {
        let config = LiveConfig::default();
        assert_eq!(
            negotiate(&config, Some("10000,1000")),
            Heartbeat {
                send: Some(Duration::from_secs(4)),
                expect: Some(Duration::from_secs(10)),
            }
        );
        assert_eq!(
            negotiate(&config, Some("0,0")),
            Heartbeat {
                send: None,
                expect: None
            }
        );
        assert_eq!(
            negotiate(&config, None),
            Heartbeat {
                send: None,
                expect: None
            }
        );
    }

    #[test]
    fn payloads_fall_back_to_raw_text() {
        assert_eq!(
            LivePayload::parse(r#"{"id": 4}"#),
            LivePayload::Json(serde_json::json!({"id": 4}))
        );
        assert_eq!(
            LivePayload::parse("round over"),
            LivePayload::Raw("round over".into())
        );
        assert!(LivePayload::Raw("x".into()).decode::<Value>().is_err());
    }

    #[tokio::test]
    async fn subscribe_and_send_before_connect_do_nothing() {
        let broker = MemoryBroker::new();
        let channel = channel_with(&broker, Duration::ZERO);

        assert_eq!(channel.subscribe(topics::BOUTS, |_| {}), None);
        channel.send("/app/ping", &serde_json::json!({"a": 1}));
        assert!(!channel.unsubscribe(topics::BOUTS));
        assert_eq!(broker.connections(), 0);
        assert!(broker.frames().is_empty());
    }

    #[tokio::test]
    async fn connect_performs_handshake_once() {
        let broker = MemoryBroker::new();
        let channel = channel_with(&broker, Duration::ZERO);
        let status = channel.status_watcher();

        channel.connect().await.unwrap();
        channel.connect().await.unwrap();

        assert_eq!(broker.connections(), 1);
        assert_eq!(*status.borrow(), ConnectionStatus::Connected);
        let connect = &broker.frames()[0];
        assert_eq!(connect.command, Command::Connect);
        assert_eq!(connect.get("accept-version"), Some("1.2,1.1,1.0"));
        assert_eq!(connect.get("heart-beat"), Some("4000,4000"));
    }

    #[tokio::test]
    async fn handshake_failures_reject_connect() {
        let broker = MemoryBroker::new();
        let channel = channel_with(&broker, Duration::ZERO);

        broker.set_mode(BrokerMode::Reject("bad credentials".into()));
        assert!(matches!(
            channel.connect().await,
            Err(LiveError::Broker(message)) if message == "bad credentials"
        ));

        broker.set_mode(BrokerMode::Silent);
        assert!(matches!(channel.connect().await, Err(LiveError::Timeout(_))));

        broker.set_mode(BrokerMode::Refuse);
        assert!(matches!(channel.connect().await, Err(LiveError::Transport(_))));

        assert!(!channel.is_connected());
        assert_eq!(channel.status(), ConnectionStatus::Disconnected);
    }

    #[tokio::test]
    async fn messages_reach_the_subscriber_parsed_or_raw() {
        let broker = MemoryBroker::new();
        let channel = channel_with(&broker, Duration::ZERO);
        channel.connect().await.unwrap();

        let (callback, mut rx) = collector();
        let subscription = channel.subscribe("/topic/bout/3", callback).unwrap();
        assert_eq!(subscription.topic, "/topic/bout/3");
        eventually(|| broker.subscriptions().len() == 1).await;

        broker.publish("/topic/bout/3", r#"{"id":3,"status":"LIVE"}"#);
        broker.publish("/topic/bout/3", "not json");

        assert_eq!(
            recv_within(&mut rx).await,
            LivePayload::Json(serde_json::json!({"id": 3, "status": "LIVE"}))
        );
        assert_eq!(recv_within(&mut rx).await, LivePayload::Raw("not json".into()));
    }

    #[tokio::test]
    async fn second_subscribe_replaces_bookkeeping_but_both_deliver() {
        let broker = MemoryBroker::new();
        let channel = channel_with(&broker, Duration::ZERO);
        channel.connect().await.unwrap();

        let (first_cb, mut first) = collector();
        let (second_cb, mut second) = collector();
        let a = channel.subscribe(topics::BOUTS, first_cb).unwrap();
        let b = channel.subscribe(topics::BOUTS, second_cb).unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(channel.subscription(topics::BOUTS), Some(b.clone()));

        eventually(|| broker.subscriptions().len() == 2).await;
        broker.publish(topics::BOUTS, "1");
        assert_eq!(recv_within(&mut first).await, LivePayload::Json(1.into()));
        assert_eq!(recv_within(&mut second).await, LivePayload::Json(1.into()));

        assert!(channel.unsubscribe(topics::BOUTS));
        eventually(|| broker.subscriptions() == vec![(a.id.clone(), topics::BOUTS.to_owned())])
            .await;
    }

    #[tokio::test]
    async fn dropped_link_reconnects_without_restoring_subscriptions() {
        let broker = MemoryBroker::new();
        let channel = channel_with(&broker, Duration::from_millis(30));
        channel.connect().await.unwrap();
        channel.subscribe(topics::BOUTS, |_| {}).unwrap();
        let mut status = channel.status_watcher();
        status.borrow_and_update();

        broker.drop_connection();

        status.changed().await.unwrap();
        assert_eq!(*status.borrow_and_update(), ConnectionStatus::Disconnected);
        assert_eq!(channel.subscription(topics::BOUTS), None);

        eventually(|| channel.status() == ConnectionStatus::Connected).await;
        assert_eq!(broker.connections(), 2);
        assert_eq!(channel.subscription(topics::BOUTS), None);
        assert!(broker.subscriptions().is_empty());
        channel.disconnect();
    }

    #[tokio::test]
    async fn disconnect_unsubscribes_and_stops_reconnecting() {
        let broker = MemoryBroker::new();
        let channel = channel_with(&broker, Duration::from_millis(20));
        channel.connect().await.unwrap();
        let subscription = channel.subscribe(topics::BOUTS, |_| {}).unwrap();

        channel.disconnect();
        assert!(!channel.is_connected());
        assert_eq!(channel.subscription(topics::BOUTS), None);

        eventually(|| {
            broker
                .commands()
                .ends_with(&[Command::Unsubscribe, Command::Disconnect])
        })
        .await;
        let unsubscribe = broker
            .frames()
            .into_iter()
            .find(|frame| frame.command == Command::Unsubscribe)
            .unwrap();
        assert_eq!(unsubscribe.get("id"), Some(subscription.id.as_str()));

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(broker.connections(), 1);
        channel.send("/app/ping", "late");
        assert_eq!(broker.commands().last(), Some(&Command::Disconnect));
    }

    #[tokio::test]
    async fn heartbeats_go_out_at_the_negotiated_interval() {
        let broker = MemoryBroker::new();
        broker.set_heart_beat("0,30");
        let channel = heartbeat_channel(&broker, Duration::ZERO, Duration::from_millis(30), Duration::ZERO);
        channel.connect().await.unwrap();
        assert_eq!(broker.frames()[0].get("heart-beat"), Some("30,0"));

        eventually(|| broker.heartbeats() >= 3).await;
        assert!(channel.is_connected());
        assert_eq!(broker.commands(), vec![Command::Connect]);
        channel.disconnect();
    }

    #[tokio::test]
    async fn silent_broker_is_declared_dead_and_reconnected() {
        let broker = MemoryBroker::new();
        broker.set_heart_beat("40,0");
        let channel = heartbeat_channel(
            &broker,
            Duration::from_millis(40),
            Duration::ZERO,
            Duration::from_millis(30),
        );
        channel.connect().await.unwrap();
        let mut status = channel.status_watcher();
        status.borrow_and_update();

        // Nothing arrives; after twice the incoming interval the link is dropped.
        within(status.changed()).await.unwrap();
        assert_eq!(*status.borrow_and_update(), ConnectionStatus::Disconnected);
        assert_eq!(broker.connections(), 1);

        eventually(|| broker.connections() >= 2).await;
        channel.disconnect();
    }

    #[tokio::test]
    async fn traffic_keeps_the_watchdog_quiet() {
        let broker = MemoryBroker::new();
        broker.set_heart_beat("40,0");
        let channel = heartbeat_channel(
            &broker,
            Duration::from_millis(40),
            Duration::ZERO,
            Duration::ZERO,
        );
        channel.connect().await.unwrap();
        channel.subscribe(topics::BOUTS, |_| {}).unwrap();
        eventually(|| broker.subscriptions().len() == 1).await;

        for _ in 0..6 {
            broker.publish(topics::BOUTS, "{}");
            tokio::time::sleep(Duration::from_millis(30)).await;
        }
        assert!(channel.is_connected());
        assert_eq!(broker.connections(), 1);
        channel.disconnect();
    }

    #[tokio::test]
    async fn disconnect_during_handshake_leaves_channel_closed() {
        let broker = MemoryBroker::new();
        broker.set_mode(BrokerMode::Silent);
        let channel = channel_with(&broker, Duration::from_millis(20));

        let pending = tokio::spawn({
            let channel = channel.clone();
            async move { channel.connect().await }
        });
        eventually(|| broker.commands().contains(&Command::Connect)).await;

        channel.disconnect();
        broker.send_connected();

        let result = within(pending).await.unwrap();
        assert!(matches!(result, Err(LiveError::Closed)));
        assert!(!channel.is_connected());
        assert_eq!(channel.status(), ConnectionStatus::Disconnected);
        eventually(|| broker.commands().last() == Some(&Command::Disconnect)).await;

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(broker.connections(), 1);
    }
}
