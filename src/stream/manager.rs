// =============================================================================
// StreamSubscriptionManager — one multiplexed ticker connection
// =============================================================================
//
// Any number of callers subscribe to per-market topics; all of them share a
// single transport connection. The manager owns the reconnect cycle:
//
//   Disconnected --connect()--> Connecting --open--> Connected
//   Connecting | Connected --close/error--> ReconnectPending   (attempts < max)
//                                       \-> Failed             (attempts >= max)
//   ReconnectPending --timer(base * 2^attempts)--> Connecting  (attempts += 1)
//   any --disconnect()--> Disconnected
//
// Each connection instance is driven by exactly one spawned task which sends
// a subscribe frame for every live topic before it reads the first inbound
// message. Timers and drivers carry the generation they were spawned for;
// anything older than the current generation is ignored.
//
// Registry and state live behind one parking_lot mutex. Callbacks are cloned
// out and invoked with the lock released.
// =============================================================================

use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

use super::protocol::{parse_inbound, ControlMessage, PriceUpdate};
use super::transport::{Transport, TransportEvent, TransportHandle};
use crate::error::EngineError;
use crate::types::{ConnectionState, ConnectionStatus};

/// Reconnect policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamConfig {
    pub base_delay: Duration,
    pub max_attempts: u32,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(1_000),
            max_attempts: 5,
        }
    }
}

/// Delay before reconnect attempt number `attempts + 1`.
pub fn backoff_delay(base: Duration, attempts: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempts))
}

pub type PriceCallback = Arc<dyn Fn(&PriceUpdate) + Send + Sync>;

struct Subscriber {
    id: u64,
    callback: PriceCallback,
}

#[derive(Default)]
struct ManagerState {
    connection: ConnectionState,
    reconnect_attempts: u32,
    generation: u64,
    next_subscription_id: u64,
    topics: BTreeMap<String, Vec<Subscriber>>,
    outbound: Option<mpsc::UnboundedSender<String>>,
    driver: Option<JoinHandle<()>>,
    reconnect_timer: Option<JoinHandle<()>>,
}

impl ManagerState {
    fn send_control(&self, message: ControlMessage) {
        let Some(outbound) = &self.outbound else {
            return;
        };
        match message.encode() {
            Ok(text) => {
                if outbound.send(text).is_err() {
                    debug!(market = %message.market, "outbound closed; control frame dropped");
                }
            }
            Err(e) => warn!(error = %e, "failed to encode control frame"),
        }
    }
}

struct Inner {
    transport: Arc<dyn Transport>,
    config: StreamConfig,
    state: Mutex<ManagerState>,
}

impl Inner {
    fn connect_locked(self: &Arc<Self>, state: &mut ManagerState) {
        match state.connection {
            ConnectionState::Connecting | ConnectionState::Connected => return,
            ConnectionState::Failed => state.reconnect_attempts = 0,
            ConnectionState::ReconnectPending => {
                if let Some(timer) = state.reconnect_timer.take() {
                    timer.abort();
                }
            }
            ConnectionState::Disconnected => {}
        }
        self.start_attempt(state);
    }

    fn start_attempt(self: &Arc<Self>, state: &mut ManagerState) {
        state.connection = ConnectionState::Connecting;
        state.generation += 1;
        let generation = state.generation;
        debug!(generation, attempt = state.reconnect_attempts, "opening price stream");
        state.driver = Some(tokio::spawn(Self::drive(self.clone(), generation)));
    }

    /// Runs one connection instance from open to close.
    async fn drive(self: Arc<Self>, generation: u64) {
        let TransportHandle { outbound, mut inbound } = match self.transport.open().await {
            Ok(handle) => handle,
            Err(e) => {
                warn!(error = %e, "price stream connect failed");
                self.handle_drop(generation);
                return;
            }
        };

        {
            let mut state = self.state.lock();
            if state.generation != generation {
                return;
            }
            state.connection = ConnectionState::Connected;
            state.reconnect_attempts = 0;
            state.outbound = Some(outbound);
            for topic in state.topics.keys() {
                state.send_control(ControlMessage::subscribe(topic));
            }
            info!(topics = state.topics.len(), "price stream live; topics resubscribed");
        }

        let reason = loop {
            match inbound.recv().await {
                Some(TransportEvent::Message(text)) => self.dispatch(&text),
                Some(TransportEvent::Error(e)) => break EngineError::StreamTransport(e),
                Some(TransportEvent::Closed) | None => {
                    break EngineError::StreamTransport("connection closed".into())
                }
            }
        };
        warn!(error = %reason, "price stream dropped");
        self.handle_drop(generation);
    }

    fn handle_drop(self: &Arc<Self>, generation: u64) {
        let mut state = self.state.lock();
        if state.generation != generation {
            return;
        }
        state.outbound = None;

        if state.reconnect_attempts >= self.config.max_attempts {
            state.connection = ConnectionState::Failed;
            let err = EngineError::MaxReconnectExceeded(state.reconnect_attempts);
            error!(error = %err, "price stream giving up; call connect() to retry");
            return;
        }

        state.connection = ConnectionState::ReconnectPending;
        let delay = backoff_delay(self.config.base_delay, state.reconnect_attempts);
        info!(
            delay_ms = delay.as_millis() as u64,
            attempt = state.reconnect_attempts + 1,
            max = self.config.max_attempts,
            "price stream reconnect scheduled"
        );

        let inner = self.clone();
        state.reconnect_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            inner.fire_reconnect(generation);
        }));
    }

    fn fire_reconnect(self: &Arc<Self>, generation: u64) {
        let mut state = self.state.lock();
        if state.generation != generation || state.connection != ConnectionState::ReconnectPending {
            return;
        }
        // This task is the timer; release the handle without aborting it.
        state.reconnect_timer = None;
        state.reconnect_attempts += 1;
        self.start_attempt(&mut state);
    }

    fn dispatch(&self, text: &str) {
        let update = match parse_inbound(text) {
            Ok(Some(update)) => update,
            Ok(None) => return,
            Err(e) => {
                trace!(error = %e, "discarding stream frame");
                return;
            }
        };

        let callbacks: Vec<PriceCallback> = {
            let state = self.state.lock();
            match state.topics.get(&update.market) {
                Some(subscribers) => subscribers.iter().map(|s| s.callback.clone()).collect(),
                None => return,
            }
        };

        for callback in callbacks {
            if panic::catch_unwind(AssertUnwindSafe(|| callback(&update))).is_err() {
                error!(market = %update.market, "price subscriber panicked");
            }
        }
    }

    fn disconnect(&self) {
        let mut state = self.state.lock();
        if let Some(timer) = state.reconnect_timer.take() {
            timer.abort();
        }
        if let Some(driver) = state.driver.take() {
            driver.abort();
        }
        // Dropping the last sender closes the socket's write half.
        state.outbound = None;
        state.topics.clear();
        state.connection = ConnectionState::Disconnected;
        state.reconnect_attempts = 0;
        state.generation += 1;
    }
}

// ---------------------------------------------------------------------------
// Public handle
// ---------------------------------------------------------------------------

/// Must be used from within a tokio runtime: `connect` and `subscribe`
/// spawn the connection task.
pub struct StreamSubscriptionManager {
    inner: Arc<Inner>,
}

impl StreamSubscriptionManager {
    pub fn new(transport: Arc<dyn Transport>, config: StreamConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                transport,
                config,
                state: Mutex::new(ManagerState::default()),
            }),
        }
    }

    /// Start connecting unless already connecting or connected. A pending
    /// reconnect timer is cancelled and the attempt made now. From `Failed`
    /// the attempt counter restarts at zero, so a full reconnect budget is
    /// available again (rather than a single retry).
    pub fn connect(&self) {
        let mut state = self.inner.state.lock();
        self.inner.connect_locked(&mut state);
    }

    /// Register `callback` for ticks on `topic` (a market name).
    pub fn subscribe<F>(&self, topic: impl Into<String>, callback: F) -> Subscription
    where
        F: Fn(&PriceUpdate) + Send + Sync + 'static,
    {
        let topic = topic.into();
        let mut state = self.inner.state.lock();
        state.next_subscription_id += 1;
        let id = state.next_subscription_id;

        let subscribers = state.topics.entry(topic.clone()).or_default();
        let first = subscribers.is_empty();
        subscribers.push(Subscriber {
            id,
            callback: Arc::new(callback),
        });

        match state.connection {
            ConnectionState::Connected if first => {
                state.send_control(ControlMessage::subscribe(&topic));
            }
            ConnectionState::Disconnected
            | ConnectionState::ReconnectPending
            | ConnectionState::Failed => {
                self.inner.connect_locked(&mut state);
            }
            _ => {}
        }
        debug!(topic = %topic, id, first, "price subscription added");

        Subscription {
            topic,
            id,
            inner: Arc::downgrade(&self.inner),
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        self.state().into()
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.state.lock().connection
    }

    pub fn reconnect_attempts(&self) -> u32 {
        self.inner.state.lock().reconnect_attempts
    }

    pub fn active_topics(&self) -> Vec<String> {
        self.inner.state.lock().topics.keys().cloned().collect()
    }

    /// `Err(MaxReconnectExceeded)` once the reconnect budget is spent.
    pub fn check_health(&self) -> Result<(), EngineError> {
        let state = self.inner.state.lock();
        match state.connection {
            ConnectionState::Failed => Err(EngineError::MaxReconnectExceeded(state.reconnect_attempts)),
            _ => Ok(()),
        }
    }

    /// Cancel any pending reconnect, close the connection and forget every
    /// subscription.
    pub fn disconnect(&self) {
        self.inner.disconnect();
        info!("price stream disconnected");
    }
}

impl Drop for StreamSubscriptionManager {
    fn drop(&mut self) {
        self.inner.disconnect();
    }
}

impl std::fmt::Debug for StreamSubscriptionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("StreamSubscriptionManager")
            .field("connection", &state.connection)
            .field("reconnect_attempts", &state.reconnect_attempts)
            .field("topics", &state.topics.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Handle returned by `subscribe`. Dropping it keeps the callback registered.
#[derive(Debug)]
pub struct Subscription {
    topic: String,
    id: u64,
    inner: Weak<Inner>,
}

impl Subscription {
    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn unsubscribe(self) {
        let Some(inner) = self.inner.upgrade() else {
            return;
        };
        let mut state = inner.state.lock();
        let Some(subscribers) = state.topics.get_mut(&self.topic) else {
            return;
        };
        subscribers.retain(|s| s.id != self.id);
        if !subscribers.is_empty() {
            return;
        }

        state.topics.remove(&self.topic);
        if state.connection == ConnectionState::Connected {
            state.send_control(ControlMessage::unsubscribe(&self.topic));
        }
        debug!(topic = %self.topic, "last price subscriber removed");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineResult;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use tokio::time::Instant;

    #[derive(Default)]
    struct MockTransport {
        failing: AtomicBool,
        opens: Mutex<Vec<Instant>>,
        preload: Mutex<Vec<String>>,
        connections: Mutex<Vec<mpsc::UnboundedSender<TransportEvent>>>,
        outbound: Mutex<Vec<mpsc::UnboundedReceiver<String>>>,
        journal: Mutex<Vec<String>>,
    }

    impl MockTransport {
        fn failing() -> Arc<Self> {
            let mock = Self::default();
            mock.failing.store(true, Ordering::SeqCst);
            Arc::new(mock)
        }

        fn healthy() -> Arc<Self> {
            Arc::new(Self::default())
        }

        fn open_count(&self) -> usize {
            self.opens.lock().len()
        }

        /// Frames delivered right after the next successful open.
        fn preload_next(&self, text: &str) {
            self.preload.lock().push(text.to_string());
        }

        fn push(&self, event: TransportEvent) {
            if let Some(tx) = self.connections.lock().last() {
                let _ = tx.send(event);
            }
        }

        /// Move every outbound frame into the journal as "<type> <market>".
        fn drain_sent(&self) {
            let mut outbound = self.outbound.lock();
            for rx in outbound.iter_mut() {
                while let Ok(text) = rx.try_recv() {
                    let v: serde_json::Value = serde_json::from_str(&text).unwrap();
                    self.journal.lock().push(format!(
                        "{} {}",
                        v["type"].as_str().unwrap(),
                        v["market"].as_str().unwrap()
                    ));
                }
            }
        }

        fn journal(&self) -> Vec<String> {
            self.drain_sent();
            self.journal.lock().clone()
        }

        fn clear_journal(&self) {
            self.drain_sent();
            self.journal.lock().clear();
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn open(&self) -> EngineResult<TransportHandle> {
            self.opens.lock().push(Instant::now());
            if self.failing.load(Ordering::SeqCst) {
                return Err(EngineError::StreamTransport("refused".into()));
            }
            let (out_tx, out_rx) = mpsc::unbounded_channel();
            let (in_tx, in_rx) = mpsc::unbounded_channel();
            for text in self.preload.lock().drain(..) {
                let _ = in_tx.send(TransportEvent::Message(text));
            }
            self.connections.lock().push(in_tx);
            self.outbound.lock().push(out_rx);
            Ok(TransportHandle {
                outbound: out_tx,
                inbound: in_rx,
            })
        }
    }

    fn manager(transport: Arc<MockTransport>) -> StreamSubscriptionManager {
        let config = StreamConfig {
            base_delay: Duration::from_millis(100),
            max_attempts: 3,
        };
        StreamSubscriptionManager::new(transport, config)
    }

    fn ticker(market: &str, price: f64) -> TransportEvent {
        TransportEvent::Message(format!(
            r#"{{"type":"ticker","market":"{market}","price":{price},"timestamp":1}}"#
        ))
    }

    /// Let spawned tasks run; the paused clock advances only when idle.
    async fn settle() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    fn counter() -> (Arc<AtomicUsize>, impl Fn(&PriceUpdate) + Send + Sync + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        (count, move |_: &PriceUpdate| {
            c.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn backoff_doubles_per_attempt() {
        let base = Duration::from_millis(1_000);
        assert_eq!(backoff_delay(base, 0), Duration::from_millis(1_000));
        assert_eq!(backoff_delay(base, 1), Duration::from_millis(2_000));
        assert_eq!(backoff_delay(base, 2), Duration::from_millis(4_000));
        assert_eq!(backoff_delay(Duration::MAX, 1), Duration::MAX);
    }

    #[tokio::test(start_paused = true)]
    async fn reconnects_with_exponential_backoff_then_fails() {
        let mock = MockTransport::failing();
        let mgr = manager(mock.clone());

        mgr.connect();
        tokio::time::sleep(Duration::from_secs(10)).await;

        let opens = mock.opens.lock().clone();
        assert_eq!(opens.len(), 4, "initial attempt plus three retries");
        let gaps: Vec<u128> = opens.windows(2).map(|w| (w[1] - w[0]).as_millis()).collect();
        for (gap, expected) in gaps.iter().zip([100u128, 200, 400]) {
            assert!(
                *gap >= expected && *gap < expected + 10,
                "gap {gap}ms, expected {expected}ms"
            );
        }

        assert_eq!(mgr.state(), ConnectionState::Failed);
        assert_eq!(mgr.status(), ConnectionStatus { connected: false, connecting: false });
        assert!(matches!(mgr.check_health(), Err(EngineError::MaxReconnectExceeded(3))));

        // Terminal: no more automatic retries.
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(mock.open_count(), 4);

        // An explicit connect starts a fresh cycle.
        mgr.connect();
        assert_eq!(mgr.state(), ConnectionState::Connecting);
        assert_eq!(mgr.reconnect_attempts(), 0);
        settle().await;
        assert_eq!(mock.open_count(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn resubscribes_every_topic_before_dispatching() {
        let mock = MockTransport::healthy();
        let mgr = manager(mock.clone());

        let m = mock.clone();
        let _btc = mgr.subscribe("BTC-PERP", move |u: &PriceUpdate| {
            m.drain_sent();
            m.journal.lock().push(format!("tick {}", u.market));
        });
        let _eth = mgr.subscribe("ETH-PERP", |_: &PriceUpdate| {});
        settle().await;
        assert_eq!(mgr.state(), ConnectionState::Connected);
        assert_eq!(mock.journal(), vec!["subscribe BTC-PERP", "subscribe ETH-PERP"]);
        mock.clear_journal();

        // The next connection has a tick waiting before we even subscribe.
        mock.preload_next(r#"{"type":"ticker","market":"BTC-PERP","price":1.5}"#);
        mock.push(TransportEvent::Closed);
        settle().await;
        assert_eq!(mgr.state(), ConnectionState::ReconnectPending);

        tokio::time::sleep(Duration::from_millis(150)).await;

        assert_eq!(mgr.state(), ConnectionState::Connected);
        assert_eq!(mgr.reconnect_attempts(), 0);
        assert_eq!(mock.open_count(), 2);
        assert_eq!(
            mock.journal(),
            vec!["subscribe BTC-PERP", "subscribe ETH-PERP", "tick BTC-PERP"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn dispatches_only_to_matching_topic() {
        let mock = MockTransport::healthy();
        let mgr = manager(mock.clone());
        let (btc, btc_cb) = counter();
        let (eth, eth_cb) = counter();
        let _a = mgr.subscribe("BTC-PERP", btc_cb);
        let _b = mgr.subscribe("ETH-PERP", eth_cb);
        settle().await;

        mock.push(TransportEvent::Message("not json at all".into()));
        mock.push(TransportEvent::Message(r#"{"type":"heartbeat"}"#.into()));
        mock.push(ticker("ETH-PERP", 3000.0));
        mock.push(ticker("BTC-PERP", 50000.0));
        mock.push(ticker("BTC-PERP", 50001.0));
        mock.push(ticker("SOL-PERP", 100.0));
        settle().await;

        assert_eq!(btc.load(Ordering::SeqCst), 2);
        assert_eq!(eth.load(Ordering::SeqCst), 1);
        assert_eq!(mgr.state(), ConnectionState::Connected);
    }

    #[tokio::test(start_paused = true)]
    async fn unsubscribe_frame_only_for_last_subscriber() {
        let mock = MockTransport::healthy();
        let mgr = manager(mock.clone());
        let first = mgr.subscribe("BTC-PERP", |_: &PriceUpdate| {});
        settle().await;
        let second = mgr.subscribe("BTC-PERP", |_: &PriceUpdate| {});
        assert_eq!(mock.journal(), vec!["subscribe BTC-PERP"]);
        mock.clear_journal();

        first.unsubscribe();
        assert!(mock.journal().is_empty());
        assert_eq!(mgr.active_topics(), vec!["BTC-PERP".to_string()]);

        second.unsubscribe();
        assert_eq!(mock.journal(), vec!["unsubscribe BTC-PERP"]);
        assert!(mgr.active_topics().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn disconnect_cancels_pending_reconnect() {
        let mock = MockTransport::failing();
        let mgr = manager(mock.clone());
        let _sub = mgr.subscribe("BTC-PERP", |_: &PriceUpdate| {});
        settle().await;
        assert_eq!(mgr.state(), ConnectionState::ReconnectPending);

        mgr.disconnect();
        assert_eq!(mgr.state(), ConnectionState::Disconnected);
        assert_eq!(mgr.reconnect_attempts(), 0);
        assert!(mgr.active_topics().is_empty());

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(mock.open_count(), 1);
        assert_eq!(mgr.state(), ConnectionState::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_subscriber_does_not_starve_others() {
        let mock = MockTransport::healthy();
        let mgr = manager(mock.clone());
        let _bad = mgr.subscribe("BTC-PERP", |_: &PriceUpdate| panic!("subscriber bug"));
        let (good, good_cb) = counter();
        let _good = mgr.subscribe("BTC-PERP", good_cb);
        settle().await;

        mock.push(ticker("BTC-PERP", 1.0));
        mock.push(ticker("BTC-PERP", 2.0));
        settle().await;

        assert_eq!(good.load(Ordering::SeqCst), 2);
        assert_eq!(mgr.state(), ConnectionState::Connected);
    }

    #[tokio::test(start_paused = true)]
    async fn connect_is_idempotent_while_connected() {
        let mock = MockTransport::healthy();
        let mgr = manager(mock.clone());
        mgr.connect();
        settle().await;
        mgr.connect();
        settle().await;
        assert_eq!(mock.open_count(), 1);
        assert_eq!(mgr.status(), ConnectionStatus { connected: true, connecting: false });
    }

    #[tokio::test(start_paused = true)]
    async fn subscribe_during_backoff_connects_immediately() {
        let mock = MockTransport::failing();
        let mgr = StreamSubscriptionManager::new(
            mock.clone(),
            StreamConfig {
                base_delay: Duration::from_secs(60),
                max_attempts: 3,
            },
        );
        mgr.connect();
        settle().await;
        assert_eq!(mgr.state(), ConnectionState::ReconnectPending);

        mock.failing.store(false, Ordering::SeqCst);
        let _sub = mgr.subscribe("BTC-PERP", |_: &PriceUpdate| {});
        assert_eq!(mgr.state(), ConnectionState::Connecting);
        settle().await;

        assert_eq!(mgr.state(), ConnectionState::Connected);
        assert_eq!(mock.open_count(), 2);
        assert_eq!(mock.journal(), vec!["subscribe BTC-PERP"]);
    }

    #[tokio::test(start_paused = true)]
    async fn new_topic_while_connected_sends_one_subscribe() {
        let mock = MockTransport::healthy();
        let mgr = manager(mock.clone());
        mgr.connect();
        settle().await;
        assert_eq!(mgr.state(), ConnectionState::Connected);
        assert!(mock.journal().is_empty());

        let _first = mgr.subscribe("ETH-PERP", |_: &PriceUpdate| {});
        assert_eq!(mock.journal(), vec!["subscribe ETH-PERP"]);

        let _second = mgr.subscribe("ETH-PERP", |_: &PriceUpdate| {});
        settle().await;
        assert_eq!(mock.journal(), vec!["subscribe ETH-PERP"]);
        assert_eq!(mock.open_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn unsubscribe_while_reconnecting_sends_nothing() {
        let mock = MockTransport::healthy();
        let mgr = manager(mock.clone());
        let sub = mgr.subscribe("BTC-PERP", |_: &PriceUpdate| {});
        let _keep = mgr.subscribe("ETH-PERP", |_: &PriceUpdate| {});
        settle().await;
        mock.clear_journal();

        mock.push(TransportEvent::Closed);
        settle().await;
        assert_eq!(mgr.state(), ConnectionState::ReconnectPending);

        sub.unsubscribe();
        assert!(mock.journal().is_empty());
        assert_eq!(mgr.active_topics(), vec!["ETH-PERP".to_string()]);

        // The dropped topic is not resubscribed on the next connection.
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(mgr.state(), ConnectionState::Connected);
        assert_eq!(mock.journal(), vec!["subscribe ETH-PERP"]);
    }
}
