//! Connection manager
//!
//! Owns the single WebSocket connection to the event source. The socket
//! lives inside a background actor task; `RealtimeClient` is the cheap
//! cloneable handle consumers share. One client instance is constructed at
//! application startup and passed to consumers, which keeps the "one shared
//! connection" requirement while making lifetime and testability explicit.
//!
//! Reconnection is automatic with linear backoff (`base_delay * attempt`),
//! capped at `max_attempts`. Transport failures are logged and drive the
//! reconnection path; they are never surfaced to subscribers as errors.
//! Subscribers observe the connection only through the state watch and
//! through channel callbacks going quiet or resuming.

use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use crate::config::{RealtimeConfig, ReconnectConfig};
use crate::models::{ClientIntent, DecodeOutcome, ServerEvent};

use super::channels::{Channel, EventBus, SubscriptionId};

/// Supplies the auth token for the handshake; consulted on every
/// (re)connect so a refreshed session is picked up automatically
pub type TokenProvider = Arc<dyn Fn() -> Option<String> + Send + Sync>;

/// Connection lifecycle state, observable by the UI as Live/Offline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// Commands from client handles to the connection actor
enum Command {
    /// Begin connecting; idempotent, also the manual resume after the
    /// attempt cap is exhausted
    Connect,
    /// Fire-and-forget outbound intent; dropped silently when offline
    SendIntent(ClientIntent),
    /// Privileged teardown (application logout); no automatic reconnect
    /// until the next `Connect`
    Disconnect,
}

/// Reconnection schedule: linear backoff with an attempt cap
///
/// Kept separate from the actor so the policy is testable without a
/// network. No jitter and no cap on delay growth, by policy.
#[derive(Debug)]
pub struct ReconnectSchedule {
    config: ReconnectConfig,
    attempts: u32,
}

impl ReconnectSchedule {
    pub fn new(config: ReconnectConfig) -> Self {
        Self {
            config,
            attempts: 0,
        }
    }

    /// Delay before the next attempt, or `None` once attempts are
    /// exhausted. Each call consumes one attempt.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.attempts >= self.config.max_attempts {
            return None;
        }
        self.attempts += 1;
        Some(self.config.base_delay * self.attempts)
    }

    /// Reset the attempt counter; called on every successful connect
    pub fn reset(&mut self) {
        self.attempts = 0;
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}

/// Handle to the shared real-time connection
#[derive(Clone)]
pub struct RealtimeClient {
    cmd_tx: mpsc::UnboundedSender<Command>,
    state_rx: watch::Receiver<ConnectionState>,
    bus: EventBus,
}

impl RealtimeClient {
    /// Spawn the connection actor and initiate the first connect
    pub fn new(config: RealtimeConfig, token: TokenProvider) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        let bus = EventBus::new();

        let actor = ConnectionActor {
            config,
            token,
            bus: bus.clone(),
            cmd_rx,
            state_tx,
        };
        tokio::spawn(actor.run());

        let client = Self {
            cmd_tx,
            state_rx,
            bus,
        };
        client.connect();
        client
    }

    /// Request a connection; a no-op when already connected or connecting
    pub fn connect(&self) {
        let _ = self.cmd_tx.send(Command::Connect);
    }

    /// Tear down the connection and suppress automatic reconnection.
    /// Privileged: intended for the application logout path only.
    pub fn disconnect(&self) {
        let _ = self.cmd_tx.send(Command::Disconnect);
    }

    /// Send an outbound intent; fire-and-forget, silently dropped when
    /// the connection is down
    pub fn send_intent(&self, intent: ClientIntent) {
        let _ = self.cmd_tx.send(Command::SendIntent(intent));
    }

    /// Observe connection state changes (the Live/Offline indicator)
    pub fn state(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    pub fn is_connected(&self) -> bool {
        *self.state_rx.borrow() == ConnectionState::Connected
    }

    /// The channel multiplexer shared by all handles
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Register a callback on a logical channel
    pub fn subscribe<F>(&self, channel: Channel, callback: F) -> SubscriptionId
    where
        F: Fn(&ServerEvent) + Send + Sync + 'static,
    {
        self.bus.subscribe(channel, callback)
    }

    /// Remove a registration; no-op for unknown handles
    pub fn unsubscribe(&self, channel: Channel, id: SubscriptionId) {
        self.bus.unsubscribe(channel, id);
    }
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Why the connected loop ended
enum SessionEnd {
    /// Remote close or transport failure: take the reconnection path
    Lost,
    /// Explicit `disconnect()`: settle without reconnecting
    Manual,
    /// All client handles dropped: stop the actor
    Shutdown,
}

struct ConnectionActor {
    config: RealtimeConfig,
    token: TokenProvider,
    bus: EventBus,
    cmd_rx: mpsc::UnboundedReceiver<Command>,
    state_tx: watch::Sender<ConnectionState>,
}

impl ConnectionActor {
    async fn run(mut self) {
        // Start idle; construction sends the initial Connect command
        loop {
            match self.idle().await {
                IdleEnd::Connect => {}
                IdleEnd::Shutdown => return,
            }

            match self.connect_with_backoff().await {
                ConnectLoopEnd::Settled => continue,
                ConnectLoopEnd::Shutdown => return,
            }
        }
    }

    /// Wait disconnected until a `Connect` command arrives
    async fn idle(&mut self) -> IdleEnd {
        self.state_tx.send_replace(ConnectionState::Disconnected);
        loop {
            match self.cmd_rx.recv().await {
                Some(Command::Connect) => return IdleEnd::Connect,
                Some(Command::SendIntent(intent)) => {
                    debug!(?intent, "dropping intent while disconnected");
                }
                Some(Command::Disconnect) => {}
                None => return IdleEnd::Shutdown,
            }
        }
    }

    /// Connect, serve the session, and reconnect on loss until the
    /// attempt cap is exhausted or a manual disconnect arrives
    async fn connect_with_backoff(&mut self) -> ConnectLoopEnd {
        let mut schedule = ReconnectSchedule::new(self.config.reconnect);

        loop {
            self.state_tx.send_replace(ConnectionState::Connecting);

            match connect_async(self.config.ws_url.as_str()).await {
                Ok((stream, _response)) => {
                    info!(url = %self.config.ws_url, "real-time connection established");
                    schedule.reset();
                    match self.serve(stream).await {
                        SessionEnd::Lost => {
                            // The indicator must leave Connected before the
                            // backoff sleep, not at the next loop iteration
                            self.state_tx.send_replace(ConnectionState::Connecting);
                        }
                        SessionEnd::Manual => {
                            info!("real-time connection closed by request");
                            return ConnectLoopEnd::Settled;
                        }
                        SessionEnd::Shutdown => return ConnectLoopEnd::Shutdown,
                    }
                }
                Err(e) => {
                    warn!(url = %self.config.ws_url, error = %e, "connection attempt failed");
                }
            }

            let delay = match schedule.next_delay() {
                Some(delay) => delay,
                None => {
                    warn!(
                        attempts = schedule.attempts(),
                        "reconnection attempts exhausted; manual connect required"
                    );
                    return ConnectLoopEnd::Settled;
                }
            };

            debug!(
                attempt = schedule.attempts(),
                delay_ms = delay.as_millis() as u64,
                "scheduling reconnection"
            );

            if let Some(end) = self.backoff_wait(delay).await {
                return end;
            }
        }
    }

    /// Sleep out the backoff delay while still honoring commands.
    /// Returns `Some` when the connect loop should end early.
    async fn backoff_wait(&mut self, delay: Duration) -> Option<ConnectLoopEnd> {
        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                _ = &mut sleep => return None,
                cmd = self.cmd_rx.recv() => match cmd {
                    Some(Command::Connect) => {}
                    Some(Command::SendIntent(intent)) => {
                        debug!(?intent, "dropping intent while reconnecting");
                    }
                    Some(Command::Disconnect) => return Some(ConnectLoopEnd::Settled),
                    None => return Some(ConnectLoopEnd::Shutdown),
                },
            }
        }
    }

    /// Serve one established connection until it ends
    async fn serve(&mut self, stream: WsStream) -> SessionEnd {
        let (mut sink, mut source) = stream.split();

        // Authenticated handshake: credentials go out before anything else
        if let Some(token) = (self.token)() {
            let intent = ClientIntent::Authenticate { token };
            if let Err(e) = send_intent(&mut sink, &intent).await {
                warn!(error = %e, "handshake send failed");
                return SessionEnd::Lost;
            }
        }

        self.state_tx.send_replace(ConnectionState::Connected);

        loop {
            tokio::select! {
                msg = source.next() => match msg {
                    Some(Ok(Message::Text(text))) => self.dispatch_frame(&text),
                    Some(Ok(Message::Ping(payload))) => {
                        let _ = sink.send(Message::Pong(payload)).await;
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        warn!("real-time connection lost");
                        return SessionEnd::Lost;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!(error = %e, "real-time transport error");
                        return SessionEnd::Lost;
                    }
                },
                cmd = self.cmd_rx.recv() => match cmd {
                    Some(Command::Connect) => {
                        // Already connected; idempotent
                    }
                    Some(Command::SendIntent(intent)) => {
                        if let Err(e) = send_intent(&mut sink, &intent).await {
                            warn!(error = %e, "intent send failed");
                            return SessionEnd::Lost;
                        }
                    }
                    Some(Command::Disconnect) => {
                        let _ = sink.send(Message::Close(None)).await;
                        return SessionEnd::Manual;
                    }
                    None => {
                        let _ = sink.send(Message::Close(None)).await;
                        return SessionEnd::Shutdown;
                    }
                },
            }
        }
    }

    /// Decode one text frame and fan it out; malformed payloads must not
    /// crash the dispatch loop
    fn dispatch_frame(&self, text: &str) {
        match ServerEvent::decode(text) {
            DecodeOutcome::Event(event) => self.bus.dispatch(&event),
            DecodeOutcome::UnknownEvent(name) => {
                debug!(event = %name, "ignoring unknown event");
            }
            DecodeOutcome::Malformed(reason) => {
                warn!(%reason, "dropping malformed event payload");
            }
        }
    }
}

enum IdleEnd {
    Connect,
    Shutdown,
}

enum ConnectLoopEnd {
    /// Settled into `Disconnected` (manual disconnect or attempts
    /// exhausted); back to idle
    Settled,
    Shutdown,
}

async fn send_intent<S>(sink: &mut S, intent: &ClientIntent) -> crate::error::Result<()>
where
    S: SinkExt<Message> + Unpin,
    S::Error: std::fmt::Display,
{
    let json = serde_json::to_string(intent)?;
    sink.send(Message::Text(json))
        .await
        .map_err(|e| crate::error::VigilError::Transport(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(base_ms: u64, max: u32) -> ReconnectConfig {
        ReconnectConfig {
            base_delay: Duration::from_millis(base_ms),
            max_attempts: max,
        }
    }

    #[test]
    fn test_backoff_grows_linearly() {
        let mut schedule = ReconnectSchedule::new(policy(100, 5));

        assert_eq!(schedule.next_delay(), Some(Duration::from_millis(100)));
        assert_eq!(schedule.next_delay(), Some(Duration::from_millis(200)));
        assert_eq!(schedule.next_delay(), Some(Duration::from_millis(300)));
    }

    #[test]
    fn test_backoff_attempt_cap() {
        let mut schedule = ReconnectSchedule::new(policy(100, 5));

        // Five consecutive failures consume all attempts
        for _ in 0..5 {
            assert!(schedule.next_delay().is_some());
        }
        // The sixth scheduled attempt must not fire
        assert_eq!(schedule.next_delay(), None);
        assert_eq!(schedule.attempts(), 5);
    }

    #[test]
    fn test_backoff_reset_on_successful_connect() {
        let mut schedule = ReconnectSchedule::new(policy(100, 5));

        schedule.next_delay();
        schedule.next_delay();
        assert_eq!(schedule.attempts(), 2);

        schedule.reset();
        assert_eq!(schedule.attempts(), 0);
        assert_eq!(schedule.next_delay(), Some(Duration::from_millis(100)));
    }

    #[test]
    fn test_backoff_counter_never_exceeds_max_between_resets() {
        let mut schedule = ReconnectSchedule::new(policy(10, 3));

        for _ in 0..10 {
            schedule.next_delay();
            assert!(schedule.attempts() <= 3);
        }
        schedule.reset();
        for _ in 0..10 {
            schedule.next_delay();
            assert!(schedule.attempts() <= 3);
        }
    }

    #[tokio::test]
    async fn test_intents_before_connection_are_silently_dropped() {
        // Nothing listening at this address; the client must stay usable
        let config = RealtimeConfig {
            ws_url: url::Url::parse("ws://127.0.0.1:1/ws").unwrap(),
            reconnect: policy(10, 1),
        };
        let client = RealtimeClient::new(config, Arc::new(|| None));

        // Leave before any join: symmetric no-op, must not panic
        client.send_intent(ClientIntent::LeaveRoom {
            room: "asset:42".to_string(),
        });
        client.send_intent(ClientIntent::Ping);

        assert!(!client.is_connected());
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_settles_disconnected() {
        let config = RealtimeConfig {
            ws_url: url::Url::parse("ws://127.0.0.1:1/ws").unwrap(),
            reconnect: policy(1, 2),
        };
        let client = RealtimeClient::new(config, Arc::new(|| None));

        let mut state = client.state();
        // Wait until the actor has burned through its attempts
        let settled = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if *state.borrow() == ConnectionState::Disconnected
                    && state.has_changed().is_ok()
                {
                    // Still may be mid-cycle; wait for a quiet Disconnected
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    if *state.borrow() == ConnectionState::Disconnected {
                        return;
                    }
                }
                if state.changed().await.is_err() {
                    return;
                }
            }
        })
        .await;

        assert!(settled.is_ok());
        assert!(!client.is_connected());
    }

    #[tokio::test]
    async fn test_lost_session_leaves_connected_before_backoff_sleep() {
        // Accept one real WebSocket session, then drop it after a moment
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let ws = tokio_tungstenite::accept_async(stream).await.unwrap();
            tokio::time::sleep(Duration::from_millis(100)).await;
            drop(ws);
        });

        // Backoff long enough that the test fails if the indicator only
        // flips at the top of the next reconnect attempt
        let config = RealtimeConfig {
            ws_url: url::Url::parse(&format!("ws://{}/ws", addr)).unwrap(),
            reconnect: policy(10_000, 2),
        };
        let client = RealtimeClient::new(config, Arc::new(|| None));

        let mut state = client.state();
        tokio::time::timeout(Duration::from_secs(5), async {
            state
                .wait_for(|s| *s == ConnectionState::Connected)
                .await
                .unwrap();
        })
        .await
        .expect("connection never established");

        // The transport drops ~100ms in; the watch must leave Connected
        // right away even though the next attempt is ten seconds out
        tokio::time::timeout(Duration::from_secs(2), async {
            state
                .wait_for(|s| *s != ConnectionState::Connected)
                .await
                .unwrap();
        })
        .await
        .expect("state watch still reported Connected during the backoff window");
        assert!(!client.is_connected());
    }
}
