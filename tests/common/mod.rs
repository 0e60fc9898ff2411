#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing,
    dead_code
)]
//! Shared test utilities for Coup client integration tests.
//!
//! Provides a channel-backed [`MockConnector`] whose every dial hands the test
//! a [`MockServer`] for driving that connection, plus helpers for building
//! server frames.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use coup_client::protocol::{
    GameSnapshot, InboundMessage, Influences, OutboundMessage, Phase, PlayerView,
};
use coup_client::{ClientEvent, Connector, CoupClientError, Transport};
use tokio::sync::mpsc;

/// Upper bound for any single wait in a test.
pub const WAIT: Duration = Duration::from_secs(2);

// ── MockTransport ───────────────────────────────────────────────────

type Incoming = Option<Result<String, CoupClientError>>;

/// Client half of an in-process connection.
pub struct MockTransport {
    incoming: mpsc::UnboundedReceiver<Incoming>,
    outgoing: mpsc::UnboundedSender<String>,
    closed: Arc<AtomicBool>,
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&mut self, message: String) -> Result<(), CoupClientError> {
        self.outgoing
            .send(message)
            .map_err(|e| CoupClientError::TransportSend(e.to_string()))
    }

    async fn recv(&mut self) -> Option<Result<String, CoupClientError>> {
        // A dropped server half reads as a clean close.
        self.incoming.recv().await.flatten()
    }

    async fn close(&mut self) -> Result<(), CoupClientError> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}

/// Server half of an in-process connection, handed to the test per dial.
pub struct MockServer {
    /// Name the client dialed with.
    pub player_name: String,
    to_client: mpsc::UnboundedSender<Incoming>,
    from_client: mpsc::UnboundedReceiver<String>,
    closed: Arc<AtomicBool>,
}

impl MockServer {
    /// Push a raw text frame to the client.
    pub fn send_raw(&self, frame: impl Into<String>) {
        let _ = self.to_client.send(Some(Ok(frame.into())));
    }

    /// Push a typed message to the client.
    pub fn send(&self, msg: &InboundMessage) {
        self.send_raw(serde_json::to_string(msg).unwrap());
    }

    /// Push a full snapshot to the client.
    pub fn send_state(&self, state: &GameSnapshot) {
        self.send(&InboundMessage::State {
            state: state.clone(),
        });
    }

    /// Push an application error to the client.
    pub fn send_error(&self, message: &str) {
        self.send(&InboundMessage::Error {
            message: message.into(),
        });
    }

    /// Close the connection from the server side.
    pub fn hang_up(&self) {
        let _ = self.to_client.send(None);
    }

    /// Fail the connection with a transport error.
    pub fn fail(&self, reason: &str) {
        let _ = self
            .to_client
            .send(Some(Err(CoupClientError::TransportReceive(reason.into()))));
    }

    /// Next frame the client sent, decoded.
    pub async fn next_intent(&mut self) -> OutboundMessage {
        let raw = tokio::time::timeout(WAIT, self.from_client.recv())
            .await
            .expect("timed out waiting for an intent")
            .expect("client half dropped");
        serde_json::from_str(&raw).expect("client sent an unparseable frame")
    }

    /// Next frame the client sent, raw.
    pub async fn next_raw(&mut self) -> String {
        tokio::time::timeout(WAIT, self.from_client.recv())
            .await
            .expect("timed out waiting for a frame")
            .expect("client half dropped")
    }

    /// Returns `true` once nothing further was sent within `wait`.
    pub async fn is_silent_for(&mut self, wait: Duration) -> bool {
        tokio::time::timeout(wait, self.from_client.recv())
            .await
            .is_err()
    }

    /// Whether the client closed its transport.
    pub fn client_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

// ── MockConnector ───────────────────────────────────────────────────

/// Connector that creates an in-process connection per dial.
pub struct MockConnector {
    servers: mpsc::UnboundedSender<MockServer>,
    refuse_next: Arc<AtomicU32>,
    dials: Arc<AtomicU32>,
}

/// Test-side controls for a [`MockConnector`].
pub struct MockConnectorHandle {
    servers: mpsc::UnboundedReceiver<MockServer>,
    refuse_next: Arc<AtomicU32>,
    dials: Arc<AtomicU32>,
}

impl MockConnector {
    pub fn new() -> (Self, MockConnectorHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let refuse_next = Arc::new(AtomicU32::new(0));
        let dials = Arc::new(AtomicU32::new(0));
        (
            Self {
                servers: tx,
                refuse_next: Arc::clone(&refuse_next),
                dials: Arc::clone(&dials),
            },
            MockConnectorHandle {
                servers: rx,
                refuse_next,
                dials,
            },
        )
    }
}

impl MockConnectorHandle {
    /// Wait for the client to dial and return the server half.
    pub async fn accept(&mut self) -> MockServer {
        tokio::time::timeout(WAIT, self.servers.recv())
            .await
            .expect("timed out waiting for a dial")
            .expect("connector dropped")
    }

    /// Refuse the next `n` dials.
    pub fn refuse_next(&self, n: u32) {
        self.refuse_next.store(n, Ordering::Release);
    }

    /// Number of dials so far, including refused ones.
    pub fn dials(&self) -> u32 {
        self.dials.load(Ordering::Acquire)
    }
}

#[async_trait]
impl Connector for MockConnector {
    type Transport = MockTransport;

    async fn connect(&self, player_name: &str) -> Result<MockTransport, CoupClientError> {
        self.dials.fetch_add(1, Ordering::AcqRel);
        let refused = self
            .refuse_next
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .is_ok();
        if refused {
            return Err(CoupClientError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "connection refused",
            )));
        }

        let (to_client, incoming) = mpsc::unbounded_channel();
        let (outgoing, from_client) = mpsc::unbounded_channel();
        let closed = Arc::new(AtomicBool::new(false));
        let server = MockServer {
            player_name: player_name.to_owned(),
            to_client,
            from_client,
            closed: Arc::clone(&closed),
        };
        self.servers
            .send(server)
            .map_err(|_| CoupClientError::TransportClosed)?;
        Ok(MockTransport {
            incoming,
            outgoing,
            closed,
        })
    }
}

// ── Snapshot builders ───────────────────────────────────────────────

/// A seat with two face-down cards and the starting two coins.
pub fn seat(name: &str) -> PlayerView {
    PlayerView {
        name: name.into(),
        coins: 2,
        influences: Influences::Hidden(2),
        revealed: vec![],
        alive: None,
    }
}

/// A lobby snapshot with the given seats, host first.
pub fn lobby(names: &[&str]) -> GameSnapshot {
    GameSnapshot {
        phase: Phase::Lobby,
        current_player: String::new(),
        players: names.iter().map(|n| seat(n)).collect(),
        pending_action: None,
        pending_actor: None,
        pending_target: None,
    }
}

/// An in-game snapshot.
pub fn in_game(phase: Phase, current: &str, names: &[&str]) -> GameSnapshot {
    GameSnapshot {
        phase,
        current_player: current.into(),
        ..lobby(names)
    }
}

// ── Event helpers ───────────────────────────────────────────────────

/// Receive the next event or fail the test.
pub async fn next_event(events: &mut mpsc::Receiver<ClientEvent>) -> ClientEvent {
    tokio::time::timeout(WAIT, events.recv())
        .await
        .expect("timed out waiting for an event")
        .expect("event channel closed")
}

/// Optional log output for debugging: `RUST_LOG=coup_client=debug cargo test`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
