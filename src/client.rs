//! High-level client wiring the connection, store, dispatcher and view.
//!
//! [`CoupClient`] owns one [`ConnectionManager`] and one [`StateStore`], hands
//! out an [`ActionDispatcher`], and derives the current [`UiView`]. Events are
//! emitted on a bounded channel returned from [`CoupClient::new`].
//!
//! # Example
//!
//! ```rust,ignore
//! let connector = WebSocketConnector::new("ws://localhost:8000");
//! let (client, mut events) = CoupClient::new(connector, CoupClientConfig::new());
//!
//! client.connect("Alice")?;
//! let mut snapshots = client.subscribe();
//!
//! while snapshots.changed().await.is_ok() {
//!     let view = client.view();
//!     if view.is_enabled(Control::StartGame) {
//!         client.dispatcher().start_game();
//!     }
//! }
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};

use crate::connection::ConnectionManager;
use crate::dispatcher::ActionDispatcher;
use crate::error::Result;
use crate::event::ClientEvent;
use crate::protocol::ActionKind;
use crate::reconnect::ReconnectPolicy;
use crate::store::{SharedSnapshot, StateStore};
use crate::transport::Connector;
use crate::ui::{self, UiView};

/// Default capacity of the bounded event channel.
const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 256;

/// Default timeout for the graceful shutdown.
const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

// ── Configuration ───────────────────────────────────────────────────

/// Configuration for a [`CoupClient`].
///
/// # Example
///
/// ```
/// use coup_client::client::CoupClientConfig;
/// use coup_client::reconnect::ReconnectPolicy;
/// use std::time::Duration;
///
/// let config = CoupClientConfig::new()
///     .with_event_channel_capacity(512)
///     .with_shutdown_timeout(Duration::from_secs(5))
///     .with_reconnect(ReconnectPolicy::default());
/// assert_eq!(config.event_channel_capacity, 512);
/// assert!(config.reconnect.is_some());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoupClientConfig {
    /// Capacity of the bounded event channel.
    ///
    /// When the consumer falls behind, events are dropped (with a warning
    /// logged) rather than stalling frame processing. `Disconnected` is always
    /// delivered.
    ///
    /// Defaults to **256**. Values below 1 are clamped to 1.
    pub event_channel_capacity: usize,
    /// Time the session task is given to close the transport on
    /// [`CoupClient::disconnect`] before it is aborted.
    ///
    /// Defaults to **1 second**.
    pub shutdown_timeout: Duration,
    /// Redial policy for closes the user did not request.
    ///
    /// Defaults to `None`: a dropped connection stays dropped until
    /// [`CoupClient::connect`] is called again.
    pub reconnect: Option<ReconnectPolicy>,
}

impl Default for CoupClientConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl CoupClientConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self {
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            reconnect: None,
        }
    }

    /// Set the capacity of the bounded event channel (clamped to at least 1).
    #[must_use]
    pub fn with_event_channel_capacity(mut self, capacity: usize) -> Self {
        self.event_channel_capacity = capacity.max(1);
        self
    }

    /// Set the timeout for the graceful shutdown.
    #[must_use]
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Redial dropped connections according to `policy`.
    #[must_use]
    pub fn with_reconnect(mut self, policy: ReconnectPolicy) -> Self {
        self.reconnect = Some(policy);
        self
    }
}

// ── Client ──────────────────────────────────────────────────────────

/// Game client handle.
///
/// All intent methods queue a message and return immediately; their effect is
/// observed later as a snapshot replacement or a
/// [`ClientEvent::ServerError`].
pub struct CoupClient<C: Connector> {
    connection: ConnectionManager<C>,
    store: Arc<StateStore>,
    dispatcher: ActionDispatcher,
}

impl<C: Connector> CoupClient<C> {
    /// Build an idle client and the receiver for its events.
    #[must_use = "the event receiver must be used to receive events"]
    pub fn new(connector: C, config: CoupClientConfig) -> (Self, mpsc::Receiver<ClientEvent>) {
        // Clamp capacity to at least 1 (tokio panics on 0).
        let capacity = config.event_channel_capacity.max(1);
        let (event_tx, event_rx) = mpsc::channel(capacity);

        let store = Arc::new(StateStore::new(event_tx.clone()));
        let connection = ConnectionManager::new(connector, Arc::clone(&store), event_tx, &config);
        let dispatcher = ActionDispatcher::new(connection.handle());

        let client = Self {
            connection,
            store,
            dispatcher,
        };
        (client, event_rx)
    }

    // ── Connection ──────────────────────────────────────────────────

    /// Connect as `player_name`. See [`ConnectionManager::connect`].
    ///
    /// # Errors
    ///
    /// Returns [`CoupClientError::AlreadyConnected`](crate::CoupClientError::AlreadyConnected)
    /// if a connection is already open or opening.
    pub fn connect(&self, player_name: &str) -> Result<()> {
        self.connection.connect(player_name)
    }

    /// Close the connection and clear the snapshot.
    pub async fn disconnect(&self) {
        self.connection.disconnect().await;
    }

    /// Returns `true` while the transport is open.
    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    /// Name the current connection was opened with.
    pub fn player_name(&self) -> Option<String> {
        self.connection.player_name()
    }

    // ── State ───────────────────────────────────────────────────────

    /// The latest snapshot, if any.
    pub fn snapshot(&self) -> SharedSnapshot {
        self.store.snapshot()
    }

    /// Observe snapshot replacements (and clears on disconnect).
    pub fn subscribe(&self) -> watch::Receiver<SharedSnapshot> {
        self.store.subscribe()
    }

    /// Screen and controls for the local player right now.
    pub fn view(&self) -> UiView {
        let snapshot = self.store.snapshot();
        let player_name = self.connection.player_name().unwrap_or_default();
        ui::derive(
            self.connection.is_connected(),
            snapshot.as_deref(),
            &player_name,
        )
    }

    // ── Intents ─────────────────────────────────────────────────────

    /// A dispatcher sharing this client's connection.
    pub fn dispatcher(&self) -> &ActionDispatcher {
        &self.dispatcher
    }

    /// See [`ActionDispatcher::send_action`].
    pub fn send_action(&self, action: ActionKind, target: Option<String>) -> bool {
        self.dispatcher.send_action(action, target)
    }

    /// See [`ActionDispatcher::challenge`].
    pub fn challenge(&self) -> bool {
        self.dispatcher.challenge()
    }

    /// See [`ActionDispatcher::start_game`].
    pub fn start_game(&self) -> bool {
        self.dispatcher.start_game()
    }
}

impl<C: Connector> std::fmt::Debug for CoupClient<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoupClient")
            .field("connection", &self.connection)
            .field("has_snapshot", &self.store.snapshot().is_some())
            .finish()
    }
}
