//! Lifecycle of the single connection to the game server.
//!
//! [`ConnectionManager::connect`] spawns a background session task that dials
//! through a [`Connector`], then multiplexes outbound intents, the shutdown
//! signal, and inbound frames with `tokio::select!`. Every inbound frame is
//! decoded and applied to the [`StateStore`] before the next one is read.
//!
//! A session owns one *epoch* of the store. Tearing a session down moves the
//! epoch on first, so a frame still in flight from the old transport can never
//! repopulate a snapshot the UI has already cleared.
//!
//! Closes are not distinguished: whether the server hung up, the network
//! failed, or the user disconnected, the client ends up disconnected with no
//! snapshot. When a [`ReconnectPolicy`] is configured, closes the user did not
//! ask for are followed by bounded redials.
//!
//! Sessions take turns on the event channel: a new session does not dial
//! until the previous one has delivered its `Disconnected`, so a consumer
//! always sees `Connected` and `Disconnected` strictly alternate.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::client::CoupClientConfig;
use crate::codec;
use crate::error::{CoupClientError, Result};
use crate::event::ClientEvent;
use crate::protocol::OutboundMessage;
use crate::reconnect::ReconnectPolicy;
use crate::store::StateStore;
use crate::transport::{Connector, Transport};

const SHUTDOWN_REASON: &str = "client shut down";

// ── Link state ──────────────────────────────────────────────────────

/// What dependents may observe about the connection.
#[derive(Debug, Default)]
struct Link {
    /// Epoch of the session that owns the link; 0 when idle.
    epoch: u64,
    /// `true` between a successful dial and the next close.
    open: bool,
    player_name: Option<String>,
    cmd_tx: Option<mpsc::UnboundedSender<OutboundMessage>>,
}

/// Cheap, cloneable view of the connection handed to dependents such as the
/// [`ActionDispatcher`](crate::dispatcher::ActionDispatcher).
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    link: Arc<Mutex<Link>>,
}

impl ConnectionHandle {
    /// Returns `true` while the transport is open.
    pub fn is_connected(&self) -> bool {
        lock(&self.link).open
    }

    /// Name the current session was opened with, if any.
    pub fn player_name(&self) -> Option<String> {
        lock(&self.link).player_name.clone()
    }

    /// Queue a message for the session task.
    ///
    /// Returns `false` without side effects when no transport is open.
    pub fn send(&self, msg: OutboundMessage) -> bool {
        let link = lock(&self.link);
        if !link.open {
            return false;
        }
        link.cmd_tx
            .as_ref()
            .is_some_and(|tx| tx.send(msg).is_ok())
    }
}

#[cfg(test)]
impl ConnectionHandle {
    /// An open link whose outbound queue is read by the test directly.
    pub(crate) fn open_for_test() -> (Self, mpsc::UnboundedReceiver<OutboundMessage>) {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let link = Link {
            epoch: 1,
            open: true,
            player_name: Some("tester".into()),
            cmd_tx: Some(cmd_tx),
        };
        (
            Self {
                link: Arc::new(Mutex::new(link)),
            },
            cmd_rx,
        )
    }

    pub(crate) fn close_for_test(&self) {
        *lock(&self.link) = Link::default();
    }
}

// ── Manager ─────────────────────────────────────────────────────────

struct Session {
    epoch: u64,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

struct Shared<C> {
    connector: C,
    store: Arc<StateStore>,
    events: mpsc::Sender<ClientEvent>,
    link: Arc<Mutex<Link>>,
    session: Mutex<Option<Session>>,
    /// Held by a session task from its first dial until its last event.
    turn: Arc<AsyncMutex<()>>,
    reconnect: Option<ReconnectPolicy>,
}

/// Owns the client's single connection.
///
/// At most one session exists at a time; [`connect`](Self::connect) rejects a
/// second one with [`CoupClientError::AlreadyConnected`] until the first has
/// closed or [`disconnect`](Self::disconnect) was called.
pub struct ConnectionManager<C: Connector> {
    shared: Arc<Shared<C>>,
    shutdown_timeout: Duration,
}

impl<C: Connector> ConnectionManager<C> {
    /// Create an idle manager. Nothing is dialed until [`connect`](Self::connect).
    pub fn new(
        connector: C,
        store: Arc<StateStore>,
        events: mpsc::Sender<ClientEvent>,
        config: &CoupClientConfig,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                connector,
                store,
                events,
                link: Arc::new(Mutex::new(Link::default())),
                session: Mutex::new(None),
                turn: Arc::new(AsyncMutex::new(())),
                reconnect: config.reconnect,
            }),
            shutdown_timeout: config.shutdown_timeout,
        }
    }

    /// Open a connection addressed by `player_name`.
    ///
    /// Returns as soon as the session task is spawned; the outcome is reported
    /// through [`ClientEvent::Connected`] or [`ClientEvent::Disconnected`].
    ///
    /// # Errors
    ///
    /// - [`CoupClientError::InvalidPlayerName`] if the name is blank.
    /// - [`CoupClientError::AlreadyConnected`] if a session is open or opening.
    /// - [`CoupClientError::NoRuntime`] if called outside a Tokio runtime.
    pub fn connect(&self, player_name: &str) -> Result<()> {
        if player_name.trim().is_empty() {
            return Err(CoupClientError::InvalidPlayerName(player_name.to_owned()));
        }
        let runtime =
            tokio::runtime::Handle::try_current().map_err(|_| CoupClientError::NoRuntime)?;

        let mut session = lock(&self.shared.session);
        if session.is_some() {
            let player_name = lock(&self.shared.link)
                .player_name
                .clone()
                .unwrap_or_default();
            return Err(CoupClientError::AlreadyConnected { player_name });
        }

        let epoch = self.shared.store.begin_epoch();
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        *lock(&self.shared.link) = Link {
            epoch,
            open: false,
            player_name: Some(player_name.to_owned()),
            cmd_tx: Some(cmd_tx),
        };

        debug!(%player_name, epoch, "spawning connection session");
        let task = runtime.spawn(run_session(
            Arc::clone(&self.shared),
            player_name.to_owned(),
            epoch,
            cmd_rx,
            shutdown_rx,
        ));
        *session = Some(Session {
            epoch,
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        });
        Ok(())
    }

    /// Close the connection, if any.
    ///
    /// The snapshot is cleared and further sends become no-ops before this
    /// method first yields. The session task is then given `shutdown_timeout`
    /// to close the transport gracefully and is aborted if it overruns. This
    /// never waits on the event channel: if the task had to be aborted and
    /// the channel is full, the final `Disconnected` is dropped with a warning.
    pub async fn disconnect(&self) {
        let taken = lock(&self.shared.session).take();
        let Some(mut session) = taken else {
            debug!("disconnect requested with no active session");
            return;
        };
        debug!(epoch = session.epoch, "disconnect requested");

        self.shared.store.invalidate();
        *lock(&self.shared.link) = Link::default();

        if let Some(tx) = session.shutdown_tx.take() {
            let _ = tx.send(());
        }

        let Some(mut task) = session.task.take() else {
            return;
        };
        match tokio::time::timeout(self.shutdown_timeout, &mut task).await {
            Ok(Ok(())) => {}
            Ok(Err(join_err)) => {
                warn!("connection session terminated with join error: {join_err}");
            }
            Err(_) => {
                warn!("connection session did not exit within timeout; aborting task");
                task.abort();
                if let Err(join_err) = task.await {
                    debug!("connection session aborted: {join_err}");
                }
                emit_event(
                    &self.shared.events,
                    ClientEvent::Disconnected {
                        reason: Some(SHUTDOWN_REASON.into()),
                    },
                );
            }
        }
    }

    /// Returns `true` while the transport is open.
    pub fn is_connected(&self) -> bool {
        lock(&self.shared.link).open
    }

    /// Returns `true` from [`connect`](Self::connect) until the session ends,
    /// including while dialing or waiting to redial.
    pub fn has_session(&self) -> bool {
        lock(&self.shared.session).is_some()
    }

    /// Name the current session was opened with, if any.
    pub fn player_name(&self) -> Option<String> {
        lock(&self.shared.link).player_name.clone()
    }

    /// A handle for dependents that only need to send or check status.
    pub fn handle(&self) -> ConnectionHandle {
        ConnectionHandle {
            link: Arc::clone(&self.shared.link),
        }
    }
}

impl<C: Connector> std::fmt::Debug for ConnectionManager<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("connected", &self.is_connected())
            .field("player_name", &self.player_name())
            .field("has_session", &self.has_session())
            .finish()
    }
}

impl<C: Connector> Drop for ConnectionManager<C> {
    fn drop(&mut self) {
        // No executor is available here to drive a graceful close, so the
        // session task is aborted and its transport dropped.
        if let Some(mut session) = lock(&self.shared.session).take() {
            if let Some(task) = session.task.take() {
                task.abort();
            }
        }
        self.shared.store.invalidate();
        *lock(&self.shared.link) = Link::default();
    }
}

// ── Session task ────────────────────────────────────────────────────

/// How a connected session stopped pumping frames.
enum PumpEnd {
    /// The user disconnected or the manager went away.
    Shutdown,
    /// The transport failed or the server closed it.
    Lost(String),
}

enum Retry {
    Again,
    GiveUp,
    Shutdown,
}

async fn run_session<C: Connector>(
    shared: Arc<Shared<C>>,
    player_name: String,
    epoch: u64,
    mut cmd_rx: mpsc::UnboundedReceiver<OutboundMessage>,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    debug!(%player_name, epoch, "connection session started");

    // Wait for the previous session to deliver its last event.
    let turn = tokio::select! {
        _ = &mut shutdown_rx => None,
        guard = Arc::clone(&shared.turn).lock_owned() => Some(guard),
    };
    let Some(_turn) = turn else {
        shared.release(epoch);
        emit_lifecycle(
            &shared.events,
            ClientEvent::Disconnected {
                reason: Some(SHUTDOWN_REASON.to_owned()),
            },
        )
        .await;
        return;
    };

    let mut attempt: u32 = 0;

    let reason = loop {
        let dialed = tokio::select! {
            _ = &mut shutdown_rx => None,
            result = shared.connector.connect(&player_name) => Some(result),
        };

        let lost = match dialed {
            None => break Some(SHUTDOWN_REASON.to_owned()),
            Some(Ok(mut transport)) => {
                if !shared.mark_open(epoch) {
                    let _ = transport.close().await;
                    break Some(SHUTDOWN_REASON.to_owned());
                }
                attempt = 0;
                emit_lifecycle(
                    &shared.events,
                    ClientEvent::Connected {
                        player_name: player_name.clone(),
                    },
                )
                .await;

                match pump(&*shared, &mut transport, epoch, &mut cmd_rx, &mut shutdown_rx).await {
                    PumpEnd::Shutdown => {
                        let _ = transport.close().await;
                        break Some(SHUTDOWN_REASON.to_owned());
                    }
                    PumpEnd::Lost(reason) => reason,
                }
            }
            Some(Err(e)) => {
                warn!(%player_name, "failed to connect: {e}");
                format!("connect failed: {e}")
            }
        };

        shared.mark_lost(epoch);
        discard_queued(&mut cmd_rx);

        match wait_for_retry(&*shared, attempt, &mut shutdown_rx).await {
            Retry::Again => attempt = attempt.saturating_add(1),
            Retry::GiveUp => break Some(lost),
            Retry::Shutdown => break Some(SHUTDOWN_REASON.to_owned()),
        }
    };

    // Free the slot first so a consumer reacting to `Disconnected` can
    // connect again; the turn guard keeps the next session's events behind.
    shared.release(epoch);
    emit_lifecycle(&shared.events, ClientEvent::Disconnected { reason }).await;
    debug!(epoch, "connection session exited");
}

/// Move frames until the transport closes or shutdown is requested.
async fn pump<C: Connector>(
    shared: &Shared<C>,
    transport: &mut C::Transport,
    epoch: u64,
    cmd_rx: &mut mpsc::UnboundedReceiver<OutboundMessage>,
    shutdown_rx: &mut oneshot::Receiver<()>,
) -> PumpEnd {
    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                let Some(msg) = cmd else {
                    debug!("command channel closed, ending session");
                    return PumpEnd::Shutdown;
                };
                debug!(kind = msg.kind(), "sending intent");
                match codec::encode(&msg) {
                    Ok(frame) => {
                        if let Err(e) = transport.send(frame).await {
                            error!("transport send error: {e}");
                            return PumpEnd::Lost(format!("transport send error: {e}"));
                        }
                    }
                    Err(e) => error!("failed to encode {} intent: {e}", msg.kind()),
                }
            }

            _ = &mut *shutdown_rx => {
                debug!("shutdown signal received");
                return PumpEnd::Shutdown;
            }

            incoming = transport.recv() => {
                match incoming {
                    Some(Ok(text)) => {
                        let Some(msg) = codec::decode(&text) else {
                            continue;
                        };
                        if shared.store.apply_in(epoch, msg).is_none() {
                            return PumpEnd::Shutdown;
                        }
                    }
                    Some(Err(e)) => {
                        error!("transport receive error: {e}");
                        return PumpEnd::Lost(format!("transport receive error: {e}"));
                    }
                    None => {
                        debug!("transport closed by server");
                        return PumpEnd::Lost("connection closed by server".to_owned());
                    }
                }
            }
        }
    }
}

/// Drop intents queued for a transport that is gone, so none of them reach
/// a later connection. Returns how many were dropped.
fn discard_queued(cmd_rx: &mut mpsc::UnboundedReceiver<OutboundMessage>) -> usize {
    let mut discarded = 0usize;
    while cmd_rx.try_recv().is_ok() {
        discarded += 1;
    }
    if discarded > 0 {
        debug!(discarded, "connection lost; queued intents discarded");
    }
    discarded
}

async fn wait_for_retry<C>(
    shared: &Shared<C>,
    attempt: u32,
    shutdown_rx: &mut oneshot::Receiver<()>,
) -> Retry {
    let Some(policy) = shared.reconnect else {
        return Retry::GiveUp;
    };
    let Some(delay) = policy.next_delay(attempt) else {
        warn!(retries = attempt, "reconnect attempts exhausted");
        return Retry::GiveUp;
    };

    let attempt = attempt.saturating_add(1);
    warn!(attempt, ?delay, "connection lost; redialing after backoff");
    emit_event(&shared.events, ClientEvent::Reconnecting { attempt, delay });

    tokio::select! {
        _ = shutdown_rx => Retry::Shutdown,
        () = tokio::time::sleep(delay) => Retry::Again,
    }
}

impl<C> Shared<C> {
    /// Mark the link open if `epoch` still owns it.
    fn mark_open(&self, epoch: u64) -> bool {
        let mut link = lock(&self.link);
        if link.epoch != epoch || !self.store.is_current(epoch) {
            return false;
        }
        link.open = true;
        true
    }

    /// The transport went away; keep the session but drop the snapshot.
    fn mark_lost(&self, epoch: u64) {
        {
            let mut link = lock(&self.link);
            if link.epoch == epoch {
                link.open = false;
            }
        }
        self.store.clear_in(epoch);
    }

    /// The session is over; free the slot for the next `connect`.
    fn release(&self, epoch: u64) {
        let mut session = lock(&self.session);
        if session.as_ref().is_some_and(|s| s.epoch == epoch) {
            *session = None;
        }
        let mut link = lock(&self.link);
        if link.epoch == epoch {
            *link = Link::default();
        }
        drop(link);
        drop(session);
        self.store.clear_in(epoch);
    }
}

/// Emit an event to the event channel. If the channel is full, log a warning
/// and drop the event to avoid blocking the session task.
fn emit_event(event_tx: &mpsc::Sender<ClientEvent>, event: ClientEvent) {
    match event_tx.try_send(event) {
        Ok(()) => {}
        Err(mpsc::error::TrySendError::Full(dropped)) => {
            warn!("event channel full, dropping event: {dropped:?}");
        }
        Err(mpsc::error::TrySendError::Closed(_)) => {
            debug!("event channel closed, receiver dropped");
        }
    }
}

/// Emit `Connected` or `Disconnected`, waiting for room in the channel since
/// the consumer's idea of the connection depends on both arriving. Only the
/// session task calls this; the manager bounds it by aborting the task.
async fn emit_lifecycle(event_tx: &mpsc::Sender<ClientEvent>, event: ClientEvent) {
    if event_tx.send(event).await.is_err() {
        debug!("event channel closed, receiver dropped");
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use crate::protocol::ActionKind;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

    /// Transport that never yields a frame and records whether it was closed.
    struct IdleTransport {
        closed: Arc<AtomicBool>,
        hang_on_close: bool,
    }

    #[async_trait]
    impl Transport for IdleTransport {
        async fn send(&mut self, _message: String) -> Result<()> {
            Ok(())
        }

        async fn recv(&mut self) -> Option<Result<String>> {
            std::future::pending().await
        }

        async fn close(&mut self) -> Result<()> {
            self.closed.store(true, Ordering::Release);
            if self.hang_on_close {
                std::future::pending::<()>().await;
            }
            Ok(())
        }
    }

    struct IdleConnector {
        dials: Arc<AtomicU32>,
        closed: Arc<AtomicBool>,
        fail: bool,
        hang_on_close: bool,
    }

    impl IdleConnector {
        fn new() -> Self {
            Self {
                dials: Arc::new(AtomicU32::new(0)),
                closed: Arc::new(AtomicBool::new(false)),
                fail: false,
                hang_on_close: false,
            }
        }
    }

    #[async_trait]
    impl Connector for IdleConnector {
        type Transport = IdleTransport;

        async fn connect(&self, _player_name: &str) -> Result<IdleTransport> {
            self.dials.fetch_add(1, Ordering::AcqRel);
            if self.fail {
                return Err(CoupClientError::Io(std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    "refused",
                )));
            }
            Ok(IdleTransport {
                closed: Arc::clone(&self.closed),
                hang_on_close: self.hang_on_close,
            })
        }
    }

    fn manager(
        connector: IdleConnector,
        config: CoupClientConfig,
    ) -> (
        ConnectionManager<IdleConnector>,
        Arc<StateStore>,
        mpsc::Receiver<ClientEvent>,
    ) {
        let (tx, rx) = mpsc::channel(16);
        let store = Arc::new(StateStore::new(tx.clone()));
        let manager = ConnectionManager::new(connector, Arc::clone(&store), tx, &config);
        (manager, store, rx)
    }

    #[test]
    fn queued_intents_are_discarded_and_counted() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        tx.send(OutboundMessage::Challenge).unwrap();
        tx.send(OutboundMessage::StartGame).unwrap();

        assert_eq!(discard_queued(&mut rx), 2);
        assert!(rx.try_recv().is_err());
        assert_eq!(discard_queued(&mut rx), 0);
    }

    #[test]
    fn connect_outside_runtime_is_rejected() {
        let (manager, _store, _rx) = manager(IdleConnector::new(), CoupClientConfig::new());
        assert!(matches!(
            manager.connect("Alice"),
            Err(CoupClientError::NoRuntime)
        ));
        assert!(!manager.has_session());
    }

    #[tokio::test]
    async fn blank_name_is_rejected() {
        let (manager, _store, _rx) = manager(IdleConnector::new(), CoupClientConfig::new());
        assert!(matches!(
            manager.connect("  "),
            Err(CoupClientError::InvalidPlayerName(_))
        ));
    }

    #[tokio::test]
    async fn second_connect_is_rejected() {
        let (manager, _store, mut rx) = manager(IdleConnector::new(), CoupClientConfig::new());
        manager.connect("Alice").unwrap();
        assert_eq!(
            rx.recv().await.unwrap(),
            ClientEvent::Connected {
                player_name: "Alice".into()
            }
        );
        assert!(manager.is_connected());

        let err = manager.connect("Bob").unwrap_err();
        assert!(
            matches!(err, CoupClientError::AlreadyConnected { ref player_name } if player_name == "Alice")
        );
        assert_eq!(manager.player_name().as_deref(), Some("Alice"));
    }

    #[tokio::test]
    async fn handle_send_is_noop_until_open() {
        let (manager, _store, _rx) = manager(IdleConnector::new(), CoupClientConfig::new());
        let handle = manager.handle();
        assert!(!handle.send(OutboundMessage::Challenge));
        assert!(!handle.is_connected());
        assert!(handle.player_name().is_none());
    }

    #[tokio::test]
    async fn disconnect_closes_transport_and_frees_slot() {
        let connector = IdleConnector::new();
        let closed = Arc::clone(&connector.closed);
        let (manager, _store, mut rx) = manager(connector, CoupClientConfig::new());
        let handle = manager.handle();

        manager.connect("Alice").unwrap();
        let _ = rx.recv().await; // Connected
        assert!(handle.send(OutboundMessage::Action {
            action: ActionKind::Income,
            target: None,
        }));

        manager.disconnect().await;
        assert!(!manager.is_connected());
        assert!(!manager.has_session());
        assert!(closed.load(Ordering::Acquire));
        assert!(!handle.send(OutboundMessage::StartGame));
        assert_eq!(
            rx.recv().await.unwrap(),
            ClientEvent::Disconnected {
                reason: Some(SHUTDOWN_REASON.into())
            }
        );

        manager.connect("Alice").unwrap();
        assert!(matches!(
            rx.recv().await.unwrap(),
            ClientEvent::Connected { .. }
        ));
    }

    #[tokio::test]
    async fn failed_dial_without_policy_ends_session() {
        let mut connector = IdleConnector::new();
        connector.fail = true;
        let dials = Arc::clone(&connector.dials);
        let (manager, _store, mut rx) = manager(connector, CoupClientConfig::new());

        manager.connect("Alice").unwrap();
        let ev = rx.recv().await.unwrap();
        assert!(
            matches!(ev, ClientEvent::Disconnected { reason: Some(ref r) } if r.starts_with("connect failed")),
            "got {ev:?}"
        );
        assert_eq!(dials.load(Ordering::Acquire), 1);
        assert!(!manager.has_session());
        assert!(!manager.is_connected());
    }

    #[tokio::test]
    async fn failed_dials_retry_until_policy_exhausted() {
        let mut connector = IdleConnector::new();
        connector.fail = true;
        let dials = Arc::clone(&connector.dials);
        let policy = ReconnectPolicy::default()
            .with_max_retries(2)
            .with_backoff(Duration::from_millis(1), Duration::from_millis(2));
        let (manager, _store, mut rx) =
            manager(connector, CoupClientConfig::new().with_reconnect(policy));

        manager.connect("Alice").unwrap();
        assert!(matches!(
            rx.recv().await.unwrap(),
            ClientEvent::Reconnecting { attempt: 1, .. }
        ));
        assert!(matches!(
            rx.recv().await.unwrap(),
            ClientEvent::Reconnecting { attempt: 2, .. }
        ));
        assert!(matches!(
            rx.recv().await.unwrap(),
            ClientEvent::Disconnected { .. }
        ));
        assert_eq!(dials.load(Ordering::Acquire), 3);
        assert!(!manager.has_session());
    }

    #[tokio::test]
    async fn session_waits_for_previous_one_before_dialing() {
        let connector = IdleConnector::new();
        let dials = Arc::clone(&connector.dials);
        let (manager, _store, mut rx) = manager(connector, CoupClientConfig::new());

        // Stand in for a previous session still delivering its last event.
        let previous = Arc::clone(&manager.shared.turn).lock_owned().await;
        manager.connect("Alice").unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(dials.load(Ordering::Acquire), 0);
        assert!(rx.try_recv().is_err());

        drop(previous);
        assert!(matches!(
            rx.recv().await.unwrap(),
            ClientEvent::Connected { .. }
        ));
        assert_eq!(dials.load(Ordering::Acquire), 1);
    }

    #[tokio::test]
    async fn disconnect_while_waiting_for_turn_ends_session() {
        let connector = IdleConnector::new();
        let dials = Arc::clone(&connector.dials);
        let (manager, _store, mut rx) = manager(connector, CoupClientConfig::new());

        let _previous = Arc::clone(&manager.shared.turn).lock_owned().await;
        manager.connect("Alice").unwrap();
        manager.disconnect().await;

        assert_eq!(
            rx.recv().await.unwrap(),
            ClientEvent::Disconnected {
                reason: Some(SHUTDOWN_REASON.into())
            }
        );
        assert_eq!(dials.load(Ordering::Acquire), 0);
        assert!(!manager.has_session());
    }

    #[tokio::test]
    async fn hanging_close_is_aborted_after_timeout() {
        let mut connector = IdleConnector::new();
        connector.hang_on_close = true;
        let closed = Arc::clone(&connector.closed);
        let config = CoupClientConfig::new().with_shutdown_timeout(Duration::from_millis(50));
        let (manager, _store, mut rx) = manager(connector, config);

        manager.connect("Alice").unwrap();
        let _ = rx.recv().await; // Connected

        tokio::time::timeout(Duration::from_secs(2), manager.disconnect())
            .await
            .expect("disconnect must not hang");
        assert!(closed.load(Ordering::Acquire));
        assert!(matches!(
            rx.recv().await.unwrap(),
            ClientEvent::Disconnected { .. }
        ));
    }
}
