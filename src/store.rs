//! Holder of the latest authoritative snapshot.
//!
//! [`StateStore`] is the only writer of the snapshot. Readers either poll
//! [`StateStore::snapshot`] or hold a [`watch::Receiver`] from
//! [`StateStore::subscribe`], which observes every replacement as soon as
//! [`StateStore::apply`] returns.
//!
//! Each connection runs under an *epoch*. The session loop applies frames with
//! [`StateStore::apply_in`], so once a connection has been torn down (and the
//! epoch moved on) a late frame from it cannot touch the store.

use std::sync::{Arc, Mutex};

use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

use crate::event::ClientEvent;
use crate::protocol::{GameSnapshot, InboundMessage};

/// Shared handle to the current snapshot, absent while disconnected or
/// before the first `state` frame.
pub type SharedSnapshot = Option<Arc<GameSnapshot>>;

/// What [`StateStore::apply`] did with a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// The snapshot was replaced and subscribers notified.
    Replaced,
    /// The server's error text was forwarded; the snapshot is unchanged.
    ErrorReported,
}

/// Latest snapshot plus the error-reporting channel.
#[derive(Debug)]
pub struct StateStore {
    snapshot: watch::Sender<SharedSnapshot>,
    epoch: Mutex<u64>,
    events: mpsc::Sender<ClientEvent>,
}

impl StateStore {
    /// Create an empty store that reports server errors on `events`.
    pub fn new(events: mpsc::Sender<ClientEvent>) -> Self {
        let (snapshot, _) = watch::channel(None);
        Self {
            snapshot,
            epoch: Mutex::new(0),
            events,
        }
    }

    /// The current snapshot, if any.
    pub fn snapshot(&self) -> SharedSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Observe snapshot replacements.
    pub fn subscribe(&self) -> watch::Receiver<SharedSnapshot> {
        self.snapshot.subscribe()
    }

    /// Apply an inbound message.
    ///
    /// A `state` message replaces the snapshot wholesale. An `error` message
    /// is forwarded as [`ClientEvent::ServerError`] without waiting for the
    /// consumer; if the event channel is full the error is logged and dropped.
    pub fn apply(&self, msg: InboundMessage) -> Applied {
        match msg {
            InboundMessage::State { state } => {
                debug!(
                    phase = %state.phase,
                    current_player = %state.current_player,
                    players = state.players.len(),
                    "snapshot replaced"
                );
                self.snapshot.send_replace(Some(Arc::new(state)));
                Applied::Replaced
            }
            InboundMessage::Error { message } => {
                debug!(%message, "server reported error");
                match self.events.try_send(ClientEvent::ServerError { message }) {
                    Ok(()) => {}
                    Err(mpsc::error::TrySendError::Full(dropped)) => {
                        warn!("event channel full, dropping server error: {dropped:?}");
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => {
                        debug!("event channel closed, receiver dropped");
                    }
                }
                Applied::ErrorReported
            }
        }
    }

    /// Apply `msg` only if `epoch` is still current.
    ///
    /// Returns `None` when the message belongs to a torn-down connection.
    pub fn apply_in(&self, epoch: u64, msg: InboundMessage) -> Option<Applied> {
        let current = self.lock_epoch();
        if *current != epoch {
            debug!(epoch, current = *current, "dropping frame from stale connection");
            return None;
        }
        Some(self.apply(msg))
    }

    /// Start a new epoch, clearing the snapshot. Frames tagged with any
    /// earlier epoch are ignored from now on.
    pub fn begin_epoch(&self) -> u64 {
        let mut current = self.lock_epoch();
        *current = current.wrapping_add(1);
        self.clear_snapshot();
        *current
    }

    /// Tear down the current epoch. Equivalent to [`begin_epoch`](Self::begin_epoch)
    /// without a connection to go with it.
    pub fn invalidate(&self) {
        let _ = self.begin_epoch();
    }

    /// Clear the snapshot if `epoch` is still current.
    pub fn clear_in(&self, epoch: u64) -> bool {
        let current = self.lock_epoch();
        if *current != epoch {
            return false;
        }
        self.clear_snapshot();
        true
    }

    /// Returns `true` if `epoch` is the live one.
    pub fn is_current(&self, epoch: u64) -> bool {
        *self.lock_epoch() == epoch
    }

    fn clear_snapshot(&self) {
        self.snapshot.send_if_modified(|snapshot| snapshot.take().is_some());
    }

    fn lock_epoch(&self) -> std::sync::MutexGuard<'_, u64> {
        // The guarded value is a plain counter, so a poisoned lock is still usable.
        self.epoch
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
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
    use crate::protocol::{Influences, Phase, PlayerView};

    fn player(name: &str, coins: u32) -> PlayerView {
        PlayerView {
            name: name.into(),
            coins,
            influences: Influences::Hidden(2),
            revealed: vec![],
            alive: None,
        }
    }

    fn snapshot(phase: Phase, current: &str, players: Vec<PlayerView>) -> GameSnapshot {
        GameSnapshot {
            phase,
            current_player: current.into(),
            players,
            pending_action: None,
            pending_actor: None,
            pending_target: None,
        }
    }

    fn store() -> (StateStore, mpsc::Receiver<ClientEvent>) {
        let (tx, rx) = mpsc::channel(8);
        (StateStore::new(tx), rx)
    }

    #[test]
    fn state_replaces_snapshot_wholesale() {
        let (store, _rx) = store();
        let first = snapshot(
            Phase::WaitingForAction,
            "Alice",
            vec![player("Alice", 5), player("Bob", 2)],
        );
        let mut second = snapshot(Phase::Lobby, "", vec![player("Carol", 2)]);
        second.pending_actor = Some("Carol".into());

        assert_eq!(
            store.apply(InboundMessage::State {
                state: first.clone()
            }),
            Applied::Replaced
        );
        assert_eq!(*store.snapshot().unwrap(), first);

        store.apply(InboundMessage::State {
            state: second.clone(),
        });
        assert_eq!(*store.snapshot().unwrap(), second);
    }

    #[test]
    fn error_forwards_text_and_keeps_snapshot() {
        let (store, mut rx) = store();
        let state = snapshot(Phase::WaitingForAction, "Alice", vec![player("Alice", 2)]);
        store.apply(InboundMessage::State {
            state: state.clone(),
        });

        let applied = store.apply(InboundMessage::Error {
            message: "Not your turn".into(),
        });
        assert_eq!(applied, Applied::ErrorReported);
        assert_eq!(*store.snapshot().unwrap(), state);
        assert_eq!(
            rx.try_recv().unwrap(),
            ClientEvent::ServerError {
                message: "Not your turn".into()
            }
        );
    }

    #[test]
    fn error_on_full_channel_does_not_block() {
        let (tx, _rx) = mpsc::channel(1);
        let store = StateStore::new(tx);
        for _ in 0..5 {
            store.apply(InboundMessage::Error {
                message: "spam".into(),
            });
        }
    }

    #[test]
    fn subscribers_see_replacement_immediately() {
        let (store, _rx) = store();
        let mut sub = store.subscribe();
        assert!(!sub.has_changed().unwrap());

        store.apply(InboundMessage::State {
            state: snapshot(Phase::Lobby, "", vec![player("Alice", 2)]),
        });
        assert!(sub.has_changed().unwrap());
        let seen = sub.borrow_and_update().clone().unwrap();
        assert_eq!(seen.players[0].name, "Alice");
    }

    #[test]
    fn stale_epoch_cannot_mutate() {
        let (store, _rx) = store();
        let old = store.begin_epoch();
        let msg = InboundMessage::State {
            state: snapshot(Phase::Lobby, "", vec![player("Alice", 2)]),
        };
        assert_eq!(store.apply_in(old, msg.clone()), Some(Applied::Replaced));

        store.invalidate();
        assert!(store.snapshot().is_none());
        assert!(!store.is_current(old));
        assert_eq!(store.apply_in(old, msg), None);
        assert!(store.snapshot().is_none());
        assert!(!store.clear_in(old));
    }

    #[test]
    fn clear_in_current_epoch_empties_snapshot() {
        let (store, _rx) = store();
        let epoch = store.begin_epoch();
        store.apply_in(
            epoch,
            InboundMessage::State {
                state: snapshot(Phase::Lobby, "", vec![player("Alice", 2)]),
            },
        );
        let mut sub = store.subscribe();
        assert!(store.clear_in(epoch));
        assert!(store.snapshot().is_none());
        assert!(sub.has_changed().unwrap());
        assert!(sub.borrow_and_update().is_none());
    }
}
