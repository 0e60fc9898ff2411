//! Events emitted by the client for the presentation layer.
//!
//! Snapshot replacement is observed through
//! [`StateStore::subscribe`](crate::store::StateStore::subscribe); this channel
//! carries everything else that a UI surfaces to the user.

use std::time::Duration;

/// Connection lifecycle and application events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// The transport opened. No snapshot is available until the first
    /// `state` frame arrives.
    Connected {
        /// Name the connection is addressed by.
        player_name: String,
    },

    /// The server rejected an intent. The game state is unchanged.
    ServerError {
        /// Human-readable text from the server.
        message: String,
    },

    /// The connection dropped and the client will dial again after `delay`.
    Reconnecting {
        /// One-based retry counter.
        attempt: u32,
        /// Backoff before the retry.
        delay: Duration,
    },

    /// The connection closed. Always the last event of a session.
    Disconnected {
        /// Human-readable cause, if known. Informational only: every close
        /// leads to the same state transition.
        reason: Option<String>,
    },
}
