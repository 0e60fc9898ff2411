//! Player intents → outbound protocol messages.

use tracing::debug;

use crate::connection::ConnectionHandle;
use crate::protocol::{ActionKind, OutboundMessage};

/// Turns player intents into [`OutboundMessage`]s and queues them on the
/// connection.
///
/// Every method returns immediately. While no connection is open the intent
/// is discarded and `false` is returned: UI controls may still be on screen
/// for a moment after the connection drops, and pressing one must not fail.
#[derive(Debug, Clone)]
pub struct ActionDispatcher {
    connection: ConnectionHandle,
}

impl ActionDispatcher {
    /// Create a dispatcher that sends through `connection`.
    pub fn new(connection: ConnectionHandle) -> Self {
        Self { connection }
    }

    /// Declare `action`, optionally naming the player it is aimed at.
    ///
    /// Returns `true` if the intent was queued for sending.
    pub fn send_action(&self, action: ActionKind, target: Option<String>) -> bool {
        self.dispatch(OutboundMessage::Action { action, target })
    }

    /// Challenge the role claim currently on the table.
    pub fn challenge(&self) -> bool {
        self.dispatch(OutboundMessage::Challenge)
    }

    /// Ask the server to leave the lobby and start the game.
    pub fn start_game(&self) -> bool {
        self.dispatch(OutboundMessage::StartGame)
    }

    fn dispatch(&self, msg: OutboundMessage) -> bool {
        let kind = msg.kind();
        let queued = self.connection.send(msg);
        if !queued {
            debug!(kind, "not connected; intent discarded");
        }
        queued
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

    #[test]
    fn intents_compose_expected_messages() {
        let (handle, mut rx) = ConnectionHandle::open_for_test();
        let dispatcher = ActionDispatcher::new(handle);

        assert!(dispatcher.send_action(ActionKind::Steal, Some("Bob".into())));
        assert!(dispatcher.challenge());
        assert!(dispatcher.start_game());

        assert_eq!(
            rx.try_recv().unwrap(),
            OutboundMessage::Action {
                action: ActionKind::Steal,
                target: Some("Bob".into()),
            }
        );
        assert_eq!(rx.try_recv().unwrap(), OutboundMessage::Challenge);
        assert_eq!(rx.try_recv().unwrap(), OutboundMessage::StartGame);
    }

    #[test]
    fn intents_after_close_are_silently_dropped() {
        let (handle, mut rx) = ConnectionHandle::open_for_test();
        let dispatcher = ActionDispatcher::new(handle.clone());
        handle.close_for_test();

        assert!(!dispatcher.send_action(ActionKind::Tax, None));
        assert!(!dispatcher.challenge());
        assert!(!dispatcher.start_game());
        assert!(rx.try_recv().is_err());
    }
}
