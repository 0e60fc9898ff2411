//! JSON framing for outbound intents and inbound server frames.
//!
//! Decoding fails closed: a frame that cannot be parsed, carries an unknown
//! `type`, or describes an impossible snapshot is rejected here and never
//! reaches the [`StateStore`](crate::store::StateStore).

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::error::{CoupClientError, Result};
use crate::protocol::{GameSnapshot, InboundMessage, OutboundMessage, Phase};

/// Serialize an outbound intent into a single text frame.
///
/// # Errors
///
/// Returns [`CoupClientError::Serialization`] if serialization fails.
pub fn encode(msg: &OutboundMessage) -> Result<String> {
    Ok(serde_json::to_string(msg)?)
}

/// Parse and validate an inbound text frame.
///
/// # Errors
///
/// - [`CoupClientError::Serialization`] if the frame is not JSON, the `type`
///   discriminant is missing or unknown, or a field has the wrong shape.
/// - [`CoupClientError::InvalidSnapshot`] if a `state` frame breaks a
///   snapshot invariant.
pub fn try_decode(text: &str) -> Result<InboundMessage> {
    let msg: InboundMessage = serde_json::from_str(text)?;
    if let InboundMessage::State { state } = &msg {
        validate_snapshot(state)?;
    }
    Ok(msg)
}

/// Decode an inbound frame, dropping it with a warning if it is rejected.
pub fn decode(text: &str) -> Option<InboundMessage> {
    match try_decode(text) {
        Ok(msg) => Some(msg),
        Err(e) => {
            warn!(len = text.len(), "dropping inbound frame: {e}");
            debug!(prefix = truncated(text), "dropped frame");
            None
        }
    }
}

/// Leading part of `text` for logging, cut on a char boundary.
fn truncated(text: &str) -> &str {
    const MAX_LOGGED_FRAME: usize = 256;
    if text.len() <= MAX_LOGGED_FRAME {
        return text;
    }
    let mut end = MAX_LOGGED_FRAME;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text.get(..end).unwrap_or_default()
}

/// Check the invariants the client relies on when rendering a snapshot.
///
/// Player names must be unique, and `current_player` must name a seated
/// player. An empty `current_player` is only accepted in the lobby, where no
/// turn order exists yet.
pub fn validate_snapshot(snapshot: &GameSnapshot) -> Result<()> {
    let mut seen = HashSet::with_capacity(snapshot.players.len());
    for player in &snapshot.players {
        if !seen.insert(player.name.as_str()) {
            return Err(CoupClientError::InvalidSnapshot(format!(
                "duplicate player name {:?}",
                player.name
            )));
        }
    }

    if snapshot.current_player.is_empty() {
        if snapshot.phase != Phase::Lobby {
            return Err(CoupClientError::InvalidSnapshot(format!(
                "no current player in phase {}",
                snapshot.phase
            )));
        }
    } else if !seen.contains(snapshot.current_player.as_str()) {
        return Err(CoupClientError::InvalidSnapshot(format!(
            "current player {:?} is not seated",
            snapshot.current_player
        )));
    }

    Ok(())
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
    use crate::protocol::{ActionKind, Influences, Role};

    #[test]
    fn encode_action_keeps_null_target() {
        let json = encode(&OutboundMessage::Action {
            action: ActionKind::Tax,
            target: None,
        })
        .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(
            value,
            serde_json::json!({ "type": "action", "action": "TAX", "target": null })
        );
    }

    #[test]
    fn encode_bare_intents() {
        assert_eq!(
            encode(&OutboundMessage::Challenge).unwrap(),
            r#"{"type":"challenge"}"#
        );
        assert_eq!(
            encode(&OutboundMessage::StartGame).unwrap(),
            r#"{"type":"start_game"}"#
        );
    }

    #[test]
    fn decode_lobby_state_with_empty_current_player() {
        let msg = try_decode(
            r#"{"type":"state","state":{"phase":"LOBBY","current_player":"","players":[{"name":"Alice","coins":2,"influences":2,"revealed":[]}]}}"#,
        )
        .unwrap();
        let InboundMessage::State { state } = msg else {
            panic!("expected state");
        };
        assert_eq!(state.phase, Phase::Lobby);
        assert_eq!(state.players[0].influences, Influences::Hidden(2));
    }

    #[test]
    fn decode_own_hand_as_roles() {
        let msg = try_decode(
            r#"{"type":"state","state":{"phase":"WAITING_FOR_ACTION","current_player":"Alice","players":[
                {"name":"Alice","coins":2,"influences":["DUKE","CONTESSA"],"revealed":[]},
                {"name":"Bob","coins":2,"influences":1,"revealed":["CAPTAIN"],"alive":true}]}}"#,
        )
        .unwrap();
        let InboundMessage::State { state } = msg else {
            panic!("expected state");
        };
        assert_eq!(
            state.players[0].influences.roles(),
            Some(&[Role::Duke, Role::Contessa][..])
        );
        assert_eq!(state.players[1].revealed, vec![Role::Captain]);
        assert_eq!(state.players[1].alive, Some(true));
    }

    #[test]
    fn decode_error_frame() {
        let msg = try_decode(r#"{"type":"error","message":"Not your turn"}"#).unwrap();
        assert_eq!(
            msg,
            InboundMessage::Error {
                message: "Not your turn".into()
            }
        );
    }

    #[test]
    fn unknown_discriminant_is_rejected() {
        assert!(decode(r#"{"type":"chat","message":"hi"}"#).is_none());
        assert!(matches!(
            try_decode(r#"{"type":"chat"}"#),
            Err(CoupClientError::Serialization(_))
        ));
    }

    #[test]
    fn malformed_frames_are_rejected() {
        for raw in [
            "",
            "not json",
            "[]",
            r#"{"message":"no type"}"#,
            r#"{"type":"state"}"#,
            r#"{"type":"state","state":{"phase":"LOBBY"}}"#,
            r#"{"type":"error"}"#,
        ] {
            assert!(decode(raw).is_none(), "frame should be dropped: {raw}");
        }
    }

    #[test]
    fn negative_coins_are_rejected() {
        let raw = r#"{"type":"state","state":{"phase":"LOBBY","current_player":"","players":[{"name":"A","coins":-1,"influences":2,"revealed":[]}]}}"#;
        assert!(decode(raw).is_none());
    }

    #[test]
    fn unseated_current_player_is_rejected() {
        let raw = r#"{"type":"state","state":{"phase":"WAITING_FOR_ACTION","current_player":"Mallory","players":[{"name":"Alice","coins":2,"influences":2,"revealed":[]}]}}"#;
        assert!(matches!(
            try_decode(raw),
            Err(CoupClientError::InvalidSnapshot(_))
        ));
    }

    #[test]
    fn empty_current_player_outside_lobby_is_rejected() {
        let raw = r#"{"type":"state","state":{"phase":"TAX_TIME","current_player":"","players":[]}}"#;
        assert!(matches!(
            try_decode(raw),
            Err(CoupClientError::InvalidSnapshot(_))
        ));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let raw = r#"{"type":"state","state":{"phase":"LOBBY","current_player":"","players":[
            {"name":"Alice","coins":2,"influences":2,"revealed":[]},
            {"name":"Alice","coins":2,"influences":2,"revealed":[]}]}}"#;
        assert!(matches!(
            try_decode(raw),
            Err(CoupClientError::InvalidSnapshot(_))
        ));
    }

    #[test]
    fn unknown_phase_round_trips() {
        let raw = r#"{"type":"state","state":{"phase":"WAITING_FOR_EXCHANGE","current_player":"Alice","players":[{"name":"Alice","coins":2,"influences":2,"revealed":[]}]}}"#;
        let msg = try_decode(raw).unwrap();
        let InboundMessage::State { state } = &msg else {
            panic!("expected state");
        };
        assert_eq!(state.phase, Phase::Other("WAITING_FOR_EXCHANGE".into()));
        let again = try_decode(&serde_json::to_string(&msg).unwrap()).unwrap();
        assert_eq!(again, msg);
    }

    #[test]
    fn extra_server_fields_are_ignored() {
        let raw = r#"{"type":"state","state":{"phase":"WAITING_FOR_CHALLENGE","current_player":"Alice",
            "pending_action":"TAX","pending_actor":"Alice","pending_target":null,"deck_size":9,
            "players":[{"name":"Alice","coins":2,"influences":2,"revealed":[]}]}}"#;
        let msg = try_decode(raw).unwrap();
        let InboundMessage::State { state } = msg else {
            panic!("expected state");
        };
        assert_eq!(state.pending_action, Some(ActionKind::Tax));
        assert_eq!(state.pending_actor.as_deref(), Some("Alice"));
        assert!(state.pending_target.is_none());
    }

    #[test]
    fn logged_prefix_is_bounded_and_char_aligned() {
        assert_eq!(truncated("short"), "short");

        let huge = "x".repeat(10_000);
        assert_eq!(truncated(&huge).len(), 256);

        // A two-byte char straddling the cut is left out whole.
        let mixed = format!("{}é{}", "a".repeat(255), "b".repeat(100));
        assert_eq!(truncated(&mixed), "a".repeat(255));

        assert!(decode(&format!("{{\"type\":\"{huge}\"}}")).is_none());
    }
}
