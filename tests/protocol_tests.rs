#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
//! Protocol serialization tests for the Coup client.
//!
//! Verifies the exact JSON shape of every outbound intent, decoding of every
//! inbound frame against fixtures that match real server output, and the
//! codec's fail-closed handling of malformed or unknown frames.

use coup_client::codec;
use coup_client::protocol::{
    ActionKind, GameSnapshot, InboundMessage, Influences, OutboundMessage, Phase, PlayerView,
    Role,
};
use coup_client::CoupClientError;
use serde_json::{json, Value};

// ════════════════════════════════════════════════════════════════════
// Helper
// ════════════════════════════════════════════════════════════════════

/// Encode `msg` and parse the frame back into a JSON value.
fn encoded(msg: &OutboundMessage) -> Value {
    serde_json::from_str(&codec::encode(msg).expect("encode")).expect("valid json")
}

fn decode_state(text: &str) -> GameSnapshot {
    match codec::try_decode(text).expect("decode") {
        InboundMessage::State { state } => state,
        other => panic!("expected state, got {other:?}"),
    }
}

/// A mid-game frame as the server sends it to Alice.
const ALICE_VIEW: &str = r#"{
    "type": "state",
    "state": {
        "phase": "WAITING_FOR_BLOCK",
        "current_player": "Bob",
        "players": [
            {"name": "Alice", "coins": 3, "influences": ["DUKE", "CONTESSA"], "revealed": [], "alive": true},
            {"name": "Bob", "coins": 5, "influences": 1, "revealed": ["CAPTAIN"], "alive": true},
            {"name": "Carol", "coins": 0, "influences": 0, "revealed": ["DUKE", "ASSASSIN"], "alive": false}
        ],
        "pending_action": "STEAL",
        "pending_actor": "Bob",
        "pending_target": "Alice"
    }
}"#;

// ════════════════════════════════════════════════════════════════════
// Outbound intents (3 variants)
// ════════════════════════════════════════════════════════════════════

#[test]
fn action_without_target_sends_null_target() {
    let msg = OutboundMessage::Action {
        action: ActionKind::Tax,
        target: None,
    };
    assert_eq!(
        encoded(&msg),
        json!({"type": "action", "action": "TAX", "target": null})
    );
}

#[test]
fn action_with_target_names_the_player() {
    let msg = OutboundMessage::Action {
        action: ActionKind::Assassinate,
        target: Some("Bob".into()),
    };
    assert_eq!(
        encoded(&msg),
        json!({"type": "action", "action": "ASSASSINATE", "target": "Bob"})
    );
}

#[test]
fn every_action_uses_its_server_name() {
    let names: Vec<Value> = ActionKind::ALL
        .iter()
        .map(|&action| encoded(&OutboundMessage::Action { action, target: None })["action"].clone())
        .collect();
    assert_eq!(
        names,
        vec![
            json!("INCOME"),
            json!("FOREIGN_AID"),
            json!("COUP"),
            json!("TAX"),
            json!("ASSASSINATE"),
            json!("EXCHANGE"),
            json!("STEAL"),
        ]
    );
}

#[test]
fn challenge_and_start_game_carry_only_the_type() {
    assert_eq!(encoded(&OutboundMessage::Challenge), json!({"type": "challenge"}));
    assert_eq!(
        encoded(&OutboundMessage::StartGame),
        json!({"type": "start_game"})
    );
}

#[test]
fn outbound_kinds_match_wire_tags() {
    for msg in [
        OutboundMessage::Action {
            action: ActionKind::Income,
            target: None,
        },
        OutboundMessage::Challenge,
        OutboundMessage::StartGame,
    ] {
        assert_eq!(encoded(&msg)["type"], json!(msg.kind()));
    }
}

#[test]
fn every_outbound_variant_decodes_back_unchanged() {
    for msg in [
        OutboundMessage::Action {
            action: ActionKind::Steal,
            target: Some("Bob".into()),
        },
        OutboundMessage::Action {
            action: ActionKind::Tax,
            target: None,
        },
        OutboundMessage::Challenge,
        OutboundMessage::StartGame,
    ] {
        let frame = codec::encode(&msg).unwrap();
        let back: OutboundMessage = serde_json::from_str(&frame).unwrap();
        assert_eq!(back, msg, "frame {frame}");
        assert_eq!(back.kind(), msg.kind());
    }
}

// ════════════════════════════════════════════════════════════════════
// Inbound frames (2 variants)
// ════════════════════════════════════════════════════════════════════

#[test]
fn lobby_state_decodes() {
    let state = decode_state(
        r#"{"type":"state","state":{"phase":"LOBBY","current_player":"","players":[{"name":"Alice","coins":2,"influences":2,"revealed":[]}]}}"#,
    );
    assert!(state.is_lobby());
    assert_eq!(state.current_player, "");
    assert_eq!(state.host().map(|p| p.name.as_str()), Some("Alice"));
    assert_eq!(state.players[0].influences, Influences::Hidden(2));
    assert_eq!(state.pending_action, None);
}

#[test]
fn mid_game_state_decodes_both_influence_shapes() {
    let state = decode_state(ALICE_VIEW);

    assert_eq!(state.phase, Phase::WaitingForBlock);
    assert_eq!(state.current_player, "Bob");

    let alice = state.player("Alice").unwrap();
    assert_eq!(alice.influences.roles(), Some(&[Role::Duke, Role::Contessa][..]));
    assert_eq!(alice.influences.count(), 2);

    let bob = state.player("Bob").unwrap();
    assert_eq!(bob.influences.roles(), None);
    assert_eq!(bob.influences.count(), 1);
    assert_eq!(bob.revealed, vec![Role::Captain]);

    let carol = state.player("Carol").unwrap();
    assert!(!carol.is_alive());
    assert_eq!(carol.revealed.len(), 2);

    assert_eq!(state.pending_action, Some(ActionKind::Steal));
    assert_eq!(state.pending_actor.as_deref(), Some("Bob"));
    assert_eq!(state.pending_target.as_deref(), Some("Alice"));
}

#[test]
fn game_over_names_the_last_player_standing() {
    let state = decode_state(
        r#"{"type":"state","state":{"phase":"GAME_OVER","current_player":"Alice","players":[
            {"name":"Alice","coins":4,"influences":["DUKE"],"revealed":["CAPTAIN"]},
            {"name":"Bob","coins":1,"influences":0,"revealed":["DUKE","CONTESSA"]}
        ]}}"#,
    );
    assert_eq!(state.phase, Phase::GameOver);
    assert_eq!(state.winner().map(|p| p.name.as_str()), Some("Alice"));
}

#[test]
fn unknown_phase_survives_decode_and_encode() {
    let state = decode_state(
        r#"{"type":"state","state":{"phase":"WAITING_FOR_EXCHANGE","current_player":"Alice","players":[{"name":"Alice","coins":2,"influences":2}]}}"#,
    );
    assert_eq!(state.phase, Phase::Other("WAITING_FOR_EXCHANGE".into()));
    assert_eq!(
        serde_json::to_value(&state).unwrap()["phase"],
        json!("WAITING_FOR_EXCHANGE")
    );
}

#[test]
fn missing_revealed_defaults_to_empty() {
    let state = decode_state(
        r#"{"type":"state","state":{"phase":"LOBBY","current_player":"","players":[{"name":"Alice","coins":2,"influences":2}]}}"#,
    );
    assert!(state.players[0].revealed.is_empty());
    assert_eq!(state.players[0].alive, None);
    assert!(state.players[0].is_alive());
}

#[test]
fn error_frame_decodes() {
    let msg = codec::try_decode(r#"{"type":"error","message":"Not your turn"}"#).unwrap();
    assert_eq!(
        msg,
        InboundMessage::Error {
            message: "Not your turn".into()
        }
    );
    assert_eq!(msg.kind(), "error");
}

#[test]
fn every_inbound_variant_survives_reserialization() {
    let state = codec::try_decode(ALICE_VIEW).unwrap();
    let error = InboundMessage::Error {
        message: "Not your turn".into(),
    };
    for msg in [state, error] {
        let text = serde_json::to_string(&msg).unwrap();
        let back = codec::try_decode(&text).unwrap();
        assert_eq!(back.kind(), msg.kind());
        assert_eq!(back, msg);
    }
}

#[test]
fn server_fixture_survives_reserialization() {
    let first = codec::try_decode(ALICE_VIEW).unwrap();
    let text = serde_json::to_string(&first).unwrap();
    assert_eq!(codec::try_decode(&text).unwrap(), first);
}

// ════════════════════════════════════════════════════════════════════
// Fail-closed decoding
// ════════════════════════════════════════════════════════════════════

#[test]
fn frames_that_are_not_protocol_messages_are_rejected() {
    for text in [
        "",
        "not json",
        "[]",
        r#"{"message":"no type"}"#,
        r#"{"type":"chat","text":"hi"}"#,
        r#"{"type":"error"}"#,
        r#"{"type":"state"}"#,
        r#"{"type":"state","state":{"phase":"LOBBY","players":[]}}"#,
        r#"{"type":"state","state":{"phase":"LOBBY","current_player":"","players":[{"name":"Alice","coins":-1,"influences":2}]}}"#,
        r#"{"type":"state","state":{"phase":"LOBBY","current_player":"","players":[{"name":"Alice","coins":2,"influences":["JESTER"]}]}}"#,
    ] {
        assert!(
            matches!(
                codec::try_decode(text),
                Err(CoupClientError::Serialization(_))
            ),
            "accepted {text:?}"
        );
        assert!(codec::decode(text).is_none());
    }
}

#[test]
fn inconsistent_snapshots_are_rejected() {
    let seat = |name: &str| PlayerView {
        name: name.into(),
        coins: 2,
        influences: Influences::Hidden(2),
        revealed: vec![],
        alive: None,
    };
    let frame = |phase: Phase, current: &str, names: &[&str]| {
        serde_json::to_string(&InboundMessage::State {
            state: GameSnapshot {
                phase,
                current_player: current.into(),
                players: names.iter().map(|n| seat(n)).collect(),
                pending_action: None,
                pending_actor: None,
                pending_target: None,
            },
        })
        .unwrap()
    };

    for text in [
        frame(Phase::Lobby, "", &["Alice", "Alice"]),
        frame(Phase::WaitingForAction, "", &["Alice", "Bob"]),
        frame(Phase::WaitingForAction, "Zed", &["Alice", "Bob"]),
    ] {
        assert!(
            matches!(
                codec::try_decode(&text),
                Err(CoupClientError::InvalidSnapshot(_))
            ),
            "accepted {text}"
        );
    }

    assert!(codec::try_decode(&frame(Phase::WaitingForAction, "Bob", &["Alice", "Bob"])).is_ok());
}
