//! Wire-compatible protocol types for the Coup game server.
//!
//! Every frame is a JSON object carrying a `type` discriminant. Enum values
//! (phases, actions, roles) travel as `SCREAMING_SNAKE_CASE` strings, matching
//! the server's enum member names.

use std::fmt;

use serde::{Deserialize, Serialize};

// ── Enums ───────────────────────────────────────────────────────────

/// A hidden role card.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Duke,
    Assassin,
    Captain,
    Ambassador,
    Contessa,
}

/// An action a player may declare on their turn.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionKind {
    /// Take one coin. Cannot be blocked or challenged.
    Income,
    /// Take two coins. Blockable by a Duke claim.
    ForeignAid,
    /// Pay seven coins; the target loses an influence.
    Coup,
    /// Duke claim: take three coins.
    Tax,
    /// Assassin claim: pay three coins; the target loses an influence.
    Assassinate,
    /// Ambassador claim: swap cards with the court deck.
    Exchange,
    /// Captain claim: take up to two coins from the target.
    Steal,
}

impl ActionKind {
    /// Every action, in the order the server declares them.
    pub const ALL: [ActionKind; 7] = [
        ActionKind::Income,
        ActionKind::ForeignAid,
        ActionKind::Coup,
        ActionKind::Tax,
        ActionKind::Assassinate,
        ActionKind::Exchange,
        ActionKind::Steal,
    ];

    /// Returns `true` if the action must name another player.
    pub fn requires_target(self) -> bool {
        matches!(
            self,
            ActionKind::Coup | ActionKind::Assassinate | ActionKind::Steal
        )
    }

    /// The role the actor claims by declaring this action, if any.
    pub fn claimed_role(self) -> Option<Role> {
        match self {
            ActionKind::Tax => Some(Role::Duke),
            ActionKind::Assassinate => Some(Role::Assassin),
            ActionKind::Steal => Some(Role::Captain),
            ActionKind::Exchange => Some(Role::Ambassador),
            ActionKind::Income | ActionKind::ForeignAid | ActionKind::Coup => None,
        }
    }
}

/// The server-declared stage of play.
///
/// Phases this client does not know about are kept verbatim in
/// [`Phase::Other`] so they survive a decode/encode cycle unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Phase {
    /// Players are gathering; the host may start the game.
    Lobby,
    WaitingForAction,
    ActionDeclared,
    /// A role claim is open to challenge by any player.
    WaitingForChallenge,
    WaitingForBlock,
    Resolution,
    GameOver,
    /// A phase name not known to this client.
    Other(String),
}

impl Phase {
    /// Wire name of the phase.
    pub fn as_str(&self) -> &str {
        match self {
            Phase::Lobby => "LOBBY",
            Phase::WaitingForAction => "WAITING_FOR_ACTION",
            Phase::ActionDeclared => "ACTION_DECLARED",
            Phase::WaitingForChallenge => "WAITING_FOR_CHALLENGE",
            Phase::WaitingForBlock => "WAITING_FOR_BLOCK",
            Phase::Resolution => "RESOLUTION",
            Phase::GameOver => "GAME_OVER",
            Phase::Other(name) => name,
        }
    }
}

impl From<String> for Phase {
    fn from(name: String) -> Self {
        match name.as_str() {
            "LOBBY" => Phase::Lobby,
            "WAITING_FOR_ACTION" => Phase::WaitingForAction,
            "ACTION_DECLARED" => Phase::ActionDeclared,
            "WAITING_FOR_CHALLENGE" => Phase::WaitingForChallenge,
            "WAITING_FOR_BLOCK" => Phase::WaitingForBlock,
            "RESOLUTION" => Phase::Resolution,
            "GAME_OVER" => Phase::GameOver,
            _ => Phase::Other(name),
        }
    }
}

impl From<Phase> for String {
    fn from(phase: Phase) -> Self {
        match phase {
            Phase::Other(name) => name,
            known => known.as_str().to_owned(),
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A player's unrevealed influences as seen by the receiving client.
///
/// The server sends the viewer's own hand as a list of roles and every other
/// hand as a bare count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Influences {
    /// Opaque count of face-down cards.
    Hidden(u32),
    /// Role identities visible to this viewer.
    Known(Vec<Role>),
}

impl Influences {
    /// Number of unrevealed cards, whichever form the server used.
    pub fn count(&self) -> usize {
        match self {
            Influences::Hidden(n) => *n as usize,
            Influences::Known(roles) => roles.len(),
        }
    }

    /// The visible roles, if this viewer is allowed to see them.
    pub fn roles(&self) -> Option<&[Role]> {
        match self {
            Influences::Hidden(_) => None,
            Influences::Known(roles) => Some(roles),
        }
    }
}

// ── Structs ─────────────────────────────────────────────────────────

/// One seat at the table, from the receiving player's point of view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerView {
    pub name: String,
    pub coins: u32,
    pub influences: Influences,
    /// Roles already exposed to everyone, oldest first.
    #[serde(default)]
    pub revealed: Vec<Role>,
    /// Whether the player still holds influence. Absent on older servers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alive: Option<bool>,
}

impl PlayerView {
    /// Returns `true` unless the server marked the player eliminated, or
    /// the player visibly holds no influence.
    pub fn is_alive(&self) -> bool {
        self.alive.unwrap_or_else(|| self.influences.count() > 0)
    }
}

/// The complete authoritative game state pushed by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub phase: Phase,
    /// Name of the player whose turn it is. Empty while in the lobby.
    pub current_player: String,
    /// Seats in server-assigned order. Index 0 is the host.
    pub players: Vec<PlayerView>,
    /// Action awaiting challenge, block or resolution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_action: Option<ActionKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_actor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_target: Option<String>,
}

impl GameSnapshot {
    /// The first player to join, if anyone has.
    pub fn host(&self) -> Option<&PlayerView> {
        self.players.first()
    }

    /// Looks up a player by name.
    pub fn player(&self, name: &str) -> Option<&PlayerView> {
        self.players.iter().find(|p| p.name == name)
    }

    /// Returns `true` while the game has not been started.
    pub fn is_lobby(&self) -> bool {
        self.phase == Phase::Lobby
    }

    /// The sole surviving player once the game is over.
    pub fn winner(&self) -> Option<&PlayerView> {
        if self.phase != Phase::GameOver {
            return None;
        }
        let mut alive = self.players.iter().filter(|p| p.is_alive());
        match (alive.next(), alive.next()) {
            (Some(winner), None) => Some(winner),
            _ => None,
        }
    }
}

// ── Messages ────────────────────────────────────────────────────────

/// Message types sent from client to server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    /// Declare an action. `target` is serialized as `null` when absent.
    Action {
        action: ActionKind,
        #[serde(default)]
        target: Option<String>,
    },
    /// Challenge the role claim currently on the table.
    Challenge,
    /// Host only: leave the lobby and deal the cards.
    StartGame,
}

/// Message types sent from server to client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundMessage {
    /// Full replacement of the game state.
    State { state: GameSnapshot },
    /// Application-level rejection (e.g. acting out of turn).
    Error { message: String },
}

impl InboundMessage {
    /// Short name of the variant, as it appears in the `type` field.
    pub fn kind(&self) -> &'static str {
        match self {
            InboundMessage::State { .. } => "state",
            InboundMessage::Error { .. } => "error",
        }
    }
}

impl OutboundMessage {
    /// Short name of the variant, as it appears in the `type` field.
    pub fn kind(&self) -> &'static str {
        match self {
            OutboundMessage::Action { .. } => "action",
            OutboundMessage::Challenge => "challenge",
            OutboundMessage::StartGame => "start_game",
        }
    }
}
