//! Which screen to show and which controls are legal right now.
//!
//! [`derive`] is a pure function of the connection status, the latest
//! snapshot, and the local player's name. It never changes phase on its own;
//! it only reflects the phase the server declared.

use crate::protocol::{ActionKind, GameSnapshot, Phase};

/// Minimum number of seated players before the host may start.
pub const MIN_PLAYERS_TO_START: usize = 2;

/// Top-level screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Screen {
    /// No connection; ask for a name and connect.
    Connect,
    /// Connected, waiting for players or for the first snapshot.
    Lobby,
    /// A game is in progress (or just finished).
    Game,
}

/// A single interactive control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Control {
    Action(ActionKind),
    Challenge,
    StartGame,
}

/// The controls a player may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EnabledControls {
    /// Ordinary turn actions (income, foreign aid, tax, ...).
    pub actions: bool,
    /// Challenging the pending role claim.
    pub challenge: bool,
    /// Starting the game from the lobby.
    pub start_game: bool,
}

impl EnabledControls {
    /// Every control disabled.
    pub const NONE: EnabledControls = EnabledControls {
        actions: false,
        challenge: false,
        start_game: false,
    };

    /// Actions that can be declared right now.
    pub fn available_actions(&self) -> &'static [ActionKind] {
        if self.actions {
            &ActionKind::ALL
        } else {
            &[]
        }
    }

    /// Returns `true` if `control` may be used.
    pub fn is_enabled(&self, control: Control) -> bool {
        match control {
            Control::Action(_) => self.actions,
            Control::Challenge => self.challenge,
            Control::StartGame => self.start_game,
        }
    }
}

/// Screen plus controls, ready to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UiView {
    pub screen: Screen,
    pub controls: EnabledControls,
}

impl UiView {
    /// Returns `true` if `control` may be used.
    pub fn is_enabled(&self, control: Control) -> bool {
        self.controls.is_enabled(control)
    }
}

/// Derive the view for `local_player`.
///
/// - Not connected: [`Screen::Connect`], nothing enabled.
/// - Connected with no snapshot, or in the `LOBBY` phase: [`Screen::Lobby`];
///   only the host may start, and only once enough players are seated.
/// - Otherwise [`Screen::Game`]: turn actions for the current player, and
///   the challenge control for everyone while a claim is open to challenge.
pub fn derive(connected: bool, snapshot: Option<&GameSnapshot>, local_player: &str) -> UiView {
    if !connected {
        return UiView {
            screen: Screen::Connect,
            controls: EnabledControls::NONE,
        };
    }

    let Some(snapshot) = snapshot.filter(|s| !s.is_lobby()) else {
        let start_game = snapshot.is_some_and(|s| can_start(s, local_player));
        return UiView {
            screen: Screen::Lobby,
            controls: EnabledControls {
                start_game,
                ..EnabledControls::NONE
            },
        };
    };

    UiView {
        screen: Screen::Game,
        controls: EnabledControls {
            actions: snapshot.current_player == local_player,
            challenge: snapshot.phase == Phase::WaitingForChallenge,
            start_game: false,
        },
    }
}

fn can_start(snapshot: &GameSnapshot, local_player: &str) -> bool {
    snapshot.players.len() >= MIN_PLAYERS_TO_START
        && snapshot.host().is_some_and(|host| host.name == local_player)
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
    use crate::protocol::{Influences, PlayerView};

    fn table(phase: Phase, current: &str, names: &[&str]) -> GameSnapshot {
        GameSnapshot {
            phase,
            current_player: current.into(),
            players: names
                .iter()
                .map(|n| PlayerView {
                    name: (*n).into(),
                    coins: 2,
                    influences: Influences::Hidden(2),
                    revealed: vec![],
                    alive: None,
                })
                .collect(),
            pending_action: None,
            pending_actor: None,
            pending_target: None,
        }
    }

    #[test]
    fn disconnected_shows_connect_regardless_of_snapshot() {
        let s = table(Phase::WaitingForChallenge, "Alice", &["Alice", "Bob"]);
        let view = derive(false, Some(&s), "Alice");
        assert_eq!(view.screen, Screen::Connect);
        assert_eq!(view.controls, EnabledControls::NONE);
        assert!(view.controls.available_actions().is_empty());
    }

    #[test]
    fn connected_without_snapshot_is_lobby() {
        let view = derive(true, None, "Alice");
        assert_eq!(view.screen, Screen::Lobby);
        assert_eq!(view.controls, EnabledControls::NONE);
    }

    #[test]
    fn host_alone_cannot_start() {
        let s = table(Phase::Lobby, "", &["Alice"]);
        let view = derive(true, Some(&s), "Alice");
        assert_eq!(view.screen, Screen::Lobby);
        assert!(!view.is_enabled(Control::StartGame));
    }

    #[test]
    fn host_with_two_players_can_start() {
        let s = table(Phase::Lobby, "", &["Alice", "Bob"]);
        assert!(derive(true, Some(&s), "Alice").is_enabled(Control::StartGame));
        assert!(!derive(true, Some(&s), "Bob").is_enabled(Control::StartGame));
    }

    #[test]
    fn lobby_never_enables_game_controls() {
        let s = table(Phase::Lobby, "Alice", &["Alice", "Bob"]);
        let view = derive(true, Some(&s), "Alice");
        assert!(!view.controls.actions);
        assert!(!view.controls.challenge);
    }

    #[test]
    fn actions_follow_current_player() {
        let s = table(Phase::WaitingForAction, "Bob", &["Alice", "Bob"]);
        let bob = derive(true, Some(&s), "Bob");
        let alice = derive(true, Some(&s), "Alice");
        assert_eq!(bob.screen, Screen::Game);
        assert!(bob.is_enabled(Control::Action(ActionKind::Income)));
        assert_eq!(bob.controls.available_actions(), &ActionKind::ALL);
        assert!(!alice.is_enabled(Control::Action(ActionKind::Income)));
        assert!(!bob.controls.start_game);
    }

    #[test]
    fn challenge_is_open_to_everyone() {
        let s = table(Phase::WaitingForChallenge, "Alice", &["Alice", "Bob", "Carol"]);
        for name in ["Alice", "Bob", "Carol"] {
            assert!(derive(true, Some(&s), name).is_enabled(Control::Challenge));
        }
        let s = table(Phase::WaitingForBlock, "Alice", &["Alice", "Bob"]);
        assert!(!derive(true, Some(&s), "Bob").is_enabled(Control::Challenge));
    }

    #[test]
    fn unknown_phase_is_a_game_screen() {
        let s = table(Phase::Other("TURN".into()), "Alice", &["Alice", "Bob"]);
        let view = derive(true, Some(&s), "Bob");
        assert_eq!(view.screen, Screen::Game);
        assert!(!view.controls.challenge);
    }

    #[test]
    fn control_gating_matches_rules_for_every_phase() {
        let phases = [
            Phase::WaitingForAction,
            Phase::ActionDeclared,
            Phase::WaitingForChallenge,
            Phase::WaitingForBlock,
            Phase::Resolution,
            Phase::GameOver,
            Phase::Other("TURN".into()),
        ];
        let names = ["Alice", "Bob", "Carol"];
        for phase in phases {
            for current in names {
                let s = table(phase.clone(), current, &names);
                for local in names {
                    let view = derive(true, Some(&s), local);
                    assert_eq!(view.controls.actions, current == local);
                    assert_eq!(
                        view.controls.challenge,
                        phase == Phase::WaitingForChallenge
                    );
                    assert!(!view.controls.start_game);
                }
            }
        }
    }
}
