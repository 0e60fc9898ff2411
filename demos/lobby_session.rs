//! # Lobby Session Example
//!
//! Joins a Coup table over WebSocket and plays a very simple strategy:
//!
//! 1. Connect as a named player
//! 2. Start the game as soon as the host is allowed to
//! 3. Take income on every turn
//! 4. Shut down on Ctrl+C, game over, or disconnect
//!
//! ## Running
//!
//! ```sh
//! # Start a Coup server on localhost:8000, then:
//! cargo run --example lobby_session -- Alice
//!
//! # Override the server URL:
//! COUP_SERVER_URL=ws://my-server:8000 cargo run --example lobby_session -- Bob
//! ```

use std::time::Duration;

use coup_client::protocol::{ActionKind, Phase};
use coup_client::{
    ClientEvent, Control, CoupClient, CoupClientConfig, ReconnectPolicy, WebSocketConnector,
};

/// Default server URL when `COUP_SERVER_URL` is not set.
const DEFAULT_URL: &str = "ws://localhost:8000";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // ── Logging ─────────────────────────────────────────────────────
    // Set `RUST_LOG=coup_client=debug` for verbose output.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // ── Configuration ───────────────────────────────────────────────
    let url = std::env::var("COUP_SERVER_URL").unwrap_or_else(|_| DEFAULT_URL.to_string());
    let name = std::env::args().nth(1).unwrap_or_else(|| "RustPlayer".to_string());

    let connector = WebSocketConnector::new(&url).with_connect_timeout(Duration::from_secs(5));
    let config = CoupClientConfig::new().with_reconnect(ReconnectPolicy::default());
    let (client, mut events) = CoupClient::new(connector, config);

    tracing::info!("Connecting to {} as {name}", url);
    client.connect(&name)?;
    let mut snapshots = client.subscribe();

    // ── Event loop ──────────────────────────────────────────────────
    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                match event {
                    ClientEvent::Connected { player_name } => {
                        tracing::info!("Connected as {player_name}, waiting for state…");
                    }
                    ClientEvent::ServerError { message } => {
                        tracing::error!("Server rejected intent: {message}");
                    }
                    ClientEvent::Reconnecting { attempt, delay } => {
                        tracing::warn!("Connection lost, retry #{attempt} in {delay:?}");
                    }
                    ClientEvent::Disconnected { reason } => {
                        tracing::warn!("Disconnected: {}", reason.as_deref().unwrap_or("unknown"));
                        break;
                    }
                }
            }

            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = snapshots.borrow_and_update().clone();
                let Some(snapshot) = snapshot else {
                    tracing::info!("Snapshot cleared");
                    continue;
                };

                let view = client.view();
                tracing::info!(
                    "{} | turn: {} | {} player(s) | screen: {:?}",
                    snapshot.phase,
                    snapshot.current_player,
                    snapshot.players.len(),
                    view.screen
                );

                if snapshot.phase == Phase::GameOver {
                    match snapshot.winner() {
                        Some(winner) => tracing::info!("Game over, {} wins", winner.name),
                        None => tracing::info!("Game over"),
                    }
                    break;
                }
                if view.is_enabled(Control::StartGame) {
                    tracing::info!("Starting the game");
                    client.start_game();
                } else if view.is_enabled(Control::Action(ActionKind::Income))
                    && snapshot.phase == Phase::WaitingForAction
                {
                    tracing::info!("Taking income");
                    client.send_action(ActionKind::Income, None);
                }
            }

            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Ctrl+C received, shutting down…");
                break;
            }
        }
    }

    // ── Cleanup ─────────────────────────────────────────────────────
    client.disconnect().await;
    tracing::info!("Client shut down. Goodbye!");
    Ok(())
}
