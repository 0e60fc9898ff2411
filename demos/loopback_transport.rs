//! # Loopback Transport Example
//!
//! Shows how to implement [`Connector`] and [`Transport`] with in-process
//! channels and drive a [`CoupClient`] from a scripted fake server. Useful for
//! exercising UI code without a real server, or as a template for other I/O
//! layers (TCP, QUIC, WebRTC data channels).
//!
//! ## Running
//!
//! ```sh
//! cargo run --example loopback_transport
//! ```

use async_trait::async_trait;
use coup_client::protocol::{
    ActionKind, GameSnapshot, InboundMessage, Influences, OutboundMessage, Phase, PlayerView, Role,
};
use coup_client::{
    ClientEvent, Connector, Control, CoupClient, CoupClientConfig, CoupClientError, Transport,
};
use tokio::sync::{mpsc, Mutex};

// ─────────────────────────────────────────────────────────────────────
// Step 1: Define a channel-based "loopback" transport
// ─────────────────────────────────────────────────────────────────────

/// Client half: implements [`Transport`].
pub struct LoopbackTransport {
    /// Frames the client sends go here.
    tx: mpsc::UnboundedSender<String>,
    /// Frames the server sends arrive here.
    rx: mpsc::UnboundedReceiver<String>,
}

/// Server half: read intents, push snapshots.
pub struct LoopbackServer {
    pub rx: mpsc::UnboundedReceiver<String>,
    pub tx: mpsc::UnboundedSender<String>,
}

fn loopback_pair() -> (LoopbackTransport, LoopbackServer) {
    let (client_tx, server_rx) = mpsc::unbounded_channel();
    let (server_tx, client_rx) = mpsc::unbounded_channel();
    (
        LoopbackTransport {
            tx: client_tx,
            rx: client_rx,
        },
        LoopbackServer {
            rx: server_rx,
            tx: server_tx,
        },
    )
}

// ─────────────────────────────────────────────────────────────────────
// Step 2: Implement the Transport and Connector traits
// ─────────────────────────────────────────────────────────────────────

#[async_trait]
impl Transport for LoopbackTransport {
    async fn send(&mut self, message: String) -> Result<(), CoupClientError> {
        self.tx
            .send(message)
            .map_err(|e| CoupClientError::TransportSend(e.to_string()))
    }

    /// `None` once the server half is dropped. Cancel-safe because
    /// `mpsc::UnboundedReceiver::recv` is.
    async fn recv(&mut self) -> Option<Result<String, CoupClientError>> {
        self.rx.recv().await.map(Ok)
    }

    async fn close(&mut self) -> Result<(), CoupClientError> {
        Ok(())
    }
}

/// Hands out one prepared transport; later dials are refused.
struct LoopbackConnector {
    transport: Mutex<Option<LoopbackTransport>>,
}

#[async_trait]
impl Connector for LoopbackConnector {
    type Transport = LoopbackTransport;

    async fn connect(&self, player_name: &str) -> Result<LoopbackTransport, CoupClientError> {
        tracing::info!("Dialing loopback as {player_name}");
        self.transport
            .lock()
            .await
            .take()
            .ok_or(CoupClientError::TransportClosed)
    }
}

// ─────────────────────────────────────────────────────────────────────
// Step 3: A scripted server
// ─────────────────────────────────────────────────────────────────────

fn seat(name: &str, influences: Influences) -> PlayerView {
    PlayerView {
        name: name.into(),
        coins: 2,
        influences,
        revealed: vec![],
        alive: None,
    }
}

fn frame(state: GameSnapshot) -> String {
    serde_json::to_string(&InboundMessage::State { state }).unwrap_or_default()
}

/// Answers each intent with the snapshot a real server would push.
async fn run_server(mut server: LoopbackServer) {
    let mut table = GameSnapshot {
        phase: Phase::Lobby,
        current_player: String::new(),
        players: vec![
            seat("Alice", Influences::Known(vec![Role::Duke, Role::Contessa])),
            seat("Bob", Influences::Hidden(2)),
        ],
        pending_action: None,
        pending_actor: None,
        pending_target: None,
    };
    let _ = server.tx.send(frame(table.clone()));

    while let Some(raw) = server.rx.recv().await {
        tracing::info!("Server received: {raw}");
        let Ok(intent) = serde_json::from_str::<OutboundMessage>(&raw) else {
            continue;
        };
        let reply = match intent {
            OutboundMessage::StartGame => {
                table.phase = Phase::WaitingForAction;
                table.current_player = "Alice".into();
                frame(table.clone())
            }
            OutboundMessage::Action {
                action: ActionKind::Income,
                ..
            } => {
                if let Some(alice) = table.players.first_mut() {
                    alice.coins += 1;
                }
                table.current_player = "Bob".into();
                frame(table.clone())
            }
            other => serde_json::json!({
                "type": "error",
                "message": format!("{} is not scripted", other.kind()),
            })
            .to_string(),
        };
        if server.tx.send(reply).is_err() {
            break;
        }
        if table.current_player == "Bob" {
            // End of the script: hang up.
            break;
        }
    }
}

// ─────────────────────────────────────────────────────────────────────
// Step 4: Wire together the client and the fake server
// ─────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let (transport, server) = loopback_pair();
    let connector = LoopbackConnector {
        transport: Mutex::new(Some(transport)),
    };
    let (client, mut events) = CoupClient::new(connector, CoupClientConfig::new());
    let server_task = tokio::spawn(run_server(server));

    client.connect("Alice")?;
    let mut snapshots = client.subscribe();

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(ClientEvent::Disconnected { reason }) => {
                    tracing::info!("Disconnected: {}", reason.as_deref().unwrap_or("clean"));
                    break;
                }
                Some(other) => tracing::info!("Event: {other:?}"),
                None => break,
            },

            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let Some(snapshot) = snapshots.borrow_and_update().clone() else {
                    continue;
                };
                let view = client.view();
                tracing::info!(
                    "Snapshot: {} (turn: {:?}) -> {:?}",
                    snapshot.phase,
                    snapshot.current_player,
                    view.screen
                );

                if view.is_enabled(Control::StartGame) {
                    client.start_game();
                } else if view.is_enabled(Control::Action(ActionKind::Income)) {
                    client.send_action(ActionKind::Income, None);
                }
            }
        }
    }

    client.disconnect().await;
    server_task.await?;
    tracing::info!("Done. Loopback transport works!");
    Ok(())
}
