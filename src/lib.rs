//! # Coup Client
//!
//! Transport-agnostic Rust client for a Coup-style bluffing card game server.
//!
//! The server is authoritative: it pushes the complete game state after every
//! change, and the client only renders that state and forwards player intents.
//!
//! ## Features
//!
//! - **Transport-agnostic**: implement [`Transport`] and [`Connector`] for any backend
//! - **Fail-closed decoding**: malformed or unknown frames never reach the store
//! - **Full-replace state**: each `state` frame replaces the snapshot wholesale
//! - **Pure UI gating**: [`ui::derive`] maps a snapshot to the legal controls
//! - **WebSocket built-in**: default `transport-websocket` feature provides
//!   `WebSocketConnector`
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! # #[cfg(feature = "transport-websocket")]
//! # async fn example() -> Result<(), coup_client::CoupClientError> {
//! use coup_client::{ClientEvent, CoupClient, CoupClientConfig, WebSocketConnector};
//!
//! let connector = WebSocketConnector::new("ws://localhost:8000");
//! let (client, mut events) = CoupClient::new(connector, CoupClientConfig::new());
//! client.connect("Alice")?;
//!
//! while let Some(event) = events.recv().await {
//!     match event {
//!         ClientEvent::ServerError { message } => eprintln!("server: {message}"),
//!         ClientEvent::Disconnected { .. } => break,
//!         _ => {}
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod codec;
pub mod connection;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod protocol;
pub mod reconnect;
pub mod store;
pub mod transport;
pub mod transports;
pub mod ui;

// Re-export primary types for ergonomic imports.
pub use client::{CoupClient, CoupClientConfig};
pub use connection::{ConnectionHandle, ConnectionManager};
pub use dispatcher::ActionDispatcher;
pub use error::CoupClientError;
pub use event::ClientEvent;
pub use protocol::{
    ActionKind, GameSnapshot, InboundMessage, Influences, OutboundMessage, Phase, PlayerView, Role,
};
pub use reconnect::ReconnectPolicy;
pub use store::StateStore;
pub use transport::{Connector, Transport};
pub use ui::{Control, Screen, UiView};

#[cfg(feature = "transport-websocket")]
pub use transports::{WebSocketConnector, WebSocketTransport};
