//! Transport abstraction for the Coup game protocol.
//!
//! The [`Transport`] trait defines a bidirectional text message channel between
//! the client and server. Every frame is one JSON object, so each
//! implementation handles message framing internally (WebSocket frames,
//! length-prefixed TCP, in-process channels, ...).
//!
//! Dialing is split out into [`Connector`]: the game server addresses a
//! connection by player name, so the connection manager asks a connector for
//! a fresh transport each time the user connects (or the client redials).
//!
//! # Implementing a Custom Transport
//!
//! ```rust,no_run
//! use async_trait::async_trait;
//! use coup_client::error::CoupClientError;
//! use coup_client::transport::{Connector, Transport};
//!
//! struct MyTransport { /* ... */ }
//!
//! #[async_trait]
//! impl Transport for MyTransport {
//!     async fn send(&mut self, message: String) -> Result<(), CoupClientError> {
//!         // Send the JSON text message over your transport
//!         todo!()
//!     }
//!
//!     async fn recv(&mut self) -> Option<Result<String, CoupClientError>> {
//!         // Receive the next JSON text message
//!         // Return None when the connection is closed cleanly
//!         todo!()
//!     }
//!
//!     async fn close(&mut self) -> Result<(), CoupClientError> {
//!         todo!()
//!     }
//! }
//!
//! struct MyConnector;
//!
//! #[async_trait]
//! impl Connector for MyConnector {
//!     type Transport = MyTransport;
//!
//!     async fn connect(&self, player_name: &str) -> Result<MyTransport, CoupClientError> {
//!         todo!()
//!     }
//! }
//! ```

use async_trait::async_trait;

use crate::error::CoupClientError;

/// A bidirectional text message transport for the Coup game protocol.
///
/// Each call to [`send`](Transport::send) transmits one complete JSON frame.
/// Each call to [`recv`](Transport::recv) returns one complete JSON frame.
///
/// # Cancel Safety
///
/// The [`recv`](Transport::recv) method **MUST** be cancel-safe because it is used
/// inside `tokio::select!`. If `recv` is cancelled before completion, calling it
/// again must not lose data. Channel-based implementations (e.g., wrapping
/// `mpsc::Receiver`) are naturally cancel-safe.
#[async_trait]
pub trait Transport: Send + 'static {
    /// Send a JSON text message to the server.
    ///
    /// # Errors
    ///
    /// Returns [`CoupClientError::TransportSend`] if the message could not be sent.
    async fn send(&mut self, message: String) -> Result<(), CoupClientError>;

    /// Receive the next JSON text message from the server.
    ///
    /// Returns:
    /// - `Some(Ok(text))` — a complete message was received
    /// - `Some(Err(e))` — a transport error occurred
    /// - `None` — the connection was closed cleanly by the server
    async fn recv(&mut self) -> Option<Result<String, CoupClientError>>;

    /// Close the transport connection gracefully.
    ///
    /// # Errors
    ///
    /// Returns an error if the graceful shutdown fails. Implementations should
    /// still release resources even if the close handshake fails.
    async fn close(&mut self) -> Result<(), CoupClientError>;
}

/// Opens a [`Transport`] to the endpoint that serves `player_name`.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// The transport produced by a successful dial.
    type Transport: Transport;

    /// Dial the server as `player_name`.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint is unreachable or refuses the
    /// connection. The connection manager treats this like a close.
    async fn connect(&self, player_name: &str) -> Result<Self::Transport, CoupClientError>;
}
