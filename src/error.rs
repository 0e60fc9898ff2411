//! Error types for the Coup client.

use thiserror::Error;

/// Errors that can occur when using the Coup client.
#[derive(Debug, Error)]
pub enum CoupClientError {
    /// Failed to send a message through the transport.
    #[error("transport send error: {0}")]
    TransportSend(String),

    /// Failed to receive a message from the transport.
    #[error("transport receive error: {0}")]
    TransportReceive(String),

    /// The transport connection was closed unexpectedly.
    #[error("transport connection closed")]
    TransportClosed,

    /// Failed to serialize or deserialize a protocol message.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A `state` frame parsed but described an impossible snapshot.
    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),

    /// The player name cannot be used to address a connection.
    #[error("invalid player name: {0:?}")]
    InvalidPlayerName(String),

    /// `connect` was called while a connection was already open or opening.
    #[error("already connected as {player_name:?}")]
    AlreadyConnected {
        /// Name the live connection was opened with.
        player_name: String,
    },

    /// A connection was requested outside of a Tokio runtime.
    #[error("no Tokio runtime available to drive the connection")]
    NoRuntime,

    /// An operation timed out.
    #[error("operation timed out")]
    Timeout,

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized [`Result`] type for Coup client operations.
pub type Result<T> = std::result::Result<T, CoupClientError>;
