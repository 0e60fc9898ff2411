//! WebSocket transport and connector using `tokio-tungstenite`.
//!
//! The game server exposes one endpoint per player at
//! `{base_url}/ws/{player_name}`. [`WebSocketConnector`] builds that address
//! and dials it; [`WebSocketTransport`] moves text frames over the resulting
//! stream. Both `ws://` and `wss://` URLs are supported.
//!
//! # Example
//!
//! ```rust,no_run
//! # async fn example() -> Result<(), coup_client::CoupClientError> {
//! use coup_client::{Connector, Transport, WebSocketConnector};
//!
//! let connector = WebSocketConnector::new("ws://localhost:8000");
//! let mut transport = connector.connect("Alice").await?;
//! transport.send(r#"{"type":"start_game"}"#.to_string()).await?;
//!
//! if let Some(Ok(frame)) = transport.recv().await {
//!     println!("server said: {frame}");
//! }
//!
//! transport.close().await?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::protocol::Message;

use crate::error::CoupClientError;
use crate::transport::{Connector, Transport};

/// Type alias for the underlying WebSocket stream.
pub type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// A [`Transport`] backed by a WebSocket connection.
///
/// Only text frames carry protocol messages. Binary frames are skipped, and
/// ping/pong is answered by `tungstenite` itself.
///
/// # Cancel Safety
///
/// [`recv`](Transport::recv) is cancel-safe: dropping its future before it
/// completes does not consume a frame.
#[derive(Debug)]
pub struct WebSocketTransport {
    stream: WsStream,
    closed: bool,
}

impl WebSocketTransport {
    /// Open a WebSocket connection to a fully-formed URL.
    ///
    /// # Errors
    ///
    /// Returns [`CoupClientError::Io`] if the URL is invalid or the connection
    /// cannot be established. When the underlying error is an I/O error its
    /// [`ErrorKind`](std::io::ErrorKind) is preserved.
    pub async fn connect(url: &str) -> Result<Self, CoupClientError> {
        tracing::debug!(url = %url, "connecting to game server");

        let (stream, _response) = tokio_tungstenite::connect_async(url).await.map_err(|e| {
            let kind = match &e {
                tokio_tungstenite::tungstenite::Error::Io(io) => io.kind(),
                _ => std::io::ErrorKind::Other,
            };
            CoupClientError::Io(std::io::Error::new(kind, e))
        })?;

        tracing::info!(url = %url, "game server connection established");

        Ok(Self::from_stream(stream))
    }

    /// Wrap an already-established WebSocket stream (custom TLS, proxies, ...).
    pub fn from_stream(stream: WsStream) -> Self {
        Self {
            stream,
            closed: false,
        }
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn send(&mut self, message: String) -> Result<(), CoupClientError> {
        if self.closed {
            return Err(CoupClientError::TransportClosed);
        }
        self.stream
            .send(Message::Text(message.into()))
            .await
            .map_err(|e| CoupClientError::TransportSend(e.to_string()))
    }

    async fn recv(&mut self) -> Option<Result<String, CoupClientError>> {
        loop {
            let msg = match self.stream.next().await {
                Some(Ok(msg)) => msg,
                Some(Err(e)) => {
                    return Some(Err(CoupClientError::TransportReceive(e.to_string())));
                }
                None => return None,
            };

            match msg {
                Message::Text(text) => return Some(Ok(text.to_string())),
                Message::Close(frame) => {
                    tracing::debug!(?frame, "received WebSocket close frame");
                    return None;
                }
                Message::Binary(_) => {
                    tracing::warn!("received unexpected binary WebSocket frame, skipping");
                }
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {}
            }
        }
    }

    async fn close(&mut self) -> Result<(), CoupClientError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.stream
            .close(None)
            .await
            .map_err(|e| CoupClientError::TransportSend(e.to_string()))
    }
}

/// Dials `{base_url}/ws/{player_name}` for each connection.
///
/// ```
/// use coup_client::WebSocketConnector;
///
/// let connector = WebSocketConnector::new("ws://localhost:8000/");
/// assert_eq!(connector.endpoint("Alice"), "ws://localhost:8000/ws/Alice");
/// assert_eq!(connector.endpoint("Mary Ann"), "ws://localhost:8000/ws/Mary%20Ann");
/// ```
#[derive(Debug, Clone)]
pub struct WebSocketConnector {
    base_url: String,
    connect_timeout: Option<Duration>,
}

impl WebSocketConnector {
    /// Create a connector for the server at `base_url` (e.g. `ws://host:8000`).
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            connect_timeout: None,
        }
    }

    /// Fail a dial with [`CoupClientError::Timeout`] if it takes longer than `timeout`.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// The URL a player's connection is addressed to.
    pub fn endpoint(&self, player_name: &str) -> String {
        format!("{}/ws/{}", self.base_url, encode_path_segment(player_name))
    }
}

#[async_trait]
impl Connector for WebSocketConnector {
    type Transport = WebSocketTransport;

    async fn connect(&self, player_name: &str) -> Result<WebSocketTransport, CoupClientError> {
        let url = self.endpoint(player_name);
        match self.connect_timeout {
            Some(timeout) => tokio::time::timeout(timeout, WebSocketTransport::connect(&url))
                .await
                .map_err(|_| CoupClientError::Timeout)?,
            None => WebSocketTransport::connect(&url).await,
        }
    }
}

/// Percent-encode everything outside the RFC 3986 unreserved set.
fn encode_path_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for byte in segment.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'.' | b'_' | b'~') {
            out.push(char::from(byte));
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
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
    use tokio::net::TcpListener;
    use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};

    /// Start a local WebSocket server that runs `handler` on the accepted
    /// connection and returns its base URL.
    async fn start_mock_server<F, Fut>(handler: F) -> String
    where
        F: FnOnce(tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>) -> Fut
            + Send
            + 'static,
        Fut: std::future::Future<Output = ()> + Send,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
            handler(ws).await;
        });

        format!("ws://{addr}")
    }

    #[test]
    fn websocket_transport_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<WebSocketTransport>();
    }

    #[test]
    fn endpoint_appends_player_path() {
        let connector = WebSocketConnector::new("ws://example.test:8000");
        assert_eq!(connector.endpoint("Bob"), "ws://example.test:8000/ws/Bob");
    }

    #[test]
    fn endpoint_escapes_reserved_characters() {
        let connector = WebSocketConnector::new("ws://h");
        assert_eq!(connector.endpoint("a/b?c#d"), "ws://h/ws/a%2Fb%3Fc%23d");
        assert_eq!(connector.endpoint("Zoë"), "ws://h/ws/Zo%C3%AB");
    }

    #[tokio::test]
    async fn connect_fails_with_invalid_url() {
        let err = WebSocketTransport::connect("not-a-valid-url")
            .await
            .unwrap_err();
        assert!(matches!(err, CoupClientError::Io(_)));
    }

    #[tokio::test]
    async fn connector_times_out() {
        let connector = WebSocketConnector::new("ws://192.0.2.1:1")
            .with_connect_timeout(Duration::from_millis(50));
        let err = connector.connect("Alice").await.unwrap_err();
        assert!(matches!(err, CoupClientError::Timeout));
    }

    #[tokio::test]
    async fn connector_dials_player_path() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (path_tx, path_rx) = tokio::sync::oneshot::channel::<String>();

        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let callback = move |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
                let _ = path_tx.send(req.uri().path().to_owned());
                Ok(resp)
            };
            let mut ws = tokio_tungstenite::accept_hdr_async(tcp, callback)
                .await
                .unwrap();
            ws.close(None).await.unwrap();
        });

        let connector = WebSocketConnector::new(format!("ws://{addr}"));
        let _transport = connector.connect("Alice").await.unwrap();
        assert_eq!(path_rx.await.unwrap(), "/ws/Alice");
    }

    #[tokio::test]
    async fn recv_skips_binary_frames() {
        let url = start_mock_server(|mut ws| async move {
            ws.send(Message::Binary(vec![0xDE, 0xAD].into()))
                .await
                .unwrap();
            ws.send(Message::Text(r#"{"type":"error","message":"x"}"#.into()))
                .await
                .unwrap();
            ws.close(None).await.unwrap();
        })
        .await;

        let mut transport = WebSocketTransport::connect(&url).await.unwrap();
        let frame = transport.recv().await.unwrap().unwrap();
        assert_eq!(frame, r#"{"type":"error","message":"x"}"#);
        assert!(transport.recv().await.is_none());
    }

    #[tokio::test]
    async fn send_after_close_returns_transport_closed() {
        let url =
            start_mock_server(|mut ws| async move { while let Some(Ok(_)) = ws.next().await {} })
                .await;

        let mut transport = WebSocketTransport::connect(&url).await.unwrap();
        transport.close().await.unwrap();
        transport.close().await.unwrap();

        let err = transport
            .send(r#"{"type":"challenge"}"#.to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, CoupClientError::TransportClosed));
    }

    #[tokio::test]
    async fn sent_frames_reach_the_server() {
        let (seen_tx, seen_rx) = tokio::sync::oneshot::channel::<String>();
        let url = start_mock_server(|mut ws| async move {
            if let Some(Ok(Message::Text(text))) = ws.next().await {
                let _ = seen_tx.send(text.to_string());
            }
        })
        .await;

        let mut transport = WebSocketTransport::connect(&url).await.unwrap();
        transport
            .send(r#"{"type":"start_game"}"#.to_string())
            .await
            .unwrap();
        assert_eq!(seen_rx.await.unwrap(), r#"{"type":"start_game"}"#);
    }
}
