//! Transport layer for the wrong-answer server.
//!
//! The game core never touches sockets. It only needs to send a frame to
//! a connection, receive the next frame from it, and learn when it has
//! closed. [`Transport`] and [`Connection`] capture exactly that.
//!
//! # Feature Flags
//!
//! - `websocket` (default): WebSocket transport via `tokio-tungstenite`

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{WebSocketConnection, WebSocketTransport};

use std::fmt;

/// Opaque handle identifying one open connection.
///
/// Handles are allocated in increasing order, so sorting by
/// `ConnectionId` gives connection (and therefore join) order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Wraps a raw handle number.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// The raw handle number.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// A listener handing out player connections.
pub trait Transport: Send + Sync + 'static {
    type Connection: Connection;
    type Error: std::error::Error + Send + Sync;

    /// Waits for the next client to finish its handshake.
    async fn accept(&mut self) -> Result<Self::Connection, Self::Error>;
}

/// One player's socket, carrying whole text frames.
///
/// `send` and `recv` may be called concurrently from different tasks:
/// a reader loop waiting in `recv` must never hold up an outbound `send`.
pub trait Connection: Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync;

    /// Writes one frame.
    async fn send(&self, data: &[u8]) -> Result<(), Self::Error>;

    /// Reads the next data frame, skipping control frames.
    ///
    /// Returns `Ok(None)` when the connection is cleanly closed. This is
    /// the close notification the lobby layer relies on.
    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error>;

    /// Sends a close frame.
    async fn close(&self) -> Result<(), Self::Error>;

    /// This connection's handle.
    fn id(&self) -> ConnectionId;
}
