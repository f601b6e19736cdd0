//! Network edge of the Ludo relay.
//!
//! The relay needs exactly one thing from the network: a message pipe per
//! client that it can write events into, read events from, and check for
//! liveness. [`Transport`] hands out those pipes as [`Connection`]s; room
//! fan-out lives a layer up, in the session coordinator.
//!
//! # Feature Flags
//!
//! - `websocket` (default): [`WebSocketTransport`], an `axum` server that
//!   upgrades `GET /` to a WebSocket and answers plain requests with a
//!   liveness page

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{
    WebSocketConnection, WebSocketTransport, DEFAULT_HEALTH_BODY,
};

use std::fmt;

/// Identity of one client connection.
///
/// Allocated by the transport on accept and never reused within a process.
/// The relay has no accounts, so this doubles as the player's id in room
/// rosters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// The raw number, as it appears in a player's `id` on the wire.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Source of client connections.
pub trait Transport: Send + Sync + 'static {
    type Connection: Connection;
    type Error: std::error::Error + Send + Sync;

    /// Resolves with the next client that finished its handshake.
    ///
    /// Fails once the transport has been shut down.
    async fn accept(&mut self) -> Result<Self::Connection, Self::Error>;

    /// Stops taking new clients. Connections already handed out stay open.
    async fn shutdown(&self) -> Result<(), Self::Error>;
}

/// One client's message pipe.
///
/// Methods take `&self` so a reader task and a writer task can share the
/// connection through an `Arc`.
pub trait Connection: Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync;

    /// Writes one encoded event.
    async fn send(&self, data: &[u8]) -> Result<(), Self::Error>;

    /// Reads the next encoded event. `Ok(None)` means the client went away
    /// cleanly.
    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error>;

    /// Pings the peer. An error here means the peer is gone.
    async fn ping(&self) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Tells the peer we are done with it.
    async fn close(&self) -> Result<(), Self::Error>;

    fn id(&self) -> ConnectionId;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_renders_for_logs() {
        let id = ConnectionId::new(7);
        assert_eq!(id.to_string(), "conn-7");
        assert_eq!(id.into_inner(), 7);
    }
}
