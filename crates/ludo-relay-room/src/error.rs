//! Error types for the room layer.

use ludo_relay_transport::ConnectionId;

/// Errors that can occur during room operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RoomError {
    /// A room with this code is already registered.
    #[error("room {0} already exists")]
    AlreadyExists(String),

    /// No room is registered under this code.
    #[error("room {0} not found")]
    NotFound(String),

    /// The connection already holds a seat. A connection can sit in at
    /// most one room at a time.
    #[error("{0} is already in room {1}")]
    AlreadyInRoom(ConnectionId, String),
}

impl RoomError {
    /// Returns the text sent to the client in a `roomError` event.
    pub fn client_message(&self) -> &'static str {
        match self {
            Self::AlreadyExists(_) => "Room already exists",
            Self::NotFound(_) => "Room not found",
            Self::AlreadyInRoom(..) => "Already in a room",
        }
    }
}
