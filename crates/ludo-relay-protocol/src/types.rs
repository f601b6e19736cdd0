//! Core protocol types for the relay's wire format.
//!
//! Every frame is a JSON object carrying an event name and its payload:
//!
//! ```text
//! { "event": "rollDice", "data": { "roomCode": "ABCD", "value": 5, "turn": "red" } }
//! ```
//!
//! Field names are camelCase because the clients are written in
//! JavaScript.

use std::fmt;

use ludo_relay_transport::ConnectionId;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Identifies a player by the connection that owns it.
///
/// Serialized as a plain number, so `PlayerId(42)` becomes `42` in JSON.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl From<ConnectionId> for PlayerId {
    fn from(id: ConnectionId) -> Self {
        Self(id.into_inner())
    }
}

impl From<PlayerId> for ConnectionId {
    fn from(id: PlayerId) -> Self {
        ConnectionId::new(id.0)
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

/// A turn-token/team colour such as `"red"` or `"blue"`.
///
/// Kept as an open string: the relay never interprets colours beyond
/// seating the room creator as [`Color::RED`].
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize,
    Deserialize,
)]
#[serde(transparent)]
pub struct Color(String);

impl Color {
    /// The colour assigned to a room's creator and the first turn.
    pub const RED: &'static str = "red";

    /// Returns the creator's colour.
    pub fn red() -> Self {
        Self(Self::RED.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Color {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Color {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A seated player as it appears in rosters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    /// The owning connection.
    pub id: PlayerId,
    /// Display name, client-supplied and unvalidated.
    pub name: String,
    pub color: Color,
}

impl Player {
    pub fn new(
        id: impl Into<PlayerId>,
        name: impl Into<String>,
        color: Color,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            color,
        }
    }

    /// Returns the connection this player belongs to.
    pub fn connection_id(&self) -> ConnectionId {
        self.id.into()
    }
}

// ---------------------------------------------------------------------------
// ClientEvent — client → relay
// ---------------------------------------------------------------------------

/// Events a client sends to the relay.
///
/// Adjacently tagged: the variant name becomes `"event"` and the fields
/// become the `"data"` object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ClientEvent {
    /// Open a new room and take the first (red) seat.
    CreateRoom {
        room_code: String,
        player_name: String,
    },

    /// Take a seat in an existing room with a chosen colour.
    JoinRoom {
        room_code: String,
        player_name: String,
        color: Color,
    },

    /// Announce a dice roll to the room. Relayed, never stored.
    RollDice {
        room_code: String,
        value: u32,
        turn: Color,
    },

    /// Publish the full game state. `players` is client-owned board state
    /// and is relayed verbatim.
    UpdateGameState {
        room_code: String,
        players: serde_json::Value,
        turn: Color,
        winners: Vec<Color>,
    },
}

impl ClientEvent {
    /// Returns the room code every client event is addressed to.
    pub fn room_code(&self) -> &str {
        match self {
            Self::CreateRoom { room_code, .. }
            | Self::JoinRoom { room_code, .. }
            | Self::RollDice { room_code, .. }
            | Self::UpdateGameState { room_code, .. } => room_code,
        }
    }

    /// Returns the wire name of the event, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateRoom { .. } => "createRoom",
            Self::JoinRoom { .. } => "joinRoom",
            Self::RollDice { .. } => "rollDice",
            Self::UpdateGameState { .. } => "updateGameState",
        }
    }
}

// ---------------------------------------------------------------------------
// ServerEvent — relay → client
// ---------------------------------------------------------------------------

/// Events the relay sends to clients, either to one connection or to
/// every member of a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ServerEvent {
    /// A create or join was rejected. The payload is a bare message
    /// string, e.g. `"Room already exists"`.
    RoomError(String),

    /// Sent to the creator only.
    RoomCreated {
        room_code: String,
        color: Color,
        players: Vec<Player>,
    },

    /// Sent to the joining connection only.
    RoomJoined { room_code: String, color: Color },

    /// Sent to the whole room, the joiner included.
    PlayerJoined { new_player: Player },

    DiceRolled { value: u32, turn: Color },

    GameStateUpdated {
        players: serde_json::Value,
        turn: Color,
        winners: Vec<Color>,
    },

    /// Sent to the players left behind after a disconnect.
    PlayerLeft {
        removed_player: Player,
        players: Vec<Player>,
    },
}

impl ServerEvent {
    /// Returns the wire name of the event, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::RoomError(_) => "roomError",
            Self::RoomCreated { .. } => "roomCreated",
            Self::RoomJoined { .. } => "roomJoined",
            Self::PlayerJoined { .. } => "playerJoined",
            Self::DiceRolled { .. } => "diceRolled",
            Self::GameStateUpdated { .. } => "gameStateUpdated",
            Self::PlayerLeft { .. } => "playerLeft",
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
