//! Room registry: creates rooms, seats players, and cleans up on disconnect.

use std::collections::HashMap;

use ludo_relay_protocol::Player;
use ludo_relay_transport::ConnectionId;

use crate::{Departure, GameStatePatch, Room, RoomError};

/// Tracks every live room and which connection sits where.
///
/// Not thread-safe by itself: it is owned by the session coordinator,
/// which the server guards with a single mutex.
#[derive(Debug, Default)]
pub struct RoomRegistry {
    /// Live rooms, keyed by their client-chosen code.
    rooms: HashMap<String, Room>,

    /// Maps each seated connection to the code of its room.
    /// A connection is in at most ONE room at a time (key invariant).
    seats: HashMap<ConnectionId, String>,
}

impl RoomRegistry {
    /// Creates a new, empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new room with `creator` as its only player and the
    /// default game state.
    ///
    /// # Errors
    /// - [`RoomError::AlreadyExists`] if the code is taken
    /// - [`RoomError::AlreadyInRoom`] if the creator's connection is
    ///   already seated
    ///
    /// The registry is unchanged on error.
    pub fn create(
        &mut self,
        code: impl Into<String>,
        creator: Player,
    ) -> Result<&Room, RoomError> {
        let code = code.into();
        if self.rooms.contains_key(&code) {
            return Err(RoomError::AlreadyExists(code));
        }
        let conn = creator.connection_id();
        self.ensure_unseated(conn)?;

        self.seats.insert(conn, code.clone());
        let room = self
            .rooms
            .entry(code.clone())
            .or_insert_with(|| Room::new(code, creator));

        tracing::info!(room_code = %room.code(), %conn, "room created");
        Ok(&*room)
    }

    /// Looks up a room by code.
    pub fn get(&self, code: &str) -> Option<&Room> {
        self.rooms.get(code)
    }

    /// Appends `player` to the end of the room's roster.
    ///
    /// # Errors
    /// - [`RoomError::NotFound`] if no room has this code
    /// - [`RoomError::AlreadyInRoom`] if the player's connection is
    ///   already seated (in this room or another)
    pub fn append_player(
        &mut self,
        code: &str,
        player: Player,
    ) -> Result<&Room, RoomError> {
        if !self.rooms.contains_key(code) {
            return Err(RoomError::NotFound(code.to_string()));
        }
        let conn = player.connection_id();
        self.ensure_unseated(conn)?;

        let room = self
            .rooms
            .get_mut(code)
            .ok_or_else(|| RoomError::NotFound(code.to_string()))?;
        room.push(player);
        self.seats.insert(conn, code.to_string());

        tracing::info!(
            room_code = code,
            %conn,
            players = room.player_count(),
            "player joined"
        );
        Ok(&*room)
    }

    /// Removes the player owned by `conn` from whichever room seats it.
    ///
    /// If that leaves the room empty, the room is dropped in the same call.
    /// Returns `None` if the connection holds no seat.
    pub fn remove_player_by_connection(
        &mut self,
        conn: ConnectionId,
    ) -> Option<Departure> {
        let code = self.seats.remove(&conn)?;
        let room = self.rooms.get_mut(&code)?;
        let removed = room.remove(conn)?;
        let remaining = room.players().to_vec();

        tracing::info!(
            room_code = %code,
            %conn,
            players = remaining.len(),
            "player left"
        );

        if remaining.is_empty() {
            self.rooms.remove(&code);
            tracing::info!(room_code = %code, "room removed");
        }

        Some(Departure {
            code,
            removed,
            remaining,
        })
    }

    /// Overwrites the fields named by `patch` in the room's game state.
    ///
    /// Returns `false` (and does nothing) if the room doesn't exist.
    pub fn set_game_state(&mut self, code: &str, patch: GameStatePatch) -> bool {
        match self.rooms.get_mut(code) {
            Some(room) => {
                room.patch(patch);
                true
            }
            None => false,
        }
    }

    /// Returns the code of the room `conn` is seated in, if any.
    pub fn room_of(&self, conn: ConnectionId) -> Option<&str> {
        self.seats.get(&conn).map(String::as_str)
    }

    /// Returns the number of live rooms.
    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    /// Returns `true` if no rooms are live.
    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    /// Lists the codes of all live rooms.
    pub fn codes(&self) -> Vec<&str> {
        self.rooms.keys().map(String::as_str).collect()
    }

    fn ensure_unseated(&self, conn: ConnectionId) -> Result<(), RoomError> {
        match self.seats.get(&conn) {
            Some(current) => Err(RoomError::AlreadyInRoom(conn, current.clone())),
            None => Ok(()),
        }
    }
}
