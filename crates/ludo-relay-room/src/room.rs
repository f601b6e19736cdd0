//! A single room: its roster and stored game state.

use ludo_relay_protocol::{Color, Player};
use ludo_relay_transport::ConnectionId;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// GameState
// ---------------------------------------------------------------------------

/// The turn-based state stored alongside a room's roster.
///
/// The relay never interprets these values; clients publish them through
/// `updateGameState` and the registry just keeps the latest copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    /// Whose turn it is.
    pub current_turn: Color,
    /// The last stored dice value. Dice rolls are relayed, not stored, so
    /// this only changes through an explicit patch.
    pub dice_value: u32,
    /// Colours that have finished, in finishing order.
    pub winners: Vec<Color>,
}

impl Default for GameState {
    fn default() -> Self {
        Self {
            current_turn: Color::red(),
            dice_value: 0,
            winners: Vec::new(),
        }
    }
}

/// A partial overwrite of [`GameState`]. `None` fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GameStatePatch {
    pub current_turn: Option<Color>,
    pub dice_value: Option<u32>,
    pub winners: Option<Vec<Color>>,
}

impl GameStatePatch {
    /// Overwrites the fields named by this patch.
    pub fn apply(self, state: &mut GameState) {
        if let Some(turn) = self.current_turn {
            state.current_turn = turn;
        }
        if let Some(value) = self.dice_value {
            state.dice_value = value;
        }
        if let Some(winners) = self.winners {
            state.winners = winners;
        }
    }
}

// ---------------------------------------------------------------------------
// Room
// ---------------------------------------------------------------------------

/// One room in the registry.
///
/// The roster is ordered by join time; clients render turn order from it.
/// A registered room is never empty: the registry drops it the moment its
/// last player leaves.
#[derive(Debug, Clone)]
pub struct Room {
    code: String,
    players: Vec<Player>,
    game_state: GameState,
}

impl Room {
    pub(crate) fn new(code: String, creator: Player) -> Self {
        Self {
            code,
            players: vec![creator],
            game_state: GameState::default(),
        }
    }

    /// Returns the room's code.
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Returns the roster in join order.
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn game_state(&self) -> &GameState {
        &self.game_state
    }

    /// Returns the connections seated here, in join order.
    pub fn connections(&self) -> impl Iterator<Item = ConnectionId> + '_ {
        self.players.iter().map(Player::connection_id)
    }

    pub(crate) fn push(&mut self, player: Player) {
        self.players.push(player);
    }

    /// Removes the player owned by `conn`, keeping the others in order.
    pub(crate) fn remove(&mut self, conn: ConnectionId) -> Option<Player> {
        let index = self
            .players
            .iter()
            .position(|p| p.connection_id() == conn)?;
        Some(self.players.remove(index))
    }

    pub(crate) fn patch(&mut self, patch: GameStatePatch) {
        patch.apply(&mut self.game_state);
    }
}

// ---------------------------------------------------------------------------
// Departure
// ---------------------------------------------------------------------------

/// The outcome of removing a disconnected player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Departure {
    /// The room the player was seated in.
    pub code: String,
    /// The player that was removed.
    pub removed: Player,
    /// The roster left behind, in join order. Empty when the room was
    /// dropped.
    pub remaining: Vec<Player>,
}

impl Departure {
    /// Returns `true` if the departure emptied and therefore removed the
    /// room.
    pub fn room_closed(&self) -> bool {
        self.remaining.is_empty()
    }
}
