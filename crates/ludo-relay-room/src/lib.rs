//! Room registry for the Ludo relay.
//!
//! The registry is the single source of truth for which players sit in
//! which room. It is plain data with no locking and no I/O: the session
//! coordinator owns it and serializes access, which keeps every mutation
//! atomic with respect to other client events.
//!
//! # Key types
//!
//! - [`RoomRegistry`] — creates rooms, seats players, removes them on
//!   disconnect and drops rooms once empty
//! - [`Room`] — one room's code, ordered roster, and stored game state
//! - [`GameState`] / [`GameStatePatch`] — the turn/dice/winners snapshot
//! - [`Departure`] — what a disconnect removed and who is left

mod error;
mod registry;
mod room;

pub use error::RoomError;
pub use registry::RoomRegistry;
pub use room::{Departure, GameState, GameStatePatch, Room};
