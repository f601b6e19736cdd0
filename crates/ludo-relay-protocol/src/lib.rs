//! Wire protocol for the Ludo relay.
//!
//! This crate defines the "language" that browser clients and the relay
//! speak:
//!
//! - **Events** ([`ClientEvent`], [`ServerEvent`]) — the named events that
//!   travel on the wire, each a JSON object `{"event": ..., "data": ...}`.
//! - **Types** ([`Player`], [`PlayerId`], [`Color`]) — the roster data
//!   embedded in those events.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — how events are converted
//!   to/from bytes.
//!
//! ```text
//! Transport (bytes) → Protocol (events) → Coordinator (rooms)
//! ```

mod codec;
mod error;
mod types;

pub use codec::{Codec, JsonCodec};
pub use error::ProtocolError;
pub use types::{ClientEvent, Color, Player, PlayerId, ServerEvent};
