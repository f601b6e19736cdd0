//! # Ludo relay
//!
//! Real-time relay server for multiplayer Ludo.
//!
//! Clients connect over WebSocket, create or join rooms by a short code,
//! and exchange dice rolls and game-state snapshots. The relay keeps the
//! roster and last published state for each room and fans every event out
//! to the room's members. It never validates game rules.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ludo_relay::prelude::*;
//!
//! # async fn run() -> Result<(), RelayError> {
//! let config = RelayConfig::from_env()?;
//! let server = RelayServer::builder().config(&config).build().await?;
//! server.run().await
//! # }
//! ```

mod config;
mod coordinator;
mod error;
mod handler;
mod server;

pub use config::{ConfigError, RelayConfig};
pub use coordinator::{PeerSender, SessionCoordinator};
pub use error::RelayError;
pub use server::{RelayServer, RelayServerBuilder};

/// Commonly used types, re-exported from every layer.
pub mod prelude {
    pub use crate::{
        ConfigError, RelayConfig, RelayError, RelayServer, RelayServerBuilder,
        SessionCoordinator,
    };
    pub use ludo_relay_protocol::{
        ClientEvent, Codec, Color, JsonCodec, Player, PlayerId, ServerEvent,
    };
    pub use ludo_relay_room::{GameState, Room, RoomError, RoomRegistry};
    pub use ludo_relay_transport::ConnectionId;
}
