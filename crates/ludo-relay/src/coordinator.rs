//! Session coordinator: the relay's event protocol.
//!
//! Turns each inbound [`ClientEvent`] into registry mutations plus zero or
//! more outbound [`ServerEvent`]s. Every connection registers an outbound
//! channel on connect; a room's multicast group is simply the channels of
//! the connections seated in it, so the registry's roster and the fan-out
//! targets can never drift apart.
//!
//! All methods are synchronous and never await. The server keeps the
//! coordinator behind one mutex and handles each event to completion while
//! holding it, so no two events interleave.

use std::collections::HashMap;

use ludo_relay_protocol::{ClientEvent, Color, Player, ServerEvent};
use ludo_relay_room::{Departure, GameStatePatch, RoomRegistry};
use ludo_relay_transport::ConnectionId;
use tokio::sync::mpsc;

/// Channel sender for delivering outbound events to one connection.
pub type PeerSender = mpsc::UnboundedSender<ServerEvent>;

/// Owns the room registry and the outbound channel of every connection.
#[derive(Debug, Default)]
pub struct SessionCoordinator {
    registry: RoomRegistry,
    peers: HashMap<ConnectionId, PeerSender>,
}

impl SessionCoordinator {
    /// Creates a coordinator with an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read access to the registry, for diagnostics and tests.
    pub fn registry(&self) -> &RoomRegistry {
        &self.registry
    }

    /// Returns the number of live connections.
    pub fn connection_count(&self) -> usize {
        self.peers.len()
    }

    /// Registers a connection's outbound channel.
    pub fn connect(&mut self, conn: ConnectionId, sender: PeerSender) {
        self.peers.insert(conn, sender);
        tracing::debug!(%conn, "connection registered");
    }

    /// Dispatches one client event from `conn`.
    pub fn handle(&mut self, conn: ConnectionId, event: ClientEvent) {
        match event {
            ClientEvent::CreateRoom {
                room_code,
                player_name,
            } => self.create_room(conn, room_code, player_name),
            ClientEvent::JoinRoom {
                room_code,
                player_name,
                color,
            } => self.join_room(conn, room_code, player_name, color),
            ClientEvent::RollDice {
                room_code,
                value,
                turn,
            } => {
                // Relay only: the stored dice value is left alone.
                self.multicast(&room_code, ServerEvent::DiceRolled { value, turn });
            }
            ClientEvent::UpdateGameState {
                room_code,
                players,
                turn,
                winners,
            } => self.update_game_state(room_code, players, turn, winners),
        }
    }

    /// Runs the disconnect protocol for `conn`.
    ///
    /// Drops the connection's channel, removes its player from whichever
    /// room seats it, and tells the players left behind. A room emptied by
    /// the departure is removed silently.
    pub fn disconnect(&mut self, conn: ConnectionId) -> Option<Departure> {
        self.peers.remove(&conn);
        tracing::debug!(%conn, "connection unregistered");

        let departure = self.registry.remove_player_by_connection(conn)?;
        if !departure.room_closed() {
            self.multicast(
                &departure.code,
                ServerEvent::PlayerLeft {
                    removed_player: departure.removed.clone(),
                    players: departure.remaining.clone(),
                },
            );
        }
        Some(departure)
    }

    fn create_room(
        &mut self,
        conn: ConnectionId,
        room_code: String,
        player_name: String,
    ) {
        let creator = Player::new(conn, player_name, Color::red());
        let reply = match self.registry.create(room_code, creator) {
            Ok(room) => ServerEvent::RoomCreated {
                room_code: room.code().to_string(),
                color: Color::red(),
                players: room.players().to_vec(),
            },
            Err(e) => {
                tracing::debug!(%conn, error = %e, "create rejected");
                ServerEvent::RoomError(e.client_message().to_string())
            }
        };
        self.unicast(conn, reply);
    }

    fn join_room(
        &mut self,
        conn: ConnectionId,
        room_code: String,
        player_name: String,
        color: Color,
    ) {
        let new_player = Player::new(conn, player_name, color.clone());
        let seated = self
            .registry
            .append_player(&room_code, new_player.clone())
            .map(|_| ());
        match seated {
            Ok(()) => {
                self.unicast(
                    conn,
                    ServerEvent::RoomJoined {
                        room_code: room_code.clone(),
                        color,
                    },
                );
                self.multicast(&room_code, ServerEvent::PlayerJoined { new_player });
            }
            Err(e) => {
                tracing::debug!(%conn, error = %e, "join rejected");
                self.unicast(
                    conn,
                    ServerEvent::RoomError(e.client_message().to_string()),
                );
            }
        }
    }

    fn update_game_state(
        &mut self,
        room_code: String,
        players: serde_json::Value,
        turn: Color,
        winners: Vec<Color>,
    ) {
        let patch = GameStatePatch {
            current_turn: Some(turn.clone()),
            winners: Some(winners.clone()),
            ..GameStatePatch::default()
        };
        if !self.registry.set_game_state(&room_code, patch) {
            tracing::debug!(%room_code, "state update for unknown room ignored");
            return;
        }
        self.multicast(
            &room_code,
            ServerEvent::GameStateUpdated {
                players,
                turn,
                winners,
            },
        );
    }

    /// Sends an event to a single connection. Silently drops it if the
    /// connection is gone.
    fn unicast(&self, conn: ConnectionId, event: ServerEvent) {
        if let Some(sender) = self.peers.get(&conn) {
            let _ = sender.send(event);
        }
    }

    /// Sends an event to every connection seated in `room_code`.
    fn multicast(&self, room_code: &str, event: ServerEvent) {
        let Some(room) = self.registry.get(room_code) else {
            tracing::debug!(
                room_code,
                event = event.name(),
                "no such room, event dropped"
            );
            return;
        };
        for conn in room.connections() {
            self.unicast(conn, event.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use ludo_relay_protocol::PlayerId;
    use serde_json::json;
    use tokio::sync::mpsc::UnboundedReceiver;

    use super::*;

    struct Peer {
        id: ConnectionId,
        rx: UnboundedReceiver<ServerEvent>,
    }

    impl Peer {
        fn drain(&mut self) -> Vec<ServerEvent> {
            let mut events = Vec::new();
            while let Ok(event) = self.rx.try_recv() {
                events.push(event);
            }
            events
        }
    }

    fn peer(coordinator: &mut SessionCoordinator, id: u64) -> Peer {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = ConnectionId::new(id);
        coordinator.connect(id, tx);
        Peer { id, rx }
    }

    fn create(code: &str, name: &str) -> ClientEvent {
        ClientEvent::CreateRoom {
            room_code: code.into(),
            player_name: name.into(),
        }
    }

    fn join(code: &str, name: &str, color: &str) -> ClientEvent {
        ClientEvent::JoinRoom {
            room_code: code.into(),
            player_name: name.into(),
            color: Color::from(color),
        }
    }

    fn roll(code: &str, value: u32, turn: &str) -> ClientEvent {
        ClientEvent::RollDice {
            room_code: code.into(),
            value,
            turn: Color::from(turn),
        }
    }

    // =====================================================================
    // createRoom
    // =====================================================================

    #[test]
    fn test_create_room_replies_with_red_seat() {
        let mut coordinator = SessionCoordinator::new();
        let mut alice = peer(&mut coordinator, 1);

        coordinator.handle(alice.id, create("ABCD", "Alice"));

        assert_eq!(
            alice.drain(),
            vec![ServerEvent::RoomCreated {
                room_code: "ABCD".into(),
                color: Color::red(),
                players: vec![Player::new(PlayerId(1), "Alice", Color::red())],
            }]
        );
        assert_eq!(coordinator.registry().len(), 1);
    }

    #[test]
    fn test_create_existing_room_sends_room_error_to_sender_only() {
        let mut coordinator = SessionCoordinator::new();
        let mut alice = peer(&mut coordinator, 1);
        let mut mallory = peer(&mut coordinator, 2);
        coordinator.handle(alice.id, create("ABCD", "Alice"));
        alice.drain();

        coordinator.handle(mallory.id, create("ABCD", "Mallory"));

        assert_eq!(
            mallory.drain(),
            vec![ServerEvent::RoomError("Room already exists".into())]
        );
        assert!(alice.drain().is_empty());
        let room = coordinator.registry().get("ABCD").unwrap();
        assert_eq!(room.player_count(), 1);
        assert_eq!(room.players()[0].name, "Alice");
    }

    // =====================================================================
    // joinRoom
    // =====================================================================

    #[test]
    fn test_join_room_confirms_and_announces_to_everyone() {
        let mut coordinator = SessionCoordinator::new();
        let mut alice = peer(&mut coordinator, 1);
        let mut bob = peer(&mut coordinator, 2);
        coordinator.handle(alice.id, create("ABCD", "Alice"));
        alice.drain();

        coordinator.handle(bob.id, join("ABCD", "Bob", "blue"));

        let bob_seat = Player::new(PlayerId(2), "Bob", Color::from("blue"));
        assert_eq!(
            bob.drain(),
            vec![
                ServerEvent::RoomJoined {
                    room_code: "ABCD".into(),
                    color: Color::from("blue"),
                },
                ServerEvent::PlayerJoined {
                    new_player: bob_seat.clone(),
                },
            ]
        );
        assert_eq!(
            alice.drain(),
            vec![ServerEvent::PlayerJoined {
                new_player: bob_seat
            }]
        );
    }

    #[test]
    fn test_join_missing_room_is_reported() {
        let mut coordinator = SessionCoordinator::new();
        let mut bob = peer(&mut coordinator, 2);

        coordinator.handle(bob.id, join("NOPE", "Bob", "blue"));

        assert_eq!(
            bob.drain(),
            vec![ServerEvent::RoomError("Room not found".into())]
        );
        assert!(coordinator.registry().is_empty());
    }

    #[test]
    fn test_seated_connection_cannot_join_second_room() {
        let mut coordinator = SessionCoordinator::new();
        let mut alice = peer(&mut coordinator, 1);
        let mut bob = peer(&mut coordinator, 2);
        coordinator.handle(alice.id, create("ABCD", "Alice"));
        coordinator.handle(bob.id, create("WXYZ", "Bob"));
        alice.drain();
        bob.drain();

        coordinator.handle(alice.id, join("WXYZ", "Alice", "blue"));

        assert_eq!(
            alice.drain(),
            vec![ServerEvent::RoomError("Already in a room".into())]
        );
        assert!(bob.drain().is_empty());
        assert_eq!(coordinator.registry().get("WXYZ").unwrap().player_count(), 1);
    }

    // =====================================================================
    // rollDice / updateGameState
    // =====================================================================

    #[test]
    fn test_roll_dice_reaches_room_members_only() {
        let mut coordinator = SessionCoordinator::new();
        let mut alice = peer(&mut coordinator, 1);
        let mut bob = peer(&mut coordinator, 2);
        let mut outsider = peer(&mut coordinator, 3);
        coordinator.handle(alice.id, create("ABCD", "Alice"));
        coordinator.handle(bob.id, join("ABCD", "Bob", "blue"));
        coordinator.handle(outsider.id, create("WXYZ", "Olga"));
        alice.drain();
        bob.drain();
        outsider.drain();

        coordinator.handle(bob.id, roll("ABCD", 5, "blue"));

        let expected = vec![ServerEvent::DiceRolled {
            value: 5,
            turn: Color::from("blue"),
        }];
        assert_eq!(alice.drain(), expected);
        assert_eq!(bob.drain(), expected);
        assert!(outsider.drain().is_empty());
        let state = coordinator.registry().get("ABCD").unwrap().game_state();
        assert_eq!(state.dice_value, 0, "dice rolls are relay-only");
    }

    #[test]
    fn test_roll_dice_for_unknown_room_is_silent() {
        let mut coordinator = SessionCoordinator::new();
        let mut alice = peer(&mut coordinator, 1);

        coordinator.handle(alice.id, roll("NOPE", 3, "red"));

        assert!(alice.drain().is_empty());
    }

    #[test]
    fn test_update_game_state_is_stored_and_relayed() {
        let mut coordinator = SessionCoordinator::new();
        let mut alice = peer(&mut coordinator, 1);
        let mut bob = peer(&mut coordinator, 2);
        coordinator.handle(alice.id, create("ABCD", "Alice"));
        coordinator.handle(bob.id, join("ABCD", "Bob", "blue"));
        alice.drain();
        bob.drain();

        let board = json!([{"color": "red", "tokens": [0, 0, 3, 9]}]);
        coordinator.handle(
            alice.id,
            ClientEvent::UpdateGameState {
                room_code: "ABCD".into(),
                players: board.clone(),
                turn: Color::from("blue"),
                winners: vec![Color::red()],
            },
        );

        let expected = vec![ServerEvent::GameStateUpdated {
            players: board,
            turn: Color::from("blue"),
            winners: vec![Color::red()],
        }];
        assert_eq!(alice.drain(), expected);
        assert_eq!(bob.drain(), expected);

        let state = coordinator.registry().get("ABCD").unwrap().game_state();
        assert_eq!(state.current_turn, Color::from("blue"));
        assert_eq!(state.winners, vec![Color::red()]);
    }

    // =====================================================================
    // disconnect
    // =====================================================================

    #[test]
    fn test_disconnect_of_last_player_removes_room_silently() {
        let mut coordinator = SessionCoordinator::new();
        let mut alice = peer(&mut coordinator, 1);
        coordinator.handle(alice.id, create("ABCD", "Alice"));
        alice.drain();

        let departure = coordinator.disconnect(alice.id).unwrap();

        assert!(departure.room_closed());
        assert!(coordinator.registry().get("ABCD").is_none());
        assert_eq!(coordinator.connection_count(), 0);
    }

    #[test]
    fn test_disconnect_notifies_remaining_players_once() {
        let mut coordinator = SessionCoordinator::new();
        let mut alice = peer(&mut coordinator, 1);
        let mut bob = peer(&mut coordinator, 2);
        let mut cleo = peer(&mut coordinator, 3);
        coordinator.handle(alice.id, create("ABCD", "Alice"));
        coordinator.handle(bob.id, join("ABCD", "Bob", "blue"));
        coordinator.handle(cleo.id, join("ABCD", "Cleo", "green"));
        alice.drain();
        bob.drain();
        cleo.drain();

        coordinator.disconnect(bob.id);

        let expected = vec![ServerEvent::PlayerLeft {
            removed_player: Player::new(PlayerId(2), "Bob", Color::from("blue")),
            players: vec![
                Player::new(PlayerId(1), "Alice", Color::red()),
                Player::new(PlayerId(3), "Cleo", Color::from("green")),
            ],
        }];
        assert_eq!(alice.drain(), expected);
        assert_eq!(cleo.drain(), expected);
        assert!(bob.drain().is_empty());
        assert_eq!(coordinator.registry().get("ABCD").unwrap().player_count(), 2);
    }

    #[test]
    fn test_disconnect_of_unseated_connection_is_noop() {
        let mut coordinator = SessionCoordinator::new();
        let lurker = peer(&mut coordinator, 9);

        assert!(coordinator.disconnect(lurker.id).is_none());
        assert_eq!(coordinator.connection_count(), 0);
    }

    #[test]
    fn test_full_session_scenario() {
        let mut coordinator = SessionCoordinator::new();
        let mut alice = peer(&mut coordinator, 1);
        let mut bob = peer(&mut coordinator, 2);
        let alice_seat = Player::new(PlayerId(1), "Alice", Color::red());
        let bob_seat = Player::new(PlayerId(2), "Bob", Color::from("blue"));

        coordinator.handle(alice.id, create("ABCD", "Alice"));
        assert_eq!(
            alice.drain(),
            vec![ServerEvent::RoomCreated {
                room_code: "ABCD".into(),
                color: Color::red(),
                players: vec![alice_seat.clone()],
            }]
        );

        coordinator.handle(bob.id, join("ABCD", "Bob", "blue"));
        assert_eq!(
            bob.drain(),
            vec![
                ServerEvent::RoomJoined {
                    room_code: "ABCD".into(),
                    color: Color::from("blue"),
                },
                ServerEvent::PlayerJoined {
                    new_player: bob_seat.clone(),
                },
            ]
        );
        assert_eq!(
            alice.drain(),
            vec![ServerEvent::PlayerJoined {
                new_player: bob_seat.clone(),
            }]
        );

        coordinator.disconnect(bob.id);
        assert_eq!(
            alice.drain(),
            vec![ServerEvent::PlayerLeft {
                removed_player: bob_seat,
                players: vec![alice_seat],
            }]
        );
    }
}
