//! Live connections of one coordinator and best-effort fan-out.
//!
//! The registry is owned by the coordinator and only touched while the
//! coordinator's lock is held, so "state changed" and "who is notified"
//! cannot race.

use std::collections::{BTreeMap, VecDeque};

use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::events::SessionEvent;

/// Identifies one transport; a reconnecting player gets a new id.
pub type ConnectionId = Uuid;

/// Sending half of a connection's outbound queue.
pub type EventSender = mpsc::Sender<SessionEvent>;

#[derive(Debug)]
struct Connection {
    connection_id: ConnectionId,
    character_id: String,
    sender: EventSender,
}

/// Maps each connected player to their current transport.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: BTreeMap<String, Connection>,
}

impl ConnectionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a transport for a player, replacing any previous one.
    pub fn register(
        &mut self,
        player_id: &str,
        character_id: &str,
        sender: EventSender,
    ) -> ConnectionId {
        let connection_id = Uuid::new_v4();
        let previous = self.connections.insert(
            player_id.to_owned(),
            Connection {
                connection_id,
                character_id: character_id.to_owned(),
                sender,
            },
        );
        if let Some(previous) = previous {
            debug!(
                player_id,
                replaced = %previous.connection_id,
                previous_character = %previous.character_id,
                "player reconnected; previous transport replaced"
            );
        }
        connection_id
    }

    /// Removes a player's transport if it is still the given connection.
    ///
    /// Returns `false` when the player has since reconnected on a newer
    /// transport, or was already removed.
    pub fn unregister(&mut self, player_id: &str, connection_id: ConnectionId) -> bool {
        let current = self
            .connections
            .get(player_id)
            .is_some_and(|c| c.connection_id == connection_id);
        if current {
            self.connections.remove(player_id);
        }
        current
    }

    /// Sends one event to one player. A failed send evicts the player and
    /// tells everyone else.
    pub fn send_to(&mut self, player_id: &str, event: SessionEvent) -> bool {
        let Some(connection) = self.connections.get(player_id) else {
            return false;
        };
        match connection.sender.try_send(event) {
            Ok(()) => true,
            Err(err) => {
                warn!(
                    player_id,
                    character_id = %connection.character_id,
                    error = %err,
                    "dropping connection after failed send"
                );
                self.connections.remove(player_id);
                self.broadcast(SessionEvent::PlayerLeft {
                    player_id: player_id.to_owned(),
                });
                false
            }
        }
    }

    /// Delivers an event to every connection without waiting on any of them.
    ///
    /// A connection whose queue is full or closed is evicted; the delivery
    /// continues with the rest, and a `player_left` for each evicted player
    /// follows the original event.
    pub fn broadcast(&mut self, event: SessionEvent) {
        let mut pending = VecDeque::from([event]);
        while let Some(event) = pending.pop_front() {
            let mut failed = Vec::new();
            for (player_id, connection) in &self.connections {
                if let Err(err) = connection.sender.try_send(event.clone()) {
                    warn!(
                        player_id = %player_id,
                        connection_id = %connection.connection_id,
                        character_id = %connection.character_id,
                        event_type = event.event_type(),
                        error = %err,
                        "dropping connection after failed send"
                    );
                    failed.push(player_id.clone());
                }
            }
            for player_id in failed {
                self.connections.remove(&player_id);
                pending.push_back(SessionEvent::PlayerLeft { player_id });
            }
        }
    }

    /// Players with a live connection, sorted.
    #[must_use]
    pub fn player_ids(&self) -> Vec<String> {
        self.connections.keys().cloned().collect()
    }

    /// Number of live connections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Whether no connection is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
