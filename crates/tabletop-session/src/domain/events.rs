//! Events fanned out to live connections.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::aggregates::{GameState, PlayerInfo, Session, SessionStatus};

/// Event type identifier for [`SessionEvent::StateSnapshot`].
pub const STATE_SNAPSHOT_EVENT_TYPE: &str = "state_snapshot";

/// Event type identifier for [`SessionEvent::PlayerJoined`].
pub const PLAYER_JOINED_EVENT_TYPE: &str = "player_joined";

/// Event type identifier for [`SessionEvent::PlayerLeft`].
pub const PLAYER_LEFT_EVENT_TYPE: &str = "player_left";

/// Event type identifier for [`SessionEvent::PlayerAction`].
pub const PLAYER_ACTION_EVENT_TYPE: &str = "player_action";

/// Event type identifier for [`SessionEvent::GameStateUpdate`].
pub const GAME_STATE_UPDATE_EVENT_TYPE: &str = "game_state_update";

/// Event type identifier for [`SessionEvent::SessionEnded`].
pub const SESSION_ENDED_EVENT_TYPE: &str = "session_ended";

/// Event type identifier for [`SessionEvent::Pong`].
pub const PONG_EVENT_TYPE: &str = "pong";

/// A message pushed to a connection, serialized with a `type` tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// Full session state, sent first on every connection.
    StateSnapshot {
        /// The session as committed.
        session: Box<Session>,
    },
    /// A player joined the roster.
    PlayerJoined {
        /// The new roster entry.
        player: PlayerInfo,
        /// The character the player brought.
        character: Value,
    },
    /// A connection closed or was dropped.
    PlayerLeft {
        /// The player whose connection went away.
        player_id: String,
    },
    /// A player's proposed action; not applied to the game state.
    PlayerAction {
        /// The acting player.
        player_id: String,
        /// The character acting.
        character_id: String,
        /// The player's display name.
        display_name: String,
        /// The proposal.
        action: Value,
        /// When the coordinator relayed it.
        submitted_at: DateTime<Utc>,
    },
    /// The authoritative game state changed.
    GameStateUpdate {
        /// Session status after the change.
        status: SessionStatus,
        /// The full game state.
        game_state: Box<GameState>,
    },
    /// The session reached a terminal state.
    SessionEnded {
        /// `completed` or `cancelled`.
        status: SessionStatus,
    },
    /// Reply to a client liveness ping.
    Pong,
}

impl SessionEvent {
    /// Returns the wire type name of the event.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::StateSnapshot { .. } => STATE_SNAPSHOT_EVENT_TYPE,
            Self::PlayerJoined { .. } => PLAYER_JOINED_EVENT_TYPE,
            Self::PlayerLeft { .. } => PLAYER_LEFT_EVENT_TYPE,
            Self::PlayerAction { .. } => PLAYER_ACTION_EVENT_TYPE,
            Self::GameStateUpdate { .. } => GAME_STATE_UPDATE_EVENT_TYPE,
            Self::SessionEnded { .. } => SESSION_ENDED_EVENT_TYPE,
            Self::Pong => PONG_EVENT_TYPE,
        }
    }
}
