//! Commands accepted by the session coordinator.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tabletop_core::command::Command;
use uuid::Uuid;

use super::aggregates::Quest;

/// Command to create the session in `waiting`.
#[derive(Debug, Clone)]
pub struct InitializeSession {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The principal that becomes the host.
    pub host_id: String,
    /// The quest the session plays through.
    pub quest: Quest,
    /// Opaque world/map snapshot carried into the game state.
    pub world: Value,
    /// Area the party starts in, if the world defines one.
    pub starting_area: Option<String>,
}

impl Command for InitializeSession {
    fn command_type(&self) -> &'static str {
        "session.initialize"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to add a player and their character to the roster.
#[derive(Debug, Clone)]
pub struct JoinSession {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The joining principal.
    pub player_id: String,
    /// The character the player brings.
    pub character_id: String,
    /// Name shown to the other participants.
    pub display_name: String,
    /// The character document, stored and forwarded as-is.
    pub character: Value,
}

impl Command for JoinSession {
    fn command_type(&self) -> &'static str {
        "session.join"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to move the session from `waiting` to `active`.
#[derive(Debug, Clone)]
pub struct StartSession {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The caller; must be the session's host.
    pub host_id: String,
    /// Engine state supplied by the host's client.
    pub initial_state: Value,
}

impl Command for StartSession {
    fn command_type(&self) -> &'static str {
        "session.start"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command carrying a player's proposed action. Relayed, never applied.
#[derive(Debug, Clone)]
pub struct SubmitPlayerAction {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The acting principal.
    pub player_id: String,
    /// The character the player claims to act as.
    pub character_id: String,
    /// The proposal, forwarded to observers untouched.
    pub action: Value,
}

impl Command for SubmitPlayerAction {
    fn command_type(&self) -> &'static str {
        "session.player_action"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Authoritative mutations only the host may commit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum HostAction {
    /// Append a narration message to the log.
    Narrate {
        /// Message text.
        content: String,
    },
    /// Merge a partial document into a character (JSON merge patch).
    UpdateCharacter {
        /// The character to update.
        character_id: String,
        /// Fields to set; `null` removes a field.
        updates: Value,
    },
    /// Move the story forward one beat.
    AdvanceStory {
        /// Narration to append alongside the beat.
        #[serde(default)]
        narration: Option<String>,
        /// Quest objective the beat completes.
        #[serde(default)]
        completed_objective: Option<String>,
    },
}

impl HostAction {
    /// Wire name of the action type.
    #[must_use]
    pub fn action_type(&self) -> &'static str {
        match self {
            Self::Narrate { .. } => "narrate",
            Self::UpdateCharacter { .. } => "updateCharacter",
            Self::AdvanceStory { .. } => "advanceStory",
        }
    }
}

/// Command wrapping a host action.
#[derive(Debug, Clone)]
pub struct ApplyHostAction {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The caller; must be the session's host.
    pub host_id: String,
    /// The mutation to commit.
    pub action: HostAction,
}

impl Command for ApplyHostAction {
    fn command_type(&self) -> &'static str {
        "session.host_action"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

/// Command to abandon the session.
#[derive(Debug, Clone)]
pub struct CancelSession {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The caller; must be the session's host.
    pub host_id: String,
}

impl Command for CancelSession {
    fn command_type(&self) -> &'static str {
        "session.cancel"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}
