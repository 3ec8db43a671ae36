//! Aggregate root for a hosted session.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tabletop_core::error::DomainError;
use uuid::Uuid;

use super::commands::HostAction;
use super::invite_code::InviteCode;

/// Speaker recorded on every host-authored message.
pub const DUNGEON_MASTER_SPEAKER: &str = "Dungeon Master";

/// Lifecycle of a session. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Accepting players; the game has not started.
    Waiting,
    /// The game is running.
    Active,
    /// Every quest objective was completed.
    Completed,
    /// The host abandoned the session.
    Cancelled,
}

impl SessionStatus {
    /// Whether the session has reached a terminal state.
    #[must_use]
    pub fn is_closed(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

/// A quest objective.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Objective {
    /// Objective identifier, unique within the quest.
    pub id: String,
    /// What the party must do.
    pub description: String,
    /// Whether the host has marked it done.
    #[serde(default)]
    pub completed: bool,
}

/// The quest a session is bound to, embedded at creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quest {
    /// Catalog identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Long description.
    #[serde(default)]
    pub description: String,
    /// Ordered objectives.
    #[serde(default)]
    pub objectives: Vec<Objective>,
}

/// One roster entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerInfo {
    /// The joined principal.
    pub player_id: String,
    /// The character bound to the player.
    pub character_id: String,
    /// Name shown to the other participants.
    pub display_name: String,
    /// When the player joined.
    pub joined_at: DateTime<Utc>,
}

/// Kind of a logged message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// Free narration from the host.
    Narration,
    /// Narration attached to a story beat.
    Story,
}

/// An entry of the append-only message log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameMessage {
    /// Derived from the session id and the log index.
    pub id: Uuid,
    /// Who said it.
    pub speaker: String,
    /// Message text.
    pub content: String,
    /// Message kind.
    #[serde(rename = "type")]
    pub kind: MessageKind,
    /// When it was committed.
    pub timestamp: DateTime<Utc>,
}

/// Authoritative game state, present once the session is active.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    /// Roster snapshot taken at start.
    pub players: Vec<PlayerInfo>,
    /// Character documents keyed by character id.
    pub characters: BTreeMap<String, Value>,
    /// Append-only message log.
    pub messages: Vec<GameMessage>,
    /// Area the party is currently in.
    pub current_area: Option<String>,
    /// Opaque world/map snapshot.
    pub world: Value,
    /// Opaque engine state supplied by the host at start.
    pub engine_state: Value,
    /// Number of story beats advanced so far.
    pub story_beat: u32,
}

/// The root aggregate of a hosted game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Internal identity, derived from the invite code.
    pub session_id: Uuid,
    /// Public address.
    pub invite_code: InviteCode,
    /// The hosting principal.
    pub host_id: String,
    /// The bound quest.
    pub quest: Quest,
    /// Lifecycle status.
    pub status: SessionStatus,
    /// Opaque world snapshot supplied at creation.
    pub world: Value,
    /// Where the party starts.
    pub starting_area: Option<String>,
    /// Roster, in join order.
    pub players: Vec<PlayerInfo>,
    /// Character documents brought by joining players.
    pub characters: BTreeMap<String, Value>,
    /// Present once the session is active.
    pub game_state: Option<GameState>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Time of the last committed mutation; never decreases.
    pub last_updated: DateTime<Utc>,
}

impl Session {
    /// Creates a session in `waiting`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Malformed` if the host id or quest name is blank.
    pub fn create(
        session_id: Uuid,
        invite_code: InviteCode,
        host_id: &str,
        quest: Quest,
        world: Value,
        starting_area: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        if host_id.trim().is_empty() {
            return Err(DomainError::Malformed("host id must not be empty".into()));
        }
        if quest.name.trim().is_empty() {
            return Err(DomainError::Malformed("quest name must not be empty".into()));
        }

        Ok(Self {
            session_id,
            invite_code,
            host_id: host_id.to_owned(),
            quest,
            status: SessionStatus::Waiting,
            world,
            starting_area,
            players: Vec::new(),
            characters: BTreeMap::new(),
            game_state: None,
            created_at: now,
            last_updated: now,
        })
    }

    /// Returns the roster entry for a player.
    #[must_use]
    pub fn player(&self, player_id: &str) -> Option<&PlayerInfo> {
        self.players.iter().find(|p| p.player_id == player_id)
    }

    /// Adds a player to the roster.
    ///
    /// # Errors
    ///
    /// - `SessionClosed` if the session is completed or cancelled.
    /// - `InvalidState` if the game has already started.
    /// - `DuplicatePlayer` if the player already joined.
    /// - `Malformed` if an id is blank.
    pub fn join(
        &mut self,
        player_id: &str,
        character_id: &str,
        display_name: &str,
        character: Value,
        now: DateTime<Utc>,
    ) -> Result<PlayerInfo, DomainError> {
        if player_id.trim().is_empty() || character_id.trim().is_empty() {
            return Err(DomainError::Malformed(
                "player id and character id must not be empty".into(),
            ));
        }
        self.ensure_open()?;
        if self.status != SessionStatus::Waiting {
            return Err(DomainError::InvalidState(
                "session is not accepting players".into(),
            ));
        }
        if self.player(player_id).is_some() {
            return Err(DomainError::DuplicatePlayer(player_id.to_owned()));
        }

        let entry = PlayerInfo {
            player_id: player_id.to_owned(),
            character_id: character_id.to_owned(),
            display_name: display_name.to_owned(),
            joined_at: now,
        };
        self.players.push(entry.clone());
        self.characters.insert(character_id.to_owned(), character);
        self.touch(now);
        Ok(entry)
    }

    /// Starts the game, building the game state from the roster.
    ///
    /// # Errors
    ///
    /// - `Unauthorized` if the caller is not the host.
    /// - `SessionClosed` if the session is completed or cancelled.
    /// - `InvalidState` if the game has already started.
    pub fn start(
        &mut self,
        caller_id: &str,
        engine_state: Value,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        self.ensure_host(caller_id)?;
        self.ensure_open()?;
        if self.status != SessionStatus::Waiting {
            return Err(DomainError::InvalidState("session has already started".into()));
        }

        self.game_state = Some(GameState {
            players: self.players.clone(),
            characters: self.characters.clone(),
            messages: Vec::new(),
            current_area: self.starting_area.clone(),
            world: self.world.clone(),
            engine_state,
            story_beat: 0,
        });
        self.status = SessionStatus::Active;
        self.touch(now);
        Ok(())
    }

    /// Checks that a live connection may be opened for the pair.
    ///
    /// The host may connect with any character id; anyone else must match
    /// their roster entry.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPlayer` if the pair is neither the host nor bound in
    /// the roster.
    pub fn admit_connection(&self, player_id: &str, character_id: &str) -> Result<(), DomainError> {
        if player_id == self.host_id {
            return Ok(());
        }
        match self.player(player_id) {
            Some(entry) if entry.character_id == character_id => Ok(()),
            _ => Err(DomainError::InvalidPlayer(format!(
                "player {player_id} is not bound to character {character_id}"
            ))),
        }
    }

    /// Checks that a player may act as a character in the running game.
    ///
    /// # Errors
    ///
    /// - `SessionClosed` if the session is completed or cancelled.
    /// - `InvalidState` if the game is not running.
    /// - `InvalidPlayer` if the roster does not bind the player to the
    ///   character.
    pub fn bound_player(
        &self,
        player_id: &str,
        character_id: &str,
    ) -> Result<&PlayerInfo, DomainError> {
        self.ensure_open()?;
        if self.status != SessionStatus::Active {
            return Err(DomainError::InvalidState("game has not started".into()));
        }
        match self.player(player_id) {
            Some(entry) if entry.character_id == character_id => Ok(entry),
            Some(_) => Err(DomainError::InvalidPlayer(format!(
                "player {player_id} does not control character {character_id}"
            ))),
            None => Err(DomainError::InvalidPlayer(format!(
                "player {player_id} has not joined this session"
            ))),
        }
    }

    /// Commits a host action to the game state.
    ///
    /// # Errors
    ///
    /// - `Unauthorized` if the caller is not the host.
    /// - `SessionClosed` if the session is completed or cancelled.
    /// - `InvalidState` if the game is not running.
    /// - `Malformed` for empty narration, a non-object update, or an unknown
    ///   character or objective.
    pub fn apply_host_action(
        &mut self,
        caller_id: &str,
        action: &HostAction,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        self.ensure_host(caller_id)?;
        self.ensure_open()?;
        if self.status != SessionStatus::Active {
            return Err(DomainError::InvalidState("game has not started".into()));
        }
        let session_id = self.session_id;
        let Some(game_state) = self.game_state.as_mut() else {
            return Err(DomainError::InvalidState("active session has no game state".into()));
        };

        match action {
            HostAction::Narrate { content } => {
                if content.trim().is_empty() {
                    return Err(DomainError::Malformed("narration must not be empty".into()));
                }
                append_message(game_state, session_id, content, MessageKind::Narration, now);
            }
            HostAction::UpdateCharacter {
                character_id,
                updates,
            } => {
                if !updates.is_object() {
                    return Err(DomainError::Malformed(
                        "character updates must be an object".into(),
                    ));
                }
                let document = game_state.characters.get_mut(character_id).ok_or_else(|| {
                    DomainError::Malformed(format!("unknown character {character_id}"))
                })?;
                merge_patch(document, updates);
            }
            HostAction::AdvanceStory {
                narration,
                completed_objective,
            } => {
                if let Some(objective_id) = completed_objective {
                    let objective = self
                        .quest
                        .objectives
                        .iter_mut()
                        .find(|o| &o.id == objective_id)
                        .ok_or_else(|| {
                            DomainError::Malformed(format!("unknown objective {objective_id}"))
                        })?;
                    objective.completed = true;
                }
                game_state.story_beat = game_state.story_beat.saturating_add(1);
                if let Some(text) = narration.as_deref().filter(|t| !t.trim().is_empty()) {
                    append_message(game_state, session_id, text, MessageKind::Story, now);
                }
                let objectives = &self.quest.objectives;
                if !objectives.is_empty() && objectives.iter().all(|o| o.completed) {
                    self.status = SessionStatus::Completed;
                }
            }
        }

        self.touch(now);
        Ok(())
    }

    /// Abandons the session.
    ///
    /// # Errors
    ///
    /// - `Unauthorized` if the caller is not the host.
    /// - `SessionClosed` if the session is already completed or cancelled.
    pub fn cancel(&mut self, caller_id: &str, now: DateTime<Utc>) -> Result<(), DomainError> {
        self.ensure_host(caller_id)?;
        self.ensure_open()?;
        self.status = SessionStatus::Cancelled;
        self.touch(now);
        Ok(())
    }

    fn ensure_host(&self, caller_id: &str) -> Result<(), DomainError> {
        if caller_id == self.host_id {
            Ok(())
        } else {
            Err(DomainError::Unauthorized(
                "only the host may perform this action".into(),
            ))
        }
    }

    fn ensure_open(&self) -> Result<(), DomainError> {
        if self.status.is_closed() {
            Err(DomainError::SessionClosed)
        } else {
            Ok(())
        }
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.last_updated = self.last_updated.max(now);
    }
}

fn append_message(
    game_state: &mut GameState,
    session_id: Uuid,
    content: &str,
    kind: MessageKind,
    now: DateTime<Utc>,
) {
    let index = game_state.messages.len();
    game_state.messages.push(GameMessage {
        id: Uuid::new_v5(&session_id, format!("message:{index}").as_bytes()),
        speaker: DUNGEON_MASTER_SPEAKER.to_owned(),
        content: content.to_owned(),
        kind,
        timestamp: now,
    });
}

/// RFC 7396 merge: objects merge recursively, `null` deletes, anything else
/// replaces.
fn merge_patch(target: &mut Value, patch: &Value) {
    let Value::Object(patch_fields) = patch else {
        *target = patch.clone();
        return;
    };
    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    if let Value::Object(target_fields) = target {
        for (key, value) in patch_fields {
            if value.is_null() {
                target_fields.remove(key);
            } else {
                merge_patch(
                    target_fields.entry(key.clone()).or_insert(Value::Null),
                    value,
                );
            }
        }
    }
}
