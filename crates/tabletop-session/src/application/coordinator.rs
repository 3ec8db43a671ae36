//! The single-writer coordinator of one session.
//!
//! Every operation takes the coordinator's lock for its whole duration, so
//! requests for one session are applied one at a time in arrival order.
//! Mutations follow the same sequence: load once, clone, mutate the clone,
//! persist it, swap it in, then broadcast. A failed persist leaves the
//! in-memory session untouched and nobody is notified.

use std::fmt;
use std::sync::Arc;

use tabletop_core::clock::Clock;
use tabletop_core::command::Command;
use tabletop_core::error::DomainError;
use tabletop_core::store::{Checkpoint, StateStore};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::application::connections::{ConnectionId, ConnectionRegistry, EventSender};
use crate::domain::aggregates::Session;
use crate::domain::commands::{
    ApplyHostAction, CancelSession, InitializeSession, JoinSession, StartSession,
    SubmitPlayerAction,
};
use crate::domain::events::SessionEvent;
use crate::domain::invite_code::InviteCode;

#[derive(Debug, Clone, Copy)]
enum Write {
    Create,
    Save,
}

#[derive(Debug, Default)]
struct CoordinatorState {
    loaded: bool,
    session: Option<Session>,
    connections: ConnectionRegistry,
}

/// Owns one session's truth and its live connections.
pub struct SessionCoordinator {
    session_id: Uuid,
    invite_code: InviteCode,
    clock: Arc<dyn Clock>,
    store: Arc<dyn StateStore>,
    state: Mutex<CoordinatorState>,
}

impl fmt::Debug for SessionCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCoordinator")
            .field("session_id", &self.session_id)
            .field("invite_code", &self.invite_code)
            .finish_non_exhaustive()
    }
}

impl SessionCoordinator {
    /// Creates a coordinator that has not yet looked at the store.
    #[must_use]
    pub fn new(
        session_id: Uuid,
        invite_code: InviteCode,
        clock: Arc<dyn Clock>,
        store: Arc<dyn StateStore>,
    ) -> Self {
        Self {
            session_id,
            invite_code,
            clock,
            store,
            state: Mutex::new(CoordinatorState::default()),
        }
    }

    /// Internal identity used as the checkpoint key.
    #[must_use]
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Public address of the session.
    #[must_use]
    pub fn invite_code(&self) -> &InviteCode {
        &self.invite_code
    }

    /// Creates the session in `waiting` and writes its first checkpoint.
    ///
    /// # Errors
    ///
    /// - `AlreadyExists` if this coordinator or the store already holds a
    ///   session for the invite code.
    /// - `Malformed` for a blank host id or quest name.
    /// - `Upstream` if the store is unavailable.
    #[instrument(skip(self, command), fields(invite_code = %self.invite_code, correlation_id = %command.correlation_id()))]
    pub async fn initialize(&self, command: &InitializeSession) -> Result<Session, DomainError> {
        let mut state = self.state.lock().await;
        self.ensure_loaded(&mut state).await?;
        if state.session.is_some() {
            return Err(DomainError::AlreadyExists(format!(
                "session {}",
                self.invite_code
            )));
        }

        let session = Session::create(
            self.session_id,
            self.invite_code.clone(),
            &command.host_id,
            command.quest.clone(),
            command.world.clone(),
            command.starting_area.clone(),
            self.clock.now(),
        )?;
        self.persist(&mut state, session.clone(), Write::Create)
            .await?;

        info!(host_id = %command.host_id, command_type = command.command_type(), "session initialized");
        Ok(session)
    }

    /// Adds a player to the roster and announces them.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the session was never initialized.
    /// - `DuplicatePlayer`, `InvalidState`, `SessionClosed` or `Malformed`
    ///   from the roster rules.
    /// - `Upstream` if the store is unavailable.
    #[instrument(skip(self, command), fields(invite_code = %self.invite_code, correlation_id = %command.correlation_id(), player_id = %command.player_id))]
    pub async fn join(&self, command: &JoinSession) -> Result<Session, DomainError> {
        let mut state = self.state.lock().await;
        self.ensure_loaded(&mut state).await?;

        let mut next = self.current(&state)?.clone();
        let player = next.join(
            &command.player_id,
            &command.character_id,
            &command.display_name,
            command.character.clone(),
            self.clock.now(),
        )?;
        self.persist(&mut state, next.clone(), Write::Save).await?;

        info!(character_id = %player.character_id, "player joined");
        state.connections.broadcast(SessionEvent::PlayerJoined {
            player,
            character: command.character.clone(),
        });
        Ok(next)
    }

    /// Moves the session to `active` and publishes the initial game state.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the session was never initialized.
    /// - `Unauthorized` if the caller is not the host.
    /// - `InvalidState` or `SessionClosed` if the session is not waiting.
    /// - `Upstream` if the store is unavailable.
    #[instrument(skip(self, command), fields(invite_code = %self.invite_code, correlation_id = %command.correlation_id()))]
    pub async fn start(&self, command: &StartSession) -> Result<Session, DomainError> {
        let mut state = self.state.lock().await;
        self.ensure_loaded(&mut state).await?;

        let mut next = self.current(&state)?.clone();
        next.start(
            &command.host_id,
            command.initial_state.clone(),
            self.clock.now(),
        )?;
        self.persist(&mut state, next.clone(), Write::Save).await?;

        info!(players = next.players.len(), "session started");
        Self::broadcast_game_state(&mut state.connections, &next);
        Ok(next)
    }

    /// Relays a player's proposal to every connection.
    ///
    /// Nothing is persisted and the game state is not touched; only the
    /// host's actions are authoritative.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the session was never initialized.
    /// - `InvalidState` or `SessionClosed` if the game is not running.
    /// - `InvalidPlayer` if the player does not control the character.
    #[instrument(skip(self, command), fields(invite_code = %self.invite_code, correlation_id = %command.correlation_id(), player_id = %command.player_id))]
    pub async fn player_action(&self, command: &SubmitPlayerAction) -> Result<(), DomainError> {
        let mut state = self.state.lock().await;
        self.ensure_loaded(&mut state).await?;

        let player = self
            .current(&state)?
            .bound_player(&command.player_id, &command.character_id)?;
        let event = SessionEvent::PlayerAction {
            player_id: player.player_id.clone(),
            character_id: player.character_id.clone(),
            display_name: player.display_name.clone(),
            action: command.action.clone(),
            submitted_at: self.clock.now(),
        };

        debug!("relaying player action");
        state.connections.broadcast(event);
        Ok(())
    }

    /// Commits a host action and publishes the updated game state.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the session was never initialized.
    /// - `Unauthorized` if the caller is not the host.
    /// - `InvalidState` or `SessionClosed` if the game is not running.
    /// - `Malformed` if the action does not fit the game state.
    /// - `Upstream` if the store is unavailable.
    #[instrument(skip(self, command), fields(invite_code = %self.invite_code, correlation_id = %command.correlation_id(), action = command.action.action_type()))]
    pub async fn host_action(&self, command: &ApplyHostAction) -> Result<Session, DomainError> {
        let mut state = self.state.lock().await;
        self.ensure_loaded(&mut state).await?;

        let mut next = self.current(&state)?.clone();
        next.apply_host_action(&command.host_id, &command.action, self.clock.now())?;
        self.persist(&mut state, next.clone(), Write::Save).await?;

        info!(status = ?next.status, "host action committed");
        Self::broadcast_game_state(&mut state.connections, &next);
        if next.status.is_closed() {
            state
                .connections
                .broadcast(SessionEvent::SessionEnded { status: next.status });
        }
        Ok(next)
    }

    /// Cancels the session.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the session was never initialized.
    /// - `Unauthorized` if the caller is not the host.
    /// - `SessionClosed` if the session already ended.
    /// - `Upstream` if the store is unavailable.
    #[instrument(skip(self, command), fields(invite_code = %self.invite_code, correlation_id = %command.correlation_id()))]
    pub async fn cancel(&self, command: &CancelSession) -> Result<Session, DomainError> {
        let mut state = self.state.lock().await;
        self.ensure_loaded(&mut state).await?;

        let mut next = self.current(&state)?.clone();
        next.cancel(&command.host_id, self.clock.now())?;
        self.persist(&mut state, next.clone(), Write::Save).await?;

        info!("session cancelled");
        state
            .connections
            .broadcast(SessionEvent::SessionEnded { status: next.status });
        Ok(next)
    }

    /// Returns the committed session.
    ///
    /// The first call in the coordinator's lifetime reads the checkpoint;
    /// later calls are served from memory.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the session was never initialized.
    /// - `Upstream` if the first load fails.
    pub async fn get_state(&self) -> Result<Session, DomainError> {
        let mut state = self.state.lock().await;
        self.ensure_loaded(&mut state).await?;
        self.current(&state).cloned()
    }

    /// Checks that a session exists without copying it.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the session was never initialized.
    /// - `Upstream` if the first load fails.
    pub async fn ensure_exists(&self) -> Result<(), DomainError> {
        let mut state = self.state.lock().await;
        self.ensure_loaded(&mut state).await?;
        self.current(&state).map(|_| ())
    }

    /// Whether the coordinator holds no session and no connections, so
    /// dropping it loses nothing. A coordinator busy with a request is not
    /// vacant.
    #[must_use]
    pub fn is_vacant(&self) -> bool {
        self.state
            .try_lock()
            .is_ok_and(|state| state.session.is_none() && state.connections.is_empty())
    }

    /// Registers a live connection and queues the welcome snapshot on it.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the session was never initialized.
    /// - `InvalidPlayer` if the pair is neither the host nor a roster entry.
    /// - `Upstream` if the first load fails or the connection closed before
    ///   the snapshot could be queued.
    #[instrument(skip(self, sender), fields(invite_code = %self.invite_code))]
    pub async fn connect(
        &self,
        player_id: &str,
        character_id: &str,
        sender: EventSender,
    ) -> Result<ConnectionId, DomainError> {
        let mut state = self.state.lock().await;
        self.ensure_loaded(&mut state).await?;

        let session = self.current(&state)?;
        session.admit_connection(player_id, character_id)?;
        let snapshot = SessionEvent::StateSnapshot {
            session: Box::new(session.clone()),
        };
        let connection_id = state.connections.register(player_id, character_id, sender);
        if !state.connections.send_to(player_id, snapshot) {
            return Err(DomainError::Upstream(
                "connection closed before the snapshot was sent".into(),
            ));
        }

        info!(%connection_id, connections = state.connections.len(), "connection opened");
        Ok(connection_id)
    }

    /// Removes a connection and announces the departure.
    ///
    /// Does nothing if the player has since reconnected on a newer
    /// connection.
    #[instrument(skip(self), fields(invite_code = %self.invite_code))]
    pub async fn disconnect(&self, player_id: &str, connection_id: ConnectionId) {
        let mut state = self.state.lock().await;
        if state.connections.unregister(player_id, connection_id) {
            info!("connection closed");
            state.connections.broadcast(SessionEvent::PlayerLeft {
                player_id: player_id.to_owned(),
            });
        }
    }

    /// Players that currently hold a live connection.
    pub async fn connected_players(&self) -> Vec<String> {
        self.state.lock().await.connections.player_ids()
    }

    async fn ensure_loaded(&self, state: &mut CoordinatorState) -> Result<(), DomainError> {
        if state.loaded {
            return Ok(());
        }

        let checkpoint = self.store.load(self.session_id).await?;
        state.session = checkpoint
            .map(|checkpoint| {
                serde_json::from_value::<Session>(checkpoint.state).map_err(|e| {
                    DomainError::Upstream(format!("checkpoint deserialization failed: {e}"))
                })
            })
            .transpose()?;
        state.loaded = true;

        debug!(found = state.session.is_some(), "checkpoint loaded");
        Ok(())
    }

    fn current<'a>(&self, state: &'a CoordinatorState) -> Result<&'a Session, DomainError> {
        state
            .session
            .as_ref()
            .ok_or_else(|| DomainError::NotFound(self.invite_code.to_string()))
    }

    async fn persist(
        &self,
        state: &mut CoordinatorState,
        next: Session,
        write: Write,
    ) -> Result<(), DomainError> {
        let checkpoint = Checkpoint {
            session_id: self.session_id,
            invite_code: self.invite_code.to_string(),
            state: serde_json::to_value(&next).map_err(|e| {
                DomainError::Upstream(format!("checkpoint serialization failed: {e}"))
            })?,
            updated_at: next.last_updated,
        };
        match write {
            Write::Create => self.store.create(&checkpoint).await?,
            Write::Save => self.store.save(&checkpoint).await?,
        }
        state.session = Some(next);
        Ok(())
    }

    fn broadcast_game_state(connections: &mut ConnectionRegistry, session: &Session) {
        if let Some(game_state) = &session.game_state {
            connections.broadcast(SessionEvent::GameStateUpdate {
                status: session.status,
                game_state: Box::new(game_state.clone()),
            });
        }
    }
}
