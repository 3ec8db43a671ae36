//! Routes for hosting and playing a session, addressed by invite code.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tabletop_core::error::DomainError;
use tabletop_session::application::coordinator::SessionCoordinator;
use tabletop_session::application::narration::narrate_with_timeout;
use tabletop_session::domain::aggregates::{Quest, Session};
use tabletop_session::domain::commands::{
    ApplyHostAction, CancelSession, HostAction, InitializeSession, JoinSession, StartSession,
    SubmitPlayerAction,
};
use tabletop_session::domain::invite_code::InviteCode;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::auth::Principal;
use crate::error::{ApiError, ApiJson};
use crate::routes::ws;
use crate::state::AppState;

/// Request body for POST /.
#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    /// The quest to play, embedded in the session.
    pub quest: Quest,
    /// Opaque world/map snapshot.
    #[serde(default)]
    pub world: Value,
    /// Area the party starts in.
    #[serde(default)]
    pub starting_area: Option<String>,
}

/// Request body for POST /{code}/join.
#[derive(Debug, Deserialize)]
pub struct JoinSessionRequest {
    /// The character the caller brings.
    pub character_id: String,
    /// The character document.
    pub character: Value,
    /// Defaults to the caller's email, then their id.
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Request body for POST /{code}/start.
#[derive(Debug, Default, Deserialize)]
pub struct StartSessionRequest {
    /// Engine state supplied by the host's client.
    #[serde(default)]
    pub initial_state: Value,
}

/// Request body for POST /{code}/action.
#[derive(Debug, Deserialize)]
pub struct PlayerActionRequest {
    /// The character the caller acts as.
    pub character_id: String,
    /// The proposal, relayed untouched.
    pub action: Value,
}

/// Request body for POST /{code}/dm-action.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DmActionRequest {
    /// Append narration.
    Narrate {
        /// Message text.
        content: String,
    },
    /// Merge updates into a character.
    UpdateCharacter {
        /// Target character.
        character_id: String,
        /// Merge patch.
        updates: Value,
    },
    /// Advance one story beat, optionally narrated by the narration service.
    AdvanceStory {
        /// Narration written by the host.
        #[serde(default)]
        narration: Option<String>,
        /// Objective completed by this beat.
        #[serde(default)]
        completed_objective: Option<String>,
        /// Prompt for the narration service; exclusive with `narration`.
        #[serde(default)]
        prompt: Option<String>,
    },
}

/// Response body carrying the committed session.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    /// Always `true`.
    pub success: bool,
    /// The session after the request.
    pub session: Session,
}

impl SessionResponse {
    fn new(session: Session) -> Self {
        Self {
            success: true,
            session,
        }
    }
}

/// Response body for requests that change nothing durable.
#[derive(Debug, Serialize)]
pub struct AcceptedResponse {
    /// Always `true`.
    pub success: bool,
}

/// Resolves a route code to the coordinator of an existing session. Codes
/// that can never have been issued are reported as unknown sessions.
pub(crate) async fn coordinator_for(
    state: &AppState,
    code: &str,
) -> Result<Arc<SessionCoordinator>, DomainError> {
    let code = InviteCode::parse(code).map_err(|_| DomainError::NotFound(code.to_owned()))?;
    state.sessions.existing(&code).await
}

fn allocate_code(state: &AppState) -> Result<InviteCode, DomainError> {
    let mut rng = state
        .rng
        .lock()
        .map_err(|_| DomainError::Upstream("invite code generator is unavailable".into()))?;
    Ok(InviteCode::allocate(&mut *rng))
}

/// POST /
#[instrument(skip(state, principal, request), fields(host_id = %principal.id))]
async fn create_session(
    State(state): State<AppState>,
    principal: Principal,
    ApiJson(request): ApiJson<CreateSessionRequest>,
) -> Result<(StatusCode, Json<SessionResponse>), ApiError> {
    let code = allocate_code(&state)?;
    let command = InitializeSession {
        correlation_id: Uuid::new_v4(),
        host_id: principal.id,
        quest: request.quest,
        world: request.world,
        starting_area: request.starting_area,
    };

    info!(correlation_id = %command.correlation_id, invite_code = %code, "handling create_session command");

    let coordinator = state.sessions.coordinator(&code);
    let session = match coordinator.initialize(&command).await {
        Ok(session) => session,
        Err(err) => {
            state.sessions.forget_if_absent(coordinator);
            return Err(err.into());
        }
    };

    Ok((StatusCode::CREATED, Json(SessionResponse::new(session))))
}

/// GET /{code}
#[instrument(skip(state))]
async fn get_session(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<SessionResponse>, ApiError> {
    let session = coordinator_for(&state, &code).await?.get_state().await?;

    Ok(Json(SessionResponse::new(session)))
}

/// POST /{code}/join
#[instrument(skip(state, principal, request), fields(player_id = %principal.id))]
async fn join_session(
    State(state): State<AppState>,
    Path(code): Path<String>,
    principal: Principal,
    ApiJson(request): ApiJson<JoinSessionRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let coordinator = coordinator_for(&state, &code).await?;
    let display_name = request
        .display_name
        .filter(|name| !name.trim().is_empty())
        .or(principal.email)
        .unwrap_or_else(|| principal.id.clone());
    let command = JoinSession {
        correlation_id: Uuid::new_v4(),
        player_id: principal.id,
        character_id: request.character_id,
        display_name,
        character: request.character,
    };

    info!(correlation_id = %command.correlation_id, "handling join_session command");

    let session = coordinator.join(&command).await?;

    Ok(Json(SessionResponse::new(session)))
}

/// POST /{code}/start
#[instrument(skip(state, principal, request), fields(caller_id = %principal.id))]
async fn start_session(
    State(state): State<AppState>,
    Path(code): Path<String>,
    principal: Principal,
    ApiJson(request): ApiJson<StartSessionRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let coordinator = coordinator_for(&state, &code).await?;
    let command = StartSession {
        correlation_id: Uuid::new_v4(),
        host_id: principal.id,
        initial_state: request.initial_state,
    };

    info!(correlation_id = %command.correlation_id, "handling start_session command");

    let session = coordinator.start(&command).await?;

    Ok(Json(SessionResponse::new(session)))
}

/// POST /{code}/action
#[instrument(skip(state, principal, request), fields(player_id = %principal.id))]
async fn player_action(
    State(state): State<AppState>,
    Path(code): Path<String>,
    principal: Principal,
    ApiJson(request): ApiJson<PlayerActionRequest>,
) -> Result<(StatusCode, Json<AcceptedResponse>), ApiError> {
    let coordinator = coordinator_for(&state, &code).await?;
    let command = SubmitPlayerAction {
        correlation_id: Uuid::new_v4(),
        player_id: principal.id,
        character_id: request.character_id,
        action: request.action,
    };

    info!(correlation_id = %command.correlation_id, "handling player_action command");

    coordinator.player_action(&command).await?;

    Ok((StatusCode::ACCEPTED, Json(AcceptedResponse { success: true })))
}

/// POST /{code}/dm-action
#[instrument(skip(state, principal, request), fields(caller_id = %principal.id))]
async fn dm_action(
    State(state): State<AppState>,
    Path(code): Path<String>,
    principal: Principal,
    ApiJson(request): ApiJson<DmActionRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let coordinator = coordinator_for(&state, &code).await?;
    let action = match request {
        DmActionRequest::Narrate { content } => HostAction::Narrate { content },
        DmActionRequest::UpdateCharacter {
            character_id,
            updates,
        } => HostAction::UpdateCharacter {
            character_id,
            updates,
        },
        DmActionRequest::AdvanceStory {
            narration,
            completed_objective,
            prompt,
        } => {
            let narration = match prompt {
                None => narration,
                Some(_) if narration.is_some() => {
                    return Err(DomainError::Malformed(
                        "provide either narration or prompt, not both".into(),
                    )
                    .into());
                }
                Some(prompt) => {
                    ensure_host_may_act(&coordinator, &principal).await?;
                    Some(
                        narrate_with_timeout(
                            state.narrator.as_ref(),
                            &prompt,
                            state.settings.narration_timeout,
                        )
                        .await?,
                    )
                }
            };
            HostAction::AdvanceStory {
                narration,
                completed_objective,
            }
        }
    };
    let command = ApplyHostAction {
        correlation_id: Uuid::new_v4(),
        host_id: principal.id,
        action,
    };

    info!(correlation_id = %command.correlation_id, action = command.action.action_type(), "handling dm_action command");

    let session = coordinator.host_action(&command).await?;

    Ok(Json(SessionResponse::new(session)))
}

/// Rejects a prompt before the narrator is called if the coordinator would
/// reject the resulting action anyway.
async fn ensure_host_may_act(
    coordinator: &SessionCoordinator,
    principal: &Principal,
) -> Result<(), DomainError> {
    let session = coordinator.get_state().await?;
    if session.host_id != principal.id {
        return Err(DomainError::Unauthorized(
            "only the host may perform this action".into(),
        ));
    }
    if session.status.is_closed() {
        return Err(DomainError::SessionClosed);
    }
    Ok(())
}

/// POST /{code}/cancel
#[instrument(skip(state, principal), fields(caller_id = %principal.id))]
async fn cancel_session(
    State(state): State<AppState>,
    Path(code): Path<String>,
    principal: Principal,
) -> Result<Json<SessionResponse>, ApiError> {
    let coordinator = coordinator_for(&state, &code).await?;
    let command = CancelSession {
        correlation_id: Uuid::new_v4(),
        host_id: principal.id,
    };

    info!(correlation_id = %command.correlation_id, "handling cancel_session command");

    let session = coordinator.cancel(&command).await?;

    Ok(Json(SessionResponse::new(session)))
}

/// Returns the router for sessions.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_session))
        .route("/{code}", get(get_session))
        .route("/{code}/join", post(join_session))
        .route("/{code}/start", post(start_session))
        .route("/{code}/action", post(player_action))
        .route("/{code}/dm-action", post(dm_action))
        .route("/{code}/cancel", post(cancel_session))
        .route("/{code}/ws", get(ws::connect))
}
