//! Live session connections over WebSocket.

use std::sync::Arc;

use axum::extract::rejection::QueryRejection;
use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tabletop_core::error::DomainError;
use tabletop_session::application::coordinator::SessionCoordinator;
use tabletop_session::domain::events::SessionEvent;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

use crate::error::ApiError;
use crate::routes::sessions::coordinator_for;
use crate::state::AppState;

/// Query parameters identifying who is connecting.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectParams {
    /// The connecting player.
    pub player_id: String,
    /// The character the player plays.
    pub character_id: String,
}

/// Messages a client may send.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientMessage {
    Ping,
}

/// GET /{code}/ws?playerId=..&characterId=..
///
/// Unknown sessions, missing parameters and pairs that are neither the host
/// nor on the roster are answered as plain HTTP errors; the upgrade only
/// happens for an admitted pair.
#[instrument(skip(state, params, upgrade))]
pub async fn connect(
    State(state): State<AppState>,
    Path(code): Path<String>,
    params: Result<Query<ConnectParams>, QueryRejection>,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Result<Response, ApiError> {
    let Query(params) = params.map_err(|e| DomainError::Malformed(e.body_text()))?;
    if params.player_id.trim().is_empty() || params.character_id.trim().is_empty() {
        return Err(DomainError::Malformed("playerId and characterId are required".into()).into());
    }

    let coordinator = coordinator_for(&state, &code).await?;
    coordinator
        .get_state()
        .await?
        .admit_connection(&params.player_id, &params.character_id)?;

    let upgrade = match upgrade {
        Ok(upgrade) => upgrade,
        Err(rejection) => return Ok(rejection.into_response()),
    };
    let buffer = state.settings.connection_buffer;

    Ok(upgrade.on_upgrade(move |socket| serve(socket, coordinator, params, buffer)))
}

/// Pumps coordinator events to the socket and client pings back in, then
/// unregisters the connection.
///
/// The coordinator owns the only strong sender for the outbound queue, so
/// an evicted connection sees its queue close and the socket is shut.
#[instrument(skip_all, fields(invite_code = %coordinator.invite_code(), player_id = %params.player_id))]
async fn serve(
    socket: WebSocket,
    coordinator: Arc<SessionCoordinator>,
    params: ConnectParams,
    buffer: usize,
) {
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::channel::<SessionEvent>(buffer);
    let pong_sender = tx.downgrade();

    let connection_id = match coordinator
        .connect(&params.player_id, &params.character_id, tx)
        .await
    {
        Ok(connection_id) => connection_id,
        Err(err) => {
            warn!(error = %err, "connection rejected");
            let _ = sink.send(Message::Close(None)).await;
            return;
        }
    };

    let mut send_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(err) => {
                    warn!(error = %err, event_type = event.event_type(), "event not serializable");
                    continue;
                }
            };
            if sink.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
        let _ = sink.send(Message::Close(None)).await;
    });

    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(message)) = stream.next().await {
            match message {
                Message::Text(text) => match serde_json::from_str::<ClientMessage>(text.as_str()) {
                    Ok(ClientMessage::Ping) => {
                        if let Some(tx) = pong_sender.upgrade() {
                            let _ = tx.try_send(SessionEvent::Pong);
                        }
                    }
                    Err(err) => debug!(error = %err, "ignoring unrecognized client message"),
                },
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    coordinator
        .disconnect(&params.player_id, connection_id)
        .await;
    info!(%connection_id, "socket closed");
}
