//! Domain error types.

use thiserror::Error;

/// Error taxonomy shared by the coordinator and the HTTP/WS edge.
///
/// Every variant maps to exactly one machine-readable kind (see
/// [`DomainError::kind`]) so that callers can branch without parsing the
/// human message.
#[derive(Debug, Error)]
pub enum DomainError {
    /// No session exists for the given invite code.
    #[error("session not found: {0}")]
    NotFound(String),

    /// The operation is not legal in the session's current status.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// The session is completed or cancelled and accepts no further mutations.
    #[error("session closed")]
    SessionClosed,

    /// No principal accompanied the request.
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    /// The caller is not the bound host for a host-only operation.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The player already has a roster entry.
    #[error("player {0} has already joined this session")]
    DuplicatePlayer(String),

    /// The player/character pair is not bound in the roster.
    #[error("invalid player: {0}")]
    InvalidPlayer(String),

    /// A session with the same identity or invite code already exists.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// The checkpoint store or the narration collaborator failed.
    #[error("upstream failure: {0}")]
    Upstream(String),

    /// The request failed schema validation.
    #[error("malformed request: {0}")]
    Malformed(String),
}

impl DomainError {
    /// Machine-readable error kind, stable across releases.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::InvalidState(_) => "invalid_state",
            Self::SessionClosed => "session_closed",
            Self::Unauthenticated(_) => "unauthenticated",
            Self::Unauthorized(_) => "unauthorized",
            Self::DuplicatePlayer(_) => "duplicate_player",
            Self::InvalidPlayer(_) => "invalid_player",
            Self::AlreadyExists(_) => "already_exists",
            Self::Upstream(_) => "upstream_failure",
            Self::Malformed(_) => "malformed_request",
        }
    }
}
