//! Checkpoint store abstraction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::DomainError;

/// Durable serialized copy of one coordinator's state.
#[derive(Debug, Clone, PartialEq)]
pub struct Checkpoint {
    /// Internal identity of the coordinator that owns the state.
    pub session_id: Uuid,
    /// Public invite code; unique across all checkpoints.
    pub invite_code: String,
    /// Serialized session state.
    pub state: serde_json::Value,
    /// Time of the mutation that produced this checkpoint.
    pub updated_at: DateTime<Utc>,
}

/// Durable key-value store for coordinator checkpoints, keyed by session id.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Load the checkpoint for a session, if one has been written.
    async fn load(&self, session_id: Uuid) -> Result<Option<Checkpoint>, DomainError>;

    /// Write the first checkpoint of a session.
    ///
    /// Fails with `DomainError::AlreadyExists` when either the session id or
    /// the invite code is already present; an existing checkpoint is never
    /// overwritten by this call.
    async fn create(&self, checkpoint: &Checkpoint) -> Result<(), DomainError>;

    /// Replace the checkpoint of a session.
    async fn save(&self, checkpoint: &Checkpoint) -> Result<(), DomainError>;
}
