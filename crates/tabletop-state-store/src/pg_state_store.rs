//! `PostgreSQL` implementation of the `StateStore` trait.

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use tracing::{debug, instrument};
use uuid::Uuid;

use tabletop_core::error::DomainError;
use tabletop_core::store::{Checkpoint, StateStore};

const SELECT_CHECKPOINT: &str = r"
SELECT session_id, invite_code, state, updated_at
FROM session_checkpoints
WHERE session_id = $1
";

const INSERT_CHECKPOINT: &str = r"
INSERT INTO session_checkpoints (session_id, invite_code, state, updated_at)
VALUES ($1, $2, $3, $4)
";

const UPSERT_CHECKPOINT: &str = r"
INSERT INTO session_checkpoints (session_id, invite_code, state, updated_at)
VALUES ($1, $2, $3, $4)
ON CONFLICT (session_id)
DO UPDATE SET state = EXCLUDED.state, updated_at = EXCLUDED.updated_at
";

/// PostgreSQL-backed checkpoint store.
#[derive(Debug, Clone)]
pub struct PgStateStore {
    pool: PgPool,
}

impl PgStateStore {
    /// Creates a new `PgStateStore`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn write(&self, sql: &str, checkpoint: &Checkpoint) -> Result<(), DomainError> {
        sqlx::query(sql)
            .bind(checkpoint.session_id)
            .bind(&checkpoint.invite_code)
            .bind(&checkpoint.state)
            .bind(checkpoint.updated_at)
            .execute(&self.pool)
            .await
            .map_err(|e| map_write_error(e, checkpoint))?;
        Ok(())
    }
}

fn map_write_error(err: sqlx::Error, checkpoint: &Checkpoint) -> DomainError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => DomainError::AlreadyExists(
            format!("invite code {}", checkpoint.invite_code),
        ),
        _ => DomainError::Upstream(format!("checkpoint write failed: {err}")),
    }
}

#[async_trait]
impl StateStore for PgStateStore {
    #[instrument(skip(self))]
    async fn load(&self, session_id: Uuid) -> Result<Option<Checkpoint>, DomainError> {
        let row = sqlx::query(SELECT_CHECKPOINT)
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::Upstream(format!("checkpoint load failed: {e}")))?;

        let Some(row) = row else {
            debug!("no checkpoint");
            return Ok(None);
        };

        let decode = |e: sqlx::Error| DomainError::Upstream(format!("checkpoint decode failed: {e}"));
        Ok(Some(Checkpoint {
            session_id: row.try_get("session_id").map_err(decode)?,
            invite_code: row.try_get("invite_code").map_err(decode)?,
            state: row.try_get("state").map_err(decode)?,
            updated_at: row.try_get("updated_at").map_err(decode)?,
        }))
    }

    #[instrument(skip(self, checkpoint), fields(session_id = %checkpoint.session_id, invite_code = %checkpoint.invite_code))]
    async fn create(&self, checkpoint: &Checkpoint) -> Result<(), DomainError> {
        self.write(INSERT_CHECKPOINT, checkpoint).await
    }

    #[instrument(skip(self, checkpoint), fields(session_id = %checkpoint.session_id))]
    async fn save(&self, checkpoint: &Checkpoint) -> Result<(), DomainError> {
        self.write(UPSERT_CHECKPOINT, checkpoint).await
    }
}
