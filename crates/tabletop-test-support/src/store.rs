//! Test stores — in-memory `StateStore` implementations for tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tabletop_core::error::DomainError;
use tabletop_core::store::{Checkpoint, StateStore};
use uuid::Uuid;

/// A store that keeps checkpoints in a map and enforces the same uniqueness
/// rules as the `PostgreSQL` store: one checkpoint per session id and one
/// session per invite code.
#[derive(Debug, Default)]
pub struct InMemoryStateStore {
    checkpoints: Mutex<HashMap<Uuid, Checkpoint>>,
    loads: Mutex<usize>,
}

impl InMemoryStateStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with checkpoints, as after a restart.
    #[must_use]
    pub fn with_checkpoints(checkpoints: impl IntoIterator<Item = Checkpoint>) -> Self {
        let store = Self::new();
        {
            let mut map = store.checkpoints.lock().unwrap();
            for checkpoint in checkpoints {
                map.insert(checkpoint.session_id, checkpoint);
            }
        }
        store
    }

    /// Returns the stored checkpoint for a session.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn checkpoint(&self, session_id: Uuid) -> Option<Checkpoint> {
        self.checkpoints.lock().unwrap().get(&session_id).cloned()
    }

    /// Number of `load` calls served so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn load_count(&self) -> usize {
        *self.loads.lock().unwrap()
    }
}

#[async_trait]
impl StateStore for InMemoryStateStore {
    async fn load(&self, session_id: Uuid) -> Result<Option<Checkpoint>, DomainError> {
        *self.loads.lock().unwrap() += 1;
        Ok(self.checkpoints.lock().unwrap().get(&session_id).cloned())
    }

    async fn create(&self, checkpoint: &Checkpoint) -> Result<(), DomainError> {
        let mut map = self.checkpoints.lock().unwrap();
        let taken = map.values().any(|existing| {
            existing.session_id == checkpoint.session_id
                || existing.invite_code == checkpoint.invite_code
        });
        if taken {
            return Err(DomainError::AlreadyExists(format!(
                "invite code {}",
                checkpoint.invite_code
            )));
        }
        map.insert(checkpoint.session_id, checkpoint.clone());
        Ok(())
    }

    async fn save(&self, checkpoint: &Checkpoint) -> Result<(), DomainError> {
        self.checkpoints
            .lock()
            .unwrap()
            .insert(checkpoint.session_id, checkpoint.clone());
        Ok(())
    }
}

/// A store that records every write and can be switched into a failing mode
/// part-way through a test.
#[derive(Debug, Default)]
pub struct RecordingStateStore {
    inner: InMemoryStateStore,
    writes: Mutex<Vec<Checkpoint>>,
    fail_writes: Mutex<bool>,
}

impl RecordingStateStore {
    /// Create an empty recording store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `create`/`save` fail with an upstream error.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn fail_writes(&self) {
        *self.fail_writes.lock().unwrap() = true;
    }

    /// Returns a snapshot of all successful writes, in order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn writes(&self) -> Vec<Checkpoint> {
        self.writes.lock().unwrap().clone()
    }

    /// Returns the most recent successful write.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn last_write(&self) -> Option<Checkpoint> {
        self.writes.lock().unwrap().last().cloned()
    }

    /// Number of `load` calls served so far.
    pub fn load_count(&self) -> usize {
        self.inner.load_count()
    }

    fn check_writable(&self) -> Result<(), DomainError> {
        if *self.fail_writes.lock().unwrap() {
            return Err(DomainError::Upstream("connection refused".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl StateStore for RecordingStateStore {
    async fn load(&self, session_id: Uuid) -> Result<Option<Checkpoint>, DomainError> {
        self.inner.load(session_id).await
    }

    async fn create(&self, checkpoint: &Checkpoint) -> Result<(), DomainError> {
        self.check_writable()?;
        self.inner.create(checkpoint).await?;
        self.writes.lock().unwrap().push(checkpoint.clone());
        Ok(())
    }

    async fn save(&self, checkpoint: &Checkpoint) -> Result<(), DomainError> {
        self.check_writable()?;
        self.inner.save(checkpoint).await?;
        self.writes.lock().unwrap().push(checkpoint.clone());
        Ok(())
    }
}

/// A store that always returns an upstream error. Useful for testing
/// error-handling paths.
#[derive(Debug)]
pub struct FailingStateStore;

#[async_trait]
impl StateStore for FailingStateStore {
    async fn load(&self, _session_id: Uuid) -> Result<Option<Checkpoint>, DomainError> {
        Err(DomainError::Upstream("connection refused".into()))
    }

    async fn create(&self, _checkpoint: &Checkpoint) -> Result<(), DomainError> {
        Err(DomainError::Upstream("connection refused".into()))
    }

    async fn save(&self, _checkpoint: &Checkpoint) -> Result<(), DomainError> {
        Err(DomainError::Upstream("connection refused".into()))
    }
}
