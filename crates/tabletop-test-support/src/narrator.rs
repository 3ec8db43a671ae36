//! Test narrators — canned and never-answering `Narrator` implementations.

use std::sync::Mutex;

use async_trait::async_trait;
use tabletop_core::error::DomainError;
use tabletop_core::narration::Narrator;

/// A narrator that answers every prompt with the same text and records the
/// prompts it received.
#[derive(Debug)]
pub struct StubNarrator {
    reply: String,
    prompts: Mutex<Vec<String>>,
}

impl StubNarrator {
    /// Create a narrator that always replies with `reply`.
    #[must_use]
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Returns every prompt received so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Narrator for StubNarrator {
    async fn narrate(&self, prompt: &str) -> Result<String, DomainError> {
        self.prompts.lock().unwrap().push(prompt.to_owned());
        Ok(self.reply.clone())
    }
}

/// A narrator that never answers. Used to exercise caller-side timeouts.
#[derive(Debug)]
pub struct StalledNarrator;

#[async_trait]
impl Narrator for StalledNarrator {
    async fn narrate(&self, _prompt: &str) -> Result<String, DomainError> {
        std::future::pending::<()>().await;
        unreachable!("pending future never resolves")
    }
}
