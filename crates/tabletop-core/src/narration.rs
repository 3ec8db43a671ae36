//! Narration collaborator abstraction.

use async_trait::async_trait;

use crate::error::DomainError;

/// Opaque text-completion service: a prompt goes in, narration comes out.
///
/// Implementations are not expected to bound their own latency; callers wrap
/// them with a timeout.
#[async_trait]
pub trait Narrator: Send + Sync {
    /// Produce narration text for the given prompt.
    async fn narrate(&self, prompt: &str) -> Result<String, DomainError>;
}

/// Narrator used when no narration service is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledNarrator;

#[async_trait]
impl Narrator for DisabledNarrator {
    async fn narrate(&self, _prompt: &str) -> Result<String, DomainError> {
        Err(DomainError::Upstream(
            "narration service is not configured".into(),
        ))
    }
}
