//! Calling the narration collaborator with a bounded wait.

use std::time::Duration;

use tabletop_core::error::DomainError;
use tabletop_core::narration::Narrator;
use tracing::{instrument, warn};

/// Asks the narrator for text, giving up after `limit`.
///
/// This runs before a host action reaches the coordinator, so a slow
/// narrator never holds a session's request queue.
///
/// # Errors
///
/// - `Malformed` if the prompt is blank.
/// - `Upstream` if the narrator fails, returns blank text, or does not
///   answer within `limit`.
#[instrument(skip(narrator, prompt), fields(prompt_len = prompt.len()))]
pub async fn narrate_with_timeout(
    narrator: &dyn Narrator,
    prompt: &str,
    limit: Duration,
) -> Result<String, DomainError> {
    if prompt.trim().is_empty() {
        return Err(DomainError::Malformed("prompt must not be empty".into()));
    }

    let text = tokio::time::timeout(limit, narrator.narrate(prompt))
        .await
        .map_err(|_| {
            warn!(timeout = ?limit, "narration timed out");
            DomainError::Upstream(format!(
                "narration timed out after {}ms",
                limit.as_millis()
            ))
        })??;

    if text.trim().is_empty() {
        return Err(DomainError::Upstream("narrator returned no text".into()));
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabletop_core::narration::DisabledNarrator;
    use tabletop_test_support::{StalledNarrator, StubNarrator};

    #[tokio::test]
    async fn test_returns_narrator_text() {
        let narrator = StubNarrator::new("The door creaks open.");

        let text = narrate_with_timeout(&narrator, "open the door", Duration::from_secs(1))
            .await
            .unwrap();

        assert_eq!(text, "The door creaks open.");
        assert_eq!(narrator.prompts(), ["open the door"]);
    }

    #[tokio::test]
    async fn test_stalled_narrator_times_out_as_upstream_failure() {
        let result =
            narrate_with_timeout(&StalledNarrator, "anything", Duration::from_millis(20)).await;

        match result {
            Err(DomainError::Upstream(message)) => assert!(message.contains("timed out")),
            other => panic!("expected Upstream, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_blank_prompt_is_malformed() {
        let narrator = StubNarrator::new("unused");

        let result = narrate_with_timeout(&narrator, "   ", Duration::from_secs(1)).await;

        assert!(matches!(result, Err(DomainError::Malformed(_))));
        assert!(narrator.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_disabled_narrator_is_upstream_failure() {
        let result = narrate_with_timeout(&DisabledNarrator, "hello", Duration::from_secs(1)).await;

        assert!(matches!(result, Err(DomainError::Upstream(_))));
    }
}
