//! HTTP client for the narration service.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tabletop_core::error::DomainError;
use tabletop_core::narration::Narrator;
use tracing::{debug, instrument};

#[derive(Debug, Serialize)]
struct NarrationRequest<'a> {
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct NarrationResponse {
    text: String,
}

/// Narrator that POSTs `{"prompt": ...}` and reads `{"text": ...}` back.
#[derive(Debug, Clone)]
pub struct HttpNarrator {
    client: reqwest::Client,
    url: String,
}

impl HttpNarrator {
    /// Creates a narrator for the given endpoint.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl Narrator for HttpNarrator {
    #[instrument(skip(self, prompt), fields(url = %self.url))]
    async fn narrate(&self, prompt: &str) -> Result<String, DomainError> {
        let response = self
            .client
            .post(&self.url)
            .json(&NarrationRequest { prompt })
            .send()
            .await
            .map_err(|e| DomainError::Upstream(format!("narration request failed: {e}")))?
            .error_for_status()
            .map_err(|e| DomainError::Upstream(format!("narration service error: {e}")))?;

        let body: NarrationResponse = response
            .json()
            .await
            .map_err(|e| DomainError::Upstream(format!("unreadable narration response: {e}")))?;

        debug!(text_len = body.text.len(), "narration received");
        Ok(body.text)
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{Value, json};

    use super::*;

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}/narrate")
    }

    #[tokio::test]
    async fn test_narrate_posts_prompt_and_returns_text() {
        // Arrange
        let router = Router::new().route(
            "/narrate",
            post(|Json(body): Json<Value>| async move {
                Json(json!({ "text": format!("echo: {}", body["prompt"].as_str().unwrap()) }))
            }),
        );
        let narrator = HttpNarrator::new(serve(router).await);

        // Act
        let text = narrator.narrate("the door creaks").await.unwrap();

        // Assert
        assert_eq!(text, "echo: the door creaks");
    }

    #[tokio::test]
    async fn test_error_status_is_upstream_failure() {
        let router = Router::new().route(
            "/narrate",
            post(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
        );
        let narrator = HttpNarrator::new(serve(router).await);

        let err = narrator.narrate("anything").await.unwrap_err();

        assert_eq!(err.kind(), "upstream_failure");
    }

    #[tokio::test]
    async fn test_unexpected_body_is_upstream_failure() {
        let router = Router::new().route(
            "/narrate",
            post(|| async { Json(json!({ "unexpected": true })) }),
        );
        let narrator = HttpNarrator::new(serve(router).await);

        let err = narrator.narrate("anything").await.unwrap_err();

        assert!(matches!(err, DomainError::Upstream(_)));
    }
}
