//! # Embedder
//!
//! Wraps an OpenAI-compatible embeddings endpoint behind a trait so the
//! ingestion/query paths never depend on a concrete HTTP client. Only a
//! single provider variant is supported, with a bounded retry/backoff
//! policy on top of the plain request/response wiring.

use async_trait::async_trait;
use reqwest::Client as ReqwestClient;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::errors::CoreError;

/// Generates embeddings for document chunks and user queries.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, CoreError>;

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, CoreError> {
        let mut out = self.embed_batch(std::slice::from_ref(&text.to_string())).await?;
        out.pop().ok_or(CoreError::ModelReturnedEmpty)
    }
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub backoff_factor: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_secs(1),
            backoff_factor: 2,
        }
    }
}

#[derive(Serialize, Debug)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize, Debug)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Deserialize, Debug)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
}

/// OpenAI-compatible embeddings client with bounded retry on transient
/// failures (network errors, 429, 5xx). Non-retryable failures (4xx other
/// than 429) fail immediately.
pub struct OpenAiEmbedder {
    client: ReqwestClient,
    api_url: String,
    model: String,
    api_key: Option<String>,
    retry: RetryPolicy,
}

impl OpenAiEmbedder {
    pub fn new(api_url: impl Into<String>, model: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: ReqwestClient::new(),
            api_url: api_url.into(),
            model: model.into(),
            api_key,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn call(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, CoreError> {
        let body = EmbeddingRequest {
            model: &self.model,
            input: inputs,
        };

        let mut request = self.client.post(&self.api_url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| CoreError::EmbeddingUnavailable(e.to_string()))?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();

        if status.as_u16() == 429 || status.is_server_error() {
            return Err(CoreError::EmbeddingUnavailable(format!(
                "transient failure ({status}): {text}"
            )));
        }
        if !status.is_success() {
            return Err(CoreError::EmbeddingUnavailable(format!(
                "request rejected ({status}): {text}"
            )));
        }

        let parsed: EmbeddingResponse = serde_json::from_str(&text)
            .map_err(|e| CoreError::EmbeddingUnavailable(format!("bad response body: {e}")))?;

        if parsed.data.is_empty() {
            return Err(CoreError::ModelReturnedEmpty);
        }

        Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, CoreError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut attempt = 0;
        let mut backoff = self.retry.initial_backoff;

        loop {
            attempt += 1;
            debug!(attempt, batch_size = texts.len(), "requesting embeddings");
            match self.call(texts).await {
                Ok(vectors) => return Ok(vectors),
                Err(CoreError::EmbeddingUnavailable(msg)) if attempt < self.retry.max_attempts => {
                    warn!(attempt, %msg, "embedding call failed, retrying");
                    tokio::time::sleep(backoff).await;
                    backoff *= self.retry.backoff_factor;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedEmbedder(Vec<f32>);

    #[async_trait]
    impl Embedder for FixedEmbedder {
        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, CoreError> {
            Ok(texts.iter().map(|_| self.0.clone()).collect())
        }
    }

    #[tokio::test]
    async fn embed_query_delegates_to_embed_batch() {
        let embedder = FixedEmbedder(vec![0.1, 0.2, 0.3]);
        let vector = embedder.embed_query("hello").await.unwrap();
        assert_eq!(vector, vec![0.1, 0.2, 0.3]);
    }

    #[tokio::test]
    async fn empty_batch_short_circuits() {
        let embedder = OpenAiEmbedder::new("http://unused.invalid", "test-model", None);
        let result = embedder.embed_batch(&[]).await.unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn default_retry_policy_matches_spec() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.initial_backoff, Duration::from_secs(1));
        assert_eq!(policy.backoff_factor, 2);
    }
}
