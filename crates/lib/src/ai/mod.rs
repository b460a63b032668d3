//! # Chat Model Provider
//!
//! A single `complete`/`stream` trait over a chat-completion backend,
//! supporting both a one-shot call and token-by-token streaming, which the
//! Streaming Session needs to emit `stream_chunk` events as they arrive
//! instead of buffering a whole completion. The OpenAI-compatible request
//! shape and bearer-auth wiring mirror a typical `LocalAiProvider`-style
//! client; only a single provider variant is supported here.

use async_trait::async_trait;
use futures::stream::{Stream, StreamExt};
use reqwest::Client as ReqwestClient;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use tracing::debug;

use crate::errors::CoreError;

pub type ChatStream = Pin<Box<dyn Stream<Item = Result<String, CoreError>> + Send>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

impl ChatRole {
    fn as_str(self) -> &'static str {
        match self {
            ChatRole::System => "system",
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// A chat-completion backend for the RAG Query Engine and File Generator.
/// Rate limiting, key rotation, and provider fallback are external
/// collaborator concerns.
#[async_trait]
pub trait ChatModelProvider: Send + Sync {
    async fn complete(&self, messages: &[ChatMessage], max_tokens: u32) -> Result<String, CoreError>;
    async fn stream(&self, messages: &[ChatMessage], max_tokens: u32) -> Result<ChatStream, CoreError>;
}

#[derive(Serialize, Debug)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage>,
    max_tokens: u32,
    temperature: f32,
    stream: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
struct WireMessage {
    role: String,
    content: String,
}

#[derive(Deserialize, Debug)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize, Debug)]
struct ChatChoice {
    message: WireMessage,
}

#[derive(Deserialize, Debug)]
struct ChatStreamChunk {
    choices: Vec<ChatStreamChoice>,
}

#[derive(Deserialize, Debug)]
struct ChatStreamChoice {
    delta: ChatStreamDelta,
}

#[derive(Deserialize, Debug, Default)]
struct ChatStreamDelta {
    content: Option<String>,
}

pub struct OpenAiChatProvider {
    client: ReqwestClient,
    api_url: String,
    model: String,
    api_key: Option<String>,
}

impl OpenAiChatProvider {
    pub fn new(api_url: impl Into<String>, model: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: ReqwestClient::new(),
            api_url: api_url.into(),
            model: model.into(),
            api_key,
        }
    }

    fn wire_messages(messages: &[ChatMessage]) -> Vec<WireMessage> {
        messages
            .iter()
            .map(|m| WireMessage {
                role: m.role.as_str().to_string(),
                content: m.content.clone(),
            })
            .collect()
    }
}

#[async_trait]
impl ChatModelProvider for OpenAiChatProvider {
    async fn complete(&self, messages: &[ChatMessage], max_tokens: u32) -> Result<String, CoreError> {
        let body = ChatRequest {
            model: &self.model,
            messages: Self::wire_messages(messages),
            max_tokens,
            temperature: 0.2,
            stream: false,
        };

        debug!(payload = ?body, "--> sending chat completion request");
        let mut request = self.client.post(&self.api_url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| CoreError::Internal(e.into()))?;
        if !response.status().is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(CoreError::Internal(anyhow::anyhow!("chat completion failed: {text}")));
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| CoreError::Internal(e.into()))?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .filter(|s| !s.is_empty())
            .ok_or(CoreError::ModelReturnedEmpty)
    }

    async fn stream(&self, messages: &[ChatMessage], max_tokens: u32) -> Result<ChatStream, CoreError> {
        let body = ChatRequest {
            model: &self.model,
            messages: Self::wire_messages(messages),
            max_tokens,
            temperature: 0.2,
            stream: true,
        };

        let mut request = self.client.post(&self.api_url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| CoreError::Internal(e.into()))?;
        if !response.status().is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(CoreError::Internal(anyhow::anyhow!("chat stream failed: {text}")));
        }

        let byte_stream = response.bytes_stream();
        let parsed = byte_stream.flat_map(|chunk| {
            let lines: Vec<Result<String, CoreError>> = match chunk {
                Ok(bytes) => parse_sse_chunk(&bytes),
                Err(e) => vec![Err(CoreError::Internal(e.into()))],
            };
            futures::stream::iter(lines)
        });

        Ok(Box::pin(parsed))
    }
}

/// Parses one SSE frame of an OpenAI-compatible streaming response: each
/// `data: {...}` line carries a JSON delta, terminated by `data: [DONE]`.
fn parse_sse_chunk(bytes: &[u8]) -> Vec<Result<String, CoreError>> {
    let text = String::from_utf8_lossy(bytes);
    let mut out = Vec::new();

    for line in text.lines() {
        let Some(payload) = line.strip_prefix("data: ") else {
            continue;
        };
        if payload == "[DONE]" {
            continue;
        }
        match serde_json::from_str::<ChatStreamChunk>(payload) {
            Ok(parsed) => {
                for choice in parsed.choices {
                    if let Some(content) = choice.delta.content {
                        if !content.is_empty() {
                            out.push(Ok(content));
                        }
                    }
                }
            }
            Err(e) => out.push(Err(CoreError::Internal(anyhow::anyhow!("bad stream chunk: {e}")))),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_content_delta_from_sse_line() {
        let frame = b"data: {\"choices\":[{\"delta\":{\"content\":\"hel\"}}]}\n\n";
        let results = parse_sse_chunk(frame);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].as_ref().unwrap(), "hel");
    }

    #[test]
    fn done_marker_produces_no_output() {
        let frame = b"data: [DONE]\n\n";
        assert!(parse_sse_chunk(frame).is_empty());
    }

    #[test]
    fn empty_delta_is_skipped() {
        let frame = b"data: {\"choices\":[{\"delta\":{}}]}\n\n";
        assert!(parse_sse_chunk(frame).is_empty());
    }
}
