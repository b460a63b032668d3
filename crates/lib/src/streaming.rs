//! # Streaming Session
//!
//! Drives the query flow over a bidirectional event channel: progress
//! events out, a single `start` request in. Modeled as a plain
//! `tokio::sync::mpsc` channel rather than a WebSocket abstraction, since
//! transport (WebSocket framing, HTTP upgrade) is the server crate's
//! concern, not the core's.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;
use futures::StreamExt;
use tokio::sync::mpsc::Sender;
use tracing::{info, warn};
use uuid::Uuid;

use crate::ai::ChatModelProvider;
use crate::config::{estimate_tokens, RagConfig};
use crate::embedding::Embedder;
use crate::errors::CoreError;
use crate::memory::MemoryManager;
use crate::models::{Conversation, Message, MessageMetadata, MessageRole, SourceAttribution};
use crate::prompt::{build_context_messages, preview_content};
use crate::store::RelationalStore;
use crate::vector_store::{SearchHit, VectorStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Validating,
    Conversation,
    Memory,
    Embedding,
    Search,
    Generating,
    Saving,
    Completed,
}

impl Stage {
    fn as_str(self) -> &'static str {
        match self {
            Stage::Validating => "validating",
            Stage::Conversation => "conversation",
            Stage::Memory => "memory",
            Stage::Embedding => "embedding",
            Stage::Search => "search",
            Stage::Generating => "generating",
            Stage::Saving => "saving",
            Stage::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone)]
pub enum StreamEvent {
    Status {
        stage: &'static str,
        message: String,
    },
    ConversationCreated {
        id: String,
        title: String,
    },
    UserMessage {
        id: String,
        content: String,
    },
    StreamStart {
        sources_preview: Vec<String>,
    },
    StreamChunk {
        content: String,
        full_content: String,
    },
    StreamComplete {
        message_id: String,
        content: String,
        tokens_used: u32,
        sources: Vec<SourceAttribution>,
    },
    Error {
        message: String,
    },
}

#[derive(Debug, Clone)]
pub struct StartRequest {
    pub project_id: String,
    pub owner_id: String,
    pub message: String,
    pub conversation_id: Option<String>,
}

/// External hook verifying the caller owns `project_id`;
/// authentication/authorization live entirely outside the core.
#[async_trait]
pub trait OwnershipHook: Send + Sync {
    async fn verify(&self, project_id: &str, owner_id: &str) -> Result<(), CoreError>;
}

pub struct StreamingSession {
    store: Arc<dyn RelationalStore>,
    embedder: Arc<dyn Embedder>,
    vector_store: Arc<dyn VectorStore>,
    chat: Arc<dyn ChatModelProvider>,
    memory: Arc<MemoryManager>,
    ownership: Arc<dyn OwnershipHook>,
    config: RagConfig,
}

impl StreamingSession {
    pub fn new(
        store: Arc<dyn RelationalStore>,
        embedder: Arc<dyn Embedder>,
        vector_store: Arc<dyn VectorStore>,
        chat: Arc<dyn ChatModelProvider>,
        memory: Arc<MemoryManager>,
        ownership: Arc<dyn OwnershipHook>,
        config: RagConfig,
    ) -> Self {
        Self {
            store,
            embedder,
            vector_store,
            chat,
            memory,
            ownership,
            config,
        }
    }

    /// Runs one `start` flow to completion, emitting events on `events`
    /// as each stage finishes. Returns `Ok(())` once `stream_complete` (or
    /// a terminal `error`) has been sent; a disconnected channel
    /// (`events.send` failing) aborts mid-flow with no assistant message
    /// persisted.
    pub async fn start(&self, request: StartRequest, events: Sender<StreamEvent>) -> Result<(), CoreError> {
        match self.run(request, &events).await {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!(error = %e, "streaming session failed");
                let _ = events
                    .send(StreamEvent::Error {
                        message: e.to_string(),
                    })
                    .await;
                Err(e)
            }
        }
    }

    async fn run(&self, request: StartRequest, events: &Sender<StreamEvent>) -> Result<(), CoreError> {
        self.emit(events, Stage::Validating, "Verifying project access").await?;
        self.ownership.verify(&request.project_id, &request.owner_id).await?;

        self.emit(events, Stage::Conversation, "Preparing conversation").await?;
        let conversation_id = match &request.conversation_id {
            Some(id) => id.clone(),
            None => {
                let id = Uuid::new_v4().to_string();
                let title = conversation_title(&request.message);
                self.store
                    .create_conversation(&Conversation {
                        id: id.clone(),
                        project_id: request.project_id.clone(),
                        title: Some(title.clone()),
                    })
                    .await?;
                self.send(events, StreamEvent::ConversationCreated { id: id.clone(), title })
                    .await?;
                id
            }
        };

        let user_message = Message {
            id: Uuid::new_v4().to_string(),
            conversation_id: conversation_id.clone(),
            role: MessageRole::User,
            content: request.message.clone(),
            created_at: Utc::now(),
            metadata: None,
        };
        self.store.append_message(&user_message).await?;
        self.send(
            events,
            StreamEvent::UserMessage {
                id: user_message.id.clone(),
                content: user_message.content.clone(),
            },
        )
        .await?;

        self.emit(events, Stage::Memory, "Assembling conversation memory").await?;
        let memory_messages = self.memory.build_context(&conversation_id).await?;

        self.emit(events, Stage::Embedding, "Embedding query").await?;
        let project = self.store.get_project(&request.project_id).await?;
        if project.collection_handle.is_none() {
            return Err(CoreError::NotIndexed);
        }
        let query_vector = self.embedder.embed_query(&request.message).await?;

        self.emit(events, Stage::Search, "Searching indexed documents").await?;
        let hits = self
            .vector_store
            .search(
                &request.project_id,
                &query_vector,
                self.config.max_chunks,
                self.config.similarity_threshold,
            )
            .await?;

        self.emit(events, Stage::Generating, "Generating response").await?;
        let previews = hits.iter().map(|h| preview_content(&h.content)).collect();
        self.send(events, StreamEvent::StreamStart { sources_preview: previews }).await?;

        let messages = build_context_messages(&hits, &request.message, &memory_messages);
        let started = Instant::now();
        let mut token_stream = self.chat.stream(&messages, self.config.max_tokens).await?;

        let mut accumulated = String::new();
        while let Some(chunk) = token_stream.next().await {
            let chunk = chunk?;
            accumulated.push_str(&chunk);
            self.send(
                events,
                StreamEvent::StreamChunk {
                    content: chunk,
                    full_content: accumulated.clone(),
                },
            )
            .await?;
        }

        if accumulated.trim().is_empty() {
            return Err(CoreError::ModelReturnedEmpty);
        }

        self.emit(events, Stage::Saving, "Saving response").await?;
        let sources = attribute_sources(&self.store, &hits).await?;
        let tokens_used = estimate_tokens(&accumulated) as u32;
        let elapsed = started.elapsed();

        let assistant_message = Message {
            id: Uuid::new_v4().to_string(),
            conversation_id: conversation_id.clone(),
            role: MessageRole::Assistant,
            content: accumulated.clone(),
            created_at: Utc::now(),
            metadata: Some(MessageMetadata {
                tokens_used,
                sources: sources.clone(),
            }),
        };
        self.store.append_message(&assistant_message).await?;

        self.send(
            events,
            StreamEvent::StreamComplete {
                message_id: assistant_message.id,
                content: accumulated,
                tokens_used,
                sources,
            },
        )
        .await?;

        info!(conversation_id, elapsed_ms = elapsed.as_millis() as u64, "streaming session completed");
        self.emit(events, Stage::Completed, "Done").await?;
        Ok(())
    }

    async fn emit(&self, events: &Sender<StreamEvent>, stage: Stage, message: &str) -> Result<(), CoreError> {
        self.send(
            events,
            StreamEvent::Status {
                stage: stage.as_str(),
                message: message.to_string(),
            },
        )
        .await
    }

    async fn send(&self, events: &Sender<StreamEvent>, event: StreamEvent) -> Result<(), CoreError> {
        events.send(event).await.map_err(|_| CoreError::Cancelled)
    }
}

fn conversation_title(message: &str) -> String {
    let chars: Vec<char> = message.chars().collect();
    let prefix: String = chars.iter().take(50).collect();
    format!("Chat: {prefix}...")
}

async fn attribute_sources(
    store: &Arc<dyn RelationalStore>,
    hits: &[SearchHit],
) -> Result<Vec<SourceAttribution>, CoreError> {
    let mut sources = Vec::with_capacity(hits.len());
    for hit in hits {
        let document = store.get_document(&hit.document_id).await?;
        sources.push(SourceAttribution {
            document_id: hit.document_id.clone(),
            filename: document.filename,
            content_preview: preview_content(&hit.content),
            score: hit.score,
            chunk_index: hit.chunk_index as u32,
        });
    }
    Ok(sources)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversation_title_truncates_to_fifty_chars_with_ellipsis() {
        let long_message = "a".repeat(80);
        let title = conversation_title(&long_message);
        assert_eq!(title, format!("Chat: {}...", "a".repeat(50)));
    }

    #[test]
    fn conversation_title_keeps_short_message_whole() {
        assert_eq!(conversation_title("hi"), "Chat: hi...");
    }

    #[test]
    fn stage_as_str_matches_protocol_names() {
        assert_eq!(Stage::Validating.as_str(), "validating");
        assert_eq!(Stage::Completed.as_str(), "completed");
    }
}
