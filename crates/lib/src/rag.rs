//! # RAG Query Engine
//!
//! Answers a user query against a project's indexed chunks: embed the
//! query, retrieve, assemble a context-bounded prompt (optionally
//! folding in Memory Manager output), invoke the chat model, and
//! attribute sources back to their originating documents.

use std::sync::Arc;

use crate::ai::{ChatMessage, ChatModelProvider};
use crate::config::{estimate_tokens, RagConfig};
use crate::embedding::Embedder;
use crate::errors::CoreError;
use crate::memory::MemoryManager;
use crate::models::SourceAttribution;
use crate::prompt::{build_context_messages, preview_content};
use crate::store::RelationalStore;
use crate::vector_store::{SearchHit, VectorStore};

const NO_CONTEXT_MESSAGE: &str =
    "Desculpe, não encontrei informações relevantes nos documentos indexados para responder a essa pergunta.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EducationalQueryType {
    Question,
    Summary,
    Quiz,
    Explanation,
}

#[derive(Debug, Clone)]
pub struct QueryResult {
    pub answer: String,
    pub sources: Vec<SourceAttribution>,
    pub tokens_used: u32,
}

pub struct RagQueryEngine {
    store: Arc<dyn RelationalStore>,
    embedder: Arc<dyn Embedder>,
    vector_store: Arc<dyn VectorStore>,
    chat: Arc<dyn ChatModelProvider>,
    memory: Arc<MemoryManager>,
    config: RagConfig,
}

impl RagQueryEngine {
    pub fn new(
        store: Arc<dyn RelationalStore>,
        embedder: Arc<dyn Embedder>,
        vector_store: Arc<dyn VectorStore>,
        chat: Arc<dyn ChatModelProvider>,
        memory: Arc<MemoryManager>,
        config: RagConfig,
    ) -> Self {
        Self {
            store,
            embedder,
            vector_store,
            chat,
            memory,
            config,
        }
    }

    /// Stateless query.
    pub async fn query(&self, project_id: &str, text: &str) -> Result<QueryResult, CoreError> {
        let hits = self.retrieve(project_id, text).await?;

        if hits.is_empty() {
            return Ok(QueryResult {
                answer: NO_CONTEXT_MESSAGE.to_string(),
                sources: Vec::new(),
                tokens_used: 0,
            });
        }

        let messages = build_context_messages(&hits, text, &[]);
        self.generate(&messages, &hits).await
    }

    /// Conversation-aware query.
    pub async fn query_with_memory(
        &self,
        project_id: &str,
        text: &str,
        conversation_id: &str,
    ) -> Result<QueryResult, CoreError> {
        let memory_messages = self.memory.build_context(conversation_id).await?;
        let hits = self.retrieve(project_id, text).await?;

        if hits.is_empty() {
            let mut messages = memory_messages;
            messages.push(ChatMessage::user(text));
            return self.generate(&messages, &[]).await;
        }

        let messages = build_context_messages(&hits, text, &memory_messages);
        self.generate(&messages, &hits).await
    }

    /// Rewrites the query with a type-specific prefix, then dispatches to
    /// `query` or `query_with_memory`.
    pub async fn educational_query(
        &self,
        project_id: &str,
        text: &str,
        query_type: EducationalQueryType,
        conversation_id: Option<&str>,
    ) -> Result<QueryResult, CoreError> {
        let rewritten = match query_type {
            EducationalQueryType::Summary => format!("Por favor, faça um resumo detalhado sobre: {text}"),
            EducationalQueryType::Quiz => {
                format!("Crie questões de múltipla escolha com 4 alternativas sobre: {text}")
            }
            EducationalQueryType::Explanation => {
                format!("Explique detalhadamente o conceito e forneça exemplos práticos sobre: {text}")
            }
            EducationalQueryType::Question => text.to_string(),
        };

        match conversation_id {
            Some(conversation_id) => self.query_with_memory(project_id, &rewritten, conversation_id).await,
            None => self.query(project_id, &rewritten).await,
        }
    }

    async fn retrieve(&self, project_id: &str, text: &str) -> Result<Vec<SearchHit>, CoreError> {
        let project = self.store.get_project(project_id).await?;
        if project.collection_handle.is_none() {
            return Err(CoreError::NotIndexed);
        }

        let query_vector = self.embedder.embed_query(text).await?;
        self.vector_store
            .search(project_id, &query_vector, self.config.max_chunks, self.config.similarity_threshold)
            .await
    }

    async fn generate(&self, messages: &[ChatMessage], hits: &[SearchHit]) -> Result<QueryResult, CoreError> {
        let answer = self.chat.complete(messages, self.config.max_tokens).await?;
        if answer.trim().is_empty() {
            return Err(CoreError::ModelReturnedEmpty);
        }

        let prompt_tokens: usize = messages.iter().map(|m| estimate_tokens(&m.content)).sum();
        let tokens_used = (prompt_tokens + estimate_tokens(&answer)) as u32;

        let sources = self.attribute_sources(hits).await?;

        Ok(QueryResult {
            answer,
            sources,
            tokens_used,
        })
    }

    /// Builds the source list in retrieval (rank) order.
    async fn attribute_sources(&self, hits: &[SearchHit]) -> Result<Vec<SourceAttribution>, CoreError> {
        let mut sources = Vec::with_capacity(hits.len());
        for hit in hits {
            let document = self.store.get_document(&hit.document_id).await?;
            let preview = preview_content(&hit.content);
            sources.push(SourceAttribution {
                document_id: hit.document_id.clone(),
                filename: document.filename,
                content_preview: preview,
                score: hit.score,
                chunk_index: hit.chunk_index as u32,
            });
        }
        Ok(sources)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_type_is_distinct_from_other_variants() {
        assert_ne!(EducationalQueryType::Question, EducationalQueryType::Summary);
    }
}
