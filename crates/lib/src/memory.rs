//! # Conversation Memory Manager
//!
//! Builds a token-bounded, LLM-ready message list for a conversation:
//! buffer mode for short conversations, hybrid buffer+summary+entities
//! mode once a conversation grows past `summary_threshold`. The
//! token-budget trimming and stop-word-filtered entity counting
//! accumulate while under budget and mark truncation once the budget is
//! exceeded, producing a token-budgeted message list rather than a
//! single flattened context string.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::warn;

use crate::ai::{ChatMessage, ChatModelProvider};
use crate::config::{estimate_tokens, MemoryConfig};
use crate::errors::CoreError;
use crate::models::{Message, MessageRole};
use crate::store::RelationalStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityCategory {
    Document,
    Concept,
    Topic,
}

#[derive(Debug, Clone)]
pub struct Entity {
    pub text: String,
    pub category: EntityCategory,
    pub frequency: usize,
}

pub struct MemoryManager {
    store: Arc<dyn RelationalStore>,
    chat: Arc<dyn ChatModelProvider>,
    config: MemoryConfig,
}

impl MemoryManager {
    pub fn new(store: Arc<dyn RelationalStore>, chat: Arc<dyn ChatModelProvider>, config: MemoryConfig) -> Self {
        Self { store, chat, config }
    }

    /// Produces the ordered message list: optional summary note, optional
    /// entity note, then the selected recent messages.
    pub async fn build_context(&self, conversation_id: &str) -> Result<Vec<ChatMessage>, CoreError> {
        let history = self.store.list_messages(conversation_id).await?;
        let total_tokens: usize = history.iter().map(|m| estimate_tokens(&m.content)).sum();

        let mut out = Vec::new();

        if history.len() <= self.config.summary_threshold && total_tokens <= self.config.max_tokens {
            out.extend(self.buffer_suffix(&history, self.config.max_tokens));
        } else {
            let split_at = history.len().saturating_sub(self.config.max_messages);
            let (summary_pool, recent) = history.split_at(split_at);

            let mut remaining_budget = self.config.max_tokens;
            if !summary_pool.is_empty() {
                match self.summarize(summary_pool).await {
                    Ok(summary) => {
                        let note = format!("Previous conversation summary: {summary}");
                        remaining_budget = remaining_budget.saturating_sub(estimate_tokens(&note));
                        out.push(ChatMessage::system(note));
                    }
                    Err(e) => {
                        warn!(conversation_id, error = %e, "summary generation failed, falling back to buffer mode");
                        out.extend(self.buffer_suffix(&history, self.config.max_tokens));
                        return Ok(self.with_entity_note(out, &history));
                    }
                }
            }
            out.extend(self.buffer_suffix(recent, remaining_budget));
        }

        Ok(self.with_entity_note(out, &history))
    }

    fn with_entity_note(&self, mut out: Vec<ChatMessage>, history: &[Message]) -> Vec<ChatMessage> {
        let entities = self.extract_entities(history);
        if !entities.is_empty() {
            let top_five: Vec<&str> = entities.iter().take(5).map(|e| e.text.as_str()).collect();
            let note = format!("Key topics in this conversation: {}", top_five.join(", "));
            // Entity note comes after any summary note but still ahead of
            // the recent message turns, so insert right after existing
            // system notes (there is at most one: the summary note).
            let insert_at = out.iter().take_while(|m| matches!(m.role, crate::ai::ChatRole::System)).count();
            out.insert(insert_at, ChatMessage::system(note));
        }
        out
    }

    /// Trailing suffix of `messages` whose cumulative token estimate fits
    /// within `budget`, mapped to chat-role messages. Callers that have
    /// already spent part of `max_tokens` on a summary note pass the
    /// remainder here so the total still respects the budget.
    fn buffer_suffix(&self, messages: &[Message], budget: usize) -> Vec<ChatMessage> {
        let mut budget = budget;
        let mut picked = Vec::new();

        for message in messages.iter().rev() {
            let cost = estimate_tokens(&message.content);
            if cost > budget && !picked.is_empty() {
                break;
            }
            budget = budget.saturating_sub(cost);
            picked.push(message);
        }
        picked.reverse();

        picked
            .into_iter()
            .map(|m| match m.role {
                MessageRole::User => ChatMessage::user(m.content.clone()),
                MessageRole::Assistant => ChatMessage::assistant(m.content.clone()),
            })
            .collect()
    }

    async fn summarize(&self, messages: &[Message]) -> Result<String, CoreError> {
        let transcript: String = messages
            .iter()
            .map(|m| {
                let role = match m.role {
                    MessageRole::User => "User",
                    MessageRole::Assistant => "Assistant",
                };
                format!("{role}: {}\n", m.content)
            })
            .collect();

        let prompt = vec![
            ChatMessage::system(
                "Summarize the following conversation excerpt in at most 200 words. Be concise and factual.",
            ),
            ChatMessage::user(transcript),
        ];

        self.chat.complete(&prompt, 400).await
    }

    /// Frequency-based entity extraction.
    fn extract_entities(&self, messages: &[Message]) -> Vec<Entity> {
        let stop_words = stop_word_set();
        let mut counts: std::collections::HashMap<String, usize> = std::collections::HashMap::new();

        for message in messages {
            for token in tokenize(&message.content) {
                if token.chars().count() < 4 || token.chars().all(|c| c.is_ascii_digit()) {
                    continue;
                }
                if stop_words.contains(token.as_str()) {
                    continue;
                }
                *counts.entry(token).or_insert(0) += 1;
            }
        }

        let mut entities: Vec<Entity> = counts
            .into_iter()
            .filter(|(_, freq)| *freq >= self.config.entity_threshold)
            .map(|(text, frequency)| {
                let category = classify_entity(&text);
                Entity {
                    text,
                    category,
                    frequency,
                }
            })
            .collect();

        entities.sort_by(|a, b| b.frequency.cmp(&a.frequency).then_with(|| a.text.cmp(&b.text)));
        entities
    }
}

fn tokenize(content: &str) -> Vec<String> {
    content
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

fn classify_entity(word: &str) -> EntityCategory {
    if word.contains("doc") || word.contains("pdf") || word.contains("arquivo") {
        EntityCategory::Document
    } else if word.ends_with("ção") || word.ends_with("mento") || word.contains("conceito") {
        EntityCategory::Concept
    } else {
        EntityCategory::Topic
    }
}

fn stop_word_set() -> HashSet<&'static str> {
    [
        // English function words
        "the", "and", "for", "that", "this", "with", "from", "have", "has", "had", "are", "was", "were",
        "you", "your", "yours", "they", "them", "their", "what", "which", "when", "where", "how", "why",
        "can", "could", "would", "should", "will", "about", "into", "than", "then", "there", "here",
        "some", "more", "most", "also", "just", "like", "please", "does", "doing", "been", "being",
        // Portuguese function words
        "para", "por", "com", "sem", "mas", "mais", "menos", "que", "quem", "qual", "quais", "quando",
        "onde", "como", "porque", "isso", "essa", "esse", "esta", "este", "aquela", "aquele", "muito",
        "muita", "muitos", "muitas", "sobre", "entre", "pode", "podem", "gostaria", "sendo", "estao",
        "estava", "estavam", "tambem",
    ]
    .into_iter()
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;

    struct StubChat(String);

    #[async_trait]
    impl ChatModelProvider for StubChat {
        async fn complete(&self, _messages: &[ChatMessage], _max_tokens: u32) -> Result<String, CoreError> {
            Ok(self.0.clone())
        }
        async fn stream(&self, _messages: &[ChatMessage], _max_tokens: u32) -> Result<crate::ai::ChatStream, CoreError> {
            unimplemented!("not exercised in memory manager tests")
        }
    }

    struct StubStore(Vec<Message>);

    #[async_trait]
    impl RelationalStore for StubStore {
        async fn create_project(&self, _: &crate::models::Project) -> Result<(), CoreError> {
            unimplemented!()
        }
        async fn get_project(&self, _: &str) -> Result<crate::models::Project, CoreError> {
            unimplemented!()
        }
        async fn set_collection_handle(&self, _: &str, _: &str) -> Result<(), CoreError> {
            unimplemented!()
        }
        async fn list_documents(&self, _: &str) -> Result<Vec<crate::models::Document>, CoreError> {
            unimplemented!()
        }
        async fn create_document(&self, _: &crate::models::Document) -> Result<(), CoreError> {
            unimplemented!()
        }
        async fn get_document(&self, _: &str) -> Result<crate::models::Document, CoreError> {
            unimplemented!()
        }
        async fn set_extracted_text(&self, _: &str, _: &str) -> Result<(), CoreError> {
            unimplemented!()
        }
        async fn mark_document_processed(&self, _: &str) -> Result<(), CoreError> {
            unimplemented!()
        }
        async fn clear_processed_state(&self, _: &str) -> Result<(), CoreError> {
            unimplemented!()
        }
        async fn delete_document(&self, _: &str) -> Result<(), CoreError> {
            unimplemented!()
        }
        async fn create_conversation(&self, _: &crate::models::Conversation) -> Result<(), CoreError> {
            unimplemented!()
        }
        async fn get_conversation(&self, _: &str) -> Result<crate::models::Conversation, CoreError> {
            unimplemented!()
        }
        async fn append_message(&self, _: &Message) -> Result<(), CoreError> {
            unimplemented!()
        }
        async fn list_messages(&self, _: &str) -> Result<Vec<Message>, CoreError> {
            Ok(self.0.clone())
        }
        async fn create_generated_file(&self, _: &crate::models::GeneratedFile) -> Result<(), CoreError> {
            unimplemented!()
        }
        async fn get_generated_file(&self, _: &str) -> Result<crate::models::GeneratedFile, CoreError> {
            unimplemented!()
        }
        async fn find_generated_file_by_name(
            &self,
            _: &str,
            _: &str,
        ) -> Result<Option<crate::models::GeneratedFile>, CoreError> {
            unimplemented!()
        }
        async fn add_file_version(&self, _: &crate::models::GeneratedFileVersion) -> Result<(), CoreError> {
            unimplemented!()
        }
        async fn update_file_version_status(
            &self,
            _: &str,
            _: u32,
            _: crate::models::JobStatus,
            _: Option<&str>,
        ) -> Result<(), CoreError> {
            unimplemented!()
        }
        async fn get_file_version(&self, _: &str, _: u32) -> Result<crate::models::GeneratedFileVersion, CoreError> {
            unimplemented!()
        }
        async fn bump_current_version(&self, _: &str, _: u32) -> Result<(), CoreError> {
            unimplemented!()
        }
    }

    fn msg(role: MessageRole, content: &str) -> Message {
        Message {
            id: uuid::Uuid::new_v4().to_string(),
            conversation_id: "conv-1".to_string(),
            role,
            content: content.to_string(),
            created_at: Utc::now(),
            metadata: None,
        }
    }

    #[tokio::test]
    async fn short_conversation_uses_buffer_mode() {
        let history = vec![
            msg(MessageRole::User, "hello there"),
            msg(MessageRole::Assistant, "hi, how can I help"),
        ];
        let manager = MemoryManager::new(
            Arc::new(StubStore(history)),
            Arc::new(StubChat("unused".to_string())),
            MemoryConfig::default(),
        );
        let context = manager.build_context("conv-1").await.unwrap();
        assert_eq!(context.len(), 2);
    }

    #[tokio::test]
    async fn hybrid_mode_prepends_summary_note() {
        let mut history = Vec::new();
        for i in 0..25 {
            history.push(msg(MessageRole::User, &format!("question number {i}")));
            history.push(msg(MessageRole::Assistant, &format!("answer number {i}")));
        }
        let manager = MemoryManager::new(
            Arc::new(StubStore(history)),
            Arc::new(StubChat("a short summary".to_string())),
            MemoryConfig::default(),
        );
        let context = manager.build_context("conv-1").await.unwrap();
        assert!(matches!(context[0].role, crate::ai::ChatRole::System));
        assert!(context[0].content.starts_with("Previous conversation summary:"));
    }

    #[test]
    fn classifies_document_concept_and_topic() {
        assert_eq!(classify_entity("document"), EntityCategory::Document);
        assert_eq!(classify_entity("arquivo"), EntityCategory::Document);
        assert_eq!(classify_entity("organização"), EntityCategory::Concept);
        assert_eq!(classify_entity("javascript"), EntityCategory::Topic);
    }
}
