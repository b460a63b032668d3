//! # Core Configuration
//!
//! Environment-variable loading with sensible defaults, scoped to the
//! knobs the core pipeline itself reads. The server crate layers its own
//! `config.yml`-based `AppConfig` on top of this for provider wiring.

use std::env;

#[derive(Debug, Clone)]
pub struct RagConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub max_chunks: usize,
    pub similarity_threshold: f64,
    pub embedding_model: String,
    pub chat_model: String,
    pub max_tokens: u32,
    pub embedding_dim: usize,
    pub memory: MemoryConfig,
}

#[derive(Debug, Clone)]
pub struct MemoryConfig {
    pub max_tokens: usize,
    pub max_messages: usize,
    pub summary_threshold: usize,
    pub entity_threshold: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_tokens: 1500,
            max_messages: 20,
            summary_threshold: 10,
            entity_threshold: 2,
        }
    }
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            max_chunks: 5,
            similarity_threshold: 0.4,
            embedding_model: "text-embedding-3-small".to_string(),
            chat_model: "gpt-4o-mini".to_string(),
            max_tokens: 4000,
            embedding_dim: 1536,
            memory: MemoryConfig::default(),
        }
    }
}

impl RagConfig {
    /// Loads from environment variables, falling back to `Self::default()`
    /// for anything unset or unparseable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            chunk_size: env_usize("RAG_CHUNK_SIZE", defaults.chunk_size),
            chunk_overlap: env_usize("RAG_CHUNK_OVERLAP", defaults.chunk_overlap),
            max_chunks: env_usize("RAG_MAX_CHUNKS", defaults.max_chunks),
            similarity_threshold: env_f64("RAG_SIMILARITY_THRESHOLD", defaults.similarity_threshold),
            embedding_model: env::var("OPENAI_EMBEDDING_MODEL")
                .unwrap_or(defaults.embedding_model),
            chat_model: env::var("OPENAI_CHAT_MODEL").unwrap_or(defaults.chat_model),
            max_tokens: env_u32("OPENAI_MAX_TOKENS", defaults.max_tokens),
            embedding_dim: defaults.embedding_dim,
            memory: MemoryConfig {
                max_tokens: env_usize("MEMORY_MAX_TOKENS", defaults.memory.max_tokens),
                max_messages: env_usize("MEMORY_MAX_MESSAGES", defaults.memory.max_messages),
                summary_threshold: env_usize(
                    "MEMORY_SUMMARY_THRESHOLD",
                    defaults.memory.summary_threshold,
                ),
                entity_threshold: env_usize(
                    "MEMORY_ENTITY_THRESHOLD",
                    defaults.memory.entity_threshold,
                ),
            },
        }
    }
}

fn env_usize(key: &str, default: usize) -> usize {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_u32(key: &str, default: u32) -> u32 {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_f64(key: &str, default: f64) -> f64 {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

/// Estimates token count at ~4 characters/token, rounding up.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(4)
}
