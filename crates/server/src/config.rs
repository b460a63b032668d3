//! # Application Configuration
//!
//! Loads the server's configuration from a `config.yml` file layered with
//! environment variables: a main YAML file (falling back to a
//! provider-suffixed variant), then top-level env vars, then
//! `STUDYRAG__`-prefixed env vars for nested overrides.

use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use regex::Regex;
use serde::Deserialize;
use std::env;
use std::fs;
use tracing::info;

#[derive(Debug)]
pub enum ConfigError {
    General(String),
    NotFound(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::General(msg) => write!(f, "Configuration error: {msg}"),
            ConfigError::NotFound(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::General(err.to_string())
    }
}

/// The root configuration structure, mapping directly to `config.yml`.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// The port for the server to listen on. Loaded from `PORT` env var.
    #[serde(default = "default_port")]
    pub port: u16,
    /// The path to the Turso/SQLite database file. Loaded from `DB_URL`.
    #[serde(default = "default_db_url")]
    pub db_url: String,
    /// Filesystem root for `ObjectStorage` (uploaded source files and
    /// generated artifacts). Loaded from `STORAGE_ROOT`.
    #[serde(default = "default_storage_root")]
    pub storage_root: String,

    pub embedding: ProviderConfig,
    pub chat: ProviderConfig,

    #[serde(default)]
    pub rag: RagSettings,
    #[serde(default)]
    pub memory: MemorySettings,
}

fn default_port() -> u16 {
    9090
}

fn default_db_url() -> String {
    "db/studyrag.db".to_string()
}

fn default_storage_root() -> String {
    "storage".to_string()
}

/// An OpenAI-compatible endpoint configuration, shared by the embedding and
/// chat provider sections.
#[derive(Debug, Deserialize, Clone)]
pub struct ProviderConfig {
    pub api_url: String,
    pub model_name: String,
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RagSettings {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
    #[serde(default = "default_max_chunks")]
    pub max_chunks: usize,
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_embedding_dim")]
    pub embedding_dim: usize,
}

impl Default for RagSettings {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            max_chunks: default_max_chunks(),
            similarity_threshold: default_similarity_threshold(),
            max_tokens: default_max_tokens(),
            embedding_dim: default_embedding_dim(),
        }
    }
}

fn default_chunk_size() -> usize {
    1000
}
fn default_chunk_overlap() -> usize {
    200
}
fn default_max_chunks() -> usize {
    5
}
fn default_similarity_threshold() -> f64 {
    0.4
}
fn default_max_tokens() -> u32 {
    4000
}
fn default_embedding_dim() -> usize {
    1536
}

#[derive(Debug, Deserialize, Clone)]
pub struct MemorySettings {
    #[serde(default = "default_memory_max_tokens")]
    pub max_tokens: usize,
    #[serde(default = "default_memory_max_messages")]
    pub max_messages: usize,
    #[serde(default = "default_summary_threshold")]
    pub summary_threshold: usize,
    #[serde(default = "default_entity_threshold")]
    pub entity_threshold: usize,
}

impl Default for MemorySettings {
    fn default() -> Self {
        Self {
            max_tokens: default_memory_max_tokens(),
            max_messages: default_memory_max_messages(),
            summary_threshold: default_summary_threshold(),
            entity_threshold: default_entity_threshold(),
        }
    }
}

fn default_memory_max_tokens() -> usize {
    1500
}
fn default_memory_max_messages() -> usize {
    20
}
fn default_summary_threshold() -> usize {
    10
}
fn default_entity_threshold() -> usize {
    2
}

impl AppConfig {
    pub fn rag_config(&self) -> studyrag::RagConfig {
        studyrag::RagConfig {
            chunk_size: self.rag.chunk_size,
            chunk_overlap: self.rag.chunk_overlap,
            max_chunks: self.rag.max_chunks,
            similarity_threshold: self.rag.similarity_threshold,
            embedding_model: self.embedding.model_name.clone(),
            chat_model: self.chat.model_name.clone(),
            max_tokens: self.rag.max_tokens,
            embedding_dim: self.rag.embedding_dim,
            memory: studyrag::config::MemoryConfig {
                max_tokens: self.memory.max_tokens,
                max_messages: self.memory.max_messages,
                summary_threshold: self.memory.summary_threshold,
                entity_threshold: self.memory.entity_threshold,
            },
        }
    }
}

/// Reads a file and substitutes `${VAR}` placeholders with environment
/// variables. Returns `Ok(None)` if the file does not exist.
fn read_and_substitute(path: &str) -> Result<Option<String>, ConfigError> {
    if !std::path::Path::new(path).exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path)
        .map_err(|e| ConfigError::General(format!("Failed to read config file '{path}': {e}")))?;

    let re = Regex::new(r"\$\{(?P<var>[A-Z0-9_]+)\}").unwrap();
    let expanded = re.replace_all(&content, |caps: &regex::Captures| {
        let var_name = &caps["var"];
        env::var(var_name).unwrap_or_default()
    });

    Ok(Some(expanded.to_string()))
}

/// Loads the application configuration from `config.yml` (or
/// `config.{STUDYRAG_PROVIDER}.yml` as a fallback), then layers environment
/// variables on top: top-level keys like `PORT`/`DB_URL` override directly,
/// nested keys override via `STUDYRAG__EMBEDDING__API_URL`-style variables.
pub fn get_config(config_path_override: Option<&str>) -> Result<AppConfig, ConfigError> {
    let base_path = env!("CARGO_MANIFEST_DIR");
    let mut builder = ConfigBuilder::builder();

    let main_config_path = if let Some(override_path) = config_path_override {
        override_path.to_string()
    } else {
        let user_config_path = format!("{base_path}/config.yml");
        if std::path::Path::new(&user_config_path).exists() {
            info!("Loading user-defined configuration from '{user_config_path}'.");
            user_config_path
        } else {
            let provider = env::var("STUDYRAG_PROVIDER").unwrap_or_else(|_| "local".to_string());
            let fallback_path = format!("{base_path}/config.{provider}.yml");
            info!(
                "'{user_config_path}' not found. Falling back to '{fallback_path}' based on STUDYRAG_PROVIDER='{provider}'."
            );
            fallback_path
        }
    };

    let main_content = read_and_substitute(&main_config_path)?.ok_or_else(|| {
        ConfigError::NotFound(format!(
            "Main config file not found at '{main_config_path}'. Please ensure 'config.yml' exists or STUDYRAG_PROVIDER points at a valid template."
        ))
    })?;
    builder = builder.add_source(File::from_str(&main_content, FileFormat::Yaml));

    let settings = builder
        .add_source(Environment::default())
        .add_source(
            Environment::with_prefix("STUDYRAG")
                .prefix_separator("_")
                .try_parsing(true)
                .separator("__"),
        )
        .build()?;

    let config: AppConfig = settings.try_deserialize()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rag_config_carries_provider_model_names() {
        let app_config = AppConfig {
            port: default_port(),
            db_url: default_db_url(),
            storage_root: default_storage_root(),
            embedding: ProviderConfig {
                api_url: "http://localhost/embed".into(),
                model_name: "test-embedder".into(),
                api_key: None,
            },
            chat: ProviderConfig {
                api_url: "http://localhost/chat".into(),
                model_name: "test-chat".into(),
                api_key: None,
            },
            rag: RagSettings::default(),
            memory: MemorySettings::default(),
        };
        let rag_config = app_config.rag_config();
        assert_eq!(rag_config.embedding_model, "test-embedder");
        assert_eq!(rag_config.chat_model, "test-chat");
    }
}
