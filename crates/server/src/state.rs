//! # Application State
//!
//! This module defines the shared application state (`AppState`) and the
//! logic for building it at startup. `AppState` holds every injected
//! collaborator the core crate's engines need — storage, embedding, chat,
//! ownership — so request handlers never construct one themselves.

use std::sync::Arc;

use studyrag::store::{FilesystemObjectStorage, ObjectStorage, RelationalStore, TursoRelationalStore};
use studyrag::vector_store::{TursoVectorStore, VectorStore};
use studyrag::{
    ai::{ChatModelProvider, OpenAiChatProvider},
    embedding::{Embedder, OpenAiEmbedder},
    errors::CoreError,
    streaming::OwnershipHook,
    FileGenerator, IngestionCoordinator, MemoryManager, RagQueryEngine, StreamingSession,
};
use turso::Builder;

use crate::config::AppConfig;

/// Verifies a project's `owner_id` matches the caller before a streaming
/// session touches it. The concrete check here is a direct relational
/// lookup; a production deployment would consult a real
/// identity/authorization service instead.
pub struct RelationalOwnershipHook {
    store: Arc<dyn RelationalStore>,
}

impl RelationalOwnershipHook {
    pub fn new(store: Arc<dyn RelationalStore>) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl OwnershipHook for RelationalOwnershipHook {
    async fn verify(&self, project_id: &str, owner_id: &str) -> Result<(), CoreError> {
        let project = self.store.get_project(project_id).await?;
        if project.owner_id != owner_id {
            return Err(CoreError::NotFound(format!("project {project_id}")));
        }
        Ok(())
    }
}

/// The shared application state, accessible from all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// The application's configuration, loaded from `config.yml`.
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn RelationalStore>,
    pub objects: Arc<dyn ObjectStorage>,
    pub vector_store: Arc<dyn VectorStore>,
    pub embedder: Arc<dyn Embedder>,
    pub chat: Arc<dyn ChatModelProvider>,
    pub ingestion: Arc<IngestionCoordinator>,
    pub memory: Arc<MemoryManager>,
    pub rag: Arc<RagQueryEngine>,
    pub streaming: Arc<StreamingSession>,
    pub filegen: Arc<FileGenerator>,
}

/// Builds the shared application state from the configuration: opens the
/// Turso database connection, ensures the relational and vector schemas
/// exist, wires the OpenAI-compatible embedding/chat clients, and
/// constructs the core engines on top of them.
pub async fn build_app_state(config: AppConfig) -> anyhow::Result<AppState> {
    let db = Builder::new_local(&config.db_url)
        .build()
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;

    // Use a dedicated connection per store — `Database` manages the
    // underlying connection pool, so each `.connect()` call is cheap.
    let relational_conn = db.connect().map_err(|e| anyhow::anyhow!(e.to_string()))?;
    relational_conn
        .query("PRAGMA journal_mode=WAL;", ())
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;
    tracing::info!(db_path = %config.db_url, "Initialized local storage provider (Turso).");

    let store = TursoRelationalStore::new(relational_conn);
    store.initialize_schema().await?;
    let store: Arc<dyn RelationalStore> = Arc::new(store);

    let vector_conn = db.connect().map_err(|e| anyhow::anyhow!(e.to_string()))?;
    let vector_store = TursoVectorStore::new(vector_conn);
    vector_store.create_collection("").await?;
    let vector_store: Arc<dyn VectorStore> = Arc::new(vector_store);

    let objects: Arc<dyn ObjectStorage> = Arc::new(FilesystemObjectStorage::new(&config.storage_root));

    let embedder: Arc<dyn Embedder> = Arc::new(OpenAiEmbedder::new(
        config.embedding.api_url.clone(),
        config.embedding.model_name.clone(),
        config.embedding.api_key.clone(),
    ));
    let chat: Arc<dyn ChatModelProvider> = Arc::new(OpenAiChatProvider::new(
        config.chat.api_url.clone(),
        config.chat.model_name.clone(),
        config.chat.api_key.clone(),
    ));

    let rag_config = config.rag_config();

    let ingestion = Arc::new(IngestionCoordinator::new(
        store.clone(),
        objects.clone(),
        embedder.clone(),
        vector_store.clone(),
        rag_config.clone(),
    ));

    let memory = Arc::new(MemoryManager::new(store.clone(), chat.clone(), rag_config.memory.clone()));

    let rag = Arc::new(RagQueryEngine::new(
        store.clone(),
        embedder.clone(),
        vector_store.clone(),
        chat.clone(),
        memory.clone(),
        rag_config.clone(),
    ));

    let ownership: Arc<dyn OwnershipHook> = Arc::new(RelationalOwnershipHook::new(store.clone()));
    let streaming = Arc::new(StreamingSession::new(
        store.clone(),
        embedder.clone(),
        vector_store.clone(),
        chat.clone(),
        memory.clone(),
        ownership,
        rag_config.clone(),
    ));

    let filegen = Arc::new(FileGenerator::new(
        store.clone(),
        objects.clone(),
        embedder.clone(),
        vector_store.clone(),
        chat.clone(),
        rag_config,
    ));

    Ok(AppState {
        config: Arc::new(config),
        store,
        objects,
        vector_store,
        embedder,
        chat,
        ingestion,
        memory,
        rag,
        streaming,
        filegen,
    })
}
