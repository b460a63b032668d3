//! # Ingestion Coordinator
//!
//! Orchestrates Document Loader → Text Splitter → Embedder → Vector Store
//! Gateway, owning the per-document and per-project locking needed so
//! concurrent ingestion requests for the same document or project never
//! race. The keyed-mutex map (`Arc<RwLock<HashMap<String, Arc<...>>>>`) is
//! a lock registry rather than a cache, but built on the same shape.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde_json::json;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::RagConfig;
use crate::document_loader::{self, SourceFormat};
use crate::embedding::Embedder;
use crate::errors::CoreError;
use crate::splitter::{self, SplitterConfig};
use crate::store::{ObjectStorage, RelationalStore};
use crate::vector_store::{ChunkRecord, VectorStore};

#[derive(Debug, Clone)]
pub struct IngestReport {
    pub document_id: String,
    pub chunks_processed: usize,
    pub collection_handle: String,
    pub processing_time_ms: u64,
}

#[derive(Debug, Clone)]
pub struct ProjectIngestResult {
    pub document_id: String,
    pub outcome: Result<IngestReport, String>,
}

/// Per-document and per-project lock registry. Locks are created lazily
/// and retained for the process
/// lifetime; a long-running service would evict idle entries, which is
/// out of scope for this core.
#[derive(Default)]
struct LockRegistry {
    document_locks: RwLock<HashMap<String, Arc<Mutex<()>>>>,
    project_locks: RwLock<HashMap<String, Arc<Mutex<()>>>>,
}

impl LockRegistry {
    async fn document_lock(&self, document_id: &str) -> Arc<Mutex<()>> {
        if let Some(lock) = self.document_locks.read().await.get(document_id) {
            return lock.clone();
        }
        let mut guard = self.document_locks.write().await;
        guard
            .entry(document_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    async fn project_lock(&self, project_id: &str) -> Arc<Mutex<()>> {
        if let Some(lock) = self.project_locks.read().await.get(project_id) {
            return lock.clone();
        }
        let mut guard = self.project_locks.write().await;
        guard
            .entry(project_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

pub struct IngestionCoordinator {
    store: Arc<dyn RelationalStore>,
    objects: Arc<dyn ObjectStorage>,
    embedder: Arc<dyn Embedder>,
    vector_store: Arc<dyn VectorStore>,
    config: RagConfig,
    locks: LockRegistry,
}

impl IngestionCoordinator {
    pub fn new(
        store: Arc<dyn RelationalStore>,
        objects: Arc<dyn ObjectStorage>,
        embedder: Arc<dyn Embedder>,
        vector_store: Arc<dyn VectorStore>,
        config: RagConfig,
    ) -> Self {
        Self {
            store,
            objects,
            embedder,
            vector_store,
            config,
            locks: LockRegistry::default(),
        }
    }

    /// Brings a document from "uploaded" to "processed".
    pub async fn ingest(&self, document_id: &str) -> Result<IngestReport, CoreError> {
        let lock = self.locks.document_lock(document_id).await;
        let _guard = lock.lock().await;
        self.ingest_locked(document_id).await
    }

    async fn ingest_locked(&self, document_id: &str) -> Result<IngestReport, CoreError> {
        let started = Instant::now();
        let mut document = self.store.get_document(document_id).await?;

        if document.is_processed() {
            return Err(CoreError::AlreadyProcessed);
        }

        if document.extracted_text.is_none() {
            let bytes = self.objects.get(&document.storage_key).await?;
            let format = SourceFormat::detect(&document.content_type, &document.filename)?;
            let text = document_loader::load(format, bytes)?;
            self.store.set_extracted_text(&document.id, &text).await?;
            document.extracted_text = Some(text);
        }
        let text = document.extracted_text.clone().ok_or(CoreError::EmptyContent)?;

        let project = self.store.get_project(&document.project_id).await?;
        let collection_handle = match &project.collection_handle {
            Some(handle) => handle.clone(),
            None => self.ensure_collection(&document.project_id).await?,
        };

        let splitter_config = SplitterConfig {
            chunk_size: self.config.chunk_size,
            overlap: self.config.chunk_overlap,
            separators: SplitterConfig::default().separators,
        };
        let chunks = splitter::split(&text, &splitter_config);
        if chunks.is_empty() {
            return Err(CoreError::EmptyContent);
        }

        let embeddings = self.embedder.embed_batch(&chunks).await?;
        if embeddings.len() != chunks.len() {
            return Err(CoreError::Internal(anyhow::anyhow!(
                "embedder returned {} vectors for {} chunks",
                embeddings.len(),
                chunks.len()
            )));
        }

        // Retry safety: always clear prior chunks for this document before
        // upserting fresh ones, so a retry after partial failure can never
        // leave duplicate chunks behind on a retry after partial failure.
        self.vector_store
            .delete_by_document(&document.project_id, &document.id)
            .await?;

        let metadata = serde_json::to_string(&json!({
            "filename": document.filename,
            "original_name": document.filename,
            "mime_type": document.content_type,
            "chunk_size": self.config.chunk_size,
            "total_chunks": chunks.len(),
            "created_at": Utc::now().to_rfc3339(),
        }))
        .ok();

        let records: Vec<ChunkRecord> = chunks
            .iter()
            .zip(embeddings.into_iter())
            .enumerate()
            .map(|(index, (content, embedding))| ChunkRecord {
                id: Uuid::new_v4().to_string(),
                document_id: document.id.clone(),
                chunk_index: index as i64,
                content: content.clone(),
                embedding,
                metadata: metadata.clone(),
            })
            .collect();

        self.vector_store.upsert(&document.project_id, &records).await?;
        self.store.mark_document_processed(&document.id).await?;

        info!(document_id = %document.id, chunks = records.len(), "document ingested");

        Ok(IngestReport {
            document_id: document.id,
            chunks_processed: records.len(),
            collection_handle,
            processing_time_ms: started.elapsed().as_millis() as u64,
        })
    }

    async fn ensure_collection(&self, project_id: &str) -> Result<String, CoreError> {
        let lock = self.locks.project_lock(project_id).await;
        let _guard = lock.lock().await;

        // Re-check under lock: another task may have created it while we waited.
        let project = self.store.get_project(project_id).await?;
        if let Some(handle) = project.collection_handle {
            return Ok(handle);
        }

        let handle = format!("project_{project_id}");
        self.vector_store.create_collection(project_id).await?;
        self.store.set_collection_handle(project_id, &handle).await?;
        Ok(handle)
    }

    /// Clears a document's prior chunks and `processed_at`/`extracted_text`,
    /// then re-ingests it.
    pub async fn reingest(&self, document_id: &str) -> Result<IngestReport, CoreError> {
        let lock = self.locks.document_lock(document_id).await;
        let _guard = lock.lock().await;

        let document = self.store.get_document(document_id).await?;
        let project = self.store.get_project(&document.project_id).await?;
        if project.collection_handle.is_some() {
            self.vector_store
                .delete_by_document(&document.project_id, document_id)
                .await?;
        }
        self.store.clear_processed_state(document_id).await?;
        self.ingest_locked(document_id).await
    }

    /// Removes a document's chunks and raw bytes.
    /// The caller — holding the relational-store transaction — is
    /// responsible for deleting the document record itself.
    pub async fn delete(&self, document_id: &str) -> Result<(), CoreError> {
        let lock = self.locks.document_lock(document_id).await;
        let _guard = lock.lock().await;

        let document = self.store.get_document(document_id).await?;
        let project = self.store.get_project(&document.project_id).await?;
        if project.collection_handle.is_some() {
            self.vector_store
                .delete_by_document(&document.project_id, document_id)
                .await?;
        }
        self.objects.delete(&document.storage_key).await?;
        Ok(())
    }

    /// Ingests every unprocessed document in a project sequentially,
    /// collecting per-document outcomes rather than aborting on the first
    /// failure.
    pub async fn ingest_project(&self, project_id: &str) -> Result<Vec<ProjectIngestResult>, CoreError> {
        let documents = self.store.list_documents(project_id).await?;
        let mut results = Vec::with_capacity(documents.len());

        for document in documents {
            if document.is_processed() {
                continue;
            }
            let outcome = match self.ingest(&document.id).await {
                Ok(report) => Ok(report),
                Err(e) => {
                    warn!(document_id = %document.id, error = %e, "ingest failed during project sweep");
                    Err(e.to_string())
                }
            };
            results.push(ProjectIngestResult {
                document_id: document.id,
                outcome,
            });
        }

        Ok(results)
    }
}
