//! # File Generator
//!
//! Produces study guides, quizzes, summaries, lesson plans, and custom
//! documents from a project's indexed chunks. Follows the same
//! collaborator wiring as the RAG Query Engine — `Embedder`,
//! `VectorStore`, `ChatModelProvider`, `RelationalStore`, plus
//! `ObjectStorage` for the rendered artifact bytes — with generation run
//! as an out-of-band job reporting progress over a channel, mirroring
//! the Streaming Session's event-channel shape.

pub mod markdown;
pub mod pdf;
pub mod slug;
pub mod templates;

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tokio::sync::mpsc::Sender;
use tracing::{info, warn};
use uuid::Uuid;

use crate::ai::{ChatMessage, ChatModelProvider};
use crate::config::RagConfig;
use crate::embedding::Embedder;
use crate::errors::CoreError;
use crate::models::{
    FileFormat, FileType, GeneratedFile, GeneratedFileVersion, JobStatus, SourceAttribution,
};
use crate::prompt::preview_content;
use crate::store::{ObjectStorage, RelationalStore};
use crate::vector_store::{SearchHit, VectorStore};

/// A generation job's out-of-band progress.
#[derive(Debug, Clone)]
pub struct GenerationProgress {
    pub file_id: String,
    pub version: u32,
    pub status: JobStatus,
    pub progress: f32,
}

pub struct CreateFileRequest {
    pub project_id: String,
    pub owner_id: String,
    pub display_name: String,
    pub file_type: FileType,
    pub format: FileFormat,
    pub prompt: String,
}

pub struct NewVersionRequest {
    pub file_id: String,
    pub prompt: String,
    pub base_version: Option<u32>,
}

pub struct FileGenerator {
    store: Arc<dyn RelationalStore>,
    objects: Arc<dyn ObjectStorage>,
    embedder: Arc<dyn Embedder>,
    vector_store: Arc<dyn VectorStore>,
    chat: Arc<dyn ChatModelProvider>,
    config: RagConfig,
}

impl FileGenerator {
    pub fn new(
        store: Arc<dyn RelationalStore>,
        objects: Arc<dyn ObjectStorage>,
        embedder: Arc<dyn Embedder>,
        vector_store: Arc<dyn VectorStore>,
        chat: Arc<dyn ChatModelProvider>,
        config: RagConfig,
    ) -> Self {
        Self {
            store,
            objects,
            embedder,
            vector_store,
            chat,
            config,
        }
    }

    /// Creates the `generated_files` row and runs version 1's generation
    /// job.
    pub async fn create_file(
        &self,
        request: CreateFileRequest,
        progress: Sender<GenerationProgress>,
    ) -> Result<GeneratedFile, CoreError> {
        let file_name = slug::slugify(&request.display_name);

        if let Some(existing) = self
            .store
            .find_generated_file_by_name(&request.project_id, &file_name)
            .await?
        {
            self.new_version(
                NewVersionRequest {
                    file_id: existing.id.clone(),
                    prompt: request.prompt,
                    base_version: None,
                },
                progress,
            )
            .await?;
            return Ok(existing);
        }

        let file = GeneratedFile {
            id: Uuid::new_v4().to_string(),
            project_id: request.project_id,
            owner_id: request.owner_id,
            file_name,
            display_name: request.display_name,
            file_type: request.file_type,
            format: request.format,
            current_version: 0,
        };
        self.store.create_generated_file(&file).await?;

        self.run_version(&file, 1, request.prompt, None, progress).await?;
        Ok(file)
    }

    /// Generates a new version of an existing file, optionally editing an
    /// earlier version's content.
    pub async fn new_version(
        &self,
        request: NewVersionRequest,
        progress: Sender<GenerationProgress>,
    ) -> Result<u32, CoreError> {
        let file = self.store.get_generated_file(&request.file_id).await?;
        let next_version = file.current_version + 1;
        self.run_version(
            &file,
            next_version,
            request.prompt,
            request.base_version,
            progress,
        )
        .await?;
        Ok(next_version)
    }

    async fn run_version(
        &self,
        file: &GeneratedFile,
        version: u32,
        prompt: String,
        base_version: Option<u32>,
        progress: Sender<GenerationProgress>,
    ) -> Result<(), CoreError> {
        let started = Instant::now();
        let _ = progress
            .send(GenerationProgress {
                file_id: file.id.clone(),
                version,
                status: JobStatus::Pending,
                progress: 0.0,
            })
            .await;

        let placeholder = GeneratedFileVersion {
            file_id: file.id.clone(),
            version,
            prompt: prompt.clone(),
            base_version,
            storage_key: String::new(),
            byte_size: 0,
            page_count: None,
            status: JobStatus::Generating,
            error_message: None,
            generation_ms: None,
            sources: Vec::new(),
        };
        self.store.add_file_version(&placeholder).await?;

        let outcome = self
            .generate_and_persist(file, version, &prompt, base_version, started)
            .await;

        match outcome {
            Ok(()) => {
                info!(file_id = %file.id, version, "generated file version completed");
                let _ = progress
                    .send(GenerationProgress {
                        file_id: file.id.clone(),
                        version,
                        status: JobStatus::Completed,
                        progress: 1.0,
                    })
                    .await;
                Ok(())
            }
            Err(e) => {
                warn!(file_id = %file.id, version, error = %e, "file generation failed");
                self.store
                    .update_file_version_status(&file.id, version, JobStatus::Failed, Some(&e.to_string()))
                    .await?;
                let _ = progress
                    .send(GenerationProgress {
                        file_id: file.id.clone(),
                        version,
                        status: JobStatus::Failed,
                        progress: 1.0,
                    })
                    .await;
                Err(e)
            }
        }
    }

    async fn generate_and_persist(
        &self,
        file: &GeneratedFile,
        version: u32,
        prompt: &str,
        base_version: Option<u32>,
        started: Instant,
    ) -> Result<(), CoreError> {
        let (bytes, page_count, sources) = self.generate_version(file, version, prompt, base_version).await?;

        let storage_key = format!("{}/v{}/file.{}", file.id, version, file.format.extension());
        self.objects.put(&storage_key, &bytes).await?;

        let metadata_key = format!("{}/v{}/metadata.json", file.id, version);
        let metadata = serde_json::json!({
            "prompt": prompt,
            "base_version": base_version,
            "sources": sources,
        });
        self.objects.put(&metadata_key, metadata.to_string().as_bytes()).await?;

        let final_version = GeneratedFileVersion {
            file_id: file.id.clone(),
            version,
            prompt: prompt.to_string(),
            base_version,
            storage_key,
            byte_size: bytes.len() as u64,
            page_count,
            status: JobStatus::Completed,
            error_message: None,
            generation_ms: Some(started.elapsed().as_millis() as u64),
            sources,
        };
        self.store.add_file_version(&final_version).await?;
        self.store.bump_current_version(&file.id, version).await?;
        Ok(())
    }

    async fn generate_version(
        &self,
        file: &GeneratedFile,
        version: u32,
        prompt: &str,
        base_version: Option<u32>,
    ) -> Result<(Vec<u8>, Option<u32>, Vec<SourceAttribution>), CoreError> {
        let project = self.store.get_project(&file.project_id).await?;
        let search_terms = templates::extract_search_terms(prompt);

        // No collection to search, or nothing search-worthy in the prompt:
        // generate from the model's own knowledge with an empty context
        // block rather than failing the whole job (spec.md Scenario E).
        let hits = if project.collection_handle.is_none() || search_terms.is_empty() {
            Vec::new()
        } else {
            let query_vector = self.embedder.embed_query(&search_terms).await?;
            self.vector_store
                .search(&project.id, &query_vector, 5, self.config.similarity_threshold)
                .await?
        };

        let base_content = match base_version {
            Some(v) => Some(self.load_version_text(file, v).await?),
            None => None,
        };

        let context = build_context_block(&hits);
        let inputs = templates::TemplateInputs {
            prompt,
            context: &context,
            project_name: &project.name,
            subject: prompt,
            base_content: base_content.as_deref(),
        };
        let rendered_prompt = templates::render_template(file.file_type, &inputs);

        let messages = vec![ChatMessage::user(rendered_prompt)];
        let body = self.chat.complete(&messages, self.config.max_tokens).await?;
        if body.trim().is_empty() {
            return Err(CoreError::ModelReturnedEmpty);
        }

        let generated_at = Utc::now();
        let (bytes, page_count) = match file.format {
            FileFormat::Markdown => (
                markdown::render(&file.display_name, file.file_type, generated_at, &project.name, version, &body),
                None,
            ),
            FileFormat::Pdf => {
                let (bytes, pages) =
                    pdf::render(&file.display_name, file.file_type, generated_at, &project.name, &body)?;
                (bytes, Some(pages))
            }
        };

        let sources = attribute_sources(&self.store, &hits).await?;
        Ok((bytes, page_count, sources))
    }

    async fn load_version_text(&self, file: &GeneratedFile, version: u32) -> Result<String, CoreError> {
        let record = self.store.get_file_version(&file.id, version).await?;
        let bytes = self.objects.get(&record.storage_key).await?;
        String::from_utf8(bytes).map_err(|e| CoreError::Internal(anyhow::anyhow!(e)))
    }
}

fn build_context_block(hits: &[SearchHit]) -> String {
    let mut block = String::new();
    for (index, hit) in hits.iter().enumerate() {
        block.push_str(&format!("--- Document {} ---\n{}\n\n", index + 1, hit.content));
    }
    block
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
    fn context_block_numbers_documents_in_order() {
        let hits = vec![
            SearchHit {
                chunk_id: "c1".into(),
                document_id: "d1".into(),
                chunk_index: 0,
                content: "first".into(),
                score: 0.9,
                metadata: None,
            },
            SearchHit {
                chunk_id: "c2".into(),
                document_id: "d2".into(),
                chunk_index: 1,
                content: "second".into(),
                score: 0.8,
                metadata: None,
            },
        ];
        let block = build_context_block(&hits);
        assert!(block.contains("--- Document 1 ---\nfirst"));
        assert!(block.contains("--- Document 2 ---\nsecond"));
    }
}
