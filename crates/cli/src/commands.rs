//! # CLI Command Handlers
//!
//! One function per subcommand in `main.rs`, each driving the same
//! engines (`IngestionCoordinator`, `RagQueryEngine`, `FileGenerator`)
//! the HTTP handlers in `studyrag-server` call, against the project owned
//! by the local `guest` identity.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::ValueEnum;
use studyrag::filegen::{CreateFileRequest, GenerationProgress};
use studyrag::models::{Document, FileFormat, FileType, Project};
use studyrag::store::{ObjectStorage, RelationalStore};
use studyrag_server::auth::GUEST_OWNER_ID;
use studyrag_server::state::AppState;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum FileTypeArg {
    StudyGuide,
    Quiz,
    Summary,
    LessonPlan,
}

impl From<FileTypeArg> for FileType {
    fn from(value: FileTypeArg) -> Self {
        match value {
            FileTypeArg::StudyGuide => FileType::StudyGuide,
            FileTypeArg::Quiz => FileType::Quiz,
            FileTypeArg::Summary => FileType::Summary,
            FileTypeArg::LessonPlan => FileType::LessonPlan,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum FileFormatArg {
    Pdf,
    Markdown,
}

impl From<FileFormatArg> for FileFormat {
    fn from(value: FileFormatArg) -> Self {
        match value {
            FileFormatArg::Pdf => FileFormat::Pdf,
            FileFormatArg::Markdown => FileFormat::Markdown,
        }
    }
}

pub async fn create_project(state: &AppState, name: String) -> Result<()> {
    let project = Project {
        id: Uuid::new_v4().to_string(),
        owner_id: GUEST_OWNER_ID.to_string(),
        name,
        collection_handle: None,
    };
    state.store.create_project(&project).await?;
    println!("Created project {} ({})", project.id, project.name);
    Ok(())
}

pub async fn ingest(state: &AppState, project_id: String, path: PathBuf) -> Result<()> {
    state.store.get_project(&project_id).await.context("project not found")?;

    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| anyhow::anyhow!("path has no file name: {}", path.display()))?
        .to_string();
    let bytes = std::fs::read(&path).with_context(|| format!("reading {}", path.display()))?;

    let document_id = Uuid::new_v4().to_string();
    let storage_key = format!("{project_id}/{document_id}/{filename}");
    state.objects.put(&storage_key, &bytes).await?;

    let document = Document {
        id: document_id.clone(),
        project_id,
        filename,
        content_type: "application/octet-stream".to_string(),
        byte_size: bytes.len() as u64,
        storage_key,
        extracted_text: None,
        processed_at: None,
    };
    state.store.create_document(&document).await?;

    let report = state.ingestion.ingest(&document_id).await?;
    println!(
        "Ingested document {} into collection {}: {} chunks in {}ms",
        report.document_id, report.collection_handle, report.chunks_processed, report.processing_time_ms
    );
    Ok(())
}

pub async fn reingest(state: &AppState, document_id: String) -> Result<()> {
    let report = state.ingestion.reingest(&document_id).await?;
    println!(
        "Re-ingested document {}: {} chunks in {}ms",
        report.document_id, report.chunks_processed, report.processing_time_ms
    );
    Ok(())
}

pub async fn query(state: &AppState, project_id: String, text: String) -> Result<()> {
    let result = state.rag.query(&project_id, &text).await?;
    println!("{}", result.answer);
    if !result.sources.is_empty() {
        println!("\nSources:");
        for source in &result.sources {
            println!("  - {} ({})", source.filename, source.document_id);
        }
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub async fn generate_file(
    state: &AppState,
    project_id: String,
    file_type: FileTypeArg,
    format: FileFormatArg,
    title: String,
    prompt: String,
    out: PathBuf,
) -> Result<()> {
    let (progress_tx, mut progress_rx) = tokio::sync::mpsc::channel::<GenerationProgress>(8);
    let drain = tokio::spawn(async move {
        while let Some(update) = progress_rx.recv().await {
            info!(
                file_id = %update.file_id,
                version = update.version,
                progress = update.progress,
                status = ?update.status,
                "generation progress"
            );
        }
    });

    let file = state
        .filegen
        .create_file(
            CreateFileRequest {
                project_id,
                owner_id: GUEST_OWNER_ID.to_string(),
                display_name: title,
                file_type: file_type.into(),
                format: format.into(),
                prompt,
            },
            progress_tx,
        )
        .await?;

    if drain.await.is_err() {
        warn!("file generation progress drain task panicked");
    }

    let version = state.store.get_file_version(&file.id, file.current_version.max(1)).await?;
    let bytes = state.objects.get(&version.storage_key).await?;
    std::fs::write(&out, bytes).with_context(|| format!("writing {}", out.display()))?;

    println!("Generated {} -> {}", file.display_name, out.display());
    Ok(())
}
