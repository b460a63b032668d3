//! # Project & Document Route Handlers
//!
//! Covers project creation/lookup and the document upload/lifecycle
//! endpoints. Multipart field handling follows the usual
//! `multipart.next_field()` iterate-and-match-on-field-name pattern.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use axum_extra::extract::Multipart;
use serde_json::json;
use studyrag::models::{Document, Project};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    auth::CallerId,
    errors::AppError,
    handlers::wrap_response,
    state::AppState,
    types::{
        ApiResponse, CreateProjectRequest, DebugParams, DocumentResponse, IngestReportResponse,
        ProjectResponse,
    },
};

pub async fn create_project_handler(
    State(app_state): State<AppState>,
    caller: CallerId,
    debug_params: Query<DebugParams>,
    Json(payload): Json<CreateProjectRequest>,
) -> Result<Json<ApiResponse<ProjectResponse>>, AppError> {
    let project = Project {
        id: Uuid::new_v4().to_string(),
        owner_id: caller.0,
        name: payload.name,
        collection_handle: None,
    };
    app_state.store.create_project(&project).await?;
    info!(project_id = %project.id, "project created");

    Ok(wrap_response(project.into(), debug_params, None))
}

pub async fn get_project_handler(
    State(app_state): State<AppState>,
    Path(project_id): Path<String>,
    debug_params: Query<DebugParams>,
) -> Result<Json<ApiResponse<ProjectResponse>>, AppError> {
    let project = app_state.store.get_project(&project_id).await?;
    Ok(wrap_response(project.into(), debug_params, None))
}

pub async fn list_documents_handler(
    State(app_state): State<AppState>,
    Path(project_id): Path<String>,
    debug_params: Query<DebugParams>,
) -> Result<Json<ApiResponse<Vec<DocumentResponse>>>, AppError> {
    let documents = app_state.store.list_documents(&project_id).await?;
    let debug_info = json!({ "document_count": documents.len() });
    let documents: Vec<DocumentResponse> = documents.into_iter().map(Into::into).collect();
    Ok(wrap_response(documents, debug_params, Some(debug_info)))
}

/// Accepts a multipart `file` part, stores its bytes, records a `Document`
/// row, and — unless `auto_ingest=false` was sent as a text field — runs
/// the ingestion pipeline inline before responding.
pub async fn upload_document_handler(
    State(app_state): State<AppState>,
    Path(project_id): Path<String>,
    debug_params: Query<DebugParams>,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<DocumentResponse>>, AppError> {
    app_state.store.get_project(&project_id).await?;

    let mut filename: Option<String> = None;
    let mut content_type: Option<String> = None;
    let mut bytes: Option<Vec<u8>> = None;
    let mut auto_ingest = true;

    while let Some(field) = multipart.next_field().await.map_err(|e| anyhow::anyhow!(e))? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                filename = Some(field.file_name().unwrap_or("upload.bin").to_string());
                content_type = field.content_type().map(|s| s.to_string());
                bytes = Some(field.bytes().await.map_err(|e| anyhow::anyhow!(e))?.to_vec());
            }
            "auto_ingest" => {
                let value = field.text().await.map_err(|e| anyhow::anyhow!(e))?;
                auto_ingest = value.parse().unwrap_or(true);
            }
            other => warn!("Ignoring unknown multipart field: {other}"),
        }
    }

    let filename = filename.ok_or_else(|| anyhow::anyhow!("multipart request missing 'file' part"))?;
    let bytes = bytes.ok_or_else(|| anyhow::anyhow!("multipart request missing 'file' part"))?;
    let content_type = content_type.unwrap_or_else(|| "application/octet-stream".to_string());

    let document_id = Uuid::new_v4().to_string();
    let storage_key = format!("{project_id}/{document_id}/{filename}");
    app_state.objects.put(&storage_key, &bytes).await?;

    let document = Document {
        id: document_id.clone(),
        project_id: project_id.clone(),
        filename,
        content_type,
        byte_size: bytes.len() as u64,
        storage_key,
        extracted_text: None,
        processed_at: None,
    };
    app_state.store.create_document(&document).await?;
    info!(document_id = %document_id, project_id = %project_id, "document uploaded");

    if auto_ingest {
        app_state.ingestion.ingest(&document_id).await?;
    }

    let document = app_state.store.get_document(&document_id).await?;
    Ok(wrap_response(document.into(), debug_params, None))
}

pub async fn get_document_handler(
    State(app_state): State<AppState>,
    Path(document_id): Path<String>,
    debug_params: Query<DebugParams>,
) -> Result<Json<ApiResponse<DocumentResponse>>, AppError> {
    let document = app_state.store.get_document(&document_id).await?;
    Ok(wrap_response(document.into(), debug_params, None))
}

pub async fn delete_document_handler(
    State(app_state): State<AppState>,
    Path(document_id): Path<String>,
    debug_params: Query<DebugParams>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    app_state.ingestion.delete(&document_id).await?;
    app_state.store.delete_document(&document_id).await?;
    Ok(wrap_response(json!({ "deleted": true }), debug_params, None))
}

pub async fn reingest_document_handler(
    State(app_state): State<AppState>,
    Path(document_id): Path<String>,
    debug_params: Query<DebugParams>,
) -> Result<Json<ApiResponse<IngestReportResponse>>, AppError> {
    let report = app_state.ingestion.reingest(&document_id).await?;
    Ok(wrap_response(
        IngestReportResponse {
            document_id: report.document_id,
            chunks_processed: report.chunks_processed,
            collection_handle: report.collection_handle,
            processing_time_ms: report.processing_time_ms,
        },
        debug_params,
        None,
    ))
}
