//! # File Generation Route Handlers
//!
//! Creates study guides/quizzes/summaries/lesson plans/custom documents
//! and new versions of them, reporting job progress over a channel the
//! way the Streaming Session does. This HTTP surface runs the
//! job to completion before responding rather than exposing the progress
//! channel over the wire — a future revision could upgrade this endpoint
//! to a WebSocket the way `/stream` does.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use studyrag::filegen::{CreateFileRequest as CoreCreateFileRequest, NewVersionRequest as CoreNewVersionRequest};
use tracing::warn;

use crate::{
    auth::CallerId,
    errors::AppError,
    handlers::wrap_response,
    state::AppState,
    types::{
        ApiResponse, CreateFileRequest, DebugParams, GeneratedFileResponse,
        GeneratedFileVersionResponse, NewVersionRequest,
    },
};

pub async fn create_file_handler(
    State(app_state): State<AppState>,
    Path(project_id): Path<String>,
    caller: CallerId,
    debug_params: Query<DebugParams>,
    Json(payload): Json<CreateFileRequest>,
) -> Result<Json<ApiResponse<GeneratedFileResponse>>, AppError> {
    let (progress_tx, mut progress_rx) = tokio::sync::mpsc::channel(8);
    let drain = tokio::spawn(async move { while progress_rx.recv().await.is_some() {} });

    let file = app_state
        .filegen
        .create_file(
            CoreCreateFileRequest {
                project_id,
                owner_id: caller.0,
                display_name: payload.display_name,
                file_type: payload.file_type.into(),
                format: payload.format.into(),
                prompt: payload.prompt,
            },
            progress_tx,
        )
        .await?;

    if drain.await.is_err() {
        warn!("file generation progress drain task panicked");
    }

    Ok(wrap_response(file.into(), debug_params, None))
}

pub async fn get_generated_file_handler(
    State(app_state): State<AppState>,
    Path(file_id): Path<String>,
    debug_params: Query<DebugParams>,
) -> Result<Json<ApiResponse<GeneratedFileResponse>>, AppError> {
    let file = app_state.store.get_generated_file(&file_id).await?;
    Ok(wrap_response(file.into(), debug_params, None))
}

pub async fn create_file_version_handler(
    State(app_state): State<AppState>,
    Path(file_id): Path<String>,
    debug_params: Query<DebugParams>,
    Json(payload): Json<NewVersionRequest>,
) -> Result<Json<ApiResponse<GeneratedFileVersionResponse>>, AppError> {
    let (progress_tx, mut progress_rx) = tokio::sync::mpsc::channel(8);
    let drain = tokio::spawn(async move { while progress_rx.recv().await.is_some() {} });

    let version = app_state
        .filegen
        .new_version(
            CoreNewVersionRequest {
                file_id: file_id.clone(),
                prompt: payload.prompt,
                base_version: payload.base_version,
            },
            progress_tx,
        )
        .await?;

    if drain.await.is_err() {
        warn!("file generation progress drain task panicked");
    }

    let record = app_state.store.get_file_version(&file_id, version).await?;
    Ok(wrap_response(record.into(), debug_params, None))
}

pub async fn get_file_version_handler(
    State(app_state): State<AppState>,
    Path((file_id, version)): Path<(String, u32)>,
    debug_params: Query<DebugParams>,
) -> Result<Json<ApiResponse<GeneratedFileVersionResponse>>, AppError> {
    let record = app_state.store.get_file_version(&file_id, version).await?;
    Ok(wrap_response(record.into(), debug_params, None))
}
