//! # Ingestion Sweep Handler
//!
//! Runs the ingestion coordinator's project-wide sweep over every
//! unprocessed document in a project.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Serialize;

use crate::{
    errors::AppError,
    handlers::wrap_response,
    state::AppState,
    types::{ApiResponse, DebugParams},
};

#[derive(Debug, Serialize)]
pub struct ProjectIngestResultResponse {
    pub document_id: String,
    pub error: Option<String>,
}

pub async fn ingest_project_handler(
    State(app_state): State<AppState>,
    Path(project_id): Path<String>,
    debug_params: Query<DebugParams>,
) -> Result<Json<ApiResponse<Vec<ProjectIngestResultResponse>>>, AppError> {
    let results = app_state.ingestion.ingest_project(&project_id).await?;
    let results = results
        .into_iter()
        .map(|result| ProjectIngestResultResponse {
            document_id: result.document_id,
            error: result.outcome.err(),
        })
        .collect();
    Ok(wrap_response(results, debug_params, None))
}
