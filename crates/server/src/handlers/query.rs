//! # Query Route Handlers
//!
//! Stateless, conversation-aware, and educational query endpoints over a
//! project's indexed chunks.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use studyrag::models::{Conversation, Message, MessageMetadata, MessageRole};
use uuid::Uuid;

use crate::{
    errors::AppError,
    handlers::wrap_response,
    state::AppState,
    types::{ApiResponse, DebugParams, QueryRequest, QueryResponse},
};

pub async fn query_handler(
    State(app_state): State<AppState>,
    Path(project_id): Path<String>,
    debug_params: Query<DebugParams>,
    Json(payload): Json<QueryRequest>,
) -> Result<Json<ApiResponse<QueryResponse>>, AppError> {
    let result = match (&payload.conversation_id, payload.query_type) {
        (Some(conversation_id), None) => {
            app_state.rag.query_with_memory(&project_id, &payload.text, conversation_id).await?
        }
        (conversation_id, Some(query_type)) => {
            app_state
                .rag
                .educational_query(
                    &project_id,
                    &payload.text,
                    query_type.into(),
                    conversation_id.as_deref(),
                )
                .await?
        }
        (None, None) => app_state.rag.query(&project_id, &payload.text).await?,
    };

    if let Some(conversation_id) = &payload.conversation_id {
        record_turn(&app_state, conversation_id, &payload.text, &result).await?;
    }

    Ok(wrap_response(
        QueryResponse {
            answer: result.answer,
            sources: result.sources,
            tokens_used: result.tokens_used,
        },
        debug_params,
        None,
    ))
}

pub async fn create_conversation_handler(
    State(app_state): State<AppState>,
    Path(project_id): Path<String>,
    debug_params: Query<DebugParams>,
) -> Result<Json<ApiResponse<serde_json::Value>>, AppError> {
    let conversation = Conversation {
        id: Uuid::new_v4().to_string(),
        project_id,
        title: None,
    };
    app_state.store.create_conversation(&conversation).await?;
    Ok(wrap_response(
        serde_json::json!({ "id": conversation.id }),
        debug_params,
        None,
    ))
}

async fn record_turn(
    app_state: &AppState,
    conversation_id: &str,
    user_text: &str,
    result: &studyrag::rag::QueryResult,
) -> Result<(), AppError> {
    app_state
        .store
        .append_message(&Message {
            id: Uuid::new_v4().to_string(),
            conversation_id: conversation_id.to_string(),
            role: MessageRole::User,
            content: user_text.to_string(),
            created_at: chrono::Utc::now(),
            metadata: None,
        })
        .await?;

    app_state
        .store
        .append_message(&Message {
            id: Uuid::new_v4().to_string(),
            conversation_id: conversation_id.to_string(),
            role: MessageRole::Assistant,
            content: result.answer.clone(),
            created_at: chrono::Utc::now(),
            metadata: Some(MessageMetadata {
                tokens_used: result.tokens_used,
                sources: result.sources.clone(),
            }),
        })
        .await?;

    Ok(())
}
