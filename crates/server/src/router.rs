use super::{handlers, state::AppState};
use axum::extract::DefaultBodyLimit;
use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::trace::TraceLayer;

/// Creates the Axum router with all the application routes.
pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health_check))
        .route("/projects", post(handlers::create_project_handler))
        .route("/projects/{project_id}", get(handlers::get_project_handler))
        .route(
            "/projects/{project_id}/documents",
            get(handlers::list_documents_handler)
                .post(handlers::upload_document_handler)
                .layer(DefaultBodyLimit::max(20 * 1024 * 1024)),
        )
        .route(
            "/projects/{project_id}/ingest",
            post(handlers::ingest_project_handler),
        )
        .route("/documents/{document_id}", get(handlers::get_document_handler))
        .route(
            "/documents/{document_id}",
            delete(handlers::delete_document_handler),
        )
        .route(
            "/documents/{document_id}/reingest",
            post(handlers::reingest_document_handler),
        )
        .route(
            "/projects/{project_id}/conversations",
            post(handlers::create_conversation_handler),
        )
        .route("/projects/{project_id}/query", post(handlers::query_handler))
        .route("/stream", get(handlers::stream_handler))
        .route("/projects/{project_id}/files", post(handlers::create_file_handler))
        .route("/files/{file_id}", get(handlers::get_generated_file_handler))
        .route(
            "/files/{file_id}/versions",
            post(handlers::create_file_version_handler),
        )
        .route(
            "/files/{file_id}/versions/{version}",
            get(handlers::get_file_version_handler),
        )
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
}
