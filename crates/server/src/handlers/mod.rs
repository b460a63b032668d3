//! # API Route Handlers
//!
//! This module organizes all the Axum route handlers for `studyrag-server`.
//! The handlers are split into logical sub-modules based on their
//! functionality: projects/documents, ingest, query, streaming, file
//! generation.

pub mod filegen;
pub mod ingest;
pub mod projects;
pub mod query;
pub mod stream;

pub use filegen::*;
pub use ingest::*;
pub use projects::*;
pub use query::*;
pub use stream::*;

// Shared items used by multiple handler modules.
use super::{
    errors::AppError,
    state::AppState,
    types::{ApiResponse, DebugParams},
};
use axum::{extract::Query, Json};
use serde_json::Value;

/// A shared helper function to wrap a successful result in the standard
/// `ApiResponse` format, optionally including debug information if
/// requested.
pub(crate) fn wrap_response<T>(
    result: T,
    debug_params: Query<DebugParams>,
    debug_info: Option<Value>,
) -> Json<ApiResponse<T>> {
    let debug = if debug_params.debug.unwrap_or(false) {
        debug_info
    } else {
        None
    };
    Json(ApiResponse { debug, result })
}

pub async fn root() -> &'static str {
    "studyrag server is running."
}

pub async fn health_check() -> &'static str {
    "OK"
}
