use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use studyrag::CoreError;
use tracing::error;

/// A custom error type for the server application.
///
/// Wraps `studyrag::CoreError` (and any stray `anyhow::Error` surfaced by
/// handler-local glue) so both map to one HTTP response shape.
pub enum AppError {
    Core(CoreError),
    Internal(anyhow::Error),
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        AppError::Core(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status_code, error_code, error_message) = match self {
            AppError::Core(err) => {
                error!("CoreError: {:?}", err);
                let status = match &err {
                    CoreError::UnsupportedFormat(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
                    CoreError::EmptyContent => StatusCode::UNPROCESSABLE_ENTITY,
                    CoreError::LoaderFailure(_) => StatusCode::UNPROCESSABLE_ENTITY,
                    CoreError::EmbeddingUnavailable(_) => StatusCode::BAD_GATEWAY,
                    CoreError::VectorStoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                    CoreError::VectorStoreCorrupt(_) => StatusCode::INTERNAL_SERVER_ERROR,
                    CoreError::NotIndexed => StatusCode::CONFLICT,
                    CoreError::ModelReturnedEmpty => StatusCode::BAD_GATEWAY,
                    CoreError::AlreadyProcessed => StatusCode::CONFLICT,
                    CoreError::Cancelled => StatusCode::REQUEST_TIMEOUT,
                    CoreError::NotFound(_) => StatusCode::NOT_FOUND,
                    CoreError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
                    CoreError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, err.code(), err.to_string())
            }
            AppError::Internal(err) => {
                error!("Internal server error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    "An internal server error occurred.".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": error_message,
            }
        }));

        (status_code, body).into_response()
    }
}
