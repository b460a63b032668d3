//! # Caller Identity
//!
//! Resolves the `owner_id` a request acts as from an optional JWT bearer
//! token: optional header, guest fallback, 401 on an invalid/expired
//! token, resolving to a plain id rather than a database-backed `User` —
//! real identity/authorization is an external collaborator concern this
//! server only stands in for.

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{info, warn};

use crate::state::AppState;

/// The owner id used when no bearer token is presented.
pub const GUEST_OWNER_ID: &str = "guest";

/// The claims we expect to find in the JWT.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// The subject of the token, used directly as the owner id.
    pub sub: String,
    pub exp: usize,
}

/// An Axum extractor resolving the caller's `owner_id`.
///
/// - No token present: resolves to [`GUEST_OWNER_ID`].
/// - Valid token present: resolves to `sub`.
/// - Invalid/expired token: rejects with `401 Unauthorized`.
#[derive(Debug, Clone)]
pub struct CallerId(pub String);

pub struct AuthError(StatusCode, String);

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        (
            self.0,
            Json(json!({ "error": { "code": "UNAUTHORIZED", "message": self.1 } })),
        )
            .into_response()
    }
}

impl FromRequestParts<AppState> for CallerId {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let bearer_header = Option::<TypedHeader<Authorization<Bearer>>>::from_request_parts(parts, state)
            .await
            .map_err(|e| {
                warn!("Unexpected error during header extraction: {}", e);
                AuthError(
                    StatusCode::BAD_REQUEST,
                    "Invalid Authorization header format.".to_string(),
                )
            })?;

        let Some(TypedHeader(Authorization(bearer))) = bearer_header else {
            info!("No Authorization header found, using guest owner id.");
            return Ok(CallerId(GUEST_OWNER_ID.to_string()));
        };

        info!("Authorization header found, attempting to validate JWT.");
        let jwt_secret = std::env::var("JWT_SECRET").unwrap_or_else(|_| "a-secure-secret-key".to_string());

        let token_data = decode::<Claims>(
            bearer.token(),
            &DecodingKey::from_secret(jwt_secret.as_ref()),
            &Validation::default(),
        )
        .map_err(|e| {
            warn!("JWT validation failed: {}", e);
            AuthError(StatusCode::UNAUTHORIZED, "Invalid or expired token.".to_string())
        })?;

        let current_timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|_| {
                AuthError(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "System time is before UNIX EPOCH.".to_string(),
                )
            })?
            .as_secs();

        if token_data.claims.exp < current_timestamp as usize {
            warn!(
                "Token has expired. exp: {}, current: {}",
                token_data.claims.exp, current_timestamp
            );
            return Err(AuthError(
                StatusCode::UNAUTHORIZED,
                "Invalid or expired token.".to_string(),
            ));
        }

        Ok(CallerId(token_data.claims.sub))
    }
}
