//! Authentication middleware
//!
//! Resolves the bearer identity token on protected routes into the current
//! user before any handler logic runs.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use tracing::debug;

use crate::handlers::{ApiError, AppState};
use crate::models::user::User;
use crate::utils::errors::RollcallError;

/// The authenticated caller, extracted from the Authorization header
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| {
                ApiError(RollcallError::Authentication(
                    "Missing bearer token".to_string(),
                ))
            })?;

        let token = header.strip_prefix("Bearer ").ok_or_else(|| {
            ApiError(RollcallError::Authentication(
                "Malformed Authorization header".to_string(),
            ))
        })?;

        let claims = state.services.auth_service.verify_token(token)?;
        let user = state
            .services
            .database_service
            .require_user(claims.sub)
            .await
            .map_err(|_| {
                ApiError(RollcallError::Authentication(
                    "Token subject no longer exists".to_string(),
                ))
            })?;

        debug!(user_id = user.id, "Request authenticated");
        Ok(CurrentUser(user))
    }
}
