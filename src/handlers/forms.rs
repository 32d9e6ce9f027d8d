//! Event form route handlers

use std::collections::HashMap;

use axum::extract::{Path, State};
use axum::Json;

use crate::handlers::{ApiError, ApiResponse, AppState};
use crate::middleware::auth::CurrentUser;
use crate::models::form::{FieldDefinition, FormField};
use crate::models::user::UserRole;
use crate::utils::errors::RollcallError;

/// Replace the event's registration form fields
pub async fn define_fields(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(event_id): Path<i64>,
    Json(fields): Json<Vec<FieldDefinition>>,
) -> Result<Json<ApiResponse<Vec<FormField>>>, ApiError> {
    let stored = state
        .services
        .form_service
        .define_fields(&caller, event_id, fields)
        .await?;

    Ok(ApiResponse::ok(stored))
}

/// Ordered field list, as the registration page renders it
pub async fn get_fields(
    State(state): State<AppState>,
    Path(event_id): Path<i64>,
) -> Result<Json<ApiResponse<Vec<FormField>>>, ApiError> {
    let fields = state
        .services
        .form_service
        .fields_for_event(event_id)
        .await?;

    Ok(ApiResponse::ok(fields))
}

/// Stored answers mapped back to typed defaults for re-display.
///
/// Visible to the registration's own attendee and to the event's manager.
pub async fn response_defaults(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(registration_id): Path<i64>,
) -> Result<Json<ApiResponse<HashMap<String, serde_json::Value>>>, ApiError> {
    let registration = state
        .services
        .database_service
        .require_registration(registration_id)
        .await?;
    let event = state
        .services
        .database_service
        .require_event(registration.event_id)
        .await?;

    let is_own = registration.user_id == caller.id;
    let is_manager = caller.role() == UserRole::Admin || event.organizer_id == caller.id;
    if !is_own && !is_manager {
        return Err(ApiError(RollcallError::PermissionDenied(
            "Not your registration".to_string(),
        )));
    }

    let defaults = state
        .services
        .form_service
        .response_defaults(event.id, registration_id)
        .await?;

    Ok(ApiResponse::ok(defaults))
}
