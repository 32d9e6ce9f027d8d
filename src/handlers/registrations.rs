//! Registration route handlers

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;

use crate::handlers::{ApiError, ApiResponse, AppState};
use crate::middleware::auth::CurrentUser;
use crate::models::registration::Registration;
use crate::services::registration::AttendeeInput;

#[derive(Debug, Deserialize)]
pub struct RegistrationPayload {
    #[serde(flatten)]
    pub attendee: AttendeeInput,
    pub tickets: i32,
}

/// Self-service registration, reached from a public invite page
pub async fn create_self_registration(
    State(state): State<AppState>,
    Path(event_id): Path<i64>,
    Json(payload): Json<RegistrationPayload>,
) -> Result<Json<ApiResponse<Vec<Registration>>>, ApiError> {
    let registrations = state
        .services
        .registration_service
        .create_self_registration(event_id, payload.attendee, payload.tickets)
        .await?;

    Ok(ApiResponse::ok(registrations))
}

/// Guard-assisted walk-in registration; the attendee is checked in directly
pub async fn create_walk_in(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(event_id): Path<i64>,
    Json(payload): Json<RegistrationPayload>,
) -> Result<Json<ApiResponse<Registration>>, ApiError> {
    let registration = state
        .services
        .registration_service
        .create_guard_registration(&caller, event_id, payload.attendee, payload.tickets)
        .await?;

    Ok(ApiResponse::ok(registration))
}

/// Event manager's view of an event's registrations
pub async fn list_registrations(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(event_id): Path<i64>,
) -> Result<Json<ApiResponse<Vec<Registration>>>, ApiError> {
    let registrations = state
        .services
        .registration_service
        .registrations_for_event(&caller, event_id)
        .await?;

    Ok(ApiResponse::ok(registrations))
}

#[derive(Debug, Deserialize)]
pub struct StatusPayload {
    pub status: String,
}

/// Organizer-driven status move (waitlisting, cancellation, promotion)
pub async fn update_status(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(registration_id): Path<i64>,
    Json(payload): Json<StatusPayload>,
) -> Result<Json<ApiResponse<Registration>>, ApiError> {
    let registration = state
        .services
        .registration_service
        .update_status(&caller, registration_id, &payload.status)
        .await?;

    Ok(ApiResponse::ok(registration))
}
