//! Invitation route handlers

use std::collections::HashMap;

use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;

use crate::handlers::{ApiError, ApiResponse, AppState};
use crate::middleware::auth::CurrentUser;
use crate::models::registration::Registration;
use crate::services::invitation::{InvitationData, InvitationReport};

#[derive(Debug, Deserialize)]
pub struct SendInvitationsPayload {
    /// Free text: addresses separated by commas, semicolons or newlines
    pub recipients: String,
    pub message: Option<String>,
}

/// Bulk invitation send for an event
pub async fn send_invitations(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(event_id): Path<i64>,
    Json(payload): Json<SendInvitationsPayload>,
) -> Result<Json<ApiResponse<InvitationReport>>, ApiError> {
    let report = state
        .services
        .invitation_service
        .send_invitations(&caller, event_id, &payload.recipients, payload.message.as_deref())
        .await?;

    Ok(ApiResponse::ok(report))
}

/// Resolve an invitation token for the registration page
pub async fn lookup_invitation(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<ApiResponse<InvitationData>>, ApiError> {
    let data = state
        .services
        .invitation_service
        .lookup_invitation(&token)
        .await?;

    Ok(ApiResponse::ok(data))
}

#[derive(Debug, Deserialize)]
pub struct RespondPayload {
    pub accept: bool,
    pub tickets: Option<i32>,
    #[serde(default)]
    pub answers: HashMap<String, String>,
}

/// Accept or decline a named invitation
pub async fn respond_to_invitation(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(payload): Json<RespondPayload>,
) -> Result<Json<ApiResponse<Registration>>, ApiError> {
    let registration = state
        .services
        .invitation_service
        .respond_to_invitation(&token, payload.accept, payload.tickets, &payload.answers)
        .await?;

    Ok(ApiResponse::ok(registration))
}

/// Administrative revocation of a registration
pub async fn revoke_invitation(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(registration_id): Path<i64>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    state
        .services
        .invitation_service
        .revoke_invitation(&caller, registration_id)
        .await?;

    Ok(ApiResponse::ok(()))
}
