//! Check-in route handler

use axum::extract::{Path, State};
use axum::Json;

use crate::handlers::{ApiError, ApiResponse, AppState};
use crate::middleware::auth::CurrentUser;
use crate::models::registration::Registration;

/// Check in a registration by scanned QR code. Guards and admins only.
pub async fn check_in(
    State(state): State<AppState>,
    CurrentUser(caller): CurrentUser,
    Path(qr_code): Path<String>,
) -> Result<Json<ApiResponse<Registration>>, ApiError> {
    state.services.auth_service.require_guard(&caller)?;

    let registration = state.services.registration_service.check_in(&qr_code).await?;

    Ok(ApiResponse::ok(registration))
}
