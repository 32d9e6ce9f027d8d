//! HTTP handlers module
//!
//! Thin route handlers over the services. Every action returns a
//! discriminated payload the caller inspects for a success flag and either
//! an error string or a field-error map — never a stack trace.

pub mod checkin;
pub mod events;
pub mod forms;
pub mod invitations;
pub mod registrations;

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post, put};
use axum::{Json, Router};
use serde::Serialize;
use tracing::{error, warn};

use crate::services::ServiceFactory;
use crate::utils::errors::{ErrorSeverity, FieldErrors, RollcallError};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub services: Arc<ServiceFactory>,
}

/// Discriminated result payload returned by every action
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_errors: Option<FieldErrors>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
            field_errors: None,
        })
    }
}

/// Error wrapper translating domain errors into HTTP responses
#[derive(Debug)]
pub struct ApiError(pub RollcallError);

impl From<RollcallError> for ApiError {
    fn from(err: RollcallError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = self.0;

        match err.severity() {
            ErrorSeverity::Critical | ErrorSeverity::Error => {
                error!(error = %err, recoverable = err.is_recoverable(), "Request failed")
            }
            _ => warn!(error = %err, "Request rejected"),
        }

        let (status, message, field_errors) = match err {
            RollcallError::Validation(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "Validation failed".to_string(),
                Some(errors),
            ),
            RollcallError::CapacityExceeded { .. }
            | RollcallError::TicketLimitExceeded { .. }
            | RollcallError::InvalidStateTransition { .. } => {
                (StatusCode::CONFLICT, err.to_string(), None)
            }
            RollcallError::UserNotFound { .. }
            | RollcallError::EventNotFound { .. }
            | RollcallError::RegistrationNotFound { .. }
            | RollcallError::QrCodeNotFound { .. }
            | RollcallError::InviteTokenNotFound => {
                (StatusCode::NOT_FOUND, err.to_string(), None)
            }
            RollcallError::PermissionDenied(_) => (StatusCode::FORBIDDEN, err.to_string(), None),
            RollcallError::Authentication(_) | RollcallError::Jwt(_) => (
                StatusCode::UNAUTHORIZED,
                "Authentication required".to_string(),
                None,
            ),
            RollcallError::InvalidInput(_) => (StatusCode::BAD_REQUEST, err.to_string(), None),
            RollcallError::ServiceUnavailable(_) | RollcallError::Email(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, err.to_string(), None)
            }
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Something went wrong".to_string(),
                None,
            ),
        };

        let body = Json(ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(message),
            field_errors,
        });

        (status, body).into_response()
    }
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/events", post(events::create_event).get(events::list_events))
        .route("/events/stats", get(events::status_counts))
        .route("/events/upcoming", get(events::upcoming_events))
        .route(
            "/events/:id",
            get(events::get_event)
                .patch(events::update_event)
                .delete(events::archive_event),
        )
        .route(
            "/events/:id/form",
            put(forms::define_fields).get(forms::get_fields),
        )
        .route(
            "/events/:id/registrations",
            post(registrations::create_self_registration).get(registrations::list_registrations),
        )
        .route("/events/:id/walk-ins", post(registrations::create_walk_in))
        .route("/events/:id/invitations", post(invitations::send_invitations))
        .route(
            "/registrations/:id",
            patch(registrations::update_status).delete(invitations::revoke_invitation),
        )
        .route(
            "/registrations/:id/defaults",
            get(forms::response_defaults),
        )
        .route(
            "/invitations/:token",
            get(invitations::lookup_invitation),
        )
        .route(
            "/invitations/:token/respond",
            post(invitations::respond_to_invitation),
        )
        .route("/checkin/:qr_code", post(checkin::check_in))
        .with_state(state)
}

/// Liveness probe, also checking database reachability
async fn health(State(state): State<AppState>) -> Result<Json<ApiResponse<&'static str>>, ApiError> {
    crate::database::health_check(&state.services.pool).await?;
    Ok(ApiResponse::ok("ok"))
}
