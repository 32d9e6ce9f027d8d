//! Error handling for rollcall
//!
//! This module defines the main error types used throughout the application
//! and provides a unified error handling strategy.

use std::collections::HashMap;
use thiserror::Error;

/// Field-keyed validation messages, as returned to the caller in one round trip.
pub type FieldErrors = HashMap<String, Vec<String>>;

/// Main error type for the rollcall application
#[derive(Error, Debug)]
pub enum RollcallError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("User not found: {user_id}")]
    UserNotFound { user_id: i64 },

    #[error("Event not found: {event_id}")]
    EventNotFound { event_id: i64 },

    #[error("Registration not found: {registration_id}")]
    RegistrationNotFound { registration_id: i64 },

    #[error("No registration matches QR code {qr_code}")]
    QrCodeNotFound { qr_code: String },

    #[error("Invite token is unknown or already used")]
    InviteTokenNotFound,

    #[error("Invalid state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Event capacity exceeded: {current} of {limit} tickets taken, {requested} more requested")]
    CapacityExceeded { limit: i32, current: i32, requested: i32 },

    #[error("Ticket limit exceeded: {current} of {limit} tickets already held by this attendee, {requested} more requested")]
    TicketLimitExceeded { limit: i32, current: i32, requested: i32 },

    #[error("Validation failed for {} field(s)", .0.len())]
    Validation(FieldErrors),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Token error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("Email error: {0}")]
    Email(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

/// Result type alias for rollcall operations
pub type Result<T> = std::result::Result<T, RollcallError>;

impl RollcallError {
    /// Check if the error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            RollcallError::Database(_) => false,
            RollcallError::Migration(_) => false,
            RollcallError::Config(_) => false,
            RollcallError::PermissionDenied(_) => false,
            RollcallError::UserNotFound { .. } => false,
            RollcallError::EventNotFound { .. } => false,
            RollcallError::RegistrationNotFound { .. } => false,
            RollcallError::QrCodeNotFound { .. } => false,
            RollcallError::InviteTokenNotFound => false,
            RollcallError::InvalidStateTransition { .. } => false,
            RollcallError::CapacityExceeded { .. } => false,
            RollcallError::TicketLimitExceeded { .. } => false,
            RollcallError::Validation(_) => false,
            RollcallError::InvalidInput(_) => false,
            RollcallError::Authentication(_) => false,
            RollcallError::Jwt(_) => false,
            RollcallError::Serialization(_) => false,
            RollcallError::Io(_) => true,
            RollcallError::UrlParse(_) => false,
            RollcallError::Email(_) => true,
            RollcallError::ServiceUnavailable(_) => true,
        }
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            RollcallError::Database(_) => ErrorSeverity::Critical,
            RollcallError::Migration(_) => ErrorSeverity::Critical,
            RollcallError::Config(_) => ErrorSeverity::Critical,
            RollcallError::PermissionDenied(_) => ErrorSeverity::Warning,
            RollcallError::Authentication(_) => ErrorSeverity::Warning,
            RollcallError::Jwt(_) => ErrorSeverity::Warning,
            RollcallError::CapacityExceeded { .. } => ErrorSeverity::Info,
            RollcallError::TicketLimitExceeded { .. } => ErrorSeverity::Info,
            RollcallError::Validation(_) => ErrorSeverity::Info,
            RollcallError::InvalidInput(_) => ErrorSeverity::Info,
            _ => ErrorSeverity::Error,
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl std::fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorSeverity::Info => write!(f, "INFO"),
            ErrorSeverity::Warning => write!(f, "WARN"),
            ErrorSeverity::Error => write!(f, "ERROR"),
            ErrorSeverity::Critical => write!(f, "CRITICAL"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_message_names_limit_and_current() {
        let err = RollcallError::CapacityExceeded {
            limit: 5,
            current: 5,
            requested: 1,
        };
        let msg = err.to_string();
        assert!(msg.contains("5 of 5"));
        assert!(msg.contains("1 more requested"));
    }

    #[test]
    fn test_severity_classification() {
        let err = RollcallError::Validation(HashMap::new());
        assert_eq!(err.severity(), ErrorSeverity::Info);
        assert!(!err.is_recoverable());

        let err = RollcallError::Config("missing".to_string());
        assert_eq!(err.severity(), ErrorSeverity::Critical);
    }
}
