//! Rollcall event registration service
//!
//! Organizers create events with capacity limits and custom registration
//! forms, invite attendees by email, and door guards check attendees in by
//! QR code. This library provides the configuration, persistence, service
//! and HTTP handler layers of the application.

pub mod config;
pub mod database;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

// Re-export commonly used types
pub use config::Settings;
pub use utils::errors::{Result, RollcallError};

// Re-export main components for easy access
pub use database::DatabaseService;
pub use handlers::{router, AppState};
pub use services::ServiceFactory;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get library information
pub fn info() -> String {
    format!("{} v{}", NAME, VERSION)
}
