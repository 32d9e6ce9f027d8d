//! Logging configuration and setup
//!
//! This module provides logging initialization and structured logging utilities
//! for the rollcall application.

use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LoggingConfig;
use crate::utils::errors::Result;

/// Initialize logging based on configuration.
///
/// The returned guard must be kept alive for the lifetime of the process,
/// otherwise buffered log lines are dropped on exit.
pub fn init_logging(config: &LoggingConfig) -> Result<tracing_appender::non_blocking::WorkerGuard> {
    let file_appender = tracing_appender::rolling::daily(&config.file_path, "rollcall.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.level))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stdout))
        .with(tracing_subscriber::fmt::layer().with_writer(non_blocking))
        .init();

    info!("Logging initialized with level: {}", config.level);
    Ok(guard)
}

/// Log registration lifecycle actions with structured data
pub fn log_registration_action(
    registration_id: i64,
    event_id: i64,
    action: &str,
    details: Option<&str>,
) {
    info!(
        registration_id = registration_id,
        event_id = event_id,
        action = action,
        details = details,
        "Registration action performed"
    );
}

/// Log organizer/admin actions on events
pub fn log_event_action(event_id: i64, action: &str, user_id: i64, details: Option<&str>) {
    info!(
        event_id = event_id,
        action = action,
        user_id = user_id,
        details = details,
        "Event action performed"
    );
}

/// Log email dispatch outcomes
pub fn log_email_outcome(recipient: &str, template: &str, success: bool, message: &str) {
    if success {
        info!(
            recipient = recipient,
            template = template,
            "Email dispatched"
        );
    } else {
        warn!(
            recipient = recipient,
            template = template,
            message = message,
            "Email dispatch failed"
        );
    }
}
