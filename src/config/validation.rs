//! Configuration validation module
//!
//! This module provides validation functions for application configuration
//! to ensure all required settings are properly configured.

use super::Settings;
use crate::utils::errors::{Result, RollcallError};

/// Validate all configuration settings
pub fn validate_settings(settings: &Settings) -> Result<()> {
    validate_server_config(&settings.server)?;
    validate_database_config(&settings.database)?;
    validate_email_config(&settings.email)?;
    validate_auth_config(&settings.auth)?;
    validate_invitation_config(&settings.invitations)?;
    validate_logging_config(&settings.logging)?;

    Ok(())
}

/// Validate server configuration
fn validate_server_config(config: &super::ServerConfig) -> Result<()> {
    if config.host.is_empty() {
        return Err(RollcallError::Config("Server host is required".to_string()));
    }

    if config.public_url.is_empty() {
        return Err(RollcallError::Config(
            "Public URL is required, invite links embed it".to_string(),
        ));
    }

    url::Url::parse(&config.public_url)?;

    Ok(())
}

/// Validate database configuration
fn validate_database_config(config: &super::DatabaseConfig) -> Result<()> {
    if config.url.is_empty() {
        return Err(RollcallError::Config("Database URL is required".to_string()));
    }

    if config.max_connections == 0 {
        return Err(RollcallError::Config(
            "Max connections must be greater than 0".to_string(),
        ));
    }

    if config.min_connections > config.max_connections {
        return Err(RollcallError::Config(
            "Min connections cannot be greater than max connections".to_string(),
        ));
    }

    Ok(())
}

/// Validate email configuration
fn validate_email_config(config: &super::EmailConfig) -> Result<()> {
    if config.smtp_host.is_empty() {
        return Err(RollcallError::Config("SMTP host is required".to_string()));
    }

    if config.from_email.is_empty() {
        return Err(RollcallError::Config(
            "Sender email address is required".to_string(),
        ));
    }

    if !crate::utils::helpers::is_valid_email(&config.from_email) {
        return Err(RollcallError::Config(format!(
            "Sender email address is malformed: {}",
            config.from_email
        )));
    }

    Ok(())
}

/// Validate identity token configuration
fn validate_auth_config(config: &super::AuthConfig) -> Result<()> {
    if config.token_secret.is_empty() {
        return Err(RollcallError::Config(
            "Token secret is required".to_string(),
        ));
    }

    if config.token_ttl_hours <= 0 {
        return Err(RollcallError::Config(
            "Token TTL must be greater than 0".to_string(),
        ));
    }

    Ok(())
}

/// Validate invitation workflow configuration
fn validate_invitation_config(config: &super::InvitationConfig) -> Result<()> {
    if config.max_batch_size == 0 {
        return Err(RollcallError::Config(
            "Invitation batch size must be greater than 0".to_string(),
        ));
    }

    if config.batch_timeout_seconds == 0 {
        return Err(RollcallError::Config(
            "Invitation batch timeout must be greater than 0".to_string(),
        ));
    }

    if config.qr_image_base_url.is_empty() {
        return Err(RollcallError::Config(
            "QR image base URL is required".to_string(),
        ));
    }

    Ok(())
}

/// Validate logging configuration
fn validate_logging_config(config: &super::LoggingConfig) -> Result<()> {
    if config.level.is_empty() {
        return Err(RollcallError::Config("Log level is required".to_string()));
    }

    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.level.as_str()) {
        return Err(RollcallError::Config(format!(
            "Invalid log level: {}. Valid levels: {:?}",
            config.level, valid_levels
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_settings() -> Settings {
        let mut settings = Settings::default();
        settings.auth.token_secret = "secret".to_string();
        settings
    }

    #[test]
    fn test_default_settings_need_a_token_secret() {
        let settings = Settings::default();
        assert!(validate_settings(&settings).is_err());
        assert!(validate_settings(&valid_settings()).is_ok());
    }

    #[test]
    fn test_rejects_bad_log_level() {
        let mut settings = valid_settings();
        settings.logging.level = "verbose".to_string();
        assert!(validate_settings(&settings).is_err());
    }

    #[test]
    fn test_rejects_zero_batch_size() {
        let mut settings = valid_settings();
        settings.invitations.max_batch_size = 0;
        assert!(validate_settings(&settings).is_err());
    }

    #[test]
    fn test_rejects_malformed_sender_address() {
        let mut settings = valid_settings();
        settings.email.from_email = "not-an-address".to_string();
        assert!(validate_settings(&settings).is_err());
    }
}
