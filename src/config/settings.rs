//! Application settings management
//!
//! This module defines the configuration structure and provides methods
//! for loading settings from TOML files and environment variables.

use serde::{Deserialize, Serialize};

/// Main application configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub email: EmailConfig,
    pub auth: AuthConfig,
    pub invitations: InvitationConfig,
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Externally reachable base URL, embedded in invite links and QR payloads
    pub public_url: String,
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

/// SMTP email configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: String,
    pub from_email: String,
    pub from_name: String,
}

/// Identity token configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    pub token_secret: String,
    pub token_ttl_hours: i64,
}

/// Invitation workflow configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InvitationConfig {
    /// Upper bound on addresses accepted per bulk send
    pub max_batch_size: usize,
    /// Budget for one bulk send, covering email dispatch for the whole batch
    pub batch_timeout_seconds: u64,
    /// Lifetime of private (named-invitee) tokens
    pub private_token_ttl_days: i64,
    /// Third-party QR image renderer
    pub qr_image_base_url: String,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file_path: String,
    pub max_file_size: String,
    pub max_files: u32,
}

impl Settings {
    /// Load settings from configuration file and environment variables
    pub fn new() -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name("config").required(false))
            .add_source(config::Environment::with_prefix("ROLLCALL"))
            .build()?;

        settings.try_deserialize()
    }

    /// Validate configuration settings
    pub fn validate(&self) -> Result<(), crate::utils::errors::RollcallError> {
        super::validation::validate_settings(self)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                public_url: "http://localhost:8080".to_string(),
            },
            database: DatabaseConfig {
                url: "postgresql://localhost/rollcall".to_string(),
                max_connections: 10,
                min_connections: 1,
            },
            email: EmailConfig {
                smtp_host: "localhost".to_string(),
                smtp_port: 587,
                smtp_username: String::new(),
                smtp_password: String::new(),
                from_email: "noreply@rollcall.local".to_string(),
                from_name: "Rollcall".to_string(),
            },
            auth: AuthConfig {
                token_secret: String::new(),
                token_ttl_hours: 24,
            },
            invitations: InvitationConfig {
                max_batch_size: 100,
                batch_timeout_seconds: 25,
                private_token_ttl_days: 90,
                qr_image_base_url: "https://api.qrserver.com/v1/create-qr-code/".to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                file_path: "/var/log/rollcall".to_string(),
                max_file_size: "10MB".to_string(),
                max_files: 5,
            },
        }
    }
}
