//! Email notifier implementation
//!
//! This service handles message formatting and sending for transactional
//! email: invitations, registration confirmations, login alerts and password
//! resets. Delivery problems are reported as an outcome value, never as an
//! error — a registration must be able to succeed even when its
//! confirmation email does not.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::settings::Settings;
use crate::utils::errors::{Result, RollcallError};
use crate::utils::logging::log_email_outcome;

/// Delivery outcome reported to callers instead of an error
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailOutcome {
    pub success: bool,
    pub message: String,
}

impl EmailOutcome {
    fn sent() -> Self {
        Self {
            success: true,
            message: "sent".to_string(),
        }
    }

    fn failed(message: String) -> Self {
        Self {
            success: false,
            message,
        }
    }
}

/// Message template structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailTemplate {
    pub key: String,
    pub subject: String,
    pub body: String,
}

/// Delivery statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmailStats {
    pub total_sent: u64,
    pub total_failed: u64,
    pub sent_by_template: HashMap<String, u64>,
}

/// Email service for transactional messages
#[derive(Clone)]
pub struct EmailService {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    settings: Settings,
    templates: HashMap<String, EmailTemplate>,
    stats: Arc<Mutex<EmailStats>>,
}

impl EmailService {
    /// Create a new EmailService instance
    pub fn new(settings: Settings) -> Result<Self> {
        let credentials = Credentials::new(
            settings.email.smtp_username.clone(),
            settings.email.smtp_password.clone(),
        );
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.email.smtp_host)
            .map_err(|e| RollcallError::Email(e.to_string()))?
            .port(settings.email.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self {
            transport,
            settings,
            templates: Self::load_default_templates(),
            stats: Arc::new(Mutex::new(EmailStats::default())),
        })
    }

    /// Send a templated message, reporting the outcome instead of erroring
    pub async fn send(
        &self,
        recipient: &str,
        template_key: &str,
        parameters: &HashMap<String, String>,
    ) -> EmailOutcome {
        debug!(recipient = recipient, template_key = template_key, "Sending email");

        let (subject, body) = match self.format_message(template_key, parameters) {
            Ok(rendered) => rendered,
            Err(e) => {
                self.record_failure();
                warn!(template_key = template_key, error = %e, "Email template error");
                return EmailOutcome::failed(e.to_string());
            }
        };

        let message = self.build_message(recipient, &subject, &body);
        let message = match message {
            Ok(message) => message,
            Err(e) => {
                self.record_failure();
                warn!(recipient = recipient, error = %e, "Email address rejected");
                return EmailOutcome::failed(e.to_string());
            }
        };

        match self.transport.send(message).await {
            Ok(_) => {
                self.record_success(template_key);
                info!(recipient = recipient, template_key = template_key, "Email sent");
                log_email_outcome(recipient, template_key, true, "sent");
                EmailOutcome::sent()
            }
            Err(e) => {
                self.record_failure();
                log_email_outcome(recipient, template_key, false, &e.to_string());
                EmailOutcome::failed(e.to_string())
            }
        }
    }

    /// Send an invitation email carrying the invite link
    pub async fn send_invitation(
        &self,
        recipient: &str,
        event_name: &str,
        event_date: &str,
        invite_link: &str,
        custom_message: Option<&str>,
    ) -> EmailOutcome {
        let mut parameters = HashMap::new();
        parameters.insert("event_name".to_string(), event_name.to_string());
        parameters.insert("event_date".to_string(), event_date.to_string());
        parameters.insert("invite_link".to_string(), invite_link.to_string());
        parameters.insert(
            "custom_message".to_string(),
            custom_message.unwrap_or_default().to_string(),
        );

        self.send(recipient, "invitation", &parameters).await
    }

    /// Send a registration confirmation carrying the QR code
    pub async fn send_registration_confirmation(
        &self,
        recipient: &str,
        event_name: &str,
        event_date: &str,
        qr_code: &str,
        qr_image_url: &str,
        manage_link: &str,
    ) -> EmailOutcome {
        let mut parameters = HashMap::new();
        parameters.insert("event_name".to_string(), event_name.to_string());
        parameters.insert("event_date".to_string(), event_date.to_string());
        parameters.insert("qr_code".to_string(), qr_code.to_string());
        parameters.insert("qr_image_url".to_string(), qr_image_url.to_string());
        parameters.insert("manage_link".to_string(), manage_link.to_string());

        self.send(recipient, "registration_confirmation", &parameters)
            .await
    }

    /// Send a new-login notification
    pub async fn send_login_alert(&self, recipient: &str, login_time: &str) -> EmailOutcome {
        let mut parameters = HashMap::new();
        parameters.insert("login_time".to_string(), login_time.to_string());

        self.send(recipient, "login_alert", &parameters).await
    }

    /// Send a password reset link
    pub async fn send_password_reset(&self, recipient: &str, reset_link: &str) -> EmailOutcome {
        let mut parameters = HashMap::new();
        parameters.insert("reset_link".to_string(), reset_link.to_string());

        self.send(recipient, "password_reset", &parameters).await
    }

    /// Format subject and body using a template and parameters
    fn format_message(
        &self,
        template_key: &str,
        parameters: &HashMap<String, String>,
    ) -> Result<(String, String)> {
        let template = self.templates.get(template_key).ok_or_else(|| {
            RollcallError::InvalidInput(format!("Template not found: {}", template_key))
        })?;

        let mut subject = template.subject.clone();
        let mut body = template.body.clone();

        for (key, value) in parameters {
            let placeholder = format!("{{{}}}", key);
            subject = subject.replace(&placeholder, value);
            body = body.replace(&placeholder, value);
        }

        Ok((subject, body))
    }

    fn build_message(&self, recipient: &str, subject: &str, body: &str) -> Result<Message> {
        let from = format!(
            "{} <{}>",
            self.settings.email.from_name, self.settings.email.from_email
        );

        Message::builder()
            .from(
                from.parse()
                    .map_err(|e| RollcallError::Email(format!("sender address: {}", e)))?,
            )
            .to(recipient
                .parse()
                .map_err(|e| RollcallError::Email(format!("recipient address: {}", e)))?)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(body.to_string())
            .map_err(|e| RollcallError::Email(e.to_string()))
    }

    fn record_success(&self, template_key: &str) {
        if let Ok(mut stats) = self.stats.lock() {
            stats.total_sent += 1;
            *stats
                .sent_by_template
                .entry(template_key.to_string())
                .or_insert(0) += 1;
        }
    }

    fn record_failure(&self) {
        if let Ok(mut stats) = self.stats.lock() {
            stats.total_failed += 1;
        }
    }

    /// Get delivery statistics
    pub fn stats(&self) -> EmailStats {
        self.stats.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Load default message templates
    fn load_default_templates() -> HashMap<String, EmailTemplate> {
        let mut templates = HashMap::new();

        templates.insert(
            "invitation".to_string(),
            EmailTemplate {
                key: "invitation".to_string(),
                subject: "You're invited: {event_name}".to_string(),
                body: "<p>You have been invited to <b>{event_name}</b> on {event_date}.</p>\
                       <p>{custom_message}</p>\
                       <p><a href=\"{invite_link}\">Accept or decline your invitation</a></p>"
                    .to_string(),
            },
        );

        templates.insert(
            "registration_confirmation".to_string(),
            EmailTemplate {
                key: "registration_confirmation".to_string(),
                subject: "Registration confirmed: {event_name}".to_string(),
                body: "<p>Your registration for <b>{event_name}</b> on {event_date} is confirmed.</p>\
                       <p>Show this QR code at the door:</p>\
                       <p><img src=\"{qr_image_url}\" alt=\"{qr_code}\"/></p>\
                       <p>Code: {qr_code}</p>\
                       <p><a href=\"{manage_link}\">View your registration</a></p>"
                    .to_string(),
            },
        );

        templates.insert(
            "login_alert".to_string(),
            EmailTemplate {
                key: "login_alert".to_string(),
                subject: "New sign-in to your account".to_string(),
                body: "<p>A new sign-in to your account was recorded at {login_time}.</p>\
                       <p>If this was not you, reset your password.</p>"
                    .to_string(),
            },
        );

        templates.insert(
            "password_reset".to_string(),
            EmailTemplate {
                key: "password_reset".to_string(),
                subject: "Password reset request".to_string(),
                body: "<p>A password reset was requested for your account.</p>\
                       <p><a href=\"{reset_link}\">Choose a new password</a></p>"
                    .to_string(),
            },
        );

        templates
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> EmailService {
        let mut settings = Settings::default();
        settings.email.smtp_host = "smtp.example.com".to_string();
        EmailService::new(settings).unwrap()
    }

    #[test]
    fn test_format_message_substitutes_parameters() {
        let service = service();

        let mut parameters = HashMap::new();
        parameters.insert("event_name".to_string(), "Launch party".to_string());
        parameters.insert("event_date".to_string(), "2025-06-01".to_string());
        parameters.insert("invite_link".to_string(), "https://x/inv/abc".to_string());
        parameters.insert("custom_message".to_string(), "See you there".to_string());

        let (subject, body) = service.format_message("invitation", &parameters).unwrap();
        assert_eq!(subject, "You're invited: Launch party");
        assert!(body.contains("See you there"));
        assert!(body.contains("https://x/inv/abc"));
    }

    #[test]
    fn test_format_message_unknown_template() {
        let service = service();
        let result = service.format_message("nope", &HashMap::new());
        assert!(result.is_err());
    }

    #[test]
    fn test_stats_update() {
        let service = service();

        service.record_success("invitation");
        service.record_success("invitation");
        service.record_failure();

        let stats = service.stats();
        assert_eq!(stats.total_sent, 2);
        assert_eq!(stats.total_failed, 1);
        assert_eq!(stats.sent_by_template.get("invitation"), Some(&2));
    }

    #[test]
    fn test_build_message_rejects_bad_recipient() {
        let service = service();
        assert!(service.build_message("not an address", "s", "b").is_err());
        assert!(service
            .build_message("user@example.com", "s", "b")
            .is_ok());
    }
}
