//! Services module
//!
//! This module contains business logic services

pub mod auth;
pub mod email;
pub mod event;
pub mod form;
pub mod invitation;
pub mod registration;

// Re-export commonly used services
pub use auth::{AuthService, Claims};
pub use email::{EmailOutcome, EmailService, EmailStats, EmailTemplate};
pub use event::EventService;
pub use form::FormService;
pub use invitation::{InvitationData, InvitationReport, InvitationService, TokenKind};
pub use registration::{AttendeeInput, RegistrationService};

use crate::config::settings::Settings;
use crate::database::{DatabasePool, DatabaseService};
use crate::utils::errors::Result;

/// Service factory for creating and managing all services
#[derive(Clone)]
pub struct ServiceFactory {
    pub auth_service: AuthService,
    pub email_service: EmailService,
    pub event_service: EventService,
    pub form_service: FormService,
    pub registration_service: RegistrationService,
    pub invitation_service: InvitationService,
    pub database_service: DatabaseService,
    pub pool: DatabasePool,
}

impl ServiceFactory {
    /// Create a new ServiceFactory with all services initialized
    pub fn new(pool: DatabasePool, settings: Settings) -> Result<Self> {
        let database_service = DatabaseService::new(pool.clone());
        let auth_service = AuthService::new(settings.clone());
        let email_service = EmailService::new(settings.clone())?;
        let event_service = EventService::new(database_service.clone(), auth_service.clone());
        let form_service = FormService::new(database_service.clone(), auth_service.clone());
        let registration_service = RegistrationService::new(
            pool.clone(),
            database_service.clone(),
            auth_service.clone(),
            form_service.clone(),
            email_service.clone(),
            settings.clone(),
        );
        let invitation_service = InvitationService::new(
            pool.clone(),
            database_service.clone(),
            auth_service.clone(),
            form_service.clone(),
            email_service.clone(),
            settings,
        );

        Ok(Self {
            auth_service,
            email_service,
            event_service,
            form_service,
            registration_service,
            invitation_service,
            database_service,
            pool,
        })
    }
}
