//! Database service layer
//!
//! This module provides a high-level interface to database operations

use crate::database::{
    DatabasePool, EventRepository, FormRepository, RegistrationRepository, UserRepository,
};
use crate::models::*;
use crate::utils::errors::RollcallError;

#[derive(Debug, Clone)]
pub struct DatabaseService {
    pub users: UserRepository,
    pub events: EventRepository,
    pub registrations: RegistrationRepository,
    pub forms: FormRepository,
}

impl DatabaseService {
    pub fn new(pool: DatabasePool) -> Self {
        Self {
            users: UserRepository::new(pool.clone()),
            events: EventRepository::new(pool.clone()),
            registrations: RegistrationRepository::new(pool.clone()),
            forms: FormRepository::new(pool),
        }
    }

    /// Fetch an event or fail with a typed not-found error
    pub async fn require_event(&self, event_id: i64) -> Result<Event, RollcallError> {
        self.events
            .find_by_id(event_id)
            .await?
            .ok_or(RollcallError::EventNotFound { event_id })
    }

    /// Fetch a user or fail with a typed not-found error
    pub async fn require_user(&self, user_id: i64) -> Result<User, RollcallError> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or(RollcallError::UserNotFound { user_id })
    }

    /// Fetch a registration or fail with a typed not-found error
    pub async fn require_registration(
        &self,
        registration_id: i64,
    ) -> Result<Registration, RollcallError> {
        self.registrations
            .find_by_id(registration_id)
            .await?
            .ok_or(RollcallError::RegistrationNotFound { registration_id })
    }
}
