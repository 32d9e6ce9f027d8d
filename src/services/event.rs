//! Event management service
//!
//! Organizer-facing CRUD and listing over events. Deleting an event is
//! always a soft delete: cancel and archive, keeping registrations intact.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::info;

use crate::database::service::DatabaseService;
use crate::models::event::{
    CreateEventRequest, Event, EventFilter, EventStatus, Pagination, UpdateEventRequest,
};
use crate::models::user::User;
use crate::services::auth::AuthService;
use crate::utils::errors::{FieldErrors, Result, RollcallError};
use crate::utils::logging::log_event_action;

/// Event management service
#[derive(Clone)]
pub struct EventService {
    db: DatabaseService,
    auth: AuthService,
}

impl EventService {
    /// Create a new EventService instance
    pub fn new(db: DatabaseService, auth: AuthService) -> Self {
        Self { db, auth }
    }

    /// Create an event owned by the caller
    pub async fn create_event(
        &self,
        caller: &User,
        request: CreateEventRequest,
    ) -> Result<Event> {
        self.auth.require_organizer(caller)?;
        validate_event_request(&request)?;

        let event = self.db.events.create(caller.id, request).await?;
        log_event_action(event.id, "create", caller.id, None);

        Ok(event)
    }

    /// Fetch one event
    pub async fn get_event(&self, event_id: i64) -> Result<Event> {
        self.db.require_event(event_id).await
    }

    /// Update an event's details or move its status
    pub async fn update_event(
        &self,
        caller: &User,
        event_id: i64,
        request: UpdateEventRequest,
    ) -> Result<Event> {
        let event = self.db.require_event(event_id).await?;
        self.auth.require_event_manager(caller, &event)?;

        if let Some(status) = &request.status {
            if EventStatus::parse(status).is_none() {
                return Err(RollcallError::InvalidInput(format!(
                    "Unknown event status: {}",
                    status
                )));
            }
        }
        if let Some(capacity) = request.capacity {
            if capacity <= 0 {
                return Err(RollcallError::InvalidInput(
                    "Capacity must be positive".to_string(),
                ));
            }
        }

        let updated = self.db.events.update(event_id, request).await?;
        log_event_action(event_id, "update", caller.id, None);

        Ok(updated)
    }

    /// Soft delete: cancel and archive
    pub async fn archive_event(&self, caller: &User, event_id: i64) -> Result<Event> {
        let event = self.db.require_event(event_id).await?;
        self.auth.require_event_manager(caller, &event)?;

        let archived = self.db.events.soft_delete(event_id).await?;
        info!(event_id = event_id, user_id = caller.id, "Event archived");

        Ok(archived)
    }

    /// Filtered, paginated listing
    pub async fn list_events(
        &self,
        filter: &EventFilter,
        pagination: Pagination,
    ) -> Result<Vec<Event>> {
        self.db.events.find_many(filter, pagination).await
    }

    /// Status -> count map for the dashboard
    pub async fn status_counts(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<HashMap<String, i64>> {
        self.db.events.count_all_statuses(from, to).await
    }

    /// Events starting within the given window
    pub async fn upcoming_events(
        &self,
        days_ahead: i64,
        statuses: &[EventStatus],
        limit: i64,
    ) -> Result<Vec<Event>> {
        self.db
            .events
            .find_upcoming_events(days_ahead, statuses, limit)
            .await
    }
}

/// Eager validation of a create request, reporting all problems at once
pub fn validate_event_request(request: &CreateEventRequest) -> Result<()> {
    let mut errors: FieldErrors = HashMap::new();

    if request.name.trim().is_empty() {
        errors.insert(
            "name".to_string(),
            vec!["Event name is required".to_string()],
        );
    }
    if request.capacity <= 0 {
        errors.insert(
            "capacity".to_string(),
            vec!["Capacity must be positive".to_string()],
        );
    }
    if request.max_tickets <= 0 {
        errors.insert(
            "max_tickets".to_string(),
            vec!["Per-person ticket cap must be positive".to_string()],
        );
    } else if request.capacity > 0 && request.max_tickets > request.capacity {
        errors.insert(
            "max_tickets".to_string(),
            vec!["Per-person ticket cap cannot exceed capacity".to_string()],
        );
    }
    if request.end_date < request.start_date {
        errors.insert(
            "end_date".to_string(),
            vec!["End date cannot precede start date".to_string()],
        );
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(RollcallError::Validation(errors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::Duration;

    fn request() -> CreateEventRequest {
        let start = Utc::now() + Duration::days(7);
        CreateEventRequest {
            name: "Team offsite".to_string(),
            description: None,
            location: Some("Berlin".to_string()),
            agenda: None,
            start_date: start,
            end_date: start + Duration::hours(8),
            capacity: 40,
            max_tickets: 2,
            requires_signature: false,
        }
    }

    #[test]
    fn test_valid_request_passes() {
        assert!(validate_event_request(&request()).is_ok());
    }

    #[test]
    fn test_all_problems_reported_at_once() {
        let mut bad = request();
        bad.name = "  ".to_string();
        bad.capacity = 0;
        bad.end_date = bad.start_date - Duration::hours(1);

        assert_matches!(
            validate_event_request(&bad),
            Err(RollcallError::Validation(errors)) if errors.len() == 3
        );
    }

    #[test]
    fn test_max_tickets_cannot_exceed_capacity() {
        let mut bad = request();
        bad.max_tickets = 50;

        assert_matches!(
            validate_event_request(&bad),
            Err(RollcallError::Validation(errors)) if errors.contains_key("max_tickets")
        );
    }
}
