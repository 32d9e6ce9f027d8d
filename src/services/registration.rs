//! Registration workflow service
//!
//! The core of the system: capacity and per-person ticket accounting, the
//! registration status machine and QR check-in. Every capacity-affecting
//! write happens inside one transaction; the reservation itself is an
//! atomic conditional decrement on the event row.

use std::collections::HashMap;

use chrono::Utc;
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::settings::Settings;
use crate::database::repositories::{EventRepository, FormRepository, RegistrationRepository};
use crate::database::service::DatabaseService;
use crate::database::DatabasePool;
use crate::models::event::Event;
use crate::models::registration::{
    CreateRegistrationRequest, Registration, RegistrationStatus,
};
use crate::models::user::User;
use crate::services::email::EmailService;
use crate::services::form::FormService;
use crate::services::auth::AuthService;
use crate::utils::errors::{Result, RollcallError};
use crate::utils::helpers::{format_timestamp, generate_qr_code, is_valid_email, qr_image_url};
use crate::utils::logging::log_registration_action;

/// Attendee details accompanying a registration request
#[derive(Debug, Clone, Deserialize)]
pub struct AttendeeInput {
    pub email: String,
    pub name: Option<String>,
    pub phone: Option<String>,
    #[serde(default)]
    pub answers: HashMap<String, String>,
}

/// Registration workflow service
#[derive(Clone)]
pub struct RegistrationService {
    pool: DatabasePool,
    db: DatabaseService,
    auth: AuthService,
    forms: FormService,
    email: EmailService,
    settings: Settings,
}

impl RegistrationService {
    /// Create a new RegistrationService instance
    pub fn new(
        pool: DatabasePool,
        db: DatabaseService,
        auth: AuthService,
        forms: FormService,
        email: EmailService,
        settings: Settings,
    ) -> Self {
        Self {
            pool,
            db,
            auth,
            forms,
            email,
            settings,
        }
    }

    /// Self-service registration through the public flow.
    ///
    /// Creates one registration row per requested ticket, each with its own
    /// QR code, and attempts a confirmation email carrying the first code.
    /// The email outcome never rolls the registration back.
    pub async fn create_self_registration(
        &self,
        event_id: i64,
        input: AttendeeInput,
        tickets_requested: i32,
    ) -> Result<Vec<Registration>> {
        validate_ticket_request(tickets_requested)?;
        validate_attendee_email(&input.email)?;

        let event = self.db.require_event(event_id).await?;
        ensure_open(&event)?;

        let answers = self.forms.prepare_answers(&event, &input.answers).await?;
        let user = self
            .db
            .users
            .find_or_create_by_email(&input.email, input.name.clone(), input.phone.clone())
            .await?;

        let mut tx = self.pool.begin().await?;

        let held =
            RegistrationRepository::tickets_held_by_user(&mut *tx, user.id, event.id).await?;
        check_personal_cap(event.max_tickets, held, tickets_requested)?;

        if !EventRepository::reserve_capacity(&mut *tx, event.id, tickets_requested).await? {
            tx.rollback().await?;
            let fresh = self.db.require_event(event_id).await?;
            return Err(capacity_error(&fresh, tickets_requested));
        }

        let now = Utc::now();
        let mut created = Vec::with_capacity(tickets_requested as usize);
        for _ in 0..tickets_requested {
            let registration = RegistrationRepository::insert(
                &mut *tx,
                CreateRegistrationRequest {
                    event_id: event.id,
                    user_id: user.id,
                    qr_code: generate_qr_code(user.id, event.id),
                    status: RegistrationStatus::Registered,
                    purchased_tickets: 1,
                    invite_token: None,
                    invited_at: None,
                    registered_at: Some(now),
                    checked_in_at: None,
                },
            )
            .await?;
            created.push(registration);
        }

        if !answers.is_empty() {
            FormRepository::insert_response(&mut *tx, created[0].id, &answers).await?;
        }

        tx.commit().await?;

        let first = &created[0];
        log_registration_action(first.id, event.id, "self_register", None);
        self.send_confirmation(&user, &event, first).await;

        Ok(created)
    }

    /// Guard-assisted walk-in registration: the attendee is checked in
    /// immediately, inside the same transaction that reserves capacity.
    pub async fn create_guard_registration(
        &self,
        caller: &User,
        event_id: i64,
        input: AttendeeInput,
        tickets_requested: i32,
    ) -> Result<Registration> {
        self.auth.require_guard(caller)?;
        validate_ticket_request(tickets_requested)?;
        validate_attendee_email(&input.email)?;

        let event = self.db.require_event(event_id).await?;
        ensure_open(&event)?;

        let answers = self.forms.prepare_answers(&event, &input.answers).await?;
        let user = self
            .db
            .users
            .find_or_create_by_email(&input.email, input.name.clone(), input.phone.clone())
            .await?;

        let mut tx = self.pool.begin().await?;

        let held =
            RegistrationRepository::tickets_held_by_user(&mut *tx, user.id, event.id).await?;
        check_personal_cap(event.max_tickets, held, tickets_requested)?;

        if !EventRepository::reserve_capacity(&mut *tx, event.id, tickets_requested).await? {
            tx.rollback().await?;
            let fresh = self.db.require_event(event_id).await?;
            return Err(capacity_error(&fresh, tickets_requested));
        }

        let now = Utc::now();
        let registration = RegistrationRepository::insert(
            &mut *tx,
            CreateRegistrationRequest {
                event_id: event.id,
                user_id: user.id,
                qr_code: generate_qr_code(user.id, event.id),
                status: RegistrationStatus::CheckedIn,
                purchased_tickets: tickets_requested,
                invite_token: None,
                invited_at: None,
                registered_at: Some(now),
                checked_in_at: Some(now),
            },
        )
        .await?;

        if !answers.is_empty() {
            FormRepository::insert_response(&mut *tx, registration.id, &answers).await?;
        }

        tx.commit().await?;

        info!(
            registration_id = registration.id,
            event_id = event.id,
            guard_id = caller.id,
            "Walk-in registration checked in"
        );
        self.send_confirmation(&user, &event, &registration).await;

        Ok(registration)
    }

    /// Check in a registration by its QR code.
    ///
    /// Re-scanning an already-checked-in code is rejected as an invalid
    /// transition; the first check-in timestamp is preserved. A pending or
    /// waitlisted registration checked in at the door reserves its tickets
    /// here, since they were never taken out of capacity before.
    pub async fn check_in(&self, qr_code: &str) -> Result<Registration> {
        let registration = self
            .db
            .registrations
            .find_by_qr_code(qr_code)
            .await?
            .ok_or_else(|| RollcallError::QrCodeNotFound {
                qr_code: qr_code.to_string(),
            })?;

        let current = parse_status(&registration)?;
        ensure_transition(current, RegistrationStatus::CheckedIn)?;

        let mut tx = self.pool.begin().await?;

        if !current.consumes_capacity() {
            if !EventRepository::reserve_capacity(
                &mut *tx,
                registration.event_id,
                registration.purchased_tickets,
            )
            .await?
            {
                tx.rollback().await?;
                let event = self.db.require_event(registration.event_id).await?;
                return Err(capacity_error(&event, registration.purchased_tickets));
            }
        }

        let updated = RegistrationRepository::transition(
            &mut *tx,
            registration.id,
            current,
            RegistrationStatus::CheckedIn,
        )
        .await?;

        let Some(updated) = updated else {
            tx.rollback().await?;
            return Err(RollcallError::InvalidStateTransition {
                from: registration.status.clone(),
                to: RegistrationStatus::CheckedIn.as_str().to_string(),
            });
        };

        tx.commit().await?;

        log_registration_action(updated.id, updated.event_id, "check_in", None);
        Ok(updated)
    }

    /// Organizer-driven status move (waitlisting, cancellation, manual
    /// promotion). Capacity follows the transition: entering a
    /// capacity-consuming status reserves tickets, leaving one releases them.
    pub async fn update_status(
        &self,
        caller: &User,
        registration_id: i64,
        new_status: &str,
    ) -> Result<Registration> {
        let target = RegistrationStatus::parse(new_status).ok_or_else(|| {
            RollcallError::InvalidInput(format!("Unknown registration status: {}", new_status))
        })?;

        let registration = self.db.require_registration(registration_id).await?;
        let event = self.db.require_event(registration.event_id).await?;
        self.auth.require_event_manager(caller, &event)?;

        let current = parse_status(&registration)?;
        ensure_transition(current, target)?;

        let mut tx = self.pool.begin().await?;

        if target.consumes_capacity() && !current.consumes_capacity() {
            if !EventRepository::reserve_capacity(
                &mut *tx,
                event.id,
                registration.purchased_tickets,
            )
            .await?
            {
                tx.rollback().await?;
                let fresh = self.db.require_event(event.id).await?;
                return Err(capacity_error(&fresh, registration.purchased_tickets));
            }
        } else if current.consumes_capacity() && !target.consumes_capacity() {
            EventRepository::release_capacity(&mut *tx, event.id, registration.purchased_tickets)
                .await?;
        }

        let updated =
            RegistrationRepository::transition(&mut *tx, registration.id, current, target).await?;

        let Some(updated) = updated else {
            tx.rollback().await?;
            return Err(RollcallError::InvalidStateTransition {
                from: registration.status.clone(),
                to: target.as_str().to_string(),
            });
        };

        tx.commit().await?;

        log_registration_action(
            updated.id,
            updated.event_id,
            "status_update",
            Some(target.as_str()),
        );
        Ok(updated)
    }

    /// Registrations for an event, visible to its manager
    pub async fn registrations_for_event(
        &self,
        caller: &User,
        event_id: i64,
    ) -> Result<Vec<Registration>> {
        let event = self.db.require_event(event_id).await?;
        self.auth.require_event_manager(caller, &event)?;
        self.db.registrations.find_by_event(event_id).await
    }

    async fn send_confirmation(&self, user: &User, event: &Event, registration: &Registration) {
        let verify_url = format!(
            "{}/checkin/{}",
            self.settings.server.public_url, registration.qr_code
        );
        let image_url = qr_image_url(&self.settings.invitations.qr_image_base_url, &verify_url);
        let manage_link = crate::services::invitation::issue_private_token(
            &self.settings.auth.token_secret,
            user.id,
            event.id,
            self.settings.invitations.private_token_ttl_days,
        )
        .map(|token| format!("{}/invitations/{}", self.settings.server.public_url, token))
        .unwrap_or_default();

        let outcome = self
            .email
            .send_registration_confirmation(
                &user.email,
                &event.name,
                &format_timestamp(event.start_date),
                &registration.qr_code,
                &image_url,
                &manage_link,
            )
            .await;

        debug!(
            registration_id = registration.id,
            success = outcome.success,
            "Confirmation email outcome recorded"
        );
    }
}

/// A ticket request must be for at least one ticket
pub fn validate_ticket_request(tickets: i32) -> Result<()> {
    if tickets <= 0 {
        let mut errors = HashMap::new();
        errors.insert(
            "tickets".to_string(),
            vec!["Ticket count must be positive".to_string()],
        );
        return Err(RollcallError::Validation(errors));
    }
    Ok(())
}

fn validate_attendee_email(email: &str) -> Result<()> {
    if !is_valid_email(email) {
        let mut errors = HashMap::new();
        errors.insert(
            "email".to_string(),
            vec!["A valid email address is required".to_string()],
        );
        return Err(RollcallError::Validation(errors));
    }
    Ok(())
}

/// Per-person cap: a user's aggregate tickets for one event may not exceed
/// the event's max_tickets
pub fn check_personal_cap(max_tickets: i32, already_held: i64, requested: i32) -> Result<()> {
    if already_held + requested as i64 > max_tickets as i64 {
        return Err(RollcallError::TicketLimitExceeded {
            limit: max_tickets,
            current: already_held as i32,
            requested,
        });
    }
    Ok(())
}

/// Build the event-wide capacity error from the event's current counters
pub fn capacity_error(event: &Event, requested: i32) -> RollcallError {
    RollcallError::CapacityExceeded {
        limit: event.capacity,
        current: event.capacity - event.remaining_capacity,
        requested,
    }
}

pub(crate) fn ensure_open(event: &Event) -> Result<()> {
    if !event.accepts_registrations() {
        return Err(RollcallError::InvalidInput(format!(
            "Event \"{}\" is not accepting registrations",
            event.name
        )));
    }
    Ok(())
}

pub(crate) fn parse_status(registration: &Registration) -> Result<RegistrationStatus> {
    registration.status().ok_or_else(|| {
        RollcallError::InvalidInput(format!(
            "Registration {} has unknown status {}",
            registration.id, registration.status
        ))
    })
}

pub(crate) fn ensure_transition(
    from: RegistrationStatus,
    to: RegistrationStatus,
) -> Result<()> {
    if !from.can_transition_to(to) {
        return Err(RollcallError::InvalidStateTransition {
            from: from.as_str().to_string(),
            to: to.as_str().to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::Utc;

    fn event_with_capacity(capacity: i32, remaining: i32, max_tickets: i32) -> Event {
        Event {
            id: 1,
            name: "Conference".to_string(),
            description: None,
            location: None,
            agenda: None,
            start_date: Utc::now(),
            end_date: Utc::now(),
            capacity,
            max_tickets,
            remaining_capacity: remaining,
            status: "UPCOMING".to_string(),
            archived: false,
            public_invite_code: "pub-code".to_string(),
            organizer_id: 1,
            requires_signature: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_ticket_request_must_be_positive() {
        assert_matches!(
            validate_ticket_request(0),
            Err(RollcallError::Validation(errors)) if errors.contains_key("tickets")
        );
        assert_matches!(validate_ticket_request(-2), Err(_));
        assert!(validate_ticket_request(1).is_ok());
    }

    #[test]
    fn test_personal_cap() {
        assert!(check_personal_cap(2, 0, 2).is_ok());
        assert_matches!(
            check_personal_cap(2, 1, 2),
            Err(RollcallError::TicketLimitExceeded {
                limit: 2,
                current: 1,
                requested: 2
            })
        );
    }

    #[test]
    fn test_capacity_error_reports_limit_and_current() {
        let event = event_with_capacity(5, 0, 2);
        let err = capacity_error(&event, 1);
        assert_matches!(
            err,
            RollcallError::CapacityExceeded {
                limit: 5,
                current: 5,
                requested: 1
            }
        );
        let msg = err.to_string();
        assert!(msg.contains('5'));
    }

    #[test]
    fn test_ensure_open_rejects_inert_events() {
        let mut event = event_with_capacity(10, 10, 2);
        assert!(ensure_open(&event).is_ok());

        event.status = "CANCELLED".to_string();
        event.archived = true;
        assert!(ensure_open(&event).is_err());
    }

    #[test]
    fn test_ensure_transition_monotonicity() {
        use RegistrationStatus::*;
        assert!(ensure_transition(Pending, Registered).is_ok());
        assert!(ensure_transition(Registered, CheckedIn).is_ok());
        assert_matches!(
            ensure_transition(CheckedIn, CheckedIn),
            Err(RollcallError::InvalidStateTransition { .. })
        );
        assert_matches!(
            ensure_transition(CheckedIn, Registered),
            Err(RollcallError::InvalidStateTransition { .. })
        );
    }
}
