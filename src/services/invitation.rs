//! Invitation workflow service
//!
//! Bulk email invitations, invite-token classification and consumption, and
//! administrative revocation. Three token shapes are in play: a private
//! token that decodes to a (user, event) pair, a per-event standing public
//! code, and the single-use hex token attached to a PENDING registration
//! and embedded in invitation email links.

use std::collections::HashMap;
use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

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
use crate::services::registration::{
    capacity_error, check_personal_cap, ensure_open, ensure_transition, parse_status,
    validate_ticket_request,
};
use crate::utils::errors::{Result, RollcallError};
use crate::utils::helpers::{
    format_timestamp, generate_invite_token, generate_qr_code, parse_email_list,
};
use crate::utils::logging::log_registration_action;

/// Aggregate outcome of one bulk invitation send
#[derive(Debug, Clone, Default, Serialize)]
pub struct InvitationReport {
    pub sent: Vec<String>,
    pub failed: Vec<String>,
    pub already_invited: Vec<String>,
}

/// Claims carried by a private (named-invitee) token
#[derive(Debug, Clone, Serialize, Deserialize)]
struct InviteClaims {
    /// User id
    sub: i64,
    event_id: i64,
    exp: i64,
}

/// The two shapes an incoming invitation token can take
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    /// Reversible encoding of a (user, event) pair
    Private { user_id: i64, event_id: i64 },
    /// Any other opaque string: a single-use invite token or a standing
    /// public code
    Public(String),
}

/// Invitation data resolved from a token, for the registration page
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InvitationData {
    /// Named-invitee flow
    Named {
        event: Event,
        user: User,
        registration: Option<Registration>,
    },
    /// Anonymous-join flow through a standing public link
    Anonymous { event: Event },
}

/// Invitation workflow service
#[derive(Clone)]
pub struct InvitationService {
    pool: DatabasePool,
    db: DatabaseService,
    auth: AuthService,
    forms: FormService,
    email: EmailService,
    settings: Settings,
}

impl InvitationService {
    /// Create a new InvitationService instance
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

    /// Parse, deduplicate and invite up to the configured batch of addresses.
    ///
    /// Each address gets a PENDING registration carrying a fresh single-use
    /// token and QR code, and an invitation email with the token link. An
    /// address whose email fails keeps no row behind, so a retry can
    /// re-invite it. Zero successes with at least one failure is an overall
    /// error; the whole batch runs under a fixed time budget.
    pub async fn send_invitations(
        &self,
        caller: &User,
        event_id: i64,
        raw_recipients: &str,
        custom_message: Option<&str>,
    ) -> Result<InvitationReport> {
        let event = self.db.require_event(event_id).await?;
        self.auth.require_event_manager(caller, &event)?;
        ensure_open(&event)?;

        let (valid, invalid) = parse_email_list(raw_recipients);
        let max_batch = self.settings.invitations.max_batch_size;
        if valid.len() > max_batch {
            return Err(RollcallError::InvalidInput(format!(
                "At most {} addresses per invitation batch, got {}",
                max_batch,
                valid.len()
            )));
        }

        let budget = Duration::from_secs(self.settings.invitations.batch_timeout_seconds);
        let mut report = match tokio::time::timeout(
            budget,
            self.fan_out(&event, valid, custom_message),
        )
        .await
        {
            Ok(report) => report?,
            Err(_) => {
                warn!(
                    event_id = event.id,
                    budget_seconds = self.settings.invitations.batch_timeout_seconds,
                    "Invitation batch timed out"
                );
                return Err(RollcallError::ServiceUnavailable(format!(
                    "Invitation batch timed out after {}s",
                    self.settings.invitations.batch_timeout_seconds
                )));
            }
        };

        report.failed.extend(invalid);

        if report.sent.is_empty() && !report.failed.is_empty() {
            return Err(RollcallError::Email(format!(
                "All {} invitation(s) failed",
                report.failed.len()
            )));
        }

        info!(
            event_id = event.id,
            sent = report.sent.len(),
            failed = report.failed.len(),
            already_invited = report.already_invited.len(),
            "Invitation batch completed"
        );

        Ok(report)
    }

    async fn fan_out(
        &self,
        event: &Event,
        addresses: Vec<String>,
        custom_message: Option<&str>,
    ) -> Result<InvitationReport> {
        let mut report = InvitationReport::default();

        for address in addresses {
            let user = self
                .db
                .users
                .find_or_create_by_email(&address, None, None)
                .await?;

            if self.db.registrations.exists_active(user.id, event.id).await? {
                report.already_invited.push(address);
                continue;
            }

            let token = generate_invite_token();
            let mut conn = self.pool.acquire().await?;
            let registration = RegistrationRepository::insert(
                &mut *conn,
                CreateRegistrationRequest {
                    event_id: event.id,
                    user_id: user.id,
                    qr_code: generate_qr_code(user.id, event.id),
                    status: RegistrationStatus::Pending,
                    purchased_tickets: 1,
                    invite_token: Some(token.clone()),
                    invited_at: Some(Utc::now()),
                    registered_at: None,
                    checked_in_at: None,
                },
            )
            .await?;

            let invite_link = format!(
                "{}/invitations/{}",
                self.settings.server.public_url, token
            );
            let outcome = self
                .email
                .send_invitation(
                    &address,
                    &event.name,
                    &format_timestamp(event.start_date),
                    &invite_link,
                    custom_message,
                )
                .await;

            if outcome.success {
                report.sent.push(address);
            } else {
                RegistrationRepository::delete(&mut *conn, registration.id).await?;
                report.failed.push(address);
            }
        }

        Ok(report)
    }

    /// Issue a private token binding a user to an event
    pub fn issue_private_token(&self, user_id: i64, event_id: i64) -> Result<String> {
        issue_private_token(
            &self.settings.auth.token_secret,
            user_id,
            event_id,
            self.settings.invitations.private_token_ttl_days,
        )
    }

    /// Distinguish a private (user, event) token from an opaque public one
    pub fn classify_token(&self, token: &str) -> TokenKind {
        classify_token(&self.settings.auth.token_secret, token)
    }

    /// Resolve a token into the data the registration page needs, branching
    /// between the named-invitee flow and the anonymous-join flow
    pub async fn lookup_invitation(&self, token: &str) -> Result<InvitationData> {
        match self.classify_token(token) {
            TokenKind::Private { user_id, event_id } => {
                let user = self.db.require_user(user_id).await?;
                let event = self.db.require_event(event_id).await?;
                let registration = self
                    .db
                    .registrations
                    .find_by_user_and_event(user_id, event_id)
                    .await?
                    .into_iter()
                    .next();

                Ok(InvitationData::Named {
                    event,
                    user,
                    registration,
                })
            }
            TokenKind::Public(opaque) => {
                if let Some(registration) =
                    self.db.registrations.find_by_invite_token(&opaque).await?
                {
                    let event = self.db.require_event(registration.event_id).await?;
                    let user = self.db.require_user(registration.user_id).await?;
                    return Ok(InvitationData::Named {
                        event,
                        user,
                        registration: Some(registration),
                    });
                }

                let event = self
                    .db
                    .events
                    .find_by_public_code(&opaque)
                    .await?
                    .ok_or(RollcallError::InviteTokenNotFound)?;

                Ok(InvitationData::Anonymous { event })
            }
        }
    }

    /// Consume a single-use invite token: accept into REGISTERED under the
    /// capacity guard, or decline into DECLINED.
    pub async fn respond_to_invitation(
        &self,
        token: &str,
        accept: bool,
        tickets_requested: Option<i32>,
        answers: &HashMap<String, String>,
    ) -> Result<Registration> {
        let registration = self
            .db
            .registrations
            .find_by_invite_token(token)
            .await?
            .ok_or(RollcallError::InviteTokenNotFound)?;

        let current = parse_status(&registration)?;
        let event = self.db.require_event(registration.event_id).await?;

        if !accept {
            ensure_transition(current, RegistrationStatus::Declined)?;

            let mut tx = self.pool.begin().await?;
            let updated = RegistrationRepository::transition(
                &mut *tx,
                registration.id,
                current,
                RegistrationStatus::Declined,
            )
            .await?;
            let Some(updated) = updated else {
                tx.rollback().await?;
                return Err(RollcallError::InvalidStateTransition {
                    from: registration.status.clone(),
                    to: RegistrationStatus::Declined.as_str().to_string(),
                });
            };
            tx.commit().await?;

            log_registration_action(updated.id, updated.event_id, "decline", None);
            return Ok(updated);
        }

        ensure_transition(current, RegistrationStatus::Registered)?;
        ensure_open(&event)?;

        let tickets = tickets_requested.unwrap_or(registration.purchased_tickets);
        validate_ticket_request(tickets)?;

        let prepared = self.forms.prepare_answers(&event, answers).await?;
        let user = self.db.require_user(registration.user_id).await?;

        let mut tx = self.pool.begin().await?;

        let held =
            RegistrationRepository::tickets_held_by_user(&mut *tx, user.id, event.id).await?;
        let held_elsewhere = held - registration.purchased_tickets as i64;
        check_personal_cap(event.max_tickets, held_elsewhere, tickets)?;

        if !EventRepository::reserve_capacity(&mut *tx, event.id, tickets).await? {
            tx.rollback().await?;
            let fresh = self.db.require_event(event.id).await?;
            return Err(capacity_error(&fresh, tickets));
        }

        if tickets != registration.purchased_tickets {
            RegistrationRepository::set_purchased_tickets(&mut *tx, registration.id, tickets)
                .await?;
        }

        let updated = RegistrationRepository::transition(
            &mut *tx,
            registration.id,
            current,
            RegistrationStatus::Registered,
        )
        .await?;
        let Some(updated) = updated else {
            tx.rollback().await?;
            return Err(RollcallError::InvalidStateTransition {
                from: registration.status.clone(),
                to: RegistrationStatus::Registered.as_str().to_string(),
            });
        };

        if !prepared.is_empty() {
            FormRepository::insert_response(&mut *tx, updated.id, &prepared).await?;
        }

        tx.commit().await?;

        log_registration_action(updated.id, updated.event_id, "accept_invitation", None);

        let verify_url = format!(
            "{}/checkin/{}",
            self.settings.server.public_url, updated.qr_code
        );
        let image_url = crate::utils::helpers::qr_image_url(
            &self.settings.invitations.qr_image_base_url,
            &verify_url,
        );
        let manage_link = self
            .issue_private_token(user.id, event.id)
            .map(|token| format!("{}/invitations/{}", self.settings.server.public_url, token))
            .unwrap_or_default();
        let outcome = self
            .email
            .send_registration_confirmation(
                &user.email,
                &event.name,
                &format_timestamp(event.start_date),
                &updated.qr_code,
                &image_url,
                &manage_link,
            )
            .await;
        if !outcome.success {
            warn!(
                registration_id = updated.id,
                message = %outcome.message,
                "Confirmation email failed after invitation acceptance"
            );
        }

        Ok(updated)
    }

    /// Administrative revocation: delete the registration and its form
    /// response. Tickets a non-pending registration had taken out of
    /// capacity are returned inside the same transaction, so a subsequent
    /// re-invite of the same address succeeds.
    pub async fn revoke_invitation(&self, caller: &User, registration_id: i64) -> Result<()> {
        let registration = self.db.require_registration(registration_id).await?;
        let event = self.db.require_event(registration.event_id).await?;
        self.auth.require_event_manager(caller, &event)?;

        let current = parse_status(&registration)?;

        let mut tx = self.pool.begin().await?;

        if current.consumes_capacity() {
            EventRepository::release_capacity(&mut *tx, event.id, registration.purchased_tickets)
                .await?;
        }

        let deleted = RegistrationRepository::delete(&mut *tx, registration.id).await?;
        if deleted == 0 {
            tx.rollback().await?;
            return Err(RollcallError::RegistrationNotFound { registration_id });
        }

        tx.commit().await?;

        log_registration_action(registration.id, event.id, "revoke", None);
        Ok(())
    }
}

/// Issue a private token: a reversible, signed encoding of a (user, event)
/// pair used for standing personalized links
pub fn issue_private_token(
    secret: &str,
    user_id: i64,
    event_id: i64,
    ttl_days: i64,
) -> Result<String> {
    let claims = InviteClaims {
        sub: user_id,
        event_id,
        exp: (Utc::now() + chrono::Duration::days(ttl_days)).timestamp(),
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

/// Classify an incoming token: anything that verifies against our secret is
/// a private (user, event) token, everything else is opaque
pub fn classify_token(secret: &str, token: &str) -> TokenKind {
    let decoded = decode::<InviteClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    );

    match decoded {
        Ok(data) => TokenKind::Private {
            user_id: data.claims.sub,
            event_id: data.claims.event_id,
        },
        Err(_) => TokenKind::Public(token.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "invite-secret";

    #[test]
    fn test_private_token_round_trip() {
        let token = issue_private_token(SECRET, 7, 42, 30).unwrap();

        assert_eq!(
            classify_token(SECRET, &token),
            TokenKind::Private {
                user_id: 7,
                event_id: 42
            }
        );
    }

    #[test]
    fn test_opaque_strings_classify_as_public() {
        assert_eq!(
            classify_token(SECRET, "a1b2c3d4"),
            TokenKind::Public("a1b2c3d4".to_string())
        );
    }

    #[test]
    fn test_token_signed_with_other_secret_is_public() {
        let token = issue_private_token("different", 7, 42, 30).unwrap();
        assert!(matches!(classify_token(SECRET, &token), TokenKind::Public(_)));
    }

    #[test]
    fn test_expired_private_token_is_not_private() {
        let token = issue_private_token(SECRET, 7, 42, -1).unwrap();
        assert!(matches!(classify_token(SECRET, &token), TokenKind::Public(_)));
    }
}
