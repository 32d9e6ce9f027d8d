//! Registration model and status machine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Registration {
    pub id: i64,
    pub event_id: i64,
    pub user_id: i64,
    pub qr_code: String,
    pub status: String,
    pub purchased_tickets: i32,
    #[serde(skip_serializing)]
    pub invite_token: Option<String>,
    pub invited_at: Option<DateTime<Utc>>,
    pub responded_at: Option<DateTime<Utc>>,
    pub registered_at: Option<DateTime<Utc>>,
    pub checked_in_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateRegistrationRequest {
    pub event_id: i64,
    pub user_id: i64,
    pub qr_code: String,
    pub status: RegistrationStatus,
    pub purchased_tickets: i32,
    pub invite_token: Option<String>,
    pub invited_at: Option<DateTime<Utc>>,
    pub registered_at: Option<DateTime<Utc>>,
    pub checked_in_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegistrationStatus {
    Pending,
    Registered,
    Waitlisted,
    CheckedIn,
    Cancelled,
    Declined,
}

impl RegistrationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegistrationStatus::Pending => "PENDING",
            RegistrationStatus::Registered => "REGISTERED",
            RegistrationStatus::Waitlisted => "WAITLISTED",
            RegistrationStatus::CheckedIn => "CHECKED_IN",
            RegistrationStatus::Cancelled => "CANCELLED",
            RegistrationStatus::Declined => "DECLINED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(RegistrationStatus::Pending),
            "REGISTERED" => Some(RegistrationStatus::Registered),
            "WAITLISTED" => Some(RegistrationStatus::Waitlisted),
            "CHECKED_IN" => Some(RegistrationStatus::CheckedIn),
            "CANCELLED" => Some(RegistrationStatus::Cancelled),
            "DECLINED" => Some(RegistrationStatus::Declined),
            _ => None,
        }
    }

    /// Transition table for the registration lifecycle.
    ///
    /// Transitions are monotonic: CHECKED_IN, CANCELLED and DECLINED are
    /// terminal, backward moves are never allowed. Administrative revocation
    /// is a delete, not a transition.
    pub fn can_transition_to(self, to: RegistrationStatus) -> bool {
        use RegistrationStatus::*;
        matches!(
            (self, to),
            (Pending, Registered)
                | (Pending, CheckedIn)
                | (Pending, Waitlisted)
                | (Pending, Cancelled)
                | (Pending, Declined)
                | (Registered, CheckedIn)
                | (Registered, Cancelled)
                | (Waitlisted, Registered)
                | (Waitlisted, Cancelled)
        )
    }

    /// Statuses whose tickets count toward the per-person cap
    pub fn is_active(self) -> bool {
        !matches!(
            self,
            RegistrationStatus::Cancelled | RegistrationStatus::Declined
        )
    }

    /// Statuses whose tickets have been taken out of the event's
    /// remaining capacity
    pub fn consumes_capacity(self) -> bool {
        matches!(
            self,
            RegistrationStatus::Registered | RegistrationStatus::CheckedIn
        )
    }
}

impl std::fmt::Display for RegistrationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Registration {
    pub fn status(&self) -> Option<RegistrationStatus> {
        RegistrationStatus::parse(&self.status)
    }
}

#[cfg(test)]
mod tests {
    use super::RegistrationStatus::*;

    #[test]
    fn test_forward_transitions_allowed() {
        assert!(Pending.can_transition_to(Registered));
        assert!(Pending.can_transition_to(Declined));
        assert!(Pending.can_transition_to(Waitlisted));
        assert!(Registered.can_transition_to(CheckedIn));
        assert!(Waitlisted.can_transition_to(Registered));
    }

    #[test]
    fn test_checked_in_is_terminal() {
        for target in [Pending, Registered, Waitlisted, CheckedIn, Cancelled, Declined] {
            assert!(!CheckedIn.can_transition_to(target));
        }
    }

    #[test]
    fn test_no_backward_transitions() {
        assert!(!Registered.can_transition_to(Pending));
        assert!(!Cancelled.can_transition_to(Registered));
        assert!(!Declined.can_transition_to(Pending));
    }

    #[test]
    fn test_capacity_accounting_statuses() {
        assert!(Registered.consumes_capacity());
        assert!(CheckedIn.consumes_capacity());
        assert!(!Pending.consumes_capacity());
        assert!(!Waitlisted.consumes_capacity());

        assert!(Pending.is_active());
        assert!(!Cancelled.is_active());
        assert!(!Declined.is_active());
    }
}
