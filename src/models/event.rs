//! Event model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Event {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub agenda: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub capacity: i32,
    /// Per-person ticket cap, aggregated across a user's registrations
    pub max_tickets: i32,
    /// Denormalized count of tickets still available
    pub remaining_capacity: i32,
    pub status: String,
    pub archived: bool,
    /// Standing, non-personalized invite code for anonymous self-registration
    pub public_invite_code: String,
    pub organizer_id: i64,
    pub requires_signature: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateEventRequest {
    pub name: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub agenda: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub capacity: i32,
    pub max_tickets: i32,
    pub requires_signature: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateEventRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub agenda: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub capacity: Option<i32>,
    pub max_tickets: Option<i32>,
    pub status: Option<String>,
    pub requires_signature: Option<bool>,
}

/// Filters for the paginated event listing
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventFilter {
    /// Free-text search across name, description and location
    pub search: Option<String>,
    pub organizer_id: Option<i64>,
    pub status: Option<String>,
    pub location: Option<String>,
    pub archived: Option<bool>,
    pub min_capacity: Option<i32>,
    pub max_capacity: Option<i32>,
    pub starts_after: Option<DateTime<Utc>>,
    pub starts_before: Option<DateTime<Utc>>,
    pub ends_after: Option<DateTime<Utc>>,
    pub ends_before: Option<DateTime<Utc>>,
    pub created_after: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
    pub updated_after: Option<DateTime<Utc>>,
    pub updated_before: Option<DateTime<Utc>>,
    pub has_available_spots: Option<bool>,
    pub is_upcoming: Option<bool>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct Pagination {
    pub page: usize,
    pub page_size: usize,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 20,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventStatus {
    Draft,
    Upcoming,
    Ongoing,
    Ended,
    Cancelled,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Draft => "DRAFT",
            EventStatus::Upcoming => "UPCOMING",
            EventStatus::Ongoing => "ONGOING",
            EventStatus::Ended => "ENDED",
            EventStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "DRAFT" => Some(EventStatus::Draft),
            "UPCOMING" => Some(EventStatus::Upcoming),
            "ONGOING" => Some(EventStatus::Ongoing),
            "ENDED" => Some(EventStatus::Ended),
            "CANCELLED" => Some(EventStatus::Cancelled),
            _ => None,
        }
    }

    pub fn all() -> [EventStatus; 5] {
        [
            EventStatus::Draft,
            EventStatus::Upcoming,
            EventStatus::Ongoing,
            EventStatus::Ended,
            EventStatus::Cancelled,
        ]
    }
}

impl std::fmt::Display for EventStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Event {
    pub fn status(&self) -> Option<EventStatus> {
        EventStatus::parse(&self.status)
    }

    /// Whether new registrations and invitations are accepted at all.
    /// Cancelled or archived events are inert; ended events no longer take
    /// registrations either.
    pub fn accepts_registrations(&self) -> bool {
        !self.archived
            && !matches!(
                self.status(),
                Some(EventStatus::Cancelled) | Some(EventStatus::Ended) | None
            )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample_event(status: &str, archived: bool) -> Event {
        Event {
            id: 1,
            name: "Launch party".to_string(),
            description: None,
            location: None,
            agenda: None,
            start_date: Utc::now(),
            end_date: Utc::now(),
            capacity: 100,
            max_tickets: 2,
            remaining_capacity: 100,
            status: status.to_string(),
            archived,
            public_invite_code: "pub-code".to_string(),
            organizer_id: 1,
            requires_signature: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_cancelled_and_archived_events_are_inert() {
        assert!(sample_event("UPCOMING", false).accepts_registrations());
        assert!(sample_event("ONGOING", false).accepts_registrations());
        assert!(!sample_event("CANCELLED", true).accepts_registrations());
        assert!(!sample_event("ENDED", false).accepts_registrations());
        assert!(!sample_event("UPCOMING", true).accepts_registrations());
    }

    #[test]
    fn test_unknown_status_is_inert() {
        assert!(!sample_event("MYSTERY", false).accepts_registrations());
    }
}
