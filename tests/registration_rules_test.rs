//! Workflow-level tests for registration capacity rules and the status
//! machine.

use assert_matches::assert_matches;
use chrono::Utc;

use rollcall::models::event::Event;
use rollcall::models::registration::RegistrationStatus;
use rollcall::services::registration::{
    capacity_error, check_personal_cap, validate_ticket_request,
};
use rollcall::utils::errors::RollcallError;

fn event(capacity: i32, remaining: i32, max_tickets: i32) -> Event {
    Event {
        id: 1,
        name: "Annual conference".to_string(),
        description: None,
        location: Some("Main hall".to_string()),
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
fn non_positive_ticket_requests_are_validation_errors() {
    for bad in [0, -1, -100] {
        assert_matches!(
            validate_ticket_request(bad),
            Err(RollcallError::Validation(errors)) if errors.contains_key("tickets")
        );
    }
    assert!(validate_ticket_request(1).is_ok());
    assert!(validate_ticket_request(10).is_ok());
}

#[test]
fn per_person_cap_aggregates_across_registrations() {
    // maxTickets=2: a user holding one ticket may take exactly one more
    assert!(check_personal_cap(2, 1, 1).is_ok());
    assert_matches!(
        check_personal_cap(2, 1, 2),
        Err(RollcallError::TicketLimitExceeded {
            limit: 2,
            current: 1,
            requested: 2
        })
    );
    // a fresh user may take up to the cap at once
    assert!(check_personal_cap(2, 0, 2).is_ok());
    assert!(check_personal_cap(2, 0, 3).is_err());
}

#[test]
fn capacity_error_message_names_limit_and_current_count() {
    // capacity=5 with all 5 tickets taken, one more requested
    let err = capacity_error(&event(5, 0, 2), 1);
    let message = err.to_string();
    assert!(message.contains("5 of 5"), "got: {message}");
    assert!(message.contains("1 more requested"), "got: {message}");
}

#[test]
fn successful_self_registration_scenario_passes_all_guards() {
    // capacity=100, remaining=100, maxTickets=2, user requests 2 tickets
    let event = event(100, 100, 2);
    assert!(validate_ticket_request(2).is_ok());
    assert!(check_personal_cap(event.max_tickets, 0, 2).is_ok());
    assert!(event.remaining_capacity >= 2);
    assert!(event.accepts_registrations());
}

#[test]
fn checked_in_registrations_never_move_backward() {
    use RegistrationStatus::*;
    for target in [Pending, Registered, Waitlisted, Cancelled, Declined] {
        assert!(
            !CheckedIn.can_transition_to(target),
            "CHECKED_IN must not move to {target}"
        );
    }
    // and re-checking-in is not a transition either
    assert!(!CheckedIn.can_transition_to(CheckedIn));
}

#[test]
fn lifecycle_follows_invitation_response_checkin() {
    use RegistrationStatus::*;
    assert!(Pending.can_transition_to(Registered));
    assert!(Registered.can_transition_to(CheckedIn));
    assert!(Pending.can_transition_to(Declined));
    assert!(Pending.can_transition_to(Cancelled));
    // walk-ins check in straight from pending
    assert!(Pending.can_transition_to(CheckedIn));
    // waitlist promotion passes back through REGISTERED
    assert!(Waitlisted.can_transition_to(Registered));
    assert!(!Waitlisted.can_transition_to(CheckedIn));
}

#[test]
fn terminal_states_stay_terminal() {
    use RegistrationStatus::*;
    for terminal in [Cancelled, Declined] {
        for target in [Pending, Registered, Waitlisted, CheckedIn, Cancelled, Declined] {
            assert!(!terminal.can_transition_to(target));
        }
    }
}

#[test]
fn capacity_accounting_matches_status_semantics() {
    use RegistrationStatus::*;
    // only confirmed attendance holds tickets out of event capacity
    assert!(Registered.consumes_capacity());
    assert!(CheckedIn.consumes_capacity());
    assert!(!Pending.consumes_capacity());
    assert!(!Waitlisted.consumes_capacity());
    assert!(!Cancelled.consumes_capacity());
    assert!(!Declined.consumes_capacity());

    // pending invitations still count toward the per-person cap
    assert!(Pending.is_active());
    assert!(Waitlisted.is_active());
    assert!(!Cancelled.is_active());
    assert!(!Declined.is_active());
}

#[test]
fn inert_events_reject_registration() {
    let mut cancelled = event(10, 10, 2);
    cancelled.status = "CANCELLED".to_string();
    cancelled.archived = true;
    assert!(!cancelled.accepts_registrations());

    let mut ended = event(10, 10, 2);
    ended.status = "ENDED".to_string();
    assert!(!ended.accepts_registrations());

    assert!(event(10, 10, 2).accepts_registrations());
}
