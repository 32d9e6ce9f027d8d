//! Data models module
//!
//! This module contains all data structures used throughout the application

pub mod event;
pub mod form;
pub mod registration;
pub mod user;

// Re-export commonly used models
pub use event::{
    CreateEventRequest, Event, EventFilter, EventStatus, Pagination, UpdateEventRequest,
};
pub use form::{
    EventForm, FieldDefinition, FieldResponse, FieldType, FormField, FormResponse, ValidationRules,
};
pub use registration::{CreateRegistrationRequest, Registration, RegistrationStatus};
pub use user::{CreateUserRequest, UpdateUserRequest, User, UserRole};
