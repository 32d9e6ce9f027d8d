//! Authentication and authorization service
//!
//! Identity itself is externalized: callers present a signed bearer token
//! carrying their user id and role. This service verifies tokens and
//! performs the role checks the workflows require before any side effect.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::settings::Settings;
use crate::models::event::Event;
use crate::models::user::{User, UserRole};
use crate::utils::errors::{Result, RollcallError};

/// Claims carried by an identity token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: i64,
    pub role: String,
    pub exp: i64,
}

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    settings: Settings,
}

impl AuthService {
    /// Create a new AuthService instance
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    /// Issue an identity token for a user
    pub fn issue_token(&self, user: &User) -> Result<String> {
        let claims = Claims {
            sub: user.id,
            role: user.role.clone(),
            exp: (Utc::now() + Duration::hours(self.settings.auth.token_ttl_hours)).timestamp(),
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.settings.auth.token_secret.as_bytes()),
        )?;

        Ok(token)
    }

    /// Verify an identity token and return its claims
    pub fn verify_token(&self, token: &str) -> Result<Claims> {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.settings.auth.token_secret.as_bytes()),
            &Validation::default(),
        )?;

        Ok(data.claims)
    }

    /// Check that the caller holds one of the allowed roles
    pub fn require_role(&self, user: &User, allowed: &[UserRole]) -> Result<()> {
        let role = user.role();
        if allowed.contains(&role) {
            debug!(user_id = user.id, role = %role, "Role check passed");
            Ok(())
        } else {
            warn!(user_id = user.id, role = %role, "Unauthorized access attempt");
            Err(RollcallError::PermissionDenied(format!(
                "Requires one of roles: {}",
                allowed
                    .iter()
                    .map(|r| r.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            )))
        }
    }

    /// Check that the caller is a door guard or an admin
    pub fn require_guard(&self, user: &User) -> Result<()> {
        self.require_role(user, &[UserRole::Guard, UserRole::Admin])
    }

    /// Check that the caller may create events
    pub fn require_organizer(&self, user: &User) -> Result<()> {
        self.require_role(user, &[UserRole::Organizer, UserRole::Admin])
    }

    /// Check that the caller owns the event or is an admin
    pub fn require_event_manager(&self, user: &User, event: &Event) -> Result<()> {
        if user.role() == UserRole::Admin || event.organizer_id == user.id {
            debug!(user_id = user.id, event_id = event.id, "Event manager check passed");
            Ok(())
        } else {
            warn!(
                user_id = user.id,
                event_id = event.id,
                "Unauthorized event management attempt"
            );
            Err(RollcallError::PermissionDenied(
                "Only the event's organizer or an admin may do this".to_string(),
            ))
        }
    }
}
