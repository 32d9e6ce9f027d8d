//! User repository implementation

use chrono::Utc;
use sqlx::PgPool;

use crate::models::user::{CreateUserRequest, UpdateUserRequest, User};
use crate::utils::errors::RollcallError;

const USER_COLUMNS: &str =
    "id, email, name, phone, company, title, role, password_hash, created_at";

#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new user. Emails are stored lower-cased.
    pub async fn create(&self, request: CreateUserRequest) -> Result<User, RollcallError> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (email, name, phone, company, title, role, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(request.email.to_lowercase())
        .bind(request.name)
        .bind(request.phone)
        .bind(request.company)
        .bind(request.title)
        .bind(request.role.unwrap_or_else(|| "ATTENDEE".to_string()))
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    /// Find user by ID
    pub async fn find_by_id(&self, id: i64) -> Result<Option<User>, RollcallError> {
        let user =
            sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(user)
    }

    /// Find user by email (case-insensitive)
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, RollcallError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email.to_lowercase())
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Find an existing user by email or create an attendee account on the fly.
    ///
    /// Invitee accounts created here carry no password hash; the invitee sets
    /// one when they first sign in.
    pub async fn find_or_create_by_email(
        &self,
        email: &str,
        name: Option<String>,
        phone: Option<String>,
    ) -> Result<User, RollcallError> {
        if let Some(existing) = self.find_by_email(email).await? {
            return Ok(existing);
        }

        self.create(CreateUserRequest {
            email: email.to_string(),
            name,
            phone,
            company: None,
            title: None,
            role: None,
        })
        .await
    }

    /// Update user profile fields
    pub async fn update(
        &self,
        id: i64,
        request: UpdateUserRequest,
    ) -> Result<User, RollcallError> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET name = COALESCE($2, name),
                phone = COALESCE($3, phone),
                company = COALESCE($4, company),
                title = COALESCE($5, title),
                role = COALESCE($6, role)
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(request.name)
        .bind(request.phone)
        .bind(request.company)
        .bind(request.title)
        .bind(request.role)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    /// List users with pagination
    pub async fn list(&self, limit: i64, offset: i64) -> Result<Vec<User>, RollcallError> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC LIMIT $1 OFFSET $2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    /// Count total users
    pub async fn count(&self) -> Result<i64, RollcallError> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        Ok(count.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_user_repository_creation() {
        // This would require a test database setup
        // For now, just test that the repository can be created
        let pool = PgPool::connect("postgresql://test").await;
        if let Ok(pool) = pool {
            let repo = UserRepository::new(pool);
            assert!(!repo.pool.is_closed());
        }
    }
}
