//! Staff user entity model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use proofdesk_core::types::{DbId, Timestamp};

/// Full staff user row from the `users` table.
///
/// Contains the password hash and SMTP credentials -- NEVER serialize this
/// to API responses directly. Use [`UserResponse`] for external output.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: DbId,
    pub email: String,
    pub name: String,
    pub password_hash: String,
    /// `"admin"` or `"designer"`.
    pub role: String,
    pub is_active: bool,
    pub smtp_host: Option<String>,
    pub smtp_port: Option<i32>,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    pub smtp_use_tls: bool,
    pub smtp_use_ssl: bool,
    pub smtp_sender: Option<String>,
    pub smtp_reply_to: Option<String>,
    pub smtp_last_test_status: Option<String>,
    pub smtp_last_test_at: Option<Timestamp>,
    pub smtp_last_error: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl User {
    /// True when this user carries a complete custom SMTP transport
    /// configuration (host and port at minimum).
    pub fn has_smtp_config(&self) -> bool {
        self.smtp_host.as_deref().is_some_and(|h| !h.is_empty()) && self.smtp_port.is_some()
    }
}

/// Safe staff user representation for API responses.
#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: DbId,
    pub email: String,
    pub name: String,
    pub role: String,
    pub is_active: bool,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            role: user.role,
            is_active: user.is_active,
        }
    }
}

/// DTO for creating a new staff user.
#[derive(Debug, Deserialize)]
pub struct CreateUser {
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub role: String,
}
