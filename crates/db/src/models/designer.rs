//! Designer profile entity model.

use serde::Serialize;
use sqlx::FromRow;

use proofdesk_core::types::{DbId, Timestamp};

/// A row from the `designers` table. Owned 1:1 by a staff user.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Designer {
    pub id: DbId,
    pub user_id: DbId,
    pub display_name: String,
    pub email: String,
    pub reply_to_email: Option<String>,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a designer profile.
#[derive(Debug)]
pub struct CreateDesigner {
    pub user_id: DbId,
    pub display_name: String,
    pub email: String,
    pub reply_to_email: Option<String>,
}
