//! Customer entity model, portal credential, and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use proofdesk_core::types::{DbId, Timestamp};

/// A row from the `customers` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Customer {
    pub id: DbId,
    pub name: String,
    pub company_name: Option<String>,
    pub email: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Portal login credential, 1:1 with a customer.
///
/// Contains the password hash -- never serialize to API responses.
#[derive(Debug, Clone, FromRow)]
pub struct CustomerCredential {
    pub customer_id: DbId,
    pub password_hash: String,
    pub last_login_at: Option<Timestamp>,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a customer.
#[derive(Debug, Deserialize)]
pub struct CreateCustomer {
    pub name: String,
    pub company_name: Option<String>,
    pub email: String,
}
