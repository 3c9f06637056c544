//! Customer login audit event model.

use serde::Serialize;
use sqlx::FromRow;

use proofdesk_core::types::{DbId, Timestamp};

/// Append-only audit record of a customer login attempt.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CustomerLoginEvent {
    pub id: DbId,
    pub customer_id: DbId,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub successful: bool,
    pub occurred_at: Timestamp,
}
