//! Customer auth token entity model (invite / reset).

use sqlx::FromRow;

use proofdesk_core::types::{DbId, Timestamp};

/// A single-use hashed bearer token for customer self-service flows.
///
/// Only the SHA-256 hash of the raw token is stored; the raw value is
/// returned to the caller exactly once at issuance, for the emailed link.
#[derive(Debug, Clone, FromRow)]
pub struct CustomerAuthToken {
    pub id: DbId,
    pub customer_id: DbId,
    pub token_hash: String,
    /// `"invite"` or `"reset"`.
    pub purpose: String,
    pub expires_at: Timestamp,
    /// Set exactly once, when the customer completes the flow.
    pub consumed_at: Option<Timestamp>,
    pub issued_by_user_id: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
