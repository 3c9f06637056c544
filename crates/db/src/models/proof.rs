//! Proof entity model and DTOs.

use serde::Serialize;
use sqlx::FromRow;

use proofdesk_core::types::{DbId, Timestamp};

/// A row from the `proofs` table: one unit of work under review.
///
/// `status` transitions only via a recorded decision (approved/declined) or
/// a new-version upload (back to pending).
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Proof {
    pub id: DbId,
    /// Stable external identifier used in share links.
    pub share_id: String,
    pub job_name: String,
    pub notes: Option<String>,
    pub status: String,
    pub designer_id: Option<DbId>,
    pub customer_id: Option<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a proof.
#[derive(Debug)]
pub struct CreateProof {
    pub share_id: String,
    pub job_name: String,
    pub notes: Option<String>,
    pub designer_id: Option<DbId>,
    pub customer_id: Option<DbId>,
}
