//! Decision entity model.

use serde::Serialize;
use sqlx::FromRow;

use proofdesk_core::types::{DbId, Timestamp};

/// A client's approve/decline response to a proof. Append-only; the most
/// recent row is authoritative for current status display.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Decision {
    pub id: DbId,
    pub proof_id: DbId,
    pub proof_version_id: Option<DbId>,
    /// `"approved"` or `"declined"`.
    pub status: String,
    pub approver_name: Option<String>,
    pub client_comment: Option<String>,
    pub client_email: Option<String>,
    pub client_ip: Option<String>,
    pub created_at: Timestamp,
}

/// DTO for recording a decision.
#[derive(Debug)]
pub struct CreateDecision {
    pub proof_id: DbId,
    pub proof_version_id: Option<DbId>,
    pub status: String,
    pub approver_name: Option<String>,
    pub client_comment: Option<String>,
    pub client_email: Option<String>,
    pub client_ip: Option<String>,
}
