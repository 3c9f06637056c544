//! Proof version entity model.

use serde::Serialize;
use sqlx::FromRow;

use proofdesk_core::types::{DbId, Timestamp};

/// One uploaded file revision of a proof. Immutable once created; ordered
/// by `created_at`, the most recent row being the "latest version".
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ProofVersion {
    pub id: DbId,
    pub proof_id: DbId,
    pub storage_key: String,
    pub original_filename: String,
    pub mime_type: Option<String>,
    pub file_size: Option<i64>,
    pub uploaded_by_user_id: Option<DbId>,
    pub created_at: Timestamp,
}

/// DTO for recording an uploaded file revision.
#[derive(Debug)]
pub struct CreateProofVersion {
    pub proof_id: DbId,
    pub storage_key: String,
    pub original_filename: String,
    pub mime_type: Option<String>,
    pub file_size: Option<i64>,
    pub uploaded_by_user_id: Option<DbId>,
}
