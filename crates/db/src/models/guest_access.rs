//! Guest access grant entity model.

use chrono::Utc;
use serde::Serialize;
use sqlx::FromRow;

use proofdesk_core::types::{DbId, Timestamp};

/// A one-off reviewer grant for a proof: URL token plus out-of-band PIN.
///
/// The access token is the URL secret and is stored in clear; the PIN is
/// stored only as an Argon2 hash. There is no cached "active" flag -- the
/// predicate in [`is_active`](ProofGuestAccess::is_active) is re-evaluated
/// on every access attempt.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ProofGuestAccess {
    pub id: DbId,
    pub proof_id: DbId,
    pub email: String,
    pub name: Option<String>,
    pub access_token: String,
    #[serde(skip_serializing)]
    pub pin_hash: String,
    pub expires_at: Option<Timestamp>,
    /// Set on first successful PIN verification.
    pub accessed_at: Option<Timestamp>,
    /// Terminal once set.
    pub revoked_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl ProofGuestAccess {
    /// Active iff not revoked and (no expiry or expiry in the future).
    pub fn is_active(&self) -> bool {
        self.is_active_at(Utc::now())
    }

    /// [`is_active`](Self::is_active) evaluated against an explicit clock,
    /// for deterministic tests.
    pub fn is_active_at(&self, now: Timestamp) -> bool {
        if self.revoked_at.is_some() {
            return false;
        }
        match self.expires_at {
            Some(expires_at) => expires_at > now,
            None => true,
        }
    }
}

/// DTO for creating a guest access grant.
#[derive(Debug)]
pub struct CreateGuestAccess {
    pub proof_id: DbId,
    pub email: String,
    pub name: Option<String>,
    pub access_token: String,
    pub pin_hash: String,
    pub expires_at: Option<Timestamp>,
}
