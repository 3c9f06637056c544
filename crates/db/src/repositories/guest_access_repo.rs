//! Repository for the `proof_guest_access` table.

use sqlx::PgPool;

use proofdesk_core::types::DbId;

use crate::models::guest_access::{CreateGuestAccess, ProofGuestAccess};

const COLUMNS: &str = "id, proof_id, email, name, access_token, pin_hash, expires_at, \
    accessed_at, revoked_at, created_at, updated_at";

/// Provides operations for guest access grants.
pub struct GuestAccessRepo;

impl GuestAccessRepo {
    /// Insert a new grant, returning the created row.
    pub async fn create<'e, E>(
        executor: E,
        input: &CreateGuestAccess,
    ) -> Result<ProofGuestAccess, sqlx::Error>
    where
        E: sqlx::PgExecutor<'e>,
    {
        let query = format!(
            "INSERT INTO proof_guest_access
                (proof_id, email, name, access_token, pin_hash, expires_at)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ProofGuestAccess>(&query)
            .bind(input.proof_id)
            .bind(&input.email)
            .bind(&input.name)
            .bind(&input.access_token)
            .bind(&input.pin_hash)
            .bind(input.expires_at)
            .fetch_one(executor)
            .await
    }

    /// Find a grant by its URL access token.
    pub async fn find_by_token(
        pool: &PgPool,
        access_token: &str,
    ) -> Result<Option<ProofGuestAccess>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM proof_guest_access WHERE access_token = $1");
        sqlx::query_as::<_, ProofGuestAccess>(&query)
            .bind(access_token)
            .fetch_optional(pool)
            .await
    }

    /// List all grants for a proof, newest first.
    pub async fn list_for_proof(
        pool: &PgPool,
        proof_id: DbId,
    ) -> Result<Vec<ProofGuestAccess>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM proof_guest_access
             WHERE proof_id = $1
             ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, ProofGuestAccess>(&query)
            .bind(proof_id)
            .fetch_all(pool)
            .await
    }

    /// Count grants for a proof that are currently active: not revoked and
    /// not past their expiry. Evaluated against the database clock so the
    /// predicate is never cached.
    pub async fn count_active_for_proof(
        pool: &PgPool,
        proof_id: DbId,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM proof_guest_access
             WHERE proof_id = $1
               AND revoked_at IS NULL
               AND (expires_at IS NULL OR expires_at > NOW())",
        )
        .bind(proof_id)
        .fetch_one(pool)
        .await
    }

    /// Stamp the first successful PIN verification. Later unlocks leave the
    /// original timestamp in place.
    pub async fn mark_accessed(pool: &PgPool, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE proof_guest_access
             SET accessed_at = NOW(), updated_at = NOW()
             WHERE id = $1 AND accessed_at IS NULL",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Revoke a grant. Returns `true` if the row was updated. Terminal.
    pub async fn revoke(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE proof_guest_access
             SET revoked_at = NOW(), updated_at = NOW()
             WHERE id = $1 AND revoked_at IS NULL",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
