//! Repository for the `proofs` table.

use sqlx::PgPool;

use proofdesk_core::types::DbId;

use crate::models::proof::{CreateProof, Proof};

const COLUMNS: &str =
    "id, share_id, job_name, notes, status, designer_id, customer_id, created_at, updated_at";

/// Provides CRUD operations for proofs.
pub struct ProofRepo;

impl ProofRepo {
    /// Insert a new proof in `pending` state, returning the created row.
    pub async fn create<'e, E>(executor: E, input: &CreateProof) -> Result<Proof, sqlx::Error>
    where
        E: sqlx::PgExecutor<'e>,
    {
        let query = format!(
            "INSERT INTO proofs (share_id, job_name, notes, designer_id, customer_id)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Proof>(&query)
            .bind(&input.share_id)
            .bind(&input.job_name)
            .bind(&input.notes)
            .bind(input.designer_id)
            .bind(input.customer_id)
            .fetch_one(executor)
            .await
    }

    /// Find a proof by id.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Proof>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM proofs WHERE id = $1");
        sqlx::query_as::<_, Proof>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a proof by its external share id.
    pub async fn find_by_share_id(
        pool: &PgPool,
        share_id: &str,
    ) -> Result<Option<Proof>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM proofs WHERE share_id = $1");
        sqlx::query_as::<_, Proof>(&query)
            .bind(share_id)
            .fetch_optional(pool)
            .await
    }

    /// List a customer's proofs, most recently touched first.
    pub async fn list_for_customer(
        pool: &PgPool,
        customer_id: DbId,
    ) -> Result<Vec<Proof>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM proofs
             WHERE customer_id = $1
             ORDER BY updated_at DESC, created_at DESC"
        );
        sqlx::query_as::<_, Proof>(&query)
            .bind(customer_id)
            .fetch_all(pool)
            .await
    }

    /// Set a proof's status. Used only from decision recording and
    /// new-version upload, each within its own transaction.
    pub async fn set_status<'e, E>(
        executor: E,
        proof_id: DbId,
        status: &str,
    ) -> Result<(), sqlx::Error>
    where
        E: sqlx::PgExecutor<'e>,
    {
        sqlx::query("UPDATE proofs SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(proof_id)
            .bind(status)
            .execute(executor)
            .await?;
        Ok(())
    }
}
