//! Repository for the `decisions` table.

use sqlx::PgPool;

use proofdesk_core::types::DbId;

use crate::models::decision::{CreateDecision, Decision};
use crate::repositories::ProofRepo;

const COLUMNS: &str = "id, proof_id, proof_version_id, status, approver_name, client_comment, \
    client_email, client_ip, created_at";

/// Provides operations for client decisions.
pub struct DecisionRepo;

impl DecisionRepo {
    /// Record a decision and update the proof status in one transaction.
    ///
    /// The proof status after commit always equals the decision's status.
    pub async fn record(pool: &PgPool, input: &CreateDecision) -> Result<Decision, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO decisions
                (proof_id, proof_version_id, status, approver_name, client_comment, client_email, client_ip)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {COLUMNS}"
        );
        let decision = sqlx::query_as::<_, Decision>(&query)
            .bind(input.proof_id)
            .bind(input.proof_version_id)
            .bind(&input.status)
            .bind(&input.approver_name)
            .bind(&input.client_comment)
            .bind(&input.client_email)
            .bind(&input.client_ip)
            .fetch_one(&mut *tx)
            .await?;

        ProofRepo::set_status(&mut *tx, input.proof_id, &input.status).await?;

        tx.commit().await?;
        Ok(decision)
    }

    /// List all decisions for a proof, oldest first.
    pub async fn list_for_proof(
        pool: &PgPool,
        proof_id: DbId,
    ) -> Result<Vec<Decision>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM decisions
             WHERE proof_id = $1
             ORDER BY created_at ASC, id ASC"
        );
        sqlx::query_as::<_, Decision>(&query)
            .bind(proof_id)
            .fetch_all(pool)
            .await
    }

    /// The most recent decision for a proof, if any. Authoritative for
    /// current status display.
    pub async fn latest_for_proof(
        pool: &PgPool,
        proof_id: DbId,
    ) -> Result<Option<Decision>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM decisions
             WHERE proof_id = $1
             ORDER BY created_at DESC, id DESC
             LIMIT 1"
        );
        sqlx::query_as::<_, Decision>(&query)
            .bind(proof_id)
            .fetch_optional(pool)
            .await
    }
}
