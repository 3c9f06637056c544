//! Repository for the `proof_versions` table.

use sqlx::PgPool;

use proofdesk_core::types::DbId;

use crate::models::proof_version::{CreateProofVersion, ProofVersion};

const COLUMNS: &str = "id, proof_id, storage_key, original_filename, mime_type, file_size, \
    uploaded_by_user_id, created_at";

/// Provides CRUD operations for proof file versions.
pub struct ProofVersionRepo;

impl ProofVersionRepo {
    /// Insert a new version row, returning the created row.
    pub async fn create<'e, E>(
        executor: E,
        input: &CreateProofVersion,
    ) -> Result<ProofVersion, sqlx::Error>
    where
        E: sqlx::PgExecutor<'e>,
    {
        let query = format!(
            "INSERT INTO proof_versions
                (proof_id, storage_key, original_filename, mime_type, file_size, uploaded_by_user_id)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ProofVersion>(&query)
            .bind(input.proof_id)
            .bind(&input.storage_key)
            .bind(&input.original_filename)
            .bind(&input.mime_type)
            .bind(input.file_size)
            .bind(input.uploaded_by_user_id)
            .fetch_one(executor)
            .await
    }

    /// List all versions of a proof, oldest first.
    pub async fn list_for_proof(
        pool: &PgPool,
        proof_id: DbId,
    ) -> Result<Vec<ProofVersion>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM proof_versions
             WHERE proof_id = $1
             ORDER BY created_at ASC, id ASC"
        );
        sqlx::query_as::<_, ProofVersion>(&query)
            .bind(proof_id)
            .fetch_all(pool)
            .await
    }

    /// The most recent version of a proof, if any.
    pub async fn latest_for_proof(
        pool: &PgPool,
        proof_id: DbId,
    ) -> Result<Option<ProofVersion>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM proof_versions
             WHERE proof_id = $1
             ORDER BY created_at DESC, id DESC
             LIMIT 1"
        );
        sqlx::query_as::<_, ProofVersion>(&query)
            .bind(proof_id)
            .fetch_optional(pool)
            .await
    }

    /// Count the versions uploaded for a proof.
    pub async fn count_for_proof(pool: &PgPool, proof_id: DbId) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM proof_versions WHERE proof_id = $1")
            .bind(proof_id)
            .fetch_one(pool)
            .await
    }
}
