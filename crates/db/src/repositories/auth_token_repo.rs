//! Repository for the `customer_auth_tokens` table.

use chrono::{Duration, Utc};
use sqlx::PgPool;

use proofdesk_core::secrets::{generate_auth_token, hash_auth_token};
use proofdesk_core::status::TokenPurpose;
use proofdesk_core::types::DbId;

use crate::models::auth_token::CustomerAuthToken;

const COLUMNS: &str = "id, customer_id, token_hash, purpose, expires_at, consumed_at, \
    issued_by_user_id, created_at, updated_at";

/// Provides operations for customer invite/reset tokens.
pub struct AuthTokenRepo;

impl AuthTokenRepo {
    /// Issue a new token for the customer and purpose, returning the raw
    /// token (never persisted) and the created row.
    ///
    /// Every existing unconsumed token of the same purpose is marked
    /// consumed in the same transaction, so at most one token per
    /// (customer, purpose) is ever resolvable.
    pub async fn issue(
        pool: &PgPool,
        customer_id: DbId,
        purpose: TokenPurpose,
        hours_valid: i64,
        issued_by_user_id: Option<DbId>,
    ) -> Result<(String, CustomerAuthToken), sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query(
            "UPDATE customer_auth_tokens
             SET consumed_at = NOW(), updated_at = NOW()
             WHERE customer_id = $1 AND purpose = $2 AND consumed_at IS NULL",
        )
        .bind(customer_id)
        .bind(purpose.as_str())
        .execute(&mut *tx)
        .await?;

        let raw_token = generate_auth_token();
        let expires_at = Utc::now() + Duration::hours(hours_valid);

        let query = format!(
            "INSERT INTO customer_auth_tokens
                (customer_id, token_hash, purpose, expires_at, issued_by_user_id)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        let token = sqlx::query_as::<_, CustomerAuthToken>(&query)
            .bind(customer_id)
            .bind(hash_auth_token(&raw_token))
            .bind(purpose.as_str())
            .bind(expires_at)
            .bind(issued_by_user_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok((raw_token, token))
    }

    /// Resolve a presented raw token: hash it and match purpose, unconsumed,
    /// unexpired. A consumed or expired token is never resolvable.
    pub async fn find_by_raw(
        pool: &PgPool,
        raw_token: &str,
        purpose: TokenPurpose,
    ) -> Result<Option<CustomerAuthToken>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM customer_auth_tokens
             WHERE token_hash = $1
               AND purpose = $2
               AND consumed_at IS NULL
               AND expires_at > NOW()"
        );
        sqlx::query_as::<_, CustomerAuthToken>(&query)
            .bind(hash_auth_token(raw_token))
            .bind(purpose.as_str())
            .fetch_optional(pool)
            .await
    }

    /// The customer's currently active (unconsumed, unexpired) token of the
    /// given purpose, if any.
    pub async fn find_active(
        pool: &PgPool,
        customer_id: DbId,
        purpose: TokenPurpose,
    ) -> Result<Option<CustomerAuthToken>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM customer_auth_tokens
             WHERE customer_id = $1
               AND purpose = $2
               AND consumed_at IS NULL
               AND expires_at > NOW()
             ORDER BY created_at DESC, id DESC
             LIMIT 1"
        );
        sqlx::query_as::<_, CustomerAuthToken>(&query)
            .bind(customer_id)
            .bind(purpose.as_str())
            .fetch_optional(pool)
            .await
    }

    /// The most recently issued token of the given purpose regardless of
    /// state, for invite-status summaries.
    pub async fn find_latest(
        pool: &PgPool,
        customer_id: DbId,
        purpose: TokenPurpose,
    ) -> Result<Option<CustomerAuthToken>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM customer_auth_tokens
             WHERE customer_id = $1 AND purpose = $2
             ORDER BY created_at DESC, id DESC
             LIMIT 1"
        );
        sqlx::query_as::<_, CustomerAuthToken>(&query)
            .bind(customer_id)
            .bind(purpose.as_str())
            .fetch_optional(pool)
            .await
    }

    /// Consume a token. Happens exactly once, at the moment the customer
    /// successfully sets a password through it.
    pub async fn consume<'e, E>(executor: E, id: DbId) -> Result<bool, sqlx::Error>
    where
        E: sqlx::PgExecutor<'e>,
    {
        let result = sqlx::query(
            "UPDATE customer_auth_tokens
             SET consumed_at = NOW(), updated_at = NOW()
             WHERE id = $1 AND consumed_at IS NULL",
        )
        .bind(id)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
