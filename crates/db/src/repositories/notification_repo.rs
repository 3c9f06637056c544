//! Repository for the `customer_notifications` table.

use sqlx::PgPool;

use proofdesk_core::status::NotificationStatus;
use proofdesk_core::types::DbId;

use crate::models::notification::{CreateNotification, CustomerNotification};

const COLUMNS: &str = "id, proof_id, proof_version_id, customer_id, sent_by_user_id, \
    smtp_user_id, subject, body, body_html, recipient_email, sender_email, reply_to_email, \
    status, error_message, queued_at, sent_at, created_at, updated_at";

/// Longest error message persisted onto a failed notification.
const MAX_ERROR_LENGTH: usize = 500;

/// Provides operations for durable notification records.
pub struct NotificationRepo;

impl NotificationRepo {
    /// Insert a notification in `queued` state, returning the created row.
    pub async fn create(
        pool: &PgPool,
        input: &CreateNotification,
    ) -> Result<CustomerNotification, sqlx::Error> {
        let query = format!(
            "INSERT INTO customer_notifications
                (proof_id, proof_version_id, customer_id, sent_by_user_id, smtp_user_id,
                 subject, body, body_html, recipient_email, sender_email, reply_to_email)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, CustomerNotification>(&query)
            .bind(input.proof_id)
            .bind(input.proof_version_id)
            .bind(input.customer_id)
            .bind(input.sent_by_user_id)
            .bind(input.smtp_user_id)
            .bind(&input.subject)
            .bind(&input.body)
            .bind(&input.body_html)
            .bind(&input.recipient_email)
            .bind(&input.sender_email)
            .bind(&input.reply_to_email)
            .fetch_one(pool)
            .await
    }

    /// Find a notification by id.
    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<CustomerNotification>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM customer_notifications WHERE id = $1");
        sqlx::query_as::<_, CustomerNotification>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Transition a queued notification to `sent`.
    pub async fn mark_sent(pool: &PgPool, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE customer_notifications
             SET status = $2, sent_at = NOW(), error_message = NULL, updated_at = NOW()
             WHERE id = $1",
        )
        .bind(id)
        .bind(NotificationStatus::Sent.as_str())
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Transition a queued notification to `failed`, recording a truncated
    /// error message.
    pub async fn mark_failed(pool: &PgPool, id: DbId, error: &str) -> Result<(), sqlx::Error> {
        let truncated: String = error.chars().take(MAX_ERROR_LENGTH).collect();
        sqlx::query(
            "UPDATE customer_notifications
             SET status = $2, error_message = $3, updated_at = NOW()
             WHERE id = $1",
        )
        .bind(id)
        .bind(NotificationStatus::Failed.as_str())
        .bind(truncated)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// List a proof's notifications, newest first.
    pub async fn list_for_proof(
        pool: &PgPool,
        proof_id: DbId,
    ) -> Result<Vec<CustomerNotification>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM customer_notifications
             WHERE proof_id = $1
             ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, CustomerNotification>(&query)
            .bind(proof_id)
            .fetch_all(pool)
            .await
    }
}
