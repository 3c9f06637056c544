//! Customer notification entity model and DTOs.

use serde::Serialize;
use sqlx::FromRow;

use proofdesk_core::types::{DbId, Timestamp};

/// A durable record of one queued/sent email to a customer tied to a proof.
///
/// Created in `queued` state synchronously within the triggering request's
/// transaction; the mailer worker moves it to `sent` or `failed`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CustomerNotification {
    pub id: DbId,
    pub proof_id: DbId,
    pub proof_version_id: Option<DbId>,
    pub customer_id: DbId,
    /// The staff user that triggered the send.
    pub sent_by_user_id: Option<DbId>,
    /// The staff user whose SMTP credentials deliver it (may differ).
    pub smtp_user_id: Option<DbId>,
    pub subject: String,
    pub body: String,
    pub body_html: Option<String>,
    pub recipient_email: String,
    pub sender_email: Option<String>,
    pub reply_to_email: Option<String>,
    /// `"queued"`, `"sent"`, or `"failed"`.
    pub status: String,
    pub error_message: Option<String>,
    pub queued_at: Timestamp,
    pub sent_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for recording a queued notification.
#[derive(Debug)]
pub struct CreateNotification {
    pub proof_id: DbId,
    pub proof_version_id: Option<DbId>,
    pub customer_id: DbId,
    pub sent_by_user_id: Option<DbId>,
    pub smtp_user_id: Option<DbId>,
    pub subject: String,
    pub body: String,
    pub body_html: Option<String>,
    pub recipient_email: String,
    pub sender_email: Option<String>,
    pub reply_to_email: Option<String>,
}
