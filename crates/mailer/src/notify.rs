//! Notification orchestration: durable records plus queued delivery.
//!
//! [`queue_customer_notification`] renders the operator templates, inserts
//! the `queued` notification row, and hands delivery to the queue. The
//! worker-side [`deliver_notification`] reloads the row, resolves the SMTP
//! identity, sends, and records the terminal `sent`/`failed` state.

use sqlx::PgPool;

use proofdesk_core::status::TokenPurpose;
use proofdesk_core::template::{render_notification, TemplateContext};
use proofdesk_core::types::DbId;
use proofdesk_db::models::customer::Customer;
use proofdesk_db::models::notification::{CreateNotification, CustomerNotification};
use proofdesk_db::models::proof::Proof;
use proofdesk_db::models::proof_version::ProofVersion;
use proofdesk_db::models::user::User;
use proofdesk_db::repositories::{NotificationRepo, UserRepo};

use crate::delivery::{send_email, MailerConfig, OutgoingEmail, SmtpIdentity};
use crate::queue::DeliveryQueue;

/// Error type for notification queueing.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// The customer has no email address to deliver to.
    #[error("Customer email is required to send notifications")]
    MissingRecipient,

    /// A database error while recording the notification.
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Everything needed to render and queue one customer notification.
pub struct NotificationRequest<'a> {
    pub proof: &'a Proof,
    pub proof_version: Option<&'a ProofVersion>,
    pub customer: &'a Customer,
    /// The staff user that triggered the send.
    pub uploader: Option<&'a User>,
    /// The staff user whose SMTP configuration delivers it (may differ).
    pub smtp_user: Option<&'a User>,
    pub designer_name: String,
    pub share_url: String,
    pub subject_template: Option<String>,
    pub body_template: Option<String>,
    pub sender_email: Option<String>,
    pub reply_to_email: Option<String>,
    pub invite_link: Option<String>,
}

/// Render, durably record, and queue a customer notification.
///
/// The row is committed in `queued` state before the job is enqueued, so a
/// lost job leaves a stale status rather than a lost notification.
pub async fn queue_customer_notification(
    pool: &PgPool,
    queue: &DeliveryQueue,
    config: &MailerConfig,
    request: NotificationRequest<'_>,
) -> Result<CustomerNotification, NotifyError> {
    if request.customer.email.trim().is_empty() {
        return Err(NotifyError::MissingRecipient);
    }

    let context = TemplateContext {
        customer_name: if request.customer.name.is_empty() {
            request.customer.email.clone()
        } else {
            request.customer.name.clone()
        },
        job_name: request.proof.job_name.clone(),
        proof_link: request.share_url.clone(),
        designer_name: request.designer_name.clone(),
        invite_link: request.invite_link.clone(),
        guest_pin: None,
    };
    let rendered = render_notification(
        request.subject_template.as_deref(),
        request.body_template.as_deref(),
        &context,
    );

    let notification = NotificationRepo::create(
        pool,
        &CreateNotification {
            proof_id: request.proof.id,
            proof_version_id: request.proof_version.map(|v| v.id),
            customer_id: request.customer.id,
            sent_by_user_id: request.uploader.map(|u| u.id),
            smtp_user_id: request.smtp_user.map(|u| u.id),
            subject: rendered.subject,
            body: rendered.body,
            body_html: rendered.html_body,
            recipient_email: request.customer.email.clone(),
            sender_email: request.sender_email.clone(),
            reply_to_email: request.reply_to_email.clone(),
        },
    )
    .await?;

    let meta = serde_json::json!({
        "notification_id": notification.id,
        "proof_id": request.proof.id,
        "customer_email": request.customer.email,
        "subject": notification.subject,
    });
    let worker_pool = pool.clone();
    let worker_config = config.clone();
    let notification_id = notification.id;
    queue.enqueue(meta, async move {
        deliver_notification(&worker_pool, &worker_config, notification_id).await
    });

    Ok(notification)
}

/// Worker entry point for sending one queued notification.
///
/// A transport failure is recorded on the row (`failed` + error message)
/// and does not bubble out of the job; only database errors do.
pub async fn deliver_notification(
    pool: &PgPool,
    config: &MailerConfig,
    notification_id: DbId,
) -> anyhow::Result<()> {
    let Some(notification) = NotificationRepo::find_by_id(pool, notification_id).await? else {
        tracing::warn!(notification_id, "Notification row vanished before delivery");
        return Ok(());
    };

    let identity = match notification.smtp_user_id {
        Some(user_id) => UserRepo::find_by_id(pool, user_id)
            .await?
            .as_ref()
            .and_then(SmtpIdentity::from_user),
        None => None,
    };

    let email = OutgoingEmail {
        subject: notification.subject.clone(),
        body: notification.body.clone(),
        html_body: notification.body_html.clone(),
        recipient: notification.recipient_email.clone(),
    };

    let result = send_email(
        config,
        identity.as_ref(),
        true,
        notification.sender_email.as_deref(),
        notification.reply_to_email.as_deref(),
        &email,
    )
    .await;

    match result {
        Ok(()) => NotificationRepo::mark_sent(pool, notification.id).await?,
        Err(error) => {
            NotificationRepo::mark_failed(pool, notification.id, &error.to_string()).await?;
        }
    }
    Ok(())
}

/// Queue a one-off email that has no durable notification row (designer
/// decision notices, invite/reset links, guest credentials).
pub fn queue_email(
    queue: &DeliveryQueue,
    config: &MailerConfig,
    identity: Option<SmtpIdentity>,
    fallback_sender: Option<String>,
    fallback_reply_to: Option<String>,
    email: OutgoingEmail,
) {
    let meta = serde_json::json!({
        "to": email.recipient,
        "subject": email.subject,
    });
    let config = config.clone();
    queue.enqueue(meta, async move {
        send_email(
            &config,
            identity.as_ref(),
            true,
            fallback_sender.as_deref(),
            fallback_reply_to.as_deref(),
            &email,
        )
        .await?;
        Ok(())
    });
}

// ---------------------------------------------------------------------------
// Message composition
// ---------------------------------------------------------------------------

/// Compose the invite or reset email sent around a customer auth token link.
pub fn compose_token_email(
    company_name: &str,
    customer_name: &str,
    purpose: TokenPurpose,
    link: &str,
) -> (String, String) {
    match purpose {
        TokenPurpose::Invite => (
            format!("{company_name}: Finish setting up your account"),
            format!(
                "Hello {customer_name},\n\n\
                 You're invited to access your proofs securely. Click the link below to create a password:\n\
                 {link}\n\n\
                 If you did not expect this email, please ignore it."
            ),
        ),
        TokenPurpose::Reset => (
            format!("{company_name}: Reset your customer portal password"),
            format!(
                "Hello {customer_name},\n\n\
                 We received a request to reset your password. Use the link below to choose a new password:\n\
                 {link}\n\n\
                 If you did not request this change, you can safely ignore this message."
            ),
        ),
    }
}

/// Compose the email telling a guest reviewer their link and PIN.
pub fn compose_guest_email(
    guest_name: Option<&str>,
    job_name: &str,
    guest_link: &str,
    pin: &str,
) -> (String, String) {
    let greeting = guest_name.filter(|n| !n.is_empty()).unwrap_or("there");
    (
        format!("Proof ready for your review: {job_name}"),
        format!(
            "Hi {greeting},\n\n\
             A proof \"{job_name}\" is ready for your review.\n\
             Open it here: {guest_link}\n\
             Your access PIN is: {pin}\n\n\
             The PIN is required the first time you open the link."
        ),
    )
}

/// Compose the email telling the designer about a submitted decision.
pub fn compose_decision_email(
    company_name: &str,
    job_name: &str,
    decision: &str,
    approver_name: &str,
    client_ip: &str,
    timestamp: &str,
    comment: Option<&str>,
) -> (String, String) {
    let subject = format!(
        "{company_name}: Client has {} job {job_name}",
        decision.to_uppercase()
    );
    let mut body = format!(
        "Job: {job_name}\n\
         Decision: {}\n\
         By: {approver_name}\n\
         IP: {client_ip}\n\
         Timestamp: {timestamp}",
        capitalize(decision)
    );
    if let Some(comment) = comment.filter(|c| !c.is_empty()) {
        body.push_str(&format!("\n\nClient comment:\n{comment}"));
    }
    (subject, body)
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
