//! Email delivery via SMTP: transport selection and message assembly.
//!
//! A message is first attempted through the sending staff user's own SMTP
//! configuration when one is present; on failure it either propagates (test
//! flows set `allow_fallback = false` so a broken configuration is not
//! masked) or falls through to the shared transport configured from the
//! environment. Failure of the shared transport always propagates.

use lettre::message::header::ContentType;
use lettre::message::MultiPart;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use proofdesk_db::models::user::User;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for email delivery failures.
#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    /// SMTP transport-level failure (connection, authentication, protocol).
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    /// The recipient, sender, or reply-to address could not be parsed.
    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// The MIME message could not be assembled.
    #[error("Email build error: {0}")]
    Build(String),

    /// Neither the identity nor the fallback configuration carries a sender.
    #[error("No sender address configured for email notification")]
    NoSender,
}

// ---------------------------------------------------------------------------
// MailerConfig
// ---------------------------------------------------------------------------

/// Default shared SMTP port.
const DEFAULT_SMTP_PORT: u16 = 25;

/// Shared fallback transport configuration plus system-wide sender defaults.
#[derive(Debug, Clone, Default)]
pub struct MailerConfig {
    /// Shared SMTP server hostname.
    pub smtp_host: String,
    /// Shared SMTP server port.
    pub smtp_port: u16,
    /// Optional SMTP username for the shared transport.
    pub smtp_username: Option<String>,
    /// Optional SMTP password for the shared transport.
    pub smtp_password: Option<String>,
    /// STARTTLS on the shared transport.
    pub smtp_use_tls: bool,
    /// Implicit TLS on the shared transport.
    pub smtp_use_ssl: bool,
    /// System default sender address.
    pub default_sender: Option<String>,
    /// System default reply-to address.
    pub default_reply_to: Option<String>,
}

impl MailerConfig {
    /// Load shared transport configuration from environment variables.
    ///
    /// | Env Var                 | Default     |
    /// |-------------------------|-------------|
    /// | `MAIL_SERVER`           | `localhost` |
    /// | `MAIL_PORT`             | `25`        |
    /// | `MAIL_USERNAME`         | --          |
    /// | `MAIL_PASSWORD`         | --          |
    /// | `MAIL_USE_TLS`          | `false`     |
    /// | `MAIL_USE_SSL`          | `false`     |
    /// | `MAIL_DEFAULT_SENDER`   | --          |
    /// | `MAIL_DEFAULT_REPLY_TO` | --          |
    pub fn from_env() -> Self {
        Self {
            smtp_host: std::env::var("MAIL_SERVER").unwrap_or_else(|_| "localhost".into()),
            smtp_port: std::env::var("MAIL_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_SMTP_PORT),
            smtp_username: std::env::var("MAIL_USERNAME").ok(),
            smtp_password: std::env::var("MAIL_PASSWORD").ok(),
            smtp_use_tls: env_flag("MAIL_USE_TLS"),
            smtp_use_ssl: env_flag("MAIL_USE_SSL"),
            default_sender: std::env::var("MAIL_DEFAULT_SENDER").ok(),
            default_reply_to: std::env::var("MAIL_DEFAULT_REPLY_TO").ok(),
        }
    }
}

/// Parse a boolean environment flag the way operators actually write them.
fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "t" | "yes" | "y" | "on"))
        .unwrap_or(false)
}

// ---------------------------------------------------------------------------
// SmtpIdentity
// ---------------------------------------------------------------------------

/// A staff user's custom SMTP transport configuration.
#[derive(Debug, Clone)]
pub struct SmtpIdentity {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub use_tls: bool,
    pub use_ssl: bool,
    pub sender: Option<String>,
    pub reply_to: Option<String>,
}

impl SmtpIdentity {
    /// Build the identity from a staff user's SMTP columns.
    ///
    /// Returns `None` unless the configuration is complete (host + port).
    /// Sender and reply-to fall back to the user's own email address.
    pub fn from_user(user: &User) -> Option<Self> {
        if !user.has_smtp_config() {
            return None;
        }
        let host = user.smtp_host.as_deref()?;
        let port = user.smtp_port?;
        Some(Self {
            host: host.to_string(),
            port: port as u16,
            username: user.smtp_username.clone(),
            password: user.smtp_password.clone(),
            use_tls: user.smtp_use_tls,
            use_ssl: user.smtp_use_ssl,
            sender: user
                .smtp_sender
                .clone()
                .filter(|s| !s.is_empty())
                .or_else(|| Some(user.email.clone())),
            reply_to: user
                .smtp_reply_to
                .clone()
                .filter(|s| !s.is_empty())
                .or_else(|| Some(user.email.clone())),
        })
    }
}

// ---------------------------------------------------------------------------
// Sending
// ---------------------------------------------------------------------------

/// A rendered message ready for delivery to one recipient.
#[derive(Debug, Clone)]
pub struct OutgoingEmail {
    pub subject: String,
    /// Plain-text body (the fallback part when `html_body` is set).
    pub body: String,
    pub html_body: Option<String>,
    pub recipient: String,
}

/// Deliver one message, choosing a transport.
///
/// 1. If `identity` is present, attempt delivery through it, using its own
///    sender/reply-to and falling back to the caller-supplied values only
///    where the identity's are absent.
/// 2. On failure: propagate when `allow_fallback` is false, else fall
///    through to the shared transport.
/// 3. Shared transport: sender defaults to the configured system sender;
///    reply-to defaults to the configured reply-to or the sender; failure
///    always propagates.
pub async fn send_email(
    config: &MailerConfig,
    identity: Option<&SmtpIdentity>,
    allow_fallback: bool,
    fallback_sender: Option<&str>,
    fallback_reply_to: Option<&str>,
    email: &OutgoingEmail,
) -> Result<(), EmailError> {
    let shared_sender = fallback_sender
        .map(str::to_string)
        .or_else(|| config.default_sender.clone());
    let shared_reply_to = fallback_reply_to
        .map(str::to_string)
        .or_else(|| config.default_reply_to.clone())
        .or_else(|| shared_sender.clone());

    if let Some(identity) = identity {
        let sender = identity
            .sender
            .clone()
            .or_else(|| shared_sender.clone())
            .ok_or(EmailError::NoSender)?;
        let reply_to = identity.reply_to.clone().or_else(|| shared_reply_to.clone());

        let result = send_via_transport(
            &identity.host,
            identity.port,
            identity.username.as_deref(),
            identity.password.as_deref(),
            identity.use_tls,
            identity.use_ssl,
            &sender,
            reply_to.as_deref(),
            email,
        )
        .await;

        match result {
            Ok(()) => return Ok(()),
            Err(error) => {
                tracing::warn!(
                    host = %identity.host,
                    error = %error,
                    "Custom SMTP send failed"
                );
                if !allow_fallback {
                    return Err(error);
                }
            }
        }
    }

    let sender = shared_sender.ok_or(EmailError::NoSender)?;
    send_via_transport(
        &config.smtp_host,
        config.smtp_port,
        config.smtp_username.as_deref(),
        config.smtp_password.as_deref(),
        config.smtp_use_tls,
        config.smtp_use_ssl,
        &sender,
        shared_reply_to.as_deref(),
        email,
    )
    .await
}

/// Assemble the MIME message and push it through one SMTP transport.
#[allow(clippy::too_many_arguments)]
async fn send_via_transport(
    host: &str,
    port: u16,
    username: Option<&str>,
    password: Option<&str>,
    use_tls: bool,
    use_ssl: bool,
    sender: &str,
    reply_to: Option<&str>,
    email: &OutgoingEmail,
) -> Result<(), EmailError> {
    let mut builder = Message::builder()
        .from(sender.parse()?)
        .to(email.recipient.parse()?)
        .subject(email.subject.clone());
    if let Some(reply_to) = reply_to {
        builder = builder.reply_to(reply_to.parse()?);
    }

    let message = match &email.html_body {
        Some(html) => builder
            .multipart(MultiPart::alternative_plain_html(
                email.body.clone(),
                html.clone(),
            ))
            .map_err(|e| EmailError::Build(e.to_string()))?,
        None => builder
            .header(ContentType::TEXT_PLAIN)
            .body(email.body.clone())
            .map_err(|e| EmailError::Build(e.to_string()))?,
    };

    let mut transport_builder = if use_ssl {
        AsyncSmtpTransport::<Tokio1Executor>::relay(host)?
    } else if use_tls {
        AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)?
    } else {
        AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
    };
    transport_builder = transport_builder.port(port);

    if let (Some(user), Some(pass)) = (username, password) {
        transport_builder =
            transport_builder.credentials(Credentials::new(user.to_string(), pass.to_string()));
    }

    let mailer = transport_builder.build();
    mailer.send(message).await?;

    tracing::info!(to = %email.recipient, subject = %email.subject, "Email sent");
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
