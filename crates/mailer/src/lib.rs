//! Outbound email: delivery queue, SMTP transport selection, notification
//! orchestration.
//!
//! The [`queue::DeliveryQueue`] decouples slow SMTP round trips from request
//! handling; [`delivery`] picks a transport (a staff user's custom SMTP
//! configuration, with a shared fallback) and sends one message;
//! [`notify`] ties both to the durable `customer_notifications` records.

pub mod delivery;
pub mod notify;
pub mod queue;

pub use delivery::{EmailError, MailerConfig, OutgoingEmail, SmtpIdentity};
pub use queue::DeliveryQueue;
