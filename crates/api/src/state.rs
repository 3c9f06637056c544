use std::sync::Arc;

use proofdesk_mailer::{DeliveryQueue, MailerConfig};

use crate::config::ServerConfig;
use crate::storage::ProofStorage;
use crate::throttle::LoginThrottle;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: proofdesk_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Proof file storage backend (local filesystem or S3).
    pub storage: Arc<dyn ProofStorage>,
    /// Handle to the outbound email queue.
    pub mailer: DeliveryQueue,
    /// Shared SMTP transport configuration and sender defaults.
    pub mailer_config: Arc<MailerConfig>,
    /// Per-IP failure tracking for staff logins.
    pub staff_throttle: Arc<LoginThrottle>,
    /// Per-IP failure tracking for customer logins.
    pub customer_throttle: Arc<LoginThrottle>,
}
