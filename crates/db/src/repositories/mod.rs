//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument.

pub mod auth_token_repo;
pub mod customer_repo;
pub mod decision_repo;
pub mod designer_repo;
pub mod guest_access_repo;
pub mod login_event_repo;
pub mod notification_repo;
pub mod proof_repo;
pub mod proof_version_repo;
pub mod user_repo;

pub use auth_token_repo::AuthTokenRepo;
pub use customer_repo::CustomerRepo;
pub use decision_repo::DecisionRepo;
pub use designer_repo::DesignerRepo;
pub use guest_access_repo::GuestAccessRepo;
pub use login_event_repo::LoginEventRepo;
pub use notification_repo::NotificationRepo;
pub use proof_repo::ProofRepo;
pub use proof_version_repo::ProofVersionRepo;
pub use user_repo::UserRepo;
