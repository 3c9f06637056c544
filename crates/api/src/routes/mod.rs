//! Route assembly.

pub mod health;

use axum::routing::{delete, get, post};
use axum::Router;

use crate::handlers::{admin, auth, customer, decisions, guest, proofs};
use crate::state::AppState;

/// Staff JSON API, nested under `/api/v1`.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/users", post(admin::create_user))
        .route("/designers", get(admin::list_designers))
        .route("/proofs", post(proofs::upload))
        .route("/proofs/{share_id}/versions", post(proofs::new_version))
        .route("/proofs/{share_id}/decisions", get(admin::list_decisions))
        .route(
            "/proofs/{share_id}/guest-access",
            post(admin::create_guest_access),
        )
        .route(
            "/proofs/{share_id}/notifications",
            get(admin::list_notifications),
        )
        .route("/guest-access/{id}", delete(admin::revoke_guest_access))
        .route(
            "/customers",
            get(admin::list_customers).post(admin::create_customer),
        )
        .route("/customers/{id}/invite", post(admin::issue_invite))
        .route("/customers/{id}/invite-status", get(admin::invite_status))
        .route(
            "/customers/{id}/login-events",
            get(admin::list_login_events),
        )
        .route("/smtp/test", post(admin::smtp_test))
}

/// Client-facing routes: proof review, decision submission, guest unlock,
/// the customer portal, and local file serving.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/proof/{share_id}", get(proofs::show))
        .route("/proof/{share_id}/decision", post(decisions::submit))
        .route(
            "/proof/{share_id}/unlock",
            get(guest::challenge_by_share_id).post(guest::verify_by_share_id),
        )
        .route(
            "/customer/guest/{token}",
            get(guest::challenge).post(guest::verify),
        )
        .route("/customer/login", post(customer::login))
        .route("/customer/logout", post(customer::logout))
        .route("/customer/dashboard", get(customer::dashboard))
        .route("/customer/proof/{share_id}", get(customer::view_proof))
        .route("/customer/reset", post(customer::reset_request))
        .route(
            "/customer/reset/{token}",
            get(customer::reset_details).post(customer::reset_complete),
        )
        .route(
            "/customer/invite/{token}",
            get(customer::invite_details).post(customer::invite_complete),
        )
        .route("/storage/local/{key}", get(proofs::serve_local))
}
