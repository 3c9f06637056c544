//! Integration tests for the customer portal: feature gating, login and
//! lockout, proof access enforcement, invites, and resets.

mod common;

use axum::http::StatusCode;
use common::{
    body_json, cookie_header, cookie_value, create_customer, create_proof, create_staff_user,
    get, get_with, post_json, post_json_with, staff_session_cookie,
};
use sqlx::PgPool;

use proofdesk_core::status::TokenPurpose;
use proofdesk_db::repositories::AuthTokenRepo;

const PORTAL_PASSWORD: &str = "portal-password-9";

/// Portal routes do not exist while the feature is disabled.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_portal_disabled_is_404(pool: PgPool) {
    create_customer(&pool, "c@example.com", Some(PORTAL_PASSWORD)).await;
    let app = common::build_test_app(pool).await;

    let response = post_json(
        &app,
        "/customer/login",
        serde_json::json!({ "email": "c@example.com", "password": PORTAL_PASSWORD }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

/// With the portal on and legacy links off, an owned proof redirects
/// anonymous viewers to the portal login; the owning customer gets 200.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_owned_proof_requires_login(pool: PgPool) {
    let (customer, _) = create_customer(&pool, "owner@example.com", Some(PORTAL_PASSWORD)).await;
    let proof = create_proof(&pool, "Owned Job", Some(customer.id)).await;

    let app = common::build_test_app_with(pool, |config| {
        config.customer_portal_enabled = true;
        config.legacy_links_enabled = false;
    })
    .await;

    // Anonymous: redirect to login with an onward URL.
    let response = get(&app, &format!("/proof/{}", proof.share_id)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let location = response.headers()["location"].to_str().unwrap();
    assert!(location.starts_with("/customer/login"));

    // Log in as the owner.
    let response = post_json(
        &app,
        "/customer/login",
        serde_json::json!({ "email": "owner@example.com", "password": PORTAL_PASSWORD }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let session = cookie_value(&response, "customer_session").expect("login sets customer cookie");

    // Owner sees the proof.
    let response = get_with(
        &app,
        &format!("/proof/{}", proof.share_id),
        vec![cookie_header(&[("customer_session", &session)])],
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["job_name"], "Owned Job");
    assert_eq!(json["customer_portal_banner"], false);
}

/// With legacy links enabled the proof still renders anonymously, but the
/// page carries the portal sign-in banner.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_legacy_links_render_with_banner(pool: PgPool) {
    let (customer, _) = create_customer(&pool, "soft@example.com", Some(PORTAL_PASSWORD)).await;
    let proof = create_proof(&pool, "Soft Gated", Some(customer.id)).await;

    let app = common::build_test_app_with(pool, |config| {
        config.customer_portal_enabled = true;
        config.legacy_links_enabled = true;
    })
    .await;

    let response = get(&app, &format!("/proof/{}", proof.share_id)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["customer_portal_banner"], true);
    assert!(json["customer_login_url"].is_string());
}

/// A wrong password records a failed login event; repeated failures from
/// one IP lock it out with 429.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_customer_login_failures_and_lockout(pool: PgPool) {
    let (customer, _) = create_customer(&pool, "locked@example.com", Some(PORTAL_PASSWORD)).await;
    let app = common::build_test_app_with(pool.clone(), |config| {
        config.customer_portal_enabled = true;
    })
    .await;

    let ip = vec![("x-forwarded-for", "203.0.113.50".to_string())];
    for _ in 0..5 {
        let response = post_json_with(
            &app,
            "/customer/login",
            ip.clone(),
            serde_json::json!({ "email": "locked@example.com", "password": "wrong" }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    let response = post_json_with(
        &app,
        "/customer/login",
        ip,
        serde_json::json!({ "email": "locked@example.com", "password": PORTAL_PASSWORD }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

    let failed_events: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM customer_login_events WHERE customer_id = $1 AND successful = FALSE",
    )
    .bind(customer.id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(failed_events, 5);
}

/// The dashboard lists only the signed-in customer's proofs.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_dashboard_lists_own_proofs(pool: PgPool) {
    let (customer, _) = create_customer(&pool, "mine@example.com", Some(PORTAL_PASSWORD)).await;
    let (other, _) = create_customer(&pool, "other@example.com", None).await;
    create_proof(&pool, "Mine", Some(customer.id)).await;
    create_proof(&pool, "Not Mine", Some(other.id)).await;

    let app = common::build_test_app_with(pool, |config| {
        config.customer_portal_enabled = true;
    })
    .await;

    let response = post_json(
        &app,
        "/customer/login",
        serde_json::json!({ "email": "mine@example.com", "password": PORTAL_PASSWORD }),
    )
    .await;
    let session = cookie_value(&response, "customer_session").unwrap();

    let response = get_with(
        &app,
        "/customer/dashboard",
        vec![cookie_header(&[("customer_session", &session)])],
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let jobs: Vec<&str> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["job_name"].as_str().unwrap())
        .collect();
    assert_eq!(jobs, vec!["Mine"]);
}

// ---------------------------------------------------------------------------
// Invites
// ---------------------------------------------------------------------------

/// Issuing a second invite while one is pending is refused with the
/// distinguishable conflict; `allow_existing` supersedes instead.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_invite_pending_conflict_and_supersession(pool: PgPool) {
    let (_, password) = create_staff_user(&pool, "admin@test.com", "admin").await;
    let (customer, _) = create_customer(&pool, "invitee@example.com", None).await;

    let app = common::build_test_app_with(pool.clone(), |config| {
        config.customer_portal_enabled = true;
    })
    .await;
    let cookie = staff_session_cookie(&app, "admin@test.com", &password).await;
    let auth = cookie_header(&[("staff_session", &cookie)]);

    let uri = format!("/api/v1/customers/{}/invite", customer.id);

    // First invite succeeds.
    let response = post_json_with(
        &app,
        &uri,
        vec![auth.clone()],
        serde_json::json!({ "suppress_email": true }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let first_link = body_json(response).await["invite_link"]
        .as_str()
        .unwrap()
        .to_string();

    // Second is refused while the first is pending.
    let response = post_json_with(
        &app,
        &uri,
        vec![auth.clone()],
        serde_json::json!({ "suppress_email": true }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["code"], "INVITE_PENDING");

    // Superseding issues a new token and invalidates the first.
    let response = post_json_with(
        &app,
        &uri,
        vec![auth],
        serde_json::json!({ "suppress_email": true, "allow_existing": true }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let first_raw = first_link.rsplit('/').next().unwrap();
    let stale = AuthTokenRepo::find_by_raw(&pool, first_raw, TokenPurpose::Invite)
        .await
        .unwrap();
    assert!(stale.is_none(), "superseded invite must not resolve");

    let unconsumed: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM customer_auth_tokens
         WHERE customer_id = $1 AND purpose = 'invite' AND consumed_at IS NULL",
    )
    .bind(customer.id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(unconsumed, 1, "exactly one live invite after supersession");
}

/// Accepting an invite sets the password once; the link then stops
/// resolving, and the new password signs in.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_invite_accept_is_single_use(pool: PgPool) {
    let (customer, _) = create_customer(&pool, "newbie@example.com", None).await;
    let (raw_token, _) = AuthTokenRepo::issue(&pool, customer.id, TokenPurpose::Invite, 72, None)
        .await
        .unwrap();

    let app = common::build_test_app_with(pool, |config| {
        config.customer_portal_enabled = true;
    })
    .await;
    let uri = format!("/customer/invite/{raw_token}");

    // The details page resolves while the token is live.
    let response = get(&app, &uri).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["customer_name"], "Avery Customer");

    // A weak password is rejected and does not consume the token.
    let response = post_json(
        &app,
        &uri,
        serde_json::json!({ "password": "short1!", "confirm_password": "short1!" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Mismatched confirmation is rejected too.
    let response = post_json(
        &app,
        &uri,
        serde_json::json!({
            "password": "a-long-password-1",
            "confirm_password": "a-long-password-2"
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // A conforming password completes the invite.
    let response = post_json(
        &app,
        &uri,
        serde_json::json!({
            "password": "a-long-password-1",
            "confirm_password": "a-long-password-1"
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    // The link is consumed.
    let response = get(&app, &uri).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // And the new password signs in.
    let response = post_json(
        &app,
        "/customer/login",
        serde_json::json!({ "email": "newbie@example.com", "password": "a-long-password-1" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}

// ---------------------------------------------------------------------------
// Resets
// ---------------------------------------------------------------------------

/// The reset request is success-shaped whether or not the email exists.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_reset_request_does_not_enumerate(pool: PgPool) {
    create_customer(&pool, "real@example.com", Some(PORTAL_PASSWORD)).await;
    let app = common::build_test_app_with(pool, |config| {
        config.customer_portal_enabled = true;
    })
    .await;

    let real = post_json(
        &app,
        "/customer/reset",
        serde_json::json!({ "email": "real@example.com" }),
    )
    .await;
    let ghost = post_json(
        &app,
        "/customer/reset",
        serde_json::json!({ "email": "ghost@example.com" }),
    )
    .await;
    assert_eq!(real.status(), StatusCode::OK);
    assert_eq!(ghost.status(), StatusCode::OK);
    assert_eq!(body_json(real).await, body_json(ghost).await);
}

/// A reset token works exactly once and replaces the password.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_reset_token_single_use(pool: PgPool) {
    let (customer, _) = create_customer(&pool, "reset@example.com", Some(PORTAL_PASSWORD)).await;
    let (raw_token, _) = AuthTokenRepo::issue(&pool, customer.id, TokenPurpose::Reset, 24, None)
        .await
        .unwrap();

    let app = common::build_test_app_with(pool, |config| {
        config.customer_portal_enabled = true;
    })
    .await;
    let uri = format!("/customer/reset/{raw_token}");

    let response = post_json(
        &app,
        &uri,
        serde_json::json!({
            "password": "replacement-pass-7",
            "confirm_password": "replacement-pass-7"
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    // Consumed: the same raw token no longer resolves.
    let response = post_json(
        &app,
        &uri,
        serde_json::json!({
            "password": "replacement-pass-7",
            "confirm_password": "replacement-pass-7"
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Old password out, new password in.
    let response = post_json(
        &app,
        "/customer/login",
        serde_json::json!({ "email": "reset@example.com", "password": PORTAL_PASSWORD }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = post_json(
        &app,
        "/customer/login",
        serde_json::json!({ "email": "reset@example.com", "password": "replacement-pass-7" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}
