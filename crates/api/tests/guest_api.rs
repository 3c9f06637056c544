//! Integration tests for the guest PIN access flow.

mod common;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use common::{body_json, cookie_header, cookie_value, create_proof, get, get_with, post_form};
use sqlx::PgPool;

use proofdesk_core::password::hash_password;
use proofdesk_db::models::guest_access::CreateGuestAccess;
use proofdesk_db::repositories::GuestAccessRepo;

/// Seed an active guest grant with a known PIN.
async fn seed_grant(pool: &PgPool, proof_id: i64, token: &str, pin: &str) -> i64 {
    let grant = GuestAccessRepo::create(
        pool,
        &CreateGuestAccess {
            proof_id,
            email: "g@x.com".to_string(),
            name: Some("Guest Reviewer".to_string()),
            access_token: token.to_string(),
            pin_hash: hash_password(pin).expect("hashing should succeed"),
            expires_at: Some(Utc::now() + Duration::hours(168)),
        },
    )
    .await
    .expect("grant creation should succeed");
    grant.id
}

/// A proof with an active grant redirects anonymous viewers to its PIN
/// challenge.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_locked_proof_redirects_to_unlock(pool: PgPool) {
    let proof = create_proof(&pool, "Guest Gated", None).await;
    seed_grant(&pool, proof.id, "guest-token-a", "123456").await;
    let app = common::build_test_app(pool).await;

    let response = get(&app, &format!("/proof/{}", proof.share_id)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let location = response.headers()["location"].to_str().unwrap();
    assert!(location.starts_with(&format!("/proof/{}/unlock", proof.share_id)));
}

/// Full flow: GET challenge, wrong PIN rejected, correct PIN unlocks, and
/// repeat views need no PIN for the rest of the session.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_guest_pin_flow(pool: PgPool) {
    let proof = create_proof(&pool, "Guest Flow", None).await;
    seed_grant(&pool, proof.id, "guest-token-flow", "654321").await;
    let app = common::build_test_app(pool.clone()).await;

    // Challenge: 200 with CSRF token and a guest session cookie.
    let response = get(&app, "/customer/guest/guest-token-flow").await;
    assert_eq!(response.status(), StatusCode::OK);
    let session = cookie_value(&response, "guest_session").expect("challenge sets guest cookie");
    let json = body_json(response).await;
    assert_eq!(json["share_id"], proof.share_id);
    assert_eq!(json["requires_pin"], true);
    let csrf = json["csrf"].as_str().unwrap().to_string();

    // Wrong PIN: 401, no unlock.
    let response = post_form(
        &app,
        "/customer/guest/guest-token-flow",
        vec![cookie_header(&[("guest_session", &session)])],
        &[("pin", "000000"), ("csrf_token", &csrf)],
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = get_with(
        &app,
        &format!("/proof/{}", proof.share_id),
        vec![cookie_header(&[("guest_session", &session)])],
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    // Missing CSRF: 400 even with the right PIN.
    let response = post_form(
        &app,
        "/customer/guest/guest-token-flow",
        vec![cookie_header(&[("guest_session", &session)])],
        &[("pin", "654321"), ("csrf_token", "not-the-token")],
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Correct PIN + CSRF: redirect to the proof and an updated session.
    let response = post_form(
        &app,
        "/customer/guest/guest-token-flow",
        vec![cookie_header(&[("guest_session", &session)])],
        &[("pin", "654321"), ("csrf_token", &csrf)],
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let location = response.headers()["location"].to_str().unwrap();
    assert_eq!(location, format!("/proof/{}", proof.share_id));
    let unlocked = cookie_value(&response, "guest_session").expect("unlock refreshes the cookie");

    // Repeat views render without re-entering the PIN.
    let response = get_with(
        &app,
        &format!("/proof/{}", proof.share_id),
        vec![cookie_header(&[("guest_session", &unlocked)])],
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["job_name"], "Guest Flow");

    // The grant records its first successful access.
    let grant = GuestAccessRepo::find_by_token(&pool, "guest-token-flow")
        .await
        .unwrap()
        .unwrap();
    assert!(grant.accessed_at.is_some());
}

/// A revoked grant's link stops resolving; with no remaining active grants
/// the proof reverts to public visibility.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_revoked_grant_is_gone(pool: PgPool) {
    let proof = create_proof(&pool, "Revocable", None).await;
    let grant_id = seed_grant(&pool, proof.id, "guest-token-revoked", "111111").await;
    GuestAccessRepo::revoke(&pool, grant_id)
        .await
        .expect("revocation should succeed");

    let app = common::build_test_app(pool).await;

    let response = get(&app, "/customer/guest/guest-token-revoked").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // No active grants and no owning customer: public behavior again.
    let response = get(&app, &format!("/proof/{}", proof.share_id)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

/// An expired grant is inactive even though its row still exists.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_expired_grant_is_gone(pool: PgPool) {
    let proof = create_proof(&pool, "Expired", None).await;
    GuestAccessRepo::create(
        &pool,
        &CreateGuestAccess {
            proof_id: proof.id,
            email: "late@x.com".to_string(),
            name: None,
            access_token: "guest-token-expired".to_string(),
            pin_hash: hash_password("222222").unwrap(),
            expires_at: Some(Utc::now() - Duration::hours(1)),
        },
    )
    .await
    .expect("grant creation should succeed");

    let app = common::build_test_app(pool).await;

    let response = get(&app, "/customer/guest/guest-token-expired").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

/// First successful PIN entry stamps `accessed_at` exactly once.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_first_unlock_marks_accessed(pool: PgPool) {
    let proof = create_proof(&pool, "Stamped", None).await;
    seed_grant(&pool, proof.id, "guest-token-stamp", "333333").await;
    let app = common::build_test_app(pool.clone()).await;

    let response = get(&app, "/customer/guest/guest-token-stamp").await;
    let session = cookie_value(&response, "guest_session").unwrap();
    let csrf = body_json(response).await["csrf"].as_str().unwrap().to_string();

    let response = post_form(
        &app,
        "/customer/guest/guest-token-stamp",
        vec![cookie_header(&[("guest_session", &session)])],
        &[("pin", "333333"), ("csrf_token", &csrf)],
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let grant = GuestAccessRepo::find_by_token(&pool, "guest-token-stamp")
        .await
        .unwrap()
        .unwrap();
    assert!(grant.accessed_at.is_some());
}
