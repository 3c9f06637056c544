//! Integration tests for proof upload, versioning, decisions, and the
//! notification records they produce.

mod common;

use axum::http::StatusCode;
use common::{
    body_json, cookie_header, create_customer, create_proof, create_staff_user, get, post_form,
    send, staff_session_cookie,
};
use sqlx::PgPool;

use proofdesk_db::repositories::{DecisionRepo, GuestAccessRepo, NotificationRepo, ProofRepo};

async fn upload_request(
    app: &axum::Router,
    cookie: &str,
    fields: &[(&str, &str)],
    filename: &str,
) -> axum::http::Response<axum::body::Body> {
    let (content_type, body) =
        common::multipart_form(fields, Some(("file", filename, b"%PDF-1.4 test")));
    send(
        app,
        "POST",
        "/api/v1/proofs",
        vec![cookie_header(&[("staff_session", cookie)])],
        Some(&content_type),
        body,
    )
    .await
}

/// Upload with notify=on creates the proof, stores the file, and records a
/// queued notification whose subject carries the job name.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_upload_with_notification(pool: PgPool) {
    let (_, password) = create_staff_user(&pool, "uploader@test.com", "admin").await;
    let (customer, _) = create_customer(&pool, "client@example.com", None).await;
    let app = common::build_test_app(pool.clone()).await;
    let cookie = staff_session_cookie(&app, "uploader@test.com", &password).await;

    let customer_id = customer.id.to_string();
    let response = upload_request(
        &app,
        &cookie,
        &[
            ("job_name", "Spring Catalog"),
            ("customer_id", &customer_id),
            ("notify_customer", "on"),
        ],
        "artwork.pdf",
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    let share_id = json["share_id"].as_str().unwrap().to_string();
    assert!(json["share_url"].as_str().unwrap().contains(&share_id));
    assert_eq!(json["notification_status"], "queued");

    let proof = ProofRepo::find_by_share_id(&pool, &share_id)
        .await
        .unwrap()
        .expect("proof row should exist");
    assert_eq!(proof.status, "pending");

    let notifications = NotificationRepo::list_for_proof(&pool, proof.id).await.unwrap();
    assert_eq!(notifications.len(), 1);
    let notification = &notifications[0];
    assert_eq!(notification.status, "queued");
    assert_eq!(notification.recipient_email, "client@example.com");
    assert!(notification.subject.contains("Spring Catalog"));
    assert!(notification
        .body
        .contains(&format!("/proof/{share_id}")));
}

/// Guest recipient mode issues a grant instead of a customer notification.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_upload_guest_mode_creates_grant(pool: PgPool) {
    let (_, password) = create_staff_user(&pool, "guestup@test.com", "admin").await;
    let app = common::build_test_app(pool.clone()).await;
    let cookie = staff_session_cookie(&app, "guestup@test.com", &password).await;

    let response = upload_request(
        &app,
        &cookie,
        &[
            ("job_name", "Guest Job"),
            ("recipient_mode", "guest"),
            ("guest_email", "guest@example.com"),
            ("guest_name", "Guest Reviewer"),
        ],
        "artwork.png",
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    let guest_link = json["guest_link"].as_str().expect("guest link in response");
    let token = guest_link.rsplit('/').next().unwrap();

    let grant = GuestAccessRepo::find_by_token(&pool, token)
        .await
        .unwrap()
        .expect("grant row should exist");
    assert_eq!(grant.email, "guest@example.com");
    assert!(grant.is_active());
    assert!(grant.expires_at.is_some());
}

/// Disallowed file extensions are rejected before anything is stored.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_upload_rejects_bad_extension(pool: PgPool) {
    let (_, password) = create_staff_user(&pool, "badext@test.com", "admin").await;
    let app = common::build_test_app(pool.clone()).await;
    let cookie = staff_session_cookie(&app, "badext@test.com", &password).await;

    let response = upload_request(&app, &cookie, &[("job_name", "Nope")], "malware.exe").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

/// Uploading requires a staff session.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_upload_requires_staff(pool: PgPool) {
    let app = common::build_test_app(pool).await;
    let (content_type, body) =
        common::multipart_form(&[("job_name", "X")], Some(("file", "a.pdf", b"x")));
    let response = send(&app, "POST", "/api/v1/proofs", vec![], Some(&content_type), body).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

/// Public decision flow: an unowned proof with no guest grants accepts an
/// unauthenticated decision, and the proof status follows it.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_public_decision_updates_status(pool: PgPool) {
    let proof = create_proof(&pool, "Open Job", None).await;
    let app = common::build_test_app(pool.clone()).await;

    let response = post_form(
        &app,
        &format!("/proof/{}/decision", proof.share_id),
        vec![],
        &[
            ("decision", "approved"),
            ("approver_name", "Avery Client"),
            ("client_comment", "Looks great"),
        ],
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "approved");

    let updated = ProofRepo::find_by_share_id(&pool, &proof.share_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.status, "approved");

    let decision = DecisionRepo::latest_for_proof(&pool, proof.id)
        .await
        .unwrap()
        .expect("decision row should exist");
    assert_eq!(decision.status, "approved");
    assert_eq!(decision.approver_name.as_deref(), Some("Avery Client"));
    assert_eq!(decision.client_comment.as_deref(), Some("Looks great"));
    assert!(decision.client_ip.is_some());
}

/// Any decision other than "approved" declines.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_decline_decision(pool: PgPool) {
    let proof = create_proof(&pool, "Declined Job", None).await;
    let app = common::build_test_app(pool.clone()).await;

    let response = post_form(
        &app,
        &format!("/proof/{}/decision", proof.share_id),
        vec![],
        &[("decision", "declined")],
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let updated = ProofRepo::find_by_share_id(&pool, &proof.share_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.status, "declined");
}

/// A new version resets an approved proof back to pending.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_new_version_resets_status(pool: PgPool) {
    let (_, password) = create_staff_user(&pool, "rev@test.com", "designer").await;
    let proof = create_proof(&pool, "Iterating Job", None).await;
    let app = common::build_test_app(pool.clone()).await;
    let cookie = staff_session_cookie(&app, "rev@test.com", &password).await;

    // Approve it first.
    let response = post_form(
        &app,
        &format!("/proof/{}/decision", proof.share_id),
        vec![],
        &[("decision", "approved")],
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    // Upload a second revision.
    let (content_type, body) =
        common::multipart_form(&[], Some(("file", "artwork-v2.pdf", b"%PDF-1.4 v2")));
    let response = send(
        &app,
        "POST",
        &format!("/api/v1/proofs/{}/versions", proof.share_id),
        vec![cookie_header(&[("staff_session", &cookie)])],
        Some(&content_type),
        body,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["status"], "pending");
    assert!(json["storage_key"]
        .as_str()
        .unwrap()
        .starts_with(&format!("{}_v2", proof.share_id)));

    let updated = ProofRepo::find_by_share_id(&pool, &proof.share_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.status, "pending");
}

/// The proof view lists versions oldest-first with fetchable URLs.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_proof_view_lists_versions(pool: PgPool) {
    let (_, password) = create_staff_user(&pool, "viewer@test.com", "admin").await;
    let app = common::build_test_app(pool.clone()).await;
    let cookie = staff_session_cookie(&app, "viewer@test.com", &password).await;

    let response = upload_request(&app, &cookie, &[("job_name", "Viewable")], "art.jpg").await;
    let share_id = body_json(response).await["share_id"]
        .as_str()
        .unwrap()
        .to_string();

    let response = get(&app, &format!("/proof/{share_id}")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["job_name"], "Viewable");
    assert_eq!(json["status"], "pending");
    assert_eq!(json["versions"].as_array().unwrap().len(), 1);
    let file_url = json["file_url"].as_str().unwrap().to_string();
    assert!(file_url.starts_with("/storage/local/"));

    // The stored file is served back through the local storage route.
    let response = get(&app, &file_url).await;
    assert_eq!(response.status(), StatusCode::OK);
}

/// Explicit non-positive guest expiry is a validation error.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_guest_access_zero_expiry_rejected(pool: PgPool) {
    let (_, password) = create_staff_user(&pool, "zero@test.com", "admin").await;
    let proof = create_proof(&pool, "Zero Expiry", None).await;
    let app = common::build_test_app(pool).await;
    let cookie = staff_session_cookie(&app, "zero@test.com", &password).await;

    let response = common::post_json_with(
        &app,
        &format!("/api/v1/proofs/{}/guest-access", proof.share_id),
        vec![cookie_header(&[("staff_session", &cookie)])],
        serde_json::json!({ "email": "g@x.com", "expires_hours": 0 }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
