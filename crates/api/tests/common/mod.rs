#![allow(dead_code)]
//! Shared helpers for HTTP-level integration tests.
//!
//! Mirrors the router construction in `main.rs` so tests exercise the same
//! middleware stack (request ID, timeout, tracing, panic recovery) that
//! production uses. The delivery queue worker is aborted immediately so
//! queued notifications stay deterministically in `queued` state.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::header::{CONTENT_TYPE, SET_COOKIE};
use axum::http::{HeaderName, Request, Response, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use proofdesk_api::config::{ServerConfig, StorageConfig};
use proofdesk_api::routes;
use proofdesk_api::sessions::SessionConfig;
use proofdesk_api::state::AppState;
use proofdesk_api::storage::LocalStorage;
use proofdesk_api::throttle::LoginThrottle;
use proofdesk_core::password::hash_password;
use proofdesk_core::secrets::generate_share_id;
use proofdesk_db::models::customer::{CreateCustomer, Customer};
use proofdesk_db::models::proof::{CreateProof, Proof};
use proofdesk_db::models::proof_version::CreateProofVersion;
use proofdesk_db::models::user::{CreateUser, User};
use proofdesk_db::repositories::{CustomerRepo, ProofRepo, ProofVersionRepo, UserRepo};
use proofdesk_mailer::{DeliveryQueue, MailerConfig};

/// Build a test `ServerConfig` with safe defaults: portal disabled, legacy
/// links enabled, 5-attempt lockout over 300 seconds.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec![],
        request_timeout_secs: 30,
        public_base_url: Some("http://proofs.test".to_string()),
        company_name: "Proofdesk Test".to_string(),
        customer_portal_enabled: false,
        legacy_links_enabled: true,
        login_max_attempts: 5,
        login_attempt_window_secs: 300,
        invite_expiry_hours: 72,
        guest_expiry_hours: 168,
        session: SessionConfig {
            secret: "test-session-secret-long-enough-for-hmac".to_string(),
        },
        storage: StorageConfig::Local {
            root: "./unused".to_string(),
            public_base_url: None,
        },
    }
}

/// Build the full application router against the given pool, with the
/// default test configuration.
pub async fn build_test_app(pool: PgPool) -> Router {
    build_test_app_with(pool, |_| {}).await
}

/// Build the app with a configuration tweak (feature flags, lockout knobs).
pub async fn build_test_app_with(
    pool: PgPool,
    configure: impl FnOnce(&mut ServerConfig),
) -> Router {
    let mut config = test_config();
    configure(&mut config);

    let storage_root = std::env::temp_dir().join(format!("proofdesk-test-{}", Uuid::new_v4()));
    let storage = Arc::new(
        LocalStorage::new(storage_root, None)
            .await
            .expect("test storage root should be creatable"),
    );

    // No live worker: jobs stay enqueued so notification rows keep their
    // initial `queued` status.
    let (mailer, mailer_handle) = DeliveryQueue::start();
    mailer_handle.abort();

    let staff_throttle = Arc::new(LoginThrottle::new(
        config.login_attempt_window_secs,
        config.login_max_attempts,
    ));
    let customer_throttle = Arc::new(LoginThrottle::new(
        config.login_attempt_window_secs,
        config.login_max_attempts,
    ));

    let state = AppState {
        pool,
        config: Arc::new(config),
        storage,
        mailer,
        mailer_config: Arc::new(MailerConfig {
            smtp_host: "localhost".into(),
            smtp_port: 25,
            default_sender: Some("noreply@proofs.test".into()),
            ..Default::default()
        }),
        staff_throttle,
        customer_throttle,
    };

    let request_id_header = HeaderName::from_static("x-request-id");

    Router::new()
        .merge(routes::health::router())
        .merge(routes::public_routes())
        .nest("/api/v1", routes::api_routes())
        .layer(CatchPanicLayer::new())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(30),
        ))
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

/// Extra request headers: `(name, value)` pairs.
pub type Headers = Vec<(&'static str, String)>;

pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    headers: Headers,
    content_type: Option<&str>,
    body: Vec<u8>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(ct) = content_type {
        builder = builder.header(CONTENT_TYPE, ct);
    }
    for (name, value) in headers {
        builder = builder.header(name, value);
    }
    let request = builder.body(Body::from(body)).expect("valid test request");
    app.clone()
        .oneshot(request)
        .await
        .expect("request should not error")
}

pub async fn get(app: &Router, uri: &str) -> Response<Body> {
    send(app, "GET", uri, vec![], None, Vec::new()).await
}

pub async fn get_with(app: &Router, uri: &str, headers: Headers) -> Response<Body> {
    send(app, "GET", uri, headers, None, Vec::new()).await
}

pub async fn post_json(app: &Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    send(
        app,
        "POST",
        uri,
        vec![],
        Some("application/json"),
        body.to_string().into_bytes(),
    )
    .await
}

pub async fn post_json_with(
    app: &Router,
    uri: &str,
    headers: Headers,
    body: serde_json::Value,
) -> Response<Body> {
    send(
        app,
        "POST",
        uri,
        headers,
        Some("application/json"),
        body.to_string().into_bytes(),
    )
    .await
}

pub async fn post_form(
    app: &Router,
    uri: &str,
    headers: Headers,
    form: &[(&str, &str)],
) -> Response<Body> {
    let body = form
        .iter()
        .map(|(k, v)| format!("{k}={}", urlencode(v)))
        .collect::<Vec<_>>()
        .join("&");
    send(
        app,
        "POST",
        uri,
        headers,
        Some("application/x-www-form-urlencoded"),
        body.into_bytes(),
    )
    .await
}

/// Percent-encode a form value (enough for test inputs).
fn urlencode(value: &str) -> String {
    let mut out = String::new();
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            b' ' => out.push('+'),
            other => out.push_str(&format!("%{other:02X}")),
        }
    }
    out
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body should collect")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("body should be JSON")
}

/// Extract a `name=value` pair from the response's `set-cookie` headers.
pub fn cookie_value(response: &Response<Body>, name: &str) -> Option<String> {
    for header in response.headers().get_all(SET_COOKIE) {
        let raw = header.to_str().ok()?;
        let pair = raw.split(';').next()?;
        let (cookie_name, value) = pair.split_once('=')?;
        if cookie_name == name {
            return Some(value.to_string());
        }
    }
    None
}

/// Header carrying one or more cookies back to the server.
pub fn cookie_header(pairs: &[(&str, &str)]) -> (&'static str, String) {
    let value = pairs
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join("; ");
    ("cookie", value)
}

/// Build a multipart/form-data body from text fields plus one optional file.
pub fn multipart_form(
    fields: &[(&str, &str)],
    file: Option<(&str, &str, &[u8])>,
) -> (String, Vec<u8>) {
    let boundary = "proofdesk-test-boundary";
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((field, filename, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
    (format!("multipart/form-data; boundary={boundary}"), body)
}

// ---------------------------------------------------------------------------
// Seeding helpers
// ---------------------------------------------------------------------------

/// Create a staff user directly in the database; returns the row and the
/// plaintext password used.
pub async fn create_staff_user(pool: &PgPool, email: &str, role: &str) -> (User, String) {
    let password = "staff_password_123!";
    let hashed = hash_password(password).expect("hashing should succeed");
    let user = UserRepo::create(
        pool,
        &CreateUser {
            email: email.to_string(),
            name: "Test Staffer".to_string(),
            password_hash: hashed,
            role: role.to_string(),
        },
    )
    .await
    .expect("user creation should succeed");
    (user, password.to_string())
}

/// Log a staff user in through the API and return their session cookie value.
pub async fn staff_session_cookie(app: &Router, email: &str, password: &str) -> String {
    let response = post_json(
        app,
        "/api/v1/auth/login",
        serde_json::json!({ "email": email, "password": password }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    cookie_value(&response, "staff_session").expect("login should set the staff cookie")
}

/// Create a customer, optionally with an active portal credential.
pub async fn create_customer(
    pool: &PgPool,
    email: &str,
    password: Option<&str>,
) -> (Customer, Option<String>) {
    let customer = CustomerRepo::create(
        pool,
        &CreateCustomer {
            name: "Avery Customer".to_string(),
            company_name: None,
            email: email.to_string(),
        },
    )
    .await
    .expect("customer creation should succeed");

    let password = match password {
        Some(password) => {
            let hashed = hash_password(password).expect("hashing should succeed");
            CustomerRepo::upsert_credential(pool, customer.id, &hashed)
                .await
                .expect("credential creation should succeed");
            Some(password.to_string())
        }
        None => None,
    };
    (customer, password)
}

/// Create a proof with one version, bypassing the upload endpoint.
pub async fn create_proof(
    pool: &PgPool,
    job_name: &str,
    customer_id: Option<i64>,
) -> Proof {
    let share_id = generate_share_id();
    let proof = ProofRepo::create(
        pool,
        &CreateProof {
            share_id: share_id.clone(),
            job_name: job_name.to_string(),
            notes: None,
            designer_id: None,
            customer_id,
        },
    )
    .await
    .expect("proof creation should succeed");
    ProofVersionRepo::create(
        pool,
        &CreateProofVersion {
            proof_id: proof.id,
            storage_key: format!("{share_id}.pdf"),
            original_filename: "artwork.pdf".to_string(),
            mime_type: Some("application/pdf".to_string()),
            file_size: Some(1024),
            uploaded_by_user_id: None,
        },
    )
    .await
    .expect("version creation should succeed");
    proof
}
