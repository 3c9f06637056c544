//! Cookie sessions for the three identity planes.
//!
//! Staff, customer, and guest sessions are independent: each lives in its
//! own cookie, signed as an HS256 JWT with its own claims shape and its own
//! CSRF token. Clearing one plane never touches the others. The guest
//! session carries the set of proof share ids unlocked by PIN in this
//! browser session.

use axum_extra::extract::cookie::{Cookie, SameSite};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use uuid::Uuid;

use proofdesk_core::types::DbId;

/// Cookie name for the staff plane.
pub const STAFF_COOKIE: &str = "staff_session";
/// Cookie name for the customer plane.
pub const CUSTOMER_COOKIE: &str = "customer_session";
/// Cookie name for the guest plane.
pub const GUEST_COOKIE: &str = "guest_session";

/// Staff/customer session lifetime in hours.
const SESSION_TTL_HOURS: i64 = 12;
/// Guest session lifetime in hours.
const GUEST_TTL_HOURS: i64 = 24;

/// Signing configuration for session cookies.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// HMAC-SHA256 secret used to sign and verify session cookies.
    pub secret: String,
}

impl SessionConfig {
    /// Load from the environment.
    ///
    /// # Panics
    ///
    /// Panics if `SESSION_SECRET` is not set or is empty.
    pub fn from_env() -> Self {
        let secret =
            std::env::var("SESSION_SECRET").expect("SESSION_SECRET must be set in the environment");
        assert!(!secret.is_empty(), "SESSION_SECRET must not be empty");
        Self { secret }
    }
}

/// Claims for a signed-in staff user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaffClaims {
    /// The staff user's database id.
    pub sub: DbId,
    /// `"admin"` or `"designer"`.
    pub role: String,
    /// Per-session CSRF token, echoed by state-changing forms.
    pub csrf: String,
    pub exp: i64,
    pub iat: i64,
}

/// Claims for a signed-in portal customer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerClaims {
    /// The customer's database id.
    pub sub: DbId,
    pub csrf: String,
    pub exp: i64,
    pub iat: i64,
}

/// Claims for a guest reviewer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuestClaims {
    /// Share ids of proofs unlocked by PIN in this session.
    pub unlocked: Vec<String>,
    pub csrf: String,
    pub exp: i64,
    pub iat: i64,
}

/// Generate a fresh CSRF token.
pub fn generate_csrf_token() -> String {
    Uuid::new_v4().simple().to_string()
}

impl StaffClaims {
    pub fn new(user_id: DbId, role: &str) -> Self {
        let (iat, exp) = issue_window(SESSION_TTL_HOURS);
        Self {
            sub: user_id,
            role: role.to_string(),
            csrf: generate_csrf_token(),
            exp,
            iat,
        }
    }
}

impl CustomerClaims {
    pub fn new(customer_id: DbId) -> Self {
        let (iat, exp) = issue_window(SESSION_TTL_HOURS);
        Self {
            sub: customer_id,
            csrf: generate_csrf_token(),
            exp,
            iat,
        }
    }
}

impl GuestClaims {
    pub fn new() -> Self {
        let (iat, exp) = issue_window(GUEST_TTL_HOURS);
        Self {
            unlocked: Vec::new(),
            csrf: generate_csrf_token(),
            exp,
            iat,
        }
    }

    /// Add a share id to the unlocked set, refreshing the expiry window.
    pub fn unlock(&mut self, share_id: &str) {
        if !self.unlocked.iter().any(|s| s == share_id) {
            self.unlocked.push(share_id.to_string());
        }
        let (iat, exp) = issue_window(GUEST_TTL_HOURS);
        self.iat = iat;
        self.exp = exp;
    }
}

impl Default for GuestClaims {
    fn default() -> Self {
        Self::new()
    }
}

fn issue_window(ttl_hours: i64) -> (i64, i64) {
    let now = chrono::Utc::now().timestamp();
    (now, now + ttl_hours * 3600)
}

/// Sign claims into a cookie value.
pub fn sign_claims<C: Serialize>(
    claims: &C,
    config: &SessionConfig,
) -> Result<String, jsonwebtoken::errors::Error> {
    encode(
        &Header::default(), // HS256
        claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
}

/// Validate and decode a cookie value back into claims.
pub fn verify_claims<C: DeserializeOwned>(
    token: &str,
    config: &SessionConfig,
) -> Result<C, jsonwebtoken::errors::Error> {
    let mut validation = Validation::default(); // HS256, validates exp
    validation.required_spec_claims.clear();
    let data = decode::<C>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &validation,
    )?;
    Ok(data.claims)
}

/// Build a session cookie for a signed claims value.
pub fn session_cookie(name: &'static str, value: String) -> Cookie<'static> {
    let mut cookie = Cookie::new(name, value);
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_same_site(SameSite::Lax);
    cookie
}

/// Build an expired cookie that clears one plane's session.
pub fn removal_cookie(name: &'static str) -> Cookie<'static> {
    let mut cookie = Cookie::new(name, "");
    cookie.set_path("/");
    cookie.make_removal();
    cookie
}
