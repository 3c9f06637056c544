//! Handlers for the customer portal: login, dashboard, reset, invite accept.
//!
//! Every route here is feature-gated: with `CUSTOMER_LOGIN_ENABLED` off the
//! portal does not exist and requests get 404.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};

use proofdesk_core::error::CoreError;
use proofdesk_core::password::{hash_password, validate_password, verify_password};
use proofdesk_core::status::TokenPurpose;
use proofdesk_core::types::{DbId, Timestamp};
use proofdesk_db::models::auth_token::CustomerAuthToken;
use proofdesk_db::repositories::{
    AuthTokenRepo, CustomerRepo, LoginEventRepo, ProofRepo,
};
use proofdesk_mailer::notify::{compose_token_email, queue_email};
use proofdesk_mailer::OutgoingEmail;

use crate::client_ip::ClientIp;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::CustomerIdentity;
use crate::sessions::{
    removal_cookie, session_cookie, sign_claims, CustomerClaims, CUSTOMER_COOKIE,
};
use crate::state::AppState;

/// Reset tokens are valid for one day.
const RESET_TOKEN_HOURS: i64 = 24;

/// Reject portal routes outright when the feature is disabled.
fn require_portal(state: &AppState) -> AppResult<()> {
    if state.config.customer_portal_enabled {
        Ok(())
    } else {
        Err(AppError::NotFound("Not found".into()))
    }
}

// ---------------------------------------------------------------------------
// Login / logout / dashboard
// ---------------------------------------------------------------------------

/// Request body for `POST /customer/login`.
#[derive(Debug, Deserialize)]
pub struct CustomerLoginRequest {
    pub email: String,
    pub password: String,
}

/// Successful customer login response.
#[derive(Debug, Serialize)]
pub struct CustomerLoginResponse {
    pub customer_id: DbId,
    pub name: String,
    pub email: String,
    pub csrf: String,
}

/// POST /customer/login
///
/// Authenticate a portal customer. Lockout applies per source IP; both
/// failed and successful attempts with a real credential are recorded as
/// login events for audit.
pub async fn login(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    jar: CookieJar,
    headers: axum::http::HeaderMap,
    Json(input): Json<CustomerLoginRequest>,
) -> AppResult<Response> {
    require_portal(&state)?;

    let email = input.email.trim().to_lowercase();
    let password = input.password.trim();
    if email.is_empty() || password.is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "Email and password are required".into(),
        )));
    }

    if let Some(retry_after) = state.customer_throttle.locked_for(&ip) {
        return Err(AppError::RateLimited { retry_after });
    }

    let user_agent = headers
        .get("user-agent")
        .and_then(|v| v.to_str().ok());

    let customer = CustomerRepo::find_by_email(&state.pool, &email).await?;
    let credential = match &customer {
        Some(customer) => CustomerRepo::find_credential(&state.pool, customer.id).await?,
        None => None,
    };

    let (customer, credential) = match (customer, credential) {
        (Some(customer), Some(credential)) if credential.is_active => (customer, credential),
        _ => {
            state.customer_throttle.record_failure(&ip);
            return Err(AppError::Core(CoreError::Unauthorized(
                "Invalid credentials".into(),
            )));
        }
    };

    let password_valid = verify_password(password, &credential.password_hash)
        .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))?;
    if !password_valid {
        state.customer_throttle.record_failure(&ip);
        LoginEventRepo::record(&state.pool, customer.id, Some(&ip), user_agent, false).await?;
        return Err(AppError::Core(CoreError::Unauthorized(
            "Invalid credentials".into(),
        )));
    }

    state.customer_throttle.clear(&ip);
    LoginEventRepo::record(&state.pool, customer.id, Some(&ip), user_agent, true).await?;
    CustomerRepo::record_successful_login(&state.pool, customer.id).await?;

    let claims = CustomerClaims::new(customer.id);
    let csrf = claims.csrf.clone();
    let token = sign_claims(&claims, &state.config.session)
        .map_err(|e| AppError::InternalError(format!("Session signing error: {e}")))?;

    tracing::info!(customer_id = customer.id, "Customer login");

    Ok((
        jar.add(session_cookie(CUSTOMER_COOKIE, token)),
        Json(CustomerLoginResponse {
            customer_id: customer.id,
            name: customer.name,
            email: customer.email,
            csrf,
        }),
    )
        .into_response())
}

/// POST /customer/logout
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> AppResult<Response> {
    require_portal(&state)?;
    Ok((
        jar.add(removal_cookie(CUSTOMER_COOKIE)),
        StatusCode::NO_CONTENT,
    )
        .into_response())
}

/// One proof row on the customer dashboard.
#[derive(Debug, Serialize)]
pub struct DashboardProof {
    pub share_id: String,
    pub job_name: String,
    pub status: String,
    pub updated_at: Timestamp,
}

/// GET /customer/dashboard
///
/// The signed-in customer's proofs, most recently touched first.
pub async fn dashboard(
    State(state): State<AppState>,
    identity: CustomerIdentity,
) -> AppResult<Json<Vec<DashboardProof>>> {
    require_portal(&state)?;
    let proofs = ProofRepo::list_for_customer(&state.pool, identity.customer_id).await?;
    Ok(Json(
        proofs
            .into_iter()
            .map(|p| DashboardProof {
                share_id: p.share_id,
                job_name: p.job_name,
                status: p.status,
                updated_at: p.updated_at,
            })
            .collect(),
    ))
}

/// GET /customer/proof/{share_id}
///
/// Ownership check, then hand off to the shared proof view.
pub async fn view_proof(
    State(state): State<AppState>,
    identity: CustomerIdentity,
    Path(share_id): Path<String>,
) -> AppResult<Response> {
    require_portal(&state)?;
    let proof = ProofRepo::find_by_share_id(&state.pool, &share_id)
        .await?
        .filter(|p| p.customer_id == Some(identity.customer_id))
        .ok_or_else(|| AppError::NotFound("Proof not found".into()))?;
    Ok(Redirect::to(&format!("/proof/{}", proof.share_id)).into_response())
}

// ---------------------------------------------------------------------------
// Password reset
// ---------------------------------------------------------------------------

/// Request body for `POST /customer/reset`.
#[derive(Debug, Deserialize)]
pub struct ResetRequest {
    pub email: String,
}

/// POST /customer/reset
///
/// Request a password reset link. The response is success-shaped whether or
/// not the email matches an account, to avoid account enumeration.
pub async fn reset_request(
    State(state): State<AppState>,
    Json(input): Json<ResetRequest>,
) -> AppResult<Json<serde_json::Value>> {
    require_portal(&state)?;

    let email = input.email.trim().to_lowercase();
    let response = Json(serde_json::json!({
        "message": "If the email is registered, a reset link will arrive shortly."
    }));

    let Some(customer) = CustomerRepo::find_by_email(&state.pool, &email).await? else {
        return Ok(response);
    };
    let Some(credential) = CustomerRepo::find_credential(&state.pool, customer.id).await? else {
        return Ok(response);
    };
    if !credential.is_active {
        return Ok(response);
    }

    let (raw_token, _) = AuthTokenRepo::issue(
        &state.pool,
        customer.id,
        TokenPurpose::Reset,
        RESET_TOKEN_HOURS,
        None,
    )
    .await?;

    let reset_link = state.config.reset_url(&raw_token);
    let (subject, body) = compose_token_email(
        &state.config.company_name,
        &customer.name,
        TokenPurpose::Reset,
        &reset_link,
    );
    queue_email(
        &state.mailer,
        &state.mailer_config,
        None,
        None,
        None,
        OutgoingEmail {
            subject,
            body,
            html_body: None,
            recipient: customer.email.clone(),
        },
    );

    Ok(response)
}

// ---------------------------------------------------------------------------
// Token completion (reset + invite accept)
// ---------------------------------------------------------------------------

/// Details shown on the set-password page for a valid token.
#[derive(Debug, Serialize)]
pub struct TokenDetails {
    pub customer_name: String,
    pub purpose: String,
}

/// Form body for completing a reset or invite.
#[derive(Debug, Deserialize)]
pub struct SetPasswordRequest {
    pub password: String,
    pub confirm_password: String,
}

/// GET /customer/reset/{token}
pub async fn reset_details(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> AppResult<Json<TokenDetails>> {
    require_portal(&state)?;
    token_details(&state, &token, TokenPurpose::Reset).await
}

/// POST /customer/reset/{token}
pub async fn reset_complete(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(input): Json<SetPasswordRequest>,
) -> AppResult<Json<serde_json::Value>> {
    require_portal(&state)?;
    complete_token(&state, &token, TokenPurpose::Reset, &input).await?;
    Ok(Json(serde_json::json!({
        "message": "Password updated. You can sign in now."
    })))
}

/// GET /customer/invite/{token}
pub async fn invite_details(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> AppResult<Json<TokenDetails>> {
    require_portal(&state)?;
    token_details(&state, &token, TokenPurpose::Invite).await
}

/// POST /customer/invite/{token}
pub async fn invite_complete(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(input): Json<SetPasswordRequest>,
) -> AppResult<Json<serde_json::Value>> {
    require_portal(&state)?;
    complete_token(&state, &token, TokenPurpose::Invite, &input).await?;
    Ok(Json(serde_json::json!({
        "message": "Account ready. Please sign in with your new password."
    })))
}

async fn resolve_token(
    state: &AppState,
    raw_token: &str,
    purpose: TokenPurpose,
) -> AppResult<CustomerAuthToken> {
    AuthTokenRepo::find_by_raw(&state.pool, raw_token, purpose)
        .await?
        .ok_or_else(|| AppError::NotFound("The link is invalid or has expired".into()))
}

async fn token_details(
    state: &AppState,
    raw_token: &str,
    purpose: TokenPurpose,
) -> AppResult<Json<TokenDetails>> {
    let token = resolve_token(state, raw_token, purpose).await?;
    let customer = CustomerRepo::find_by_id(&state.pool, token.customer_id)
        .await?
        .ok_or_else(|| AppError::NotFound("The link is invalid or has expired".into()))?;
    Ok(Json(TokenDetails {
        customer_name: customer.name,
        purpose: purpose.as_str().to_string(),
    }))
}

/// Validate the password, upsert the credential, and consume the token --
/// credential write and consumption commit together.
async fn complete_token(
    state: &AppState,
    raw_token: &str,
    purpose: TokenPurpose,
    input: &SetPasswordRequest,
) -> AppResult<()> {
    let token = resolve_token(state, raw_token, purpose).await?;

    validate_password(&input.password).map_err(AppError::Core)?;
    if input.password != input.confirm_password {
        return Err(AppError::Core(CoreError::Validation(
            "Passwords do not match".into(),
        )));
    }

    let password_hash = hash_password(&input.password)
        .map_err(|e| AppError::InternalError(format!("Password hash error: {e}")))?;

    let mut tx = state.pool.begin().await?;
    CustomerRepo::upsert_credential(&mut *tx, token.customer_id, &password_hash).await?;
    AuthTokenRepo::consume(&mut *tx, token.id).await?;
    tx.commit().await?;

    tracing::info!(
        customer_id = token.customer_id,
        purpose = purpose.as_str(),
        "Customer credential set via token"
    );
    Ok(())
}
