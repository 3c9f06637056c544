//! Handlers for staff login and logout.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};

use proofdesk_core::error::CoreError;
use proofdesk_core::password::verify_password;
use proofdesk_db::models::user::UserResponse;
use proofdesk_db::repositories::UserRepo;

use crate::client_ip::ClientIp;
use crate::error::{AppError, AppResult};
use crate::sessions::{removal_cookie, session_cookie, sign_claims, StaffClaims, STAFF_COOKIE};
use crate::state::AppState;

/// Request body for `POST /api/v1/auth/login`.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Successful staff login response.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user: UserResponse,
    /// CSRF token for this session's state-changing forms.
    pub csrf: String,
}

/// POST /api/v1/auth/login
///
/// Authenticate a staff user with email + password. Lockout applies per
/// source IP before credentials are consulted; a successful login clears
/// the IP's failure history and issues the staff session cookie.
pub async fn login(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    jar: CookieJar,
    Json(input): Json<LoginRequest>,
) -> AppResult<impl IntoResponse> {
    let email = input.email.trim();
    let password = input.password.trim();
    if email.is_empty() || password.is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "Email and password are required".into(),
        )));
    }

    if let Some(retry_after) = state.staff_throttle.locked_for(&ip) {
        return Err(AppError::RateLimited { retry_after });
    }

    let user = match UserRepo::find_by_email(&state.pool, email).await? {
        Some(user) => user,
        None => {
            state.staff_throttle.record_failure(&ip);
            return Err(AppError::Core(CoreError::Unauthorized(
                "Invalid email or password".into(),
            )));
        }
    };

    let password_valid = verify_password(password, &user.password_hash)
        .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))?;
    if !password_valid {
        state.staff_throttle.record_failure(&ip);
        return Err(AppError::Core(CoreError::Unauthorized(
            "Invalid email or password".into(),
        )));
    }

    if !user.is_active {
        return Err(AppError::Core(CoreError::Forbidden(
            "Account is inactive. Contact an administrator.".into(),
        )));
    }

    state.staff_throttle.clear(&ip);

    let claims = StaffClaims::new(user.id, &user.role);
    let csrf = claims.csrf.clone();
    let token = sign_claims(&claims, &state.config.session)
        .map_err(|e| AppError::InternalError(format!("Session signing error: {e}")))?;

    tracing::info!(user_id = user.id, role = %user.role, "Staff login");

    Ok((
        jar.add(session_cookie(STAFF_COOKIE, token)),
        Json(LoginResponse {
            user: UserResponse::from(user),
            csrf,
        }),
    ))
}

/// POST /api/v1/auth/logout
///
/// Clear the staff session cookie. Other identity planes are untouched.
pub async fn logout(jar: CookieJar) -> impl IntoResponse {
    (jar.add(removal_cookie(STAFF_COOKIE)), StatusCode::NO_CONTENT)
}
