//! Session-cookie extractors for the three identity planes.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::extract::cookie::CookieJar;

use proofdesk_core::error::CoreError;
use proofdesk_core::status::ROLE_ADMIN;
use proofdesk_core::types::DbId;

use crate::error::AppError;
use crate::sessions::{
    verify_claims, CustomerClaims, GuestClaims, StaffClaims, CUSTOMER_COOKIE, GUEST_COOKIE,
    STAFF_COOKIE,
};
use crate::state::AppState;

/// Authenticated staff user extracted from the staff session cookie.
///
/// Use this as an extractor parameter in any handler that requires a
/// signed-in admin or designer.
#[derive(Debug, Clone)]
pub struct StaffUser {
    pub user_id: DbId,
    /// `"admin"` or `"designer"`.
    pub role: String,
    /// The session's CSRF token.
    pub csrf: String,
}

impl StaffUser {
    /// Returns `Ok(())` only for admins.
    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.role == ROLE_ADMIN {
            Ok(())
        } else {
            Err(AppError::Core(CoreError::Forbidden(
                "Administrator access required".into(),
            )))
        }
    }
}

impl FromRequestParts<AppState> for StaffUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        read_staff(parts, state).ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized("Staff sign-in required".into()))
        })
    }
}

/// Staff identity when present, `None` otherwise. Never rejects.
#[derive(Debug, Clone)]
pub struct OptionalStaff(pub Option<StaffUser>);

impl FromRequestParts<AppState> for OptionalStaff {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(OptionalStaff(read_staff(parts, state)))
    }
}

/// Authenticated portal customer extracted from the customer session cookie.
#[derive(Debug, Clone)]
pub struct CustomerIdentity {
    pub customer_id: DbId,
    pub csrf: String,
}

impl FromRequestParts<AppState> for CustomerIdentity {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        read_customer(parts, state).ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized("Customer sign-in required".into()))
        })
    }
}

/// Customer identity when present, `None` otherwise. Never rejects.
#[derive(Debug, Clone)]
pub struct OptionalCustomer(pub Option<CustomerIdentity>);

impl FromRequestParts<AppState> for OptionalCustomer {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(OptionalCustomer(read_customer(parts, state)))
    }
}

/// The guest plane's session. Always resolvable: an absent or invalid
/// cookie yields a fresh empty session (and [`GuestSession::is_fresh`] is
/// set so handlers know to emit the cookie).
#[derive(Debug, Clone)]
pub struct GuestSession {
    pub claims: GuestClaims,
    pub is_fresh: bool,
}

impl FromRequestParts<AppState> for GuestSession {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let claims = jar
            .get(GUEST_COOKIE)
            .and_then(|cookie| verify_claims::<GuestClaims>(cookie.value(), &state.config.session).ok());
        Ok(match claims {
            Some(claims) => GuestSession {
                claims,
                is_fresh: false,
            },
            None => GuestSession {
                claims: GuestClaims::new(),
                is_fresh: true,
            },
        })
    }
}

fn read_staff(parts: &Parts, state: &AppState) -> Option<StaffUser> {
    let jar = CookieJar::from_headers(&parts.headers);
    let cookie = jar.get(STAFF_COOKIE)?;
    let claims: StaffClaims = verify_claims(cookie.value(), &state.config.session).ok()?;
    Some(StaffUser {
        user_id: claims.sub,
        role: claims.role,
        csrf: claims.csrf,
    })
}

fn read_customer(parts: &Parts, state: &AppState) -> Option<CustomerIdentity> {
    let jar = CookieJar::from_headers(&parts.headers);
    let cookie = jar.get(CUSTOMER_COOKIE)?;
    let claims: CustomerClaims = verify_claims(cookie.value(), &state.config.session).ok()?;
    Some(CustomerIdentity {
        customer_id: claims.sub,
        csrf: claims.csrf,
    })
}
