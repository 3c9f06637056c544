//! Handlers for guest PIN challenge and verification.
//!
//! A guest arrives on the emailed `/customer/guest/{token}` link, sees the
//! PIN challenge, and on a correct PIN the proof's share id is added to
//! their guest session so repeat views need no PIN until the session ends.
//! `/proof/{share_id}/unlock` is the same challenge reached by redirect
//! when a locked proof is opened directly; it verifies against any of the
//! proof's active grants.

use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::{Form, Json};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};

use proofdesk_core::error::CoreError;
use proofdesk_core::password::verify_password;
use proofdesk_db::models::guest_access::ProofGuestAccess;
use proofdesk_db::models::proof::Proof;
use proofdesk_db::repositories::{GuestAccessRepo, ProofRepo};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::GuestSession;
use crate::sessions::{session_cookie, sign_claims, GUEST_COOKIE};
use crate::state::AppState;

/// PIN challenge rendered for a locked proof.
#[derive(Debug, Serialize)]
pub struct GuestChallenge {
    pub share_id: String,
    pub job_name: String,
    pub requires_pin: bool,
    /// Echo this in the challenge form's `csrf_token` field.
    pub csrf: String,
}

/// Form body for PIN verification.
#[derive(Debug, Deserialize)]
pub struct PinForm {
    pub pin: String,
    pub csrf_token: String,
}

/// Optional onward URL preserved across the challenge.
#[derive(Debug, Deserialize)]
pub struct NextParam {
    pub next: Option<String>,
}

/// GET /customer/guest/{token}
///
/// Render the PIN challenge for an active grant. Already-unlocked sessions
/// skip straight to the proof view. The active predicate is re-evaluated
/// on every request; revoked or expired links are not found.
pub async fn challenge(
    State(state): State<AppState>,
    Path(token): Path<String>,
    session: GuestSession,
    jar: CookieJar,
) -> AppResult<Response> {
    let (_, proof) = resolve_grant(&state, &token).await?;

    if session.claims.unlocked.iter().any(|s| *s == proof.share_id) {
        return Ok(Redirect::to(&format!("/proof/{}", proof.share_id)).into_response());
    }

    render_challenge(&state, session, jar, &proof)
}

/// POST /customer/guest/{token}
///
/// Verify the PIN for this grant. On success the proof is unlocked in the
/// guest session and the requester is redirected to the proof view (or the
/// preserved `next` URL).
pub async fn verify(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Query(next): Query<NextParam>,
    session: GuestSession,
    jar: CookieJar,
    Form(form): Form<PinForm>,
) -> AppResult<Response> {
    let (grant, proof) = resolve_grant(&state, &token).await?;
    check_csrf(&session, &form)?;
    verify_pin_and_unlock(&state, session, jar, &[grant], &proof, &form, next.next).await
}

/// GET /proof/{share_id}/unlock
///
/// The challenge reached by redirect from a locked proof view.
pub async fn challenge_by_share_id(
    State(state): State<AppState>,
    Path(share_id): Path<String>,
    session: GuestSession,
    jar: CookieJar,
) -> AppResult<Response> {
    let (proof, grants) = resolve_proof_grants(&state, &share_id).await?;

    if session.claims.unlocked.iter().any(|s| *s == proof.share_id) {
        return Ok(Redirect::to(&format!("/proof/{}", proof.share_id)).into_response());
    }

    render_challenge(&state, session, jar, &proof)
}

/// POST /proof/{share_id}/unlock
///
/// Verify the PIN against any of the proof's active grants.
pub async fn verify_by_share_id(
    State(state): State<AppState>,
    Path(share_id): Path<String>,
    Query(next): Query<NextParam>,
    session: GuestSession,
    jar: CookieJar,
    Form(form): Form<PinForm>,
) -> AppResult<Response> {
    let (proof, grants) = resolve_proof_grants(&state, &share_id).await?;
    check_csrf(&session, &form)?;
    verify_pin_and_unlock(&state, session, jar, &grants, &proof, &form, next.next).await
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn resolve_grant(
    state: &AppState,
    token: &str,
) -> AppResult<(ProofGuestAccess, Proof)> {
    let grant = GuestAccessRepo::find_by_token(&state.pool, token)
        .await?
        .filter(|g| g.is_active())
        .ok_or_else(|| AppError::NotFound("Guest link is invalid or has expired".into()))?;
    let proof = ProofRepo::find_by_id(&state.pool, grant.proof_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Proof not found".into()))?;
    Ok((grant, proof))
}

async fn resolve_proof_grants(
    state: &AppState,
    share_id: &str,
) -> AppResult<(Proof, Vec<ProofGuestAccess>)> {
    let proof = ProofRepo::find_by_share_id(&state.pool, share_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Proof not found".into()))?;
    let grants: Vec<ProofGuestAccess> = GuestAccessRepo::list_for_proof(&state.pool, proof.id)
        .await?
        .into_iter()
        .filter(|g| g.is_active())
        .collect();
    if grants.is_empty() {
        return Err(AppError::NotFound(
            "This proof has no active guest access".into(),
        ));
    }
    Ok((proof, grants))
}

fn check_csrf(session: &GuestSession, form: &PinForm) -> AppResult<()> {
    if session.is_fresh || session.claims.csrf != form.csrf_token {
        return Err(AppError::BadRequest(
            "Your session expired. Please try again.".into(),
        ));
    }
    Ok(())
}

fn render_challenge(
    state: &AppState,
    session: GuestSession,
    jar: CookieJar,
    proof: &Proof,
) -> AppResult<Response> {
    let csrf = session.claims.csrf.clone();
    let token = sign_claims(&session.claims, &state.config.session)
        .map_err(|e| AppError::InternalError(format!("Session signing error: {e}")))?;
    let body = Json(GuestChallenge {
        share_id: proof.share_id.clone(),
        job_name: proof.job_name.clone(),
        requires_pin: true,
        csrf,
    });
    Ok((jar.add(session_cookie(GUEST_COOKIE, token)), body).into_response())
}

async fn verify_pin_and_unlock(
    state: &AppState,
    mut session: GuestSession,
    jar: CookieJar,
    grants: &[ProofGuestAccess],
    proof: &Proof,
    form: &PinForm,
    next: Option<String>,
) -> AppResult<Response> {
    let pin = form.pin.trim();
    let mut matched: Option<&ProofGuestAccess> = None;
    for grant in grants {
        let valid = verify_password(pin, &grant.pin_hash)
            .map_err(|e| AppError::InternalError(format!("PIN verification error: {e}")))?;
        if valid {
            matched = Some(grant);
            break;
        }
    }

    let Some(grant) = matched else {
        tracing::debug!(proof_id = proof.id, "Guest PIN rejected");
        return Err(AppError::Core(CoreError::Unauthorized(
            "Incorrect PIN".into(),
        )));
    };

    GuestAccessRepo::mark_accessed(&state.pool, grant.id).await?;

    session.claims.unlock(&proof.share_id);
    let token = sign_claims(&session.claims, &state.config.session)
        .map_err(|e| AppError::InternalError(format!("Session signing error: {e}")))?;

    let target = next.unwrap_or_else(|| format!("/proof/{}", proof.share_id));
    Ok((
        jar.add(session_cookie(GUEST_COOKIE, token)),
        Redirect::to(&target),
    )
        .into_response())
}
