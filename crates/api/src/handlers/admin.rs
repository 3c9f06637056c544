//! Staff JSON endpoints: customer management, invites, guest grants,
//! notification listings, and SMTP test sends.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use validator::Validate;

use proofdesk_core::error::CoreError;
use proofdesk_core::password::{hash_password, validate_password};
use proofdesk_core::secrets::{generate_guest_pin, generate_guest_token};
use proofdesk_core::status::{TokenPurpose, ROLE_ADMIN, ROLE_DESIGNER};
use proofdesk_core::types::{DbId, Timestamp};
use proofdesk_db::models::customer::{CreateCustomer, Customer};
use proofdesk_db::models::decision::Decision;
use proofdesk_db::models::designer::{CreateDesigner, Designer};
use proofdesk_db::models::guest_access::CreateGuestAccess;
use proofdesk_db::models::login_event::CustomerLoginEvent;
use proofdesk_db::models::notification::CustomerNotification;
use proofdesk_db::models::user::{CreateUser, UserResponse};
use proofdesk_db::repositories::{
    AuthTokenRepo, CustomerRepo, DecisionRepo, DesignerRepo, GuestAccessRepo, LoginEventRepo,
    NotificationRepo, ProofRepo, UserRepo,
};
use proofdesk_mailer::delivery::send_email;
use proofdesk_mailer::notify::{compose_guest_email, compose_token_email, queue_email};
use proofdesk_mailer::{OutgoingEmail, SmtpIdentity};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::StaffUser;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Staff users and designers
// ---------------------------------------------------------------------------

/// Request body for `POST /api/v1/users`.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(email(message = "A valid email address is required"))]
    pub email: String,
    pub name: String,
    pub password: String,
    /// `"admin"` or `"designer"`.
    pub role: String,
    /// Display name for the designer profile (designers only; defaults to
    /// the user's name).
    pub designer_display_name: Option<String>,
    pub designer_reply_to: Option<String>,
}

/// Response for a created staff user.
#[derive(Debug, Serialize)]
pub struct CreateUserResponse {
    pub user: UserResponse,
    pub designer: Option<Designer>,
}

/// POST /api/v1/users
///
/// Create a staff account (admin only). Designers also get their profile
/// row so they can own proofs and appear in the upload form.
pub async fn create_user(
    State(state): State<AppState>,
    staff: StaffUser,
    Json(input): Json<CreateUserRequest>,
) -> AppResult<impl IntoResponse> {
    staff.require_admin()?;
    input.validate()?;

    if input.role != ROLE_ADMIN && input.role != ROLE_DESIGNER {
        return Err(AppError::Core(CoreError::Validation(format!(
            "Unknown role '{}'",
            input.role
        ))));
    }
    validate_password(&input.password).map_err(AppError::Core)?;

    let password_hash = hash_password(&input.password)
        .map_err(|e| AppError::InternalError(format!("Password hash error: {e}")))?;

    let user = UserRepo::create(
        &state.pool,
        &CreateUser {
            email: input.email.trim().to_lowercase(),
            name: input.name.trim().to_string(),
            password_hash,
            role: input.role.clone(),
        },
    )
    .await?;

    let designer = if input.role == ROLE_DESIGNER {
        Some(
            DesignerRepo::create(
                &state.pool,
                &CreateDesigner {
                    user_id: user.id,
                    display_name: input
                        .designer_display_name
                        .clone()
                        .unwrap_or_else(|| user.name.clone()),
                    email: user.email.clone(),
                    reply_to_email: input.designer_reply_to.clone(),
                },
            )
            .await?,
        )
    } else {
        None
    };

    tracing::info!(user_id = user.id, role = %user.role, "Staff user created");

    Ok((
        StatusCode::CREATED,
        Json(CreateUserResponse {
            user: UserResponse::from(user),
            designer,
        }),
    ))
}

/// GET /api/v1/designers
///
/// Active designers, as offered in the upload form.
pub async fn list_designers(
    State(state): State<AppState>,
    _staff: StaffUser,
) -> AppResult<Json<Vec<Designer>>> {
    Ok(Json(DesignerRepo::list_active(&state.pool).await?))
}

// ---------------------------------------------------------------------------
// Customers
// ---------------------------------------------------------------------------

/// Request body for `POST /api/v1/customers`.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCustomerRequest {
    pub name: String,
    pub company_name: Option<String>,
    #[validate(email(message = "A valid email address is required"))]
    pub email: String,
}

/// POST /api/v1/customers
///
/// A duplicate email is a distinguishable 409 conflict, not a generic error.
pub async fn create_customer(
    State(state): State<AppState>,
    _staff: StaffUser,
    Json(input): Json<CreateCustomerRequest>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    let name = input.name.trim();
    if name.is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "Customer name is required".into(),
        )));
    }

    let customer = CustomerRepo::create(
        &state.pool,
        &CreateCustomer {
            name: name.to_string(),
            company_name: input.company_name.clone(),
            email: input.email.trim().to_lowercase(),
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(customer)))
}

/// GET /api/v1/customers
pub async fn list_customers(
    State(state): State<AppState>,
    _staff: StaffUser,
) -> AppResult<Json<Vec<Customer>>> {
    Ok(Json(CustomerRepo::list_all(&state.pool).await?))
}

// ---------------------------------------------------------------------------
// Invites
// ---------------------------------------------------------------------------

/// Request body for `POST /api/v1/customers/{id}/invite`.
#[derive(Debug, Default, Deserialize)]
pub struct IssueInviteRequest {
    /// Validity override in hours; must be positive when present.
    pub hours_valid: Option<i64>,
    /// Supersede an existing pending invite instead of refusing.
    #[serde(default)]
    pub allow_existing: bool,
    /// Mint the token without emailing it (link is returned to the caller).
    #[serde(default)]
    pub suppress_email: bool,
}

/// Response for an issued invite.
#[derive(Debug, Serialize)]
pub struct InviteResponse {
    pub invite_link: String,
    pub expires_at: Timestamp,
}

/// POST /api/v1/customers/{id}/invite
///
/// Issue a portal invite token. By default an unconsumed, unexpired invite
/// refuses a new one with a distinct `INVITE_PENDING` conflict; passing
/// `allow_existing` supersedes it (the prior token is marked consumed in
/// the same transaction as the new insert).
pub async fn issue_invite(
    State(state): State<AppState>,
    staff: StaffUser,
    Path(customer_id): Path<DbId>,
    Json(input): Json<IssueInviteRequest>,
) -> AppResult<impl IntoResponse> {
    if !state.config.customer_portal_enabled {
        return Err(AppError::BadRequest("Customer portal is not enabled.".into()));
    }

    let customer = CustomerRepo::find_by_id(&state.pool, customer_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "customer",
            id: customer_id,
        }))?;

    let hours_valid = match input.hours_valid {
        Some(h) if h <= 0 => {
            return Err(AppError::Core(CoreError::Validation(
                "Invite validity must be a positive number of hours.".into(),
            )))
        }
        Some(h) => h,
        None => state.config.invite_expiry_hours,
    };

    if !input.allow_existing {
        let pending =
            AuthTokenRepo::find_active(&state.pool, customer.id, TokenPurpose::Invite).await?;
        if pending.is_some() {
            return Err(AppError::InvitePending);
        }
    }

    let (raw_token, token) = AuthTokenRepo::issue(
        &state.pool,
        customer.id,
        TokenPurpose::Invite,
        hours_valid,
        Some(staff.user_id),
    )
    .await?;
    let invite_link = state.config.invite_url(&raw_token);

    if !input.suppress_email {
        let (subject, body) = compose_token_email(
            &state.config.company_name,
            &customer.name,
            TokenPurpose::Invite,
            &invite_link,
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
    }

    tracing::info!(customer_id = customer.id, "Customer invite issued");

    Ok((
        StatusCode::CREATED,
        Json(InviteResponse {
            invite_link,
            expires_at: token.expires_at,
        }),
    ))
}

/// Invite lifecycle summary for one customer.
#[derive(Debug, Serialize)]
pub struct InviteStatus {
    /// `active`, `pending`, `consumed`, `expired`, or `none`.
    pub state: String,
    pub detail: Option<String>,
}

/// GET /api/v1/customers/{id}/invite-status
pub async fn invite_status(
    State(state): State<AppState>,
    _staff: StaffUser,
    Path(customer_id): Path<DbId>,
) -> AppResult<Json<InviteStatus>> {
    let customer = CustomerRepo::find_by_id(&state.pool, customer_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "customer",
            id: customer_id,
        }))?;

    if let Some(credential) = CustomerRepo::find_credential(&state.pool, customer.id).await? {
        if credential.is_active {
            let detail = credential
                .last_login_at
                .map(|at| format!("Last login {}", at.format("%Y-%m-%d %H:%M UTC")));
            return Ok(Json(InviteStatus {
                state: "active".into(),
                detail,
            }));
        }
    }

    if let Some(active) =
        AuthTokenRepo::find_active(&state.pool, customer.id, TokenPurpose::Invite).await?
    {
        return Ok(Json(InviteStatus {
            state: "pending".into(),
            detail: Some(format!(
                "Expires {}",
                active.expires_at.format("%Y-%m-%d %H:%M UTC")
            )),
        }));
    }

    if let Some(latest) =
        AuthTokenRepo::find_latest(&state.pool, customer.id, TokenPurpose::Invite).await?
    {
        if let Some(consumed_at) = latest.consumed_at {
            return Ok(Json(InviteStatus {
                state: "consumed".into(),
                detail: Some(format!("Accepted {}", consumed_at.format("%Y-%m-%d %H:%M UTC"))),
            }));
        }
        return Ok(Json(InviteStatus {
            state: "expired".into(),
            detail: Some(format!(
                "Expired {}",
                latest.expires_at.format("%Y-%m-%d %H:%M UTC")
            )),
        }));
    }

    Ok(Json(InviteStatus {
        state: "none".into(),
        detail: None,
    }))
}

// ---------------------------------------------------------------------------
// Guest access grants
// ---------------------------------------------------------------------------

/// Request body for `POST /api/v1/proofs/{share_id}/guest-access`.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateGuestAccessRequest {
    #[validate(email(message = "A valid guest email address is required"))]
    pub email: String,
    pub name: Option<String>,
    /// Expiry override in hours; must be positive when present.
    pub expires_hours: Option<i64>,
}

/// Response for a created guest grant. The PIN travels only in the email.
#[derive(Debug, Serialize)]
pub struct GuestAccessResponse {
    pub id: DbId,
    pub email: String,
    pub guest_link: String,
    pub expires_at: Option<Timestamp>,
}

/// POST /api/v1/proofs/{share_id}/guest-access
///
/// Mint a guest grant for a proof and email the link plus PIN to the
/// recipient. An explicit non-positive expiry is a validation error; no
/// expiry input uses the configured default.
pub async fn create_guest_access(
    State(state): State<AppState>,
    staff: StaffUser,
    Path(share_id): Path<String>,
    Json(input): Json<CreateGuestAccessRequest>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;

    let proof = ProofRepo::find_by_share_id(&state.pool, &share_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Proof not found".into()))?;

    let hours = match input.expires_hours {
        Some(h) if h <= 0 => {
            return Err(AppError::Core(CoreError::Validation(
                "Guest access expiry must be a positive number of hours.".into(),
            )))
        }
        Some(h) => h,
        None => state.config.guest_expiry_hours,
    };

    let access_token = generate_guest_token();
    let pin = generate_guest_pin();
    let pin_hash = hash_password(&pin)
        .map_err(|e| AppError::InternalError(format!("PIN hash error: {e}")))?;

    let grant = GuestAccessRepo::create(
        &state.pool,
        &CreateGuestAccess {
            proof_id: proof.id,
            email: input.email.trim().to_lowercase(),
            name: input.name.clone(),
            access_token: access_token.clone(),
            pin_hash,
            expires_at: Some(chrono::Utc::now() + chrono::Duration::hours(hours)),
        },
    )
    .await?;

    let guest_link = state.config.guest_url(&access_token);
    let (subject, body) =
        compose_guest_email(input.name.as_deref(), &proof.job_name, &guest_link, &pin);
    let sender_user = UserRepo::find_by_id(&state.pool, staff.user_id).await?;
    let identity = sender_user.as_ref().and_then(SmtpIdentity::from_user);
    queue_email(
        &state.mailer,
        &state.mailer_config,
        identity,
        None,
        None,
        OutgoingEmail {
            subject,
            body,
            html_body: None,
            recipient: grant.email.clone(),
        },
    );

    Ok((
        StatusCode::CREATED,
        Json(GuestAccessResponse {
            id: grant.id,
            email: grant.email,
            guest_link,
            expires_at: grant.expires_at,
        }),
    ))
}

/// DELETE /api/v1/guest-access/{id}
///
/// Revoke a grant. Terminal: the link stops resolving immediately.
pub async fn revoke_guest_access(
    State(state): State<AppState>,
    _staff: StaffUser,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    let revoked = GuestAccessRepo::revoke(&state.pool, id).await?;
    if revoked {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::Core(CoreError::NotFound {
            entity: "guest access",
            id,
        }))
    }
}

/// GET /api/v1/customers/{id}/login-events
///
/// The customer's login audit trail, newest first.
pub async fn list_login_events(
    State(state): State<AppState>,
    _staff: StaffUser,
    Path(customer_id): Path<DbId>,
) -> AppResult<Json<Vec<CustomerLoginEvent>>> {
    let customer = CustomerRepo::find_by_id(&state.pool, customer_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "customer",
            id: customer_id,
        }))?;
    Ok(Json(
        LoginEventRepo::list_for_customer(&state.pool, customer.id).await?,
    ))
}

// ---------------------------------------------------------------------------
// Decisions
// ---------------------------------------------------------------------------

/// GET /api/v1/proofs/{share_id}/decisions
///
/// Full decision history for a proof, oldest first.
pub async fn list_decisions(
    State(state): State<AppState>,
    _staff: StaffUser,
    Path(share_id): Path<String>,
) -> AppResult<Json<Vec<Decision>>> {
    let proof = ProofRepo::find_by_share_id(&state.pool, &share_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Proof not found".into()))?;
    Ok(Json(
        DecisionRepo::list_for_proof(&state.pool, proof.id).await?,
    ))
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

/// GET /api/v1/proofs/{share_id}/notifications
pub async fn list_notifications(
    State(state): State<AppState>,
    _staff: StaffUser,
    Path(share_id): Path<String>,
) -> AppResult<Json<Vec<CustomerNotification>>> {
    let proof = ProofRepo::find_by_share_id(&state.pool, &share_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Proof not found".into()))?;
    Ok(Json(
        NotificationRepo::list_for_proof(&state.pool, proof.id).await?,
    ))
}

// ---------------------------------------------------------------------------
// SMTP test
// ---------------------------------------------------------------------------

/// Request body for `POST /api/v1/smtp/test`.
#[derive(Debug, Deserialize, Validate)]
pub struct SmtpTestRequest {
    #[validate(email(message = "A valid recipient address is required"))]
    pub recipient: String,
}

/// POST /api/v1/smtp/test
///
/// Send a test email through the caller's own SMTP configuration,
/// synchronously and with fallback disabled so the outcome reflects that
/// exact configuration. The result (and raw error, on failure) is recorded
/// on the user's SMTP status columns and surfaced to the caller.
pub async fn smtp_test(
    State(state): State<AppState>,
    staff: StaffUser,
    Json(input): Json<SmtpTestRequest>,
) -> AppResult<Json<serde_json::Value>> {
    input.validate()?;

    let user = UserRepo::find_by_id(&state.pool, staff.user_id)
        .await?
        .ok_or_else(|| AppError::InternalError("Session user no longer exists".into()))?;

    let identity = SmtpIdentity::from_user(&user).ok_or_else(|| {
        AppError::Core(CoreError::Validation(
            "Configure an SMTP host and port before sending a test email.".into(),
        ))
    })?;

    let email = OutgoingEmail {
        subject: format!("{} SMTP test", state.config.company_name),
        body: "This is a test email confirming your SMTP configuration works.".into(),
        html_body: None,
        recipient: input.recipient.trim().to_string(),
    };

    let result = send_email(
        &state.mailer_config,
        Some(&identity),
        false,
        None,
        None,
        &email,
    )
    .await;

    let now = chrono::Utc::now();
    match result {
        Ok(()) => {
            UserRepo::record_smtp_test(&state.pool, user.id, "ok", now, None).await?;
            Ok(Json(serde_json::json!({ "status": "ok" })))
        }
        Err(error) => {
            let message = error.to_string();
            UserRepo::record_smtp_test(&state.pool, user.id, "failed", now, Some(&message))
                .await?;
            Err(AppError::EmailDelivery(message))
        }
    }
}
