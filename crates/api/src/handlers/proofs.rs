//! Handlers for proof upload, versioning, viewing, and local file serving.

use axum::extract::{Multipart, Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;
use serde::Serialize;

use proofdesk_core::error::CoreError;
use proofdesk_core::password::hash_password;
use proofdesk_core::secrets::{generate_guest_pin, generate_guest_token, generate_share_id};
use proofdesk_core::status::{ProofStatus, TokenPurpose, ROLE_DESIGNER};
use proofdesk_core::types::{DbId, Timestamp};
use proofdesk_db::models::designer::Designer;
use proofdesk_db::models::guest_access::CreateGuestAccess;
use proofdesk_db::models::proof::{CreateProof, Proof};
use proofdesk_db::models::proof_version::CreateProofVersion;
use proofdesk_db::models::user::User;
use proofdesk_db::repositories::{
    AuthTokenRepo, CustomerRepo, DecisionRepo, DesignerRepo, GuestAccessRepo, ProofRepo,
    ProofVersionRepo, UserRepo,
};
use proofdesk_mailer::notify::{
    compose_guest_email, queue_customer_notification, queue_email, NotificationRequest,
};
use proofdesk_mailer::{OutgoingEmail, SmtpIdentity};

use crate::authz::{self, AccessRequest, ProofAccess};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::{GuestSession, OptionalCustomer, OptionalStaff, StaffUser};
use crate::state::AppState;
use crate::storage::DEFAULT_URL_TTL;

/// File extensions accepted for proof uploads.
const ALLOWED_EXTENSIONS: &[&str] = &[".pdf", ".jpg", ".jpeg", ".png"];

// ---------------------------------------------------------------------------
// Upload form parsing
// ---------------------------------------------------------------------------

/// Who the notification email goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RecipientMode {
    Customer,
    Guest,
}

/// Parsed multipart upload form.
struct UploadForm {
    file_name: Option<String>,
    file_bytes: Vec<u8>,
    job_name: String,
    notes: Option<String>,
    designer_id: Option<DbId>,
    customer_id: Option<DbId>,
    notify: bool,
    notify_subject: Option<String>,
    notify_body: Option<String>,
    recipient_mode: RecipientMode,
    guest_email: Option<String>,
    guest_name: Option<String>,
    guest_expires_hours: Option<i64>,
}

impl Default for UploadForm {
    fn default() -> Self {
        Self {
            file_name: None,
            file_bytes: Vec::new(),
            job_name: String::new(),
            notes: None,
            designer_id: None,
            customer_id: None,
            notify: false,
            notify_subject: None,
            notify_body: None,
            recipient_mode: RecipientMode::Customer,
            guest_email: None,
            guest_name: None,
            guest_expires_hours: None,
        }
    }
}

async fn read_upload_form(mut multipart: Multipart) -> AppResult<UploadForm> {
    let mut form = UploadForm::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Malformed multipart body: {e}")))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        match name.as_str() {
            "file" => {
                form.file_name = field.file_name().map(str::to_string);
                form.file_bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("File read error: {e}")))?
                    .to_vec();
            }
            other => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Field read error: {e}")))?;
                match other {
                    "job_name" => form.job_name = value.trim().to_string(),
                    "notes" => form.notes = non_empty(value),
                    "designer_id" => form.designer_id = value.trim().parse().ok(),
                    "customer_id" => form.customer_id = value.trim().parse().ok(),
                    "notify_customer" => {
                        form.notify = matches!(
                            value.trim().to_lowercase().as_str(),
                            "on" | "true" | "1" | "yes"
                        )
                    }
                    "notify_subject" => form.notify_subject = non_empty(value),
                    "notify_body" => form.notify_body = non_empty(value),
                    "recipient_mode" => {
                        if value.trim().eq_ignore_ascii_case("guest") {
                            form.recipient_mode = RecipientMode::Guest;
                        }
                    }
                    "guest_email" => form.guest_email = non_empty(value),
                    "guest_name" => form.guest_name = non_empty(value),
                    "guest_expires_hours" => {
                        form.guest_expires_hours = value.trim().parse().ok()
                    }
                    _ => {}
                }
            }
        }
    }
    Ok(form)
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Lowercased extension (with leading dot) of an uploaded filename.
fn file_extension(filename: &str) -> String {
    match filename.rfind('.') {
        Some(idx) => filename[idx..].to_lowercase(),
        None => String::new(),
    }
}

fn check_extension(filename: &str) -> AppResult<String> {
    let ext = file_extension(filename);
    if ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
        Ok(ext)
    } else {
        Err(AppError::Core(CoreError::Validation(
            "Unsupported file type. Please upload PDF or image (JPG, JPEG, PNG).".into(),
        )))
    }
}

// ---------------------------------------------------------------------------
// Upload
// ---------------------------------------------------------------------------

/// Response body for a successful upload.
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub share_id: String,
    pub share_url: String,
    pub job_name: String,
    pub notification_status: Option<String>,
    pub notification_error: Option<String>,
    pub guest_link: Option<String>,
}

/// POST /api/v1/proofs
///
/// Multipart proof upload. Stores the file, records the proof and its first
/// version, and optionally notifies the customer (minting a portal invite
/// when appropriate) or issues a guest access grant instead.
pub async fn upload(
    State(state): State<AppState>,
    staff: StaffUser,
    multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    let form = read_upload_form(multipart).await?;

    let uploader = UserRepo::find_by_id(&state.pool, staff.user_id)
        .await?
        .ok_or_else(|| AppError::InternalError("Session user no longer exists".into()))?;

    // Designers always upload as themselves; admins pick a designer or send
    // from their own account.
    let designer = if staff.role == ROLE_DESIGNER {
        DesignerRepo::find_by_user_id(&state.pool, staff.user_id).await?
    } else {
        match form.designer_id {
            Some(id) => Some(
                DesignerRepo::find_by_id(&state.pool, id)
                    .await?
                    .ok_or_else(|| {
                        AppError::Core(CoreError::Validation(
                            "Please select a valid designer before uploading.".into(),
                        ))
                    })?,
            ),
            None => None,
        }
    };

    let file_name = form
        .file_name
        .clone()
        .ok_or_else(|| AppError::Core(CoreError::Validation("No file selected.".into())))?;
    if form.file_bytes.is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "No file selected.".into(),
        )));
    }
    let ext = check_extension(&file_name)?;

    let customer = match form.customer_id {
        Some(id) => Some(CustomerRepo::find_by_id(&state.pool, id).await?.ok_or_else(
            || AppError::Core(CoreError::Validation("Please select a valid customer.".into())),
        )?),
        None => None,
    };

    if form.recipient_mode == RecipientMode::Guest && form.guest_email.is_none() {
        return Err(AppError::Core(CoreError::Validation(
            "A guest email address is required.".into(),
        )));
    }

    let share_id = generate_share_id();
    let storage_key = format!("{share_id}{ext}");
    state.storage.save(&form.file_bytes, &storage_key).await?;

    let mime_type = mime_guess::from_path(&storage_key)
        .first()
        .map(|m| m.to_string());

    let mut tx = state.pool.begin().await?;
    let proof = ProofRepo::create(
        &mut *tx,
        &CreateProof {
            share_id: share_id.clone(),
            job_name: if form.job_name.is_empty() {
                share_id.clone()
            } else {
                form.job_name.clone()
            },
            notes: form.notes.clone(),
            designer_id: designer.as_ref().map(|d| d.id),
            customer_id: customer.as_ref().map(|c| c.id),
        },
    )
    .await?;
    let version = ProofVersionRepo::create(
        &mut *tx,
        &CreateProofVersion {
            proof_id: proof.id,
            storage_key: storage_key.clone(),
            original_filename: file_name,
            mime_type,
            file_size: Some(form.file_bytes.len() as i64),
            uploaded_by_user_id: Some(uploader.id),
        },
    )
    .await?;
    tx.commit().await?;

    let share_url = state.config.share_url(&share_id);

    let mut notification_status = None;
    let mut notification_error = None;
    let mut guest_link = None;

    match form.recipient_mode {
        RecipientMode::Guest => {
            if let Some(guest_email) = &form.guest_email {
                guest_link = Some(
                    issue_guest_access(
                        &state,
                        &proof,
                        designer.as_ref(),
                        &uploader,
                        guest_email,
                        form.guest_name.as_deref(),
                        form.guest_expires_hours,
                    )
                    .await?,
                );
            }
        }
        RecipientMode::Customer => {
            if form.notify {
                if let Some(customer) = &customer {
                    match notify_customer(&state, &staff, &uploader, designer.as_ref(), &proof, &version, customer, &form, &share_url).await {
                        Ok(status) => notification_status = Some(status),
                        Err(error) => {
                            tracing::warn!(error = %error, proof_id = proof.id, "Customer notification could not be queued");
                            notification_status = Some("failed".into());
                            notification_error = Some(error.to_string());
                        }
                    }
                }
            }
        }
    }

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            share_id,
            share_url,
            job_name: proof.job_name,
            notification_status,
            notification_error,
            guest_link,
        }),
    ))
}

/// Create the guest grant, email the link and PIN, and return the link.
async fn issue_guest_access(
    state: &AppState,
    proof: &Proof,
    designer: Option<&Designer>,
    uploader: &User,
    guest_email: &str,
    guest_name: Option<&str>,
    expires_hours: Option<i64>,
) -> AppResult<String> {
    let hours = match expires_hours {
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

    GuestAccessRepo::create(
        &state.pool,
        &CreateGuestAccess {
            proof_id: proof.id,
            email: guest_email.to_string(),
            name: guest_name.map(str::to_string),
            access_token: access_token.clone(),
            pin_hash,
            expires_at: Some(chrono::Utc::now() + chrono::Duration::hours(hours)),
        },
    )
    .await?;

    let guest_link = state.config.guest_url(&access_token);
    let (subject, body) = compose_guest_email(guest_name, &proof.job_name, &guest_link, &pin);
    let (identity, fallback_sender, fallback_reply_to) =
        resolve_sender(state, designer, Some(uploader)).await?;
    queue_email(
        &state.mailer,
        &state.mailer_config,
        identity,
        fallback_sender,
        fallback_reply_to,
        OutgoingEmail {
            subject,
            body,
            html_body: None,
            recipient: guest_email.to_string(),
        },
    );

    Ok(guest_link)
}

/// Queue the customer notification, minting a portal invite first when the
/// customer has no active credential.
#[allow(clippy::too_many_arguments)]
async fn notify_customer(
    state: &AppState,
    staff: &StaffUser,
    uploader: &User,
    designer: Option<&Designer>,
    proof: &Proof,
    version: &proofdesk_db::models::proof_version::ProofVersion,
    customer: &proofdesk_db::models::customer::Customer,
    form: &UploadForm,
    share_url: &str,
) -> AppResult<String> {
    let smtp_user = match designer {
        Some(designer) => UserRepo::find_by_id(&state.pool, designer.user_id).await?,
        None => None,
    };
    let smtp_user = smtp_user.unwrap_or_else(|| uploader.clone());

    let sender_email = designer
        .map(|d| d.email.clone())
        .or_else(|| smtp_user.smtp_sender.clone())
        .or_else(|| Some(smtp_user.email.clone()));
    let reply_to_email = designer
        .and_then(|d| d.reply_to_email.clone())
        .or_else(|| smtp_user.smtp_reply_to.clone())
        .or_else(|| Some(smtp_user.email.clone()));

    // Mint an invite when the portal is on and the customer cannot sign in
    // yet. An existing pending invite is superseded rather than refused --
    // the upload flow must not fail on a stale invite.
    let mut invite_link = None;
    if state.config.customer_portal_enabled {
        let credential = CustomerRepo::find_credential(&state.pool, customer.id).await?;
        let needs_invite = credential.map(|c| !c.is_active).unwrap_or(true);
        if needs_invite {
            match AuthTokenRepo::issue(
                &state.pool,
                customer.id,
                TokenPurpose::Invite,
                state.config.invite_expiry_hours,
                Some(staff.user_id),
            )
            .await
            {
                Ok((raw_token, _)) => invite_link = Some(state.config.invite_url(&raw_token)),
                Err(error) => {
                    tracing::warn!(error = %error, customer_id = customer.id, "Customer invite could not be generated");
                }
            }
        }
    }

    let designer_name = designer
        .map(|d| d.display_name.clone())
        .unwrap_or_else(|| uploader.name.clone());

    let notification = queue_customer_notification(
        &state.pool,
        &state.mailer,
        &state.mailer_config,
        NotificationRequest {
            proof,
            proof_version: Some(version),
            customer,
            uploader: Some(uploader),
            smtp_user: Some(&smtp_user),
            designer_name,
            share_url: share_url.to_string(),
            subject_template: form.notify_subject.clone(),
            body_template: form.notify_body.clone(),
            sender_email,
            reply_to_email,
            invite_link,
        },
    )
    .await?;

    Ok(notification.status)
}

/// Resolve the SMTP identity and fallback sender/reply-to for one-off mail
/// (guest credentials, decision notices) the way notifications do.
async fn resolve_sender(
    state: &AppState,
    designer: Option<&Designer>,
    uploader: Option<&User>,
) -> AppResult<(Option<SmtpIdentity>, Option<String>, Option<String>)> {
    let smtp_user = match designer {
        Some(designer) => UserRepo::find_by_id(&state.pool, designer.user_id).await?,
        None => uploader.cloned(),
    };
    let identity = smtp_user.as_ref().and_then(SmtpIdentity::from_user);

    let fallback_sender = designer
        .map(|d| d.email.clone())
        .or_else(|| smtp_user.as_ref().and_then(|u| u.smtp_sender.clone()))
        .or_else(|| smtp_user.as_ref().map(|u| u.email.clone()));
    let fallback_reply_to = designer
        .and_then(|d| d.reply_to_email.clone())
        .or_else(|| smtp_user.as_ref().and_then(|u| u.smtp_reply_to.clone()))
        .or_else(|| smtp_user.as_ref().map(|u| u.email.clone()));

    Ok((identity, fallback_sender, fallback_reply_to))
}

// ---------------------------------------------------------------------------
// New version
// ---------------------------------------------------------------------------

/// Response body for a new version upload.
#[derive(Debug, Serialize)]
pub struct NewVersionResponse {
    pub version_id: DbId,
    pub storage_key: String,
    pub status: String,
}

/// POST /api/v1/proofs/{share_id}/versions
///
/// Upload a new file revision. The proof's status resets to pending.
pub async fn new_version(
    State(state): State<AppState>,
    staff: StaffUser,
    Path(share_id): Path<String>,
    multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    let proof = ProofRepo::find_by_share_id(&state.pool, &share_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Proof not found".into()))?;

    let form = read_upload_form(multipart).await?;
    let file_name = form
        .file_name
        .ok_or_else(|| AppError::Core(CoreError::Validation("No file selected.".into())))?;
    if form.file_bytes.is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "No file selected.".into(),
        )));
    }
    let ext = check_extension(&file_name)?;

    let count = ProofVersionRepo::count_for_proof(&state.pool, proof.id).await?;
    let storage_key = format!("{}_v{}{}", proof.share_id, count + 1, ext);
    state.storage.save(&form.file_bytes, &storage_key).await?;

    let mime_type = mime_guess::from_path(&storage_key)
        .first()
        .map(|m| m.to_string());

    let mut tx = state.pool.begin().await?;
    let version = ProofVersionRepo::create(
        &mut *tx,
        &CreateProofVersion {
            proof_id: proof.id,
            storage_key: storage_key.clone(),
            original_filename: file_name,
            mime_type,
            file_size: Some(form.file_bytes.len() as i64),
            uploaded_by_user_id: Some(staff.user_id),
        },
    )
    .await?;
    ProofRepo::set_status(&mut *tx, proof.id, ProofStatus::Pending.as_str()).await?;
    tx.commit().await?;

    Ok((
        StatusCode::CREATED,
        Json(NewVersionResponse {
            version_id: version.id,
            storage_key,
            status: ProofStatus::Pending.as_str().to_string(),
        }),
    ))
}

// ---------------------------------------------------------------------------
// Proof view
// ---------------------------------------------------------------------------

/// One version option on the proof view.
#[derive(Debug, Serialize)]
pub struct VersionView {
    pub id: DbId,
    pub file_url: String,
    pub file_ext: String,
    pub created_at: Timestamp,
}

/// The proof review page payload.
#[derive(Debug, Serialize)]
pub struct ProofView {
    pub share_id: String,
    pub job_name: String,
    pub notes: Option<String>,
    pub status: String,
    pub designer: Option<String>,
    pub approver_name: Option<String>,
    pub file_url: Option<String>,
    pub file_ext: Option<String>,
    pub latest_version_id: Option<DbId>,
    pub versions: Vec<VersionView>,
    /// Ask the page to show the "sign in to your portal" banner.
    pub customer_portal_banner: bool,
    pub customer_login_url: Option<String>,
}

/// GET /proof/{share_id}
///
/// The client-facing review page, gated by the layered access policy.
pub async fn show(
    State(state): State<AppState>,
    OptionalStaff(staff): OptionalStaff,
    OptionalCustomer(customer): OptionalCustomer,
    guest: GuestSession,
    Path(share_id): Path<String>,
) -> AppResult<Response> {
    let proof = ProofRepo::find_by_share_id(&state.pool, &share_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Job not found".into()))?;

    let active_guest_grants = GuestAccessRepo::count_active_for_proof(&state.pool, proof.id).await?;
    let access = authz::evaluate(&AccessRequest {
        proof_customer_id: proof.customer_id,
        share_id: &proof.share_id,
        active_guest_grants,
        staff: staff.as_ref(),
        customer: customer.as_ref(),
        guest_unlocked: &guest.claims.unlocked,
        portal_enabled: state.config.customer_portal_enabled,
        legacy_links_enabled: state.config.legacy_links_enabled,
    });

    let portal_banner = match access {
        ProofAccess::Granted { portal_banner } => portal_banner,
        ProofAccess::RequireGuestPin => {
            let next = format!("/proof/{}", proof.share_id);
            return Ok(
                Redirect::to(&format!("/proof/{}/unlock?next={next}", proof.share_id))
                    .into_response(),
            );
        }
        ProofAccess::RequireCustomerLogin => {
            return Ok(Redirect::to(&customer_login_redirect(&proof)).into_response());
        }
    };

    let versions = ProofVersionRepo::list_for_proof(&state.pool, proof.id).await?;
    let mut version_views = Vec::with_capacity(versions.len());
    for version in &versions {
        version_views.push(VersionView {
            id: version.id,
            file_url: state
                .storage
                .generate_url(&version.storage_key, DEFAULT_URL_TTL)
                .await?,
            file_ext: file_extension(&version.original_filename),
            created_at: version.created_at,
        });
    }
    let latest = versions.last();

    let designer_name = match proof.designer_id {
        Some(id) => DesignerRepo::find_by_id(&state.pool, id)
            .await?
            .map(|d| d.display_name),
        None => None,
    };
    let approver_name = DecisionRepo::latest_for_proof(&state.pool, proof.id)
        .await?
        .and_then(|d| d.approver_name);

    let customer_login_url = if state.config.customer_portal_enabled {
        Some(customer_login_redirect(&proof))
    } else {
        None
    };

    Ok(Json(ProofView {
        share_id: proof.share_id.clone(),
        job_name: proof.job_name.clone(),
        notes: proof.notes.clone(),
        status: proof.status.clone(),
        designer: designer_name,
        approver_name,
        file_url: version_views.last().map(|v| v.file_url.clone()),
        file_ext: version_views.last().map(|v| v.file_ext.clone()),
        latest_version_id: latest.map(|v| v.id),
        versions: version_views,
        customer_portal_banner: portal_banner,
        customer_login_url,
    })
    .into_response())
}

fn customer_login_redirect(proof: &Proof) -> String {
    format!(
        "/customer/login?next=/customer/proof/{}",
        proof.share_id
    )
}

// ---------------------------------------------------------------------------
// Local file serving
// ---------------------------------------------------------------------------

/// GET /storage/local/{key}
///
/// Serve a locally stored proof file. Only meaningful for the local
/// backend; other backends hand out direct URLs instead.
pub async fn serve_local(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> AppResult<Response> {
    let path = state
        .storage
        .resolve_path(&key)
        .map_err(|_| AppError::NotFound("File not found".into()))?;

    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|_| AppError::NotFound("File not found".into()))?;

    let content_type = mime_guess::from_path(&path)
        .first_or_octet_stream()
        .to_string();

    Ok(([(header::CONTENT_TYPE, content_type)], bytes).into_response())
}
