//! Handler for client decision submission.

use axum::extract::{Path, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::{Form, Json};
use serde::{Deserialize, Serialize};

use proofdesk_core::status::ProofStatus;
use proofdesk_db::models::decision::CreateDecision;
use proofdesk_db::repositories::{
    DecisionRepo, DesignerRepo, GuestAccessRepo, ProofRepo, ProofVersionRepo, UserRepo,
};
use proofdesk_mailer::notify::{compose_decision_email, queue_email};
use proofdesk_mailer::{OutgoingEmail, SmtpIdentity};

use crate::authz::{self, AccessRequest, ProofAccess};
use crate::client_ip::ClientIp;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::{GuestSession, OptionalCustomer, OptionalStaff};
use crate::state::AppState;

/// Form body for a decision submission.
#[derive(Debug, Deserialize)]
pub struct DecisionForm {
    /// `"approved"` approves; anything else declines.
    pub decision: String,
    pub approver_name: Option<String>,
    pub client_comment: Option<String>,
    pub client_email: Option<String>,
}

/// Response after recording a decision.
#[derive(Debug, Serialize)]
pub struct DecisionResponse {
    pub share_id: String,
    pub job_name: String,
    pub status: String,
    pub approver_name: Option<String>,
    pub designer: Option<String>,
}

/// POST /proof/{share_id}/decision
///
/// Record a client's approve/decline. Gated by the same layered policy as
/// viewing; the proof status after commit equals the decision status. The
/// designer is notified by queued email; a delivery failure never fails
/// the decision itself.
pub async fn submit(
    State(state): State<AppState>,
    OptionalStaff(staff): OptionalStaff,
    OptionalCustomer(customer): OptionalCustomer,
    guest: GuestSession,
    ClientIp(ip): ClientIp,
    Path(share_id): Path<String>,
    Form(form): Form<DecisionForm>,
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
    match access {
        ProofAccess::Granted { .. } => {}
        ProofAccess::RequireGuestPin => {
            return Ok(Redirect::to(&format!(
                "/proof/{}/unlock?next=/proof/{}",
                proof.share_id, proof.share_id
            ))
            .into_response());
        }
        ProofAccess::RequireCustomerLogin => {
            return Ok(Redirect::to(&format!(
                "/customer/login?next=/customer/proof/{}",
                proof.share_id
            ))
            .into_response());
        }
    }

    let status = if form.decision == "approved" {
        ProofStatus::Approved
    } else {
        ProofStatus::Declined
    };

    let approver_name = form
        .approver_name
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);
    let comment = form
        .client_comment
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    let latest_version = ProofVersionRepo::latest_for_proof(&state.pool, proof.id).await?;

    DecisionRepo::record(
        &state.pool,
        &CreateDecision {
            proof_id: proof.id,
            proof_version_id: latest_version.map(|v| v.id),
            status: status.as_str().to_string(),
            approver_name: approver_name.clone(),
            client_comment: comment.clone(),
            client_email: form.client_email.clone(),
            client_ip: Some(ip.clone()),
        },
    )
    .await?;

    tracing::info!(
        proof_id = proof.id,
        status = status.as_str(),
        "Decision recorded"
    );

    // Notify the designer. Best-effort: composition failures are logged and
    // the decision still stands.
    let designer = match proof.designer_id {
        Some(id) => DesignerRepo::find_by_id(&state.pool, id).await?,
        None => None,
    };
    let designer_name = designer.as_ref().map(|d| d.display_name.clone());

    let recipient = designer
        .as_ref()
        .map(|d| d.email.clone())
        .or_else(|| state.mailer_config.default_sender.clone());
    if let Some(recipient) = recipient {
        let designer_user = match designer.as_ref() {
            Some(d) => UserRepo::find_by_id(&state.pool, d.user_id).await?,
            None => None,
        };
        let identity = designer_user.as_ref().and_then(SmtpIdentity::from_user);
        let fallback_reply_to = designer
            .as_ref()
            .and_then(|d| d.reply_to_email.clone())
            .or_else(|| Some(recipient.clone()));

        let (subject, body) = compose_decision_email(
            &state.config.company_name,
            &proof.job_name,
            status.as_str(),
            approver_name.as_deref().unwrap_or(""),
            &ip,
            &chrono::Utc::now().to_rfc3339(),
            comment.as_deref(),
        );
        queue_email(
            &state.mailer,
            &state.mailer_config,
            identity,
            Some(recipient.clone()),
            fallback_reply_to,
            OutgoingEmail {
                subject,
                body,
                html_body: None,
                recipient,
            },
        );
    }

    Ok(Json(DecisionResponse {
        share_id: proof.share_id,
        job_name: proof.job_name,
        status: status.as_str().to_string(),
        approver_name,
        designer: designer_name,
    })
    .into_response())
}
