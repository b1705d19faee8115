use axum::extract::{Extension, Path, Query};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::database::manager::DatabaseManager;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::{access, invites};
use crate::types::{is_valid_email, InviteStatus, INVITABLE_ROLES};

#[derive(Debug, Deserialize)]
pub struct CreateInviteRequest {
    pub project_id: Uuid,
    pub email: String,
    pub role: String,
    /// Personal note; carried for the caller to include in its own delivery
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListInvitesQuery {
    pub project_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct AcceptInviteRequest {
    pub token: String,
}

/// POST /api/invites - Invite an email address to a project
///
/// Owner/admin only. Re-inviting an address with a pending invite renews
/// that invite (fresh token, role, expiry) instead of creating a duplicate.
/// Email delivery is delegated to the caller; the response carries the
/// accept link and `email_sent: false`.
///
/// Expected Output (Success):
/// ```json
/// {
///   "ok": true,
///   "data": {
///     "invite": { "id": "...", "email": "...", "role": "editor", "status": "pending", ... },
///     "accept_link": "https://app.example.com/invite/accept?token=...",
///     "email_sent": false
///   }
/// }
/// ```
pub async fn create(
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<CreateInviteRequest>,
) -> ApiResult<Value> {
    let email = payload.email.trim().to_lowercase();
    if !is_valid_email(&email) {
        return Err(ApiError::bad_request("Invalid email format"));
    }
    if !INVITABLE_ROLES.contains(&payload.role.as_str()) {
        return Err(ApiError::bad_request(
            "Invalid role. Must be one of: admin, editor, viewer",
        ));
    }

    let pool = DatabaseManager::pool().await?;
    access::require_manager(&pool, payload.project_id, user.user_id).await?;

    let invite =
        invites::create_or_renew(&pool, payload.project_id, user.user_id, &email, &payload.role)
            .await?;
    let accept_link = invites::accept_link(&invite.token);

    tracing::info!(
        "Invite {} ({}) for project {} created by {}",
        invite.id,
        email,
        payload.project_id,
        user.user_id
    );

    Ok(ApiResponse::created(json!({
        "invite": invite,
        "accept_link": accept_link,
        "message": payload.message,
        "email_sent": false
    })))
}

/// GET /api/invites?project_id= - All invites for a project, newest first
pub async fn list(
    Extension(user): Extension<AuthUser>,
    Query(query): Query<ListInvitesQuery>,
) -> ApiResult<Value> {
    let pool = DatabaseManager::pool().await?;
    access::require_manager(&pool, query.project_id, user.user_id).await?;

    let invites = invites::list_for_project(&pool, query.project_id).await?;
    Ok(ApiResponse::success(json!({ "invites": invites })))
}

/// POST /api/invites/accept - Redeem an invite token
///
/// Guard sequence: token must resolve; invite must be pending; must not be
/// past expiry (persisted as `expired` when it is); the caller's email must
/// match the invited address case-insensitively. Acceptance is idempotent
/// for callers who are already members.
pub async fn accept(
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<AcceptInviteRequest>,
) -> ApiResult<Value> {
    if payload.token.trim().is_empty() {
        return Err(ApiError::bad_request("Missing required field: token"));
    }

    let pool = DatabaseManager::pool().await?;
    let invite = invites::find_by_token(&pool, payload.token.trim())
        .await?
        .ok_or_else(|| ApiError::not_found("Invalid or expired invite token"))?;

    let now = Utc::now();
    match invites::evaluate_acceptance(&invite, &user.email, now) {
        invites::AcceptDecision::NotPending => Err(ApiError::InviteNotPending(
            "Invite has already been used or revoked".to_string(),
        )),
        invites::AcceptDecision::Expired => {
            invites::mark_expired(&pool, invite.id).await?;
            Err(ApiError::InviteExpired("Invite has expired".to_string()))
        }
        invites::AcceptDecision::EmailMismatch => {
            tracing::warn!(
                "Invite {} email mismatch: caller {} is not the invited address",
                invite.id,
                user.email
            );
            Err(ApiError::EmailMismatch(
                "This invite was sent to a different email address".to_string(),
            ))
        }
        invites::AcceptDecision::Accept => {
            let already_member = invites::accept(&pool, &invite, user.user_id, now).await?;

            let project_name: Option<(String,)> =
                sqlx::query_as("SELECT name FROM projects WHERE id = $1")
                    .bind(invite.project_id)
                    .fetch_optional(&pool)
                    .await?;
            let project_name =
                project_name.map(|(n,)| n).unwrap_or_else(|| "Unknown Project".to_string());

            let message = if already_member {
                "You are already a member of this project".to_string()
            } else {
                format!("Successfully joined {}!", project_name)
            };

            Ok(ApiResponse::success(json!({
                "project_id": invite.project_id,
                "project_name": project_name,
                "role": invite.role,
                "already_member": already_member,
                "message": message
            })))
        }
    }
}

/// POST /api/invites/:invite_id/revoke - Withdraw a pending invite
pub async fn revoke(
    Extension(user): Extension<AuthUser>,
    Path(invite_id): Path<Uuid>,
) -> ApiResult<Value> {
    let pool = DatabaseManager::pool().await?;
    let invite = invites::find_by_id(&pool, invite_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Invite not found"))?;

    access::require_manager(&pool, invite.project_id, user.user_id).await?;

    if InviteStatus::parse(&invite.status) != Some(InviteStatus::Pending) {
        return Err(ApiError::InviteNotPending(
            "Only pending invites can be revoked".to_string(),
        ));
    }

    let revoked = invites::revoke(&pool, invite.id).await?;
    Ok(ApiResponse::success(json!({ "invite": revoked })))
}
