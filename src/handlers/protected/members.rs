use axum::extract::{Extension, Path, Query};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::database::manager::DatabaseManager;
use crate::database::models::MemberWithUser;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::access;
use crate::types::Role;

/// Roles that can be written through this endpoint. The legacy
/// `super_admin` spelling is read-compatible but never stored.
const ASSIGNABLE_ROLES: &[&str] = &["owner", "admin", "editor", "viewer"];

#[derive(Debug, Deserialize)]
pub struct UpdateMemberRequest {
    pub user_id: Uuid,
    pub role: String,
}

#[derive(Debug, Deserialize)]
pub struct RemoveMemberQuery {
    pub user_id: Uuid,
}

/// GET /api/projects/:project_id/members - Member list with user identity
pub async fn list(
    Extension(user): Extension<AuthUser>,
    Path(project_id): Path<Uuid>,
) -> ApiResult<Value> {
    let pool = DatabaseManager::pool().await?;
    access::require_member(&pool, project_id, user.user_id).await?;

    let members = sqlx::query_as::<_, MemberWithUser>(
        "SELECT m.project_id, m.user_id, m.role, m.joined_at, u.email, u.full_name
         FROM project_members m
         JOIN users u ON u.id = m.user_id
         WHERE m.project_id = $1
         ORDER BY m.joined_at ASC",
    )
    .bind(project_id)
    .fetch_all(&pool)
    .await?;

    Ok(ApiResponse::success(json!({ "members": members })))
}

/// PATCH /api/projects/:project_id/members - Change a member's role
///
/// Refuses to demote the last owner: every project keeps at least one.
pub async fn update_role(
    Extension(user): Extension<AuthUser>,
    Path(project_id): Path<Uuid>,
    Json(payload): Json<UpdateMemberRequest>,
) -> ApiResult<Value> {
    if !ASSIGNABLE_ROLES.contains(&payload.role.as_str()) {
        return Err(ApiError::bad_request(
            "Invalid role. Must be one of: owner, admin, editor, viewer",
        ));
    }
    let new_role = Role::parse(&payload.role)
        .ok_or_else(|| ApiError::bad_request("Invalid role"))?;

    let pool = DatabaseManager::pool().await?;
    access::require_manager(&pool, project_id, user.user_id).await?;

    let target_role = access::membership_role(&pool, project_id, payload.user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User is not a member of this project"))?;

    let owners = access::owner_count(&pool, project_id).await?;
    if access::strands_last_owner(target_role, Some(new_role), owners) {
        return Err(ApiError::bad_request(
            "Cannot demote the last owner of the project",
        ));
    }

    let member = sqlx::query_as::<_, MemberWithUser>(
        "WITH updated AS (
            UPDATE project_members SET role = $3
            WHERE project_id = $1 AND user_id = $2
            RETURNING project_id, user_id, role, joined_at
         )
         SELECT updated.project_id, updated.user_id, updated.role, updated.joined_at,
                u.email, u.full_name
         FROM updated JOIN users u ON u.id = updated.user_id",
    )
    .bind(project_id)
    .bind(payload.user_id)
    .bind(&payload.role)
    .fetch_one(&pool)
    .await?;

    Ok(ApiResponse::success(json!({
        "member": member,
        "message": "Member role updated successfully"
    })))
}

/// DELETE /api/projects/:project_id/members?user_id= - Remove a member
pub async fn remove(
    Extension(user): Extension<AuthUser>,
    Path(project_id): Path<Uuid>,
    Query(query): Query<RemoveMemberQuery>,
) -> ApiResult<Value> {
    let pool = DatabaseManager::pool().await?;
    access::require_manager(&pool, project_id, user.user_id).await?;

    let target_role = access::membership_role(&pool, project_id, query.user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("User is not a member of this project"))?;

    let owners = access::owner_count(&pool, project_id).await?;
    if access::strands_last_owner(target_role, None, owners) {
        return Err(ApiError::bad_request(
            "Cannot remove the last owner of the project",
        ));
    }

    sqlx::query("DELETE FROM project_members WHERE project_id = $1 AND user_id = $2")
        .bind(project_id)
        .bind(query.user_id)
        .execute(&pool)
        .await?;

    tracing::info!(
        "Member {} removed from project {} by {}",
        query.user_id,
        project_id,
        user.user_id
    );
    Ok(ApiResponse::success(json!({ "message": "Member removed successfully" })))
}
