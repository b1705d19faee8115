use sqlx::PgPool;
use uuid::Uuid;

use crate::error::ApiError;
use crate::types::Role;

/// Look up the caller's role in a project. Unknown role strings in the
/// database are treated as no membership.
pub async fn membership_role(
    pool: &PgPool,
    project_id: Uuid,
    user_id: Uuid,
) -> Result<Option<Role>, ApiError> {
    let row: Option<(String,)> =
        sqlx::query_as("SELECT role FROM project_members WHERE project_id = $1 AND user_id = $2")
            .bind(project_id)
            .bind(user_id)
            .fetch_optional(pool)
            .await?;

    Ok(row.and_then(|(role,)| Role::parse(&role)))
}

/// Any membership grants read access
pub async fn require_member(
    pool: &PgPool,
    project_id: Uuid,
    user_id: Uuid,
) -> Result<Role, ApiError> {
    membership_role(pool, project_id, user_id)
        .await?
        .ok_or_else(|| ApiError::forbidden("You must be a member of this project"))
}

/// Owner or admin: member/invite/project management
pub async fn require_manager(
    pool: &PgPool,
    project_id: Uuid,
    user_id: Uuid,
) -> Result<Role, ApiError> {
    let role = require_member(pool, project_id, user_id).await?;
    if role.can_manage() {
        Ok(role)
    } else {
        Err(ApiError::forbidden(
            "You must be an owner or admin to perform this action",
        ))
    }
}

/// Owner, admin or editor: task/subtask mutation
pub async fn require_writer(
    pool: &PgPool,
    project_id: Uuid,
    user_id: Uuid,
) -> Result<Role, ApiError> {
    let role = require_member(pool, project_id, user_id).await?;
    if role.can_write() {
        Ok(role)
    } else {
        Err(ApiError::forbidden(
            "Viewers cannot modify tasks in this project",
        ))
    }
}

pub async fn owner_count(pool: &PgPool, project_id: Uuid) -> Result<i64, ApiError> {
    let (count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM project_members WHERE project_id = $1 AND role = 'owner'")
            .bind(project_id)
            .fetch_one(pool)
            .await?;
    Ok(count)
}

/// A role change or removal is refused when it would leave the project
/// without any owner. `new_role` is `None` for removal.
pub fn strands_last_owner(current_role: Role, new_role: Option<Role>, owner_count: i64) -> bool {
    current_role == Role::Owner && new_role != Some(Role::Owner) && owner_count <= 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_owner_cannot_be_demoted_or_removed() {
        assert!(strands_last_owner(Role::Owner, Some(Role::Admin), 1));
        assert!(strands_last_owner(Role::Owner, None, 1));
    }

    #[test]
    fn owner_changes_allowed_with_other_owners() {
        assert!(!strands_last_owner(Role::Owner, Some(Role::Viewer), 2));
        assert!(!strands_last_owner(Role::Owner, None, 3));
    }

    #[test]
    fn non_owner_changes_never_blocked() {
        assert!(!strands_last_owner(Role::Admin, None, 1));
        assert!(!strands_last_owner(Role::Editor, Some(Role::Viewer), 1));
    }

    #[test]
    fn reassigning_owner_role_is_allowed() {
        assert!(!strands_last_owner(Role::Owner, Some(Role::Owner), 1));
    }
}
