use axum::extract::{Extension, Path};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::database::manager::DatabaseManager;
use crate::database::models::{Project, Subtask, Task};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::access;
use crate::types::Role;

#[derive(Debug, Deserialize)]
pub struct CreateProjectRequest {
    pub name: String,
    pub description: Option<String>,
    pub color: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProjectRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub color: Option<String>,
    pub status: Option<String>,
}

/// GET /api/projects - Projects the caller belongs to, with task summaries.
/// Archived projects are filtered out, mirroring the dashboard listing.
pub async fn list(Extension(user): Extension<AuthUser>) -> ApiResult<Value> {
    let pool = DatabaseManager::pool().await?;

    let projects = sqlx::query_as::<_, Project>(
        "SELECT p.* FROM projects p
         JOIN project_members m ON m.project_id = p.id
         WHERE m.user_id = $1 AND p.is_archived = false
         ORDER BY p.created_at DESC",
    )
    .bind(user.user_id)
    .fetch_all(&pool)
    .await?;

    let project_ids: Vec<Uuid> = projects.iter().map(|p| p.id).collect();
    let tasks = if project_ids.is_empty() {
        Vec::new()
    } else {
        sqlx::query_as::<_, Task>(
            "SELECT * FROM tasks WHERE project_id = ANY($1) ORDER BY created_at DESC",
        )
        .bind(&project_ids)
        .fetch_all(&pool)
        .await?
    };

    let payload: Vec<Value> = projects
        .into_iter()
        .map(|project| {
            let project_tasks: Vec<&Task> =
                tasks.iter().filter(|t| t.project_id == project.id).collect();
            let mut value = serde_json::to_value(&project).unwrap_or(Value::Null);
            value["tasks"] = json!(project_tasks);
            value
        })
        .collect();

    Ok(ApiResponse::success(json!({ "projects": payload })))
}

/// POST /api/projects - Create a project; the creator becomes its owner.
/// Both inserts run in one transaction so an ownerless project cannot exist.
pub async fn create(
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<CreateProjectRequest>,
) -> ApiResult<Value> {
    let name = payload.name.trim();
    if name.is_empty() {
        return Err(ApiError::bad_request("Project name is required"));
    }

    let pool = DatabaseManager::pool().await?;
    let mut tx = pool.begin().await?;

    let project = sqlx::query_as::<_, Project>(
        "INSERT INTO projects (name, description, color, status, created_by)
         VALUES ($1, $2, $3, COALESCE($4, 'active'), $5)
         RETURNING *",
    )
    .bind(name)
    .bind(&payload.description)
    .bind(&payload.color)
    .bind(&payload.status)
    .bind(user.user_id)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query("INSERT INTO project_members (project_id, user_id, role) VALUES ($1, $2, 'owner')")
        .bind(project.id)
        .bind(user.user_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    tracing::info!("Project {} created by {}", project.id, user.user_id);

    Ok(ApiResponse::created(json!({
        "project": project,
        "membership": { "project_id": project.id, "user_id": user.user_id, "role": "owner" }
    })))
}

/// GET /api/projects/:project_id - Project detail with tasks and subtasks
pub async fn get(
    Extension(user): Extension<AuthUser>,
    Path(project_id): Path<Uuid>,
) -> ApiResult<Value> {
    let pool = DatabaseManager::pool().await?;
    access::require_member(&pool, project_id, user.user_id).await?;

    let project = sqlx::query_as::<_, Project>("SELECT * FROM projects WHERE id = $1")
        .bind(project_id)
        .fetch_optional(&pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Project not found"))?;

    let tasks = sqlx::query_as::<_, Task>(
        "SELECT * FROM tasks WHERE project_id = $1 ORDER BY created_at DESC",
    )
    .bind(project_id)
    .fetch_all(&pool)
    .await?;

    let task_ids: Vec<Uuid> = tasks.iter().map(|t| t.id).collect();
    let subtasks = if task_ids.is_empty() {
        Vec::new()
    } else {
        sqlx::query_as::<_, Subtask>(
            "SELECT * FROM subtasks WHERE task_id = ANY($1) ORDER BY order_index",
        )
        .bind(&task_ids)
        .fetch_all(&pool)
        .await?
    };

    let tasks_payload: Vec<Value> = tasks
        .into_iter()
        .map(|task| {
            let task_subtasks: Vec<&Subtask> =
                subtasks.iter().filter(|s| s.task_id == task.id).collect();
            let mut value = serde_json::to_value(&task).unwrap_or(Value::Null);
            value["subtasks"] = json!(task_subtasks);
            value
        })
        .collect();

    let mut project_value = serde_json::to_value(&project)?;
    project_value["tasks"] = Value::Array(tasks_payload);

    Ok(ApiResponse::success(json!({ "project": project_value })))
}

/// PATCH /api/projects/:project_id - Partial update (owner/admin)
pub async fn update(
    Extension(user): Extension<AuthUser>,
    Path(project_id): Path<Uuid>,
    Json(payload): Json<UpdateProjectRequest>,
) -> ApiResult<Value> {
    let pool = DatabaseManager::pool().await?;
    access::require_manager(&pool, project_id, user.user_id).await?;

    if let Some(name) = &payload.name {
        if name.trim().is_empty() {
            return Err(ApiError::bad_request("Project name cannot be empty"));
        }
    }

    let project = sqlx::query_as::<_, Project>(
        "UPDATE projects SET
            name = COALESCE($2, name),
            description = COALESCE($3, description),
            color = COALESCE($4, color),
            status = COALESCE($5, status),
            updated_at = now()
         WHERE id = $1
         RETURNING *",
    )
    .bind(project_id)
    .bind(payload.name.as_ref().map(|n| n.trim().to_string()))
    .bind(&payload.description)
    .bind(&payload.color)
    .bind(&payload.status)
    .fetch_optional(&pool)
    .await?
    .ok_or_else(|| ApiError::not_found("Project not found"))?;

    Ok(ApiResponse::success(json!({ "project": project })))
}

/// POST /api/projects/:project_id/archive - Hide from listings (owner/admin)
pub async fn archive(
    Extension(user): Extension<AuthUser>,
    Path(project_id): Path<Uuid>,
) -> ApiResult<Value> {
    let pool = DatabaseManager::pool().await?;
    access::require_manager(&pool, project_id, user.user_id).await?;

    let project = sqlx::query_as::<_, Project>(
        "UPDATE projects SET is_archived = true, updated_at = now() WHERE id = $1 RETURNING *",
    )
    .bind(project_id)
    .fetch_optional(&pool)
    .await?
    .ok_or_else(|| ApiError::not_found("Project not found"))?;

    Ok(ApiResponse::success(json!({ "project": project })))
}

/// DELETE /api/projects/:project_id - Owner only; cascades to members,
/// invites, tasks, and subtasks via foreign keys.
pub async fn delete(
    Extension(user): Extension<AuthUser>,
    Path(project_id): Path<Uuid>,
) -> ApiResult<Value> {
    let pool = DatabaseManager::pool().await?;
    let role = access::require_member(&pool, project_id, user.user_id).await?;
    if role != Role::Owner {
        return Err(ApiError::forbidden("Only the project owner can delete a project"));
    }

    sqlx::query("DELETE FROM projects WHERE id = $1")
        .bind(project_id)
        .execute(&pool)
        .await?;

    tracing::info!("Project {} deleted by {}", project_id, user.user_id);
    Ok(ApiResponse::success(json!({ "message": "Project deleted successfully" })))
}
