use axum::extract::{Extension, Path};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::database::manager::DatabaseManager;
use crate::database::models::Subtask;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::access;

#[derive(Debug, Deserialize)]
pub struct CreateSubtaskRequest {
    pub title: String,
    pub order_index: Option<i32>,
    pub status: Option<String>,
    pub estimate_hours: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSubtaskRequest {
    pub title: Option<String>,
    pub done: Option<bool>,
    pub order_index: Option<i32>,
    pub status: Option<String>,
    pub estimate_hours: Option<f64>,
}

/// Resolve the project a task belongs to; 404 when the task is unknown
async fn task_project(pool: &sqlx::PgPool, task_id: Uuid) -> Result<Uuid, ApiError> {
    let row: Option<(Uuid,)> = sqlx::query_as("SELECT project_id FROM tasks WHERE id = $1")
        .bind(task_id)
        .fetch_optional(pool)
        .await?;
    row.map(|(id,)| id).ok_or_else(|| ApiError::not_found("Task not found"))
}

/// Resolve a subtask together with its owning project
async fn subtask_with_project(
    pool: &sqlx::PgPool,
    subtask_id: Uuid,
) -> Result<(Subtask, Uuid), ApiError> {
    let subtask = sqlx::query_as::<_, Subtask>("SELECT * FROM subtasks WHERE id = $1")
        .bind(subtask_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Subtask not found"))?;
    let project_id = task_project(pool, subtask.task_id).await?;
    Ok((subtask, project_id))
}

/// GET /api/tasks/:task_id/subtasks - Ordered by order_index
pub async fn list(
    Extension(user): Extension<AuthUser>,
    Path(task_id): Path<Uuid>,
) -> ApiResult<Value> {
    let pool = DatabaseManager::pool().await?;
    let project_id = task_project(&pool, task_id).await?;
    access::require_member(&pool, project_id, user.user_id).await?;

    let subtasks = sqlx::query_as::<_, Subtask>(
        "SELECT * FROM subtasks WHERE task_id = $1 ORDER BY order_index",
    )
    .bind(task_id)
    .fetch_all(&pool)
    .await?;

    Ok(ApiResponse::success(json!({ "subtasks": subtasks })))
}

/// POST /api/tasks/:task_id/subtasks - Append a subtask
///
/// When order_index is omitted the subtask lands at the end of the list.
pub async fn create(
    Extension(user): Extension<AuthUser>,
    Path(task_id): Path<Uuid>,
    Json(payload): Json<CreateSubtaskRequest>,
) -> ApiResult<Value> {
    let title = payload.title.trim();
    if title.is_empty() {
        return Err(ApiError::bad_request("Subtask title is required"));
    }

    let pool = DatabaseManager::pool().await?;
    let project_id = task_project(&pool, task_id).await?;
    access::require_writer(&pool, project_id, user.user_id).await?;

    let order_index = match payload.order_index {
        Some(idx) => idx,
        None => {
            let (next,): (i32,) = sqlx::query_as(
                "SELECT COALESCE(MAX(order_index) + 1, 0) FROM subtasks WHERE task_id = $1",
            )
            .bind(task_id)
            .fetch_one(&pool)
            .await?;
            next
        }
    };

    let subtask = sqlx::query_as::<_, Subtask>(
        "INSERT INTO subtasks (task_id, title, order_index, status, estimate_hours)
         VALUES ($1, $2, $3, COALESCE($4, 'pending'), $5)
         RETURNING *",
    )
    .bind(task_id)
    .bind(title)
    .bind(order_index)
    .bind(&payload.status)
    .bind(payload.estimate_hours)
    .fetch_one(&pool)
    .await?;

    Ok(ApiResponse::created(json!({ "subtask": subtask })))
}

/// PATCH /api/subtasks/:subtask_id - Toggle, rename, reorder, or restatus
pub async fn update(
    Extension(user): Extension<AuthUser>,
    Path(subtask_id): Path<Uuid>,
    Json(payload): Json<UpdateSubtaskRequest>,
) -> ApiResult<Value> {
    if let Some(title) = &payload.title {
        if title.trim().is_empty() {
            return Err(ApiError::bad_request("Subtask title cannot be empty"));
        }
    }

    let pool = DatabaseManager::pool().await?;
    let (subtask, project_id) = subtask_with_project(&pool, subtask_id).await?;
    access::require_writer(&pool, project_id, user.user_id).await?;

    let updated = sqlx::query_as::<_, Subtask>(
        "UPDATE subtasks SET
            title = COALESCE($2, title),
            done = COALESCE($3, done),
            order_index = COALESCE($4, order_index),
            status = COALESCE($5, status),
            estimate_hours = COALESCE($6, estimate_hours)
         WHERE id = $1
         RETURNING *",
    )
    .bind(subtask.id)
    .bind(payload.title.as_ref().map(|t| t.trim().to_string()))
    .bind(payload.done)
    .bind(payload.order_index)
    .bind(&payload.status)
    .bind(payload.estimate_hours)
    .fetch_one(&pool)
    .await?;

    Ok(ApiResponse::success(json!({ "subtask": updated })))
}

/// DELETE /api/subtasks/:subtask_id
pub async fn delete(
    Extension(user): Extension<AuthUser>,
    Path(subtask_id): Path<Uuid>,
) -> ApiResult<Value> {
    let pool = DatabaseManager::pool().await?;
    let (subtask, project_id) = subtask_with_project(&pool, subtask_id).await?;
    access::require_writer(&pool, project_id, user.user_id).await?;

    sqlx::query("DELETE FROM subtasks WHERE id = $1")
        .bind(subtask.id)
        .execute(&pool)
        .await?;

    Ok(ApiResponse::success(json!({ "message": "Subtask deleted successfully" })))
}
