use axum::extract::{Extension, Path};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::database::manager::DatabaseManager;
use crate::database::models::{Subtask, Task};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::access;
use crate::types::{TASK_PRIORITIES, TASK_STATUSES};

#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    pub title: String,
    pub description: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub effort: Option<String>,
    pub estimated_hours: Option<f64>,
    pub actual_hours: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub effort: Option<String>,
    pub estimated_hours: Option<f64>,
    pub actual_hours: Option<f64>,
}

fn validate_status(status: Option<&str>) -> Result<(), ApiError> {
    match status {
        Some(s) if !TASK_STATUSES.contains(&s) => Err(ApiError::bad_request(
            "Invalid status. Must be one of: todo, in_progress, done",
        )),
        _ => Ok(()),
    }
}

fn validate_priority(priority: Option<&str>) -> Result<(), ApiError> {
    match priority {
        Some(p) if !TASK_PRIORITIES.contains(&p) => Err(ApiError::bad_request(
            "Invalid priority. Must be one of: low, medium, high, urgent",
        )),
        _ => Ok(()),
    }
}

async fn fetch_task(pool: &sqlx::PgPool, task_id: Uuid) -> Result<Task, ApiError> {
    sqlx::query_as::<_, Task>("SELECT * FROM tasks WHERE id = $1")
        .bind(task_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Task not found"))
}

/// GET /api/projects/:project_id/tasks - Tasks for a project, newest first
pub async fn list(
    Extension(user): Extension<AuthUser>,
    Path(project_id): Path<Uuid>,
) -> ApiResult<Value> {
    let pool = DatabaseManager::pool().await?;
    access::require_member(&pool, project_id, user.user_id).await?;

    let tasks = sqlx::query_as::<_, Task>(
        "SELECT * FROM tasks WHERE project_id = $1 ORDER BY created_at DESC",
    )
    .bind(project_id)
    .fetch_all(&pool)
    .await?;

    Ok(ApiResponse::success(json!({ "tasks": tasks })))
}

/// POST /api/projects/:project_id/tasks - Create a task (write roles)
pub async fn create(
    Extension(user): Extension<AuthUser>,
    Path(project_id): Path<Uuid>,
    Json(payload): Json<CreateTaskRequest>,
) -> ApiResult<Value> {
    let title = payload.title.trim();
    if title.is_empty() {
        return Err(ApiError::bad_request("Task title is required"));
    }
    validate_status(payload.status.as_deref())?;
    validate_priority(payload.priority.as_deref())?;

    let pool = DatabaseManager::pool().await?;
    access::require_writer(&pool, project_id, user.user_id).await?;

    let task = sqlx::query_as::<_, Task>(
        "INSERT INTO tasks
            (project_id, title, description, status, priority, due_date, effort,
             estimated_hours, actual_hours, created_by)
         VALUES ($1, $2, $3, COALESCE($4, 'todo'), COALESCE($5, 'medium'), $6, $7, $8, $9, $10)
         RETURNING *",
    )
    .bind(project_id)
    .bind(title)
    .bind(&payload.description)
    .bind(&payload.status)
    .bind(&payload.priority)
    .bind(payload.due_date)
    .bind(&payload.effort)
    .bind(payload.estimated_hours)
    .bind(payload.actual_hours)
    .bind(user.user_id)
    .fetch_one(&pool)
    .await?;

    Ok(ApiResponse::created(json!({ "task": task })))
}

/// GET /api/tasks/:task_id - Task detail with ordered subtasks
pub async fn get(
    Extension(user): Extension<AuthUser>,
    Path(task_id): Path<Uuid>,
) -> ApiResult<Value> {
    let pool = DatabaseManager::pool().await?;
    let task = fetch_task(&pool, task_id).await?;
    access::require_member(&pool, task.project_id, user.user_id).await?;

    let subtasks = sqlx::query_as::<_, Subtask>(
        "SELECT * FROM subtasks WHERE task_id = $1 ORDER BY order_index",
    )
    .bind(task_id)
    .fetch_all(&pool)
    .await?;

    let mut task_value = serde_json::to_value(&task)?;
    task_value["subtasks"] = json!(subtasks);

    Ok(ApiResponse::success(json!({ "task": task_value })))
}

/// PATCH /api/tasks/:task_id - Partial update (write roles)
pub async fn update(
    Extension(user): Extension<AuthUser>,
    Path(task_id): Path<Uuid>,
    Json(payload): Json<UpdateTaskRequest>,
) -> ApiResult<Value> {
    validate_status(payload.status.as_deref())?;
    validate_priority(payload.priority.as_deref())?;
    if let Some(title) = &payload.title {
        if title.trim().is_empty() {
            return Err(ApiError::bad_request("Task title cannot be empty"));
        }
    }

    let pool = DatabaseManager::pool().await?;
    let task = fetch_task(&pool, task_id).await?;
    access::require_writer(&pool, task.project_id, user.user_id).await?;

    let updated = sqlx::query_as::<_, Task>(
        "UPDATE tasks SET
            title = COALESCE($2, title),
            description = COALESCE($3, description),
            status = COALESCE($4, status),
            priority = COALESCE($5, priority),
            due_date = COALESCE($6, due_date),
            effort = COALESCE($7, effort),
            estimated_hours = COALESCE($8, estimated_hours),
            actual_hours = COALESCE($9, actual_hours),
            updated_at = now()
         WHERE id = $1
         RETURNING *",
    )
    .bind(task_id)
    .bind(payload.title.as_ref().map(|t| t.trim().to_string()))
    .bind(&payload.description)
    .bind(&payload.status)
    .bind(&payload.priority)
    .bind(payload.due_date)
    .bind(&payload.effort)
    .bind(payload.estimated_hours)
    .bind(payload.actual_hours)
    .fetch_one(&pool)
    .await?;

    Ok(ApiResponse::success(json!({ "task": updated })))
}

/// DELETE /api/tasks/:task_id - Delete a task and its subtasks
pub async fn delete(
    Extension(user): Extension<AuthUser>,
    Path(task_id): Path<Uuid>,
) -> ApiResult<Value> {
    let pool = DatabaseManager::pool().await?;
    let task = fetch_task(&pool, task_id).await?;
    access::require_writer(&pool, task.project_id, user.user_id).await?;

    sqlx::query("DELETE FROM tasks WHERE id = $1")
        .bind(task_id)
        .execute(&pool)
        .await?;

    Ok(ApiResponse::success(json!({ "message": "Task deleted successfully" })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_validation_accepts_known_values() {
        assert!(validate_status(None).is_ok());
        assert!(validate_status(Some("todo")).is_ok());
        assert!(validate_status(Some("in_progress")).is_ok());
        assert!(validate_status(Some("blocked")).is_err());
    }

    #[test]
    fn priority_validation_accepts_known_values() {
        assert!(validate_priority(Some("urgent")).is_ok());
        assert!(validate_priority(Some("critical")).is_err());
    }
}
