use axum::extract::{Extension, Path};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::database::manager::DatabaseManager;
use crate::database::models::{Resource, ResourceWithCategory};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};

#[derive(Debug, Deserialize)]
pub struct CreateResourceRequest {
    pub title: String,
    pub description: Option<String>,
    pub category_id: Option<Uuid>,
    pub subcategory_id: Option<Uuid>,
    pub tags: Option<Vec<String>>,
    pub notes: Option<String>,
    /// Pre-uploaded file metadata; blob storage is out of scope
    pub file_url: Option<String>,
    pub file_size: Option<i64>,
    pub file_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateResourceRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<Uuid>,
    pub subcategory_id: Option<Uuid>,
    pub tags: Option<Vec<String>>,
    pub notes: Option<String>,
    pub file_url: Option<String>,
    pub file_size: Option<i64>,
    pub file_type: Option<String>,
    pub is_favorite: Option<bool>,
}

/// GET /api/resources - The caller's resources with category display fields
pub async fn list(Extension(user): Extension<AuthUser>) -> ApiResult<Value> {
    let pool = DatabaseManager::pool().await?;

    let resources = sqlx::query_as::<_, ResourceWithCategory>(
        "SELECT r.*, c.name AS category_name, c.color AS category_color, c.icon AS category_icon
         FROM resources r
         LEFT JOIN categories c ON c.id = r.category_id
         WHERE r.user_id = $1
         ORDER BY r.created_at DESC",
    )
    .bind(user.user_id)
    .fetch_all(&pool)
    .await?;

    Ok(ApiResponse::success(json!({ "resources": resources })))
}

/// POST /api/resources
pub async fn create(
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<CreateResourceRequest>,
) -> ApiResult<Value> {
    let title = payload.title.trim();
    if title.is_empty() {
        return Err(ApiError::bad_request("Resource title is required"));
    }

    let pool = DatabaseManager::pool().await?;

    // The category (if any) must belong to the caller
    if let Some(category_id) = payload.category_id {
        let owned: Option<(Uuid,)> =
            sqlx::query_as("SELECT id FROM categories WHERE id = $1 AND user_id = $2")
                .bind(category_id)
                .bind(user.user_id)
                .fetch_optional(&pool)
                .await?;
        if owned.is_none() {
            return Err(ApiError::not_found("Category not found"));
        }
    }

    let resource = sqlx::query_as::<_, Resource>(
        "INSERT INTO resources
            (user_id, title, description, category_id, subcategory, tags, notes,
             file_url, file_size, file_type, is_favorite)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, false)
         RETURNING *",
    )
    .bind(user.user_id)
    .bind(title)
    .bind(&payload.description)
    .bind(payload.category_id)
    .bind(payload.subcategory_id)
    .bind(&payload.tags)
    .bind(&payload.notes)
    .bind(&payload.file_url)
    .bind(payload.file_size)
    .bind(&payload.file_type)
    .fetch_one(&pool)
    .await?;

    Ok(ApiResponse::created(json!({ "resource": resource })))
}

/// PATCH /api/resources/:resource_id - Partial update incl. favorite toggle
pub async fn update(
    Extension(user): Extension<AuthUser>,
    Path(resource_id): Path<Uuid>,
    Json(payload): Json<UpdateResourceRequest>,
) -> ApiResult<Value> {
    if let Some(title) = &payload.title {
        if title.trim().is_empty() {
            return Err(ApiError::bad_request("Resource title cannot be empty"));
        }
    }

    let pool = DatabaseManager::pool().await?;

    let resource = sqlx::query_as::<_, Resource>(
        "UPDATE resources SET
            title = COALESCE($3, title),
            description = COALESCE($4, description),
            category_id = COALESCE($5, category_id),
            subcategory = COALESCE($6, subcategory),
            tags = COALESCE($7, tags),
            notes = COALESCE($8, notes),
            file_url = COALESCE($9, file_url),
            file_size = COALESCE($10, file_size),
            file_type = COALESCE($11, file_type),
            is_favorite = COALESCE($12, is_favorite),
            updated_at = now()
         WHERE id = $1 AND user_id = $2
         RETURNING *",
    )
    .bind(resource_id)
    .bind(user.user_id)
    .bind(payload.title.as_ref().map(|t| t.trim().to_string()))
    .bind(&payload.description)
    .bind(payload.category_id)
    .bind(payload.subcategory_id)
    .bind(&payload.tags)
    .bind(&payload.notes)
    .bind(&payload.file_url)
    .bind(payload.file_size)
    .bind(&payload.file_type)
    .bind(payload.is_favorite)
    .fetch_optional(&pool)
    .await?
    .ok_or_else(|| ApiError::not_found("Resource not found"))?;

    Ok(ApiResponse::success(json!({ "resource": resource })))
}

/// DELETE /api/resources/:resource_id
pub async fn delete(
    Extension(user): Extension<AuthUser>,
    Path(resource_id): Path<Uuid>,
) -> ApiResult<Value> {
    let pool = DatabaseManager::pool().await?;

    let result = sqlx::query("DELETE FROM resources WHERE id = $1 AND user_id = $2")
        .bind(resource_id)
        .bind(user.user_id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Resource not found"));
    }

    Ok(ApiResponse::success(json!({ "message": "Resource deleted successfully" })))
}
