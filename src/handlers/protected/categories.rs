use axum::extract::{Extension, Path, Query};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::database::manager::DatabaseManager;
use crate::database::models::{Category, Subcategory};
use crate::error::{is_unique_violation, ApiError};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};

#[derive(Debug, Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
    pub description: Option<String>,
    pub color: Option<String>,
    pub icon: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCategoryRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub color: Option<String>,
    pub icon: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SubcategoryQuery {
    pub category_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct CreateSubcategoryRequest {
    pub category_id: Uuid,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSubcategoryRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

/// GET /api/categories - The caller's categories, alphabetical
pub async fn list(Extension(user): Extension<AuthUser>) -> ApiResult<Value> {
    let pool = DatabaseManager::pool().await?;

    let categories = sqlx::query_as::<_, Category>(
        "SELECT * FROM categories WHERE user_id = $1 ORDER BY name ASC",
    )
    .bind(user.user_id)
    .fetch_all(&pool)
    .await?;

    Ok(ApiResponse::success(json!({ "categories": categories })))
}

/// POST /api/categories - Category names are unique per user
pub async fn create(
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<CreateCategoryRequest>,
) -> ApiResult<Value> {
    let name = payload.name.trim();
    if name.is_empty() {
        return Err(ApiError::bad_request("Category name is required"));
    }

    let pool = DatabaseManager::pool().await?;

    let category = sqlx::query_as::<_, Category>(
        "INSERT INTO categories (user_id, name, description, color, icon)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING *",
    )
    .bind(user.user_id)
    .bind(name)
    .bind(&payload.description)
    .bind(&payload.color)
    .bind(&payload.icon)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            ApiError::conflict("A category with this name already exists")
        } else {
            e.into()
        }
    })?;

    Ok(ApiResponse::created(json!({ "category": category })))
}

/// PATCH /api/categories/:category_id
pub async fn update(
    Extension(user): Extension<AuthUser>,
    Path(category_id): Path<Uuid>,
    Json(payload): Json<UpdateCategoryRequest>,
) -> ApiResult<Value> {
    if let Some(name) = &payload.name {
        if name.trim().is_empty() {
            return Err(ApiError::bad_request("Category name cannot be empty"));
        }
    }

    let pool = DatabaseManager::pool().await?;

    let category = sqlx::query_as::<_, Category>(
        "UPDATE categories SET
            name = COALESCE($3, name),
            description = COALESCE($4, description),
            color = COALESCE($5, color),
            icon = COALESCE($6, icon),
            updated_at = now()
         WHERE id = $1 AND user_id = $2
         RETURNING *",
    )
    .bind(category_id)
    .bind(user.user_id)
    .bind(payload.name.as_ref().map(|n| n.trim().to_string()))
    .bind(&payload.description)
    .bind(&payload.color)
    .bind(&payload.icon)
    .fetch_optional(&pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            ApiError::conflict("A category with this name already exists")
        } else {
            ApiError::from(e)
        }
    })?
    .ok_or_else(|| ApiError::not_found("Category not found"))?;

    Ok(ApiResponse::success(json!({ "category": category })))
}

/// DELETE /api/categories/:category_id - Cascades to subcategories
pub async fn delete(
    Extension(user): Extension<AuthUser>,
    Path(category_id): Path<Uuid>,
) -> ApiResult<Value> {
    let pool = DatabaseManager::pool().await?;

    let result = sqlx::query("DELETE FROM categories WHERE id = $1 AND user_id = $2")
        .bind(category_id)
        .bind(user.user_id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Category not found"));
    }

    Ok(ApiResponse::success(json!({ "message": "Category deleted successfully" })))
}

/// GET /api/subcategories?category_id= - The caller's subcategories
pub async fn list_subcategories(
    Extension(user): Extension<AuthUser>,
    Query(query): Query<SubcategoryQuery>,
) -> ApiResult<Value> {
    let pool = DatabaseManager::pool().await?;

    let subcategories = match query.category_id {
        Some(category_id) => {
            sqlx::query_as::<_, Subcategory>(
                "SELECT * FROM subcategories
                 WHERE user_id = $1 AND category_id = $2
                 ORDER BY name ASC",
            )
            .bind(user.user_id)
            .bind(category_id)
            .fetch_all(&pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, Subcategory>(
                "SELECT * FROM subcategories WHERE user_id = $1 ORDER BY name ASC",
            )
            .bind(user.user_id)
            .fetch_all(&pool)
            .await?
        }
    };

    Ok(ApiResponse::success(json!({ "subcategories": subcategories })))
}

/// POST /api/subcategories - Parent category must belong to the caller
pub async fn create_subcategory(
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<CreateSubcategoryRequest>,
) -> ApiResult<Value> {
    let name = payload.name.trim();
    if name.is_empty() {
        return Err(ApiError::bad_request("Subcategory name is required"));
    }

    let pool = DatabaseManager::pool().await?;

    let parent: Option<(Uuid,)> =
        sqlx::query_as("SELECT id FROM categories WHERE id = $1 AND user_id = $2")
            .bind(payload.category_id)
            .bind(user.user_id)
            .fetch_optional(&pool)
            .await?;
    if parent.is_none() {
        return Err(ApiError::not_found("Category not found"));
    }

    let subcategory = sqlx::query_as::<_, Subcategory>(
        "INSERT INTO subcategories (category_id, user_id, name, description)
         VALUES ($1, $2, $3, $4)
         RETURNING *",
    )
    .bind(payload.category_id)
    .bind(user.user_id)
    .bind(name)
    .bind(&payload.description)
    .fetch_one(&pool)
    .await?;

    Ok(ApiResponse::created(json!({ "subcategory": subcategory })))
}

/// PATCH /api/subcategories/:subcategory_id
pub async fn update_subcategory(
    Extension(user): Extension<AuthUser>,
    Path(subcategory_id): Path<Uuid>,
    Json(payload): Json<UpdateSubcategoryRequest>,
) -> ApiResult<Value> {
    if let Some(name) = &payload.name {
        if name.trim().is_empty() {
            return Err(ApiError::bad_request("Subcategory name cannot be empty"));
        }
    }

    let pool = DatabaseManager::pool().await?;

    let subcategory = sqlx::query_as::<_, Subcategory>(
        "UPDATE subcategories SET
            name = COALESCE($3, name),
            description = COALESCE($4, description)
         WHERE id = $1 AND user_id = $2
         RETURNING *",
    )
    .bind(subcategory_id)
    .bind(user.user_id)
    .bind(payload.name.as_ref().map(|n| n.trim().to_string()))
    .bind(&payload.description)
    .fetch_optional(&pool)
    .await?
    .ok_or_else(|| ApiError::not_found("Subcategory not found"))?;

    Ok(ApiResponse::success(json!({ "subcategory": subcategory })))
}

/// DELETE /api/subcategories/:subcategory_id
pub async fn delete_subcategory(
    Extension(user): Extension<AuthUser>,
    Path(subcategory_id): Path<Uuid>,
) -> ApiResult<Value> {
    let pool = DatabaseManager::pool().await?;

    let result = sqlx::query("DELETE FROM subcategories WHERE id = $1 AND user_id = $2")
        .bind(subcategory_id)
        .bind(user.user_id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Subcategory not found"));
    }

    Ok(ApiResponse::success(json!({ "message": "Subcategory deleted successfully" })))
}
