use axum::extract::Extension;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::database::manager::DatabaseManager;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};

const DEFAULT_LIMIT: i64 = 20;
const MAX_LIMIT: i64 = 100;

pub const SEARCH_SOURCES: &[&str] = &["resource", "category", "subcategory", "task"];

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    /// Subset of SEARCH_SOURCES; all of them when omitted
    pub sources: Option<Vec<String>>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

type SearchRow = (Uuid, String, Option<String>, DateTime<Utc>);

fn to_result(row: SearchRow, source: &str, url: Option<String>) -> Value {
    let (entity_id, title, snippet, updated_at) = row;
    json!({
        "entity_id": entity_id,
        "title": title,
        "snippet": snippet.unwrap_or_default(),
        "source": source,
        "updated_at": updated_at,
        "url": url,
    })
}

/// POST /api/search - ILIKE search across the caller's resources,
/// categories, subcategories, and project tasks.
pub async fn search(
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<SearchRequest>,
) -> ApiResult<Value> {
    let query = payload.query.trim();
    if query.is_empty() {
        return Err(ApiError::bad_request("Query is required"));
    }

    let page = payload.page.unwrap_or(1).max(1);
    let limit = payload.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let offset = (page - 1) * limit;
    let pattern = format!("%{}%", query);

    let wants = |source: &str| match &payload.sources {
        Some(sources) => sources.iter().any(|s| s == source),
        None => true,
    };

    let pool = DatabaseManager::pool().await?;
    let mut results: Vec<Value> = Vec::new();

    if wants("resource") {
        let rows: Vec<(Uuid, String, Option<String>, DateTime<Utc>, Option<String>)> =
            sqlx::query_as(
                "SELECT id, title, description, updated_at, file_url
                 FROM resources
                 WHERE user_id = $1 AND (title ILIKE $2 OR description ILIKE $2)
                 ORDER BY updated_at DESC
                 LIMIT $3 OFFSET $4",
            )
            .bind(user.user_id)
            .bind(&pattern)
            .bind(limit)
            .bind(offset)
            .fetch_all(&pool)
            .await?;
        results.extend(rows.into_iter().map(|(id, title, desc, updated, url)| {
            to_result((id, title, desc, updated), "resource", url)
        }));
    }

    if wants("category") {
        let rows: Vec<SearchRow> = sqlx::query_as(
            "SELECT id, name, description, updated_at
             FROM categories
             WHERE user_id = $1 AND (name ILIKE $2 OR description ILIKE $2)
             ORDER BY updated_at DESC
             LIMIT $3 OFFSET $4",
        )
        .bind(user.user_id)
        .bind(&pattern)
        .bind(limit)
        .bind(offset)
        .fetch_all(&pool)
        .await?;
        results.extend(rows.into_iter().map(|row| to_result(row, "category", None)));
    }

    if wants("subcategory") {
        let rows: Vec<SearchRow> = sqlx::query_as(
            "SELECT id, name, description, created_at
             FROM subcategories
             WHERE user_id = $1 AND (name ILIKE $2 OR description ILIKE $2)
             ORDER BY created_at DESC
             LIMIT $3 OFFSET $4",
        )
        .bind(user.user_id)
        .bind(&pattern)
        .bind(limit)
        .bind(offset)
        .fetch_all(&pool)
        .await?;
        results.extend(rows.into_iter().map(|row| to_result(row, "subcategory", None)));
    }

    if wants("task") {
        let rows: Vec<SearchRow> = sqlx::query_as(
            "SELECT t.id, t.title, t.description, t.updated_at
             FROM tasks t
             JOIN project_members m ON m.project_id = t.project_id AND m.user_id = $1
             WHERE t.title ILIKE $2 OR t.description ILIKE $2
             ORDER BY t.updated_at DESC
             LIMIT $3 OFFSET $4",
        )
        .bind(user.user_id)
        .bind(&pattern)
        .bind(limit)
        .bind(offset)
        .fetch_all(&pool)
        .await?;
        results.extend(rows.into_iter().map(|row| to_result(row, "task", None)));
    }

    Ok(ApiResponse::success(json!({
        "results": results,
        "total": results.len(),
        "page": page,
        "limit": limit,
        "query": query,
    })))
}
