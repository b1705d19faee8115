use axum::extract::{Extension, Query};
use axum::Json;
use serde::Deserialize;
use sqlx::PgPool;

use crate::database::manager::DatabaseManager;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::drive::{self, DocumentPage};

const DEFAULT_PAGE_SIZE: u32 = 50;
const DEFAULT_SEARCH_PAGE_SIZE: u32 = 20;

#[derive(Debug, Deserialize)]
pub struct ListDocsQuery {
    pub page_size: Option<u32>,
    pub page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchDocsRequest {
    pub query: Option<String>,
    pub page_size: Option<u32>,
    pub page_token: Option<String>,
}

async fn stored_access_token(pool: &PgPool, user: &AuthUser) -> Result<String, ApiError> {
    let row: Option<(String,)> =
        sqlx::query_as("SELECT access_token FROM google_tokens WHERE user_id = $1")
            .bind(user.user_id)
            .fetch_optional(pool)
            .await?;

    row.map(|(token,)| token).ok_or_else(|| {
        ApiError::GoogleAuthRequired(
            "Please sign in with Google to access your Drive documents".to_string(),
        )
    })
}

/// GET /api/drive/docs - List Drive documents (Docs/Sheets/Slides/PDF)
pub async fn list(
    Extension(user): Extension<AuthUser>,
    Query(query): Query<ListDocsQuery>,
) -> ApiResult<DocumentPage> {
    let pool = DatabaseManager::pool().await?;
    let access_token = stored_access_token(&pool, &user).await?;

    let page = drive::list_documents(
        &access_token,
        query.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
        query.page_token.as_deref(),
        None,
    )
    .await?;

    Ok(ApiResponse::success(page))
}

/// POST /api/drive/docs - Full-text search over Drive documents
pub async fn search(
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<SearchDocsRequest>,
) -> ApiResult<DocumentPage> {
    let pool = DatabaseManager::pool().await?;
    let access_token = stored_access_token(&pool, &user).await?;

    let page = drive::list_documents(
        &access_token,
        payload.page_size.unwrap_or(DEFAULT_SEARCH_PAGE_SIZE),
        payload.page_token.as_deref(),
        payload.query.as_deref(),
    )
    .await?;

    Ok(ApiResponse::success(page))
}
