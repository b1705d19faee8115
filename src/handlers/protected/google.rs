use axum::extract::{Extension, Query};
use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::database::manager::DatabaseManager;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::drive;

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub error: Option<String>,
}

/// GET /auth/google - Consent URL for connecting a Google account
/// (email/profile plus read-only Drive scope). The client performs the
/// actual redirect.
pub async fn start(Extension(_user): Extension<AuthUser>) -> ApiResult<Value> {
    let auth_url = drive::consent_url()?;
    Ok(ApiResponse::success(json!({ "auth_url": auth_url })))
}

/// GET /auth/google/callback?code= - Exchange the authorization code and
/// store the tokens for the caller. Tokens live in `google_tokens`, one row
/// per user.
pub async fn callback(
    Extension(user): Extension<AuthUser>,
    Query(query): Query<CallbackQuery>,
) -> ApiResult<Value> {
    if let Some(error) = query.error {
        return Err(ApiError::bad_request(format!("Google authorization failed: {}", error)));
    }
    let code = query
        .code
        .ok_or_else(|| ApiError::bad_request("Missing required parameter: code"))?;

    let tokens = drive::exchange_code(&code).await?;
    let expires_at = tokens
        .expires_in
        .map(|secs| Utc::now() + Duration::seconds(secs));

    let pool = DatabaseManager::pool().await?;
    sqlx::query(
        "INSERT INTO google_tokens (user_id, access_token, refresh_token, expires_at, updated_at)
         VALUES ($1, $2, $3, $4, now())
         ON CONFLICT (user_id) DO UPDATE SET
            access_token = EXCLUDED.access_token,
            refresh_token = COALESCE(EXCLUDED.refresh_token, google_tokens.refresh_token),
            expires_at = EXCLUDED.expires_at,
            updated_at = now()",
    )
    .bind(user.user_id)
    .bind(&tokens.access_token)
    .bind(&tokens.refresh_token)
    .bind(expires_at)
    .execute(&pool)
    .await?;

    tracing::info!("Google Drive connected for user {}", user.user_id);
    Ok(ApiResponse::success(json!({
        "connected": true,
        "expires_at": expires_at,
    })))
}
