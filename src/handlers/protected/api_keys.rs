use axum::extract::{Extension, Path};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::config;
use crate::database::manager::DatabaseManager;
use crate::database::models::ApiKey;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::vault;

#[derive(Debug, Deserialize)]
pub struct CreateApiKeyRequest {
    pub name: String,
    pub service: String,
    pub key: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateApiKeyRequest {
    pub name: Option<String>,
    pub service: Option<String>,
    pub key: Option<String>,
    pub description: Option<String>,
}

/// Key row with the plaintext only the owner may see
fn present(key: &ApiKey, plaintext: String) -> Value {
    json!({
        "id": key.id,
        "name": key.name,
        "service": key.service,
        "key": plaintext,
        "key_digest": key.key_digest,
        "description": key.description,
        "created_at": key.created_at,
        "updated_at": key.updated_at,
    })
}

/// GET /api/api-keys - The caller's keys, decrypted for the owner
pub async fn list(Extension(user): Extension<AuthUser>) -> ApiResult<Value> {
    let pool = DatabaseManager::pool().await?;
    let vault_key = &config::config().security.vault_key;

    let keys = sqlx::query_as::<_, ApiKey>(
        "SELECT * FROM api_keys WHERE user_id = $1 ORDER BY created_at DESC",
    )
    .bind(user.user_id)
    .fetch_all(&pool)
    .await?;

    let payload: Vec<Value> = keys
        .iter()
        .map(|k| present(k, vault::decrypt(&k.encrypted_key, vault_key)))
        .collect();

    Ok(ApiResponse::success(json!({ "api_keys": payload })))
}

/// POST /api/api-keys - Store a third-party key in the vault
pub async fn create(
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<CreateApiKeyRequest>,
) -> ApiResult<Value> {
    let name = payload.name.trim();
    let service = payload.service.trim();
    if name.is_empty() || service.is_empty() || payload.key.is_empty() {
        return Err(ApiError::bad_request("Missing required fields: name, service, key"));
    }

    let vault_key = &config::config().security.vault_key;
    let encrypted = vault::encrypt(&payload.key, vault_key);
    let digest = vault::fingerprint(&payload.key);

    let pool = DatabaseManager::pool().await?;
    let key = sqlx::query_as::<_, ApiKey>(
        "INSERT INTO api_keys (user_id, name, service, encrypted_key, key_digest, description)
         VALUES ($1, $2, $3, $4, $5, $6)
         RETURNING *",
    )
    .bind(user.user_id)
    .bind(name)
    .bind(service)
    .bind(&encrypted)
    .bind(&digest)
    .bind(&payload.description)
    .fetch_one(&pool)
    .await?;

    Ok(ApiResponse::created(json!({ "api_key": present(&key, payload.key) })))
}

/// PATCH /api/api-keys/:key_id - Rename, redescribe, or rotate the key value
pub async fn update(
    Extension(user): Extension<AuthUser>,
    Path(key_id): Path<Uuid>,
    Json(payload): Json<UpdateApiKeyRequest>,
) -> ApiResult<Value> {
    let vault_key = &config::config().security.vault_key;

    let (encrypted, digest) = match &payload.key {
        Some(plain) if !plain.is_empty() => (
            Some(vault::encrypt(plain, vault_key)),
            Some(vault::fingerprint(plain)),
        ),
        Some(_) => return Err(ApiError::bad_request("Key value cannot be empty")),
        None => (None, None),
    };

    let pool = DatabaseManager::pool().await?;
    let key = sqlx::query_as::<_, ApiKey>(
        "UPDATE api_keys SET
            name = COALESCE($3, name),
            service = COALESCE($4, service),
            encrypted_key = COALESCE($5, encrypted_key),
            key_digest = COALESCE($6, key_digest),
            description = COALESCE($7, description),
            updated_at = now()
         WHERE id = $1 AND user_id = $2
         RETURNING *",
    )
    .bind(key_id)
    .bind(user.user_id)
    .bind(&payload.name)
    .bind(&payload.service)
    .bind(&encrypted)
    .bind(&digest)
    .bind(&payload.description)
    .fetch_optional(&pool)
    .await?
    .ok_or_else(|| ApiError::not_found("API key not found"))?;

    let plaintext = vault::decrypt(&key.encrypted_key, vault_key);
    Ok(ApiResponse::success(json!({ "api_key": present(&key, plaintext) })))
}

/// DELETE /api/api-keys/:key_id
pub async fn delete(
    Extension(user): Extension<AuthUser>,
    Path(key_id): Path<Uuid>,
) -> ApiResult<Value> {
    let pool = DatabaseManager::pool().await?;

    let result = sqlx::query("DELETE FROM api_keys WHERE id = $1 AND user_id = $2")
        .bind(key_id)
        .bind(user.user_id)
        .execute(&pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("API key not found"));
    }

    Ok(ApiResponse::success(json!({ "message": "API key deleted successfully" })))
}
