use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::{generate_jwt, hash_password, verify_password, Claims};
use crate::config;
use crate::database::manager::DatabaseManager;
use crate::database::models::User;
use crate::error::{is_unique_violation, ApiError};
use crate::middleware::{ApiResponse, ApiResult};
use crate::types::is_valid_email;

const MIN_PASSWORD_LENGTH: usize = 8;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub full_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub email: String,
    pub password: String,
}

/// POST /auth/register - Create a user account
///
/// Expected Input:
/// ```json
/// {
///   "email": "string",      // Required
///   "password": "string",   // Required, min 8 chars
///   "full_name": "string"   // Optional
/// }
/// ```
///
/// Expected Output (Success):
/// ```json
/// {
///   "ok": true,
///   "data": {
///     "user": { "id": "...", "email": "...", "full_name": "..." },
///     "token": "eyJhbGciOiJIUzI1NiI...",
///     "expires_in": 604800
///   }
/// }
/// ```
pub async fn register(Json(payload): Json<RegisterRequest>) -> ApiResult<Value> {
    let email = payload.email.trim().to_lowercase();

    if !is_valid_email(&email) {
        return Err(ApiError::bad_request("Invalid email format"));
    }
    if payload.password.len() < MIN_PASSWORD_LENGTH {
        return Err(ApiError::bad_request(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }

    let pool = DatabaseManager::pool().await?;

    // argon2 is CPU-bound; keep it off the async runtime
    let password = payload.password.clone();
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| ApiError::internal_server_error(format!("hashing task failed: {e}")))?
        .map_err(|e| ApiError::internal_server_error(e.to_string()))?;

    let user = sqlx::query_as::<_, User>(
        "INSERT INTO users (email, full_name, password_hash)
         VALUES ($1, $2, $3)
         RETURNING *",
    )
    .bind(&email)
    .bind(&payload.full_name)
    .bind(&password_hash)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            ApiError::conflict("An account with this email already exists")
        } else {
            e.into()
        }
    })?;

    let claims = Claims::new(user.id, user.email.clone(), user.full_name.clone());
    let token = generate_jwt(&claims)?;

    Ok(ApiResponse::created(json!({
        "user": user.public(),
        "token": token,
        "expires_in": config::config().security.jwt_expiry_hours * 3600
    })))
}

/// POST /auth/token - Authenticate and receive a JWT bearer token
pub async fn token(Json(payload): Json<TokenRequest>) -> ApiResult<Value> {
    let email = payload.email.trim().to_lowercase();
    let pool = DatabaseManager::pool().await?;

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
        .bind(&email)
        .fetch_optional(&pool)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid email or password"))?;

    let password = payload.password.clone();
    let stored_hash = user.password_hash.clone();
    let verified = tokio::task::spawn_blocking(move || verify_password(&password, &stored_hash))
        .await
        .map_err(|e| ApiError::internal_server_error(format!("verification task failed: {e}")))?;

    if !verified {
        tracing::warn!("Failed login attempt for {}", email);
        return Err(ApiError::unauthorized("Invalid email or password"));
    }

    let claims = Claims::new(user.id, user.email.clone(), user.full_name.clone());
    let token = generate_jwt(&claims)?;

    Ok(ApiResponse::success(json!({
        "user": user.public(),
        "token": token,
        "expires_in": config::config().security.jwt_expiry_hours * 3600
    })))
}
