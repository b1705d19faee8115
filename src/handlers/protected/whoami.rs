use axum::extract::Extension;
use serde_json::{json, Value};

use crate::middleware::{ApiResponse, ApiResult, AuthUser};

/// GET /api/auth/whoami - Echo the authenticated identity from the token
pub async fn whoami(Extension(user): Extension<AuthUser>) -> ApiResult<Value> {
    Ok(ApiResponse::success(json!({
        "id": user.user_id,
        "email": user.email,
        "full_name": user.full_name,
    })))
}
