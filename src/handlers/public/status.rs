use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

/// GET / - Service descriptor and endpoint map
pub async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "ok": true,
        "data": {
            "name": "Nexus API",
            "version": version,
            "description": "Project and resource management backend built with Rust (Axum)",
            "endpoints": {
                "home": "/ (public)",
                "auth": "/auth/register, /auth/token (public - token acquisition)",
                "whoami": "/api/auth/whoami (protected)",
                "projects": "/api/projects[/:project] (protected)",
                "members": "/api/projects/:project/members (protected)",
                "invites": "/api/invites, /api/invites/accept, /api/invites/:id/revoke (protected)",
                "tasks": "/api/projects/:project/tasks, /api/tasks/:task (protected)",
                "subtasks": "/api/tasks/:task/subtasks, /api/subtasks/:id (protected)",
                "categories": "/api/categories[/:id], /api/subcategories[/:id] (protected)",
                "resources": "/api/resources[/:id] (protected)",
                "api_keys": "/api/api-keys[/:id] (protected)",
                "search": "/api/search (protected)",
                "drive": "/auth/google, /auth/google/callback, /api/drive/docs (protected)",
            }
        }
    }))
}

/// GET /health - Liveness plus database connectivity
pub async fn health() -> impl IntoResponse {
    let now = chrono::Utc::now();

    match crate::database::manager::DatabaseManager::health_check().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "ok": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "ok": false,
                "error": "database unavailable",
                "data": {
                    "status": "degraded",
                    "timestamp": now,
                    "database_error": e.to_string()
                }
            })),
        ),
    }
}
