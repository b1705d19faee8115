use axum::{
    middleware as axum_middleware,
    routing::{get, patch, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::handlers::{protected, public};
use crate::middleware::jwt_auth_middleware;

pub fn app() -> Router {
    Router::new()
        // Public
        .route("/", get(public::root))
        .route("/health", get(public::health))
        // Public auth routes (token acquisition)
        .merge(auth_public_routes())
        // Protected API behind bearer JWT
        .merge(protected_routes())
        // Global middleware
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

fn auth_public_routes() -> Router {
    Router::new()
        .route("/auth/register", post(public::register))
        .route("/auth/token", post(public::token))
}

fn protected_routes() -> Router {
    use protected::*;

    Router::new()
        .route("/api/auth/whoami", get(whoami::whoami))
        // Projects
        .route("/api/projects", get(projects::list).post(projects::create))
        .route(
            "/api/projects/:project_id",
            get(projects::get)
                .patch(projects::update)
                .delete(projects::delete),
        )
        .route("/api/projects/:project_id/archive", post(projects::archive))
        // Members
        .route(
            "/api/projects/:project_id/members",
            get(members::list)
                .patch(members::update_role)
                .delete(members::remove),
        )
        // Invites
        .route("/api/invites", get(invites::list).post(invites::create))
        .route("/api/invites/accept", post(invites::accept))
        .route("/api/invites/:invite_id/revoke", post(invites::revoke))
        // Tasks and subtasks
        .route(
            "/api/projects/:project_id/tasks",
            get(tasks::list).post(tasks::create),
        )
        .route(
            "/api/tasks/:task_id",
            get(tasks::get).patch(tasks::update).delete(tasks::delete),
        )
        .route(
            "/api/tasks/:task_id/subtasks",
            get(subtasks::list).post(subtasks::create),
        )
        .route(
            "/api/subtasks/:subtask_id",
            patch(subtasks::update).delete(subtasks::delete),
        )
        // Categories and subcategories
        .route("/api/categories", get(categories::list).post(categories::create))
        .route(
            "/api/categories/:category_id",
            patch(categories::update).delete(categories::delete),
        )
        .route(
            "/api/subcategories",
            get(categories::list_subcategories).post(categories::create_subcategory),
        )
        .route(
            "/api/subcategories/:subcategory_id",
            patch(categories::update_subcategory).delete(categories::delete_subcategory),
        )
        // Resources
        .route("/api/resources", get(resources::list).post(resources::create))
        .route(
            "/api/resources/:resource_id",
            patch(resources::update).delete(resources::delete),
        )
        // API key vault
        .route("/api/api-keys", get(api_keys::list).post(api_keys::create))
        .route(
            "/api/api-keys/:key_id",
            patch(api_keys::update).delete(api_keys::delete),
        )
        // Search
        .route("/api/search", post(search::search))
        // Google Drive
        .route("/auth/google", get(google::start))
        .route("/auth/google/callback", get(google::callback))
        .route("/api/drive/docs", get(drive::list).post(drive::search))
        .layer(axum_middleware::from_fn(jwt_auth_middleware))
}

/// Bind and serve until shutdown. Port comes from NEXUS_API_PORT or PORT,
/// defaulting to 3000.
pub async fn serve() -> anyhow::Result<()> {
    let app = app();

    let port = std::env::var("NEXUS_API_PORT")
        .ok()
        .or_else(|| std::env::var("PORT").ok())
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(3000);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    tracing::info!("Nexus API server listening on http://{}", bind_addr);
    axum::serve(listener, app).await?;
    Ok(())
}
