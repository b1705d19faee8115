mod common;

use anyhow::Result;
use reqwest::StatusCode;

// The /api tree must reject requests before touching the database, so these
// run without a configured DATABASE_URL.

#[tokio::test]
async fn protected_routes_require_bearer_token() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    for path in [
        "/api/auth/whoami",
        "/api/projects",
        "/api/resources",
        "/api/categories",
        "/api/api-keys",
        "/api/drive/docs",
    ] {
        let res = client
            .get(format!("{}{}", server.base_url, path))
            .send()
            .await?;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED, "path: {}", path);

        let body = res.json::<serde_json::Value>().await?;
        assert_eq!(body["ok"], serde_json::json!(false), "path: {}", path);
        assert_eq!(body["code"], "AUTH_REQUIRED", "path: {}", path);
    }

    Ok(())
}

#[tokio::test]
async fn malformed_bearer_tokens_are_rejected() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    // Not a bearer scheme
    let res = client
        .get(format!("{}/api/projects", server.base_url))
        .header("authorization", "Basic dXNlcjpwYXNz")
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    // Bearer but not a valid JWT
    let res = client
        .get(format!("{}/api/projects", server.base_url))
        .header("authorization", "Bearer not.a.jwt")
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["code"], "AUTH_REQUIRED");
    Ok(())
}

#[tokio::test]
async fn invite_accept_requires_authentication() -> Result<()> {
    let server = common::ensure_server().await?;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/api/invites/accept", server.base_url))
        .json(&serde_json::json!({ "token": "whatever" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    Ok(())
}
