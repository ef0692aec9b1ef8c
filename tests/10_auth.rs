mod common;

use std::sync::Arc;

use anyhow::Result;
use axum::http::{Method, StatusCode};
use serde_json::json;

use catalog_api::auth::password::MIN_COST;
use catalog_api::cli::commands::user::bootstrap_admin;
use catalog_api::database::{CatalogStore, MemoryStore};
use catalog_api::{app, AppConfig, AppState};
use common::{send, TestApp, API, PASSWORD};

#[tokio::test]
async fn reads_are_open_to_anonymous_clients() -> Result<()> {
    let app = TestApp::new().await?;
    for path in ["/categories/", "/products/", "/products/recent/"] {
        let (status, _) = app.get(path).await?;
        assert_eq!(status, StatusCode::OK, "GET {path}");
    }
    Ok(())
}

#[tokio::test]
async fn anonymous_writes_are_unauthenticated() -> Result<()> {
    let app = TestApp::new().await?;
    let (status, body) = app.post("/categories/", None, json!({ "name": "Books" })).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");

    let (status, _) = app.delete("/products/1/", None).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn authentication_without_permission_is_forbidden() -> Result<()> {
    let app = TestApp::new().await?;
    let (status, body) = app
        .post("/categories/", Some(&app.viewer_token), json!({ "name": "Books" }))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");

    // editor holds product permissions only
    let (status, _) = app
        .post("/categories/", Some(&app.editor_token), json!({ "name": "Books" }))
        .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn product_permissions_allow_product_writes() -> Result<()> {
    let app = TestApp::new().await?;
    let category = app.category("Books", None).await?;

    let (status, body) = app
        .post(
            "/products/",
            Some(&app.editor_token),
            json!({ "category_id": category["id"], "name": "Dune", "price": "9.99" }),
        )
        .await?;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    Ok(())
}

#[tokio::test]
async fn authorization_runs_before_validation() -> Result<()> {
    let app = TestApp::new().await?;
    let (status, _) = app.post("/products/", None, json!({ "price": "-5.00" })).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.patch("/products/999/", Some(&app.viewer_token), json!({})).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn invalid_tokens_are_rejected_even_on_reads() -> Result<()> {
    let app = TestApp::new().await?;
    let (status, _) = app
        .request(Method::GET, &format!("{API}/products/"), Some("garbage.token.value"), None)
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn token_obtain_and_refresh() -> Result<()> {
    let app = TestApp::new().await?;

    let (status, pair) = app
        .post("/token/", None, json!({ "username": "admin", "password": PASSWORD }))
        .await?;
    assert_eq!(status, StatusCode::OK);
    let access = pair["access"].as_str().unwrap_or_default().to_string();
    let refresh = pair["refresh"].as_str().unwrap_or_default().to_string();
    assert!(!access.is_empty() && !refresh.is_empty());

    let (status, _) = app
        .post("/categories/", Some(&access), json!({ "name": "Garden" }))
        .await?;
    assert_eq!(status, StatusCode::CREATED);

    // a refresh token is not an access token
    let (status, _) = app
        .request(Method::GET, &format!("{API}/categories/"), Some(&refresh), None)
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app.post("/token/refresh/", None, json!({ "refresh": refresh })).await?;
    assert_eq!(status, StatusCode::OK);
    assert!(body["access"].is_string());

    let (status, _) = app.post("/token/refresh/", None, json!({ "refresh": access })).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn bad_credentials_are_rejected() -> Result<()> {
    let app = TestApp::new().await?;
    let (status, _) = app
        .post("/token/", None, json!({ "username": "admin", "password": "wrong" }))
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app.post("/token/", None, json!({})).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["username"].is_string() && body["password"].is_string());
    Ok(())
}

#[tokio::test]
async fn seeded_admin_can_write_to_a_fresh_store() -> Result<()> {
    let mut config = AppConfig::development();
    config.api.enable_request_logging = false;
    config.security.password_cost = MIN_COST;
    config.security.admin_username = Some("owner".to_string());
    config.security.admin_password = Some(PASSWORD.to_string());

    let store: Arc<dyn CatalogStore> = Arc::new(MemoryStore::new());
    bootstrap_admin(store.as_ref(), &config.security).await?;
    let router = app(AppState::new(store, config));

    let (status, pair) = send(
        &router,
        Method::POST,
        &format!("{API}/token/"),
        None,
        Some(json!({ "username": "owner", "password": PASSWORD })),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    let access = pair["access"].as_str().unwrap_or_default();

    let (status, body) = send(
        &router,
        Method::POST,
        &format!("{API}/categories/"),
        Some(access),
        Some(json!({ "name": "Garden" })),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["slug"], "garden");
    Ok(())
}
