#![allow(dead_code)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use catalog_api::auth::password::{hash_password, MIN_COST};
use catalog_api::database::models::NewUser;
use catalog_api::database::{CatalogStore, MemoryStore};
use catalog_api::{app, AppConfig, AppState};

pub const API: &str = "/api/v1";
pub const PASSWORD: &str = "correct horse battery staple";

/// Router over a fresh in-memory store, seeded with three users:
/// `admin` (staff), `editor` (product permissions only) and `viewer` (none)
pub struct TestApp {
    pub state: AppState,
    pub router: Router,
    pub staff_token: String,
    pub editor_token: String,
    pub viewer_token: String,
}

impl TestApp {
    pub async fn new() -> Result<Self> {
        Self::with_config(AppConfig::development()).await
    }

    pub async fn with_config(mut config: AppConfig) -> Result<Self> {
        config.api.enable_request_logging = false;
        let store: Arc<dyn CatalogStore> = Arc::new(MemoryStore::new());

        let users = [
            ("admin", true, vec![]),
            ("editor", false, vec!["add_product", "change_product", "delete_product"]),
            ("viewer", false, vec![]),
        ];
        let mut tokens = Vec::new();
        let state = AppState::new(store.clone(), config);
        for (username, is_staff, permissions) in users {
            let user = store
                .insert_user(NewUser {
                    username: username.to_string(),
                    password_hash: hash_password(PASSWORD, MIN_COST)?,
                    is_staff,
                    is_active: true,
                    permissions: permissions.into_iter().map(String::from).collect(),
                })
                .await?;
            tokens.push(state.tokens.issue_access(user.id, &user.username)?);
        }

        let router = app(state.clone());
        let viewer_token = tokens.pop().context("viewer token")?;
        let editor_token = tokens.pop().context("editor token")?;
        let staff_token = tokens.pop().context("staff token")?;
        Ok(Self { state, router, staff_token, editor_token, viewer_token })
    }

    pub async fn request(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Result<(StatusCode, Value)> {
        send(&self.router, method, uri, token, body).await
    }

    pub async fn get(&self, path: &str) -> Result<(StatusCode, Value)> {
        self.request(Method::GET, &format!("{}{}", API, path), None, None).await
    }

    pub async fn post(&self, path: &str, token: Option<&str>, body: Value) -> Result<(StatusCode, Value)> {
        self.request(Method::POST, &format!("{}{}", API, path), token, Some(body)).await
    }

    pub async fn put(&self, path: &str, token: Option<&str>, body: Value) -> Result<(StatusCode, Value)> {
        self.request(Method::PUT, &format!("{}{}", API, path), token, Some(body)).await
    }

    pub async fn patch(&self, path: &str, token: Option<&str>, body: Value) -> Result<(StatusCode, Value)> {
        self.request(Method::PATCH, &format!("{}{}", API, path), token, Some(body)).await
    }

    pub async fn delete(&self, path: &str, token: Option<&str>) -> Result<(StatusCode, Value)> {
        self.request(Method::DELETE, &format!("{}{}", API, path), token, None).await
    }

    /// Create a category as staff and return its representation
    pub async fn category(&self, name: &str, parent: Option<i64>) -> Result<Value> {
        let (status, body) = self
            .post("/categories/", Some(&self.staff_token), json!({ "name": name, "parent": parent }))
            .await?;
        anyhow::ensure!(status == StatusCode::CREATED, "category create failed: {} {}", status, body);
        Ok(body)
    }

    /// Create a product as staff; `extra` fields override the defaults
    pub async fn product(&self, category_id: i64, name: &str, price: &str, extra: Value) -> Result<Value> {
        let mut payload = json!({ "category_id": category_id, "name": name, "price": price });
        if let (Some(target), Some(fields)) = (payload.as_object_mut(), extra.as_object()) {
            for (k, v) in fields {
                target.insert(k.clone(), v.clone());
            }
        }
        let (status, body) = self.post("/products/", Some(&self.staff_token), payload).await?;
        anyhow::ensure!(status == StatusCode::CREATED, "product create failed: {} {}", status, body);
        Ok(body)
    }

    /// Serve the router on a free local port and wait until it answers
    pub async fn serve(&self) -> Result<String> {
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);
        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port)).await?;

        let router = self.router.clone();
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        wait_ready(&base_url, Duration::from_secs(10)).await?;
        Ok(base_url)
    }
}

/// Drive one request through a router and decode the JSON body
pub async fn send(router: &Router, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Result<(StatusCode, Value)> {
    let mut builder = Request::builder().method(method).uri(uri).header(header::HOST, "testserver");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let body = match body {
        Some(value) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };

    let response = router.clone().oneshot(builder.body(body)?).await?;
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    let json = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes)? };
    Ok((status, json))
}

async fn wait_ready(base_url: &str, timeout: Duration) -> Result<()> {
    let client = reqwest::Client::new();
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if let Ok(resp) = client.get(format!("{}/health", base_url)).send().await {
            if resp.status().is_success() {
                return Ok(());
            }
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    anyhow::bail!("server did not become ready on {} within {:?}", base_url, timeout)
}

pub fn id_of(value: &Value) -> i64 {
    value["id"].as_i64().unwrap_or_default()
}
