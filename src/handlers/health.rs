// handlers/health.rs - unprefixed service routes

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::{json, Value};

use crate::app::AppState;

/// GET / - service name, version and resource locations
pub async fn root(State(state): State<AppState>) -> Json<Value> {
    let prefix = &state.config.api.prefix;
    Json(json!({
        "name": "Catalog API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "categories": format!("{}/categories/", prefix),
            "products": format!("{}/products/", prefix),
            "recent_products": format!("{}/products/recent/", prefix),
            "token": format!("{}/token/", prefix),
            "token_refresh": format!("{}/token/refresh/", prefix),
            "health": "/health",
        }
    }))
}

/// GET /health - store connectivity
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.store.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "timestamp": now,
                "database": "ok"
            })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "degraded",
                    "timestamp": now,
                    "database": "unavailable"
                })),
            )
        }
    }
}
