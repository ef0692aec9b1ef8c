use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::auth::TokenIssuer;
use crate::config::{AppConfig, SecurityConfig};
use crate::database::CatalogStore;
use crate::handlers::{categories, health, products, token};
use crate::middleware::resolve_principal;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn CatalogStore>,
    pub config: Arc<AppConfig>,
    pub tokens: Arc<TokenIssuer>,
}

impl AppState {
    pub fn new(store: Arc<dyn CatalogStore>, config: AppConfig) -> Self {
        let tokens = Arc::new(TokenIssuer::new(&config.security));
        Self {
            store,
            config: Arc::new(config),
            tokens,
        }
    }
}

/// Build the full router: catalog and token routes under the API prefix,
/// plus the unprefixed service routes
pub fn app(state: AppState) -> Router {
    let config = state.config.clone();

    let api = catalog_routes()
        .route_layer(middleware::from_fn_with_state(state.clone(), resolve_principal))
        .merge(token_routes());

    let routed = if config.api.prefix.is_empty() {
        Router::new().merge(api)
    } else {
        Router::new().nest(&config.api.prefix, api)
    };

    let mut router = routed
        .route("/", get(health::root))
        .route("/health", get(health::health))
        .layer(DefaultBodyLimit::max(config.api.max_request_size_bytes))
        .with_state(state);

    if config.security.enable_cors {
        router = router.layer(cors_layer(&config.security));
    }
    if config.api.enable_request_logging {
        router = router.layer(TraceLayer::new_for_http());
    }
    router
}

fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/categories/", get(categories::list).post(categories::create))
        .route(
            "/categories/:id/",
            get(categories::retrieve)
                .put(categories::update)
                .patch(categories::partial_update)
                .delete(categories::destroy),
        )
        .route("/products/", get(products::list).post(products::create))
        // Literal segment, registered ahead of the id route
        .route("/products/recent/", get(products::recent))
        .route(
            "/products/:id/",
            get(products::retrieve)
                .put(products::update)
                .patch(products::partial_update)
                .delete(products::destroy),
        )
}

/// Token endpoints do not resolve a principal
fn token_routes() -> Router<AppState> {
    Router::new()
        .route("/token/", post(token::obtain))
        .route("/token/refresh/", post(token::refresh))
}

fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}
