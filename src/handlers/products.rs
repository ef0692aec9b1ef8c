// handlers/products.rs - /products/ resource handlers
//
// Only available products are visible here, for reads and writes alike.

use axum::{
    body::Bytes,
    extract::{OriginalUri, Path, Query, State},
    http::HeaderMap,
    Extension,
};
use chrono::Utc;
use std::collections::HashMap;
use tracing::info;

use super::{not_found, parse_id};
use crate::app::AppState;
use crate::auth::{authorize, Principal};
use crate::catalog::pagination::request_url;
use crate::catalog::{Page, PageRequest, ProductQuery};
use crate::database::models::Product;
use crate::database::PageWindow;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::serializers::{parse_json_object, ProductRepr, ProductSerializer, WriteMode};
use crate::types::{Action, ResourceKind};

const RESOURCE: ResourceKind = ResourceKind::Product;

/// GET /products/ - filtered by category, available, price_min, price_max
/// and search; newest first
pub async fn list(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(params): Query<HashMap<String, String>>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
) -> ApiResult<Page<ProductRepr>> {
    authorize(&principal, Action::List, RESOURCE)?;
    let store = state.store.as_ref();

    let query = ProductQuery::compose(store, &params).await?;
    let request = PageRequest::from_params(&params, &state.config.api)?;
    let count = store.count_products(&query).await?;
    let request = request.resolve(count)?;

    let products = store.list_products(&query, request.window()).await?;
    let results = ProductSerializer::represent_many(store, &products, &state.config.media.url_prefix).await?;
    let base = request_url(&headers, &uri);
    Ok(ApiResponse::success(Page::new(request, count, results, base.as_ref())))
}

/// GET /products/recent/ - the most recent available products, unpaginated
/// and unfiltered
pub async fn recent(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<Vec<ProductRepr>> {
    authorize(&principal, Action::Recent, RESOURCE)?;
    let store = state.store.as_ref();

    let window = PageWindow::first(i64::from(state.config.api.recent_limit));
    let products = store.list_products(&ProductQuery::visible(), window).await?;
    let results = ProductSerializer::represent_many(store, &products, &state.config.media.url_prefix).await?;
    Ok(ApiResponse::success(results))
}

/// GET /products/:id/
pub async fn retrieve(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> ApiResult<ProductRepr> {
    authorize(&principal, Action::Retrieve, RESOURCE)?;
    let product = load_visible(&state, &id).await?;
    let repr = ProductSerializer::represent(state.store.as_ref(), &product, &state.config.media.url_prefix).await?;
    Ok(ApiResponse::success(repr))
}

/// POST /products/
pub async fn create(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    body: Bytes,
) -> ApiResult<ProductRepr> {
    authorize(&principal, Action::Create, RESOURCE)?;
    let store = state.store.as_ref();

    let data = parse_json_object(&body)?;
    let new = ProductSerializer::validate_create(store, &data, Utc::now()).await?;
    let product = store.insert_product(new).await?;

    info!(id = product.id, slug = %product.slug, category_id = product.category_id, "product created");
    let repr = ProductSerializer::represent(store, &product, &state.config.media.url_prefix).await?;
    Ok(ApiResponse::created(repr))
}

/// PUT /products/:id/
pub async fn update(
    state: State<AppState>,
    principal: Extension<Principal>,
    id: Path<String>,
    body: Bytes,
) -> ApiResult<ProductRepr> {
    write(state, principal, id, body, WriteMode::Replace).await
}

/// PATCH /products/:id/
pub async fn partial_update(
    state: State<AppState>,
    principal: Extension<Principal>,
    id: Path<String>,
    body: Bytes,
) -> ApiResult<ProductRepr> {
    write(state, principal, id, body, WriteMode::Partial).await
}

async fn write(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    body: Bytes,
    mode: WriteMode,
) -> ApiResult<ProductRepr> {
    let action = if mode == WriteMode::Partial { Action::PartialUpdate } else { Action::Update };
    authorize(&principal, action, RESOURCE)?;
    let store = state.store.as_ref();

    let existing = load_visible(&state, &id).await?;
    let data = parse_json_object(&body)?;
    let changes = ProductSerializer::validate_update(store, &data, mode, Utc::now()).await?;
    let product = store.update_product(existing.id, changes).await?;

    info!(id = product.id, ?mode, "product updated");
    let repr = ProductSerializer::represent(store, &product, &state.config.media.url_prefix).await?;
    Ok(ApiResponse::success(repr))
}

/// DELETE /products/:id/
pub async fn destroy(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    authorize(&principal, Action::Destroy, RESOURCE)?;
    let product = load_visible(&state, &id).await?;

    state.store.delete_product(product.id).await?;
    info!(id = product.id, "product deleted");
    Ok(ApiResponse::no_content())
}

/// Unavailable products are treated as absent
async fn load_visible(state: &AppState, raw_id: &str) -> Result<Product, ApiError> {
    let id = parse_id(raw_id)?;
    state
        .store
        .get_product(id)
        .await?
        .filter(|p| ProductQuery::visible().matches(p))
        .ok_or_else(not_found)
}
