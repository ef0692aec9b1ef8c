// handlers/categories.rs - /categories/ resource handlers

use axum::{
    body::Bytes,
    extract::{OriginalUri, Path, Query, State},
    http::HeaderMap,
    Extension,
};
use std::collections::HashMap;
use tracing::info;

use super::{not_found, parse_id};
use crate::app::AppState;
use crate::auth::{authorize, Principal};
use crate::catalog::pagination::request_url;
use crate::catalog::{Page, PageRequest};
use crate::database::models::Category;
use crate::middleware::{ApiResponse, ApiResult};
use crate::serializers::{parse_json_object, CategoryRepr, CategorySerializer, WriteMode};
use crate::types::{Action, ResourceKind};

const RESOURCE: ResourceKind = ResourceKind::Category;

/// GET /categories/ - paginated, ordered by name
pub async fn list(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(params): Query<HashMap<String, String>>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
) -> ApiResult<Page<CategoryRepr>> {
    authorize(&principal, Action::List, RESOURCE)?;
    let store = state.store.as_ref();

    let request = PageRequest::from_params(&params, &state.config.api)?;
    let count = store.count_categories().await?;
    let request = request.resolve(count)?;

    let categories = store.list_categories(request.window()).await?;
    let results = CategorySerializer::represent_many(store, &categories).await?;
    let base = request_url(&headers, &uri);
    Ok(ApiResponse::success(Page::new(request, count, results, base.as_ref())))
}

/// GET /categories/:id/
pub async fn retrieve(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> ApiResult<CategoryRepr> {
    authorize(&principal, Action::Retrieve, RESOURCE)?;
    let category = load(&state, &id).await?;
    Ok(ApiResponse::success(CategorySerializer::represent(state.store.as_ref(), &category).await?))
}

/// POST /categories/
pub async fn create(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    body: Bytes,
) -> ApiResult<CategoryRepr> {
    authorize(&principal, Action::Create, RESOURCE)?;
    let store = state.store.as_ref();

    let data = parse_json_object(&body)?;
    let new = CategorySerializer::validate_create(store, &data).await?;
    let category = store.insert_category(new).await?;

    info!(id = category.id, slug = %category.slug, "category created");
    Ok(ApiResponse::created(CategorySerializer::represent(store, &category).await?))
}

/// PUT /categories/:id/
pub async fn update(
    state: State<AppState>,
    principal: Extension<Principal>,
    id: Path<String>,
    body: Bytes,
) -> ApiResult<CategoryRepr> {
    write(state, principal, id, body, WriteMode::Replace).await
}

/// PATCH /categories/:id/
pub async fn partial_update(
    state: State<AppState>,
    principal: Extension<Principal>,
    id: Path<String>,
    body: Bytes,
) -> ApiResult<CategoryRepr> {
    write(state, principal, id, body, WriteMode::Partial).await
}

async fn write(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    body: Bytes,
    mode: WriteMode,
) -> ApiResult<CategoryRepr> {
    let action = if mode == WriteMode::Partial { Action::PartialUpdate } else { Action::Update };
    authorize(&principal, action, RESOURCE)?;
    let store = state.store.as_ref();

    let existing = load(&state, &id).await?;
    let data = parse_json_object(&body)?;
    let changes = CategorySerializer::validate_update(store, &existing, &data, mode).await?;
    let category = store.update_category(existing.id, changes).await?;

    info!(id = category.id, ?mode, "category updated");
    Ok(ApiResponse::success(CategorySerializer::represent(store, &category).await?))
}

/// DELETE /categories/:id/ - cascades to descendants, refused while products reference the subtree
pub async fn destroy(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> ApiResult<()> {
    authorize(&principal, Action::Destroy, RESOURCE)?;
    let category = load(&state, &id).await?;

    let removed = state.store.delete_category(category.id).await?;
    info!(id = category.id, removed, "category deleted");
    Ok(ApiResponse::no_content())
}

async fn load(state: &AppState, raw_id: &str) -> Result<Category, crate::error::ApiError> {
    let id = parse_id(raw_id)?;
    state.store.get_category(id).await?.ok_or_else(not_found)
}
