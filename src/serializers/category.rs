use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use super::{FieldErrors, Payload, WriteMode};
use crate::catalog::slugify;
use crate::database::models::{Category, CategoryChanges, NewCategory};
use crate::database::store::{category_subtree, CatalogStore, StoreError};
use crate::error::ApiError;

const WRITABLE: &[&str] = &["name", "description", "parent"];
const READ_ONLY: &[&str] = &["id", "slug", "children", "created_at", "updated_at"];

/// Wire representation of a category
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryRepr {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub parent: Option<i64>,
    pub children: Vec<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CategoryRepr {
    pub fn new(category: &Category, children: Vec<i64>) -> Self {
        Self {
            id: category.id,
            name: category.name.clone(),
            slug: category.slug.clone(),
            description: category.description.clone(),
            parent: category.parent_id,
            children,
            created_at: category.created_at,
            updated_at: category.updated_at,
        }
    }
}

pub struct CategorySerializer;

impl CategorySerializer {
    pub async fn represent(store: &dyn CatalogStore, category: &Category) -> Result<CategoryRepr, StoreError> {
        let mut reprs = Self::represent_many(store, std::slice::from_ref(category)).await?;
        reprs.pop().ok_or_else(|| StoreError::NotFound(format!("category {}", category.id)))
    }

    /// Represent a batch, loading children for all of them in one store call
    pub async fn represent_many(store: &dyn CatalogStore, categories: &[Category]) -> Result<Vec<CategoryRepr>, StoreError> {
        let ids: Vec<i64> = categories.iter().map(|c| c.id).collect();
        let mut children = store.category_children(&ids).await?;
        Ok(categories
            .iter()
            .map(|c| CategoryRepr::new(c, children.remove(&c.id).unwrap_or_default()))
            .collect())
    }

    pub async fn validate_create(store: &dyn CatalogStore, data: &Map<String, Value>) -> Result<NewCategory, ApiError> {
        let payload = Payload::new(data, WriteMode::Create);
        let mut errors = FieldErrors::new();
        payload.reject_unknown(WRITABLE, READ_ONLY, &mut errors);

        let name = payload.name("name", &mut errors);
        let description = payload.optional_text("description", &mut errors).flatten();
        let parent_id = payload.reference("parent", false, true, &mut errors).flatten();

        let slug = name.as_deref().map(slugify).unwrap_or_default();
        if name.is_some() && slug.is_empty() {
            errors.add("name", "Name must contain at least one letter or digit.");
        }

        if let Some(parent_id) = parent_id {
            check_parent_exists(store, parent_id, &mut errors).await?;
        }

        let name = errors.into_result(name)?;
        Ok(NewCategory {
            name: name.unwrap_or_default(),
            slug,
            description,
            parent_id,
        })
    }

    pub async fn validate_update(
        store: &dyn CatalogStore,
        existing: &Category,
        data: &Map<String, Value>,
        mode: WriteMode,
    ) -> Result<CategoryChanges, ApiError> {
        let payload = Payload::new(data, mode);
        let mut errors = FieldErrors::new();
        payload.reject_unknown(WRITABLE, READ_ONLY, &mut errors);

        let changes = CategoryChanges {
            name: payload.name("name", &mut errors),
            description: payload.optional_text("description", &mut errors),
            parent_id: payload.reference("parent", false, true, &mut errors),
        };

        if let Some(Some(parent_id)) = changes.parent_id {
            if parent_id == existing.id {
                errors.add("parent", "A category cannot be its own parent.");
            } else if check_parent_exists(store, parent_id, &mut errors).await? {
                let subtree = category_subtree(store, existing.id).await?;
                if subtree.contains(&parent_id) {
                    errors.add("parent", "A category cannot be moved below one of its descendants.");
                }
            }
        }

        Ok(errors.into_result(changes)?)
    }
}

async fn check_parent_exists(store: &dyn CatalogStore, parent_id: i64, errors: &mut FieldErrors) -> Result<bool, StoreError> {
    if store.get_category(parent_id).await?.is_some() {
        return Ok(true);
    }
    errors.add("parent", format!("Invalid pk \"{}\" - object does not exist.", parent_id));
    Ok(false)
}
