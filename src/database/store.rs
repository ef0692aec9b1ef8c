use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;

use crate::catalog::composer::ProductQuery;
use crate::database::models::{
    Category, CategoryChanges, NewCategory, NewProduct, NewUser, Product, ProductChanges, User,
};

/// Errors surfaced by any `CatalogStore` implementation
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid database URL")]
    InvalidDatabaseUrl,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{entity} with this {field} already exists")]
    UniqueViolation { entity: &'static str, field: String },

    #[error("Referenced row does not exist for {field}")]
    InvalidReference { field: String },

    #[error("Delete restricted: {0}")]
    Restricted(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error(transparent)]
    Sqlx(sqlx::Error),
}

impl From<crate::filter::FilterError> for StoreError {
    fn from(err: crate::filter::FilterError) -> Self {
        StoreError::QueryError(err.to_string())
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db) => match db.code().map(|c| c.into_owned()).as_deref() {
                // unique_violation
                Some("23505") => {
                    let (entity, field) = constraint_target(db.constraint().unwrap_or_default());
                    StoreError::UniqueViolation { entity, field }
                }
                // foreign_key_violation
                Some("23503") => {
                    let (_, field) = constraint_target(db.constraint().unwrap_or_default());
                    StoreError::InvalidReference { field }
                }
                _ => StoreError::Sqlx(sqlx::Error::Database(db)),
            },
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => StoreError::Unavailable(err.to_string()),
            sqlx::Error::Io(e) => StoreError::Unavailable(e.to_string()),
            other => StoreError::Sqlx(other),
        }
    }
}

/// Map a constraint name such as `products_slug_key` to (entity, API field)
fn constraint_target(constraint: &str) -> (&'static str, String) {
    let entity = if constraint.starts_with("categories_") {
        "category"
    } else if constraint.starts_with("products_") {
        "product"
    } else if constraint.starts_with("users_") {
        "user"
    } else {
        "record"
    };
    let column = constraint
        .split_once('_')
        .map(|(_, rest)| rest)
        .unwrap_or(constraint)
        .trim_end_matches("_key")
        .trim_end_matches("_fkey");
    let field = match column {
        "parent_id" => "parent",
        "category_id" => "category",
        other => other,
    };
    (entity, field.to_string())
}

/// Offset/limit slice of an ordered listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub limit: i64,
    pub offset: i64,
}

impl PageWindow {
    pub fn first(limit: i64) -> Self {
        Self { limit, offset: 0 }
    }
}

/// Relational persistence for the catalog.
///
/// Implementations own uniqueness (category name, slugs, usernames), the
/// category parent cascade and the product→category restrict rule.
/// Categories list by `name` ascending, products by `created_at` descending.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn health_check(&self) -> Result<(), StoreError>;

    async fn list_categories(&self, window: PageWindow) -> Result<Vec<Category>, StoreError>;
    async fn count_categories(&self) -> Result<i64, StoreError>;
    async fn get_category(&self, id: i64) -> Result<Option<Category>, StoreError>;
    /// Child ids for each requested parent, ordered by child name
    async fn category_children(&self, parent_ids: &[i64]) -> Result<HashMap<i64, Vec<i64>>, StoreError>;
    async fn insert_category(&self, new: NewCategory) -> Result<Category, StoreError>;
    async fn update_category(&self, id: i64, changes: CategoryChanges) -> Result<Category, StoreError>;
    /// Deletes the category and its descendants; returns how many rows went
    async fn delete_category(&self, id: i64) -> Result<u64, StoreError>;

    async fn list_products(&self, query: &ProductQuery, window: PageWindow) -> Result<Vec<Product>, StoreError>;
    async fn count_products(&self, query: &ProductQuery) -> Result<i64, StoreError>;
    async fn get_product(&self, id: i64) -> Result<Option<Product>, StoreError>;
    async fn insert_product(&self, new: NewProduct) -> Result<Product, StoreError>;
    async fn update_product(&self, id: i64, changes: ProductChanges) -> Result<Product, StoreError>;
    async fn delete_product(&self, id: i64) -> Result<(), StoreError>;

    async fn find_user(&self, id: i64) -> Result<Option<User>, StoreError>;
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;
    async fn insert_user(&self, new: NewUser) -> Result<User, StoreError>;
}

/// Ids of `root` and every category below it, walking the parent relation
pub async fn category_subtree(store: &dyn CatalogStore, root: i64) -> Result<Vec<i64>, StoreError> {
    let mut ids = vec![root];
    let mut frontier = vec![root];
    while !frontier.is_empty() {
        let children = store.category_children(&frontier).await?;
        frontier = children.into_values().flatten().filter(|id| !ids.contains(id)).collect();
        ids.extend(frontier.iter().copied());
    }
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_constraint_names_to_fields() {
        assert_eq!(constraint_target("categories_name_key"), ("category", "name".to_string()));
        assert_eq!(constraint_target("products_slug_key"), ("product", "slug".to_string()));
        assert_eq!(constraint_target("products_category_id_fkey"), ("product", "category".to_string()));
        assert_eq!(constraint_target("categories_parent_id_fkey"), ("category", "parent".to_string()));
    }
}
