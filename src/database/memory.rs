use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

use crate::catalog::composer::ProductQuery;
use crate::database::models::{
    Category, CategoryChanges, NewCategory, NewProduct, NewUser, Product, ProductChanges, User,
};
use crate::database::postgres::RESTRICTED_DELETE;
use crate::database::store::{CatalogStore, PageWindow, StoreError};

#[derive(Default)]
struct Tables {
    categories: BTreeMap<i64, Category>,
    products: BTreeMap<i64, Product>,
    users: BTreeMap<i64, User>,
    next_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn descendants_of(&self, root: i64) -> Vec<i64> {
        let mut ids = vec![root];
        let mut i = 0;
        while i < ids.len() {
            let current = ids[i];
            let children: Vec<i64> = self
                .categories
                .values()
                .filter(|c| c.parent_id == Some(current) && !ids.contains(&c.id))
                .map(|c| c.id)
                .collect();
            ids.extend(children);
            i += 1;
        }
        ids
    }

    fn check_category(&self, candidate: &Category) -> Result<(), StoreError> {
        for other in self.categories.values().filter(|c| c.id != candidate.id) {
            if other.name == candidate.name {
                return Err(unique("category", "name"));
            }
            if other.slug == candidate.slug {
                return Err(unique("category", "slug"));
            }
        }
        if let Some(parent_id) = candidate.parent_id {
            if !self.categories.contains_key(&parent_id) {
                return Err(StoreError::InvalidReference { field: "parent".to_string() });
            }
        }
        Ok(())
    }

    fn check_product(&self, candidate: &Product) -> Result<(), StoreError> {
        if self.products.values().any(|p| p.id != candidate.id && p.slug == candidate.slug) {
            return Err(unique("product", "slug"));
        }
        if !self.categories.contains_key(&candidate.category_id) {
            return Err(StoreError::InvalidReference { field: "category".to_string() });
        }
        Ok(())
    }
}

fn unique(entity: &'static str, field: &str) -> StoreError {
    StoreError::UniqueViolation { entity, field: field.to_string() }
}

fn slice<T>(rows: Vec<T>, window: PageWindow) -> Vec<T> {
    rows.into_iter()
        .skip(window.offset.max(0) as usize)
        .take(window.limit.max(0) as usize)
        .collect()
}

/// In-process `CatalogStore` with the same constraint semantics as the
/// PostgreSQL schema. Backs the test suite and database-less runs.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn visible_products(tables: &Tables, query: &ProductQuery) -> Vec<Product> {
        let mut products: Vec<Product> = tables.products.values().filter(|p| query.matches(p)).cloned().collect();
        products.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        products
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn list_categories(&self, window: PageWindow) -> Result<Vec<Category>, StoreError> {
        let tables = self.tables.read().await;
        let mut categories: Vec<Category> = tables.categories.values().cloned().collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(slice(categories, window))
    }

    async fn count_categories(&self) -> Result<i64, StoreError> {
        Ok(self.tables.read().await.categories.len() as i64)
    }

    async fn get_category(&self, id: i64) -> Result<Option<Category>, StoreError> {
        Ok(self.tables.read().await.categories.get(&id).cloned())
    }

    async fn category_children(&self, parent_ids: &[i64]) -> Result<HashMap<i64, Vec<i64>>, StoreError> {
        let tables = self.tables.read().await;
        let mut rows: Vec<&Category> = tables
            .categories
            .values()
            .filter(|c| c.parent_id.is_some_and(|p| parent_ids.contains(&p)))
            .collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));

        let mut children: HashMap<i64, Vec<i64>> = HashMap::new();
        for category in rows {
            if let Some(parent_id) = category.parent_id {
                children.entry(parent_id).or_default().push(category.id);
            }
        }
        Ok(children)
    }

    async fn insert_category(&self, new: NewCategory) -> Result<Category, StoreError> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        let mut category = Category {
            id: 0,
            name: new.name,
            slug: new.slug,
            description: new.description,
            parent_id: new.parent_id,
            created_at: now,
            updated_at: now,
        };
        tables.check_category(&category)?;
        category.id = tables.next_id();
        tables.categories.insert(category.id, category.clone());
        Ok(category)
    }

    async fn update_category(&self, id: i64, changes: CategoryChanges) -> Result<Category, StoreError> {
        let mut tables = self.tables.write().await;
        let mut category = tables
            .categories
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("category {}", id)))?;
        changes.apply_to(&mut category);
        tables.check_category(&category)?;
        tables.categories.insert(id, category.clone());
        Ok(category)
    }

    async fn delete_category(&self, id: i64) -> Result<u64, StoreError> {
        let mut tables = self.tables.write().await;
        if !tables.categories.contains_key(&id) {
            return Err(StoreError::NotFound(format!("category {}", id)));
        }
        let subtree = tables.descendants_of(id);
        if tables.products.values().any(|p| subtree.contains(&p.category_id)) {
            return Err(StoreError::Restricted(RESTRICTED_DELETE.to_string()));
        }
        for category_id in &subtree {
            tables.categories.remove(category_id);
        }
        Ok(subtree.len() as u64)
    }

    async fn list_products(&self, query: &ProductQuery, window: PageWindow) -> Result<Vec<Product>, StoreError> {
        let tables = self.tables.read().await;
        Ok(slice(Self::visible_products(&tables, query), window))
    }

    async fn count_products(&self, query: &ProductQuery) -> Result<i64, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.products.values().filter(|p| query.matches(p)).count() as i64)
    }

    async fn get_product(&self, id: i64) -> Result<Option<Product>, StoreError> {
        Ok(self.tables.read().await.products.get(&id).cloned())
    }

    async fn insert_product(&self, new: NewProduct) -> Result<Product, StoreError> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        let mut product = Product {
            id: 0,
            category_id: new.category_id,
            name: new.name,
            slug: new.slug,
            description: new.description,
            price: new.price,
            stock: new.stock,
            available: new.available,
            image: new.image,
            created_at: now,
            updated_at: now,
        };
        tables.check_product(&product)?;
        product.id = tables.next_id();
        tables.products.insert(product.id, product.clone());
        Ok(product)
    }

    async fn update_product(&self, id: i64, changes: ProductChanges) -> Result<Product, StoreError> {
        let mut tables = self.tables.write().await;
        let mut product = tables
            .products
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("product {}", id)))?;
        changes.apply_to(&mut product);
        product.updated_at = Utc::now();
        tables.check_product(&product)?;
        tables.products.insert(id, product.clone());
        Ok(product)
    }

    async fn delete_product(&self, id: i64) -> Result<(), StoreError> {
        self.tables
            .write()
            .await
            .products
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(format!("product {}", id)))
    }

    async fn find_user(&self, id: i64) -> Result<Option<User>, StoreError> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.username == username).cloned())
    }

    async fn insert_user(&self, new: NewUser) -> Result<User, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.username == new.username) {
            return Err(unique("user", "username"));
        }
        let user = User {
            id: tables.next_id(),
            username: new.username,
            password_hash: new.password_hash,
            is_staff: new.is_staff,
            is_active: new.is_active,
            permissions: new.permissions,
            created_at: Utc::now(),
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::store::category_subtree;
    use rust_decimal::Decimal;

    fn category(name: &str, parent_id: Option<i64>) -> NewCategory {
        NewCategory {
            name: name.to_string(),
            slug: crate::catalog::slugify(name),
            description: None,
            parent_id,
        }
    }

    fn product(category_id: i64, name: &str, available: bool) -> NewProduct {
        NewProduct {
            category_id,
            name: name.to_string(),
            slug: crate::catalog::slugify(name),
            description: None,
            price: Decimal::new(100, 2),
            stock: 1,
            available,
            image: None,
        }
    }

    #[tokio::test]
    async fn enforces_category_uniqueness() {
        let store = MemoryStore::new();
        store.insert_category(category("Books", None)).await.unwrap();
        let err = store.insert_category(category("Books", None)).await.unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation { entity: "category", ref field } if field == "name"));
    }

    #[tokio::test]
    async fn category_edits_keep_creation_timestamps() {
        let store = MemoryStore::new();
        let created = store.insert_category(category("Books", None)).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;

        let changes = CategoryChanges { description: Some(Some("Paper".to_string())), ..Default::default() };
        let updated = store.update_category(created.id, changes).await.unwrap();
        assert_eq!(updated.description.as_deref(), Some("Paper"));
        assert_eq!(updated.updated_at, created.updated_at);
    }

    #[tokio::test]
    async fn cascades_category_deletes() {
        let store = MemoryStore::new();
        let root = store.insert_category(category("Root", None)).await.unwrap();
        let child = store.insert_category(category("Child", Some(root.id))).await.unwrap();
        store.insert_category(category("Leaf", Some(child.id))).await.unwrap();

        assert_eq!(category_subtree(&store, root.id).await.unwrap().len(), 3);
        assert_eq!(store.delete_category(root.id).await.unwrap(), 3);
        assert_eq!(store.count_categories().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn restricts_deletes_with_products_below() {
        let store = MemoryStore::new();
        let root = store.insert_category(category("Root", None)).await.unwrap();
        let child = store.insert_category(category("Child", Some(root.id))).await.unwrap();
        store.insert_product(product(child.id, "Widget", true)).await.unwrap();

        assert!(matches!(store.delete_category(root.id).await, Err(StoreError::Restricted(_))));
        assert_eq!(store.count_categories().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn lists_visible_products_newest_first() {
        let store = MemoryStore::new();
        let c = store.insert_category(category("Gear", None)).await.unwrap();
        let first = store.insert_product(product(c.id, "First", true)).await.unwrap();
        store.insert_product(product(c.id, "Hidden", false)).await.unwrap();
        let third = store.insert_product(product(c.id, "Third", true)).await.unwrap();

        let query = ProductQuery::visible();
        let listed = store.list_products(&query, PageWindow::first(10)).await.unwrap();
        assert_eq!(listed.iter().map(|p| p.id).collect::<Vec<_>>(), vec![third.id, first.id]);
        assert_eq!(store.count_products(&query).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn products_need_an_existing_category() {
        let store = MemoryStore::new();
        let err = store.insert_product(product(42, "Orphan", true)).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidReference { ref field } if field == "category"));
    }
}
