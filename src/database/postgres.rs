use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashMap;
use tracing::info;

use crate::catalog::composer::ProductQuery;
use crate::database::models::{
    Category, CategoryChanges, NewCategory, NewProduct, NewUser, Product, ProductChanges, User,
};
use crate::database::repository::Repository;
use crate::database::store::{CatalogStore, PageWindow, StoreError};
use crate::filter::FilterData;

pub const RESTRICTED_DELETE: &str = "Cannot delete category because products still reference it or one of its subcategories.";

/// Idempotent schema bootstrap, one statement per entry
const SCHEMA: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS categories (
        id BIGSERIAL PRIMARY KEY,
        name VARCHAR(255) NOT NULL CONSTRAINT categories_name_key UNIQUE,
        slug VARCHAR(255) NOT NULL CONSTRAINT categories_slug_key UNIQUE,
        description TEXT,
        parent_id BIGINT CONSTRAINT categories_parent_id_fkey REFERENCES categories(id) ON DELETE CASCADE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )"#,
    "CREATE INDEX IF NOT EXISTS categories_parent_id_idx ON categories (parent_id)",
    r#"CREATE TABLE IF NOT EXISTS products (
        id BIGSERIAL PRIMARY KEY,
        category_id BIGINT NOT NULL CONSTRAINT products_category_id_fkey REFERENCES categories(id) ON DELETE RESTRICT,
        name VARCHAR(255) NOT NULL,
        slug VARCHAR(255) NOT NULL CONSTRAINT products_slug_key UNIQUE,
        description TEXT,
        price NUMERIC(10, 2) NOT NULL CONSTRAINT products_price_check CHECK (price >= 0),
        stock INTEGER NOT NULL DEFAULT 0 CONSTRAINT products_stock_check CHECK (stock >= 0),
        available BOOLEAN NOT NULL DEFAULT TRUE,
        image VARCHAR(255),
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )"#,
    "CREATE INDEX IF NOT EXISTS products_category_id_idx ON products (category_id)",
    "CREATE INDEX IF NOT EXISTS products_available_created_idx ON products (available, created_at DESC)",
    r#"CREATE TABLE IF NOT EXISTS users (
        id BIGSERIAL PRIMARY KEY,
        username VARCHAR(150) NOT NULL CONSTRAINT users_username_key UNIQUE,
        password_hash TEXT NOT NULL,
        is_staff BOOLEAN NOT NULL DEFAULT FALSE,
        is_active BOOLEAN NOT NULL DEFAULT TRUE,
        permissions TEXT[] NOT NULL DEFAULT '{}',
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )"#,
];

/// `CatalogStore` backed by PostgreSQL
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        info!("Catalog schema is up to date");
        Ok(())
    }

    fn categories(&self) -> Repository<Category> {
        Repository::new("categories", self.pool.clone())
    }

    fn products(&self) -> Repository<Product> {
        Repository::new("products", self.pool.clone())
    }

    fn users(&self) -> Repository<User> {
        Repository::new("users", self.pool.clone())
    }
}

#[async_trait]
impl CatalogStore for PgStore {
    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn list_categories(&self, window: PageWindow) -> Result<Vec<Category>, StoreError> {
        self.categories()
            .select_any(FilterData {
                order: Some("name,id".to_string()),
                limit: Some(window.limit),
                offset: Some(window.offset),
                ..Default::default()
            })
            .await
    }

    async fn count_categories(&self) -> Result<i64, StoreError> {
        self.categories().count(FilterData::default()).await
    }

    async fn get_category(&self, id: i64) -> Result<Option<Category>, StoreError> {
        self.categories().select_id(id).await
    }

    async fn category_children(&self, parent_ids: &[i64]) -> Result<HashMap<i64, Vec<i64>>, StoreError> {
        let mut children: HashMap<i64, Vec<i64>> = HashMap::new();
        if parent_ids.is_empty() {
            return Ok(children);
        }

        let rows = sqlx::query_as::<_, (i64, i64)>(
            "SELECT id, parent_id FROM categories WHERE parent_id = ANY($1) ORDER BY name, id",
        )
        .bind(parent_ids.to_vec())
        .fetch_all(&self.pool)
        .await?;

        for (id, parent_id) in rows {
            children.entry(parent_id).or_default().push(id);
        }
        Ok(children)
    }

    async fn insert_category(&self, new: NewCategory) -> Result<Category, StoreError> {
        let category = sqlx::query_as::<_, Category>(
            "INSERT INTO categories (name, slug, description, parent_id) VALUES ($1, $2, $3, $4) RETURNING *",
        )
        .bind(&new.name)
        .bind(&new.slug)
        .bind(&new.description)
        .bind(new.parent_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(category)
    }

    async fn update_category(&self, id: i64, changes: CategoryChanges) -> Result<Category, StoreError> {
        let mut tx = self.pool.begin().await?;

        let mut category = sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("category {}", id)))?;
        changes.apply_to(&mut category);

        let updated = sqlx::query_as::<_, Category>(
            "UPDATE categories SET name = $2, description = $3, parent_id = $4 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(&category.name)
        .bind(&category.description)
        .bind(category.parent_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(updated)
    }

    async fn delete_category(&self, id: i64) -> Result<u64, StoreError> {
        let mut tx = self.pool.begin().await?;

        let (removed,): (i64,) = sqlx::query_as(
            r#"WITH RECURSIVE subtree AS (
                SELECT id FROM categories WHERE id = $1
                UNION
                SELECT c.id FROM categories c JOIN subtree s ON c.parent_id = s.id
            )
            SELECT COUNT(*) FROM subtree"#,
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        if removed == 0 {
            return Err(StoreError::NotFound(format!("category {}", id)));
        }

        sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| match StoreError::from(e) {
                StoreError::InvalidReference { .. } => StoreError::Restricted(RESTRICTED_DELETE.to_string()),
                other => other,
            })?;

        tx.commit().await?;
        Ok(removed as u64)
    }

    async fn list_products(&self, query: &ProductQuery, window: PageWindow) -> Result<Vec<Product>, StoreError> {
        self.products().select_any(query.to_filter_data(Some(window))).await
    }

    async fn count_products(&self, query: &ProductQuery) -> Result<i64, StoreError> {
        self.products().count(query.to_filter_data(None)).await
    }

    async fn get_product(&self, id: i64) -> Result<Option<Product>, StoreError> {
        self.products().select_id(id).await
    }

    async fn insert_product(&self, new: NewProduct) -> Result<Product, StoreError> {
        let product = sqlx::query_as::<_, Product>(
            r#"INSERT INTO products (category_id, name, slug, description, price, stock, available, image)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING *"#,
        )
        .bind(new.category_id)
        .bind(&new.name)
        .bind(&new.slug)
        .bind(&new.description)
        .bind(new.price)
        .bind(new.stock)
        .bind(new.available)
        .bind(&new.image)
        .fetch_one(&self.pool)
        .await?;
        Ok(product)
    }

    async fn update_product(&self, id: i64, changes: ProductChanges) -> Result<Product, StoreError> {
        let mut tx = self.pool.begin().await?;

        let mut product = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("product {}", id)))?;
        changes.apply_to(&mut product);

        let updated = sqlx::query_as::<_, Product>(
            r#"UPDATE products
            SET category_id = $2, name = $3, description = $4, price = $5, stock = $6,
                available = $7, image = $8, updated_at = now()
            WHERE id = $1 RETURNING *"#,
        )
        .bind(id)
        .bind(product.category_id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price)
        .bind(product.stock)
        .bind(product.available)
        .bind(&product.image)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(updated)
    }

    async fn delete_product(&self, id: i64) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("product {}", id)));
        }
        Ok(())
    }

    async fn find_user(&self, id: i64) -> Result<Option<User>, StoreError> {
        self.users().select_id(id).await
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn insert_user(&self, new: NewUser) -> Result<User, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"INSERT INTO users (username, password_hash, is_staff, is_active, permissions)
            VALUES ($1, $2, $3, $4, $5) RETURNING *"#,
        )
        .bind(&new.username)
        .bind(&new.password_hash)
        .bind(new.is_staff)
        .bind(new.is_active)
        .bind(&new.permissions)
        .fetch_one(&self.pool)
        .await?;
        Ok(user)
    }
}
