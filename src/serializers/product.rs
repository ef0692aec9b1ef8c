use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;

use super::{CategoryRepr, CategorySerializer, FieldErrors, Payload, WriteMode};
use crate::catalog::media::{media_url, product_image_path};
use crate::catalog::slugify;
use crate::database::models::{NewProduct, Product, ProductChanges};
use crate::database::store::{CatalogStore, StoreError};
use crate::error::ApiError;

const WRITABLE: &[&str] = &["category_id", "name", "description", "price", "stock", "available", "image"];
const READ_ONLY: &[&str] = &["id", "created_at", "updated_at"];
const REJECTED: &[&str] = &["category", "slug"];

const PRICE_MAX_DIGITS: u32 = 10;
const PRICE_DECIMAL_PLACES: u32 = 2;

/// Wire representation of a product with its category embedded
#[derive(Debug, Clone, Serialize)]
pub struct ProductRepr {
    pub id: i64,
    pub category: CategoryRepr,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub stock: i32,
    pub available: bool,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub struct ProductSerializer;

impl ProductSerializer {
    pub async fn represent(store: &dyn CatalogStore, product: &Product, media_prefix: &str) -> Result<ProductRepr, StoreError> {
        let mut reprs = Self::represent_many(store, std::slice::from_ref(product), media_prefix).await?;
        reprs.pop().ok_or_else(|| StoreError::NotFound(format!("product {}", product.id)))
    }

    /// Represent a batch; each distinct category is loaded once
    pub async fn represent_many(
        store: &dyn CatalogStore,
        products: &[Product],
        media_prefix: &str,
    ) -> Result<Vec<ProductRepr>, StoreError> {
        let mut category_ids: Vec<i64> = products.iter().map(|p| p.category_id).collect();
        category_ids.sort_unstable();
        category_ids.dedup();

        let mut categories = Vec::with_capacity(category_ids.len());
        for id in category_ids {
            let category = store
                .get_category(id)
                .await?
                .ok_or_else(|| StoreError::NotFound(format!("category {}", id)))?;
            categories.push(category);
        }
        let embedded: HashMap<i64, CategoryRepr> = CategorySerializer::represent_many(store, &categories)
            .await?
            .into_iter()
            .map(|repr| (repr.id, repr))
            .collect();

        products
            .iter()
            .map(|p| -> Result<ProductRepr, StoreError> {
                let category = embedded
                    .get(&p.category_id)
                    .cloned()
                    .ok_or_else(|| StoreError::NotFound(format!("category {}", p.category_id)))?;
                Ok(ProductRepr {
                    id: p.id,
                    category,
                    name: p.name.clone(),
                    slug: p.slug.clone(),
                    description: p.description.clone(),
                    price: p.price,
                    stock: p.stock,
                    available: p.available,
                    image: p.image.as_deref().map(|path| media_url(media_prefix, path)),
                    created_at: p.created_at,
                    updated_at: p.updated_at,
                })
            })
            .collect()
    }

    pub async fn validate_create(
        store: &dyn CatalogStore,
        data: &Map<String, Value>,
        now: DateTime<Utc>,
    ) -> Result<NewProduct, ApiError> {
        let payload = Payload::new(data, WriteMode::Create);
        let mut errors = FieldErrors::new();
        let fields = read_fields(store, &payload, now, &mut errors).await?;

        let slug = fields.name.as_deref().map(slugify).unwrap_or_default();
        if fields.name.is_some() && slug.is_empty() {
            errors.add("name", "Name must contain at least one letter or digit.");
        }

        let fields = errors.into_result(fields)?;
        Ok(NewProduct {
            category_id: fields.category_id.unwrap_or_default(),
            name: fields.name.unwrap_or_default(),
            slug,
            description: fields.description.flatten(),
            price: fields.price.unwrap_or_default(),
            stock: fields.stock.unwrap_or(0),
            available: fields.available.unwrap_or(true),
            image: fields.image.flatten(),
        })
    }

    pub async fn validate_update(
        store: &dyn CatalogStore,
        data: &Map<String, Value>,
        mode: WriteMode,
        now: DateTime<Utc>,
    ) -> Result<ProductChanges, ApiError> {
        let payload = Payload::new(data, mode);
        let mut errors = FieldErrors::new();
        let fields = read_fields(store, &payload, now, &mut errors).await?;

        let fields = errors.into_result(fields)?;
        Ok(ProductChanges {
            category_id: fields.category_id,
            name: fields.name,
            description: fields.description,
            price: fields.price,
            stock: fields.stock,
            available: fields.available,
            image: fields.image,
        })
    }
}

/// Writable fields as supplied; `None` means absent or invalid
struct ProductFields {
    category_id: Option<i64>,
    name: Option<String>,
    description: Option<Option<String>>,
    price: Option<Decimal>,
    stock: Option<i32>,
    available: Option<bool>,
    image: Option<Option<String>>,
}

async fn read_fields(
    store: &dyn CatalogStore,
    payload: &Payload<'_>,
    now: DateTime<Utc>,
    errors: &mut FieldErrors,
) -> Result<ProductFields, StoreError> {
    for field in REJECTED {
        if payload.has(field) {
            errors.add(*field, "This field is read-only.");
        }
    }
    let mut allowed: Vec<&str> = READ_ONLY.to_vec();
    allowed.extend_from_slice(REJECTED);
    payload.reject_unknown(WRITABLE, &allowed, errors);

    let category_id = payload.reference("category_id", true, false, errors).flatten();
    if let Some(id) = category_id {
        if store.get_category(id).await?.is_none() {
            errors.add("category_id", format!("Invalid pk \"{}\" - object does not exist.", id));
        }
    }

    let image = payload.optional_text("image", errors).map(|reference| match reference {
        Some(r) if !r.trim().is_empty() => match product_image_path(&r, now) {
            Ok(path) => Some(path),
            Err(message) => {
                errors.add("image", message);
                None
            }
        },
        _ => None,
    });

    Ok(ProductFields {
        category_id,
        name: payload.name("name", errors),
        description: payload.optional_text("description", errors),
        price: payload.decimal("price", true, PRICE_MAX_DIGITS, PRICE_DECIMAL_PLACES, errors),
        stock: payload.non_negative_int("stock", false, errors),
        available: payload.boolean("available", errors),
        image,
    })
}
