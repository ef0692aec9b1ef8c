use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Product {
    pub id: i64,
    pub category_id: i64,
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

#[derive(Debug, Clone)]
pub struct NewProduct {
    pub category_id: i64,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub stock: i32,
    pub available: bool,
    pub image: Option<String>,
}

/// Column changes for an update. `None` leaves the column untouched;
/// `updated_at` is always refreshed by the store.
#[derive(Debug, Clone, Default)]
pub struct ProductChanges {
    pub category_id: Option<i64>,
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub price: Option<Decimal>,
    pub stock: Option<i32>,
    pub available: Option<bool>,
    pub image: Option<Option<String>>,
}

impl ProductChanges {
    pub fn apply_to(&self, product: &mut Product) {
        if let Some(category_id) = self.category_id {
            product.category_id = category_id;
        }
        if let Some(name) = &self.name {
            product.name = name.clone();
        }
        if let Some(description) = &self.description {
            product.description = description.clone();
        }
        if let Some(price) = self.price {
            product.price = price;
        }
        if let Some(stock) = self.stock {
            product.stock = stock;
        }
        if let Some(available) = self.available {
            product.available = available;
        }
        if let Some(image) = &self.image {
            product.image = image.clone();
        }
    }
}
