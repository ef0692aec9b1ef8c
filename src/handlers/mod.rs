// handlers/mod.rs - Catalog API request handlers
//
// Every handler follows the same gate order:
// authorize → validate → apply → serialize.
// A failed gate returns early without touching the store.

pub mod categories;
pub mod health;
pub mod products;
pub mod token;

use crate::error::ApiError;

/// Path ids that are not integers can never match a row
pub(crate) fn parse_id(raw: &str) -> Result<i64, ApiError> {
    raw.parse::<i64>().map_err(|_| not_found())
}

pub(crate) fn not_found() -> ApiError {
    ApiError::not_found("Not found.")
}
