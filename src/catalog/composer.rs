use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;

use crate::database::models::Product;
use crate::database::store::{CatalogStore, PageWindow};
use crate::error::ApiError;
use crate::filter::{escape_like, FilterCondition, FilterData, FilterOp, SqlParam};
use crate::serializers::FieldErrors;

/// Default product ordering, newest first with id as tie-breaker
pub const PRODUCT_ORDER: &str = "-created_at,-id";

/// Product predicate built from request parameters.
///
/// Every active filter is ANDed together and with the baseline rule that
/// only available products are visible.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductQuery {
    pub category: Option<i64>,
    pub available: Option<bool>,
    pub price_min: Option<Decimal>,
    pub price_max: Option<Decimal>,
    pub search: Option<String>,
}

impl ProductQuery {
    /// The baseline query: available products, nothing else
    pub fn visible() -> Self {
        Self::default()
    }

    /// Parse the filter parameters; unrelated parameters are ignored and
    /// empty values count as absent.
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, FieldErrors> {
        let mut errors = FieldErrors::new();
        let mut query = Self::default();

        if let Some(raw) = param(params, "category") {
            match raw.parse::<i64>() {
                Ok(id) => query.category = Some(id),
                Err(_) => errors.add("category", "Enter a whole number."),
            }
        }

        if let Some(raw) = param(params, "available") {
            match parse_bool(raw) {
                Some(flag) => query.available = Some(flag),
                None => errors.add("available", "Enter a valid boolean (true or false)."),
            }
        }

        for (name, slot) in [("price_min", &mut query.price_min), ("price_max", &mut query.price_max)] {
            if let Some(raw) = param(params, name) {
                match Decimal::from_str(raw) {
                    Ok(bound) => *slot = Some(bound),
                    Err(_) => errors.add(name, "Enter a number."),
                }
            }
        }

        if let Some(raw) = param(params, "search") {
            query.search = Some(raw.to_string());
        }

        errors.into_result(query)
    }

    /// Parse parameters and check references against the store
    pub async fn compose(store: &dyn CatalogStore, params: &HashMap<String, String>) -> Result<Self, ApiError> {
        let query = Self::from_params(params)?;
        if let Some(category_id) = query.category {
            if store.get_category(category_id).await?.is_none() {
                return Err(ApiError::validation(
                    "category",
                    "Select a valid choice. That choice is not one of the available choices.",
                ));
            }
        }
        tracing::debug!(?query, "composed product query");
        Ok(query)
    }

    /// In-process evaluation, equivalent to the SQL produced by `conditions`
    pub fn matches(&self, product: &Product) -> bool {
        if !product.available {
            return false;
        }
        if self.category.is_some_and(|id| product.category_id != id) {
            return false;
        }
        if self.available.is_some_and(|flag| product.available != flag) {
            return false;
        }
        if self.price_min.is_some_and(|lo| product.price < lo) {
            return false;
        }
        if self.price_max.is_some_and(|hi| product.price > hi) {
            return false;
        }
        if let Some(needle) = &self.search {
            let needle = needle.to_lowercase();
            let in_name = product.name.to_lowercase().contains(&needle);
            let in_description = product
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(&needle));
            if !in_name && !in_description {
                return false;
            }
        }
        true
    }

    /// WHERE conditions for the products table
    pub fn conditions(&self) -> Vec<FilterCondition> {
        let mut conditions = vec![FilterCondition::field("available", FilterOp::Eq, SqlParam::Bool(true))];

        if let Some(id) = self.category {
            conditions.push(FilterCondition::field("category_id", FilterOp::Eq, SqlParam::Int(id)));
        }
        if let Some(flag) = self.available {
            conditions.push(FilterCondition::field("available", FilterOp::Eq, SqlParam::Bool(flag)));
        }
        if let Some(lo) = self.price_min {
            conditions.push(FilterCondition::field("price", FilterOp::Gte, SqlParam::Decimal(lo)));
        }
        if let Some(hi) = self.price_max {
            conditions.push(FilterCondition::field("price", FilterOp::Lte, SqlParam::Decimal(hi)));
        }
        if let Some(text) = &self.search {
            let pattern = format!("%{}%", escape_like(text));
            conditions.push(FilterCondition::Or(vec![
                FilterCondition::field("name", FilterOp::ILike, SqlParam::Text(pattern.clone())),
                FilterCondition::field("description", FilterOp::ILike, SqlParam::Text(pattern)),
            ]));
        }

        conditions
    }

    pub fn to_filter_data(&self, window: Option<PageWindow>) -> FilterData {
        FilterData {
            where_clause: self.conditions(),
            order: Some(PRODUCT_ORDER.to_string()),
            limit: window.map(|w| w.limit),
            offset: window.map(|w| w.offset),
            ..Default::default()
        }
    }
}

fn param<'a>(params: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    params.get(name).map(|v| v.trim()).filter(|v| !v.is_empty())
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn product(name: &str, description: Option<&str>, price: &str, available: bool) -> Product {
        let now = Utc::now();
        Product {
            id: 1,
            category_id: 7,
            name: name.to_string(),
            slug: crate::catalog::slugify(name),
            description: description.map(str::to_string),
            price: Decimal::from_str(price).unwrap(),
            stock: 1,
            available,
            image: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn no_params_is_the_baseline() {
        let query = ProductQuery::from_params(&params(&[("page", "2")])).unwrap();
        assert_eq!(query, ProductQuery::visible());
        assert_eq!(query.conditions().len(), 1);
    }

    #[test]
    fn reports_every_invalid_parameter() {
        let err = ProductQuery::from_params(&params(&[
            ("price_min", "cheap"),
            ("price_max", "1e"),
            ("available", "maybe"),
            ("category", "x"),
        ]))
        .unwrap_err();
        for field in ["price_min", "price_max", "available", "category"] {
            assert!(err.contains(field), "missing error for {field}");
        }
    }

    #[test]
    fn empty_values_are_ignored() {
        let query = ProductQuery::from_params(&params(&[("price_min", ""), ("search", "  ")])).unwrap();
        assert_eq!(query, ProductQuery::visible());
    }

    #[test]
    fn price_bounds_apply_independently() {
        let only_min = ProductQuery { price_min: Some(Decimal::new(1500, 2)), ..Default::default() };
        assert!(only_min.matches(&product("a", None, "15.00", true)));
        assert!(!only_min.matches(&product("a", None, "14.99", true)));

        let only_max = ProductQuery { price_max: Some(Decimal::new(1500, 2)), ..Default::default() };
        assert!(only_max.matches(&product("a", None, "0.00", true)));
        assert!(!only_max.matches(&product("a", None, "15.01", true)));
    }

    #[test]
    fn search_is_case_insensitive_over_name_or_description() {
        let query = ProductQuery { search: Some("PHONE".to_string()), ..Default::default() };
        assert!(query.matches(&product("Phone X", None, "1", true)));
        assert!(query.matches(&product("Case", Some("fits every smartphone"), "1", true)));
        assert!(!query.matches(&product("Case", Some("leather"), "1", true)));
    }

    #[test]
    fn unavailable_products_never_match() {
        let query = ProductQuery { available: Some(false), ..Default::default() };
        assert!(!query.matches(&product("Hidden", None, "1", false)));
        assert!(!query.matches(&product("Shown", None, "1", true)));
    }

    #[test]
    fn search_pattern_escapes_wildcards() {
        let query = ProductQuery { search: Some("100%".to_string()), ..Default::default() };
        let data = query.to_filter_data(None);
        let FilterCondition::Or(parts) = &data.where_clause[1] else { panic!("expected OR group") };
        let FilterCondition::Field(info) = &parts[0] else { panic!("expected field") };
        assert_eq!(info.data, SqlParam::Text("%100\\%%".to_string()));
    }
}
