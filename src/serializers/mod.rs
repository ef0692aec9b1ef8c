//! Explicit wire DTOs for catalog resources.
//!
//! Inbound payloads are read field by field from a JSON object so that every
//! problem in a request is collected into one `FieldErrors` map before
//! anything reaches the store.

pub mod category;
pub mod product;

use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::error::ApiError;

pub use category::{CategoryRepr, CategorySerializer};
pub use product::{ProductRepr, ProductSerializer};

pub const REQUIRED: &str = "This field is required.";
pub const NOT_NULL: &str = "This field may not be null.";
pub const NOT_BLANK: &str = "This field may not be blank.";
pub const MIN_ZERO: &str = "Ensure this value is greater than or equal to 0.";

/// Maximum length of names and slugs
pub const NAME_MAX_LEN: usize = 255;

/// Field name → message map reported with a 400
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error; the first message for a field wins
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_insert_with(|| message.into());
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_result<T>(self, value: T) -> Result<T, FieldErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

/// Create, full update (PUT) or partial update (PATCH)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    Create,
    Replace,
    Partial,
}

impl WriteMode {
    pub fn requires_all(&self) -> bool {
        !matches!(self, WriteMode::Partial)
    }
}

/// Parse a raw request body into a JSON object
pub fn parse_json_object(body: &[u8]) -> Result<Map<String, Value>, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Map::new());
    }
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(ApiError::validation("non_field_errors", "Invalid data. Expected a dictionary.")),
        Err(e) => Err(ApiError::validation("non_field_errors", format!("JSON parse error - {}", e))),
    }
}

/// Field-by-field reader over an inbound JSON object
pub struct Payload<'a> {
    map: &'a Map<String, Value>,
    mode: WriteMode,
}

impl<'a> Payload<'a> {
    pub fn new(map: &'a Map<String, Value>, mode: WriteMode) -> Self {
        Self { map, mode }
    }

    pub fn has(&self, field: &str) -> bool {
        self.map.contains_key(field)
    }

    /// Flag every key not in `writable`, silently skipping `read_only`
    pub fn reject_unknown(&self, writable: &[&str], read_only: &[&str], errors: &mut FieldErrors) {
        for key in self.map.keys() {
            if !writable.contains(&key.as_str()) && !read_only.contains(&key.as_str()) {
                errors.add(key.clone(), "Unknown field.");
            }
        }
    }

    /// Present value, or the required-field error when missing in a full write
    fn present(&self, field: &str, required: bool, errors: &mut FieldErrors) -> Option<&'a Value> {
        match self.map.get(field) {
            Some(v) => Some(v),
            None => {
                if required && self.mode.requires_all() {
                    errors.add(field, REQUIRED);
                }
                None
            }
        }
    }

    /// Required, non-blank string with a length cap
    pub fn name(&self, field: &str, errors: &mut FieldErrors) -> Option<String> {
        match self.present(field, true, errors)? {
            Value::Null => errors.add(field, NOT_NULL),
            Value::String(s) if s.trim().is_empty() => errors.add(field, NOT_BLANK),
            Value::String(s) if s.chars().count() > NAME_MAX_LEN => {
                errors.add(field, format!("Ensure this field has no more than {} characters.", NAME_MAX_LEN))
            }
            Value::String(s) => return Some(s.trim().to_string()),
            _ => errors.add(field, "Not a valid string."),
        }
        None
    }

    /// Optional nullable text. Outer `None` means "not supplied".
    pub fn optional_text(&self, field: &str, errors: &mut FieldErrors) -> Option<Option<String>> {
        match self.present(field, false, errors)? {
            Value::Null => Some(None),
            Value::String(s) => Some(Some(s.clone())),
            _ => {
                errors.add(field, "Not a valid string.");
                None
            }
        }
    }

    /// Primary-key reference. `nullable` allows an explicit null.
    pub fn reference(&self, field: &str, required: bool, nullable: bool, errors: &mut FieldErrors) -> Option<Option<i64>> {
        match self.present(field, required, errors)? {
            Value::Null if nullable => Some(None),
            Value::Null => {
                errors.add(field, NOT_NULL);
                None
            }
            value => match as_integer(value) {
                Some(id) => Some(Some(id)),
                None => {
                    errors.add(field, format!("Incorrect type. Expected pk value, received {}.", type_name(value)));
                    None
                }
            },
        }
    }

    /// Non-negative decimal with at most `max_digits` digits and `decimal_places` fractional digits
    pub fn decimal(&self, field: &str, required: bool, max_digits: u32, decimal_places: u32, errors: &mut FieldErrors) -> Option<Decimal> {
        let value = self.present(field, required, errors)?;
        let parsed = match value {
            Value::String(s) => Decimal::from_str(s.trim()).ok(),
            Value::Number(n) => Decimal::from_str(&n.to_string()).ok(),
            Value::Null => {
                errors.add(field, NOT_NULL);
                return None;
            }
            _ => None,
        };
        let Some(amount) = parsed else {
            errors.add(field, "A valid number is required.");
            return None;
        };

        let normalized = amount.normalize();
        let scale = normalized.scale();
        let integer_digits = normalized.trunc().abs().to_string().trim_start_matches('0').len() as u32;

        if amount.is_sign_negative() && !amount.is_zero() {
            errors.add(field, MIN_ZERO);
        } else if scale > decimal_places {
            errors.add(field, format!("Ensure that there are no more than {} decimal places.", decimal_places));
        } else if integer_digits + decimal_places > max_digits {
            errors.add(field, format!("Ensure that there are no more than {} digits in total.", max_digits));
        } else {
            let mut stored = amount.abs();
            stored.rescale(decimal_places);
            return Some(stored);
        }
        None
    }

    /// Non-negative 32-bit integer
    pub fn non_negative_int(&self, field: &str, required: bool, errors: &mut FieldErrors) -> Option<i32> {
        let value = self.present(field, required, errors)?;
        if value.is_null() {
            errors.add(field, NOT_NULL);
            return None;
        }
        match as_integer(value) {
            Some(n) if n < 0 => errors.add(field, MIN_ZERO),
            Some(n) => match i32::try_from(n) {
                Ok(v) => return Some(v),
                Err(_) => errors.add(field, format!("Ensure this value is less than or equal to {}.", i32::MAX)),
            },
            None => errors.add(field, "A valid integer is required."),
        }
        None
    }

    pub fn boolean(&self, field: &str, errors: &mut FieldErrors) -> Option<bool> {
        let value = self.present(field, false, errors)?;
        let parsed = match value {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => match n.as_i64() {
                Some(1) => Some(true),
                Some(0) => Some(false),
                _ => None,
            },
            Value::String(s) => match s.to_ascii_lowercase().as_str() {
                "true" | "1" => Some(true),
                "false" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        };
        if parsed.is_none() {
            errors.add(field, "Must be a valid boolean.");
        }
        parsed
    }
}

/// Integers arrive as JSON numbers or numeric strings
fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}
