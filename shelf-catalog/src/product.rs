use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde_json::{json, Map, Value};

pub const SKU_MAX_LEN: usize = 63;
pub const NAME_MAX_LEN: usize = 63;
pub const DESCRIPTION_MAX_LEN: usize = 256;
pub const IMAGE_URL_MAX_LEN: usize = 256;

/// Fractional digits kept for a price (the column is NUMERIC(10, 2))
pub const PRICE_SCALE: u32 = 2;
/// Prices must stay below 10^8 so that 8 integer + 2 fractional digits fit
const PRICE_INTEGER_DIGITS: u32 = 8;

/// A single catalog product.
///
/// `id`, `created_time` and `updated_time` are assigned by the store; they are
/// `None` until the product has been persisted once.
#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    pub id: Option<i64>,
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub image_url: Option<String>,
    pub likes: i32,
    pub created_time: Option<DateTime<Utc>>,
    pub updated_time: Option<DateTime<Utc>>,
}

/// Product validation and persistence errors
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid product: missing {0}")]
    MissingField(&'static str),

    #[error("Invalid type for {expected} [{field}]: {found}")]
    InvalidType {
        field: &'static str,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Invalid product: body of request contained bad or no data: {0}")]
    BadData(String),

    #[error("Invalid product: {field} is longer than {max} characters")]
    FieldTooLong { field: &'static str, max: usize },

    #[error("Invalid product: price {0} does not fit NUMERIC(10,2)")]
    PriceOutOfRange(Decimal),

    #[error("{0} called with empty ID field")]
    EmptyId(&'static str),

    #[error("Error {action} record: {source}")]
    Persistence {
        action: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl ValidationError {
    /// Stable machine-readable code for the failure kind
    pub fn reason(&self) -> &'static str {
        match self {
            ValidationError::MissingField(_) => "missing_field",
            ValidationError::InvalidType { .. } => "invalid_type",
            ValidationError::BadData(_) => "bad_data",
            ValidationError::FieldTooLong { .. } => "field_too_long",
            ValidationError::PriceOutOfRange(_) => "price_out_of_range",
            ValidationError::EmptyId(_) => "empty_id",
            ValidationError::Persistence { .. } => "persistence",
        }
    }

    pub fn persistence(
        action: &'static str,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        ValidationError::Persistence {
            action,
            source: source.into(),
        }
    }
}

impl Product {
    pub fn new(sku: impl Into<String>, name: impl Into<String>, price: Decimal) -> Self {
        Self {
            id: None,
            sku: sku.into(),
            name: name.into(),
            description: None,
            price,
            image_url: None,
            likes: 0,
            created_time: None,
            updated_time: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_image_url(mut self, image_url: impl Into<String>) -> Self {
        self.image_url = Some(image_url.into());
        self
    }

    /// Checks field lengths and rounds the price to its stored precision.
    pub fn validate(&mut self) -> Result<(), ValidationError> {
        check_length(&self.sku, "sku", SKU_MAX_LEN)?;
        check_length(&self.name, "name", NAME_MAX_LEN)?;
        if let Some(description) = &self.description {
            check_length(description, "description", DESCRIPTION_MAX_LEN)?;
        }
        if let Some(image_url) = &self.image_url {
            check_length(image_url, "image_url", IMAGE_URL_MAX_LEN)?;
        }
        self.price = normalize_price(self.price)?;
        Ok(())
    }

    /// Renders the product as a JSON object. Price keeps its decimal digits as
    /// a string, timestamps are RFC 3339.
    pub fn serialize(&self) -> Value {
        json!({
            "id": self.id,
            "sku": self.sku,
            "name": self.name,
            "description": self.description,
            "price": self.price.to_string(),
            "image_url": self.image_url,
            "likes": self.likes,
            "created_time": self.created_time.map(|t| t.to_rfc3339()),
            "updated_time": self.updated_time.map(|t| t.to_rfc3339()),
        })
    }

    /// Builds an unsaved product from a JSON object.
    ///
    /// Only the user-supplied fields are read; `id`, `likes` and the
    /// timestamps in `data` are ignored.
    pub fn deserialize(data: &Value) -> Result<Self, ValidationError> {
        let map = data.as_object().ok_or_else(|| {
            ValidationError::BadData(format!("expected a JSON object, found {}", json_type(data)))
        })?;

        let sku = required_string(map, "sku", SKU_MAX_LEN)?;
        let name = required_string(map, "name", NAME_MAX_LEN)?;
        let description = optional_string(map, "description", DESCRIPTION_MAX_LEN)?;
        let image_url = optional_string(map, "image_url", IMAGE_URL_MAX_LEN)?;

        let raw_price = map.get("price").ok_or(ValidationError::MissingField("price"))?;
        let price = decimal_from_json(raw_price).ok_or(ValidationError::InvalidType {
            field: "price",
            expected: "decimal",
            found: json_type(raw_price),
        })?;

        Ok(Self {
            id: None,
            sku,
            name,
            description,
            price: normalize_price(price)?,
            image_url,
            likes: 0,
            created_time: None,
            updated_time: None,
        })
    }

    /// Copies the user-editable fields of `other` onto this product, leaving
    /// `id`, `likes` and the timestamps untouched.
    pub fn assign_fields(&mut self, other: Product) {
        self.sku = other.sku;
        self.name = other.name;
        self.description = other.description;
        self.price = other.price;
        self.image_url = other.image_url;
    }
}

impl fmt::Display for Product {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id {
            Some(id) => write!(f, "<Product {} id=[{}]>", self.name, id),
            None => write!(f, "<Product {} id=[None]>", self.name),
        }
    }
}

/// Parses decimal text, accepting plain and scientific notation.
pub fn parse_decimal(text: &str) -> Option<Decimal> {
    let text = text.trim();
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .ok()
}

/// Rounds a price to two fractional digits and checks it fits the column.
pub fn normalize_price(price: Decimal) -> Result<Decimal, ValidationError> {
    let mut rounded = price.round_dp_with_strategy(PRICE_SCALE, RoundingStrategy::MidpointAwayFromZero);
    if rounded.abs() >= Decimal::from(10_i64.pow(PRICE_INTEGER_DIGITS)) {
        return Err(ValidationError::PriceOutOfRange(price));
    }
    rounded.rescale(PRICE_SCALE);
    Ok(rounded)
}

fn decimal_from_json(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => parse_decimal(&n.to_string()),
        Value::String(s) => parse_decimal(s),
        _ => None,
    }
}

fn required_string(
    map: &Map<String, Value>,
    field: &'static str,
    max: usize,
) -> Result<String, ValidationError> {
    match map.get(field) {
        None => Err(ValidationError::MissingField(field)),
        Some(value) => string_field(value, field, max),
    }
}

fn optional_string(
    map: &Map<String, Value>,
    field: &'static str,
    max: usize,
) -> Result<Option<String>, ValidationError> {
    match map.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => string_field(value, field, max).map(Some),
    }
}

fn string_field(value: &Value, field: &'static str, max: usize) -> Result<String, ValidationError> {
    let text = value.as_str().ok_or(ValidationError::InvalidType {
        field,
        expected: "string",
        found: json_type(value),
    })?;
    check_length(text, field, max)?;
    Ok(text.to_string())
}

fn check_length(text: &str, field: &'static str, max: usize) -> Result<(), ValidationError> {
    if text.chars().count() > max {
        return Err(ValidationError::FieldTooLong { field, max });
    }
    Ok(())
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
