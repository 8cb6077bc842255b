use std::fmt;

use rust_decimal::Decimal;
use serde::Deserialize;
use shelf_catalog::{parse_decimal, Product, ValidationError};

/// Filters accepted on the product listing query string
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ProductSearchParams {
    pub sku: Option<String>,
    pub name: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
}

/// A single read predicate over the product table.
///
/// Filters never combine: a listing applies exactly one of these.
#[derive(Debug, Clone, PartialEq)]
pub enum ProductQuery {
    All,
    Sku(String),
    Name(String),
    /// Inclusive on both ends
    PriceRange { min: Decimal, max: Decimal },
    MinPrice(Decimal),
    MaxPrice(Decimal),
}

impl ProductQuery {
    /// Picks the filter by precedence: sku, name, price range, min price,
    /// max price, then everything. Empty values count as absent.
    pub fn from_params(params: &ProductSearchParams) -> Result<Self, ValidationError> {
        if let Some(sku) = non_empty(&params.sku) {
            return Ok(ProductQuery::Sku(sku.to_string()));
        }
        if let Some(name) = non_empty(&params.name) {
            return Ok(ProductQuery::Name(name.to_string()));
        }

        let min = non_empty(&params.min_price);
        let max = non_empty(&params.max_price);
        let query = match (min, max) {
            (Some(min), Some(max)) => ProductQuery::PriceRange {
                min: price_bound("min_price", min)?,
                max: price_bound("max_price", max)?,
            },
            (Some(min), None) => ProductQuery::MinPrice(price_bound("min_price", min)?),
            (None, Some(max)) => ProductQuery::MaxPrice(price_bound("max_price", max)?),
            (None, None) => ProductQuery::All,
        };
        Ok(query)
    }

    pub fn matches(&self, product: &Product) -> bool {
        match self {
            ProductQuery::All => true,
            ProductQuery::Sku(sku) => &product.sku == sku,
            ProductQuery::Name(name) => &product.name == name,
            ProductQuery::PriceRange { min, max } => *min <= product.price && product.price <= *max,
            ProductQuery::MinPrice(min) => product.price >= *min,
            ProductQuery::MaxPrice(max) => product.price <= *max,
        }
    }
}

impl fmt::Display for ProductQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProductQuery::All => write!(f, "all"),
            ProductQuery::Sku(sku) => write!(f, "sku {}", sku),
            ProductQuery::Name(name) => write!(f, "name {}", name),
            ProductQuery::PriceRange { min, max } => write!(f, "price range {} - {}", min, max),
            ProductQuery::MinPrice(min) => write!(f, "min price {}", min),
            ProductQuery::MaxPrice(max) => write!(f, "max price {}", max),
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn price_bound(field: &'static str, text: &str) -> Result<Decimal, ValidationError> {
    parse_decimal(text).ok_or(ValidationError::InvalidType {
        field,
        expected: "decimal",
        found: "string",
    })
}
