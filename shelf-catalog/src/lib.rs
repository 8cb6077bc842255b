pub mod product;

pub use product::{normalize_price, parse_decimal, Product, ValidationError};
