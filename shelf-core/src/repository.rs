use async_trait::async_trait;
use shelf_catalog::Product;

use crate::search::ProductQuery;

pub type RepositoryError = Box<dyn std::error::Error + Send + Sync>;

/// Repository trait for product storage.
///
/// Every mutating call runs in its own transaction and either commits fully
/// or rolls back before returning the error.
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Inserts a new row, returning it with `id` and both timestamps set.
    /// A duplicate `sku` is an error.
    async fn insert(&self, product: &Product) -> Result<Product, RepositoryError>;

    /// Overwrites the editable fields of an existing row and refreshes
    /// `updated_time`. `Ok(None)` when no row has the product's id.
    async fn update(&self, id: i64, product: &Product) -> Result<Option<Product>, RepositoryError>;

    /// Adds one like and refreshes `updated_time`.
    async fn like(&self, id: i64) -> Result<Option<Product>, RepositoryError>;

    /// Returns whether a row was removed.
    async fn delete(&self, id: i64) -> Result<bool, RepositoryError>;

    async fn remove_all(&self) -> Result<u64, RepositoryError>;

    async fn find(&self, id: i64) -> Result<Option<Product>, RepositoryError>;

    /// Rows matching `query`, ordered by id.
    async fn search(&self, query: &ProductQuery) -> Result<Vec<Product>, RepositoryError>;
}
