use std::sync::Arc;

use rust_decimal::Decimal;
use shelf_catalog::{Product, ValidationError};
use tracing::{error, info};

use crate::repository::{ProductRepository, RepositoryError};
use crate::search::ProductQuery;

/// Product lifecycle and queries over an injected repository.
///
/// Mutations collapse every storage failure into `ValidationError`; reads
/// report absence as `None` or an empty list and pass storage failures through.
#[derive(Clone)]
pub struct Catalog {
    repository: Arc<dyn ProductRepository>,
}

impl Catalog {
    pub fn new(repository: Arc<dyn ProductRepository>) -> Self {
        Self { repository }
    }

    /// Persists a new product. Any caller-supplied id is discarded.
    pub async fn create(&self, mut product: Product) -> Result<Product, ValidationError> {
        info!("Creating {}", product.name);
        product.id = None;
        product.validate()?;
        self.repository.insert(&product).await.map_err(|e| {
            error!("Error creating record {}: {}", product, e);
            ValidationError::persistence("creating", e)
        })
    }

    pub async fn update(&self, product: &Product) -> Result<Product, ValidationError> {
        let id = product.id.ok_or(ValidationError::EmptyId("Update"))?;
        info!("Updating {}", product);
        let mut product = product.clone();
        product.validate()?;
        match self.repository.update(id, &product).await {
            Ok(Some(updated)) => Ok(updated),
            Ok(None) => Err(ValidationError::persistence(
                "updating",
                format!("product {} no longer exists", id),
            )),
            Err(e) => {
                error!("Error updating record {}: {}", product, e);
                Err(ValidationError::persistence("updating", e))
            }
        }
    }

    /// Adds one like. `Ok(None)` when the product does not exist.
    pub async fn like(&self, id: i64) -> Result<Option<Product>, ValidationError> {
        info!("Liking product {}", id);
        self.repository.like(id).await.map_err(|e| {
            error!("Error liking product {}: {}", id, e);
            ValidationError::persistence("liking", e)
        })
    }

    pub async fn delete(&self, product: &Product) -> Result<(), ValidationError> {
        let id = product.id.ok_or(ValidationError::EmptyId("Delete"))?;
        info!("Deleting {}", product);
        self.repository.delete(id).await.map(|_| ()).map_err(|e| {
            error!("Error deleting record {}: {}", product, e);
            ValidationError::persistence("deleting", e)
        })
    }

    pub async fn remove_all(&self) -> Result<u64, ValidationError> {
        info!("Removing all products");
        self.repository.remove_all().await.map_err(|e| {
            error!("Error removing all products: {}", e);
            ValidationError::persistence("removing", e)
        })
    }

    pub async fn find(&self, id: i64) -> Result<Option<Product>, RepositoryError> {
        info!("Processing lookup for id {} ...", id);
        self.repository.find(id).await
    }

    pub async fn search(&self, query: &ProductQuery) -> Result<Vec<Product>, RepositoryError> {
        info!("Processing {} query ...", query);
        self.repository.search(query).await
    }

    pub async fn all(&self) -> Result<Vec<Product>, RepositoryError> {
        self.search(&ProductQuery::All).await
    }

    pub async fn find_by_sku(&self, sku: &str) -> Result<Vec<Product>, RepositoryError> {
        self.search(&ProductQuery::Sku(sku.to_string())).await
    }

    pub async fn find_by_name(&self, name: &str) -> Result<Vec<Product>, RepositoryError> {
        self.search(&ProductQuery::Name(name.to_string())).await
    }

    pub async fn find_by_price_range(
        &self,
        min: Decimal,
        max: Decimal,
    ) -> Result<Vec<Product>, RepositoryError> {
        self.search(&ProductQuery::PriceRange { min, max }).await
    }

    pub async fn find_by_min_price(&self, min: Decimal) -> Result<Vec<Product>, RepositoryError> {
        self.search(&ProductQuery::MinPrice(min)).await
    }

    pub async fn find_by_max_price(&self, max: Decimal) -> Result<Vec<Product>, RepositoryError> {
        self.search(&ProductQuery::MaxPrice(max)).await
    }
}
