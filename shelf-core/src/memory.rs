use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use shelf_catalog::Product;
use tokio::sync::RwLock;

use crate::repository::{ProductRepository, RepositoryError};
use crate::search::ProductQuery;

#[derive(Debug, thiserror::Error)]
pub enum MemoryStoreError {
    #[error("duplicate key value violates unique constraint on sku: {0}")]
    DuplicateSku(String),
}

#[derive(Default)]
struct Table {
    last_id: i64,
    rows: BTreeMap<i64, Product>,
}

impl Table {
    fn sku_taken(&self, sku: &str, except: Option<i64>) -> bool {
        self.rows
            .values()
            .any(|row| row.sku == sku && row.id != except)
    }
}

/// Product table held in process memory.
///
/// Mirrors the Postgres repository: ids come from a sequence, `sku` is unique,
/// and every write happens under one lock acquisition.
#[derive(Default)]
pub struct InMemoryProductRepository {
    table: RwLock<Table>,
}

impl InMemoryProductRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Current time, nudged forward if the clock has not moved past `previous`
fn later_than(previous: Option<DateTime<Utc>>) -> DateTime<Utc> {
    let now = Utc::now();
    match previous {
        Some(prev) if now <= prev => prev + Duration::microseconds(1),
        _ => now,
    }
}

#[async_trait]
impl ProductRepository for InMemoryProductRepository {
    async fn insert(&self, product: &Product) -> Result<Product, RepositoryError> {
        let mut table = self.table.write().await;
        if table.sku_taken(&product.sku, None) {
            return Err(MemoryStoreError::DuplicateSku(product.sku.clone()).into());
        }

        table.last_id += 1;
        let id = table.last_id;
        let now = Utc::now();
        let mut row = product.clone();
        row.id = Some(id);
        row.created_time = Some(now);
        row.updated_time = Some(now);
        table.rows.insert(id, row.clone());
        Ok(row)
    }

    async fn update(&self, id: i64, product: &Product) -> Result<Option<Product>, RepositoryError> {
        let mut table = self.table.write().await;
        // a missing row updates nothing, as with the Postgres UPDATE
        if !table.rows.contains_key(&id) {
            return Ok(None);
        }
        if table.sku_taken(&product.sku, Some(id)) {
            return Err(MemoryStoreError::DuplicateSku(product.sku.clone()).into());
        }

        let Some(row) = table.rows.get_mut(&id) else {
            return Ok(None);
        };
        row.assign_fields(product.clone());
        row.updated_time = Some(later_than(row.updated_time));
        Ok(Some(row.clone()))
    }

    async fn like(&self, id: i64) -> Result<Option<Product>, RepositoryError> {
        let mut table = self.table.write().await;
        Ok(table.rows.get_mut(&id).map(|row| {
            row.likes += 1;
            row.updated_time = Some(later_than(row.updated_time));
            row.clone()
        }))
    }

    async fn delete(&self, id: i64) -> Result<bool, RepositoryError> {
        Ok(self.table.write().await.rows.remove(&id).is_some())
    }

    async fn remove_all(&self) -> Result<u64, RepositoryError> {
        let mut table = self.table.write().await;
        let removed = table.rows.len() as u64;
        table.rows.clear();
        Ok(removed)
    }

    async fn find(&self, id: i64) -> Result<Option<Product>, RepositoryError> {
        Ok(self.table.read().await.rows.get(&id).cloned())
    }

    async fn search(&self, query: &ProductQuery) -> Result<Vec<Product>, RepositoryError> {
        let table = self.table.read().await;
        Ok(table
            .rows
            .values()
            .filter(|row| query.matches(row))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn test_ids_are_sequential() {
        let repo = InMemoryProductRepository::new();
        let a = repo.insert(&Product::new("A", "a", dec!(1))).await.unwrap();
        let b = repo.insert(&Product::new("B", "b", dec!(1))).await.unwrap();
        assert_eq!(a.id, Some(1));
        assert_eq!(b.id, Some(2));
        assert_eq!(a.created_time, a.updated_time);
    }

    #[tokio::test]
    async fn test_duplicate_sku_rejected() {
        let repo = InMemoryProductRepository::new();
        repo.insert(&Product::new("A", "a", dec!(1))).await.unwrap();
        let err = repo.insert(&Product::new("A", "other", dec!(2))).await.unwrap_err();
        assert!(err.to_string().contains("sku"));
        assert_eq!(repo.search(&ProductQuery::All).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_may_keep_own_sku() {
        let repo = InMemoryProductRepository::new();
        let stored = repo.insert(&Product::new("A", "a", dec!(1))).await.unwrap();
        let id = stored.id.unwrap();

        let changed = Product::new("A", "renamed", dec!(3));
        let updated = repo.update(id, &changed).await.unwrap().unwrap();
        assert_eq!(updated.name, "renamed");
        assert_eq!(updated.created_time, stored.created_time);
        assert!(updated.updated_time > stored.updated_time);

        assert!(repo.update(99, &changed).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_into_taken_sku_fails() {
        let repo = InMemoryProductRepository::new();
        repo.insert(&Product::new("A", "a", dec!(1))).await.unwrap();
        let b = repo.insert(&Product::new("B", "b", dec!(1))).await.unwrap();
        assert!(repo.update(b.id.unwrap(), &Product::new("A", "b", dec!(1))).await.is_err());
    }

    #[tokio::test]
    async fn test_update_missing_row_ignores_taken_sku() {
        let repo = InMemoryProductRepository::new();
        repo.insert(&Product::new("A", "a", dec!(1))).await.unwrap();
        assert!(repo.update(42, &Product::new("A", "x", dec!(1))).await.unwrap().is_none());
    }

    #[test]
    fn test_later_than_moves_forward() {
        let future = Utc::now() + Duration::seconds(60);
        assert!(later_than(Some(future)) > future);
    }
}
