use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use shelf_catalog::Product;
use shelf_core::{ProductQuery, ProductRepository, RepositoryError};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::warn;

pub struct PgProductRepository {
    pool: PgPool,
}

impl PgProductRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Internal struct for type-safe querying
#[derive(sqlx::FromRow)]
struct ProductRow {
    id: i64,
    sku: String,
    name: String,
    description: Option<String>,
    price: Decimal,
    image_url: Option<String>,
    likes: i32,
    created_time: DateTime<Utc>,
    updated_time: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: Some(row.id),
            sku: row.sku,
            name: row.name,
            description: row.description,
            price: row.price,
            image_url: row.image_url,
            likes: row.likes,
            created_time: Some(row.created_time),
            updated_time: Some(row.updated_time),
        }
    }
}

/// Commits on success, rolls back on failure and hands back the original error.
async fn finish<T>(
    tx: Transaction<'_, Postgres>,
    result: Result<T, sqlx::Error>,
) -> Result<T, RepositoryError> {
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback) = tx.rollback().await {
                warn!("Rollback failed: {}", rollback);
            }
            Err(e.into())
        }
    }
}

#[async_trait]
impl ProductRepository for PgProductRepository {
    async fn insert(&self, product: &Product) -> Result<Product, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query_as::<_, ProductRow>(
            r#"
            INSERT INTO products (sku, name, description, price, image_url, likes)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, sku, name, description, price, image_url, likes, created_time, updated_time
            "#,
        )
        .bind(&product.sku)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price)
        .bind(&product.image_url)
        .bind(product.likes)
        .fetch_one(&mut *tx)
        .await;

        finish(tx, result).await.map(Product::from)
    }

    async fn update(&self, id: i64, product: &Product) -> Result<Option<Product>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        // updated_time must move forward even if two writes land in the same microsecond
        let result = sqlx::query_as::<_, ProductRow>(
            r#"
            UPDATE products
            SET sku = $1, name = $2, description = $3, price = $4, image_url = $5,
                updated_time = GREATEST(clock_timestamp(), updated_time + INTERVAL '1 microsecond')
            WHERE id = $6
            RETURNING id, sku, name, description, price, image_url, likes, created_time, updated_time
            "#,
        )
        .bind(&product.sku)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price)
        .bind(&product.image_url)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await;

        finish(tx, result).await.map(|row| row.map(Product::from))
    }

    async fn like(&self, id: i64) -> Result<Option<Product>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query_as::<_, ProductRow>(
            r#"
            UPDATE products
            SET likes = likes + 1,
                updated_time = GREATEST(clock_timestamp(), updated_time + INTERVAL '1 microsecond')
            WHERE id = $1
            RETURNING id, sku, name, description, price, image_url, likes, created_time, updated_time
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await;

        finish(tx, result).await.map(|row| row.map(Product::from))
    }

    async fn delete(&self, id: i64) -> Result<bool, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await;

        finish(tx, result).await.map(|done| done.rows_affected() > 0)
    }

    async fn remove_all(&self) -> Result<u64, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query("DELETE FROM products").execute(&mut *tx).await;
        finish(tx, result).await.map(|done| done.rows_affected())
    }

    async fn find(&self, id: i64) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(
            "SELECT id, sku, name, description, price, image_url, likes, created_time, updated_time FROM products WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Product::from))
    }

    async fn search(&self, query: &ProductQuery) -> Result<Vec<Product>, RepositoryError> {
        const SELECT: &str =
            "SELECT id, sku, name, description, price, image_url, likes, created_time, updated_time FROM products";

        let rows: Vec<ProductRow> = match query {
            ProductQuery::All => {
                sqlx::query_as(&format!("{SELECT} ORDER BY id"))
                    .fetch_all(&self.pool)
                    .await?
            }
            ProductQuery::Sku(sku) => {
                sqlx::query_as(&format!("{SELECT} WHERE sku = $1 ORDER BY id"))
                    .bind(sku)
                    .fetch_all(&self.pool)
                    .await?
            }
            ProductQuery::Name(name) => {
                sqlx::query_as(&format!("{SELECT} WHERE name = $1 ORDER BY id"))
                    .bind(name)
                    .fetch_all(&self.pool)
                    .await?
            }
            ProductQuery::PriceRange { min, max } => {
                sqlx::query_as(&format!("{SELECT} WHERE price >= $1 AND price <= $2 ORDER BY id"))
                    .bind(min)
                    .bind(max)
                    .fetch_all(&self.pool)
                    .await?
            }
            ProductQuery::MinPrice(min) => {
                sqlx::query_as(&format!("{SELECT} WHERE price >= $1 ORDER BY id"))
                    .bind(min)
                    .fetch_all(&self.pool)
                    .await?
            }
            ProductQuery::MaxPrice(max) => {
                sqlx::query_as(&format!("{SELECT} WHERE price <= $1 ORDER BY id"))
                    .bind(max)
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        Ok(rows.into_iter().map(Product::from).collect())
    }
}
