use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use shelf_core::{InMemoryProductRepository, ProductRepository};
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use tracing::{info, warn};

use crate::app_config::{Config, DatabaseConfig, RetryConfig, StorageBackend};
use crate::product_repo::PgProductRepository;

#[derive(Clone)]
pub struct DbClient {
    pub pool: Pool<Postgres>,
}

impl DbClient {
    pub async fn new(connection_string: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(connection_string)
            .await?;

        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        info!("Running database migrations...");
        sqlx::migrate!("../migrations")
            .run(&self.pool)
            .await?;
        info!("Migrations completed successfully.");
        Ok(())
    }

    /// Connects and migrates, retrying the pair as a unit.
    pub async fn connect_with_retry(database: &DatabaseConfig, retry: &RetryConfig) -> Result<Self, sqlx::Error> {
        with_retry(retry, "database init", move || async move {
            let client = Self::new(&database.url, database.max_connections).await?;
            client.migrate().await?;
            Ok::<_, sqlx::Error>(client)
        })
        .await
    }
}

/// Runs `op` up to `policy.count` times, sleeping between attempts with the
/// delay multiplied by `policy.backoff` each time. Returns the last error.
pub async fn with_retry<T, E, F, Fut>(policy: &RetryConfig, what: &str, mut op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let attempts = policy.count.max(1);
    let mut delay = Duration::from_secs(policy.delay_seconds);
    let mut attempt = 1;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < attempts => {
                warn!("{} attempt {}/{} failed: {}. Retrying in {:?}", what, attempt, attempts, e, delay);
                tokio::time::sleep(delay).await;
                delay = next_delay(delay, policy.backoff);
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Grows the retry delay, saturating instead of overflowing.
fn next_delay(delay: Duration, backoff: u32) -> Duration {
    delay.checked_mul(backoff).unwrap_or(Duration::MAX)
}

/// Builds the repository selected by `database.backend`.
pub async fn open_repository(config: &Config) -> Result<Arc<dyn ProductRepository>, sqlx::Error> {
    match config.database.backend {
        StorageBackend::Memory => {
            info!("Using in-memory product storage");
            Ok(Arc::new(InMemoryProductRepository::new()))
        }
        StorageBackend::Postgres => {
            let db = DbClient::connect_with_retry(&config.database, &config.retry).await?;
            Ok(Arc::new(PgProductRepository::new(db.pool)))
        }
    }
}
