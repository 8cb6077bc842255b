pub mod app_config;
pub mod database;
pub mod product_repo;

pub use app_config::{Config, StorageBackend};
pub use database::{open_repository, DbClient};
pub use product_repo::PgProductRepository;
