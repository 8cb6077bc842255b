pub mod catalog;
pub mod memory;
pub mod repository;
pub mod search;

pub use catalog::Catalog;
pub use memory::InMemoryProductRepository;
pub use repository::{ProductRepository, RepositoryError};
pub use search::{ProductQuery, ProductSearchParams};
pub use shelf_catalog::{Product, ValidationError};
