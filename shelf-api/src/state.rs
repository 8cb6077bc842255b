use shelf_core::Catalog;

#[derive(Clone)]
pub struct AppState {
    pub catalog: Catalog,
    /// Set when the service runs under test; gates the bulk reset endpoint
    pub testing: bool,
}
