use axum::{
    http::{header, Method, Uri},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod error;
pub mod products;
pub mod state;

pub use state::AppState;

use error::AppError;

pub fn app(state: AppState) -> Router {
    // CORS Middleware
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::ACCEPT,
            header::CONTENT_TYPE,
            header::USER_AGENT,
        ]);

    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .merge(products::routes())
        .fallback(not_found)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn index() -> impl IntoResponse {
    Json(json!({
        "name": "Product Demo REST API Service",
        "version": env!("CARGO_PKG_VERSION"),
        "paths": "/products",
    }))
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "OK" }))
}

async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(format!("No route for {}", uri.path()))
}
