use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderMap, Method, StatusCode, Uri},
    response::IntoResponse,
    routing::{get, put},
    Json, Router,
};
use serde_json::Value;
use shelf_catalog::{Product, ValidationError};
use shelf_core::{ProductQuery, ProductSearchParams};
use tracing::{info, warn};

use crate::{error::AppError, state::AppState};

const JSON_MEDIA_TYPE: &str = "application/json";

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/products",
            get(list_products)
                .post(create_product)
                .delete(reset_products)
                .fallback(method_not_allowed),
        )
        .route(
            "/products/{id}",
            get(get_product)
                .put(update_product)
                .delete(delete_product)
                .fallback(method_not_allowed),
        )
        .route(
            "/products/{id}/like",
            put(like_product).fallback(method_not_allowed),
        )
}

/// GET /products
///
/// At most one filter applies: sku, then name, then price range, min price,
/// max price.
async fn list_products(
    State(state): State<AppState>,
    Query(params): Query<ProductSearchParams>,
) -> Result<Json<Vec<Value>>, AppError> {
    info!("Request for product list");
    let query = ProductQuery::from_params(&params)?;
    let products = state.catalog.search(&query).await?;

    info!("Returning {} products", products.len());
    Ok(Json(products.iter().map(Product::serialize).collect()))
}

/// POST /products
async fn create_product(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    info!("Request to Create a Product...");
    check_content_type(&headers, JSON_MEDIA_TYPE)?;

    let product = Product::deserialize(&parse_json(&body)?)?;
    let product = state.catalog.create(product).await?;
    let id = product
        .id
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("created product has no id")))?;
    info!("Product with new id [{}] saved!", id);

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, format!("/products/{}", id))],
        Json(product.serialize()),
    ))
}

/// GET /products/{id}
async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    info!("Request to Retrieve a product with id [{}]", id);
    let id = product_id(&id)?;
    let product = state.catalog.find(id).await?.ok_or_else(|| not_found(id))?;
    Ok(Json(product.serialize()))
}

/// PUT /products/{id}
///
/// The id in the path wins over any id in the body; likes and creation time
/// are never taken from the request.
async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    info!("Request to Update a product with id [{}]", id);
    let id = product_id(&id)?;
    check_content_type(&headers, JSON_MEDIA_TYPE)?;

    let mut product = state.catalog.find(id).await?.ok_or_else(|| not_found(id))?;
    product.assign_fields(Product::deserialize(&parse_json(&body)?)?);
    let product = state.catalog.update(&product).await?;

    Ok(Json(product.serialize()))
}

/// PUT /products/{id}/like
async fn like_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    info!("Request to Like a product with id [{}]", id);
    let id = product_id(&id)?;
    let product = state.catalog.like(id).await?.ok_or_else(|| not_found(id))?;
    Ok(Json(product.serialize()))
}

/// DELETE /products/{id}
///
/// Deleting a product that does not exist still answers 204.
async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    info!("Request to Delete a product with id [{}]", id);
    let id = product_id(&id)?;
    if let Some(product) = state.catalog.find(id).await? {
        state.catalog.delete(&product).await?;
    }
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /products
///
/// Clears the table, but only while the service runs in testing mode.
async fn reset_products(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    if state.testing {
        let removed = state.catalog.remove_all().await?;
        info!("Removed {} products", removed);
    } else {
        warn!("Request to clear database while system not under test");
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn method_not_allowed(method: Method, uri: Uri) -> AppError {
    AppError::MethodNotAllowed(format!("Method {} is not allowed on {}", method, uri.path()))
}

fn not_found(id: impl std::fmt::Display) -> AppError {
    AppError::NotFound(format!("Product with id '{}' was not found.", id))
}

/// Ids in the path must be integers; anything else names no product.
fn product_id(raw: &str) -> Result<i64, AppError> {
    raw.parse().map_err(|_| not_found(raw))
}

/// Rejects requests whose Content-Type is not `media_type`. Parameters such as
/// `charset` are ignored.
fn check_content_type(headers: &HeaderMap, media_type: &str) -> Result<(), AppError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| AppError::UnsupportedMediaType("No Content-Type specified.".to_string()))?;

    let essence = content_type.split(';').next().unwrap_or_default().trim();
    if essence.eq_ignore_ascii_case(media_type) {
        return Ok(());
    }
    Err(AppError::UnsupportedMediaType(format!(
        "Content-Type must be {}",
        media_type
    )))
}

fn parse_json(body: &[u8]) -> Result<Value, ValidationError> {
    serde_json::from_slice(body).map_err(|e| ValidationError::BadData(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(content_type: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_str(content_type).unwrap());
        headers
    }

    #[test]
    fn test_content_type_accepts_charset() {
        assert!(check_content_type(&headers("application/json; charset=utf-8"), JSON_MEDIA_TYPE).is_ok());
        assert!(check_content_type(&headers("Application/JSON"), JSON_MEDIA_TYPE).is_ok());
    }

    #[test]
    fn test_content_type_rejects_others() {
        assert!(matches!(
            check_content_type(&headers("text/html"), JSON_MEDIA_TYPE),
            Err(AppError::UnsupportedMediaType(_))
        ));
        assert!(matches!(
            check_content_type(&HeaderMap::new(), JSON_MEDIA_TYPE),
            Err(AppError::UnsupportedMediaType(_))
        ));
    }

    #[test]
    fn test_product_id_must_be_an_integer() {
        assert_eq!(product_id("42").unwrap(), 42);
        assert!(matches!(product_id("abc"), Err(AppError::NotFound(_))));
        assert!(matches!(product_id("1.5"), Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_parse_json_bad_body() {
        let err = parse_json(b"this is not valid JSON").unwrap_err();
        assert_eq!(err.reason(), "bad_data");
    }
}
