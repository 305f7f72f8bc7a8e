//! Category and product endpoints.

use axum::extract::{Path, State};
use tracing::instrument;

use emporium_core::{Category, CategoryId, ProductId};

use crate::error::Result;
use crate::response::ApiResponse;
use crate::routes::{ApiJson, parse_id};
use crate::services::catalog::{CatalogService, CategoryForm, ProductDetail, ProductForm};
use crate::state::AppState;

/// `POST /categories`
#[instrument(skip_all)]
pub async fn create_category(
    State(state): State<AppState>,
    ApiJson(form): ApiJson<CategoryForm>,
) -> Result<ApiResponse<Category>> {
    let category = CatalogService::new(state.store())
        .create_category(form)
        .await?;
    Ok(ApiResponse::created("Category created successfully!", category))
}

/// `GET /categories`
pub async fn list_categories(State(state): State<AppState>) -> Result<ApiResponse<Vec<Category>>> {
    let categories = CatalogService::new(state.store()).list_categories().await?;
    Ok(ApiResponse::ok("Categories fetched successfully!", categories))
}

/// `GET /categories/{category_id}`
#[instrument(skip(state))]
pub async fn show_category(
    State(state): State<AppState>,
    Path(category_id): Path<String>,
) -> Result<ApiResponse<Category>> {
    let id: CategoryId = parse_id(&category_id)?;
    let category = CatalogService::new(state.store()).get_category(id).await?;
    Ok(ApiResponse::ok("Category fetched successfully!", category))
}

/// `POST /products`
#[instrument(skip_all)]
pub async fn create_product(
    State(state): State<AppState>,
    ApiJson(form): ApiJson<ProductForm>,
) -> Result<ApiResponse<ProductDetail>> {
    let product = CatalogService::new(state.store())
        .create_product(form)
        .await?;
    Ok(ApiResponse::created("Product created successfully!", product))
}

/// `GET /products`
pub async fn list_products(
    State(state): State<AppState>,
) -> Result<ApiResponse<Vec<ProductDetail>>> {
    let products = CatalogService::new(state.store()).list_products().await?;
    Ok(ApiResponse::ok("Products fetched successfully!", products))
}

/// `GET /products/{product_id}`
#[instrument(skip(state))]
pub async fn show_product(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
) -> Result<ApiResponse<ProductDetail>> {
    let id: ProductId = parse_id(&product_id)?;
    let product = CatalogService::new(state.store()).get_product(id).await?;
    Ok(ApiResponse::ok("Product fetched successfully!", product))
}
