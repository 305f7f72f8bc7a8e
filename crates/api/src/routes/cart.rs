//! Cart endpoints, scoped to `/users/{user_id}/cart`.
//!
//! Every handler authorizes the caller against the path user before it looks
//! at the request body, so an unknown user is 404 and a foreign user is 403
//! regardless of what was posted.

use axum::extract::{Path, State};
use serde::Deserialize;
use tracing::instrument;

use emporium_core::{Cart, ProductId, UserId};

use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::response::ApiResponse;
use crate::routes::{ApiJson, parse_id, required_id, required_quantity};
use crate::services::access;
use crate::services::cart::{CartService, CartSummary};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemBody {
    pub product_id: Option<String>,
    pub quantity: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveItemBody {
    pub product_id: Option<String>,
}

/// `GET /users/{user_id}/cart`
#[instrument(skip(state, caller))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    Path(user_id): Path<String>,
) -> Result<ApiResponse<CartSummary>> {
    let user_id: UserId = parse_id(&user_id)?;
    let owner = access::authorize(state.store(), &caller, user_id).await?;

    let summary = CartService::new(state.store()).summary(&owner).await?;
    Ok(ApiResponse::ok("Cart fetched successfully!", summary))
}

/// `POST /users/{user_id}/cart`
#[instrument(skip(state, caller, body))]
pub async fn add(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    Path(user_id): Path<String>,
    ApiJson(body): ApiJson<CartItemBody>,
) -> Result<ApiResponse<Cart>> {
    let user_id: UserId = parse_id(&user_id)?;
    let owner = access::authorize(state.store(), &caller, user_id).await?;
    let product_id: ProductId = required_id(body.product_id.as_deref(), "Product id")?;
    let quantity = required_quantity(body.quantity)?;

    let cart = CartService::new(state.store())
        .add_item(&owner, product_id, quantity)
        .await?;
    Ok(ApiResponse::created("Item added to cart successfully!", cart))
}

/// `PUT /users/{user_id}/cart`
///
/// A missing cart is reported before a bad quantity.
#[instrument(skip(state, caller, body))]
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    Path(user_id): Path<String>,
    ApiJson(body): ApiJson<CartItemBody>,
) -> Result<ApiResponse<Cart>> {
    let user_id: UserId = parse_id(&user_id)?;
    let owner = access::authorize(state.store(), &caller, user_id).await?;
    let product_id: ProductId = required_id(body.product_id.as_deref(), "Product id")?;
    let carts = CartService::new(state.store());
    carts.ensure_cart(&owner).await?;
    let quantity = required_quantity(body.quantity)?;

    let cart = carts.update_quantity(&owner, product_id, quantity).await?;
    Ok(ApiResponse::ok("Cart updated successfully!", cart))
}

/// `DELETE /users/{user_id}/cart`
#[instrument(skip(state, caller, body))]
pub async fn remove(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    Path(user_id): Path<String>,
    ApiJson(body): ApiJson<RemoveItemBody>,
) -> Result<ApiResponse<Cart>> {
    let user_id: UserId = parse_id(&user_id)?;
    let owner = access::authorize(state.store(), &caller, user_id).await?;
    let product_id: ProductId = required_id(body.product_id.as_deref(), "Product id")?;

    let cart = CartService::new(state.store())
        .remove_item(&owner, product_id)
        .await?;
    Ok(ApiResponse::ok("Item removed from cart successfully!", cart))
}
