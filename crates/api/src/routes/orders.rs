//! Order endpoints, scoped to `/users/{user_id}/orders`.

use axum::extract::{Path, State};
use serde::Deserialize;
use tracing::instrument;

use emporium_core::{CartId, Order, OrderId, UserId};

use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::response::ApiResponse;
use crate::routes::{ApiJson, parse_id, required_id};
use crate::services::access;
use crate::services::checkout::CheckoutService;
use crate::services::orders::{OrderDetail, OrderService};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderBody {
    pub cart_id: Option<String>,
}

/// `POST /users/{user_id}/orders`
#[instrument(skip(state, caller, body))]
pub async fn place(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    Path(user_id): Path<String>,
    ApiJson(body): ApiJson<PlaceOrderBody>,
) -> Result<ApiResponse<Order>> {
    let user_id: UserId = parse_id(&user_id)?;
    let owner = access::authorize(state.store(), &caller, user_id).await?;
    let cart_id: CartId = required_id(body.cart_id.as_deref(), "Cart id")?;

    let order = CheckoutService::new(state.store())
        .place_order(&owner, cart_id)
        .await?;
    Ok(ApiResponse::created("Order placed successfully!", order))
}

/// `GET /users/{user_id}/orders`
#[instrument(skip(state, caller))]
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    Path(user_id): Path<String>,
) -> Result<ApiResponse<Vec<OrderDetail>>> {
    let user_id: UserId = parse_id(&user_id)?;
    let owner = access::authorize(state.store(), &caller, user_id).await?;

    let orders = OrderService::new(state.store()).list_orders(&owner).await?;
    Ok(ApiResponse::ok("Orders fetched successfully!", orders))
}

/// `GET /users/{user_id}/orders/{order_id}`
#[instrument(skip(state, caller))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(caller): RequireAuth,
    Path((user_id, order_id)): Path<(String, String)>,
) -> Result<ApiResponse<OrderDetail>> {
    let user_id: UserId = parse_id(&user_id)?;
    let owner = access::authorize(state.store(), &caller, user_id).await?;
    let order_id: OrderId = parse_id(&order_id)?;

    let order = OrderService::new(state.store())
        .get_order(&owner, order_id)
        .await?;
    Ok(ApiResponse::ok("Order fetched successfully!", order))
}
