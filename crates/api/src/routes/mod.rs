//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                              - Liveness
//! GET    /health/ready                        - Readiness (store ping)
//!
//! # Users
//! POST   /users/register                      - Register
//! POST   /users/login                         - Login, returns bearer token
//!
//! # Catalog
//! POST   /categories                          - Create category
//! GET    /categories                          - List categories
//! GET    /categories/{categoryId}             - Category detail
//! POST   /products                            - Create product
//! GET    /products                            - List products
//! GET    /products/{productId}                - Product detail
//!
//! # Cart (bearer auth, caller must be {userId})
//! GET    /users/{userId}/cart                 - Cart summary
//! POST   /users/{userId}/cart                 - Add item
//! PUT    /users/{userId}/cart                 - Update item quantity
//! DELETE /users/{userId}/cart                 - Remove item
//!
//! # Orders (bearer auth, caller must be {userId})
//! POST   /users/{userId}/orders               - Place order from cart
//! GET    /users/{userId}/orders               - Order history
//! GET    /users/{userId}/orders/{orderId}     - Order detail
//! ```

pub mod cart;
pub mod catalog;
pub mod health;
pub mod orders;
pub mod users;

use std::str::FromStr;

use axum::{
    Router,
    extract::{FromRequest, Request},
    middleware,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use emporium_core::{IdError, Quantity, QuantityError};

use crate::error::{AppError, Result};
use crate::middleware::request_id_middleware;
use crate::state::AppState;

/// JSON body extractor whose rejections use the standard error envelope.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// The full application router without the Sentry layers.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::ready))
        .nest("/users", user_routes())
        .nest("/categories", category_routes())
        .nest("/products", product_routes())
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request| {
            tracing::info_span!(
                "request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = tracing::field::Empty,
            )
        }))
        .with_state(state)
}

fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(users::register))
        .route("/login", post(users::login))
        .route(
            "/{user_id}/cart",
            get(cart::show)
                .post(cart::add)
                .put(cart::update)
                .delete(cart::remove),
        )
        .route("/{user_id}/orders", get(orders::index).post(orders::place))
        .route("/{user_id}/orders/{order_id}", get(orders::show))
}

fn category_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(catalog::list_categories).post(catalog::create_category))
        .route("/{category_id}", get(catalog::show_category))
}

fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(catalog::list_products).post(catalog::create_product))
        .route("/{product_id}", get(catalog::show_product))
}

// =============================================================================
// Request parsing helpers
// =============================================================================

/// Parse a path or body ID, mapping failure to `InvalidArgument`.
pub(crate) fn parse_id<T>(raw: &str) -> Result<T>
where
    T: FromStr<Err = IdError>,
{
    raw.parse()
        .map_err(|e: IdError| AppError::InvalidArgument(format!("Invalid {} id!", e.entity)))
}

/// A required ID field from a request body.
pub(crate) fn required_id<T>(raw: Option<&str>, field: &str) -> Result<T>
where
    T: FromStr<Err = IdError>,
{
    let raw = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::InvalidArgument(format!("{field} is required!")))?;
    parse_id(raw)
}

/// A required quantity field from a request body.
pub(crate) fn required_quantity(raw: Option<i64>) -> Result<Quantity> {
    let raw = raw.ok_or_else(|| AppError::InvalidArgument("Quantity is required!".to_string()))?;
    Quantity::new(raw).map_err(|e| match e {
        QuantityError::NotPositive => {
            AppError::InvalidArgument("Quantity must be at least 1!".to_string())
        }
        QuantityError::TooLarge { max } => {
            AppError::InvalidArgument(format!("Quantity cannot exceed {max}!"))
        }
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use emporium_core::{ProductId, UserId};

    use super::*;

    #[test]
    fn test_parse_id_messages() {
        let id = UserId::generate();
        assert_eq!(parse_id::<UserId>(&id.to_string()).unwrap(), id);

        let err = parse_id::<UserId>("42").unwrap_err();
        assert!(matches!(err, AppError::InvalidArgument(ref m) if m == "Invalid user id!"));
    }

    #[test]
    fn test_required_id() {
        assert!(matches!(
            required_id::<ProductId>(None, "Product id"),
            Err(AppError::InvalidArgument(ref m)) if m == "Product id is required!"
        ));
        assert!(matches!(
            required_id::<ProductId>(Some("  "), "Product id"),
            Err(AppError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_required_quantity() {
        assert_eq!(required_quantity(Some(3)).unwrap().get(), 3);
        for bad in [None, Some(0), Some(-1), Some(i64::MAX)] {
            assert!(matches!(
                required_quantity(bad),
                Err(AppError::InvalidArgument(_))
            ));
        }
    }
}
