//! Checkout: turn a cart into an order and empty the cart in one step.

use chrono::Utc;

use emporium_core::{CartId, Order};

use super::MAX_CART_ATTEMPTS;
use super::access::Owner;
use crate::db::{RepositoryError, Store};
use crate::error::{AppError, Result};

pub struct CheckoutService<'a> {
    store: &'a dyn Store,
}

impl<'a> CheckoutService<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// Place an order from `cart_id`.
    ///
    /// The order records the cart's items and totals as they were at the
    /// moment of the successful write. If another request changes the cart
    /// in between, the checkout is retried against the new contents.
    ///
    /// # Errors
    ///
    /// Checked in order: `AppError::NotFound` if the cart does not exist,
    /// `AppError::Forbidden` if it belongs to another user, and
    /// `AppError::InvalidState` if it is empty.
    #[tracing::instrument(skip(self, owner), fields(user_id = %owner.user_id()))]
    pub async fn place_order(&self, owner: &Owner, cart_id: CartId) -> Result<Order> {
        for attempt in 1..=MAX_CART_ATTEMPTS {
            let mut cart = self
                .store
                .get_cart(cart_id)
                .await?
                .ok_or_else(|| AppError::NotFound("Cart not found!".to_string()))?;

            if cart.user_id() != owner.user_id() {
                return Err(AppError::Forbidden(
                    "Unauthorized access! You are not the owner of this cart.".to_string(),
                ));
            }

            let order = cart.checkout(Utc::now())?;

            match self.store.place_order(&order, &cart).await {
                Ok(()) => {
                    tracing::info!(
                        order_id = %order.id,
                        total_price = %order.total_price,
                        total_quantity = order.total_quantity,
                        "order placed"
                    );
                    return Ok(order);
                }
                Err(RepositoryError::VersionConflict) => {
                    tracing::debug!(attempt, %cart_id, "checkout conflicted, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }

        tracing::warn!(%cart_id, attempts = MAX_CART_ATTEMPTS, "checkout kept conflicting");
        Err(AppError::Internal(format!(
            "cart {cart_id} kept changing during checkout"
        )))
    }
}
