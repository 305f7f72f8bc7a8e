//! Cart service.
//!
//! Every mutation is a read-modify-write of the whole cart, committed with a
//! compare-and-swap on the cart version and retried when another request
//! wrote first. Concurrent adds of the same product therefore never lose an
//! increment.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use emporium_core::{Cart, CartError, CartId, Product, ProductId, Quantity, UserId};

use super::MAX_CART_ATTEMPTS;
use super::access::Owner;
use super::catalog::{CatalogService, ExpandedLine};
use crate::db::{RepositoryError, Store};
use crate::error::{AppError, Result};

/// A cart with product details for display.
///
/// A user who has never added anything gets an empty summary with no `id`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartSummary {
    pub id: Option<CartId>,
    pub user_id: UserId,
    pub items: Vec<ExpandedLine>,
    pub total_price: Decimal,
    pub total_items: u32,
    pub total_quantity: u64,
}

/// What to do when the user has no cart yet.
#[derive(Debug, Clone, Copy)]
enum MissingCart {
    Create,
    Reject,
}

pub struct CartService<'a> {
    store: &'a dyn Store,
    catalog: CatalogService<'a>,
}

impl<'a> CartService<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn Store) -> Self {
        Self {
            store,
            catalog: CatalogService::new(store),
        }
    }

    /// Add `quantity` units of a product, creating the cart on first use.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the product is missing, deleted, or
    /// unavailable, and `AppError::InvalidArgument` if the merged quantity
    /// would overflow.
    #[tracing::instrument(skip(self, owner), fields(user_id = %owner.user_id()))]
    pub async fn add_item(
        &self,
        owner: &Owner,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<Cart> {
        let product = self.purchasable(product_id).await?;
        self.mutate(owner.user_id(), MissingCart::Create, |cart, now| {
            cart.add_item(product_id, product.price, quantity, now)
        })
        .await
    }

    /// Set a line item's quantity. Totals move by the difference at the
    /// product's current price.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the user has no cart, the product is
    /// not in the cart, or the product is no longer purchasable.
    #[tracing::instrument(skip(self, owner), fields(user_id = %owner.user_id()))]
    pub async fn update_quantity(
        &self,
        owner: &Owner,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<Cart> {
        self.require_line(owner.user_id(), product_id).await?;
        let product = self.purchasable(product_id).await?;
        self.mutate(owner.user_id(), MissingCart::Reject, |cart, now| {
            cart.update_quantity(product_id, product.price, quantity, now)
        })
        .await
    }

    /// Remove a product's line item. The cart itself remains, possibly empty.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the user has no cart, the product is
    /// not in the cart, or the product is no longer purchasable.
    #[tracing::instrument(skip(self, owner), fields(user_id = %owner.user_id()))]
    pub async fn remove_item(&self, owner: &Owner, product_id: ProductId) -> Result<Cart> {
        self.require_line(owner.user_id(), product_id).await?;
        let product = self.purchasable(product_id).await?;
        self.mutate(owner.user_id(), MissingCart::Reject, |cart, now| {
            cart.remove_item(product_id, product.price, now).map(|_| ())
        })
        .await
    }

    /// Fail with `NotFound` unless the owner already has a cart.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the user has no cart.
    pub async fn ensure_cart(&self, owner: &Owner) -> Result<()> {
        self.store
            .get_cart_for_user(owner.user_id())
            .await?
            .map(|_| ())
            .ok_or_else(|| AppError::NotFound("Cart not found!".to_string()))
    }

    /// The owner's cart with products expanded.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the store fails.
    pub async fn summary(&self, owner: &Owner) -> Result<CartSummary> {
        let Some(cart) = self.store.get_cart_for_user(owner.user_id()).await? else {
            return Ok(CartSummary {
                id: None,
                user_id: owner.user_id(),
                items: Vec::new(),
                total_price: Decimal::ZERO,
                total_items: 0,
                total_quantity: 0,
            });
        };

        let items = self.catalog.expand_lines(cart.items()).await?;
        Ok(CartSummary {
            id: Some(cart.id()),
            user_id: cart.user_id(),
            items,
            total_price: cart.total_price(),
            total_items: cart.total_items(),
            total_quantity: cart.total_quantity(),
        })
    }

    async fn purchasable(&self, product_id: ProductId) -> Result<Product> {
        self.catalog
            .resolve(product_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Product not found!".to_string()))
    }

    /// Fail unless the user has a cart containing `product_id`.
    async fn require_line(&self, user_id: UserId, product_id: ProductId) -> Result<()> {
        let cart = self
            .store
            .get_cart_for_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Cart not found!".to_string()))?;
        if cart.line(product_id).is_none() {
            return Err(CartError::ItemNotFound(product_id).into());
        }
        Ok(())
    }

    /// Load, apply `change`, and compare-and-swap, retrying on conflict.
    async fn mutate<F>(&self, user_id: UserId, missing: MissingCart, change: F) -> Result<Cart>
    where
        F: Fn(&mut Cart, DateTime<Utc>) -> std::result::Result<(), CartError> + Send + Sync,
    {
        for attempt in 1..=MAX_CART_ATTEMPTS {
            let mut cart = match (self.store.get_cart_for_user(user_id).await?, missing) {
                (Some(cart), _) => cart,
                (None, MissingCart::Create) => Cart::new(user_id, Utc::now()),
                (None, MissingCart::Reject) => {
                    return Err(AppError::NotFound("Cart not found!".to_string()));
                }
            };

            change(&mut cart, Utc::now())?;

            match self.store.save_cart(&cart).await {
                Ok(()) => {
                    cart.mark_saved();
                    return Ok(cart);
                }
                Err(RepositoryError::VersionConflict) => {
                    tracing::debug!(attempt, cart_id = %cart.id(), "cart write conflicted, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }

        tracing::warn!(%user_id, attempts = MAX_CART_ATTEMPTS, "cart write kept conflicting");
        Err(AppError::Internal(format!(
            "cart for user {user_id} kept changing during update"
        )))
    }
}
