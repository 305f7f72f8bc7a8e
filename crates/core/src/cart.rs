//! The per-user cart aggregate.
//!
//! A [`Cart`] owns its line items and three running totals. The totals are
//! maintained incrementally on every mutation using the unit price supplied
//! at that moment, so `total_price` reflects the price at the time each item
//! was added or changed rather than the live catalog price.
//!
//! # Invariants
//!
//! After every operation:
//! - `total_items == items.len()`
//! - `total_quantity == sum(item.quantity)`
//! - no two line items share a product
//! - every quantity is `>= 1` (enforced by [`Quantity`])
//! - `total_price >= 0`
//!
//! Persistence is optimistic: `version` is the value read from the store and
//! every write is conditional on it. A version of `0` means the cart has never
//! been saved.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::order::Order;
use crate::types::{CartId, Price, ProductId, Quantity, UserId};

/// Errors raised by cart operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    /// No line item exists for the product.
    #[error("item not found in cart")]
    ItemNotFound(ProductId),

    /// Checkout was attempted on a cart with no items.
    #[error("cart is empty")]
    EmptyCart,

    /// Adding would push a line item past the maximum quantity.
    #[error("quantity for product exceeds the maximum of {max}")]
    QuantityOverflow {
        /// Maximum allowed quantity per line item.
        max: u32,
    },

    /// The price total would not fit a `Decimal`.
    #[error("cart total is too large")]
    PriceOverflow,

    /// Stored totals disagree with the stored items.
    #[error("inconsistent cart state: {0}")]
    Inconsistent(String),
}

/// One product/quantity pair within a cart or order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub product_id: ProductId,
    pub quantity: Quantity,
}

/// Raw persisted fields of a cart, used to rebuild the aggregate.
#[derive(Debug, Clone)]
pub struct CartParts {
    pub id: CartId,
    pub user_id: UserId,
    pub items: Vec<LineItem>,
    pub total_price: Decimal,
    pub total_items: u32,
    pub total_quantity: u64,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A user's shopping cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    id: CartId,
    user_id: UserId,
    items: Vec<LineItem>,
    total_price: Decimal,
    total_items: u32,
    total_quantity: u64,
    #[serde(skip)]
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Cart {
    /// Create an empty, unsaved cart for a user.
    #[must_use]
    pub fn new(user_id: UserId, now: DateTime<Utc>) -> Self {
        Self {
            id: CartId::generate(),
            user_id,
            items: Vec::new(),
            total_price: Decimal::ZERO,
            total_items: 0,
            total_quantity: 0,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Rebuild a cart from stored fields, checking the count invariants.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Inconsistent` if the totals disagree with the
    /// items, a product appears twice, or the price total is negative.
    pub fn from_parts(parts: CartParts) -> Result<Self, CartError> {
        let cart = Self {
            id: parts.id,
            user_id: parts.user_id,
            items: parts.items,
            total_price: parts.total_price,
            total_items: parts.total_items,
            total_quantity: parts.total_quantity,
            version: parts.version,
            created_at: parts.created_at,
            updated_at: parts.updated_at,
        };
        cart.check_invariants()?;
        Ok(cart)
    }

    #[must_use]
    pub const fn id(&self) -> CartId {
        self.id
    }

    #[must_use]
    pub const fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Line items in insertion order.
    #[must_use]
    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    #[must_use]
    pub const fn total_price(&self) -> Decimal {
        self.total_price
    }

    /// Number of distinct line items.
    #[must_use]
    pub const fn total_items(&self) -> u32 {
        self.total_items
    }

    /// Sum of all line item quantities.
    #[must_use]
    pub const fn total_quantity(&self) -> u64 {
        self.total_quantity
    }

    /// Version last read from (or written to) the store.
    #[must_use]
    pub const fn version(&self) -> i64 {
        self.version
    }

    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The line item for a product, if present.
    #[must_use]
    pub fn line(&self, product_id: ProductId) -> Option<&LineItem> {
        self.items.iter().find(|item| item.product_id == product_id)
    }

    /// Add `quantity` units of a product at `unit_price`.
    ///
    /// Increments an existing line item or appends a new one.
    ///
    /// # Errors
    ///
    /// Returns `CartError::QuantityOverflow` if the merged quantity would
    /// exceed [`Quantity::MAX`] and `CartError::PriceOverflow` if the price
    /// total would. The cart is unchanged on error.
    pub fn add_item(
        &mut self,
        product_id: ProductId,
        unit_price: Price,
        quantity: Quantity,
        now: DateTime<Utc>,
    ) -> Result<(), CartError> {
        let total_price = unit_price
            .extend(quantity)
            .and_then(|amount| self.total_price.checked_add(amount))
            .ok_or(CartError::PriceOverflow)?;

        match self.items.iter_mut().find(|i| i.product_id == product_id) {
            Some(existing) => {
                existing.quantity =
                    existing
                        .quantity
                        .checked_add(quantity)
                        .ok_or(CartError::QuantityOverflow {
                            max: Quantity::MAX,
                        })?;
            }
            None => self.items.push(LineItem {
                product_id,
                quantity,
            }),
        }

        self.total_quantity += u64::from(quantity.get());
        self.total_price = total_price;
        self.touch(now);
        Ok(())
    }

    /// Set a line item's quantity, adjusting totals by the delta.
    ///
    /// # Errors
    ///
    /// Returns `CartError::ItemNotFound` if the product is not in the cart
    /// and `CartError::PriceOverflow` if the price total would not fit.
    pub fn update_quantity(
        &mut self,
        product_id: ProductId,
        unit_price: Price,
        new_quantity: Quantity,
        now: DateTime<Utc>,
    ) -> Result<(), CartError> {
        let item = self
            .items
            .iter_mut()
            .find(|i| i.product_id == product_id)
            .ok_or(CartError::ItemNotFound(product_id))?;

        let old = item.quantity.get();
        let new = new_quantity.get();
        let delta = i64::from(new) - i64::from(old);
        let total_price = unit_price
            .extend_delta(delta)
            .and_then(|amount| self.total_price.checked_add(amount))
            .ok_or(CartError::PriceOverflow)?;
        item.quantity = new_quantity;

        self.total_quantity = self.total_quantity - u64::from(old) + u64::from(new);
        self.total_price = total_price;
        self.touch(now);
        Ok(())
    }

    /// Remove a line item entirely, returning it.
    ///
    /// # Errors
    ///
    /// Returns `CartError::ItemNotFound` if the product is not in the cart
    /// and `CartError::PriceOverflow` if the price total would not fit.
    pub fn remove_item(
        &mut self,
        product_id: ProductId,
        unit_price: Price,
        now: DateTime<Utc>,
    ) -> Result<LineItem, CartError> {
        let pos = self
            .items
            .iter()
            .position(|i| i.product_id == product_id)
            .ok_or(CartError::ItemNotFound(product_id))?;
        let total_price = self
            .items
            .get(pos)
            .and_then(|item| unit_price.extend(item.quantity))
            .and_then(|amount| self.total_price.checked_sub(amount))
            .ok_or(CartError::PriceOverflow)?;
        let removed = self.items.remove(pos);

        self.total_quantity -= u64::from(removed.quantity.get());
        self.total_price = total_price;
        self.touch(now);
        Ok(removed)
    }

    /// Snapshot this cart into a new [`Order`] and reset it to empty.
    ///
    /// The reset is in memory only; the caller persists the order and the
    /// emptied cart together.
    ///
    /// # Errors
    ///
    /// Returns `CartError::EmptyCart` if there is nothing to order. The cart
    /// is unchanged on error.
    pub fn checkout(&mut self, now: DateTime<Utc>) -> Result<Order, CartError> {
        if self.items.is_empty() {
            return Err(CartError::EmptyCart);
        }

        let order = Order::place(
            self.user_id,
            std::mem::take(&mut self.items),
            self.total_price,
            self.total_items,
            self.total_quantity,
            now,
        );
        self.clear(now);
        Ok(order)
    }

    /// Reset to no items and zero totals.
    pub fn clear(&mut self, now: DateTime<Utc>) {
        self.items.clear();
        self.total_price = Decimal::ZERO;
        self.total_items = 0;
        self.total_quantity = 0;
        self.updated_at = now;
    }

    /// Record that the store accepted a write of this cart.
    pub const fn mark_saved(&mut self) {
        self.version += 1;
    }

    /// Recompute `total_items` and keep `total_price` non-negative.
    ///
    /// The price total can only go negative when a product's price rose
    /// after it was added; an empty cart always totals zero.
    fn touch(&mut self, now: DateTime<Utc>) {
        self.total_items = u32::try_from(self.items.len()).unwrap_or(u32::MAX);
        if self.items.is_empty() || self.total_price < Decimal::ZERO {
            self.total_price = Decimal::ZERO;
        }
        self.updated_at = now;
    }

    fn check_invariants(&self) -> Result<(), CartError> {
        if usize::try_from(self.total_items).ok() != Some(self.items.len()) {
            return Err(CartError::Inconsistent(format!(
                "total_items {} but {} items",
                self.total_items,
                self.items.len()
            )));
        }

        let sum: u64 = self.items.iter().map(|i| u64::from(i.quantity.get())).sum();
        if sum != self.total_quantity {
            return Err(CartError::Inconsistent(format!(
                "total_quantity {} but items sum to {sum}",
                self.total_quantity
            )));
        }

        let mut seen = std::collections::HashSet::with_capacity(self.items.len());
        if let Some(dup) = self.items.iter().find(|i| !seen.insert(i.product_id)) {
            return Err(CartError::Inconsistent(format!(
                "duplicate product {}",
                dup.product_id
            )));
        }

        if self.total_price < Decimal::ZERO {
            return Err(CartError::Inconsistent("negative total_price".to_string()));
        }

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn price(amount: i64) -> Price {
        Price::new(Decimal::new(amount, 0)).unwrap()
    }

    fn qty(n: i64) -> Quantity {
        Quantity::new(n).unwrap()
    }

    fn empty_cart() -> Cart {
        Cart::new(UserId::generate(), Utc::now())
    }

    #[test]
    fn test_adding_same_product_merges_line() {
        let mut cart = empty_cart();
        let p = ProductId::generate();

        cart.add_item(p, price(10), qty(2), Utc::now()).unwrap();
        cart.add_item(p, price(10), qty(3), Utc::now()).unwrap();

        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.line(p).unwrap().quantity.get(), 5);
        assert_eq!(cart.total_quantity(), 5);
        assert_eq!(cart.total_items(), 1);
        assert_eq!(cart.total_price(), Decimal::new(50, 0));
    }

    #[test]
    fn test_items_keep_insertion_order() {
        let mut cart = empty_cart();
        let first = ProductId::generate();
        let second = ProductId::generate();

        cart.add_item(first, price(1), qty(1), Utc::now()).unwrap();
        cart.add_item(second, price(1), qty(1), Utc::now()).unwrap();
        cart.add_item(first, price(1), qty(1), Utc::now()).unwrap();

        let order: Vec<_> = cart.items().iter().map(|i| i.product_id).collect();
        assert_eq!(order, vec![first, second]);
    }

    #[test]
    fn test_remove_adjusts_totals() {
        let mut cart = empty_cart();
        let p1 = ProductId::generate();
        let p2 = ProductId::generate();
        cart.add_item(p1, price(10), qty(2), Utc::now()).unwrap();
        cart.add_item(p2, price(5), qty(1), Utc::now()).unwrap();
        assert_eq!(cart.total_price(), Decimal::new(25, 0));
        assert_eq!(cart.total_quantity(), 3);
        assert_eq!(cart.total_items(), 2);

        let removed = cart.remove_item(p1, price(10), Utc::now()).unwrap();

        assert_eq!(removed.quantity.get(), 2);
        assert_eq!(cart.items(), &[LineItem { product_id: p2, quantity: qty(1) }]);
        assert_eq!(cart.total_price(), Decimal::new(5, 0));
        assert_eq!(cart.total_quantity(), 1);
        assert_eq!(cart.total_items(), 1);
    }

    #[test]
    fn test_update_applies_delta() {
        let mut cart = empty_cart();
        let p1 = ProductId::generate();
        cart.add_item(p1, price(10), qty(2), Utc::now()).unwrap();

        cart.update_quantity(p1, price(10), qty(5), Utc::now()).unwrap();
        assert_eq!(cart.total_price(), Decimal::new(50, 0));
        assert_eq!(cart.total_quantity(), 5);

        cart.update_quantity(p1, price(10), qty(1), Utc::now()).unwrap();
        assert_eq!(cart.total_price(), Decimal::new(10, 0));
        assert_eq!(cart.total_quantity(), 1);
    }

    #[test]
    fn test_price_frozen_at_add_time() {
        let mut cart = empty_cart();
        let p1 = ProductId::generate();
        let p2 = ProductId::generate();
        cart.add_item(p1, price(10), qty(2), Utc::now()).unwrap();
        // p1's catalog price later becomes 12; existing units keep the old price
        cart.add_item(p2, price(1), qty(1), Utc::now()).unwrap();
        cart.add_item(p1, price(12), qty(1), Utc::now()).unwrap();

        assert_eq!(cart.total_price(), Decimal::new(33, 0));
    }

    #[test]
    fn test_missing_item_errors_leave_cart_unchanged() {
        let mut cart = empty_cart();
        cart.add_item(ProductId::generate(), price(4), qty(1), Utc::now())
            .unwrap();
        let before = cart.clone();
        let stranger = ProductId::generate();

        assert_eq!(
            cart.update_quantity(stranger, price(1), qty(2), Utc::now()),
            Err(CartError::ItemNotFound(stranger))
        );
        assert_eq!(
            cart.remove_item(stranger, price(1), Utc::now()),
            Err(CartError::ItemNotFound(stranger))
        );
        assert_eq!(cart, before);
    }

    #[test]
    fn test_overflow_rejected_without_change() {
        let mut cart = empty_cart();
        let p = ProductId::generate();
        cart.add_item(p, price(1), qty(i64::from(Quantity::MAX)), Utc::now())
            .unwrap();
        let before = cart.clone();

        let err = cart.add_item(p, price(1), qty(1), Utc::now()).unwrap_err();
        assert!(matches!(err, CartError::QuantityOverflow { .. }));
        assert_eq!(cart, before);
    }

    #[test]
    fn test_price_overflow_rejected_without_change() {
        let p = ProductId::generate();
        let parts = CartParts {
            id: CartId::generate(),
            user_id: UserId::generate(),
            items: vec![LineItem {
                product_id: p,
                quantity: qty(1),
            }],
            total_price: Decimal::MAX - Decimal::ONE,
            total_items: 1,
            total_quantity: 1,
            version: 1,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let mut cart = Cart::from_parts(parts).unwrap();
        let before = cart.clone();
        let top = Price::new(Price::MAX).unwrap();

        assert_eq!(
            cart.add_item(ProductId::generate(), top, qty(3), Utc::now()),
            Err(CartError::PriceOverflow)
        );
        assert_eq!(
            cart.update_quantity(p, top, qty(2), Utc::now()),
            Err(CartError::PriceOverflow)
        );
        assert_eq!(cart, before);
    }

    #[test]
    fn test_price_total_never_negative() {
        let mut cart = empty_cart();
        let p1 = ProductId::generate();
        let p2 = ProductId::generate();
        cart.add_item(p1, price(10), qty(1), Utc::now()).unwrap();
        cart.add_item(p2, price(1), qty(1), Utc::now()).unwrap();

        // p1 now costs 50; removing it at the live price would go below zero
        cart.remove_item(p1, price(50), Utc::now()).unwrap();
        assert_eq!(cart.total_price(), Decimal::ZERO);

        cart.remove_item(p2, price(1), Utc::now()).unwrap();
        assert!(cart.is_empty());
        assert_eq!(cart.total_price(), Decimal::ZERO);
    }

    #[test]
    fn test_checkout_snapshots_and_resets() {
        let mut cart = empty_cart();
        let p1 = ProductId::generate();
        cart.add_item(p1, price(10), qty(2), Utc::now()).unwrap();
        let now = Utc::now();

        let order = cart.checkout(now).unwrap();

        assert_eq!(order.user_id, cart.user_id());
        assert_eq!(order.items, vec![LineItem { product_id: p1, quantity: qty(2) }]);
        assert_eq!(order.total_price, Decimal::new(20, 0));
        assert_eq!(order.total_items, 1);
        assert_eq!(order.total_quantity, 2);
        assert_eq!(order.order_date, now);

        assert!(cart.is_empty());
        assert_eq!(cart.total_price(), Decimal::ZERO);
        assert_eq!(cart.total_items(), 0);
        assert_eq!(cart.total_quantity(), 0);
    }

    #[test]
    fn test_checkout_empty_cart_fails() {
        let mut cart = empty_cart();
        assert_eq!(cart.checkout(Utc::now()), Err(CartError::EmptyCart));
    }

    #[test]
    fn test_from_parts_rejects_inconsistent_totals() {
        let parts = CartParts {
            id: CartId::generate(),
            user_id: UserId::generate(),
            items: vec![LineItem {
                product_id: ProductId::generate(),
                quantity: qty(2),
            }],
            total_price: Decimal::new(2, 0),
            total_items: 1,
            total_quantity: 3,
            version: 4,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(matches!(
            Cart::from_parts(parts),
            Err(CartError::Inconsistent(_))
        ));
    }

    #[test]
    fn test_mark_saved_bumps_version() {
        let mut cart = empty_cart();
        assert_eq!(cart.version(), 0);
        cart.mark_saved();
        assert_eq!(cart.version(), 1);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Add(usize, i64, i64),
        Update(usize, i64, i64),
        Remove(usize, i64),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0..4usize, 1..100i64, 1..20i64).prop_map(|(p, c, q)| Op::Add(p, c, q)),
            (0..4usize, 1..100i64, 1..20i64).prop_map(|(p, c, q)| Op::Update(p, c, q)),
            (0..4usize, 1..100i64).prop_map(|(p, c)| Op::Remove(p, c)),
        ]
    }

    proptest! {
        #[test]
        fn prop_count_invariants_hold(ops in proptest::collection::vec(op_strategy(), 0..40)) {
            let products: Vec<ProductId> = (0..4).map(|_| ProductId::generate()).collect();
            let mut cart = empty_cart();

            for op in ops {
                let result = match op {
                    Op::Add(p, c, q) => cart.add_item(products[p], price(c), qty(q), Utc::now()),
                    Op::Update(p, c, q) => cart.update_quantity(products[p], price(c), qty(q), Utc::now()),
                    Op::Remove(p, c) => cart.remove_item(products[p], price(c), Utc::now()).map(|_| ()),
                };
                prop_assert!(matches!(result, Ok(()) | Err(CartError::ItemNotFound(_))));

                let sum: u64 = cart.items().iter().map(|i| u64::from(i.quantity.get())).sum();
                prop_assert_eq!(cart.total_items() as usize, cart.items().len());
                prop_assert_eq!(cart.total_quantity(), sum);
                prop_assert!(cart.total_price() >= Decimal::ZERO);
                prop_assert!(cart.clone().check_invariants().is_ok());
            }
        }

        #[test]
        fn prop_single_price_total_is_exact(adds in proptest::collection::vec((0..4usize, 1..20i64), 1..30)) {
            let products: Vec<ProductId> = (0..4).map(|_| ProductId::generate()).collect();
            let mut cart = empty_cart();
            for (p, q) in adds {
                cart.add_item(products[p], price(7), qty(q), Utc::now()).unwrap();
            }
            let expected = Decimal::from(cart.total_quantity()) * Decimal::new(7, 0);
            prop_assert_eq!(cart.total_price(), expected);
        }
    }
}
