//! Order history.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use emporium_core::{Order, OrderId, OrderStatus, UserId};

use super::access::Owner;
use super::catalog::{CatalogService, ExpandedLine};
use crate::db::Store;
use crate::error::{AppError, Result};

/// An order with its products expanded for display.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetail {
    pub id: OrderId,
    pub user_id: UserId,
    pub items: Vec<ExpandedLine>,
    pub total_price: Decimal,
    pub total_items: u32,
    pub total_quantity: u64,
    pub order_date: DateTime<Utc>,
    pub status: OrderStatus,
}

pub struct OrderService<'a> {
    store: &'a dyn Store,
    catalog: CatalogService<'a>,
}

impl<'a> OrderService<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn Store) -> Self {
        Self {
            store,
            catalog: CatalogService::new(store),
        }
    }

    /// The owner's non-deleted orders, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the store fails.
    pub async fn list_orders(&self, owner: &Owner) -> Result<Vec<OrderDetail>> {
        let orders = self.store.list_orders_for_user(owner.user_id()).await?;
        let mut details = Vec::with_capacity(orders.len());
        for order in orders {
            details.push(self.detail(order).await?);
        }
        Ok(details)
    }

    /// One of the owner's orders.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the order does not exist, is
    /// soft-deleted, or belongs to someone else.
    pub async fn get_order(&self, owner: &Owner, order_id: OrderId) -> Result<OrderDetail> {
        let order = self
            .store
            .get_order(order_id)
            .await?
            .filter(|o| o.is_visible() && o.user_id == owner.user_id())
            .ok_or_else(|| AppError::NotFound("Order not found!".to_string()))?;
        self.detail(order).await
    }

    async fn detail(&self, order: Order) -> Result<OrderDetail> {
        let items = self.catalog.expand_lines(&order.items).await?;
        Ok(OrderDetail {
            id: order.id,
            user_id: order.user_id,
            items,
            total_price: order.total_price,
            total_items: order.total_items,
            total_quantity: order.total_quantity,
            order_date: order.order_date,
            status: order.status,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use emporium_core::Quantity;

    use super::*;
    use crate::db::MemoryStore;
    use crate::services::access::testing;
    use crate::services::cart::CartService;
    use crate::services::checkout::CheckoutService;

    #[tokio::test]
    async fn test_history_oldest_first_with_products() {
        let store = MemoryStore::new();
        let owner = testing::owner(&store, "ada@example.com", "5550100000").await;
        let pineapple = testing::product(&store, "Pineapple", 3, true).await;
        let mango = testing::product(&store, "Mango", 2, true).await;
        let carts = CartService::new(&store);
        let checkout = CheckoutService::new(&store);

        let cart = carts
            .add_item(&owner, pineapple.id, Quantity::new(1).unwrap())
            .await
            .unwrap();
        let first = checkout.place_order(&owner, cart.id()).await.unwrap();
        carts
            .add_item(&owner, mango.id, Quantity::new(2).unwrap())
            .await
            .unwrap();
        let second = checkout.place_order(&owner, cart.id()).await.unwrap();

        let history = OrderService::new(&store).list_orders(&owner).await.unwrap();
        let ids: Vec<OrderId> = history.iter().map(|o| o.id).collect();
        assert_eq!(ids, vec![first.id, second.id]);
        assert_eq!(
            history[1].items[0].product.as_ref().unwrap().title,
            "Mango"
        );
    }

    #[tokio::test]
    async fn test_foreign_order_is_not_found() {
        let store = MemoryStore::new();
        let alice = testing::owner(&store, "alice@example.com", "5550100001").await;
        let bob = testing::owner(&store, "bob@example.com", "5550100002").await;
        let product = testing::product(&store, "Pineapple", 3, true).await;
        let cart = CartService::new(&store)
            .add_item(&alice, product.id, Quantity::new(1).unwrap())
            .await
            .unwrap();
        let order = CheckoutService::new(&store)
            .place_order(&alice, cart.id())
            .await
            .unwrap();

        let orders = OrderService::new(&store);
        assert_eq!(orders.get_order(&alice, order.id).await.unwrap().id, order.id);
        assert!(matches!(
            orders.get_order(&bob, order.id).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            orders.get_order(&alice, OrderId::generate()).await,
            Err(AppError::NotFound(_))
        ));
        assert!(orders.list_orders(&bob).await.unwrap().is_empty());
    }
}
