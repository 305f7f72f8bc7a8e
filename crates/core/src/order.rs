//! Immutable order snapshots.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::cart::LineItem;
use crate::types::{OrderId, OrderStatus, UserId};

/// An order placed from a cart.
///
/// Items and totals are copied from the cart at checkout and never change
/// afterwards. Only `status` and the soft-delete fields may be updated, and
/// no flow in this service does so.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub items: Vec<LineItem>,
    pub total_price: Decimal,
    pub total_items: u32,
    pub total_quantity: u64,
    pub order_date: DateTime<Utc>,
    pub status: OrderStatus,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Build a freshly placed order. Use [`crate::Cart::checkout`] rather
    /// than calling this directly.
    pub(crate) fn place(
        user_id: UserId,
        items: Vec<LineItem>,
        total_price: Decimal,
        total_items: u32,
        total_quantity: u64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: OrderId::generate(),
            user_id,
            items,
            total_price,
            total_items,
            total_quantity,
            order_date: now,
            status: OrderStatus::Placed,
            is_deleted: false,
            deleted_at: None,
        }
    }

    /// Whether the order is visible to its owner.
    #[must_use]
    pub const fn is_visible(&self) -> bool {
        !self.is_deleted
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::{ProductId, Quantity};

    #[test]
    fn test_new_order_is_placed_and_visible() {
        let order = Order::place(
            UserId::generate(),
            vec![LineItem {
                product_id: ProductId::generate(),
                quantity: Quantity::new(1).unwrap(),
            }],
            Decimal::new(10, 0),
            1,
            1,
            Utc::now(),
        );
        assert_eq!(order.status, OrderStatus::Placed);
        assert!(order.is_visible());
        assert!(order.deleted_at.is_none());
    }

    #[test]
    fn test_serializes_camel_case() {
        let order = Order::place(UserId::generate(), Vec::new(), Decimal::ZERO, 0, 0, Utc::now());
        let json = serde_json::to_value(&order).unwrap();
        assert_eq!(json["status"], serde_json::json!("Placed"));
        assert!(json.get("orderDate").is_some());
        assert!(json.get("totalQuantity").is_some());
    }
}
