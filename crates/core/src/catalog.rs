//! Catalog records: categories and products.
//!
//! These are read-only from the cart and order perspective. Whether a product
//! may be put in a cart is decided by [`Product::is_purchasable`] and nowhere
//! else.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{CategoryId, Price, ProductId};

/// A product category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub description: String,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Category {
    /// Create a new, live category.
    #[must_use]
    pub fn new(name: String, description: String, now: DateTime<Utc>) -> Self {
        Self {
            id: CategoryId::generate(),
            name,
            description,
            is_deleted: false,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A sellable product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    pub description: String,
    pub price: Price,
    pub availability: bool,
    pub category_id: CategoryId,
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields required to create a [`Product`].
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub title: String,
    pub description: String,
    pub price: Price,
    pub availability: bool,
    pub category_id: CategoryId,
}

impl Product {
    /// Create a new, live product.
    #[must_use]
    pub fn new(fields: NewProduct, now: DateTime<Utc>) -> Self {
        Self {
            id: ProductId::generate(),
            title: fields.title,
            description: fields.description,
            price: fields.price,
            availability: fields.availability,
            category_id: fields.category_id,
            is_deleted: false,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// A product can be added to, or changed within, a cart only when it is
    /// available and not soft-deleted.
    #[must_use]
    pub const fn is_purchasable(&self) -> bool {
        self.availability && !self.is_deleted
    }
}
