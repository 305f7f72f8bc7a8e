//! Record store for users, catalog, carts, and orders.
//!
//! # Backends
//!
//! - [`PgStore`] - `PostgreSQL` (schema `emporium`)
//! - [`MemoryStore`] - process-local maps for development and tests
//!
//! Services only see the [`Store`] trait object, so both backends share one
//! set of business rules.
//!
//! ## Tables
//!
//! - `users` - Registered customers (email and phone unique)
//! - `categories` - Product categories (name unique)
//! - `products` - Sellable products (title unique)
//! - `carts` - One cart per user, with a `version` counter for optimistic writes
//! - `orders` - Immutable order snapshots
//!
//! # Migrations
//!
//! Migrations are stored in `crates/api/migrations/` and run via:
//! ```bash
//! cargo run -p emporium-cli -- migrate
//! ```

mod memory;
mod postgres;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use emporium_core::{
    Cart, CartId, Category, CategoryId, Email, Order, OrderId, Product, ProductId, UserId,
};

use crate::models::User;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Unique constraint violation. Carries the conflicting field name.
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// A cart write lost a race: the stored version moved on since the read.
    #[error("cart was modified concurrently")]
    VersionConflict,
}

/// User records.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a user with its argon2 password hash.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict("email" | "phone")` on a duplicate.
    async fn create_user(&self, user: &User, password_hash: &str) -> Result<(), RepositoryError>;

    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepositoryError>;

    /// Look up a user and their password hash for login.
    async fn get_user_credentials(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError>;
}

/// Category and product records.
///
/// Single-record getters return soft-deleted rows too; callers decide what
/// is visible. List operations skip soft-deleted rows.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict("name")` on a duplicate name.
    async fn create_category(&self, category: &Category) -> Result<(), RepositoryError>;

    async fn get_category(&self, id: CategoryId) -> Result<Option<Category>, RepositoryError>;

    async fn list_categories(&self) -> Result<Vec<Category>, RepositoryError>;

    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict("title")` on a duplicate title.
    async fn create_product(&self, product: &Product) -> Result<(), RepositoryError>;

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError>;

    /// Fetch several products by ID. Missing IDs are skipped; order is unspecified.
    async fn get_products(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError>;

    async fn list_products(&self) -> Result<Vec<Product>, RepositoryError>;
}

/// Cart records.
#[async_trait]
pub trait CartRepository: Send + Sync {
    async fn get_cart(&self, id: CartId) -> Result<Option<Cart>, RepositoryError>;

    async fn get_cart_for_user(&self, user_id: UserId) -> Result<Option<Cart>, RepositoryError>;

    /// Write a cart if nobody else has since the caller read it.
    ///
    /// A cart at version 0 is inserted; it conflicts if the user already has
    /// a cart. Otherwise the write succeeds only while the stored version
    /// still equals `cart.version()`, and bumps it by one.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::VersionConflict` when the compare fails.
    async fn save_cart(&self, cart: &Cart) -> Result<(), RepositoryError>;
}

/// Order records.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Insert `order` and write the emptied `cart` as one atomic step.
    ///
    /// The cart write follows the same version rule as
    /// [`CartRepository::save_cart`]; on conflict neither record is written.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::VersionConflict` when the cart moved on.
    async fn place_order(&self, order: &Order, cart: &Cart) -> Result<(), RepositoryError>;

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, RepositoryError>;

    /// A user's non-deleted orders, oldest first.
    async fn list_orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError>;
}

/// Everything the API needs from a backend.
#[async_trait]
pub trait Store: UserRepository + CatalogRepository + CartRepository + OrderRepository {
    /// Check the backend is reachable.
    async fn ping(&self) -> Result<(), RepositoryError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
