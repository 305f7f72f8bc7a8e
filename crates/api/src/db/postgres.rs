//! `PostgreSQL` store.
//!
//! Queries are runtime-checked (`sqlx::query_as`) so the crate builds without
//! a live database. Row types convert into domain types, and any stored value
//! that no longer passes domain validation surfaces as
//! `RepositoryError::DataCorruption`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::{PgExecutor, PgPool};

use emporium_core::{
    Cart, CartId, CartParts, Category, CategoryId, Email, LineItem, Order, OrderId, OrderStatus,
    Phone, Price, Product, ProductId, UserId,
};

use super::{
    CartRepository, CatalogRepository, OrderRepository, RepositoryError, Store, UserRepository,
};
use crate::models::{User, UserAddress};

/// [`super::Store`] backed by a `PostgreSQL` pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Map a unique violation to `Conflict(field)` using the constraint name.
fn map_unique(e: sqlx::Error, constraints: &[(&str, &str)]) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        let field = db_err
            .constraint()
            .and_then(|name| constraints.iter().find(|(c, _)| *c == name))
            .map_or("unknown", |(_, field)| *field);
        return RepositoryError::Conflict(field.to_owned());
    }
    RepositoryError::Database(e)
}

fn to_i32(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn corrupt(what: &str, e: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::DataCorruption(format!("invalid {what} in database: {e}"))
}

// =============================================================================
// Row types
// =============================================================================

#[derive(sqlx::FromRow)]
struct UserRow {
    id: UserId,
    name: String,
    email: Email,
    phone: String,
    address: Json<UserAddress>,
    password_hash: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    fn into_parts(self) -> Result<(User, String), RepositoryError> {
        let phone = Phone::parse(&self.phone).map_err(|e| corrupt("phone", e))?;
        Ok((
            User {
                id: self.id,
                name: self.name,
                email: self.email,
                phone,
                address: self.address.0,
                created_at: self.created_at,
                updated_at: self.updated_at,
            },
            self.password_hash,
        ))
    }
}

#[derive(sqlx::FromRow)]
struct CategoryRow {
    id: CategoryId,
    name: String,
    description: String,
    is_deleted: bool,
    deleted_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
            is_deleted: row.is_deleted,
            deleted_at: row.deleted_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: ProductId,
    title: String,
    description: String,
    price: Decimal,
    availability: bool,
    category_id: CategoryId,
    is_deleted: bool,
    deleted_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = RepositoryError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            title: row.title,
            description: row.description,
            price: Price::new(row.price).map_err(|e| corrupt("price", e))?,
            availability: row.availability,
            category_id: row.category_id,
            is_deleted: row.is_deleted,
            deleted_at: row.deleted_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct CartRow {
    id: CartId,
    user_id: UserId,
    items: Json<Vec<LineItem>>,
    total_price: Decimal,
    total_items: i32,
    total_quantity: i64,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CartRow> for Cart {
    type Error = RepositoryError;

    fn try_from(row: CartRow) -> Result<Self, Self::Error> {
        Self::from_parts(CartParts {
            id: row.id,
            user_id: row.user_id,
            items: row.items.0,
            total_price: row.total_price,
            total_items: u32::try_from(row.total_items).map_err(|e| corrupt("total_items", e))?,
            total_quantity: u64::try_from(row.total_quantity)
                .map_err(|e| corrupt("total_quantity", e))?,
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
        .map_err(|e| corrupt("cart", e))
    }
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    user_id: UserId,
    items: Json<Vec<LineItem>>,
    total_price: Decimal,
    total_items: i32,
    total_quantity: i64,
    order_date: DateTime<Utc>,
    status: OrderStatus,
    is_deleted: bool,
    deleted_at: Option<DateTime<Utc>>,
}

impl TryFrom<OrderRow> for Order {
    type Error = RepositoryError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            items: row.items.0,
            total_price: row.total_price,
            total_items: u32::try_from(row.total_items).map_err(|e| corrupt("total_items", e))?,
            total_quantity: u64::try_from(row.total_quantity)
                .map_err(|e| corrupt("total_quantity", e))?,
            order_date: row.order_date,
            status: row.status,
            is_deleted: row.is_deleted,
            deleted_at: row.deleted_at,
        })
    }
}

const USER_COLUMNS: &str =
    "id, name, email, phone, address, password_hash, created_at, updated_at";
const CATEGORY_COLUMNS: &str =
    "id, name, description, is_deleted, deleted_at, created_at, updated_at";
const PRODUCT_COLUMNS: &str = "id, title, description, price, availability, category_id, \
     is_deleted, deleted_at, created_at, updated_at";
const CART_COLUMNS: &str = "id, user_id, items, total_price, total_items, total_quantity, \
     version, created_at, updated_at";
const ORDER_COLUMNS: &str = "id, user_id, items, total_price, total_items, total_quantity, \
     order_date, status, is_deleted, deleted_at";

/// Insert or compare-and-swap a cart on any executor (pool or transaction).
async fn write_cart<'e, E>(executor: E, cart: &Cart) -> Result<(), RepositoryError>
where
    E: PgExecutor<'e>,
{
    let result = if cart.version() == 0 {
        sqlx::query(
            r"
            INSERT INTO emporium.carts
                (id, user_id, items, total_price, total_items, total_quantity,
                 version, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, 1, $7, $8)
            ON CONFLICT (user_id) DO NOTHING
            ",
        )
        .bind(cart.id())
        .bind(cart.user_id())
        .bind(Json(cart.items()))
        .bind(cart.total_price())
        .bind(to_i32(cart.total_items()))
        .bind(to_i64(cart.total_quantity()))
        .bind(cart.created_at())
        .bind(cart.updated_at())
        .execute(executor)
        .await?
    } else {
        sqlx::query(
            r"
            UPDATE emporium.carts
            SET items = $3,
                total_price = $4,
                total_items = $5,
                total_quantity = $6,
                updated_at = $7,
                version = version + 1
            WHERE id = $1 AND version = $2
            ",
        )
        .bind(cart.id())
        .bind(cart.version())
        .bind(Json(cart.items()))
        .bind(cart.total_price())
        .bind(to_i32(cart.total_items()))
        .bind(to_i64(cart.total_quantity()))
        .bind(cart.updated_at())
        .execute(executor)
        .await?
    };

    if result.rows_affected() == 0 {
        return Err(RepositoryError::VersionConflict);
    }
    Ok(())
}

#[async_trait]
impl UserRepository for PgStore {
    async fn create_user(&self, user: &User, password_hash: &str) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO emporium.users
                (id, name, email, phone, phone_digits, address, password_hash,
                 created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ",
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.phone.as_str())
        .bind(user.phone.digits())
        .bind(Json(&user.address))
        .bind(password_hash)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            map_unique(
                e,
                &[
                    ("users_email_key", "email"),
                    ("users_phone_digits_key", "phone"),
                ],
            )
        })?;
        Ok(())
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM emporium.users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| r.into_parts().map(|(user, _)| user)).transpose()
    }

    async fn get_user_credentials(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM emporium.users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        row.map(UserRow::into_parts).transpose()
    }
}

#[async_trait]
impl CatalogRepository for PgStore {
    async fn create_category(&self, category: &Category) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO emporium.categories
                (id, name, description, is_deleted, deleted_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ",
        )
        .bind(category.id)
        .bind(&category.name)
        .bind(&category.description)
        .bind(category.is_deleted)
        .bind(category.deleted_at)
        .bind(category.created_at)
        .bind(category.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_unique(e, &[("categories_name_key", "name")]))?;
        Ok(())
    }

    async fn get_category(&self, id: CategoryId) -> Result<Option<Category>, RepositoryError> {
        let row: Option<CategoryRow> = sqlx::query_as(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM emporium.categories WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Category::from))
    }

    async fn list_categories(&self) -> Result<Vec<Category>, RepositoryError> {
        let rows: Vec<CategoryRow> = sqlx::query_as(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM emporium.categories \
             WHERE NOT is_deleted ORDER BY created_at, id"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Category::from).collect())
    }

    async fn create_product(&self, product: &Product) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO emporium.products
                (id, title, description, price, availability, category_id,
                 is_deleted, deleted_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ",
        )
        .bind(product.id)
        .bind(&product.title)
        .bind(&product.description)
        .bind(product.price.amount())
        .bind(product.availability)
        .bind(product.category_id)
        .bind(product.is_deleted)
        .bind(product.deleted_at)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_unique(e, &[("products_title_key", "title")]))?;
        Ok(())
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row: Option<ProductRow> = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM emporium.products WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Product::try_from).transpose()
    }

    async fn get_products(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let uuids: Vec<uuid::Uuid> = ids.iter().map(ProductId::as_uuid).collect();
        let rows: Vec<ProductRow> = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM emporium.products WHERE id = ANY($1)"
        ))
        .bind(&uuids)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Product::try_from).collect()
    }

    async fn list_products(&self) -> Result<Vec<Product>, RepositoryError> {
        let rows: Vec<ProductRow> = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM emporium.products \
             WHERE NOT is_deleted ORDER BY created_at, id"
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Product::try_from).collect()
    }
}

#[async_trait]
impl CartRepository for PgStore {
    async fn get_cart(&self, id: CartId) -> Result<Option<Cart>, RepositoryError> {
        let row: Option<CartRow> = sqlx::query_as(&format!(
            "SELECT {CART_COLUMNS} FROM emporium.carts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Cart::try_from).transpose()
    }

    async fn get_cart_for_user(&self, user_id: UserId) -> Result<Option<Cart>, RepositoryError> {
        let row: Option<CartRow> = sqlx::query_as(&format!(
            "SELECT {CART_COLUMNS} FROM emporium.carts WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Cart::try_from).transpose()
    }

    async fn save_cart(&self, cart: &Cart) -> Result<(), RepositoryError> {
        write_cart(&self.pool, cart).await
    }
}

#[async_trait]
impl OrderRepository for PgStore {
    async fn place_order(&self, order: &Order, cart: &Cart) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r"
            INSERT INTO emporium.orders
                (id, user_id, items, total_price, total_items, total_quantity,
                 order_date, status, is_deleted, deleted_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ",
        )
        .bind(order.id)
        .bind(order.user_id)
        .bind(Json(&order.items))
        .bind(order.total_price)
        .bind(to_i32(order.total_items))
        .bind(to_i64(order.total_quantity))
        .bind(order.order_date)
        .bind(order.status)
        .bind(order.is_deleted)
        .bind(order.deleted_at)
        .execute(&mut *tx)
        .await?;

        // Dropping `tx` on error rolls the order insert back.
        write_cart(&mut *tx, cart).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row: Option<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM emporium.orders WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Order::try_from).transpose()
    }

    async fn list_orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM emporium.orders \
             WHERE user_id = $1 AND NOT is_deleted ORDER BY order_date, id"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Order::try_from).collect()
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
