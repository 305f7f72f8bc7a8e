//! In-memory store.
//!
//! All maps sit behind one lock so that checkout (order insert plus cart
//! reset) happens in a single critical section.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use emporium_core::{
    Cart, CartId, Category, CategoryId, Email, Order, OrderId, Product, ProductId, UserId,
};

use super::{
    CartRepository, CatalogRepository, OrderRepository, RepositoryError, Store, UserRepository,
};
use crate::models::User;

#[derive(Default)]
struct Tables {
    users: HashMap<UserId, (User, String)>,
    categories: HashMap<CategoryId, Category>,
    products: HashMap<ProductId, Product>,
    carts: HashMap<CartId, Cart>,
    cart_by_user: HashMap<UserId, CartId>,
    orders: Vec<Order>,
}

impl Tables {
    /// Apply the compare-and-swap rule and return the cart as stored.
    fn check_cart_write(&self, cart: &Cart) -> Result<Cart, RepositoryError> {
        match self.carts.get(&cart.id()) {
            Some(stored) if stored.version() == cart.version() => {}
            Some(_) => return Err(RepositoryError::VersionConflict),
            None => {
                if cart.version() != 0 || self.cart_by_user.contains_key(&cart.user_id()) {
                    return Err(RepositoryError::VersionConflict);
                }
            }
        }
        let mut stored = cart.clone();
        stored.mark_saved();
        Ok(stored)
    }

    fn put_cart(&mut self, stored: Cart) {
        self.cart_by_user.insert(stored.user_id(), stored.id());
        self.carts.insert(stored.id(), stored);
    }
}

/// Process-local [`super::Store`].
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create_user(&self, user: &User, password_hash: &str) -> Result<(), RepositoryError> {
        let mut tables = self.tables.write().await;
        let digits = user.phone.digits();
        for (existing, _) in tables.users.values() {
            if existing.email == user.email {
                return Err(RepositoryError::Conflict("email".to_string()));
            }
            if existing.phone.digits() == digits {
                return Err(RepositoryError::Conflict("phone".to_string()));
            }
        }
        tables
            .users
            .insert(user.id, (user.clone(), password_hash.to_string()));
        Ok(())
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables.users.get(&id).map(|(user, _)| user.clone()))
    }

    async fn get_user_credentials(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|(user, _)| &user.email == email)
            .cloned())
    }
}

#[async_trait]
impl CatalogRepository for MemoryStore {
    async fn create_category(&self, category: &Category) -> Result<(), RepositoryError> {
        let mut tables = self.tables.write().await;
        if tables.categories.values().any(|c| c.name == category.name) {
            return Err(RepositoryError::Conflict("name".to_string()));
        }
        tables.categories.insert(category.id, category.clone());
        Ok(())
    }

    async fn get_category(&self, id: CategoryId) -> Result<Option<Category>, RepositoryError> {
        Ok(self.tables.read().await.categories.get(&id).cloned())
    }

    async fn list_categories(&self) -> Result<Vec<Category>, RepositoryError> {
        let tables = self.tables.read().await;
        let mut categories: Vec<Category> = tables
            .categories
            .values()
            .filter(|c| !c.is_deleted)
            .cloned()
            .collect();
        categories.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(categories)
    }

    async fn create_product(&self, product: &Product) -> Result<(), RepositoryError> {
        let mut tables = self.tables.write().await;
        if tables.products.values().any(|p| p.title == product.title) {
            return Err(RepositoryError::Conflict("title".to_string()));
        }
        tables.products.insert(product.id, product.clone());
        Ok(())
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        Ok(self.tables.read().await.products.get(&id).cloned())
    }

    async fn get_products(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| tables.products.get(id))
            .cloned()
            .collect())
    }

    async fn list_products(&self) -> Result<Vec<Product>, RepositoryError> {
        let tables = self.tables.read().await;
        let mut products: Vec<Product> = tables
            .products
            .values()
            .filter(|p| !p.is_deleted)
            .cloned()
            .collect();
        products.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(products)
    }
}

#[async_trait]
impl CartRepository for MemoryStore {
    async fn get_cart(&self, id: CartId) -> Result<Option<Cart>, RepositoryError> {
        Ok(self.tables.read().await.carts.get(&id).cloned())
    }

    async fn get_cart_for_user(&self, user_id: UserId) -> Result<Option<Cart>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .cart_by_user
            .get(&user_id)
            .and_then(|id| tables.carts.get(id))
            .cloned())
    }

    async fn save_cart(&self, cart: &Cart) -> Result<(), RepositoryError> {
        let mut tables = self.tables.write().await;
        let stored = tables.check_cart_write(cart)?;
        tables.put_cart(stored);
        Ok(())
    }
}

#[async_trait]
impl OrderRepository for MemoryStore {
    async fn place_order(&self, order: &Order, cart: &Cart) -> Result<(), RepositoryError> {
        let mut tables = self.tables.write().await;
        let stored = tables.check_cart_write(cart)?;
        tables.put_cart(stored);
        tables.orders.push(order.clone());
        Ok(())
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables.orders.iter().find(|o| o.id == id).cloned())
    }

    async fn list_orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let tables = self.tables.read().await;
        let mut orders: Vec<Order> = tables
            .orders
            .iter()
            .filter(|o| o.user_id == user_id && o.is_visible())
            .cloned()
            .collect();
        orders.sort_by_key(|o| o.order_date);
        Ok(orders)
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}
