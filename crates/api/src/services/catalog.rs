//! Catalog service: category/product management and the product lookup used
//! by carts and orders.
//!
//! [`CatalogService::resolve`] and [`CatalogService::expand`] are the only
//! places that decide product visibility for the rest of the API.

use std::collections::HashMap;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use emporium_core::{
    Category, CategoryId, LineItem, NewProduct, Price, PriceError, Product, ProductId, Quantity,
};

use crate::db::{RepositoryError, Store};
use crate::error::{AppError, Result};

#[derive(Debug, Default, Deserialize)]
pub struct CategoryForm {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductForm {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub availability: Option<bool>,
    pub category_id: Option<String>,
}

/// A product with its category expanded.
#[derive(Debug, Clone, Serialize)]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: Product,
    pub category: Option<Category>,
}

/// A cart or order line with its product looked up for display.
///
/// `product` is `None` when the product has since been soft-deleted.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpandedLine {
    pub product_id: ProductId,
    pub quantity: Quantity,
    pub product: Option<Product>,
}

pub struct CatalogService<'a> {
    store: &'a dyn Store,
}

impl<'a> CatalogService<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    /// A product that may be added to or changed within a cart.
    ///
    /// Returns `None` if the product is missing, soft-deleted, or unavailable.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the store fails.
    pub async fn resolve(&self, product_id: ProductId) -> Result<Option<Product>> {
        Ok(self
            .store
            .get_product(product_id)
            .await?
            .filter(Product::is_purchasable))
    }

    /// Products for display next to cart and order lines.
    ///
    /// Unavailable products are included; soft-deleted and missing ones are
    /// not, so callers render those lines with no product.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the store fails.
    pub async fn expand(&self, product_ids: &[ProductId]) -> Result<HashMap<ProductId, Product>> {
        let mut ids = product_ids.to_vec();
        ids.sort_unstable();
        ids.dedup();

        Ok(self
            .store
            .get_products(&ids)
            .await?
            .into_iter()
            .filter(|p| !p.is_deleted)
            .map(|p| (p.id, p))
            .collect())
    }

    /// Expand line items in their original order.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the store fails.
    pub async fn expand_lines(&self, items: &[LineItem]) -> Result<Vec<ExpandedLine>> {
        let ids: Vec<ProductId> = items.iter().map(|i| i.product_id).collect();
        let products = self.expand(&ids).await?;
        Ok(items
            .iter()
            .map(|item| ExpandedLine {
                product_id: item.product_id,
                quantity: item.quantity,
                product: products.get(&item.product_id).cloned(),
            })
            .collect())
    }

    // =========================================================================
    // Categories
    // =========================================================================

    /// # Errors
    ///
    /// Returns `AppError::InvalidArgument` for missing fields and
    /// `AppError::InvalidState` if the name is taken.
    pub async fn create_category(&self, form: CategoryForm) -> Result<Category> {
        let name = required(form.name, "Category name")?;
        let description = required(form.description, "Category description")?;

        let category = Category::new(name, description, Utc::now());
        self.store
            .create_category(&category)
            .await
            .map_err(|e| conflict_as_state(e, "Category already exists!"))?;

        tracing::info!(category_id = %category.id, name = %category.name, "category created");
        Ok(category)
    }

    /// # Errors
    ///
    /// Returns `AppError::Database` if the store fails.
    pub async fn list_categories(&self) -> Result<Vec<Category>> {
        Ok(self.store.list_categories().await?)
    }

    /// # Errors
    ///
    /// Returns `AppError::NotFound` if missing or soft-deleted.
    pub async fn get_category(&self, id: CategoryId) -> Result<Category> {
        self.store
            .get_category(id)
            .await?
            .filter(|c| !c.is_deleted)
            .ok_or_else(|| AppError::NotFound("Category not found!".to_string()))
    }

    // =========================================================================
    // Products
    // =========================================================================

    /// # Errors
    ///
    /// Returns `AppError::InvalidArgument` for missing fields or a
    /// non-positive price, `AppError::NotFound` if the category does not
    /// exist, and `AppError::InvalidState` if the title is taken.
    pub async fn create_product(&self, form: ProductForm) -> Result<ProductDetail> {
        let title = required(form.title, "Product title")?;
        let description = required(form.description, "Product description")?;
        let price = form
            .price
            .ok_or_else(|| AppError::InvalidArgument("Product price is required!".to_string()))?;
        let price = Price::new(price).map_err(|e| match e {
            PriceError::NotPositive => {
                AppError::InvalidArgument("Price must be greater than 0!".to_string())
            }
            PriceError::TooLarge { max } => {
                AppError::InvalidArgument(format!("Price cannot exceed {max}!"))
            }
        })?;
        let category_id: CategoryId = required(form.category_id, "Category id")?
            .parse()
            .map_err(|e: emporium_core::IdError| AppError::InvalidArgument(format!("{e}")))?;

        let category = self.get_category(category_id).await?;

        let product = Product::new(
            NewProduct {
                title,
                description,
                price,
                availability: form.availability.unwrap_or(true),
                category_id,
            },
            Utc::now(),
        );
        self.store
            .create_product(&product)
            .await
            .map_err(|e| conflict_as_state(e, "Product already exists!"))?;

        tracing::info!(product_id = %product.id, title = %product.title, "product created");
        Ok(ProductDetail {
            product,
            category: Some(category),
        })
    }

    /// Non-deleted products, each with its category expanded.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the store fails.
    pub async fn list_products(&self) -> Result<Vec<ProductDetail>> {
        let products = self.store.list_products().await?;
        let categories: HashMap<CategoryId, Category> = self
            .store
            .list_categories()
            .await?
            .into_iter()
            .map(|c| (c.id, c))
            .collect();

        Ok(products
            .into_iter()
            .map(|product| ProductDetail {
                category: categories.get(&product.category_id).cloned(),
                product,
            })
            .collect())
    }

    /// # Errors
    ///
    /// Returns `AppError::NotFound` if missing or soft-deleted.
    pub async fn get_product(&self, id: ProductId) -> Result<ProductDetail> {
        let product = self
            .store
            .get_product(id)
            .await?
            .filter(|p| !p.is_deleted)
            .ok_or_else(|| AppError::NotFound("Product not found!".to_string()))?;
        let category = self
            .store
            .get_category(product.category_id)
            .await?
            .filter(|c| !c.is_deleted);
        Ok(ProductDetail { product, category })
    }
}

fn required(value: Option<String>, field: &str) -> Result<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::InvalidArgument(format!("{field} is required!")))
}

fn conflict_as_state(err: RepositoryError, message: &str) -> AppError {
    match err {
        RepositoryError::Conflict(_) => AppError::InvalidState(message.to_string()),
        other => AppError::Database(other),
    }
}
