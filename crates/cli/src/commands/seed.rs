//! `emporium seed catalog`: load categories and their products from YAML.
//!
//! ```yaml
//! - name: Fruit
//!   description: Fresh fruit
//!   products:
//!     - title: Pineapple
//!       description: Sweet and spiky
//!       price: "3.50"
//!     - title: Durian
//!       description: Polarizing
//!       price: "12.00"
//!       availability: false
//! ```
//!
//! Categories are matched by name and products by title. Existing entries
//! are left untouched, so the command can be re-run after editing the file.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{info, warn};

use emporium_api::config;
use emporium_api::db::{self, PgStore, Store};
use emporium_api::services::catalog::{CatalogService, CategoryForm, ProductForm};

#[derive(Debug, Deserialize)]
pub struct CategorySeed {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub products: Vec<ProductSeed>,
}

#[derive(Debug, Deserialize)]
pub struct ProductSeed {
    pub title: String,
    pub description: String,
    pub price: Decimal,
    #[serde(default = "available")]
    pub availability: bool,
}

const fn available() -> bool {
    true
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub categories_created: usize,
    pub products_created: usize,
    pub skipped: usize,
}

/// Seed the configured database from `file_path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, the database URL
/// is missing, or a create fails for a reason other than a duplicate.
pub async fn catalog(file_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading catalog from file");
    let content = tokio::fs::read_to_string(path).await?;
    let seeds: Vec<CategorySeed> = serde_yaml::from_str(&content)?;
    info!(categories = seeds.len(), "Parsed catalog");

    let database_url = config::database_url_from_env()?;
    let pool = db::create_pool(&database_url).await?;
    let store = PgStore::new(pool);

    let report = seed_catalog(&store, &seeds).await?;
    info!("Seeding complete!");
    info!("  Categories created: {}", report.categories_created);
    info!("  Products created: {}", report.products_created);
    info!("  Skipped (already exist): {}", report.skipped);
    Ok(())
}

/// Create whatever in `seeds` is not already in the store.
///
/// # Errors
///
/// Returns the first catalog error that is not an existing-entry skip.
pub async fn seed_catalog(
    store: &dyn Store,
    seeds: &[CategorySeed],
) -> Result<SeedReport, emporium_api::error::AppError> {
    let catalog = CatalogService::new(store);
    let mut report = SeedReport::default();

    let mut categories: HashMap<String, String> = catalog
        .list_categories()
        .await?
        .into_iter()
        .map(|c| (c.name, c.id.to_string()))
        .collect();
    let mut titles: HashSet<String> = catalog
        .list_products()
        .await?
        .into_iter()
        .map(|p| p.product.title)
        .collect();

    for seed in seeds {
        let name = seed.name.trim();
        let category_id = if let Some(id) = categories.get(name) {
            report.skipped += 1;
            id.clone()
        } else {
            let category = catalog
                .create_category(CategoryForm {
                    name: Some(name.to_string()),
                    description: Some(seed.description.clone()),
                })
                .await?;
            report.categories_created += 1;
            let id = category.id.to_string();
            categories.insert(category.name, id.clone());
            id
        };

        for product in &seed.products {
            let title = product.title.trim();
            if titles.contains(title) {
                warn!(title, "product exists, skipping");
                report.skipped += 1;
                continue;
            }
            catalog
                .create_product(ProductForm {
                    title: Some(title.to_string()),
                    description: Some(product.description.clone()),
                    price: Some(product.price),
                    availability: Some(product.availability),
                    category_id: Some(category_id.clone()),
                })
                .await?;
            titles.insert(title.to_string());
            report.products_created += 1;
        }
    }

    Ok(report)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use emporium_api::db::MemoryStore;

    use super::*;

    const CATALOG: &str = r#"
- name: Fruit
  description: Fresh fruit
  products:
    - title: Pineapple
      description: Sweet and spiky
      price: "3.50"
    - title: Durian
      description: Polarizing
      price: "12.00"
      availability: false
- name: Pantry
  description: Dry goods
"#;

    #[test]
    fn test_parse_catalog() {
        let seeds: Vec<CategorySeed> = serde_yaml::from_str(CATALOG).unwrap();
        assert_eq!(seeds.len(), 2);
        assert_eq!(seeds[0].products[0].price, Decimal::new(350, 2));
        assert!(seeds[0].products[0].availability);
        assert!(!seeds[0].products[1].availability);
        assert!(seeds[1].products.is_empty());
    }

    #[tokio::test]
    async fn test_seed_is_idempotent() {
        let store = MemoryStore::new();
        let seeds: Vec<CategorySeed> = serde_yaml::from_str(CATALOG).unwrap();

        let first = seed_catalog(&store, &seeds).await.unwrap();
        assert_eq!(
            first,
            SeedReport {
                categories_created: 2,
                products_created: 2,
                skipped: 0,
            }
        );

        let second = seed_catalog(&store, &seeds).await.unwrap();
        assert_eq!(
            second,
            SeedReport {
                categories_created: 0,
                products_created: 0,
                skipped: 4,
            }
        );
    }
}
