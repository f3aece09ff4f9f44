//! Product repository.

use serde::Deserialize;
use sqlx::{PgConnection, PgPool};

use amara_core::{Money, ProductId};

use super::RepositoryError;
use crate::models::Product;

/// Payload for creating a product.
#[derive(Debug, Clone, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub price: Money,
    #[serde(default)]
    pub image_urls: Vec<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub stock: i32,
    #[serde(default)]
    pub featured: bool,
    pub cost: Option<Money>,
    pub shipping_base: Option<Money>,
    pub hashtags: Option<Vec<String>>,
}

/// Payload for updating a product. All fields replace the stored values.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductUpdate {
    pub id: ProductId,
    #[serde(flatten)]
    pub fields: NewProduct,
}

/// Repository for catalog products.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List the full catalog, featured products first, newest first within.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self) -> Result<Vec<Product>, RepositoryError> {
        let products = sqlx::query_as::<_, Product>(
            r"
            SELECT id, name, price, image_urls, description, category, stock,
                   featured, cost, shipping_base, hashtags, created_at, updated_at
            FROM product
            ORDER BY featured DESC, created_at DESC
            ",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(products)
    }

    /// Get a product by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(
            r"
            SELECT id, name, price, image_urls, description, category, stock,
                   featured, cost, shipping_base, hashtags, created_at, updated_at
            FROM product
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(product)
    }

    /// Get several products by id. Missing ids are simply absent from the
    /// result; callers that need resolve-or-drop semantics rely on that.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_many(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError> {
        let uuids: Vec<uuid::Uuid> = ids.iter().map(|id| id.as_uuid()).collect();
        let products = sqlx::query_as::<_, Product>(
            r"
            SELECT id, name, price, image_urls, description, category, stock,
                   featured, cost, shipping_base, hashtags, created_at, updated_at
            FROM product
            WHERE id = ANY($1)
            ",
        )
        .bind(&uuids)
        .fetch_all(self.pool)
        .await?;

        Ok(products)
    }

    /// Number of products in the catalog.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&self) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM product")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }

    /// Insert a new product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(&self, new: &NewProduct) -> Result<Product, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(
            r"
            INSERT INTO product (name, price, image_urls, description, category,
                                 stock, featured, cost, shipping_base, hashtags)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id, name, price, image_urls, description, category, stock,
                      featured, cost, shipping_base, hashtags, created_at, updated_at
            ",
        )
        .bind(&new.name)
        .bind(new.price)
        .bind(&new.image_urls)
        .bind(&new.description)
        .bind(&new.category)
        .bind(new.stock)
        .bind(new.featured)
        .bind(new.cost)
        .bind(new.shipping_base)
        .bind(&new.hashtags)
        .fetch_one(self.pool)
        .await?;

        Ok(product)
    }

    /// Replace a product's fields.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no product has the given id.
    pub async fn update(&self, update: &ProductUpdate) -> Result<Product, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(
            r"
            UPDATE product
            SET name = $2, price = $3, image_urls = $4, description = $5,
                category = $6, stock = $7, featured = $8, cost = $9,
                shipping_base = $10, hashtags = $11, updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, price, image_urls, description, category, stock,
                      featured, cost, shipping_base, hashtags, created_at, updated_at
            ",
        )
        .bind(update.id)
        .bind(&update.fields.name)
        .bind(update.fields.price)
        .bind(&update.fields.image_urls)
        .bind(&update.fields.description)
        .bind(&update.fields.category)
        .bind(update.fields.stock)
        .bind(update.fields.featured)
        .bind(update.fields.cost)
        .bind(update.fields.shipping_base)
        .bind(&update.fields.hashtags)
        .fetch_optional(self.pool)
        .await?;

        product.ok_or(RepositoryError::NotFound)
    }

    /// Delete a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no product has the given id.
    pub async fn delete(&self, id: ProductId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM product WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Atomically decrement stock for an order line.
    ///
    /// Runs on the caller's connection so a multi-line checkout can put every
    /// decrement in one transaction with the order insert. The guard
    /// `stock >= $2` makes concurrent checkouts race safely: the loser sees
    /// zero rows affected and the checkout fails instead of overselling.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::InsufficientStock` if the product is missing
    /// or has fewer than `quantity` units left.
    pub async fn decrement_stock(
        conn: &mut PgConnection,
        id: ProductId,
        quantity: i32,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE product
            SET stock = stock - $2, updated_at = NOW()
            WHERE id = $1 AND stock >= $2
            ",
        )
        .bind(id)
        .bind(quantity)
        .execute(conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::InsufficientStock(id.to_string()));
        }
        Ok(())
    }

    /// Seed the default catalog if the table is empty.
    ///
    /// Idempotent: a non-empty catalog is left untouched.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any insert fails.
    pub async fn seed_defaults(&self) -> Result<usize, RepositoryError> {
        if self.count().await? > 0 {
            return Ok(0);
        }

        let defaults = default_catalog();
        for product in &defaults {
            self.create(product).await?;
        }

        tracing::info!(count = defaults.len(), "Seeded default catalog");
        Ok(defaults.len())
    }
}

/// The starter catalog inserted into an empty store.
fn default_catalog() -> Vec<NewProduct> {
    let entry = |name: &str, price: i64, category: &str, stock: i32, featured: bool| NewProduct {
        name: name.to_string(),
        price: Money::from_minor(price),
        image_urls: Vec::new(),
        description: String::new(),
        category: category.to_string(),
        stock,
        featured,
        cost: None,
        shipping_base: None,
        hashtags: None,
    };

    vec![
        entry("Handwoven Linen Shirt", 249_900, "apparel", 12, true),
        entry("Block Print Scarf", 89_900, "accessories", 30, true),
        entry("Brass Jhumka Earrings", 129_900, "jewellery", 18, false),
        entry("Indigo Tote Bag", 69_900, "accessories", 25, false),
    ]
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalog_is_nonempty_and_positive() {
        let catalog = default_catalog();
        assert!(!catalog.is_empty());
        for product in &catalog {
            assert!(product.price > Money::ZERO);
            assert!(product.stock > 0);
        }
    }

    #[test]
    fn test_new_product_deserializes_with_defaults() {
        let new: NewProduct =
            serde_json::from_str(r#"{"name":"Shirt","price":249900}"#).unwrap();
        assert_eq!(new.name, "Shirt");
        assert_eq!(new.price, Money::from_minor(249_900));
        assert_eq!(new.stock, 0);
        assert!(!new.featured);
        assert!(new.image_urls.is_empty());
    }

    #[test]
    fn test_product_update_flattens_fields() {
        let update: ProductUpdate = serde_json::from_str(
            r#"{"id":"7f9c1c67-2f44-4a5e-9d4e-3a2b1c0d9e8f","name":"Shirt","price":100}"#,
        )
        .unwrap();
        assert_eq!(update.fields.name, "Shirt");
    }
}
