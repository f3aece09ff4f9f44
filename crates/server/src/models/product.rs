//! Catalog product model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use amara_core::{Money, ProductId};

use amara_core::cart::ProductSnapshot;

/// A catalog product.
///
/// Created and edited through the admin API; read by the catalog and cart.
/// Stock is decremented atomically at order creation.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Money,
    pub image_urls: Vec<String>,
    pub description: String,
    pub category: String,
    pub stock: i32,
    pub featured: bool,
    /// Unit cost for margin reporting (admin-only concern).
    pub cost: Option<Money>,
    /// Base shipping charge override.
    pub shipping_base: Option<Money>,
    pub hashtags: Option<Vec<String>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Capture the fields a cart line needs.
    #[must_use]
    pub fn snapshot(&self) -> ProductSnapshot {
        ProductSnapshot {
            id: self.id,
            name: self.name.clone(),
            price: self.price,
            image_url: self.image_urls.first().cloned(),
            stock: self.stock,
        }
    }
}
