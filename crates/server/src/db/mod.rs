//! Database operations.
//!
//! # Tables
//!
//! - `product` - Catalog
//! - `orders` - Customer orders with JSONB line-item snapshots
//! - `address` - Saved shipping addresses
//!
//! # Migrations
//!
//! Migrations live in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p amara-cli -- migrate
//! ```
//!
//! Queries use the runtime sqlx API; rows map through `sqlx::FromRow` on the
//! model types.

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

mod addresses;
mod orders;
mod products;

pub use addresses::{AddressInput, AddressRepository};
pub use orders::{NewOrder, OrderRepository};
pub use products::{NewProduct, ProductRepository, ProductUpdate};

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

/// Errors from repository operations.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// Underlying database error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The requested row does not exist.
    #[error("not found")]
    NotFound,

    /// A uniqueness or state conflict.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Insufficient stock for an order line.
    #[error("insufficient stock for product {0}")]
    InsufficientStock(String),

    /// Stored data failed to deserialize.
    #[error("data corruption: {0}")]
    DataCorruption(String),
}
