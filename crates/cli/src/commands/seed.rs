//! Catalog seeding command.
//!
//! Reads a YAML catalog file and inserts products. With `--clear`, the
//! existing catalog is deleted first (orders keep their snapshots and are
//! unaffected).

use std::path::Path;

use secrecy::SecretString;
use serde::Deserialize;
use tracing::info;

use amara_server::db::{self, NewProduct, ProductRepository};

/// YAML catalog file shape.
#[derive(Debug, Deserialize)]
struct SeedCatalog {
    products: Vec<NewProduct>,
}

/// Seed products from a YAML file.
///
/// # Errors
///
/// Returns an error if environment variables are missing, the file cannot be
/// read or parsed, or database operations fail.
pub async fn catalog(file_path: &str, clear_existing: bool) -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("DATABASE_URL")
        .map(SecretString::from)
        .map_err(|_| "DATABASE_URL not set")?;

    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading catalog from file");

    // Read and validate YAML before connecting to database
    let content = tokio::fs::read_to_string(path).await?;
    let catalog: SeedCatalog = serde_yaml::from_str(&content)?;

    if catalog.products.is_empty() {
        return Err("catalog file contains no products".into());
    }
    info!(products = catalog.products.len(), "Parsed catalog");

    let pool = db::create_pool(&database_url).await?;
    info!("Connected to database");

    if clear_existing {
        let deleted = sqlx::query("DELETE FROM product")
            .execute(&pool)
            .await?
            .rows_affected();
        info!(deleted, "Cleared existing catalog");
    }

    let repo = ProductRepository::new(&pool);
    let mut inserted = 0usize;
    for product in &catalog.products {
        repo.create(product).await?;
        inserted += 1;
    }

    info!("Seeding complete!");
    info!("  Products inserted: {inserted}");

    Ok(())
}
