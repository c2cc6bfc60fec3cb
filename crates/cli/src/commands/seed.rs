//! Seed the catalog from a JSON file.
//!
//! The file format is described in
//! [`unlabel_storefront::store::catalog_file`]. Existing products with
//! the same ID are updated in place. The whole file is applied in one
//! transaction, so a bad row leaves the catalog untouched.

use std::path::Path;

use tracing::info;

use unlabel_storefront::db::{self, catalog};
use unlabel_storefront::store::read_catalog;

use super::{CommandError, database_url};

/// Upsert every product in `file` into the catalog.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, a product is
/// invalid, or the database write fails.
pub async fn products(file: &Path) -> Result<(), CommandError> {
    // Validate before connecting to the database
    let products = read_catalog(file).await?;
    info!(path = %file.display(), count = products.len(), "Parsed catalog");

    let pool = db::create_pool(&database_url()?).await?;
    info!("Connected to database");

    let mut tx = pool.begin().await?;
    for product in &products {
        catalog::upsert_product(&mut *tx, product).await?;
    }
    tx.commit().await?;

    info!(count = products.len(), "Seeding complete!");
    Ok(())
}
