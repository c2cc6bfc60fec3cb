//! Catalog files: a JSON array of products.
//!
//! ```json
//! [
//!   { "id": 1, "name": "Canvas Tote", "price": 13.99, "stock": 10, "image": "/img/tote.jpg" },
//!   { "id": 2, "name": "Enamel Pin", "price": "5.00", "stock": 40 }
//! ]
//! ```
//!
//! `price` may be a JSON number or a decimal string and is rounded to cents.
//! The CLI seeds `PostgreSQL` from these files; the memory store loads one at
//! startup when `STOREFRONT_CATALOG_FILE` is set.

use std::path::Path;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use unlabel_core::{Price, ProductId};

use super::MemoryStore;
use crate::models::Product;

/// Errors from reading or validating a catalog file.
#[derive(Debug, Error)]
pub enum CatalogFileError {
    /// The file could not be read.
    #[error("Cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The content is not a valid catalog.
    #[error("Invalid catalog file: {0}")]
    Invalid(String),
}

/// One entry of the catalog file, before validation.
#[derive(Debug, Deserialize)]
struct CatalogEntry {
    id: i32,
    name: String,
    price: Value,
    stock: u32,
    #[serde(default)]
    image: Option<String>,
}

impl TryFrom<CatalogEntry> for Product {
    type Error = CatalogFileError;

    fn try_from(entry: CatalogEntry) -> Result<Self, Self::Error> {
        let id = entry.id;
        let invalid =
            move |reason: String| CatalogFileError::Invalid(format!("product {id}: {reason}"));

        if entry.name.trim().is_empty() {
            return Err(invalid("name is empty".to_owned()));
        }

        let amount = match &entry.price {
            Value::Number(n) => Decimal::from_str(&n.to_string()),
            Value::String(s) => Decimal::from_str(s.trim()),
            other => return Err(invalid(format!("price must be a number, got {other}"))),
        }
        .map_err(|e| invalid(format!("price: {e}")))?;
        let price = Price::new(amount.round_dp(2)).map_err(|e| invalid(e.to_string()))?;

        Ok(Self {
            id: ProductId::new(id),
            name: entry.name,
            price,
            stock: entry.stock,
            image: entry.image.filter(|image| !image.is_empty()),
        })
    }
}

/// Parse and validate a catalog file's contents.
///
/// # Errors
///
/// Returns `CatalogFileError::Invalid` if the JSON is malformed or any
/// product fails validation.
pub fn parse_catalog(content: &str) -> Result<Vec<Product>, CatalogFileError> {
    let entries: Vec<CatalogEntry> =
        serde_json::from_str(content).map_err(|e| CatalogFileError::Invalid(e.to_string()))?;

    entries.into_iter().map(Product::try_from).collect()
}

/// Read and validate the catalog file at `path`.
///
/// # Errors
///
/// Returns `CatalogFileError::Io` if the file cannot be read, or
/// `CatalogFileError::Invalid` if its content is not a valid catalog.
pub async fn read_catalog(path: &Path) -> Result<Vec<Product>, CatalogFileError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| CatalogFileError::Io {
            path: path.display().to_string(),
            source,
        })?;

    parse_catalog(&content)
}

impl MemoryStore {
    /// Insert or replace every product in the catalog file at `path`.
    ///
    /// Nothing is inserted unless the whole file is valid. Returns the
    /// number of products loaded.
    ///
    /// # Errors
    ///
    /// Returns `CatalogFileError` if the file cannot be read or is invalid.
    pub async fn load_catalog(&self, path: &Path) -> Result<usize, CatalogFileError> {
        let products = read_catalog(path).await?;
        let count = products.len();
        for product in products {
            self.put_product(product).await;
        }
        Ok(count)
    }
}
