//! Totals and stock checks shared by the cart and checkout services.
//!
//! All money math uses the price captured on each cart line, never a fresh
//! catalog price.

use std::collections::BTreeMap;

use unlabel_core::{Price, ProductId, ShippingOption};

use crate::models::{CartLine, Product};

/// Sum of `price * quantity` over the lines.
#[must_use]
pub fn subtotal(lines: &[CartLine]) -> Price {
    lines.iter().map(CartLine::line_total).sum()
}

/// Subtotal plus the flat shipping price.
#[must_use]
pub fn total(subtotal: Price, shipping: ShippingOption) -> Price {
    subtotal + shipping.price()
}

/// Sum of quantities across the lines.
#[must_use]
pub fn item_count(lines: &[CartLine]) -> u64 {
    lines.iter().map(|line| u64::from(line.quantity.get())).sum()
}

/// Requested quantity per product, summed across lines.
#[must_use]
pub fn requested_by_product(lines: &[CartLine]) -> BTreeMap<ProductId, u64> {
    let mut requested = BTreeMap::new();
    for line in lines {
        *requested.entry(line.product_id).or_insert(0) += u64::from(line.quantity.get());
    }
    requested
}

/// Check every product referenced by `lines` against `products`.
///
/// A product missing from `products` has no stock. Returns the lowest
/// product ID whose requested quantity exceeds its stock.
///
/// # Errors
///
/// Returns the offending `ProductId`.
pub fn validate_stock(lines: &[CartLine], products: &[Product]) -> Result<(), ProductId> {
    let stock: BTreeMap<ProductId, u32> = products.iter().map(|p| (p.id, p.stock)).collect();

    requested_by_product(lines)
        .into_iter()
        .find(|(product, requested)| {
            *requested > u64::from(stock.get(product).copied().unwrap_or(0))
        })
        .map_or(Ok(()), |(product, _)| Err(product))
}
