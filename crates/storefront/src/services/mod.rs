//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `cart` - Add, update, remove, and list cart lines with stock checks
//! - `checkout` - Atomic cart-to-order conversion
//! - `history` - Purchase history read-back
//! - `pricing` - Subtotal, total, and stock validation helpers
//!
//! Services borrow a [`CommerceStore`](crate::store::CommerceStore) and are
//! cheap to construct per request.

pub mod cart;
pub mod checkout;
mod error;
pub mod history;
pub mod pricing;

pub use cart::CartService;
pub use checkout::{CheckoutService, Receipt};
pub use error::{CartError, CheckoutError};
pub use history::OrderHistoryService;
