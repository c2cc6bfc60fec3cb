//! Domain models for the cart and checkout engine.
//!
//! These are validated domain types, separate from the database row types in
//! [`crate::db`]. Cart lines and purchase lines are value snapshots: they carry
//! the product name, price, and image captured when the line was written, not
//! a live reference to the catalog.

pub mod cart;
pub mod order;
pub mod product;
pub mod session;

pub use cart::{CartLine, CartSummary, NewCartLine};
pub use order::{NewOrder, Order, OrderRecord, PurchaseLine};
pub use product::Product;
pub use session::{CurrentUser, keys as session_keys};
