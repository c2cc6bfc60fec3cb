//! Unlabel Core - Shared types library.
//!
//! This crate provides common types used across all Unlabel components:
//! - `storefront` - Cart and checkout engine plus its JSON API
//! - `cli` - Command-line tools for migrations and catalog seeding
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no database access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for ids, prices, quantities, order numbers,
//!   statuses, and the shipping table

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
