//! Session-related types.
//!
//! Types stored in the session by the authentication layer.

use serde::{Deserialize, Serialize};

use unlabel_core::UserId;

/// Session-stored user identity.
///
/// The authentication layer writes this on login; every cart and checkout
/// call receives it explicitly through the `RequireAuth` extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    /// User's database ID.
    pub id: UserId,
}

/// Session keys for authentication data.
pub mod keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";
}
