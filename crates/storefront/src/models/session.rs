//! Session-related types.
//!
//! The session only carries pointers into Shopify state: the cart lives in
//! Shopify, the session remembers which cart belongs to this shopper and
//! whether their drawer is open.

/// Session keys for cart data.
pub mod keys {
    /// Key for storing the Shopify cart ID.
    pub const CART_ID: &str = "cart_id";

    /// Key for the "cart drawer is displayed" flag.
    pub const DRAWER_OPEN: &str = "cart_drawer_open";
}
