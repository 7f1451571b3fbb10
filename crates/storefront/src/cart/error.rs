//! Cart operation errors.

use minicart_core::{CartId, CartLineId};
use thiserror::Error;

use crate::shopify::ShopifyError;

/// Errors surfaced by the cart store and line-item controller.
#[derive(Debug, Error)]
pub enum CartError {
    /// The Storefront API call failed.
    #[error("Shopify error: {0}")]
    Shopify(#[from] ShopifyError),

    /// The cart no longer exists upstream.
    #[error("Cart not found: {0}")]
    NotFound(CartId),

    /// Gift lines only accept removal.
    #[error("Line {0} is a gift; its quantity cannot change")]
    GiftLocked(CartLineId),

    /// The backend could not be reached or returned an unusable answer.
    #[error("Cart unavailable: {0}")]
    Unavailable(String),
}

impl CartError {
    /// Whether the cart itself is gone, so a stored cart ID should be dropped.
    #[must_use]
    pub const fn is_missing_cart(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_) | Self::Shopify(ShopifyError::NotFound(_))
        )
    }
}
