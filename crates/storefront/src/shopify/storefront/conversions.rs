//! Conversion from Storefront API wire shapes to cart domain types.
//!
//! Monetary fields that are missing or fail to parse become zero (with a
//! warning) rather than failing the whole cart.

use minicart_core::{CartId, CartLineId, CurrencyCode, MerchandiseId};
use rust_decimal::Decimal;
use tracing::warn;

use crate::shopify::types::{
    Cart, CartCost, CartLine, CartLineCost, CartMerchandise, CartMerchandiseProduct,
    CartUserError, Image, Money,
};

use super::queries::{RawCart, RawImage, RawLine, RawMoney, RawUserError};

/// Convert a raw cart, using `fallback` when a currency code is unusable.
pub fn convert_cart(raw: RawCart, fallback: CurrencyCode) -> Cart {
    // Lines inherit the cart currency when their own code is unusable.
    let currency = raw
        .cost
        .total_amount
        .as_ref()
        .or(raw.cost.subtotal_amount.as_ref())
        .and_then(|m| m.currency_code.parse().ok())
        .unwrap_or(fallback);

    if raw.lines.page_info.has_next_page {
        warn!(
            cart_id = %raw.id,
            shown = raw.lines.edges.len(),
            "Cart has more lines than one page; only the first page is shown"
        );
    }

    Cart {
        id: CartId::new(raw.id),
        checkout_url: raw.checkout_url,
        total_quantity: quantity_from(raw.total_quantity, "cart.totalQuantity"),
        cost: CartCost {
            subtotal: money(raw.cost.subtotal_amount.as_ref(), currency, "cart.subtotalAmount"),
            total: money(raw.cost.total_amount.as_ref(), currency, "cart.totalAmount"),
        },
        lines: raw
            .lines
            .edges
            .into_iter()
            .map(|edge| convert_line(edge.node, currency))
            .collect(),
    }
}

fn convert_line(raw: RawLine, currency: CurrencyCode) -> CartLine {
    let cost = raw.cost;
    CartLine {
        id: CartLineId::new(raw.id),
        quantity: quantity_from(raw.quantity, "line.quantity"),
        cost: CartLineCost {
            amount_per_quantity: money(
                cost.amount_per_quantity.as_ref(),
                currency,
                "line.amountPerQuantity",
            ),
            compare_at_amount_per_quantity: cost
                .compare_at_amount_per_quantity
                .as_ref()
                .map(|m| money(Some(m), currency, "line.compareAtAmountPerQuantity")),
            subtotal_amount: money(cost.subtotal_amount.as_ref(), currency, "line.subtotalAmount"),
            total_amount: money(cost.total_amount.as_ref(), currency, "line.totalAmount"),
        },
        merchandise: CartMerchandise {
            id: MerchandiseId::new(raw.merchandise.id),
            title: raw.merchandise.title,
            image: raw.merchandise.image.map(convert_image),
            product: CartMerchandiseProduct {
                handle: raw.merchandise.product.handle,
                title: raw.merchandise.product.title,
            },
        },
    }
}

fn convert_image(raw: RawImage) -> Image {
    Image {
        url: raw.url,
        alt_text: raw.alt_text,
        width: raw.width,
        height: raw.height,
    }
}

/// Convert a mutation user error.
pub fn convert_user_error(raw: RawUserError) -> CartUserError {
    CartUserError {
        code: raw.code,
        field: raw.field,
        message: raw.message,
    }
}

fn money(raw: Option<&RawMoney>, currency: CurrencyCode, field: &str) -> Money {
    let Some(raw) = raw else {
        return Money::zero(currency);
    };

    let amount = raw.amount.trim().parse::<Decimal>().unwrap_or_else(|e| {
        warn!(field, amount = %raw.amount, error = %e, "Unparseable amount, using zero");
        Decimal::ZERO
    });

    let currency_code = raw.currency_code.parse().unwrap_or_else(|_| {
        warn!(field, code = %raw.currency_code, "Unusable currency code, using cart currency");
        currency
    });

    Money {
        amount,
        currency_code,
    }
}

fn quantity_from(raw: i64, field: &str) -> u32 {
    u32::try_from(raw).unwrap_or_else(|_| {
        warn!(field, quantity = raw, "Quantity out of range, using zero");
        0
    })
}
