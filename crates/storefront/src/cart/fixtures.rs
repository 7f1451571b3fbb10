//! Cart builders and a scripted backend for unit tests.

#![allow(clippy::unwrap_used)]

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use minicart_core::{CartId, CartLineId, CurrencyCode, MerchandiseId};
use rust_decimal::Decimal;
use tokio::sync::Notify;

use super::{CartBackend, CartError};
use crate::shopify::types::{
    Cart, CartCost, CartLine, CartLineCost, CartLineInput, CartMerchandise,
    CartMerchandiseProduct, Money,
};

pub fn brl(amount: &str) -> Money {
    Money {
        amount: amount.parse().unwrap(),
        currency_code: CurrencyCode::BRL,
    }
}

/// A BRL line; `compare_at` is per unit, `total` is for the whole line.
pub fn line(id: &str, quantity: u32, compare_at: &str, total: &str) -> CartLine {
    let total = brl(total);
    let per_unit = if quantity == 0 {
        total
    } else {
        Money {
            amount: total.amount / Decimal::from(quantity),
            ..total
        }
    };
    let compare_at = brl(compare_at);

    CartLine {
        id: CartLineId::new(id),
        quantity,
        cost: CartLineCost {
            amount_per_quantity: per_unit,
            compare_at_amount_per_quantity: Some(compare_at),
            subtotal_amount: Money {
                amount: compare_at.amount * Decimal::from(quantity),
                ..compare_at
            },
            total_amount: total,
        },
        merchandise: CartMerchandise {
            id: MerchandiseId::new(format!("variant-{id}")),
            title: "P".to_string(),
            image: None,
            product: CartMerchandiseProduct {
                handle: "camiseta".to_string(),
                title: "Camiseta".to_string(),
            },
        },
    }
}

pub fn cart(lines: Vec<CartLine>) -> Cart {
    let mut cart = Cart {
        id: CartId::new("c1"),
        checkout_url: "https://shop.example/checkouts/c1".to_string(),
        total_quantity: 0,
        cost: CartCost {
            subtotal: Money::zero(CurrencyCode::BRL),
            total: Money::zero(CurrencyCode::BRL),
        },
        lines,
    };
    recompute(&mut cart);
    cart
}

/// Re-label every amount of `cart` with `currency`.
pub fn in_currency(mut cart: Cart, currency: CurrencyCode) -> Cart {
    cart.cost.subtotal.currency_code = currency;
    cart.cost.total.currency_code = currency;
    for line in &mut cart.lines {
        let cost = &mut line.cost;
        cost.amount_per_quantity.currency_code = currency;
        cost.subtotal_amount.currency_code = currency;
        cost.total_amount.currency_code = currency;
        if let Some(compare_at) = &mut cost.compare_at_amount_per_quantity {
            compare_at.currency_code = currency;
        }
    }
    cart
}

fn recompute(cart: &mut Cart) {
    cart.total_quantity = cart.lines.iter().map(|l| l.quantity).sum();
    cart.cost.subtotal.amount = cart
        .lines
        .iter()
        .map(|l| l.cost.subtotal_amount.amount)
        .sum();
    cart.cost.total.amount = cart.lines.iter().map(|l| l.cost.total_amount.amount).sum();
}

/// In-memory backend whose writes can be held open or made to fail.
pub struct ScriptedBackend {
    cart: Mutex<Cart>,
    gate: Option<Notify>,
    fail: AtomicBool,
    writes: AtomicUsize,
}

impl ScriptedBackend {
    pub fn new(cart: Cart) -> Self {
        Self {
            cart: Mutex::new(cart),
            gate: None,
            fail: AtomicBool::new(false),
            writes: AtomicUsize::new(0),
        }
    }

    /// Writes wait for `release()` before answering.
    pub fn gated(cart: Cart) -> Self {
        Self {
            gate: Some(Notify::new()),
            ..Self::new(cart)
        }
    }

    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.notify_one();
        }
    }

    pub fn fail_writes(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn current(&self) -> Cart {
        self.cart.lock().unwrap().clone()
    }

    async fn before_write(&self) -> Result<(), CartError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(CartError::Unavailable("scripted failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl CartBackend for ScriptedBackend {
    async fn fetch_cart(&self, cart_id: &CartId) -> Result<Cart, CartError> {
        let cart = self.current();
        if &cart.id == cart_id {
            Ok(cart)
        } else {
            Err(CartError::NotFound(cart_id.clone()))
        }
    }

    async fn create_cart(&self, lines: Vec<CartLineInput>) -> Result<Cart, CartError> {
        self.before_write().await?;
        let mut cart = self.cart.lock().unwrap();
        cart.lines.clear();
        for input in lines {
            cart.lines.push(line_for(&input));
        }
        recompute(&mut cart);
        Ok(cart.clone())
    }

    async fn add_lines(
        &self,
        _cart_id: &CartId,
        lines: Vec<CartLineInput>,
    ) -> Result<Cart, CartError> {
        self.before_write().await?;
        let mut cart = self.cart.lock().unwrap();
        for input in lines {
            cart.lines.push(line_for(&input));
        }
        recompute(&mut cart);
        Ok(cart.clone())
    }

    async fn set_line_quantity(
        &self,
        _cart_id: &CartId,
        line_id: &CartLineId,
        quantity: u32,
    ) -> Result<Cart, CartError> {
        self.before_write().await?;
        let mut cart = self.cart.lock().unwrap();
        if quantity == 0 {
            cart.lines.retain(|l| &l.id != line_id);
        } else if let Some(target) = cart.lines.iter_mut().find(|l| &l.id == line_id) {
            let qty = Decimal::from(quantity);
            target.quantity = quantity;
            target.cost.total_amount.amount = target.cost.amount_per_quantity.amount * qty;
            if let Some(compare_at) = target.cost.compare_at_amount_per_quantity {
                target.cost.subtotal_amount.amount = compare_at.amount * qty;
            }
        }
        recompute(&mut cart);
        Ok(cart.clone())
    }
}

fn line_for(input: &CartLineInput) -> CartLine {
    let unit = Decimal::from(45);
    let mut line = line(
        &format!("line-{}", input.merchandise_id),
        input.quantity,
        "50",
        &(unit * Decimal::from(input.quantity)).to_string(),
    );
    line.merchandise.id = input.merchandise_id.clone();
    line
}
