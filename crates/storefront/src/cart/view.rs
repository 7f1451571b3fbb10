//! Drawer presentation derived from one cart snapshot.
//!
//! Nothing here is cached: every render reads the store once and derives
//! totals, progress and line views from that single snapshot.

use minicart_core::{CurrencyCode, Locale, format_price};
use rust_decimal::Decimal;

use super::{ActiveCart, FreeShippingProgress, LineItemView};

/// Locale, currency and free-shipping target for the drawer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CartSettings {
    pub locale: Locale,
    /// Used when Shopify sends an amount without a currency. Drawer amounts
    /// are shown in the cart's own currency.
    pub currency: CurrencyCode,
    pub free_shipping_target: Decimal,
}

impl Default for CartSettings {
    fn default() -> Self {
        Self {
            locale: Locale::PtBr,
            currency: CurrencyCode::BRL,
            free_shipping_target: Decimal::ONE_THOUSAND,
        }
    }
}

/// The two drawer states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrawerView {
    Empty,
    Populated(PopulatedDrawer),
}

/// Everything the populated drawer shows, top to bottom.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopulatedDrawer {
    pub free_shipping: FreeShippingProgress,
    pub free_shipping_remaining: String,
    pub lines: Vec<LineItemView>,
    /// `None` when the subtotal is zero.
    pub subtotal: Option<String>,
    pub total: String,
    pub item_count: u32,
    pub checkout_url: String,
    pub checkout_disabled: bool,
}

impl DrawerView {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Whether the checkout button must be disabled.
    #[must_use]
    pub const fn checkout_disabled(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Populated(drawer) => drawer.checkout_disabled,
        }
    }

    #[must_use]
    pub const fn item_count(&self) -> u32 {
        match self {
            Self::Empty => 0,
            Self::Populated(drawer) => drawer.item_count,
        }
    }
}

/// Checkout is blocked while any line is pending or when there are no lines.
#[must_use]
pub const fn checkout_disabled(any_pending: bool, line_count: usize) -> bool {
    any_pending || line_count == 0
}

/// Render the drawer for `cart`, or the empty state when there is none.
#[must_use]
pub fn render_drawer(cart: Option<&ActiveCart>, settings: &CartSettings) -> DrawerView {
    let Some(active) = cart else {
        return DrawerView::Empty;
    };
    let Some(snapshot) = active.store.read() else {
        return DrawerView::Empty;
    };
    if snapshot.is_empty() {
        return DrawerView::Empty;
    }

    let CartSettings {
        locale,
        free_shipping_target,
        ..
    } = *settings;
    let currency = snapshot.cost.total.currency_code;
    let price = |amount: Decimal| format_price(amount, currency, locale);

    let lines: Vec<_> = snapshot
        .lines
        .iter()
        .enumerate()
        .map(|(index, line)| {
            LineItemView::from_line(
                index,
                line,
                active.activity.is_pending(&line.id),
                locale,
                currency,
            )
        })
        .collect();

    let total = snapshot.cost.total.amount;
    let subtotal = snapshot.cost.subtotal.amount;
    let free_shipping = FreeShippingProgress::new(Some(total), free_shipping_target);

    DrawerView::Populated(PopulatedDrawer {
        free_shipping_remaining: price(free_shipping.remaining),
        free_shipping,
        checkout_disabled: checkout_disabled(active.activity.any_pending(), lines.len()),
        lines,
        subtotal: (!subtotal.is_zero()).then(|| price(subtotal)),
        total: price(total),
        item_count: snapshot.total_quantity,
        checkout_url: snapshot.checkout_url.clone(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use minicart_core::CartLineId;

    use super::*;
    use crate::analytics::TracingAnalytics;
    use crate::cart::fixtures::{ScriptedBackend, cart, in_currency, line};
    use crate::cart::{CartBackend, CartStore, LineItemController, MockCartBackend};
    use crate::shopify::types::Cart;

    fn active_with(backend: Arc<dyn CartBackend>, snapshot: Cart) -> ActiveCart {
        ActiveCart::new(
            CartStore::with_snapshot(snapshot, backend),
            Arc::new(TracingAnalytics),
        )
    }

    fn populated(view: DrawerView) -> PopulatedDrawer {
        match view {
            DrawerView::Populated(drawer) => drawer,
            DrawerView::Empty => panic!("expected populated drawer"),
        }
    }

    #[test]
    fn test_checkout_disabled_rule() {
        assert!(checkout_disabled(true, 3));
        assert!(checkout_disabled(false, 0));
        assert!(checkout_disabled(true, 0));
        assert!(!checkout_disabled(false, 1));
    }

    #[test]
    fn test_no_cart_is_empty() {
        assert_eq!(render_drawer(None, &CartSettings::default()), DrawerView::Empty);
    }

    #[test]
    fn test_unloaded_and_lineless_carts_are_empty() {
        let backend: Arc<dyn CartBackend> = Arc::new(MockCartBackend::new());
        let unloaded = ActiveCart::new(
            CartStore::new("c1".into(), backend.clone()),
            Arc::new(TracingAnalytics),
        );
        assert!(render_drawer(Some(&unloaded), &CartSettings::default()).is_empty());

        let lineless = active_with(backend, cart(vec![]));
        let view = render_drawer(Some(&lineless), &CartSettings::default());
        assert!(view.is_empty());
        assert!(view.checkout_disabled());
        assert_eq!(view.item_count(), 0);
    }

    #[test]
    fn test_populated_brl_drawer() {
        let backend = Arc::new(MockCartBackend::new());
        let cart = active_with(
            backend,
            cart(vec![line("l1", 2, "50", "90"), line("g1", 1, "20", "0")]),
        );

        let drawer = populated(render_drawer(Some(&cart), &CartSettings::default()));

        assert_eq!(drawer.lines.len(), 2);
        assert_eq!(drawer.lines[0].strike_through, "R$100,00");
        assert_eq!(drawer.lines[0].price, "R$90,00");
        assert!(drawer.lines[1].is_gift);
        assert_eq!(drawer.total, "R$90,00");
        assert_eq!(drawer.subtotal.as_deref(), Some("R$120,00"));
        assert_eq!(drawer.free_shipping.percent, 9);
        assert_eq!(drawer.free_shipping_remaining, "R$910,00");
        assert_eq!(drawer.item_count, 3);
        assert!(!drawer.checkout_disabled);
    }

    #[test]
    fn test_zero_subtotal_is_blank() {
        let backend = Arc::new(MockCartBackend::new());
        let mut snapshot = cart(vec![line("g1", 1, "0", "0")]);
        snapshot.cost.subtotal.amount = Decimal::ZERO;
        let cart = active_with(backend, snapshot);

        let drawer = populated(render_drawer(Some(&cart), &CartSettings::default()));
        assert_eq!(drawer.subtotal, None);
        assert_eq!(drawer.free_shipping.percent, 0);
    }

    #[test]
    fn test_pending_line_disables_checkout_only() {
        let backend = Arc::new(MockCartBackend::new());
        let cart = active_with(
            backend,
            cart(vec![line("l1", 1, "50", "45"), line("l2", 1, "30", "30")]),
        );

        let guard = cart.activity.begin(&CartLineId::new("l1"));
        let drawer = populated(render_drawer(Some(&cart), &CartSettings::default()));
        assert!(drawer.checkout_disabled);
        assert!(drawer.lines[0].loading);
        assert!(!drawer.lines[1].loading);
        drop(guard);

        let drawer = populated(render_drawer(Some(&cart), &CartSettings::default()));
        assert!(!drawer.checkout_disabled);
    }

    #[tokio::test]
    async fn test_removing_last_line_turns_empty() {
        let backend = Arc::new(ScriptedBackend::new(cart(vec![line("l1", 2, "50", "90")])));
        let cart = active_with(backend.clone(), backend.current());
        let settings = CartSettings::default();
        assert!(!render_drawer(Some(&cart), &settings).is_empty());

        LineItemController::new(&cart, 0, settings.locale, CurrencyCode::BRL)
            .set_quantity(0)
            .await
            .unwrap();

        assert!(render_drawer(Some(&cart), &settings).is_empty());
    }

    #[test]
    fn test_english_locale_formatting() {
        let backend = Arc::new(MockCartBackend::new());
        let cart = active_with(
            backend,
            in_currency(cart(vec![line("l1", 1, "1500", "1234.5")]), CurrencyCode::USD),
        );
        let settings = CartSettings {
            locale: Locale::EnUs,
            currency: CurrencyCode::USD,
            free_shipping_target: Decimal::new(100, 0),
        };

        let drawer = populated(render_drawer(Some(&cart), &settings));
        assert_eq!(drawer.total, "$1,234.50");
        assert!(drawer.free_shipping.reached);
        assert_eq!(drawer.free_shipping_remaining, "$0.00");
    }

    #[test]
    fn test_amounts_use_cart_currency() {
        let backend = Arc::new(MockCartBackend::new());
        let cart = active_with(
            backend,
            in_currency(cart(vec![line("l1", 2, "50", "90")]), CurrencyCode::USD),
        );

        let drawer = populated(render_drawer(Some(&cart), &CartSettings::default()));
        assert_eq!(drawer.total, "$90,00");
        assert_eq!(drawer.lines[0].price, "$90,00");
        assert_eq!(drawer.lines[0].strike_through, "$100,00");
        assert_eq!(drawer.free_shipping_remaining, "$910,00");
    }
}
