//! Per-line state and guarded mutations.
//!
//! Each rendered line gets a [`LineItemController`]. Mutations go through a
//! guarded path: the line is marked pending before the store is called and
//! the mark is released by a drop guard once the call settles, whether it
//! succeeded, failed, or the request future was dropped mid-flight.
//!
//! Pending state is tracked per line, so a slow update on one line never
//! disables the others.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use minicart_core::{CartLineId, CurrencyCode, Locale, format_price};
use rust_decimal::Decimal;
use tracing::{debug, instrument};

use super::{ActiveCart, CartError, DrawerLabels};
use crate::analytics::CartEvent;
use crate::shopify::types::CartLine;

/// Totals below one cent mark a line as a gift.
const GIFT_THRESHOLD: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

// =============================================================================
// Line Activity
// =============================================================================

/// Interaction state of one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineState {
    Idle,
    Pending,
}

/// In-flight mutations per line for one cart.
#[derive(Debug, Default)]
pub struct LineActivity {
    in_flight: Mutex<HashMap<CartLineId, usize>>,
}

impl LineActivity {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `line_id` pending until the returned guard is dropped.
    #[must_use]
    pub fn begin(&self, line_id: &CartLineId) -> PendingGuard<'_> {
        *self
            .lock()
            .entry(line_id.clone())
            .or_insert(0) += 1;
        PendingGuard {
            activity: self,
            line_id: line_id.clone(),
        }
    }

    #[must_use]
    pub fn state(&self, line_id: &CartLineId) -> LineState {
        if self.lock().contains_key(line_id) {
            LineState::Pending
        } else {
            LineState::Idle
        }
    }

    #[must_use]
    pub fn is_pending(&self, line_id: &CartLineId) -> bool {
        self.state(line_id) == LineState::Pending
    }

    /// Whether any line of the cart has a mutation in flight.
    #[must_use]
    pub fn any_pending(&self) -> bool {
        !self.lock().is_empty()
    }

    fn release(&self, line_id: &CartLineId) {
        let mut in_flight = self.lock();
        if let Some(count) = in_flight.get_mut(line_id) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                in_flight.remove(line_id);
            }
        }
    }

    // The map is only touched by these short sections, so a poisoned lock
    // still holds consistent counts.
    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<CartLineId, usize>> {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Keeps a line pending while alive.
#[derive(Debug)]
pub struct PendingGuard<'a> {
    activity: &'a LineActivity,
    line_id: CartLineId,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.activity.release(&self.line_id);
    }
}

// =============================================================================
// Derived Values
// =============================================================================

/// Whether the line is a gift (total below one cent).
#[must_use]
pub fn is_gift(line: &CartLine) -> bool {
    line.cost.total_amount.amount < GIFT_THRESHOLD
}

/// `"<variant> - <product>"`
#[must_use]
pub fn display_title(line: &CartLine) -> String {
    format!(
        "{} - {}",
        line.merchandise.title, line.merchandise.product.title
    )
}

/// The "was" price: compare-at unit price times quantity.
///
/// A line without a compare-at price reads as zero.
#[must_use]
pub fn strike_through_amount(line: &CartLine) -> Decimal {
    line.cost
        .compare_at_amount_per_quantity
        .map_or(Decimal::ZERO, |m| m.amount)
        * Decimal::from(line.quantity)
}

// =============================================================================
// View
// =============================================================================

/// Display data for one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineItemView {
    pub index: usize,
    pub line_id: String,
    pub title: String,
    pub product_handle: String,
    pub image_url: Option<String>,
    pub image_alt: String,
    pub quantity: u32,
    pub strike_through: String,
    pub price: String,
    pub is_gift: bool,
    pub loading: bool,
}

impl LineItemView {
    /// Build display data for `line` at `index` of a snapshot.
    #[must_use]
    pub fn from_line(
        index: usize,
        line: &CartLine,
        loading: bool,
        locale: Locale,
        currency: CurrencyCode,
    ) -> Self {
        let gift = is_gift(line);
        let price = if gift {
            DrawerLabels::for_locale(locale).free.to_string()
        } else {
            format_price(line.cost.total_amount.amount, currency, locale)
        };
        let image = line.merchandise.image.as_ref();

        Self {
            index,
            line_id: line.id.to_string(),
            title: display_title(line),
            product_handle: line.merchandise.product.handle.clone(),
            image_url: image.map(|i| i.url.clone()),
            image_alt: image
                .and_then(|i| i.alt_text.clone())
                .unwrap_or_else(|| line.merchandise.product.title.clone()),
            quantity: line.quantity,
            strike_through: format_price(strike_through_amount(line), currency, locale),
            price,
            is_gift: gift,
            loading,
        }
    }

    /// Quantity controls are locked while pending and for gifts.
    #[must_use]
    pub const fn quantity_disabled(&self) -> bool {
        self.loading || self.is_gift
    }

    /// Gifts stay removable; only a pending mutation locks removal.
    #[must_use]
    pub const fn remove_disabled(&self) -> bool {
        self.loading
    }
}

// =============================================================================
// Controller
// =============================================================================

/// Result of a guarded mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOutcome {
    /// The store accepted the change and published a new snapshot.
    Applied,
    /// The line was no longer at its index; nothing was sent.
    Stale,
}

/// Controller for the line at one position of the cart.
pub struct LineItemController<'a> {
    cart: &'a ActiveCart,
    index: usize,
    expected: Option<CartLineId>,
    locale: Locale,
    currency: CurrencyCode,
}

impl<'a> LineItemController<'a> {
    #[must_use]
    pub const fn new(
        cart: &'a ActiveCart,
        index: usize,
        locale: Locale,
        currency: CurrencyCode,
    ) -> Self {
        Self {
            cart,
            index,
            expected: None,
            locale,
            currency,
        }
    }

    /// Only act if the line at `index` is still `line_id`.
    ///
    /// Requests rendered from an older snapshot carry the line ID they saw,
    /// so a shrunk or reordered cart is treated as stale instead of editing
    /// whichever line moved into that position.
    #[must_use]
    pub fn expect_line(mut self, line_id: CartLineId) -> Self {
        self.expected = Some(line_id);
        self
    }

    /// The line at this position in the current snapshot.
    #[must_use]
    pub fn line(&self) -> Option<CartLine> {
        let snapshot = self.cart.store.read()?;
        let line = snapshot.lines.get(self.index)?;
        if let Some(expected) = &self.expected
            && &line.id != expected
        {
            return None;
        }
        Some(line.clone())
    }

    /// Display data, or `None` when the index is stale.
    #[must_use]
    pub fn view(&self) -> Option<LineItemView> {
        let line = self.line()?;
        Some(LineItemView::from_line(
            self.index,
            &line,
            self.cart.activity.is_pending(&line.id),
            self.locale,
            self.currency,
        ))
    }

    /// Set the line's quantity; zero removes it.
    ///
    /// # Errors
    ///
    /// Returns `CartError::GiftLocked` for a non-zero quantity on a gift, or
    /// the store's error if the update fails.
    #[instrument(skip(self), fields(index = self.index))]
    pub async fn set_quantity(&self, quantity: u32) -> Result<MutationOutcome, CartError> {
        let Some(line) = self.line() else {
            debug!("Line no longer at index, ignoring quantity change");
            return Ok(MutationOutcome::Stale);
        };

        if quantity > 0 && is_gift(&line) {
            return Err(CartError::GiftLocked(line.id));
        }

        self.guarded(&line, quantity).await
    }

    /// Remove the line.
    ///
    /// # Errors
    ///
    /// Returns the store's error if the removal fails.
    #[instrument(skip(self), fields(index = self.index))]
    pub async fn remove(&self) -> Result<MutationOutcome, CartError> {
        let Some(line) = self.line() else {
            debug!("Line no longer at index, ignoring removal");
            return Ok(MutationOutcome::Stale);
        };

        self.guarded(&line, 0).await
    }

    async fn guarded(&self, line: &CartLine, quantity: u32) -> Result<MutationOutcome, CartError> {
        {
            let _pending = self.cart.activity.begin(&line.id);
            self.cart.store.update(&line.id, quantity).await?;
        }

        self.cart.analytics.notify(&CartEvent::line_change(
            self.cart.store.id(),
            line,
            quantity,
            self.currency,
        ));
        Ok(MutationOutcome::Applied)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::analytics::{AnalyticsSink, CartEventName, MockAnalyticsSink, TracingAnalytics};
    use crate::cart::fixtures::{ScriptedBackend, cart, line};
    use crate::cart::{CartStore, MockCartBackend};

    fn active(backend: Arc<ScriptedBackend>, analytics: Arc<dyn AnalyticsSink>) -> ActiveCart {
        ActiveCart::new(
            CartStore::with_snapshot(backend.current(), backend.clone()),
            analytics,
        )
    }

    fn controller(cart: &ActiveCart, index: usize) -> LineItemController<'_> {
        LineItemController::new(cart, index, Locale::PtBr, CurrencyCode::BRL)
    }

    #[test]
    fn test_guard_releases_on_drop() {
        let activity = LineActivity::new();
        let id = CartLineId::new("l1");
        {
            let _guard = activity.begin(&id);
            assert_eq!(activity.state(&id), LineState::Pending);
            assert!(activity.any_pending());
        }
        assert_eq!(activity.state(&id), LineState::Idle);
        assert!(!activity.any_pending());
    }

    #[test]
    fn test_overlapping_guards_on_same_line() {
        let activity = LineActivity::new();
        let id = CartLineId::new("l1");
        let first = activity.begin(&id);
        let second = activity.begin(&id);
        drop(first);
        assert!(activity.is_pending(&id));
        drop(second);
        assert!(!activity.is_pending(&id));
    }

    #[test]
    fn test_gift_threshold() {
        assert!(is_gift(&line("g", 1, "0", "0")));
        assert!(is_gift(&line("g", 3, "10", "0.009")));
        assert!(!is_gift(&line("p", 1, "10", "0.01")));
        assert!(!is_gift(&line("p", 2, "50", "90")));
    }

    #[test]
    fn test_strike_through_missing_compare_at() {
        let mut line = line("l1", 3, "50", "90");
        assert_eq!(strike_through_amount(&line), Decimal::new(150, 0));
        line.cost.compare_at_amount_per_quantity = None;
        assert_eq!(strike_through_amount(&line), Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_brl_line_view() {
        let backend = Arc::new(ScriptedBackend::new(cart(vec![line("l1", 2, "50", "90")])));
        let cart = active(backend, Arc::new(TracingAnalytics));

        let view = controller(&cart, 0).view().unwrap();
        assert_eq!(view.title, "P - Camiseta");
        assert_eq!(view.strike_through, "R$100,00");
        assert_eq!(view.price, "R$90,00");
        assert!(!view.is_gift);
        assert!(!view.loading);
        assert!(!view.quantity_disabled());
    }

    #[tokio::test]
    async fn test_gift_view_and_policy() {
        let backend = Arc::new(ScriptedBackend::new(cart(vec![line("g1", 1, "30", "0")])));
        let cart = active(backend.clone(), Arc::new(TracingAnalytics));
        let controller = controller(&cart, 0);

        let view = controller.view().unwrap();
        assert!(view.is_gift);
        assert_eq!(view.price, "Grátis");
        assert!(view.quantity_disabled());
        assert!(!view.remove_disabled());

        let err = controller.set_quantity(2).await.unwrap_err();
        assert!(matches!(err, CartError::GiftLocked(_)));
        assert_eq!(backend.writes(), 0);

        assert_eq!(controller.remove().await.unwrap(), MutationOutcome::Applied);
        assert!(cart.store.read().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stale_index_renders_nothing() {
        let backend = Arc::new(ScriptedBackend::new(cart(vec![line("l1", 1, "50", "45")])));
        let cart = active(backend.clone(), Arc::new(TracingAnalytics));

        assert!(controller(&cart, 1).view().is_none());
        assert_eq!(
            controller(&cart, 1).set_quantity(3).await.unwrap(),
            MutationOutcome::Stale
        );
        assert_eq!(
            controller(&cart, 0)
                .expect_line(CartLineId::new("other"))
                .remove()
                .await
                .unwrap(),
            MutationOutcome::Stale
        );
        assert_eq!(backend.writes(), 0);
    }

    #[tokio::test]
    async fn test_flag_spans_the_store_call() {
        let backend = Arc::new(ScriptedBackend::gated(cart(vec![line("l1", 2, "50", "90")])));
        let cart = Arc::new(active(backend.clone(), Arc::new(TracingAnalytics)));
        let id = CartLineId::new("l1");

        let task = {
            let cart = cart.clone();
            tokio::spawn(async move { controller(&cart, 0).set_quantity(3).await })
        };
        while backend.writes() == 0 {
            tokio::task::yield_now().await;
        }

        assert_eq!(cart.activity.state(&id), LineState::Pending);
        assert!(controller(&cart, 0).view().unwrap().loading);
        assert!(controller(&cart, 0).view().unwrap().quantity_disabled());

        backend.release();
        assert_eq!(task.await.unwrap().unwrap(), MutationOutcome::Applied);
        assert_eq!(cart.activity.state(&id), LineState::Idle);
        assert_eq!(cart.store.read().unwrap().lines[0].quantity, 3);
    }

    #[tokio::test]
    async fn test_flag_released_on_failure() {
        let mut backend = MockCartBackend::new();
        backend
            .expect_set_line_quantity()
            .times(1)
            .returning(|_, _, _| Err(CartError::Unavailable("timeout".to_string())));
        let mut analytics = MockAnalyticsSink::new();
        analytics.expect_notify().never();

        let initial = cart(vec![line("l1", 2, "50", "90")]);
        let cart = ActiveCart::new(
            CartStore::with_snapshot(initial.clone(), Arc::new(backend)),
            Arc::new(analytics),
        );

        let result = controller(&cart, 0).set_quantity(5).await;
        assert!(result.is_err());
        assert!(!cart.activity.any_pending());
        assert_eq!(*cart.store.read().unwrap(), initial);
    }

    #[tokio::test]
    async fn test_lines_have_independent_flags() {
        let backend = Arc::new(ScriptedBackend::gated(cart(vec![
            line("l1", 1, "50", "45"),
            line("l2", 1, "30", "30"),
        ])));
        let cart = Arc::new(active(backend.clone(), Arc::new(TracingAnalytics)));

        let task = {
            let cart = cart.clone();
            tokio::spawn(async move { controller(&cart, 0).remove().await })
        };
        while backend.writes() == 0 {
            tokio::task::yield_now().await;
        }

        assert!(cart.activity.is_pending(&CartLineId::new("l1")));
        assert!(!cart.activity.is_pending(&CartLineId::new("l2")));
        let other = controller(&cart, 1).view().unwrap();
        assert!(!other.loading);
        assert!(!other.quantity_disabled());

        backend.release();
        task.await.unwrap().unwrap();
        assert!(!cart.activity.any_pending());
    }

    #[tokio::test]
    async fn test_one_event_per_successful_mutation() {
        let backend = Arc::new(ScriptedBackend::new(cart(vec![line("l1", 2, "50", "90")])));
        let mut analytics = MockAnalyticsSink::new();
        analytics
            .expect_notify()
            .withf(|e| e.name == CartEventName::AddToCart && e.items[0].quantity == 2)
            .times(1)
            .return_const(());
        analytics
            .expect_notify()
            .withf(|e| e.name == CartEventName::RemoveFromCart)
            .times(1)
            .return_const(());
        let cart = active(backend, Arc::new(analytics));

        controller(&cart, 0).set_quantity(4).await.unwrap();
        controller(&cart, 0).remove().await.unwrap();
    }

    #[tokio::test]
    async fn test_remove_last_line_empties_cart() {
        let backend = Arc::new(ScriptedBackend::new(cart(vec![line("l1", 2, "50", "90")])));
        let cart = active(backend, Arc::new(TracingAnalytics));

        controller(&cart, 0).set_quantity(0).await.unwrap();

        assert!(cart.store.read().unwrap().is_empty());
        assert!(controller(&cart, 0).view().is_none());
        assert!(!cart.activity.any_pending());
    }
}
