//! Live carts of this process.
//!
//! Every session that references a cart shares one [`ActiveCart`], so all
//! requests for that cart read the same snapshot and go through the same
//! writer. Carts idle for 30 minutes are dropped and reloaded on next use.

use std::sync::Arc;
use std::time::Duration;

use minicart_core::{CartId, CurrencyCode, MerchandiseId};
use moka::future::Cache;
use tracing::{debug, instrument};

use super::{CartBackend, CartError, CartStore, LineActivity};
use crate::analytics::{AnalyticsSink, CartEvent};
use crate::shopify::types::CartLineInput;

/// A cart's store together with its per-line activity.
#[derive(Clone)]
pub struct ActiveCart {
    pub store: Arc<CartStore>,
    pub activity: Arc<LineActivity>,
    pub analytics: Arc<dyn AnalyticsSink>,
}

impl ActiveCart {
    #[must_use]
    pub fn new(store: CartStore, analytics: Arc<dyn AnalyticsSink>) -> Self {
        Self {
            store: Arc::new(store),
            activity: Arc::new(LineActivity::new()),
            analytics,
        }
    }

    /// Currency of the current snapshot, if one is loaded.
    #[must_use]
    pub fn currency(&self) -> Option<CurrencyCode> {
        self.store
            .read()
            .map(|snapshot| snapshot.cost.total.currency_code)
    }

    /// Add merchandise and report it once the store has published.
    ///
    /// # Errors
    ///
    /// Returns the store's error; nothing is reported on failure.
    pub async fn add(&self, lines: Vec<CartLineInput>) -> Result<(), CartError> {
        let requested = requested(&lines);
        self.store.add(lines).await?;
        self.notify_added(&requested);
        Ok(())
    }

    fn notify_added(&self, requested: &[(MerchandiseId, u32)]) {
        let Some(snapshot) = self.store.read() else {
            return;
        };

        for (merchandise_id, quantity) in requested {
            if let Some(line) = snapshot
                .lines
                .iter()
                .find(|l| &l.merchandise.id == merchandise_id)
            {
                self.analytics.notify(&CartEvent::added(
                    &snapshot.id,
                    line,
                    *quantity,
                    snapshot.cost.total.currency_code,
                ));
            }
        }
    }
}

fn requested(lines: &[CartLineInput]) -> Vec<(MerchandiseId, u32)> {
    lines
        .iter()
        .map(|l| (l.merchandise_id.clone(), l.quantity))
        .collect()
}

impl std::fmt::Debug for ActiveCart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActiveCart")
            .field("store", &self.store)
            .field("activity", &self.activity)
            .finish_non_exhaustive()
    }
}

/// Cart ID to live cart map.
#[derive(Clone)]
pub struct CartRegistry {
    carts: Cache<CartId, ActiveCart>,
    backend: Arc<dyn CartBackend>,
    analytics: Arc<dyn AnalyticsSink>,
}

impl CartRegistry {
    #[must_use]
    pub fn new(backend: Arc<dyn CartBackend>, analytics: Arc<dyn AnalyticsSink>) -> Self {
        let carts = Cache::builder()
            .max_capacity(10_000)
            .time_to_idle(Duration::from_secs(30 * 60))
            .build();

        Self {
            carts,
            backend,
            analytics,
        }
    }

    /// The live cart for `cart_id`, loading it on first access.
    ///
    /// Concurrent first accesses share a single load.
    ///
    /// # Errors
    ///
    /// Returns the backend error if the cart cannot be loaded.
    #[instrument(skip(self), fields(cart_id = %cart_id))]
    pub async fn get(&self, cart_id: &CartId) -> Result<ActiveCart, CartError> {
        self.carts
            .try_get_with(cart_id.clone(), async {
                debug!("Loading cart into registry");
                let cart = self.backend.fetch_cart(cart_id).await?;
                Ok::<_, CartError>(self.activate(CartStore::with_snapshot(
                    cart,
                    self.backend.clone(),
                )))
            })
            .await
            .map_err(|e| {
                Arc::try_unwrap(e).unwrap_or_else(|shared| CartError::Unavailable(shared.to_string()))
            })
    }

    /// Create a cart holding `lines` and register it.
    ///
    /// # Errors
    ///
    /// Returns the backend error if the cart cannot be created.
    #[instrument(skip(self, lines))]
    pub async fn create(&self, lines: Vec<CartLineInput>) -> Result<ActiveCart, CartError> {
        let requested = requested(&lines);
        let cart = self.backend.create_cart(lines).await?;
        let active = self.activate(CartStore::with_snapshot(cart, self.backend.clone()));
        active.notify_added(&requested);

        self.carts
            .insert(active.store.id().clone(), active.clone())
            .await;
        Ok(active)
    }

    /// Drop a cart, e.g. after the backend reported it gone.
    pub async fn forget(&self, cart_id: &CartId) {
        self.carts.invalidate(cart_id).await;
    }

    fn activate(&self, store: CartStore) -> ActiveCart {
        ActiveCart::new(store, self.analytics.clone())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::analytics::{MockAnalyticsSink, TracingAnalytics};
    use crate::cart::MockCartBackend;
    use crate::cart::fixtures::{ScriptedBackend, cart, line};
    use crate::shopify::ShopifyError;

    #[tokio::test]
    async fn test_get_loads_once_and_shares_store() {
        let mut backend = MockCartBackend::new();
        backend
            .expect_fetch_cart()
            .times(1)
            .returning(|_| Ok(cart(vec![line("l1", 1, "50", "45")])));
        let registry = CartRegistry::new(Arc::new(backend), Arc::new(TracingAnalytics));

        let first = registry.get(&CartId::new("c1")).await.unwrap();
        let second = registry.get(&CartId::new("c1")).await.unwrap();

        assert!(Arc::ptr_eq(&first.store, &second.store));
        assert!(Arc::ptr_eq(&first.activity, &second.activity));
    }

    #[tokio::test]
    async fn test_get_keeps_error_kind() {
        let mut backend = MockCartBackend::new();
        backend
            .expect_fetch_cart()
            .returning(|id| Err(CartError::Shopify(ShopifyError::NotFound(id.to_string()))));
        let registry = CartRegistry::new(Arc::new(backend), Arc::new(TracingAnalytics));

        let err = registry.get(&CartId::new("gone")).await.unwrap_err();
        assert!(err.is_missing_cart());
    }

    #[tokio::test]
    async fn test_create_registers_and_notifies() {
        let backend = Arc::new(ScriptedBackend::new(cart(vec![])));
        let mut analytics = MockAnalyticsSink::new();
        analytics.expect_notify().times(1).return_const(());
        let registry = CartRegistry::new(backend, Arc::new(analytics));

        let active = registry
            .create(vec![CartLineInput {
                merchandise_id: "v1".into(),
                quantity: 2,
            }])
            .await
            .unwrap();
        let again = registry.get(active.store.id()).await.unwrap();

        assert!(Arc::ptr_eq(&active.store, &again.store));
        assert_eq!(again.store.read().unwrap().total_quantity, 2);
    }

    #[tokio::test]
    async fn test_forget_reloads() {
        let mut backend = MockCartBackend::new();
        backend
            .expect_fetch_cart()
            .times(2)
            .returning(|_| Ok(cart(vec![])));
        let registry = CartRegistry::new(Arc::new(backend), Arc::new(TracingAnalytics));

        let first = registry.get(&CartId::new("c1")).await.unwrap();
        registry.forget(&CartId::new("c1")).await;
        let second = registry.get(&CartId::new("c1")).await.unwrap();

        assert!(!Arc::ptr_eq(&first.store, &second.store));
    }

    #[tokio::test]
    async fn test_add_notifies_after_publish() {
        let backend = Arc::new(ScriptedBackend::new(cart(vec![])));
        let mut analytics = MockAnalyticsSink::new();
        analytics
            .expect_notify()
            .withf(|e| e.items[0].item_id == "v7" && e.items[0].quantity == 3)
            .times(1)
            .return_const(());
        let active = ActiveCart::new(
            CartStore::with_snapshot(backend.current(), backend.clone()),
            Arc::new(analytics),
        );

        active
            .add(vec![CartLineInput {
                merchandise_id: "v7".into(),
                quantity: 3,
            }])
            .await
            .unwrap();
        assert_eq!(active.store.read().unwrap().lines.len(), 1);
    }

    #[test]
    fn test_currency_follows_snapshot() {
        use crate::cart::fixtures::in_currency;

        let backend: Arc<dyn CartBackend> = Arc::new(MockCartBackend::new());
        let unloaded = ActiveCart::new(
            CartStore::new(CartId::new("c1"), backend.clone()),
            Arc::new(TracingAnalytics),
        );
        assert_eq!(unloaded.currency(), None);

        let usd = ActiveCart::new(
            CartStore::with_snapshot(in_currency(cart(vec![]), CurrencyCode::USD), backend),
            Arc::new(TracingAnalytics),
        );
        assert_eq!(usd.currency(), Some(CurrencyCode::USD));
    }
}
