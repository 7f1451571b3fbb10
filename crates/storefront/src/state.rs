//! Application state shared across handlers.

use std::sync::Arc;

use crate::analytics::{AnalyticsSink, analytics_from_config};
use crate::cart::{CartBackend, CartRegistry, CartSettings};
use crate::config::StorefrontConfig;
use crate::shopify::StorefrontClient;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// configuration and the live carts.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    carts: CartRegistry,
}

impl AppState {
    /// Create the state backed by the Shopify Storefront API.
    #[must_use]
    pub fn new(config: StorefrontConfig) -> Self {
        let backend = Arc::new(StorefrontClient::new(&config.shopify, config.cart.currency));
        let analytics = analytics_from_config(&config.analytics);
        Self::with_backend(config, backend, analytics)
    }

    /// Create the state with an explicit cart backend and analytics sink.
    #[must_use]
    pub fn with_backend(
        config: StorefrontConfig,
        backend: Arc<dyn CartBackend>,
        analytics: Arc<dyn AnalyticsSink>,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                carts: CartRegistry::new(backend, analytics),
                config,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Drawer locale, currency and free-shipping target.
    #[must_use]
    pub fn cart_settings(&self) -> &CartSettings {
        &self.inner.config.cart
    }

    /// Live carts of this process.
    #[must_use]
    pub fn carts(&self) -> &CartRegistry {
        &self.inner.carts
    }
}
