//! Shared cart snapshot with a single writer path.
//!
//! Every reader gets the same `Arc<Cart>` until a write succeeds and the
//! backend's answer replaces it wholesale. Writes are applied one at a time,
//! so the snapshot published last is the one the backend produced last.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use minicart_core::{CartId, CartLineId};
use mockall::automock;
use tokio::sync::{Mutex, watch};
use tracing::{Instrument, Span, debug, instrument, warn};

use super::CartError;
use crate::shopify::types::{Cart, CartLineInput};

/// The cart as read at one point in time. `None` until the first load.
pub type CartSnapshot = Option<Arc<Cart>>;

/// Remote cart operations the store is built on.
///
/// Every write returns the full cart as the backend sees it afterwards.
#[automock]
#[async_trait]
pub trait CartBackend: Send + Sync {
    /// Fetch the current state of a cart.
    async fn fetch_cart(&self, cart_id: &CartId) -> Result<Cart, CartError>;

    /// Create a cart containing `lines`.
    async fn create_cart(&self, lines: Vec<CartLineInput>) -> Result<Cart, CartError>;

    /// Add lines to an existing cart.
    async fn add_lines(
        &self,
        cart_id: &CartId,
        lines: Vec<CartLineInput>,
    ) -> Result<Cart, CartError>;

    /// Set one line's quantity. Zero removes the line.
    async fn set_line_quantity(
        &self,
        cart_id: &CartId,
        line_id: &CartLineId,
        quantity: u32,
    ) -> Result<Cart, CartError>;
}

/// Shared, externally-owned cart state for one cart.
///
/// Writes run on their own task while holding the writer lock, so a backend
/// answer is published even when the request that asked for it goes away.
pub struct CartStore {
    cart_id: CartId,
    backend: Arc<dyn CartBackend>,
    snapshot: Arc<watch::Sender<CartSnapshot>>,
    writer: Arc<Mutex<()>>,
}

impl std::fmt::Debug for CartStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartStore")
            .field("cart_id", &self.cart_id)
            .field("loaded", &self.snapshot.borrow().is_some())
            .finish_non_exhaustive()
    }
}

impl CartStore {
    /// Create a store that has not loaded its cart yet.
    #[must_use]
    pub fn new(cart_id: CartId, backend: Arc<dyn CartBackend>) -> Self {
        let (snapshot, _) = watch::channel(None);
        Self {
            cart_id,
            backend,
            snapshot: Arc::new(snapshot),
            writer: Arc::new(Mutex::new(())),
        }
    }

    /// Create a store seeded with a cart the backend just returned.
    #[must_use]
    pub fn with_snapshot(cart: Cart, backend: Arc<dyn CartBackend>) -> Self {
        let store = Self::new(cart.id.clone(), backend);
        store.snapshot.send_replace(Some(Arc::new(cart)));
        store
    }

    /// The cart this store tracks.
    #[must_use]
    pub const fn id(&self) -> &CartId {
        &self.cart_id
    }

    /// The latest published snapshot.
    #[must_use]
    pub fn read(&self) -> CartSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Watch for republished snapshots.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CartSnapshot> {
        self.snapshot.subscribe()
    }

    /// Reload the cart from the backend.
    ///
    /// # Errors
    ///
    /// Returns the backend error; the previous snapshot is kept.
    #[instrument(skip(self), fields(cart_id = %self.cart_id))]
    pub async fn refresh(&self) -> Result<(), CartError> {
        self.write(|backend, cart_id| async move { backend.fetch_cart(&cart_id).await })
            .await
    }

    /// Set a line's quantity; zero removes it.
    ///
    /// Resolves once the backend has answered and the new snapshot is
    /// published. Dropping the returned future does not cancel the write.
    ///
    /// # Errors
    ///
    /// Returns the backend error; the previous snapshot is kept.
    #[instrument(skip(self), fields(cart_id = %self.cart_id, line_id = %line_id))]
    pub async fn update(&self, line_id: &CartLineId, quantity: u32) -> Result<(), CartError> {
        let line_id = line_id.clone();
        self.write(move |backend, cart_id| async move {
            backend
                .set_line_quantity(&cart_id, &line_id, quantity)
                .await
        })
        .await
    }

    /// Add lines to the cart.
    ///
    /// # Errors
    ///
    /// Returns the backend error; the previous snapshot is kept.
    #[instrument(skip(self, lines), fields(cart_id = %self.cart_id))]
    pub async fn add(&self, lines: Vec<CartLineInput>) -> Result<(), CartError> {
        self.write(move |backend, cart_id| async move { backend.add_lines(&cart_id, lines).await })
            .await
    }

    /// Run one backend call under the writer lock and publish its answer.
    async fn write<F, Fut>(&self, call: F) -> Result<(), CartError>
    where
        F: FnOnce(Arc<dyn CartBackend>, CartId) -> Fut + Send + 'static,
        Fut: Future<Output = Result<Cart, CartError>> + Send + 'static,
    {
        let writer = Arc::clone(&self.writer);
        let snapshot = Arc::clone(&self.snapshot);
        let backend = Arc::clone(&self.backend);
        let cart_id = self.cart_id.clone();

        let task = tokio::spawn(
            async move {
                let _writer = writer.lock_owned().await;
                match call(backend, cart_id.clone()).await {
                    Ok(cart) => {
                        publish(&snapshot, &cart_id, cart);
                        Ok(())
                    }
                    Err(e) => {
                        warn!(error = %e, "Cart write failed, keeping last snapshot");
                        Err(e)
                    }
                }
            }
            .instrument(Span::current()),
        );

        task.await
            .unwrap_or_else(|e| Err(CartError::Unavailable(format!("cart write aborted: {e}"))))
    }
}

fn publish(snapshot: &watch::Sender<CartSnapshot>, cart_id: &CartId, cart: Cart) {
    if &cart.id != cart_id {
        warn!(returned = %cart.id, "Backend returned a different cart ID");
    }
    debug!(lines = cart.lines.len(), "Publishing cart snapshot");
    snapshot.send_replace(Some(Arc::new(cart)));
}
