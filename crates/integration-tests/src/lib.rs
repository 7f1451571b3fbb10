//! Integration test harness for the minicart storefront.
//!
//! Tests drive the real router in process: requests go through the session
//! layer, the cart registry and the askama templates, while Shopify is
//! replaced by [`MemoryBackend`].
//!
//! ```rust,ignore
//! let app = TestApp::new();
//! let added = app.post("/cart/add", "variant_id=tee-blue&quantity=2").await;
//! assert_eq!(added.status, StatusCode::OK);
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode, header};
use minicart_core::{CartId, CartLineId, CurrencyCode, MerchandiseId};
use minicart_storefront::analytics::{AnalyticsSink, CartEvent, CartEventName};
use minicart_storefront::cart::{CartBackend, CartError, CartSettings};
use minicart_storefront::config::{AnalyticsConfig, ShopifyStorefrontConfig, StorefrontConfig};
use minicart_storefront::routes;
use minicart_storefront::shopify::types::{
    Cart, CartCost, CartLine, CartLineCost, CartLineInput, CartMerchandise,
    CartMerchandiseProduct, Money,
};
use minicart_storefront::state::AppState;
use rust_decimal::Decimal;
use secrecy::SecretString;
use tower::ServiceExt;

// =============================================================================
// Catalog
// =============================================================================

/// A purchasable variant known to [`MemoryBackend`].
#[derive(Debug, Clone)]
pub struct Variant {
    pub title: &'static str,
    pub product_title: &'static str,
    pub handle: &'static str,
    pub price: Decimal,
    pub compare_at: Option<Decimal>,
}

/// Variants every test can add: a discounted tee and a free gift.
#[must_use]
pub fn catalog() -> HashMap<MerchandiseId, Variant> {
    HashMap::from([
        (
            MerchandiseId::new("tee-blue"),
            Variant {
                title: "Azul",
                product_title: "Camiseta",
                handle: "camiseta",
                price: Decimal::from(45),
                compare_at: Some(Decimal::from(50)),
            },
        ),
        (
            MerchandiseId::new("gift-bag"),
            Variant {
                title: "Brinde",
                product_title: "Sacola",
                handle: "sacola",
                price: Decimal::ZERO,
                compare_at: None,
            },
        ),
    ])
}

// =============================================================================
// Backend
// =============================================================================

#[derive(Default)]
struct Carts {
    next_id: usize,
    next_line: usize,
    carts: HashMap<CartId, Cart>,
}

/// In-memory stand-in for the Storefront API cart endpoints.
///
/// Adding a variant already in the cart grows that line, like Shopify does.
pub struct MemoryBackend {
    catalog: HashMap<MerchandiseId, Variant>,
    state: Mutex<Carts>,
    failing: AtomicBool,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self {
            catalog: catalog(),
            state: Mutex::new(Carts::default()),
            failing: AtomicBool::new(false),
        }
    }
}

impl MemoryBackend {
    /// Make every following write fail as if Shopify were unreachable.
    pub fn fail_writes(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    /// Change a line directly upstream, as another device would.
    pub fn set_upstream_quantity(&self, cart_id: &CartId, line_id: &CartLineId, quantity: u32) {
        let mut carts = self.lock();
        if let Some(line) = carts
            .carts
            .get_mut(cart_id)
            .and_then(|cart| cart.lines.iter_mut().find(|line| &line.id == line_id))
        {
            line.quantity = quantity;
            reprice(line);
        }
        let _ = settle(&mut carts, cart_id);
    }

    fn check_writable(&self) -> Result<(), CartError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(CartError::Unavailable("backend unreachable".to_string()));
        }
        Ok(())
    }

    /// Current upstream copy of `cart_id`.
    #[must_use]
    pub fn cart(&self, cart_id: &CartId) -> Option<Cart> {
        self.lock().carts.get(cart_id).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Carts> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn new_line(&self, line_id: CartLineId, input: &CartLineInput) -> Result<CartLine, CartError> {
        let variant = self.catalog.get(&input.merchandise_id).ok_or_else(|| {
            CartError::Unavailable(format!("unknown merchandise {}", input.merchandise_id))
        })?;

        let mut line = CartLine {
            id: line_id,
            quantity: input.quantity,
            cost: CartLineCost {
                amount_per_quantity: brl(variant.price),
                compare_at_amount_per_quantity: variant.compare_at.map(brl),
                subtotal_amount: brl(Decimal::ZERO),
                total_amount: brl(Decimal::ZERO),
            },
            merchandise: CartMerchandise {
                id: input.merchandise_id.clone(),
                title: variant.title.to_string(),
                image: None,
                product: CartMerchandiseProduct {
                    handle: variant.handle.to_string(),
                    title: variant.product_title.to_string(),
                },
            },
        };
        reprice(&mut line);
        Ok(line)
    }

    fn add_to(&self, carts: &mut Carts, cart_id: &CartId, inputs: &[CartLineInput]) -> Result<Cart, CartError> {
        for input in inputs {
            let existing = carts
                .carts
                .get_mut(cart_id)
                .ok_or_else(|| CartError::NotFound(cart_id.clone()))?
                .lines
                .iter_mut()
                .find(|line| line.merchandise.id == input.merchandise_id);

            if let Some(line) = existing {
                line.quantity += input.quantity;
                reprice(line);
                continue;
            }

            carts.next_line += 1;
            let line = self.new_line(CartLineId::new(format!("line-{}", carts.next_line)), input)?;
            if let Some(cart) = carts.carts.get_mut(cart_id) {
                cart.lines.push(line);
            }
        }

        settle(carts, cart_id)
    }
}

#[async_trait]
impl CartBackend for MemoryBackend {
    async fn fetch_cart(&self, cart_id: &CartId) -> Result<Cart, CartError> {
        self.cart(cart_id)
            .ok_or_else(|| CartError::NotFound(cart_id.clone()))
    }

    async fn create_cart(&self, lines: Vec<CartLineInput>) -> Result<Cart, CartError> {
        self.check_writable()?;
        let mut carts = self.lock();
        carts.next_id += 1;
        let cart_id = CartId::new(format!("cart-{}", carts.next_id));
        carts.carts.insert(
            cart_id.clone(),
            Cart {
                id: cart_id.clone(),
                checkout_url: format!("https://shop.example/checkouts/{cart_id}"),
                total_quantity: 0,
                cost: CartCost {
                    subtotal: brl(Decimal::ZERO),
                    total: brl(Decimal::ZERO),
                },
                lines: Vec::new(),
            },
        );
        self.add_to(&mut carts, &cart_id, &lines)
    }

    async fn add_lines(
        &self,
        cart_id: &CartId,
        lines: Vec<CartLineInput>,
    ) -> Result<Cart, CartError> {
        self.check_writable()?;
        let mut carts = self.lock();
        self.add_to(&mut carts, cart_id, &lines)
    }

    async fn set_line_quantity(
        &self,
        cart_id: &CartId,
        line_id: &CartLineId,
        quantity: u32,
    ) -> Result<Cart, CartError> {
        self.check_writable()?;
        let mut carts = self.lock();
        let cart = carts
            .carts
            .get_mut(cart_id)
            .ok_or_else(|| CartError::NotFound(cart_id.clone()))?;

        if quantity == 0 {
            cart.lines.retain(|line| &line.id != line_id);
        } else if let Some(line) = cart.lines.iter_mut().find(|line| &line.id == line_id) {
            line.quantity = quantity;
            reprice(line);
        }

        settle(&mut carts, cart_id)
    }
}

fn brl(amount: Decimal) -> Money {
    Money {
        amount,
        currency_code: CurrencyCode::BRL,
    }
}

fn reprice(line: &mut CartLine) {
    let quantity = Decimal::from(line.quantity);
    let cost = &mut line.cost;
    let list_price = cost
        .compare_at_amount_per_quantity
        .unwrap_or(cost.amount_per_quantity);
    cost.subtotal_amount = brl(list_price.amount * quantity);
    cost.total_amount = brl(cost.amount_per_quantity.amount * quantity);
}

fn settle(carts: &mut Carts, cart_id: &CartId) -> Result<Cart, CartError> {
    let cart = carts
        .carts
        .get_mut(cart_id)
        .ok_or_else(|| CartError::NotFound(cart_id.clone()))?;

    cart.total_quantity = cart.lines.iter().map(|line| line.quantity).sum();
    cart.cost.subtotal = brl(cart.lines.iter().map(|l| l.cost.subtotal_amount.amount).sum());
    cart.cost.total = brl(cart.lines.iter().map(|l| l.cost.total_amount.amount).sum());
    Ok(cart.clone())
}

// =============================================================================
// Analytics
// =============================================================================

/// Keeps every event it receives, in order.
#[derive(Debug, Default)]
pub struct RecordingAnalytics {
    events: Mutex<Vec<CartEvent>>,
}

impl RecordingAnalytics {
    /// Names of the events seen so far.
    #[must_use]
    pub fn names(&self) -> Vec<CartEventName> {
        self.events
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .iter()
            .map(|event| event.name)
            .collect()
    }
}

impl AnalyticsSink for RecordingAnalytics {
    fn notify(&self, event: &CartEvent) {
        self.events
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(event.clone());
    }
}

// =============================================================================
// App
// =============================================================================

/// Configuration for a plain-HTTP test server with the default drawer settings.
///
/// # Panics
///
/// Panics if the hard-coded base URL does not parse.
#[must_use]
pub fn test_config() -> StorefrontConfig {
    StorefrontConfig {
        host: [127, 0, 0, 1].into(),
        port: 3000,
        base_url: url::Url::parse("http://localhost:3000").expect("valid base URL"),
        shopify: ShopifyStorefrontConfig {
            store: "test-store.myshopify.com".to_string(),
            api_version: "2026-01".to_string(),
            storefront_private_token: SecretString::from("shpat_integration_test_token"),
        },
        cart: CartSettings::default(),
        analytics: AnalyticsConfig::default(),
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 0.0,
        sentry_traces_sample_rate: 0.0,
    }
}

/// A collected response.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl TestResponse {
    /// Value of `name`, if present and valid UTF-8.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// The storefront router plus one shopper's session cookie.
pub struct TestApp {
    router: Router,
    pub backend: Arc<MemoryBackend>,
    pub analytics: Arc<RecordingAnalytics>,
    cookie: Mutex<Option<String>>,
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

impl TestApp {
    #[must_use]
    pub fn new() -> Self {
        let backend = Arc::new(MemoryBackend::default());
        let analytics = Arc::new(RecordingAnalytics::default());
        let state = AppState::with_backend(test_config(), backend.clone(), analytics.clone());

        Self {
            router: routes::app(state),
            backend,
            analytics,
            cookie: Mutex::new(None),
        }
    }

    /// Continue as a different shopper with no session yet.
    pub fn new_session(&self) {
        *self
            .cookie
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = None;
    }

    /// `GET path` as the current shopper.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.send(Request::get(path), Body::empty()).await
    }

    /// `POST path` with a url-encoded form body as the current shopper.
    pub async fn post(&self, path: &str, form: &str) -> TestResponse {
        let builder = Request::post(path).header(
            header::CONTENT_TYPE,
            "application/x-www-form-urlencoded",
        );
        self.send(builder, Body::from(form.to_string())).await
    }

    /// Send a request, replaying and then updating the session cookie.
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be built or the body cannot be read.
    async fn send(&self, mut builder: axum::http::request::Builder, body: Body) -> TestResponse {
        if let Some(cookie) = self.cookie().as_deref() {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = builder.body(body).expect("valid request");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .unwrap_or_else(|never| match never {});

        if let Some(set_cookie) = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            && let Some(pair) = set_cookie.split(';').next()
        {
            *self
                .cookie
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(pair.to_string());
        }

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("readable body");

        TestResponse {
            status,
            headers,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        }
    }

    fn cookie(&self) -> Option<String> {
        self.cookie
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}
