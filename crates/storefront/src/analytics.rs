//! Cart analytics events.
//!
//! Sinks are fire-and-forget: `notify` never fails and never blocks on I/O,
//! so a broken analytics endpoint cannot affect a cart mutation.

use std::sync::Arc;

use minicart_core::{CartId, CurrencyCode};
use mockall::automock;
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::AnalyticsConfig;
use crate::error::add_breadcrumb;
use crate::shopify::types::CartLine;

/// GA4 Measurement Protocol collection endpoint.
const GA4_COLLECT_URL: &str = "https://www.google-analytics.com/mp/collect";

/// GA4 recommended e-commerce event names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CartEventName {
    AddToCart,
    RemoveFromCart,
    UpdateCart,
}

impl CartEventName {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AddToCart => "add_to_cart",
            Self::RemoveFromCart => "remove_from_cart",
            Self::UpdateCart => "update_cart",
        }
    }
}

/// One item in an event payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventItem {
    pub item_id: String,
    pub item_name: String,
    pub price: Decimal,
    pub quantity: u32,
}

/// A successful user-initiated cart change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartEvent {
    #[serde(skip)]
    pub cart_id: CartId,
    #[serde(skip)]
    pub name: CartEventName,
    pub currency: CurrencyCode,
    pub value: Decimal,
    pub items: Vec<EventItem>,
}

impl CartEvent {
    /// Event for `line` moving to `quantity`.
    ///
    /// Growth is `add_to_cart`, shrinkage (including removal) is
    /// `remove_from_cart`, and an unchanged quantity is `update_cart`. The
    /// item quantity is the size of the change.
    #[must_use]
    pub fn line_change(
        cart_id: &CartId,
        line: &CartLine,
        quantity: u32,
        currency: CurrencyCode,
    ) -> Self {
        let (name, delta) = match quantity.cmp(&line.quantity) {
            std::cmp::Ordering::Greater => (CartEventName::AddToCart, quantity - line.quantity),
            std::cmp::Ordering::Less => (CartEventName::RemoveFromCart, line.quantity - quantity),
            std::cmp::Ordering::Equal => (CartEventName::UpdateCart, quantity),
        };
        let price = line.cost.amount_per_quantity.amount;

        Self {
            cart_id: cart_id.clone(),
            name,
            currency,
            value: price * Decimal::from(delta),
            items: vec![EventItem {
                item_id: line.merchandise.id.to_string(),
                item_name: line.merchandise.product.title.clone(),
                price,
                quantity: delta,
            }],
        }
    }

    /// Event for merchandise added through the add-to-cart form.
    #[must_use]
    pub fn added(cart_id: &CartId, line: &CartLine, quantity: u32, currency: CurrencyCode) -> Self {
        let price = line.cost.amount_per_quantity.amount;
        Self {
            cart_id: cart_id.clone(),
            name: CartEventName::AddToCart,
            currency,
            value: price * Decimal::from(quantity),
            items: vec![EventItem {
                item_id: line.merchandise.id.to_string(),
                item_name: line.merchandise.product.title.clone(),
                price,
                quantity,
            }],
        }
    }
}

/// Destination for cart analytics events.
#[automock]
pub trait AnalyticsSink: Send + Sync {
    /// Record an event. Must not block and must not fail.
    fn notify(&self, event: &CartEvent);
}

/// Logs events and leaves a Sentry breadcrumb.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAnalytics;

impl AnalyticsSink for TracingAnalytics {
    fn notify(&self, event: &CartEvent) {
        info!(
            event = event.name.as_str(),
            cart_id = %event.cart_id,
            currency = %event.currency,
            value = %event.value,
            "Cart analytics event"
        );

        let value = event.value.to_string();
        add_breadcrumb(
            "cart",
            event.name.as_str(),
            Some(&[("cart_id", event.cart_id.as_str()), ("value", &value)]),
        );
    }
}

/// Sends events to the GA4 Measurement Protocol.
#[derive(Clone)]
pub struct Ga4Analytics {
    client: reqwest::Client,
    endpoint: Url,
}

#[derive(Serialize)]
struct Ga4Payload<'a> {
    client_id: &'a str,
    events: [Ga4Event<'a>; 1],
}

#[derive(Serialize)]
struct Ga4Event<'a> {
    name: &'static str,
    params: &'a CartEvent,
}

impl Ga4Analytics {
    /// Create a GA4 sink.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection URL cannot be built.
    pub fn new(measurement_id: &str, api_secret: &SecretString) -> Result<Self, url::ParseError> {
        let endpoint = Url::parse_with_params(
            GA4_COLLECT_URL,
            &[
                ("measurement_id", measurement_id),
                ("api_secret", api_secret.expose_secret()),
            ],
        )?;

        Ok(Self {
            client: reqwest::Client::new(),
            endpoint,
        })
    }

    fn body(event: &CartEvent) -> serde_json::Result<String> {
        serde_json::to_string(&Ga4Payload {
            client_id: event.cart_id.as_str(),
            events: [Ga4Event {
                name: event.name.as_str(),
                params: event,
            }],
        })
    }
}

impl AnalyticsSink for Ga4Analytics {
    fn notify(&self, event: &CartEvent) {
        TracingAnalytics.notify(event);

        let body = match Self::body(event) {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "Failed to encode GA4 event");
                return;
            }
        };

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("No async runtime, dropping GA4 event");
            return;
        };

        let client = self.client.clone();
        let endpoint = self.endpoint.clone();
        let name = event.name.as_str();
        runtime.spawn(async move {
            let result = client
                .post(endpoint)
                .header("Content-Type", "application/json")
                .body(body)
                .send()
                .await;

            match result {
                Ok(response) if response.status().is_success() => {
                    debug!(event = name, "GA4 event sent");
                }
                Ok(response) => {
                    warn!(event = name, status = %response.status(), "GA4 rejected event");
                }
                Err(e) => warn!(event = name, error = %e, "Failed to send GA4 event"),
            }
        });
    }
}

/// Pick the sink the configuration allows.
///
/// GA4 needs both a measurement ID and an API secret; otherwise events are
/// only logged.
#[must_use]
pub fn analytics_from_config(config: &AnalyticsConfig) -> Arc<dyn AnalyticsSink> {
    if let (Some(id), Some(secret)) = (&config.ga4_measurement_id, &config.ga4_api_secret) {
        match Ga4Analytics::new(id, secret) {
            Ok(sink) => return Arc::new(sink),
            Err(e) => warn!(error = %e, "Invalid GA4 configuration, logging events only"),
        }
    }
    Arc::new(TracingAnalytics)
}
