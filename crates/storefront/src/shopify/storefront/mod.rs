//! Shopify Storefront API client implementation.
//!
//! Sends the documents in `queries` through `graphql_client` envelopes with
//! `reqwest` 0.13 for HTTP. Cart reads and writes are never cached here.

mod conversions;
pub mod queries;

use std::sync::Arc;

use async_trait::async_trait;
use graphql_client::{GraphQLQuery, Response};
use minicart_core::{CartId, CartLineId, CurrencyCode};
use secrecy::ExposeSecret;
use tracing::instrument;

use crate::cart::{CartBackend, CartError};
use crate::config::ShopifyStorefrontConfig;
use crate::shopify::types::{Cart, CartLineInput};
use crate::shopify::{GraphQLError, GraphQLErrorLocation, ShopifyError};

use conversions::{convert_cart, convert_user_error};
use queries::{
    AddCartLines, AddCartLinesVariables, CartPayload, CreateCart, CreateCartInput,
    CreateCartVariables, GetCart, GetCartVariables, LineInputVars, LineUpdateVars,
    RemoveCartLines, RemoveCartLinesVariables, UpdateCartLines, UpdateCartLinesVariables,
};

// =============================================================================
// StorefrontClient
// =============================================================================

/// Client for the Shopify Storefront API cart operations.
#[derive(Clone)]
pub struct StorefrontClient {
    inner: Arc<StorefrontClientInner>,
}

struct StorefrontClientInner {
    client: reqwest::Client,
    endpoint: String,
    access_token: String,
    fallback_currency: CurrencyCode,
}

impl StorefrontClient {
    /// Create a new Storefront API client.
    ///
    /// `fallback_currency` is used only when Shopify returns a currency code
    /// that cannot be parsed.
    #[must_use]
    pub fn new(config: &ShopifyStorefrontConfig, fallback_currency: CurrencyCode) -> Self {
        let endpoint = format!(
            "https://{}/api/{}/graphql.json",
            config.store, config.api_version
        );

        Self {
            inner: Arc::new(StorefrontClientInner {
                client: reqwest::Client::new(),
                endpoint,
                access_token: config.storefront_private_token.expose_secret().to_string(),
                fallback_currency,
            }),
        }
    }

    /// Execute a GraphQL query.
    async fn execute<Q: GraphQLQuery>(
        &self,
        variables: Q::Variables,
    ) -> Result<Q::ResponseData, ShopifyError> {
        let request_body = Q::build_query(variables);
        let operation = request_body.operation_name;

        let response = self
            .inner
            .client
            .post(&self.inner.endpoint)
            // Private access tokens use a different header than public tokens
            .header(
                "Shopify-Storefront-Private-Token",
                &self.inner.access_token,
            )
            .header("Content-Type", "application/json")
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(ShopifyError::RateLimited(retry_after));
        }

        // Body as text first for better error diagnostics
        let response_text = response.text().await?;

        if !status.is_success() {
            tracing::error!(
                operation,
                status = %status,
                body = %response_text.chars().take(500).collect::<String>(),
                "Shopify API returned non-success status"
            );
            return Err(ShopifyError::message(format!(
                "HTTP {status}: {}",
                response_text.chars().take(200).collect::<String>()
            )));
        }

        let response: Response<Q::ResponseData> = serde_json::from_str(&response_text).map_err(|e| {
            tracing::error!(
                operation,
                error = %e,
                body = %response_text.chars().take(500).collect::<String>(),
                "Failed to parse Shopify GraphQL response"
            );
            ShopifyError::Parse(e)
        })?;

        if let Some(errors) = response.errors
            && !errors.is_empty()
        {
            tracing::debug!(operation, errors = ?errors, "GraphQL errors in response");
            return Err(ShopifyError::GraphQL(
                errors.into_iter().map(convert_graphql_error).collect(),
            ));
        }

        response.data.ok_or_else(|| {
            tracing::error!(
                operation,
                "Shopify GraphQL response has no data and no errors"
            );
            ShopifyError::message("No data in response")
        })
    }

    /// Turn a mutation payload into a cart, surfacing user errors.
    fn cart_from_payload(
        &self,
        payload: Option<CartPayload>,
        failure: &str,
    ) -> Result<Cart, ShopifyError> {
        let Some(payload) = payload else {
            return Err(ShopifyError::message(failure));
        };

        if !payload.user_errors.is_empty() {
            return Err(ShopifyError::UserError(
                payload
                    .user_errors
                    .into_iter()
                    .map(|e| convert_user_error(e).message)
                    .collect::<Vec<_>>()
                    .join("; "),
            ));
        }

        payload
            .cart
            .map(|cart| convert_cart(cart, self.inner.fallback_currency))
            .ok_or_else(|| ShopifyError::message(failure))
    }

    // =========================================================================
    // Cart Methods
    // =========================================================================

    /// Get an existing cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart is not found or the API request fails.
    #[instrument(skip(self), fields(cart_id = %cart_id))]
    pub async fn get_cart(&self, cart_id: &CartId) -> Result<Cart, ShopifyError> {
        let data = self
            .execute::<GetCart>(GetCartVariables {
                cart_id: cart_id.to_string(),
            })
            .await?;

        data.cart
            .map(|cart| convert_cart(cart, self.inner.fallback_currency))
            .ok_or_else(|| ShopifyError::NotFound(format!("Cart not found: {cart_id}")))
    }

    /// Create a new cart containing `lines`.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart creation fails or user errors are returned.
    #[instrument(skip(self, lines))]
    pub async fn create_cart(&self, lines: Vec<CartLineInput>) -> Result<Cart, ShopifyError> {
        let data = self
            .execute::<CreateCart>(CreateCartVariables {
                input: CreateCartInput {
                    lines: lines.into_iter().map(line_input_vars).collect(),
                },
            })
            .await?;

        self.cart_from_payload(data.cart_create, "Failed to create cart")
    }

    /// Add lines to a cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart update fails or user errors are returned.
    #[instrument(skip(self, lines), fields(cart_id = %cart_id))]
    pub async fn add_to_cart(
        &self,
        cart_id: &CartId,
        lines: Vec<CartLineInput>,
    ) -> Result<Cart, ShopifyError> {
        let data = self
            .execute::<AddCartLines>(AddCartLinesVariables {
                cart_id: cart_id.to_string(),
                lines: lines.into_iter().map(line_input_vars).collect(),
            })
            .await?;

        self.cart_from_payload(data.cart_lines_add, "Failed to add to cart")
    }

    /// Set the quantity of a single cart line.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart update fails or user errors are returned.
    #[instrument(skip(self), fields(cart_id = %cart_id, line_id = %line_id))]
    pub async fn update_cart_line(
        &self,
        cart_id: &CartId,
        line_id: &CartLineId,
        quantity: u32,
    ) -> Result<Cart, ShopifyError> {
        let data = self
            .execute::<UpdateCartLines>(UpdateCartLinesVariables {
                cart_id: cart_id.to_string(),
                lines: vec![LineUpdateVars {
                    id: line_id.to_string(),
                    quantity: i64::from(quantity),
                }],
            })
            .await?;

        self.cart_from_payload(data.cart_lines_update, "Failed to update cart")
    }

    /// Remove lines from a cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the cart update fails or user errors are returned.
    #[instrument(skip(self, line_ids), fields(cart_id = %cart_id))]
    pub async fn remove_from_cart(
        &self,
        cart_id: &CartId,
        line_ids: Vec<CartLineId>,
    ) -> Result<Cart, ShopifyError> {
        let data = self
            .execute::<RemoveCartLines>(RemoveCartLinesVariables {
                cart_id: cart_id.to_string(),
                line_ids: line_ids.into_iter().map(CartLineId::into_inner).collect(),
            })
            .await?;

        self.cart_from_payload(data.cart_lines_remove, "Failed to remove from cart")
    }
}

#[async_trait]
impl CartBackend for StorefrontClient {
    async fn fetch_cart(&self, cart_id: &CartId) -> Result<Cart, CartError> {
        Ok(self.get_cart(cart_id).await?)
    }

    async fn create_cart(&self, lines: Vec<CartLineInput>) -> Result<Cart, CartError> {
        Ok(Self::create_cart(self, lines).await?)
    }

    async fn add_lines(
        &self,
        cart_id: &CartId,
        lines: Vec<CartLineInput>,
    ) -> Result<Cart, CartError> {
        Ok(self.add_to_cart(cart_id, lines).await?)
    }

    async fn set_line_quantity(
        &self,
        cart_id: &CartId,
        line_id: &CartLineId,
        quantity: u32,
    ) -> Result<Cart, CartError> {
        let cart = if quantity == 0 {
            self.remove_from_cart(cart_id, vec![line_id.clone()]).await?
        } else {
            self.update_cart_line(cart_id, line_id, quantity).await?
        };
        Ok(cart)
    }
}

fn line_input_vars(line: CartLineInput) -> LineInputVars {
    LineInputVars {
        merchandise_id: line.merchandise_id.into_inner(),
        quantity: i64::from(line.quantity),
    }
}

fn convert_graphql_error(error: graphql_client::Error) -> GraphQLError {
    GraphQLError {
        message: error.message,
        locations: error.locations.map_or_else(Vec::new, |locs| {
            locs.into_iter()
                .map(|l| GraphQLErrorLocation {
                    line: i64::from(l.line),
                    column: i64::from(l.column),
                })
                .collect()
        }),
        path: error.path.map_or_else(Vec::new, |p| {
            p.into_iter()
                .map(|fragment| match fragment {
                    graphql_client::PathFragment::Key(s) => serde_json::Value::String(s),
                    graphql_client::PathFragment::Index(i) => serde_json::Value::Number(i.into()),
                })
                .collect()
        }),
    }
}
