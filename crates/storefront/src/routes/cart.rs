//! Cart route handlers.
//!
//! Cart operations use HTMX for dynamic updates without full page reloads.
//! Cart IDs are stored in the session and resolved to live carts through the
//! registry, so every request for a cart shares one snapshot.
//!
//! Line mutations never produce an error page: on failure the drawer is
//! re-rendered from the last good snapshot and the failure is logged.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{AppendHeaders, IntoResponse, Redirect, Response},
};
use minicart_core::{CartId, CartLineId, MerchandiseId};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{debug, instrument, warn};

use crate::cart::{
    ActiveCart, CartError, CartSettings, DrawerLabels, DrawerView, LineItemController,
    MutationOutcome, PopulatedDrawer, render_drawer, visibility,
};
use crate::error::{AppError, Result};
use crate::models::session_keys;
use crate::shopify::types::CartLineInput;
use crate::state::AppState;

/// HTMX event fired after any successful cart change.
const CART_UPDATED: &str = "cart-updated";

// =============================================================================
// Templates
// =============================================================================

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub cart: Option<PopulatedDrawer>,
    pub labels: &'static DrawerLabels,
    pub open: bool,
}

/// Cart drawer fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_drawer.html")]
pub struct CartDrawerTemplate {
    pub cart: Option<PopulatedDrawer>,
    pub labels: &'static DrawerLabels,
    pub open: bool,
}

impl CartDrawerTemplate {
    fn new(view: DrawerView, settings: &CartSettings, open: bool) -> Self {
        Self {
            cart: match view {
                DrawerView::Populated(drawer) => Some(drawer),
                DrawerView::Empty => None,
            },
            labels: DrawerLabels::for_locale(settings.locale),
            open,
        }
    }
}

/// Cart count badge fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_count.html")]
pub struct CartCountTemplate {
    pub count: u32,
}

// =============================================================================
// Forms
// =============================================================================

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub variant_id: String,
    pub quantity: Option<u32>,
}

/// Update cart form data.
///
/// `index` and `line_id` are what the shopper saw when the drawer rendered.
#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub index: usize,
    pub line_id: String,
    pub quantity: u32,
}

/// Remove from cart form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub index: usize,
    pub line_id: String,
}

// =============================================================================
// Session Helpers
// =============================================================================

/// Get the cart ID from the session.
async fn get_cart_id(session: &Session) -> Option<CartId> {
    session
        .get::<CartId>(session_keys::CART_ID)
        .await
        .ok()
        .flatten()
}

/// Set the cart ID in the session.
async fn set_cart_id(session: &Session, cart_id: &CartId) {
    if let Err(e) = session.insert(session_keys::CART_ID, cart_id).await {
        tracing::error!("Failed to save cart ID to session: {e}");
    }
}

/// The live cart of this session, if it still exists.
///
/// A cart the backend no longer knows is dropped from the session and the
/// registry; other load failures keep the session pointer for a later retry.
async fn current_cart(state: &AppState, session: &Session) -> Option<ActiveCart> {
    let cart_id = get_cart_id(session).await?;

    match state.carts().get(&cart_id).await {
        Ok(cart) => Some(cart),
        Err(e) => {
            warn!(cart_id = %cart_id, error = %e, "Failed to load cart");
            if e.is_missing_cart() {
                forget_cart(state, session, &cart_id).await;
            }
            None
        }
    }
}

async fn forget_cart(state: &AppState, session: &Session, cart_id: &CartId) {
    state.carts().forget(cart_id).await;
    if let Err(e) = session.remove::<CartId>(session_keys::CART_ID).await {
        warn!("Failed to clear cart ID from session: {e}");
    }
}

/// The session's cart re-read from the backend, for rendering a fresh drawer.
///
/// A failed re-read keeps the last snapshot, except when the cart is gone.
async fn refreshed_cart(state: &AppState, session: &Session) -> Option<ActiveCart> {
    let cart = current_cart(state, session).await?;

    match cart.store.refresh().await {
        Ok(()) => Some(cart),
        Err(e) if e.is_missing_cart() => {
            warn!(cart_id = %cart.store.id(), "Cart disappeared upstream");
            forget_cart(state, session, cart.store.id()).await;
            None
        }
        Err(e) => {
            warn!(
                cart_id = %cart.store.id(),
                error = %e,
                "Failed to re-read cart, showing last snapshot"
            );
            Some(cart)
        }
    }
}

fn drawer(state: &AppState, cart: Option<&ActiveCart>, open: bool) -> CartDrawerTemplate {
    let settings = state.cart_settings();
    CartDrawerTemplate::new(render_drawer(cart, settings), settings, open)
}

// =============================================================================
// Handlers
// =============================================================================

/// Display cart page with the drawer open, re-reading the cart from Shopify.
#[instrument(skip(state, session))]
pub async fn show(State(state): State<AppState>, session: Session) -> impl IntoResponse {
    visibility::set_open(&session, true).await;
    let cart = refreshed_cart(&state, &session).await;

    let CartDrawerTemplate { cart, labels, open } = drawer(&state, cart.as_ref(), true);
    CartShowTemplate { cart, labels, open }
}

/// Open the drawer (HTMX), re-reading the cart from Shopify.
#[instrument(skip(state, session))]
pub async fn open_drawer(State(state): State<AppState>, session: Session) -> impl IntoResponse {
    visibility::set_open(&session, true).await;
    let cart = refreshed_cart(&state, &session).await;
    drawer(&state, cart.as_ref(), true)
}

/// Close the drawer: the empty state's "continue shopping" action (HTMX).
#[instrument(skip(state, session))]
pub async fn close_drawer(State(state): State<AppState>, session: Session) -> impl IntoResponse {
    visibility::set_open(&session, false).await;
    let cart = current_cart(&state, &session).await;
    drawer(&state, cart.as_ref(), false)
}

/// Add item to cart (HTMX).
///
/// Creates a new cart if one doesn't exist, or adds to existing cart.
/// Returns the count badge with an HTMX trigger so the drawer refreshes.
#[instrument(skip(state, session))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<AddToCartForm>,
) -> Result<Response> {
    let variant_id = form.variant_id.trim();
    if variant_id.is_empty() {
        return Err(AppError::BadRequest("variant_id is required".to_string()));
    }
    let quantity = form.quantity.unwrap_or(1);
    if quantity == 0 {
        return Err(AppError::BadRequest("quantity must be at least 1".to_string()));
    }

    let lines = vec![CartLineInput {
        merchandise_id: MerchandiseId::new(variant_id),
        quantity,
    }];

    let result = match current_cart(&state, &session).await {
        Some(cart) => match cart.add(lines).await {
            Ok(()) => Ok(cart),
            Err(e) => Err(e),
        },
        None => match state.carts().create(lines).await {
            Ok(cart) => {
                set_cart_id(&session, cart.store.id()).await;
                Ok(cart)
            }
            Err(e) => Err(e),
        },
    };

    match result {
        Ok(cart) => {
            let count = cart.store.read().map_or(0, |c| c.total_quantity);
            Ok((
                AppendHeaders([("HX-Trigger", CART_UPDATED)]),
                CartCountTemplate { count },
            )
                .into_response())
        }
        Err(e) => {
            warn!(error = %e, "Failed to add item to cart");
            Ok(count_for(&state, &session).await.into_response())
        }
    }
}

/// Update cart item quantity (HTMX).
#[instrument(skip(state, session))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<UpdateCartForm>,
) -> Response {
    let Some(cart) = current_cart(&state, &session).await else {
        let open = visibility::is_open(&session).await;
        return drawer(&state, None, open).into_response();
    };

    let settings = state.cart_settings();
    let currency = cart.currency().unwrap_or(settings.currency);
    let result = LineItemController::new(&cart, form.index, settings.locale, currency)
        .expect_line(CartLineId::new(form.line_id))
        .set_quantity(form.quantity)
        .await;

    settled(&state, &session, &cart, result).await
}

/// Remove item from cart (HTMX).
#[instrument(skip(state, session))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RemoveFromCartForm>,
) -> Response {
    let Some(cart) = current_cart(&state, &session).await else {
        let open = visibility::is_open(&session).await;
        return drawer(&state, None, open).into_response();
    };

    let settings = state.cart_settings();
    let currency = cart.currency().unwrap_or(settings.currency);
    let result = LineItemController::new(&cart, form.index, settings.locale, currency)
        .expect_line(CartLineId::new(form.line_id))
        .remove()
        .await;

    settled(&state, &session, &cart, result).await
}

/// Render the drawer after a line mutation settled, whatever the outcome.
///
/// Mutations leave the drawer's visibility as the shopper last set it.
async fn settled(
    state: &AppState,
    session: &Session,
    cart: &ActiveCart,
    result: std::result::Result<MutationOutcome, CartError>,
) -> Response {
    let open = visibility::is_open(session).await;

    match result {
        Ok(MutationOutcome::Applied) => {
            return (
                AppendHeaders([("HX-Trigger", CART_UPDATED)]),
                drawer(state, Some(cart), open),
            )
                .into_response();
        }
        Ok(MutationOutcome::Stale) => debug!("Line moved since render, showing current cart"),
        Err(CartError::GiftLocked(line_id)) => {
            debug!(line_id = %line_id, "Ignored quantity change on gift line");
        }
        Err(e) => {
            warn!(error = %e, "Cart mutation failed, showing last snapshot");
            if e.is_missing_cart() {
                forget_cart(state, session, cart.store.id()).await;
                return drawer(state, None, open).into_response();
            }
        }
    }

    drawer(state, Some(cart), open).into_response()
}

async fn count_for(state: &AppState, session: &Session) -> CartCountTemplate {
    let count = current_cart(state, session)
        .await
        .and_then(|cart| cart.store.read())
        .map_or(0, |c| c.total_quantity);
    CartCountTemplate { count }
}

/// Get cart count badge (HTMX).
#[instrument(skip(state, session))]
pub async fn count(State(state): State<AppState>, session: Session) -> impl IntoResponse {
    count_for(&state, &session).await
}

/// Redirect to Shopify checkout.
///
/// Falls back to the cart page while checkout is disabled: no lines, or a
/// line mutation still in flight.
#[instrument(skip(state, session))]
pub async fn checkout(State(state): State<AppState>, session: Session) -> Response {
    let Some(cart) = current_cart(&state, &session).await else {
        return Redirect::to("/cart").into_response();
    };

    match render_drawer(Some(&cart), state.cart_settings()) {
        DrawerView::Populated(drawer) if !drawer.checkout_disabled => {
            Redirect::to(&drawer.checkout_url).into_response()
        }
        _ => Redirect::to("/cart").into_response(),
    }
}
