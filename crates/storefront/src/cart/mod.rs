//! Cart drawer core.
//!
//! # Architecture
//!
//! - [`CartStore`] holds the one shared snapshot of a cart. Readers get an
//!   `Arc<Cart>`; the only writer path is the store's update, which replaces
//!   the snapshot with whatever the backend returns
//! - [`LineItemController`] wraps each line's mutations in a guard that marks
//!   the line pending for exactly as long as the store call is outstanding
//! - [`render_drawer`] derives the empty or populated drawer, totals and
//!   free-shipping progress from a single snapshot read
//! - [`CartRegistry`] shares one [`ActiveCart`] per cart ID across requests
//!
//! Concurrent writes to the same cart are applied one at a time in arrival
//! order. The snapshot published last wins.

mod error;
mod free_shipping;
mod labels;
mod line_item;
mod registry;
mod store;
mod view;
pub mod visibility;

#[cfg(test)]
pub(crate) mod fixtures;

pub use error::CartError;
pub use free_shipping::FreeShippingProgress;
pub use labels::DrawerLabels;
pub use line_item::{
    LineActivity, LineItemController, LineItemView, LineState, MutationOutcome, PendingGuard,
    display_title, is_gift, strike_through_amount,
};
pub use registry::{ActiveCart, CartRegistry};
pub use store::{CartBackend, CartSnapshot, CartStore, MockCartBackend};
pub use view::{CartSettings, DrawerView, PopulatedDrawer, checkout_disabled, render_drawer};
