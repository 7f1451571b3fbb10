//! Minicart Core - Shared types library.
//!
//! This crate provides the types shared by the cart drawer components:
//! - `storefront` - Cart drawer routes, cart store and line-item controller
//! - `integration-tests` - Router-level drawer tests
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients. Money formatting lives here so every caller renders amounts the
//! same way for a given locale and currency.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, currency codes, locales and price formatting

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
