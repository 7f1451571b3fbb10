//! Core types for the cart drawer.
//!
//! This module provides type-safe wrappers for cart identifiers, currencies,
//! locales and prices.

pub mod id;
pub mod locale;
pub mod price;

pub use id::*;
pub use locale::{Locale, LocaleError, SymbolPosition};
pub use price::{CurrencyCode, CurrencyError, Price, format_price};
