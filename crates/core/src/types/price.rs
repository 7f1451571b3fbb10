//! Type-safe price representation and locale-aware formatting.
//!
//! Amounts are `rust_decimal::Decimal` in the currency's standard unit
//! (reais, dollars), never floats. Formatting is a pure function of the
//! amount, the currency and the display locale.

use std::fmt;
use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::locale::{Locale, SymbolPosition};

/// Error returned when a currency code is not three ASCII letters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid currency code: {0:?}")]
pub struct CurrencyError(pub String);

/// ISO 4217 currency code, always stored upper case.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode([u8; 3]);

impl CurrencyCode {
    /// Brazilian real.
    pub const BRL: Self = Self(*b"BRL");
    /// US dollar.
    pub const USD: Self = Self(*b"USD");
    /// Euro.
    pub const EUR: Self = Self(*b"EUR");
    /// Pound sterling.
    pub const GBP: Self = Self(*b"GBP");
    /// Canadian dollar.
    pub const CAD: Self = Self(*b"CAD");
    /// Australian dollar.
    pub const AUD: Self = Self(*b"AUD");

    /// The three-letter code, e.g. `BRL`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        // Construction only admits ASCII letters.
        std::str::from_utf8(&self.0).unwrap_or("XXX")
    }

    /// Display symbol, if the currency has a well-known one.
    #[must_use]
    pub fn symbol(&self) -> Option<&'static str> {
        match &self.0 {
            b"BRL" => Some("R$"),
            b"USD" => Some("$"),
            b"EUR" => Some("€"),
            b"GBP" => Some("£"),
            b"CAD" => Some("CA$"),
            b"AUD" => Some("A$"),
            _ => None,
        }
    }
}

impl fmt::Debug for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CurrencyCode({})", self.as_str())
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CurrencyCode {
    type Err = CurrencyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.trim().as_bytes();
        match bytes {
            [a, b, c] if bytes.iter().all(u8::is_ascii_alphabetic) => Ok(Self([
                a.to_ascii_uppercase(),
                b.to_ascii_uppercase(),
                c.to_ascii_uppercase(),
            ])),
            _ => Err(CurrencyError(s.to_string())),
        }
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = CurrencyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CurrencyCode> for String {
    fn from(code: CurrencyCode) -> Self {
        code.as_str().to_string()
    }
}

/// A price with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit (e.g., reais, not centavos).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Price {
    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// A zero amount in the given currency.
    #[must_use]
    pub const fn zero(currency_code: CurrencyCode) -> Self {
        Self::new(Decimal::ZERO, currency_code)
    }

    /// Format for display in the given locale.
    #[must_use]
    pub fn display(&self, locale: Locale) -> String {
        format_price(self.amount, self.currency_code, locale)
    }
}

/// Format an amount for display, e.g. `R$1.234,56` for `pt-BR`/`BRL`.
///
/// Rounds half away from zero to two decimal places.
#[must_use]
pub fn format_price(amount: Decimal, currency: CurrencyCode, locale: Locale) -> String {
    let mut rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);

    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };

    let digits = rounded.abs().to_string();
    let (int_part, frac_part) = digits.split_once('.').unwrap_or((&digits, "00"));
    let number = format!(
        "{}{}{}",
        group_digits(int_part, locale.group_separator()),
        locale.decimal_separator(),
        frac_part
    );

    match (currency.symbol(), locale.symbol_position()) {
        (Some(symbol), SymbolPosition::Prefix) => format!("{sign}{symbol}{number}"),
        (Some(symbol), SymbolPosition::Suffix) => format!("{sign}{number} {symbol}"),
        (None, SymbolPosition::Prefix) => format!("{sign}{currency} {number}"),
        (None, SymbolPosition::Suffix) => format!("{sign}{number} {currency}"),
    }
}

/// Insert `separator` between every group of three digits from the right.
fn group_digits(digits: &str, separator: char) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(separator);
        }
        out.push(c);
    }
    out
}
