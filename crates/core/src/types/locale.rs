//! Display locales supported by the cart drawer.
//!
//! A locale only decides number layout (separators, symbol placement) and
//! which label set the drawer uses. It never changes cart semantics.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned when a locale tag is not supported.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unsupported locale: {0}")]
pub struct LocaleError(pub String);

/// Where the currency symbol sits relative to the number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolPosition {
    /// `R$100,00`, `$100.00`
    Prefix,
    /// `100,00 €`
    Suffix,
}

/// A supported BCP-47 locale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Locale {
    /// Portuguese (Brazil).
    PtBr,
    /// English (United States).
    EnUs,
    /// English (United Kingdom).
    EnGb,
    /// Spanish (Spain).
    EsEs,
    /// German (Germany).
    DeDe,
    /// French (France).
    FrFr,
}

impl Locale {
    /// All supported locales.
    pub const ALL: [Self; 6] = [
        Self::PtBr,
        Self::EnUs,
        Self::EnGb,
        Self::EsEs,
        Self::DeDe,
        Self::FrFr,
    ];

    /// Canonical BCP-47 tag, e.g. `pt-BR`.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::PtBr => "pt-BR",
            Self::EnUs => "en-US",
            Self::EnGb => "en-GB",
            Self::EsEs => "es-ES",
            Self::DeDe => "de-DE",
            Self::FrFr => "fr-FR",
        }
    }

    /// Primary language subtag, e.g. `pt`.
    #[must_use]
    pub const fn language(self) -> &'static str {
        match self {
            Self::PtBr => "pt",
            Self::EnUs | Self::EnGb => "en",
            Self::EsEs => "es",
            Self::DeDe => "de",
            Self::FrFr => "fr",
        }
    }

    /// Separator between the integer and fractional parts.
    #[must_use]
    pub const fn decimal_separator(self) -> char {
        match self {
            Self::EnUs | Self::EnGb => '.',
            Self::PtBr | Self::EsEs | Self::DeDe | Self::FrFr => ',',
        }
    }

    /// Separator between groups of three integer digits.
    #[must_use]
    pub const fn group_separator(self) -> char {
        match self {
            Self::EnUs | Self::EnGb => ',',
            Self::PtBr | Self::EsEs | Self::DeDe => '.',
            Self::FrFr => ' ',
        }
    }

    /// Placement of the currency symbol.
    #[must_use]
    pub const fn symbol_position(self) -> SymbolPosition {
        match self {
            Self::PtBr | Self::EnUs | Self::EnGb => SymbolPosition::Prefix,
            Self::EsEs | Self::DeDe | Self::FrFr => SymbolPosition::Suffix,
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Locale {
    type Err = LocaleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|locale| locale.tag().eq_ignore_ascii_case(&normalized))
            .ok_or_else(|| LocaleError(s.to_string()))
    }
}

impl TryFrom<String> for Locale {
    type Error = LocaleError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Locale> for String {
    fn from(locale: Locale) -> Self {
        locale.tag().to_string()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_and_separator_insensitive() {
        assert_eq!("pt-BR".parse::<Locale>().unwrap(), Locale::PtBr);
        assert_eq!("pt_br".parse::<Locale>().unwrap(), Locale::PtBr);
        assert_eq!(" EN-us ".parse::<Locale>().unwrap(), Locale::EnUs);
    }

    #[test]
    fn test_parse_unknown_locale() {
        let err = "xx-YY".parse::<Locale>().unwrap_err();
        assert_eq!(err.to_string(), "Unsupported locale: xx-YY");
    }

    #[test]
    fn test_tags_round_trip() {
        for locale in Locale::ALL {
            assert_eq!(locale.tag().parse::<Locale>().unwrap(), locale);
        }
    }

    #[test]
    fn test_separators_differ() {
        for locale in Locale::ALL {
            assert_ne!(locale.decimal_separator(), locale.group_separator());
        }
    }
}
