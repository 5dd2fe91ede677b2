//! Unit prices and their normalization rules.
//!
//! Product prices reach the cart from several places: catalog rows carry a
//! number, form fields and older catalog entries carry display strings such as
//! `"12,500"`, and malformed payloads carry anything at all. [`Price::normalize`]
//! folds all of them into one decimal in `0..=Price::MAX`, the range of the
//! `numeric(12,2)` price column. Amounts outside that range are zero, the same
//! as any other unreadable input.

use core::fmt;
use core::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use super::product::Quantity;

/// A unit price in the store currency's standard unit, within `0..=Price::MAX`.
///
/// Serialized as a JSON number. Deserialization goes through [`Price::new`], so
/// an out-of-range amount coming back from a remote store reads as zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Price(Decimal);

impl Price {
    /// The zero price. Anything that cannot be read as a price becomes this.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Largest storable price: `9,999,999,999.99`.
    pub const MAX: Self = Self(Decimal::from_parts(3_567_587_327, 232, 0, false, 2));

    /// Create a price from a decimal amount.
    ///
    /// Negative amounts and amounts above [`Price::MAX`] become zero.
    #[must_use]
    pub fn new(amount: Decimal) -> Self {
        if amount.is_sign_negative() || amount > Self::MAX.0 {
            Self::ZERO
        } else {
            Self(amount.normalize())
        }
    }

    /// Normalize an arbitrary JSON value into a price.
    ///
    /// - numbers are used as they are
    /// - strings have thousand separators (`,`) stripped and are then parsed
    /// - everything else (objects, arrays, booleans, null) is zero
    ///
    /// Unparsable strings and negative amounts are also zero.
    #[must_use]
    pub fn normalize(raw: &Value) -> Self {
        match raw {
            Value::Number(n) => Self::from_json_number(n),
            Value::String(s) => Self::parse_display(s),
            _ => Self::ZERO,
        }
    }

    /// Parse a display string such as `"12,500"` or `"1,250.50"`.
    #[must_use]
    pub fn parse_display(s: &str) -> Self {
        let cleaned: String = s.chars().filter(|c| *c != ',').collect();
        let cleaned = cleaned.trim();
        if cleaned.is_empty() {
            return Self::ZERO;
        }

        Decimal::from_str(cleaned)
            .or_else(|_| Decimal::from_scientific(cleaned))
            .map_or(Self::ZERO, Self::new)
    }

    fn from_json_number(n: &serde_json::Number) -> Self {
        if let Some(i) = n.as_i64() {
            return Self::new(Decimal::from(i));
        }
        if let Some(u) = n.as_u64() {
            return Self::new(Decimal::from(u));
        }
        n.as_f64()
            .and_then(|f| Decimal::try_from(f).ok())
            .map_or(Self::ZERO, Self::new)
    }

    /// The decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Line total for `qty` units at this price.
    ///
    /// Saturates at `Decimal::MAX` instead of overflowing.
    #[must_use]
    pub fn line_total(&self, qty: Quantity) -> Decimal {
        self.0
            .checked_mul(Decimal::from(qty.get()))
            .unwrap_or(Decimal::MAX)
    }
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        rust_decimal::serde::float::serialize(&self.0, serializer)
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        rust_decimal::serde::float::deserialize(deserializer).map(Self::new)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&CurrencyCode::default().format(self.0))
    }
}

/// ISO 4217 currency codes accepted by the checkout gateways.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    NGN,
    GHS,
    USD,
}

impl CurrencyCode {
    /// Display symbol.
    #[must_use]
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::NGN => "₦",
            Self::GHS => "GH₵",
            Self::USD => "$",
        }
    }

    /// ISO code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::NGN => "NGN",
            Self::GHS => "GHS",
            Self::USD => "USD",
        }
    }

    /// Convert an amount to the currency's minor unit (kobo, pesewas, cents).
    ///
    /// Returns `None` if the result does not fit in an `i64` or is fractional
    /// after scaling.
    #[must_use]
    pub fn to_minor_units(&self, amount: Decimal) -> Option<i64> {
        let scaled = amount.checked_mul(Decimal::ONE_HUNDRED)?;
        if !scaled.fract().is_zero() {
            return None;
        }
        scaled.to_i64()
    }

    /// Format an amount with the currency symbol and thousand separators.
    ///
    /// Whole amounts print without decimals (`₦12,500`); fractional amounts are
    /// rounded to two places (`₦12,500.50`).
    #[must_use]
    pub fn format(&self, amount: Decimal) -> String {
        let sign = if amount.is_sign_negative() { "-" } else { "" };
        let amount = amount.abs().round_dp(2);
        let whole = amount.trunc();
        let fraction = amount - whole;

        let digits = whole.to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, c) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(c);
        }

        if fraction.is_zero() {
            format!("{sign}{}{grouped}", self.symbol())
        } else {
            let cents = (fraction * Decimal::ONE_HUNDRED).trunc().to_i64().unwrap_or(0);
            format!("{sign}{}{grouped}.{cents:02}", self.symbol())
        }
    }
}
