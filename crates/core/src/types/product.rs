//! Product names and cart line quantities.

use core::fmt;
use core::num::NonZeroU32;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`ProductName`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ProductNameError {
    /// The name is empty or only whitespace.
    #[error("product name cannot be empty")]
    Empty,
}

/// A product display name.
///
/// The name is the cart's natural dedup key: within one cart no two lines
/// share a name. Comparison is exact (case and inner whitespace matter), but
/// surrounding whitespace is trimmed on parse. There is no length limit; the
/// `name` column is unbounded `text`.
///
/// ## Examples
///
/// ```
/// use mauve_core::ProductName;
///
/// assert!(ProductName::parse("Forever Aloe Vera Gel").is_ok());
/// assert!(ProductName::parse("   ").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct ProductName(String);

impl ProductName {
    /// Parse a `ProductName` from a string.
    ///
    /// # Errors
    ///
    /// Returns `ProductNameError::Empty` if the trimmed input is empty.
    pub fn parse(s: &str) -> Result<Self, ProductNameError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ProductNameError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the name and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for ProductName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ProductName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ProductName {
    type Error = ProductNameError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

/// Errors that can occur when building a [`Quantity`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum QuantityError {
    /// Quantity was zero or negative.
    #[error("quantity must be at least 1 (got {0})")]
    BelowOne(i64),
    /// Quantity does not fit the storage column.
    #[error("quantity {0} is too large")]
    TooLarge(i64),
}

/// Number of units on a cart line. Always at least 1.
///
/// Removing a line is the only way to get rid of it; there is no zero
/// quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Quantity(NonZeroU32);

impl Quantity {
    /// A single unit.
    pub const ONE: Self = Self(NonZeroU32::MIN);

    /// Largest quantity the `cart_items.qty` column can hold.
    pub const MAX: u32 = i32::MAX as u32;

    /// Create a quantity, returning `None` for zero or values above [`Self::MAX`].
    #[must_use]
    pub fn new(qty: u32) -> Option<Self> {
        if qty > Self::MAX {
            return None;
        }
        NonZeroU32::new(qty).map(Self)
    }

    /// The raw count.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0.get()
    }

    /// The next quantity up.
    ///
    /// # Errors
    ///
    /// Returns `QuantityError::TooLarge` if the line is already at [`Self::MAX`].
    pub fn incremented(&self) -> Result<Self, QuantityError> {
        let next = i64::from(self.get()) + 1;
        Self::try_from(next)
    }

    /// The quantity as the database column type.
    #[must_use]
    #[allow(clippy::cast_possible_wrap)] // bounded by Self::MAX
    pub const fn as_i32(&self) -> i32 {
        self.get() as i32
    }
}

impl Default for Quantity {
    fn default() -> Self {
        Self::ONE
    }
}

impl TryFrom<i64> for Quantity {
    type Error = QuantityError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        if value < 1 {
            return Err(QuantityError::BelowOne(value));
        }
        u32::try_from(value)
            .ok()
            .and_then(Self::new)
            .ok_or(QuantityError::TooLarge(value))
    }
}

impl From<Quantity> for i64 {
    fn from(qty: Quantity) -> Self {
        Self::from(qty.get())
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
