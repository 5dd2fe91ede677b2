//! Cart line items and the product payload accepted by `add_item`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use mauve_core::{CartId, CartItemId, Price, ProductName, Quantity};

use crate::db::{CartItemRow, RepositoryError};

/// Product as handed to the cart by a catalog page.
///
/// `price` is deliberately untyped: catalog rows, form fields and older
/// entries disagree about whether it is a number or a display string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductInput {
    pub name: String,
    #[serde(default)]
    pub price: Value,
    #[serde(default)]
    pub image: Option<String>,
}

impl ProductInput {
    /// Convenience constructor.
    #[must_use]
    pub fn new(name: impl Into<String>, price: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            price: price.into(),
            image: None,
        }
    }

    /// Attach an image reference.
    #[must_use]
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }
}

/// One line of the cart, as confirmed by the remote store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartItem {
    pub id: CartItemId,
    pub cart_id: CartId,
    pub name: ProductName,
    pub image: Option<String>,
    pub price: Price,
    pub qty: Quantity,
}

impl CartItem {
    /// `price × qty`.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.price.line_total(self.qty)
    }
}

impl TryFrom<CartItemRow> for CartItem {
    type Error = RepositoryError;

    fn try_from(row: CartItemRow) -> Result<Self, Self::Error> {
        let name = ProductName::parse(&row.name).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid name on cart item {}: {e}", row.id))
        })?;
        let qty = Quantity::try_from(row.qty).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid qty on cart item {}: {e}", row.id))
        })?;

        Ok(Self {
            id: row.id,
            cart_id: row.cart_id,
            name,
            image: row.image,
            price: row.price,
            qty,
        })
    }
}

/// Sum of `price × qty` over `items`, saturating at `Decimal::MAX`.
#[must_use]
pub fn total_of(items: &[CartItem]) -> Decimal {
    items.iter().fold(Decimal::ZERO, |total, item| {
        total.checked_add(item.line_total()).unwrap_or(Decimal::MAX)
    })
}
