//! Cart store errors.

use std::fmt;

use thiserror::Error;

use mauve_core::{CartId, ProductName, ProductNameError, QuantityError};

use crate::db::RepositoryError;

/// The store operation that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartOperation {
    AddItem,
    RemoveItem,
    ClearCart,
}

impl fmt::Display for CartOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::AddItem => "add item",
            Self::RemoveItem => "remove item",
            Self::ClearCart => "clear cart",
        })
    }
}

/// Errors returned by [`crate::cart::CartStore`].
///
/// After any error the store's local items are exactly what they were before
/// the call.
#[derive(Debug, Error)]
pub enum CartError {
    /// The initial fetch failed. The store is usable but its items are empty
    /// because they are unknown, not because the cart is empty.
    #[error("failed to load cart {cart_id}: {source}")]
    Initialization {
        cart_id: CartId,
        #[source]
        source: RepositoryError,
    },

    /// A remote insert/update/delete failed; nothing was applied locally.
    #[error("failed to {operation}{}: {source}", product_suffix(.product.as_ref()))]
    Mutation {
        operation: CartOperation,
        product: Option<ProductName>,
        #[source]
        source: RepositoryError,
    },

    /// The product was rejected before any remote call.
    #[error("invalid product: {0}")]
    Validation(#[from] ProductNameError),

    /// The line is already at the largest storable quantity.
    #[error("cannot add more {product}: {source}")]
    QuantityLimit {
        product: ProductName,
        #[source]
        source: QuantityError,
    },

    /// A mutation was issued before the initial load finished.
    #[error("cart is still loading")]
    NotReady,

    /// The store was closed; late results are not applied.
    #[error("cart store is closed")]
    Closed,
}

impl CartError {
    /// Whether the failure came from the remote store (as opposed to the input
    /// or the store's lifecycle).
    #[must_use]
    pub const fn is_remote(&self) -> bool {
        matches!(self, Self::Initialization { .. } | Self::Mutation { .. })
    }
}

fn product_suffix(product: Option<&ProductName>) -> String {
    product.map_or_else(String::new, |name| format!(" '{name}'"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_mutation_display_names_operation_and_product() {
        let err = CartError::Mutation {
            operation: CartOperation::AddItem,
            product: Some(ProductName::parse("Shirt").unwrap()),
            source: RepositoryError::Unavailable("timeout".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "failed to add item 'Shirt': store unavailable: timeout"
        );
        assert!(err.is_remote());
    }

    #[test]
    fn test_mutation_display_without_product() {
        let err = CartError::Mutation {
            operation: CartOperation::ClearCart,
            product: None,
            source: RepositoryError::NotFound,
        };
        assert_eq!(err.to_string(), "failed to clear cart: not found");
    }

    #[test]
    fn test_validation_is_not_remote() {
        let err = CartError::from(ProductNameError::Empty);
        assert_eq!(err.to_string(), "invalid product: product name cannot be empty");
        assert!(!err.is_remote());
    }
}
