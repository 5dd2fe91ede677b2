//! Unified error handling with Sentry integration.
//!
//! Binaries funnel every failure into [`AppError`], call [`AppError::report`]
//! once, and show [`AppError::user_message`] to the customer.

use thiserror::Error;

use mauve_core::CartId;

use crate::cart::{CartError, CartEvent};
use crate::checkout::CheckoutError;
use crate::config::ConfigError;
use crate::db::RepositoryError;
use crate::storage::StorageError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Local storage could not be read or written.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Backend could not be reached outside a cart operation.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Schema migration failed.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Cart operation failed.
    #[error(transparent)]
    Cart(#[from] CartError),

    /// Checkout could not be started.
    #[error(transparent)]
    Checkout(#[from] CheckoutError),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Whether this is our fault (or the backend's) rather than the user's.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        match self {
            Self::Config(_)
            | Self::Storage(_)
            | Self::Database(_)
            | Self::Migration(_)
            | Self::Internal(_) => true,
            Self::Cart(err) => err.is_remote(),
            Self::Checkout(err) => matches!(err, CheckoutError::Paystack(_)),
        }
    }

    /// Capture server errors to Sentry and log them.
    ///
    /// Returns the Sentry event id when one was captured.
    pub fn report(&self) -> Option<sentry::types::Uuid> {
        if !self.is_server_error() {
            tracing::debug!(error = %self, "user error");
            return None;
        }

        let event_id = sentry::capture_error(self);
        tracing::error!(
            error = %self,
            sentry_event_id = %event_id,
            "Operation failed"
        );
        Some(event_id)
    }

    /// Message safe to show the customer.
    #[must_use]
    pub fn user_message(&self) -> String {
        // Don't expose internal error details to customers
        match self {
            Self::Config(err) => format!("Storefront is misconfigured: {err}"),
            Self::Storage(_) | Self::Internal(_) => "Something went wrong on this device".to_string(),
            Self::Database(_) | Self::Migration(_) => "Cart service is unavailable".to_string(),
            Self::Cart(err) => match err {
                CartError::Initialization { .. } => {
                    "Couldn't load your cart. Please try again.".to_string()
                }
                CartError::Mutation { operation, .. } => {
                    format!("Couldn't {operation}. Please try again.")
                }
                CartError::NotReady => "Your cart is still loading".to_string(),
                CartError::Closed => "Your cart session has ended".to_string(),
                CartError::Validation(_) | CartError::QuantityLimit { .. } => err.to_string(),
            },
            Self::Checkout(err) => match err {
                CheckoutError::Paystack(_) => {
                    "Payment service error. Your card was not charged.".to_string()
                }
                _ => err.to_string(),
            },
        }
    }
}

/// Associate Sentry events with the anonymous cart.
///
/// There are no accounts, so the cart id stands in for the user id.
pub fn set_sentry_cart(cart_id: CartId) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(cart_id.to_string()),
            ..Default::default()
        }));
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("checkout", "Opened WhatsApp link", Some(&[("lines", "3")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

/// Record a successful cart mutation as a breadcrumb.
pub fn cart_breadcrumb(event: &CartEvent) {
    let id = event.id.to_string();
    let product = event.product.as_ref().map(ToString::to_string);
    let mut data = vec![("event_id", id.as_str())];
    if let Some(product) = &product {
        data.push(("product", product.as_str()));
    }
    add_breadcrumb("cart", &event.message, Some(&data));
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use mauve_core::{ProductName, ProductNameError};

    use super::*;
    use crate::cart::CartOperation;

    #[test]
    fn test_app_error_display() {
        let err = AppError::Internal("failed to render cart".to_string());
        assert_eq!(err.to_string(), "Internal error: failed to render cart");

        let err = AppError::from(CartError::NotReady);
        assert_eq!(err.to_string(), "cart is still loading");
    }

    #[test]
    fn test_server_error_classification() {
        assert!(AppError::Internal("x".to_string()).is_server_error());
        assert!(AppError::from(RepositoryError::NotFound).is_server_error());
        assert!(
            AppError::from(CartError::Mutation {
                operation: CartOperation::RemoveItem,
                product: None,
                source: RepositoryError::Unavailable("down".to_string()),
            })
            .is_server_error()
        );
        assert!(!AppError::from(CartError::from(ProductNameError::Empty)).is_server_error());
        assert!(!AppError::from(CheckoutError::EmptyCart).is_server_error());
    }

    #[test]
    fn test_user_message_hides_internals() {
        let err = AppError::from(CartError::Mutation {
            operation: CartOperation::AddItem,
            product: Some(ProductName::parse("Gel").unwrap()),
            source: RepositoryError::Unavailable("connection refused 10.0.0.7:5432".to_string()),
        });
        let message = err.user_message();
        assert_eq!(message, "Couldn't add item. Please try again.");
        assert!(!message.contains("10.0.0.7"));

        let err = AppError::from(CheckoutError::MissingField("email"));
        assert_eq!(err.user_message(), "email is required");
    }

    #[test]
    fn test_report_skips_user_errors() {
        assert!(AppError::from(CheckoutError::EmptyCart).report().is_none());
    }

    #[test]
    fn test_report_captures_server_errors() {
        // Without an initialized client the event id is nil, but one is returned.
        assert!(AppError::Internal("boom".to_string()).report().is_some());
    }
}
