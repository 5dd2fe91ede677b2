//! Checkout initiators.
//!
//! Two ways out of the cart, both built from a [`CartSnapshot`]:
//!
//! - [`whatsapp`]: a `wa.me` deep link with the order pre-typed
//! - [`paystack`]: a card payment session for the cart total
//!
//! Neither path clears the cart. Once the customer confirms the order went
//! through, call [`finish_checkout`].
//!
//! [`CartSnapshot`]: crate::cart::CartSnapshot

pub mod paystack;
pub mod whatsapp;

use thiserror::Error;
use tracing::instrument;

use mauve_core::EmailError;

use crate::cart::{CartError, CartEvent, CartStore};

pub use paystack::{CustomerDetails, PaymentRequest, PaymentSession, PaystackClient, PaystackError};
pub use whatsapp::{OrderMessage, whatsapp_link};

/// Errors building or starting a checkout.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Nothing to check out.
    #[error("cart is empty")]
    EmptyCart,

    /// A required customer field was blank.
    #[error("{0} is required")]
    MissingField(&'static str),

    /// The customer email is malformed.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// The total cannot be charged (zero, or not representable in kobo).
    #[error("cannot charge {0}")]
    InvalidAmount(String),

    /// Card checkout is not configured.
    #[error("card payments are not enabled")]
    PaymentsDisabled,

    /// The payment gateway call failed.
    #[error(transparent)]
    Paystack(#[from] PaystackError),
}

/// Clear the cart after the customer confirmed the order.
///
/// # Errors
///
/// Returns the `CartError` from [`CartStore::clear_cart`]; the cart keeps its
/// items in that case.
#[instrument(skip(store), fields(cart_id = %store.cart_id()))]
pub async fn finish_checkout(store: &CartStore) -> Result<Option<CartEvent>, CartError> {
    store.clear_cart().await
}
