//! Checkout commands.
//!
//! # Usage
//!
//! ```bash
//! mauve checkout whatsapp [--clear]
//! mauve checkout paystack --name <name> --email <email> --phone <phone> --address <address>
//! ```
//!
//! # Environment Variables
//!
//! - `WHATSAPP_PHONE` - Number the WhatsApp order is addressed to
//! - `PAYSTACK_SECRET_KEY` - Required for `paystack`

use tracing::info;

use mauve_storefront::cart::CartStore;
use mauve_storefront::checkout::{
    CheckoutError, CustomerDetails, OrderMessage, PaymentRequest, PaystackClient, finish_checkout,
    whatsapp_link,
};
use mauve_storefront::config::StorefrontConfig;
use mauve_storefront::error::{AppError, add_breadcrumb, cart_breadcrumb};

use crate::output;

/// Print a WhatsApp order link for the cart.
///
/// # Errors
///
/// Returns error if the cart is empty, or if `clear` is set and clearing fails.
pub async fn whatsapp(cart: &CartStore, config: &StorefrontConfig, clear: bool) -> Result<(), AppError> {
    let snapshot = cart.snapshot().await;
    let message = OrderMessage::for_cart(&snapshot).ok_or(CheckoutError::EmptyCart)?;
    let link = whatsapp_link(&config.whatsapp_phone, &message);

    let lines = snapshot.items.len().to_string();
    add_breadcrumb("checkout", "Built WhatsApp order link", Some(&[("lines", lines.as_str())]));
    output::line(&link);

    if clear && let Some(event) = finish_checkout(cart).await? {
        cart_breadcrumb(&event);
        output::event(&event);
    }
    Ok(())
}

/// Open a Paystack payment for the cart total and print where to pay.
///
/// # Errors
///
/// Returns error if card payments are disabled, the form is invalid, or
/// Paystack declines the request.
pub async fn paystack(
    cart: &CartStore,
    config: &StorefrontConfig,
    customer: &CustomerDetails,
) -> Result<(), AppError> {
    let paystack = config
        .paystack
        .as_ref()
        .ok_or(CheckoutError::PaymentsDisabled)?;

    let snapshot = cart.snapshot().await;
    let request = PaymentRequest::new(&snapshot, customer)?;
    let client = PaystackClient::new(paystack).map_err(CheckoutError::from)?;
    let session = client
        .initialize(&request)
        .await
        .map_err(CheckoutError::from)?;

    info!(reference = %session.reference, "payment session opened");
    add_breadcrumb(
        "checkout",
        "Opened Paystack payment",
        Some(&[("reference", session.reference.as_str())]),
    );
    output::line(&format!("Pay here: {}", session.authorization_url));
    output::line(&format!("Reference: {}", session.reference));
    Ok(())
}
