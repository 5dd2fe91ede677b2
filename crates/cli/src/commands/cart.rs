//! Cart commands.
//!
//! # Usage
//!
//! ```bash
//! mauve cart show [--json]
//! mauve cart add <name> --price <price> [--image <url>]
//! mauve cart remove <name>
//! mauve cart clear
//! ```
//!
//! The cart is identified by the `cart_id` in this device's local storage
//! (`MAUVE_STORAGE_PATH`, or the platform data directory).

use serde_json::Value;
use tracing::info;

use mauve_storefront::cart::{CartStore, ProductInput};
use mauve_storefront::config::StorefrontConfig;
use mauve_storefront::error::{AppError, cart_breadcrumb, set_sentry_cart};
use mauve_storefront::identity::SessionIdentity;
use mauve_storefront::storage::FileStorage;

use crate::output;

/// Resolve this device's identity, connect the backend and load the cart.
///
/// # Errors
///
/// Returns error if storage, the backend connection or the initial load fail.
pub async fn open(config: &StorefrontConfig) -> Result<CartStore, AppError> {
    let storage = config
        .storage_path
        .as_ref()
        .map_or_else(FileStorage::default_location, |path| FileStorage::new(path.clone()));
    let identity = SessionIdentity::load_or_create(&storage)?;
    set_sentry_cart(identity.cart_id());
    if identity.is_new() {
        info!(path = %storage.path().display(), "new device, started an empty cart");
    }

    let table = mauve_storefront::db::connect(&config.backend).await?;
    let (cart, loaded) = CartStore::open(identity, table).await;
    loaded?;
    Ok(cart)
}

/// Print the cart.
///
/// # Errors
///
/// Returns error if JSON serialization fails.
pub async fn show(cart: &CartStore, json: bool) -> Result<(), AppError> {
    let snapshot = cart.snapshot().await;
    if json {
        let rendered = serde_json::to_string_pretty(&snapshot)
            .map_err(|e| AppError::Internal(format!("failed to render cart: {e}")))?;
        output::line(&rendered);
    } else {
        output::cart(&snapshot);
    }
    Ok(())
}

/// Add one unit of a product.
///
/// # Errors
///
/// Returns error if the name is blank or the backend call fails.
pub async fn add(
    cart: &CartStore,
    name: String,
    price: &str,
    image: Option<String>,
) -> Result<(), AppError> {
    let product = ProductInput {
        name,
        price: Value::String(price.to_string()),
        image,
    };
    let event = cart.add_item(product).await?;
    cart_breadcrumb(&event);
    output::event(&event);
    Ok(())
}

/// Remove a line by name. Missing names are not an error.
///
/// # Errors
///
/// Returns error if the backend call fails.
pub async fn remove(cart: &CartStore, name: &str) -> Result<(), AppError> {
    match cart.remove_item(name).await? {
        Some(event) => {
            cart_breadcrumb(&event);
            output::event(&event);
        }
        None => output::line(&format!("'{}' is not in the cart", name.trim())),
    }
    Ok(())
}

/// Remove every line.
///
/// # Errors
///
/// Returns error if the backend call fails.
pub async fn clear(cart: &CartStore) -> Result<(), AppError> {
    match cart.clear_cart().await? {
        Some(event) => {
            cart_breadcrumb(&event);
            output::event(&event);
        }
        None => output::line("Cart is already empty"),
    }
    Ok(())
}
