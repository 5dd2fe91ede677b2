//! Notification signal for toast-style feedback.
//!
//! Every successful mutation produces exactly one [`CartEvent`] with an id one
//! higher than the last. UI layers watch the id change and show the message.

use serde::Serialize;

use mauve_core::ProductName;

/// What a successful mutation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CartEventKind {
    /// A new line was created.
    Added,
    /// An existing line's quantity went up by one.
    AddedAgain,
    /// A line was removed.
    Removed,
    /// Every line was removed.
    Cleared,
}

/// A cart notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartEvent {
    /// Monotonic per store, starting at 1.
    pub id: u64,
    pub kind: CartEventKind,
    pub product: Option<ProductName>,
    /// Human-readable toast copy.
    pub message: String,
}

impl CartEvent {
    pub(crate) fn new(id: u64, kind: CartEventKind, product: Option<&ProductName>) -> Self {
        let message = match (kind, product) {
            (CartEventKind::Added, Some(name)) => format!("Added to cart • {name}"),
            (CartEventKind::AddedAgain, Some(name)) => format!("Added again • {name}"),
            (CartEventKind::Removed, Some(name)) => format!("Removed • {name}"),
            (CartEventKind::Cleared, _) => "Cart cleared".to_string(),
            (CartEventKind::Added | CartEventKind::AddedAgain, None) => "Added to cart".to_string(),
            (CartEventKind::Removed, None) => "Removed from cart".to_string(),
        };

        Self {
            id,
            kind,
            product: product.cloned(),
            message,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_distinguish_new_and_repeat() {
        let name = ProductName::parse("Shirt").unwrap();
        let added = CartEvent::new(1, CartEventKind::Added, Some(&name));
        let again = CartEvent::new(2, CartEventKind::AddedAgain, Some(&name));

        assert_eq!(added.message, "Added to cart • Shirt");
        assert_eq!(again.message, "Added again • Shirt");
        assert_ne!(added.message, again.message);
    }

    #[test]
    fn test_cleared_message() {
        let event = CartEvent::new(7, CartEventKind::Cleared, None);
        assert_eq!(event.message, "Cart cleared");
        assert!(event.product.is_none());
    }
}
