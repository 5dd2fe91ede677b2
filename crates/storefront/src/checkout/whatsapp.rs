//! WhatsApp order links.

use std::fmt;

use rust_decimal::Decimal;

use mauve_core::{CurrencyCode, Price};

use crate::cart::CartSnapshot;

/// Product name used for whole-cart orders.
pub const CART_ORDER_NAME: &str = "Store Order";

/// The pre-typed order message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderMessage {
    pub name: String,
    pub category: String,
    pub price: String,
    pub quantity: u32,
}

impl OrderMessage {
    /// Order for a single product straight from a catalog page.
    #[must_use]
    pub fn for_product(name: impl Into<String>, category: impl Into<String>, price: Price) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            price: price.to_string(),
            quantity: 1,
        }
    }

    /// Order for the whole cart, or `None` if it is empty.
    ///
    /// Lines are summarized as `"<name> x<qty>"` in the category slot and the
    /// formatted total goes in the price slot.
    #[must_use]
    pub fn for_cart(snapshot: &CartSnapshot) -> Option<Self> {
        if snapshot.is_empty() {
            return None;
        }

        let summary = snapshot
            .items
            .iter()
            .map(|item| format!("{} x{}", item.name, item.qty))
            .collect::<Vec<_>>()
            .join(", ");

        Some(Self {
            name: CART_ORDER_NAME.to_string(),
            category: summary,
            price: format_total(snapshot.total),
            quantity: 1,
        })
    }
}

impl fmt::Display for OrderMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Hello 👋 I’d like to order:\n\n• Product: {}\n• Category: {}\n• Price: {}\n• Quantity: {}",
            self.name, self.category, self.price, self.quantity
        )
    }
}

/// `https://wa.me/<phone>?text=<message>` for the configured order line.
#[must_use]
pub fn whatsapp_link(phone: &str, message: &OrderMessage) -> String {
    format!(
        "https://wa.me/{phone}?text={}",
        urlencoding::encode(message.to_string().trim())
    )
}

fn format_total(total: Decimal) -> String {
    CurrencyCode::NGN.format(total)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use mauve_core::{CartId, CartItemId, ProductName, Quantity};

    use super::*;
    use crate::cart::{CartItem, total_of};

    fn snapshot(lines: &[(&str, u32, i64)]) -> CartSnapshot {
        let cart_id = CartId::generate();
        let items: Vec<CartItem> = lines
            .iter()
            .map(|(name, qty, price)| CartItem {
                id: CartItemId::generate(),
                cart_id,
                name: ProductName::parse(name).unwrap(),
                image: None,
                price: Price::new(Decimal::from(*price)),
                qty: Quantity::new(*qty).unwrap(),
            })
            .collect();
        CartSnapshot {
            cart_id,
            total: total_of(&items),
            item_count: items.iter().map(|i| u64::from(i.qty.get())).sum(),
            items,
        }
    }

    #[test]
    fn test_cart_message() {
        let message = OrderMessage::for_cart(&snapshot(&[("Gel", 2, 10_000), ("Oil", 1, 15_000)]))
            .unwrap();

        assert_eq!(message.name, "Store Order");
        assert_eq!(message.category, "Gel x2, Oil x1");
        assert_eq!(message.price, "₦35,000");
        assert_eq!(
            message.to_string(),
            "Hello 👋 I’d like to order:\n\n• Product: Store Order\n• Category: Gel x2, Oil x1\n• Price: ₦35,000\n• Quantity: 1"
        );
    }

    #[test]
    fn test_empty_cart_has_no_message() {
        assert!(OrderMessage::for_cart(&snapshot(&[])).is_none());
    }

    #[test]
    fn test_link_encodes_message() {
        let message = OrderMessage::for_product("Lip Gloss", "Lips", Price::new(Decimal::from(4500)));
        let link = whatsapp_link("2348140588890", &message);

        assert!(link.starts_with("https://wa.me/2348140588890?text=Hello%20"));
        assert!(link.contains("Lip%20Gloss"));
        assert!(!link.contains('\n'));
        assert!(!link.contains(' '));
    }
}
