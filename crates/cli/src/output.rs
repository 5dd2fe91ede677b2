//! Terminal output. Results go to stdout, failures to stderr.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use mauve_core::CurrencyCode;
use mauve_storefront::cart::{CartEvent, CartSnapshot};
use mauve_storefront::error::AppError;

/// The toast for a successful mutation.
pub fn event(event: &CartEvent) {
    println!("{}", event.message);
}

/// A line of plain output.
pub fn line(text: &str) {
    println!("{text}");
}

/// The cart as a table.
pub fn cart(snapshot: &CartSnapshot) {
    if snapshot.is_empty() {
        println!("Cart is empty");
        return;
    }

    let currency = CurrencyCode::NGN;
    let width = snapshot
        .items
        .iter()
        .map(|item| item.name.as_str().chars().count())
        .max()
        .unwrap_or(0);

    for item in &snapshot.items {
        println!(
            "{:<width$}  x{:<4} {:>14}",
            item.name.as_str(),
            item.qty,
            currency.format(item.line_total()),
        );
    }
    println!();
    println!(
        "{} items · Total {}",
        snapshot.item_count,
        currency.format(snapshot.total)
    );
}

/// The customer-facing error message.
pub fn failure(error: &AppError) {
    eprintln!("error: {}", error.user_message());
}
