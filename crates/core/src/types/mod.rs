//! Core types for the Mauve storefront.
//!
//! This module provides type-safe wrappers for the cart's domain concepts.

pub mod email;
pub mod id;
pub mod price;
pub mod product;

pub use email::{Email, EmailError};
pub use id::*;
pub use price::{CurrencyCode, Price};
pub use product::{ProductName, ProductNameError, Quantity, QuantityError};
