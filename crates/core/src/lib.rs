//! Mauve Core - Shared cart types.
//!
//! This crate provides the domain types used across the Mauve workspace:
//! - `storefront` - Cart session store, remote backends, checkout builders
//! - `cli` - Command-line surface over the cart
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients. Price normalization lives here because every layer
//! that accepts a product has to apply it the same way.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for ids, product names, quantities, prices and emails

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
