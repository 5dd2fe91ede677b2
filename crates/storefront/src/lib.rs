//! Mauve storefront library.
//!
//! Anonymous cart sessions synchronized with a remote `cart_items` table,
//! plus the pieces around them: per-device identity, backend clients,
//! checkout builders, configuration and telemetry.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod checkout;
pub mod config;
pub mod db;
pub mod error;
pub mod identity;
pub mod storage;
pub mod supabase;
pub mod telemetry;
