//! Remote record store for cart line items.
//!
//! # Table: `cart_items`
//!
//! One row per cart line, partitioned by `cart_id`:
//!
//! | Column | Type | Notes |
//! |---|---|---|
//! | `id` | `uuid` or `int8` | assigned by the store on insert, opaque here |
//! | `cart_id` | `uuid` | the device's anonymous cart |
//! | `name` | `text` | unique per `cart_id` |
//! | `image` | `text` | nullable, opaque |
//! | `price` | `numeric(12,2)` | `>= 0` |
//! | `qty` | `int` | `>= 1` |
//!
//! The cart store only ever talks to a [`CartItemTable`]. Three backends
//! implement it:
//!
//! - [`crate::supabase::SupabaseCartTable`] - hosted `PostgREST` endpoint
//! - [`postgres::PgCartTable`] - direct `PostgreSQL` connection
//! - [`memory::MemoryCartTable`] - in-process table with fault injection
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p mauve-cli -- migrate
//! ```

pub mod memory;
pub mod postgres;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use mauve_core::{CartId, CartItemId, Price, ProductName, Quantity};

use crate::config::CartBackend;
use crate::supabase::{SupabaseCartTable, SupabaseError};

pub use memory::MemoryCartTable;
pub use postgres::PgCartTable;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Supabase `PostgREST` request failed.
    #[error("supabase error: {0}")]
    Supabase(#[from] SupabaseError),

    /// Data returned by the store is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested row was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., duplicate name in one cart).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// Store refused or could not serve the request.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// The four remote operations, used for logging and fault injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableOperation {
    FetchByCart,
    Insert,
    UpdateQuantity,
    DeleteByIds,
}

impl fmt::Display for TableOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::FetchByCart => "fetch-by-cart",
            Self::Insert => "insert",
            Self::UpdateQuantity => "update-quantity",
            Self::DeleteByIds => "delete-by-ids",
        })
    }
}

/// A `cart_items` row as the remote store returns it.
///
/// Validation happens when converting into [`crate::cart::CartItem`], so a bad
/// row from the store surfaces as [`RepositoryError::DataCorruption`] instead of
/// a deserialization failure deep inside a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItemRow {
    pub id: CartItemId,
    pub cart_id: CartId,
    pub name: String,
    pub image: Option<String>,
    pub price: Price,
    pub qty: i64,
}

/// Insert payload for a new cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewCartItem {
    pub cart_id: CartId,
    pub name: ProductName,
    pub image: Option<String>,
    pub price: Price,
    pub qty: Quantity,
}

/// A remote table of cart line items addressable by cart id.
///
/// Implementations must not retry on their own; a failure is reported to the
/// caller as-is.
#[async_trait]
pub trait CartItemTable: Send + Sync {
    /// Select every row belonging to `cart_id`.
    async fn fetch_by_cart(&self, cart_id: CartId) -> Result<Vec<CartItemRow>, RepositoryError>;

    /// Insert a row and return it with its assigned id.
    async fn insert(&self, item: &NewCartItem) -> Result<CartItemRow, RepositoryError>;

    /// Set the quantity of one row.
    ///
    /// Returns `RepositoryError::NotFound` if no row has that id.
    async fn update_quantity(&self, id: &CartItemId, qty: Quantity)
    -> Result<(), RepositoryError>;

    /// Delete all rows whose id is in `ids`. Ids that do not exist are ignored.
    async fn delete_by_ids(&self, ids: &[CartItemId]) -> Result<(), RepositoryError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Open the configured backend.
///
/// # Errors
///
/// Returns `RepositoryError` if the Supabase URL is unusable or the
/// `PostgreSQL` pool cannot connect.
pub async fn connect(backend: &CartBackend) -> Result<Arc<dyn CartItemTable>, RepositoryError> {
    let table: Arc<dyn CartItemTable> = match backend {
        CartBackend::Supabase(config) => Arc::new(SupabaseCartTable::new(config)?),
        CartBackend::Postgres { database_url } => {
            Arc::new(PgCartTable::new(create_pool(database_url).await?))
        }
    };
    tracing::info!(backend = backend.name(), "cart backend ready");
    Ok(table)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_row_deserializes_postgrest_shape() {
        let json = r#"{
            "id": "6f1c2f55-6c1e-4e44-9d55-0a0f1c7b8a11",
            "cart_id": "1b4e28ba-2fa1-11d2-883f-0016d3cca427",
            "name": "Forever Aloe Vera Gel",
            "image": null,
            "price": 25000,
            "qty": 2,
            "created_at": "2026-03-01T10:00:00+00:00"
        }"#;

        let row: CartItemRow = serde_json::from_str(json).unwrap();
        assert_eq!(row.name, "Forever Aloe Vera Gel");
        assert_eq!(row.price, Price::parse_display("25,000"));
        assert_eq!(row.qty, 2);
        assert!(row.image.is_none());
    }

    #[test]
    fn test_new_item_serializes_for_insert() {
        let item = NewCartItem {
            cart_id: CartId::parse("1b4e28ba-2fa1-11d2-883f-0016d3cca427").unwrap(),
            name: ProductName::parse("Shirt").unwrap(),
            image: Some("shirt.png".to_string()),
            price: Price::parse_display("5,000"),
            qty: Quantity::ONE,
        };

        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(value["cart_id"], "1b4e28ba-2fa1-11d2-883f-0016d3cca427");
        assert_eq!(value["name"], "Shirt");
        assert_eq!(value["price"], 5000.0);
        assert_eq!(value["qty"], 1);
    }

    #[test]
    fn test_table_operation_display() {
        assert_eq!(TableOperation::DeleteByIds.to_string(), "delete-by-ids");
    }
}
