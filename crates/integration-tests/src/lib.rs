//! Integration tests for the Mauve storefront.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p mauve-integration-tests
//! ```
//!
//! No external services are needed: the Supabase and Paystack tests run
//! against `wiremock` servers and everything else uses the in-memory table.
//!
//! # Test Categories
//!
//! - `cart_scenario` - End-to-end cart flows and identity persistence
//! - `concurrency` - Interleaved mutations and teardown with calls in flight
//! - `supabase_table` - `PostgREST` wire format and error mapping
//! - `paystack` - Checkout initialization
//!
//! This library holds the shared helpers.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::Semaphore;

use mauve_core::{CartId, CartItemId, Quantity};
use mauve_storefront::cart::CartStore;
use mauve_storefront::db::{
    CartItemRow, CartItemTable, MemoryCartTable, NewCartItem, RepositoryError, TableOperation,
};
use mauve_storefront::identity::SessionIdentity;

/// A [`MemoryCartTable`] whose calls can be parked mid-flight.
///
/// Calls of a held operation signal that they have started and then wait for
/// [`GatedTable::release`] before reaching the table.
#[derive(Debug)]
pub struct GatedTable {
    table: MemoryCartTable,
    held: Mutex<HashSet<TableOperation>>,
    gate: Semaphore,
    entered: Semaphore,
}

impl GatedTable {
    #[must_use]
    pub fn new() -> Self {
        Self {
            table: MemoryCartTable::new(),
            held: Mutex::default(),
            gate: Semaphore::new(0),
            entered: Semaphore::new(0),
        }
    }

    /// The wrapped table, for assertions and fault injection.
    #[must_use]
    pub const fn table(&self) -> &MemoryCartTable {
        &self.table
    }

    /// Park future calls of `op`.
    pub fn hold(&self, op: TableOperation) {
        self.held
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(op);
    }

    /// Let `calls` parked calls through.
    pub fn release(&self, calls: usize) {
        self.gate.add_permits(calls);
    }

    /// Stop parking `op`; calls already parked still need [`Self::release`].
    pub fn unhold(&self, op: TableOperation) {
        self.held
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&op);
    }

    /// Wait until a held call has started.
    pub async fn wait_entered(&self) {
        if let Ok(permit) = self.entered.acquire().await {
            permit.forget();
        }
    }

    async fn pass(&self, op: TableOperation) {
        let held = self
            .held
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&op);
        if held {
            self.entered.add_permits(1);
            if let Ok(permit) = self.gate.acquire().await {
                permit.forget();
            }
        }
    }
}

impl Default for GatedTable {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CartItemTable for GatedTable {
    async fn fetch_by_cart(&self, cart_id: CartId) -> Result<Vec<CartItemRow>, RepositoryError> {
        self.pass(TableOperation::FetchByCart).await;
        self.table.fetch_by_cart(cart_id).await
    }

    async fn insert(&self, item: &NewCartItem) -> Result<CartItemRow, RepositoryError> {
        self.pass(TableOperation::Insert).await;
        self.table.insert(item).await
    }

    async fn update_quantity(
        &self,
        id: &CartItemId,
        qty: Quantity,
    ) -> Result<(), RepositoryError> {
        self.pass(TableOperation::UpdateQuantity).await;
        self.table.update_quantity(id, qty).await
    }

    async fn delete_by_ids(&self, ids: &[CartItemId]) -> Result<(), RepositoryError> {
        self.pass(TableOperation::DeleteByIds).await;
        self.table.delete_by_ids(ids).await
    }
}

/// A store over `table` for a fresh cart id, not yet loaded.
#[must_use]
pub fn store_over(table: Arc<dyn CartItemTable>) -> CartStore {
    CartStore::new(SessionIdentity::from_cart_id(CartId::generate()), table)
}
