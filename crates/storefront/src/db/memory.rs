//! In-process cart item table.
//!
//! Behaves like the hosted table (store-assigned ids, unique name per cart,
//! not-found on updates to missing rows) and yields to the scheduler before
//! every call so concurrent callers interleave the way they would over a
//! network. Faults can be injected per operation.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tracing::{debug, instrument};

use mauve_core::{CartId, CartItemId, Quantity};

use super::{CartItemRow, CartItemTable, NewCartItem, RepositoryError, TableOperation};

/// How an injected fault behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fault {
    /// Fail the next call, then recover.
    Once,
    /// Fail every call until cleared.
    Always,
}

#[derive(Debug, Default)]
struct Tables {
    rows: Vec<CartItemRow>,
    faults: HashMap<TableOperation, Fault>,
    calls: HashMap<TableOperation, usize>,
}

/// In-memory [`CartItemTable`].
#[derive(Debug, Default)]
pub struct MemoryCartTable {
    tables: Mutex<Tables>,
}

impl MemoryCartTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a table pre-populated with rows.
    #[must_use]
    pub fn with_rows(rows: Vec<CartItemRow>) -> Self {
        Self {
            tables: Mutex::new(Tables {
                rows,
                ..Tables::default()
            }),
        }
    }

    /// Make the next call of `op` fail.
    pub fn fail_next(&self, op: TableOperation) {
        self.lock().faults.insert(op, Fault::Once);
    }

    /// Make every call of `op` fail until [`Self::recover`] is called.
    pub fn fail_always(&self, op: TableOperation) {
        self.lock().faults.insert(op, Fault::Always);
    }

    /// Clear any injected fault for `op`.
    pub fn recover(&self, op: TableOperation) {
        self.lock().faults.remove(&op);
    }

    /// Snapshot of every row currently stored.
    #[must_use]
    pub fn rows(&self) -> Vec<CartItemRow> {
        self.lock().rows.clone()
    }

    /// Number of calls made to `op`, including failed ones.
    #[must_use]
    pub fn calls(&self, op: TableOperation) -> usize {
        self.lock().calls.get(&op).copied().unwrap_or(0)
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record the call and consume a pending fault, if any.
    async fn enter(&self, op: TableOperation) -> Result<MutexGuard<'_, Tables>, RepositoryError> {
        tokio::task::yield_now().await;

        let mut tables = self.lock();
        *tables.calls.entry(op).or_insert(0) += 1;

        match tables.faults.get(&op).copied() {
            Some(Fault::Once) => {
                tables.faults.remove(&op);
                debug!(%op, "injected one-shot fault");
                Err(RepositoryError::Unavailable(format!("injected {op} failure")))
            }
            Some(Fault::Always) => {
                debug!(%op, "injected persistent fault");
                Err(RepositoryError::Unavailable(format!("injected {op} failure")))
            }
            None => Ok(tables),
        }
    }
}

#[async_trait]
impl CartItemTable for MemoryCartTable {
    #[instrument(skip(self))]
    async fn fetch_by_cart(&self, cart_id: CartId) -> Result<Vec<CartItemRow>, RepositoryError> {
        let tables = self.enter(TableOperation::FetchByCart).await?;
        Ok(tables
            .rows
            .iter()
            .filter(|row| row.cart_id == cart_id)
            .cloned()
            .collect())
    }

    #[instrument(skip(self, item), fields(cart_id = %item.cart_id, name = %item.name))]
    async fn insert(&self, item: &NewCartItem) -> Result<CartItemRow, RepositoryError> {
        let mut tables = self.enter(TableOperation::Insert).await?;

        if tables
            .rows
            .iter()
            .any(|row| row.cart_id == item.cart_id && row.name == item.name.as_str())
        {
            return Err(RepositoryError::Conflict(format!(
                "cart {} already has an item named {}",
                item.cart_id, item.name
            )));
        }

        let row = CartItemRow {
            id: CartItemId::generate(),
            cart_id: item.cart_id,
            name: item.name.as_str().to_owned(),
            image: item.image.clone(),
            price: item.price,
            qty: i64::from(item.qty),
        };
        tables.rows.push(row.clone());
        Ok(row)
    }

    #[instrument(skip(self))]
    async fn update_quantity(
        &self,
        id: &CartItemId,
        qty: Quantity,
    ) -> Result<(), RepositoryError> {
        let mut tables = self.enter(TableOperation::UpdateQuantity).await?;
        let row = tables
            .rows
            .iter_mut()
            .find(|row| row.id == *id)
            .ok_or(RepositoryError::NotFound)?;
        row.qty = i64::from(qty);
        Ok(())
    }

    #[instrument(skip(self), fields(count = ids.len()))]
    async fn delete_by_ids(&self, ids: &[CartItemId]) -> Result<(), RepositoryError> {
        let mut tables = self.enter(TableOperation::DeleteByIds).await?;
        tables.rows.retain(|row| !ids.contains(&row.id));
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use mauve_core::{Price, ProductName};

    use super::*;

    fn new_item(cart_id: CartId, name: &str) -> NewCartItem {
        NewCartItem {
            cart_id,
            name: ProductName::parse(name).unwrap(),
            image: None,
            price: Price::parse_display("100"),
            qty: Quantity::ONE,
        }
    }

    #[tokio::test]
    async fn test_insert_assigns_id_and_fetch_filters_by_cart() {
        let table = MemoryCartTable::new();
        let mine = CartId::generate();
        let theirs = CartId::generate();

        let row = table.insert(&new_item(mine, "Gel")).await.unwrap();
        table.insert(&new_item(theirs, "Gel")).await.unwrap();

        let fetched = table.fetch_by_cart(mine).await.unwrap();
        assert_eq!(fetched, vec![row]);
    }

    #[tokio::test]
    async fn test_insert_rejects_duplicate_name() {
        let table = MemoryCartTable::new();
        let cart = CartId::generate();
        table.insert(&new_item(cart, "Gel")).await.unwrap();

        let err = table.insert(&new_item(cart, "Gel")).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_update_missing_row() {
        let table = MemoryCartTable::new();
        let err = table
            .update_quantity(&CartItemId::generate(), Quantity::ONE)
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));
    }

    #[tokio::test]
    async fn test_fail_next_is_one_shot() {
        let table = MemoryCartTable::new();
        table.fail_next(TableOperation::FetchByCart);

        assert!(table.fetch_by_cart(CartId::generate()).await.is_err());
        assert!(table.fetch_by_cart(CartId::generate()).await.is_ok());
        assert_eq!(table.calls(TableOperation::FetchByCart), 2);
    }

    #[tokio::test]
    async fn test_fail_always_until_recovered() {
        let table = MemoryCartTable::new();
        let cart = CartId::generate();
        table.fail_always(TableOperation::Insert);

        assert!(table.insert(&new_item(cart, "A")).await.is_err());
        assert!(table.insert(&new_item(cart, "A")).await.is_err());
        assert!(table.rows().is_empty());

        table.recover(TableOperation::Insert);
        assert!(table.insert(&new_item(cart, "A")).await.is_ok());
    }

    #[tokio::test]
    async fn test_delete_ignores_unknown_ids() {
        let table = MemoryCartTable::new();
        let cart = CartId::generate();
        let row = table.insert(&new_item(cart, "A")).await.unwrap();

        table
            .delete_by_ids(&[row.id, CartItemId::from(99)])
            .await
            .unwrap();
        assert!(table.rows().is_empty());
    }
}
