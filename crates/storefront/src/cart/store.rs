//! The cart session store.
//!
//! # Lifecycle
//!
//! ```text
//! new() ──► [Loading] ──load()──► [Ready] ──close()──► closed (Ready, inert)
//!                          │
//!                          └── fetch failed: Ready with no items, load_failed()
//! ```
//!
//! `Ready` is terminal. A failed load does not produce a separate error state;
//! callers read [`CartStore::is_initialized`] or the error `load()` returned.
//!
//! # Ordering
//!
//! Every mutation calls the remote store first and touches local state only
//! after the remote call succeeded. Same-name mutations are serialized by a
//! per-name lock; `clear_cart` excludes all other mutations while it runs.
//! Mutations issued while `Loading` fail fast with `NotReady` rather than
//! queueing behind the fetch.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rust_decimal::Decimal;
use serde::Serialize;
use tokio::sync::{RwLock, watch};
use tracing::{debug, error, info, instrument, warn};

use mauve_core::{CartId, CartItemId, Price, ProductName, Quantity};

use super::error::{CartError, CartOperation};
use super::event::{CartEvent, CartEventKind};
use super::item::{CartItem, ProductInput, total_of};
use super::locks::NameLocks;
use crate::db::{CartItemTable, NewCartItem, RepositoryError};
use crate::identity::SessionIdentity;

/// Where the store is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CartPhase {
    /// Initial fetch not finished.
    Loading,
    /// Items known (possibly empty, possibly because the fetch failed).
    Ready,
}

/// Outcome of the initial fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
enum LoadStatus {
    Pending,
    Loaded,
    Failed(String),
}

#[derive(Debug)]
struct CartState {
    phase: CartPhase,
    load: LoadStatus,
    items: Vec<CartItem>,
    last_event_id: u64,
}

/// Point-in-time view of the cart, for rendering and checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartSnapshot {
    pub cart_id: CartId,
    pub items: Vec<CartItem>,
    pub total: Decimal,
    pub item_count: u64,
}

impl CartSnapshot {
    /// Whether there is nothing to check out.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Anonymous shopping cart for one device, synchronized with a remote table.
///
/// Cheap to clone; clones share the same cart. Construct one per device
/// session and pass it to whatever needs the cart.
#[derive(Clone)]
pub struct CartStore {
    inner: Arc<CartStoreInner>,
}

struct CartStoreInner {
    cart_id: CartId,
    table: Arc<dyn CartItemTable>,
    state: RwLock<CartState>,
    /// Shared by per-name mutations, exclusive for load and clear.
    gate: RwLock<()>,
    names: NameLocks,
    open: AtomicBool,
    closed: AtomicBool,
    events: watch::Sender<Option<CartEvent>>,
}

impl CartStore {
    /// Create a store in the `Loading` phase. Call [`Self::load`] next.
    #[must_use]
    pub fn new(identity: SessionIdentity, table: Arc<dyn CartItemTable>) -> Self {
        let (events, _) = watch::channel(None);

        Self {
            inner: Arc::new(CartStoreInner {
                cart_id: identity.cart_id(),
                table,
                state: RwLock::new(CartState {
                    phase: CartPhase::Loading,
                    load: LoadStatus::Pending,
                    items: Vec::new(),
                    last_event_id: 0,
                }),
                gate: RwLock::new(()),
                names: NameLocks::default(),
                open: AtomicBool::new(false),
                closed: AtomicBool::new(false),
                events,
            }),
        }
    }

    /// Create a store and run the initial fetch.
    ///
    /// The store is returned even when the fetch fails, alongside the error, so
    /// callers can keep a usable (empty, uninitialized) cart.
    pub async fn open(
        identity: SessionIdentity,
        table: Arc<dyn CartItemTable>,
    ) -> (Self, Result<usize, CartError>) {
        let store = Self::new(identity, table);
        let loaded = store.load().await;
        (store, loaded)
    }

    /// Fetch the cart's rows and move to `Ready`.
    ///
    /// Only the first call fetches; later calls report the original outcome.
    /// Returns the number of lines loaded.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Initialization` if the fetch failed (or returned
    /// rows that are not valid cart items). Items stay empty in that case.
    /// Returns `CartError::Closed` if the store was closed before the fetch
    /// finished; the phase then stays `Loading`.
    #[instrument(skip(self), fields(cart_id = %self.inner.cart_id))]
    pub async fn load(&self) -> Result<usize, CartError> {
        self.ensure_open()?;
        let _exclusive = self.inner.gate.write().await;

        {
            let state = self.inner.state.read().await;
            match &state.load {
                LoadStatus::Pending => {}
                LoadStatus::Loaded => return Ok(state.items.len()),
                LoadStatus::Failed(message) => {
                    return Err(self.initialization_error(RepositoryError::Unavailable(
                        message.clone(),
                    )));
                }
            }
        }

        let fetched = self
            .inner
            .table
            .fetch_by_cart(self.inner.cart_id)
            .await
            .and_then(|rows| {
                rows.into_iter()
                    .map(CartItem::try_from)
                    .collect::<Result<Vec<_>, _>>()
            })
            .and_then(|items| self.check_partition(items));
        self.ensure_open()?;

        let mut state = self.inner.state.write().await;
        state.phase = CartPhase::Ready;

        match fetched {
            Ok(items) => {
                let count = items.len();
                state.items = items;
                state.load = LoadStatus::Loaded;
                info!(count, "cart loaded");
                Ok(count)
            }
            Err(e) => {
                error!(error = %e, "cart load failed");
                state.load = LoadStatus::Failed(e.to_string());
                Err(self.initialization_error(e))
            }
        }
    }

    /// Add one unit of `product`.
    ///
    /// A product whose name is already in the cart gets its quantity raised by
    /// one; otherwise a new line with quantity 1 is inserted. The price is
    /// normalized on every call but only stored for new lines.
    ///
    /// # Errors
    ///
    /// - `CartError::Validation` for an empty name (no remote call is made)
    /// - `CartError::Mutation` if the remote insert/update failed
    /// - `CartError::NotReady` / `CartError::Closed` for lifecycle violations
    #[instrument(skip(self, product), fields(cart_id = %self.inner.cart_id, name = %product.name))]
    pub async fn add_item(&self, product: ProductInput) -> Result<CartEvent, CartError> {
        self.ensure_open()?;
        let name = ProductName::parse(&product.name)?;
        let price = Price::normalize(&product.price);

        self.ensure_ready().await?;
        let _shared = self.inner.gate.read().await;
        let _name_guard = self.inner.names.lock(&name).await;

        let existing = {
            let state = self.inner.state.read().await;
            state
                .items
                .iter()
                .find(|item| item.name == name)
                .map(|item| (item.id.clone(), item.qty))
        };

        match existing {
            Some((id, qty)) => self.increment(id, qty, name).await,
            None => self.insert(name, price, product.image).await,
        }
    }

    async fn increment(
        &self,
        id: CartItemId,
        qty: Quantity,
        name: ProductName,
    ) -> Result<CartEvent, CartError> {
        let next = qty
            .incremented()
            .map_err(|source| CartError::QuantityLimit {
                product: name.clone(),
                source,
            })?;

        self.inner
            .table
            .update_quantity(&id, next)
            .await
            .map_err(|source| {
                error!(error = %source, "quantity update failed");
                mutation(CartOperation::AddItem, Some(&name), source)
            })?;
        self.ensure_open()?;

        let mut state = self.inner.state.write().await;
        match state.items.iter_mut().find(|item| item.id == id) {
            Some(item) => item.qty = next,
            None => warn!(%id, "line vanished while its name lock was held"),
        }
        let event = self.emit(&mut state, CartEventKind::AddedAgain, Some(&name));
        info!(qty = next.get(), "cart line incremented");
        Ok(event)
    }

    async fn insert(
        &self,
        name: ProductName,
        price: Price,
        image: Option<String>,
    ) -> Result<CartEvent, CartError> {
        let new_item = NewCartItem {
            cart_id: self.inner.cart_id,
            name: name.clone(),
            image,
            price,
            qty: Quantity::ONE,
        };

        let item = self
            .inner
            .table
            .insert(&new_item)
            .await
            .and_then(CartItem::try_from)
            .and_then(|item| self.check_row(item, &name))
            .map_err(|source| {
                error!(error = %source, "insert failed");
                mutation(CartOperation::AddItem, Some(&name), source)
            })?;
        self.ensure_open()?;

        let mut state = self.inner.state.write().await;
        state.items.push(item);
        let event = self.emit(&mut state, CartEventKind::Added, Some(&name));
        info!(%price, "cart line added");
        Ok(event)
    }

    /// Remove the line named `name`.
    ///
    /// Returns `Ok(None)` without touching the remote store when no such line
    /// exists.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Mutation` if the remote delete failed, or a
    /// lifecycle error.
    #[instrument(skip(self), fields(cart_id = %self.inner.cart_id))]
    pub async fn remove_item(&self, name: &str) -> Result<Option<CartEvent>, CartError> {
        self.ensure_open()?;
        let Ok(name) = ProductName::parse(name) else {
            debug!("blank name, nothing to remove");
            return Ok(None);
        };

        self.ensure_ready().await?;
        let _shared = self.inner.gate.read().await;
        let _name_guard = self.inner.names.lock(&name).await;

        let id = {
            let state = self.inner.state.read().await;
            state
                .items
                .iter()
                .find(|item| item.name == name)
                .map(|item| item.id.clone())
        };
        let Some(id) = id else {
            debug!("no such line, nothing to remove");
            return Ok(None);
        };

        self.inner
            .table
            .delete_by_ids(std::slice::from_ref(&id))
            .await
            .map_err(|source| {
                error!(error = %source, "delete failed");
                mutation(CartOperation::RemoveItem, Some(&name), source)
            })?;
        self.ensure_open()?;

        let mut state = self.inner.state.write().await;
        state.items.retain(|item| item.id != id);
        let event = self.emit(&mut state, CartEventKind::Removed, Some(&name));
        info!("cart line removed");
        Ok(Some(event))
    }

    /// Remove every line in one remote batch.
    ///
    /// Returns `Ok(None)` without a remote call when the cart is already empty.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Mutation` if the remote delete failed, or a
    /// lifecycle error.
    #[instrument(skip(self), fields(cart_id = %self.inner.cart_id))]
    pub async fn clear_cart(&self) -> Result<Option<CartEvent>, CartError> {
        self.ensure_open()?;
        self.ensure_ready().await?;
        let _exclusive = self.inner.gate.write().await;

        let ids: Vec<CartItemId> = {
            let state = self.inner.state.read().await;
            state.items.iter().map(|item| item.id.clone()).collect()
        };
        if ids.is_empty() {
            debug!("cart already empty");
            return Ok(None);
        }

        self.inner
            .table
            .delete_by_ids(&ids)
            .await
            .map_err(|source| {
                error!(error = %source, count = ids.len(), "batch delete failed");
                mutation(CartOperation::ClearCart, None, source)
            })?;
        self.ensure_open()?;

        let mut state = self.inner.state.write().await;
        state.items.clear();
        let event = self.emit(&mut state, CartEventKind::Cleared, None);
        info!(count = ids.len(), "cart cleared");
        Ok(Some(event))
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    /// The cart's partition key.
    #[must_use]
    pub fn cart_id(&self) -> CartId {
        self.inner.cart_id
    }

    /// Current lifecycle phase.
    pub async fn phase(&self) -> CartPhase {
        self.inner.state.read().await.phase
    }

    /// Whether the initial fetch succeeded. `false` while loading and after a
    /// failed load; this is what separates "empty" from "unknown".
    pub async fn is_initialized(&self) -> bool {
        self.inner.state.read().await.load == LoadStatus::Loaded
    }

    /// Lines in display order.
    pub async fn items(&self) -> Vec<CartItem> {
        self.inner.state.read().await.items.clone()
    }

    /// The line named `name`, if present.
    pub async fn item(&self, name: &str) -> Option<CartItem> {
        let name = name.trim();
        self.inner
            .state
            .read()
            .await
            .items
            .iter()
            .find(|item| item.name.as_str() == name)
            .cloned()
    }

    /// Σ price × qty, recomputed on every call.
    pub async fn total(&self) -> Decimal {
        total_of(&self.inner.state.read().await.items)
    }

    /// Total units across all lines.
    pub async fn item_count(&self) -> u64 {
        self.inner
            .state
            .read()
            .await
            .items
            .iter()
            .map(|item| u64::from(item.qty.get()))
            .sum()
    }

    /// Consistent view of items and derived values.
    pub async fn snapshot(&self) -> CartSnapshot {
        let state = self.inner.state.read().await;
        CartSnapshot {
            cart_id: self.inner.cart_id,
            items: state.items.clone(),
            total: total_of(&state.items),
            item_count: state.items.iter().map(|item| u64::from(item.qty.get())).sum(),
        }
    }

    /// The most recent notification, if any mutation has succeeded.
    #[must_use]
    pub fn last_event(&self) -> Option<CartEvent> {
        self.inner.events.borrow().clone()
    }

    /// Watch for notifications.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<CartEvent>> {
        self.inner.events.subscribe()
    }

    // -------------------------------------------------------------------------
    // Presentation flag
    // -------------------------------------------------------------------------

    /// Whether the cart panel is shown.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.inner.open.load(Ordering::Relaxed)
    }

    /// Show or hide the cart panel.
    pub fn set_open(&self, open: bool) {
        self.inner.open.store(open, Ordering::Relaxed);
    }

    /// Flip the cart panel, returning the new value.
    pub fn toggle_open(&self) -> bool {
        !self.inner.open.fetch_xor(true, Ordering::Relaxed)
    }

    // -------------------------------------------------------------------------
    // Teardown
    // -------------------------------------------------------------------------

    /// Tear the store down. In-flight remote calls still complete, but their
    /// results are not applied, and new calls fail with `CartError::Closed`.
    pub fn close(&self) {
        if !self.inner.closed.swap(true, Ordering::SeqCst) {
            info!(cart_id = %self.inner.cart_id, "cart store closed");
        }
    }

    /// Whether [`Self::close`] has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    fn ensure_open(&self) -> Result<(), CartError> {
        if self.is_closed() {
            debug!("store closed, dropping result");
            return Err(CartError::Closed);
        }
        Ok(())
    }

    async fn ensure_ready(&self) -> Result<(), CartError> {
        match self.inner.state.read().await.phase {
            CartPhase::Ready => Ok(()),
            CartPhase::Loading => Err(CartError::NotReady),
        }
    }

    fn emit(
        &self,
        state: &mut CartState,
        kind: CartEventKind,
        product: Option<&ProductName>,
    ) -> CartEvent {
        state.last_event_id += 1;
        let event = CartEvent::new(state.last_event_id, kind, product);
        self.inner.events.send_replace(Some(event.clone()));
        event
    }

    fn initialization_error(&self, source: RepositoryError) -> CartError {
        CartError::Initialization {
            cart_id: self.inner.cart_id,
            source,
        }
    }

    fn check_partition(&self, items: Vec<CartItem>) -> Result<Vec<CartItem>, RepositoryError> {
        if let Some(stray) = items.iter().find(|item| item.cart_id != self.inner.cart_id) {
            return Err(RepositoryError::DataCorruption(format!(
                "fetch returned item {} from cart {}",
                stray.id, stray.cart_id
            )));
        }
        Ok(items)
    }

    fn check_row(&self, item: CartItem, name: &ProductName) -> Result<CartItem, RepositoryError> {
        if item.cart_id != self.inner.cart_id || &item.name != name {
            return Err(RepositoryError::DataCorruption(format!(
                "insert returned item {} ({} in cart {})",
                item.id, item.name, item.cart_id
            )));
        }
        Ok(item)
    }
}

fn mutation(
    operation: CartOperation,
    product: Option<&ProductName>,
    source: RepositoryError,
) -> CartError {
    CartError::Mutation {
        operation,
        product: product.cloned(),
        source,
    }
}
