//! Interleaved mutations and teardown while remote calls are in flight.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use rust_decimal::Decimal;

use mauve_core::Quantity;
use mauve_integration_tests::{GatedTable, store_over};
use mauve_storefront::cart::{CartError, CartEventKind, CartPhase, ProductInput};
use mauve_storefront::db::{CartItemTable, MemoryCartTable, TableOperation};

// =============================================================================
// Same-Name Serialization
// =============================================================================

#[tokio::test]
async fn test_concurrent_adds_of_one_product_count_twice() {
    let table = Arc::new(MemoryCartTable::new());
    let cart = store_over(Arc::clone(&table) as Arc<dyn CartItemTable>);
    cart.load().await.unwrap();

    let (a, b) = tokio::join!(
        cart.add_item(ProductInput::new("Gel", 100)),
        cart.add_item(ProductInput::new("Gel", 100)),
    );

    let mut kinds = [a.unwrap().kind, b.unwrap().kind];
    kinds.sort_by_key(|kind| *kind == CartEventKind::AddedAgain);
    assert_eq!(kinds, [CartEventKind::Added, CartEventKind::AddedAgain]);

    let items = cart.items().await;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].qty, Quantity::new(2).unwrap());
    assert_eq!(table.calls(TableOperation::Insert), 1);
    assert_eq!(table.calls(TableOperation::UpdateQuantity), 1);
    assert_eq!(table.rows()[0].qty, 2);
}

#[tokio::test]
async fn test_many_spawned_adds_are_not_lost() {
    let table = Arc::new(MemoryCartTable::new());
    let cart = store_over(Arc::clone(&table) as Arc<dyn CartItemTable>);
    cart.load().await.unwrap();

    let handles: Vec<_> = (0..10)
        .map(|_| {
            let cart = cart.clone();
            tokio::spawn(async move { cart.add_item(ProductInput::new("Gel", 100)).await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(cart.item("Gel").await.unwrap().qty.get(), 10);
    assert_eq!(cart.total().await, Decimal::from(1000));
    assert_eq!(table.rows()[0].qty, 10);
}

#[tokio::test]
async fn test_different_products_interleave() {
    let table = Arc::new(GatedTable::new());
    let cart = store_over(Arc::clone(&table) as Arc<dyn CartItemTable>);
    cart.load().await.unwrap();

    table.hold(TableOperation::Insert);
    let slow = tokio::spawn({
        let cart = cart.clone();
        async move { cart.add_item(ProductInput::new("Slow", 1)).await }
    });
    table.wait_entered().await;
    table.unhold(TableOperation::Insert);

    // A different name is not blocked by the parked insert.
    cart.add_item(ProductInput::new("Fast", 2)).await.unwrap();
    assert!(cart.item("Fast").await.is_some());
    assert!(cart.item("Slow").await.is_none());

    table.release(1);
    slow.await.unwrap().unwrap();
    assert_eq!(cart.items().await.len(), 2);
}

// =============================================================================
// Clear Exclusion
// =============================================================================

#[tokio::test]
async fn test_clear_waits_for_in_flight_add() {
    let table = Arc::new(GatedTable::new());
    let cart = store_over(Arc::clone(&table) as Arc<dyn CartItemTable>);
    cart.load().await.unwrap();
    cart.add_item(ProductInput::new("Gel", 100)).await.unwrap();

    table.hold(TableOperation::Insert);
    let add = tokio::spawn({
        let cart = cart.clone();
        async move { cart.add_item(ProductInput::new("Oil", 50)).await }
    });
    table.wait_entered().await;

    let clear = tokio::spawn({
        let cart = cart.clone();
        async move { cart.clear_cart().await }
    });
    tokio::task::yield_now().await;
    assert_eq!(table.table().calls(TableOperation::DeleteByIds), 0);

    table.release(1);
    add.await.unwrap().unwrap();
    let cleared = clear.await.unwrap().unwrap().unwrap();

    assert_eq!(cleared.kind, CartEventKind::Cleared);
    assert!(cart.items().await.is_empty());
    assert!(table.table().rows().is_empty());
}

// =============================================================================
// Loading Phase
// =============================================================================

#[tokio::test]
async fn test_mutations_during_load_are_rejected() {
    let table = Arc::new(GatedTable::new());
    let cart = store_over(Arc::clone(&table) as Arc<dyn CartItemTable>);

    table.hold(TableOperation::FetchByCart);
    let load = tokio::spawn({
        let cart = cart.clone();
        async move { cart.load().await }
    });
    table.wait_entered().await;

    assert_eq!(cart.phase().await, CartPhase::Loading);
    let err = cart
        .add_item(ProductInput::new("Gel", 100))
        .await
        .unwrap_err();
    assert!(matches!(err, CartError::NotReady));
    assert_eq!(table.table().calls(TableOperation::Insert), 0);

    table.release(1);
    assert_eq!(load.await.unwrap().unwrap(), 0);
    assert_eq!(cart.phase().await, CartPhase::Ready);
    cart.add_item(ProductInput::new("Gel", 100)).await.unwrap();
}

// =============================================================================
// Teardown
// =============================================================================

#[tokio::test]
async fn test_close_drops_in_flight_result() {
    let table = Arc::new(GatedTable::new());
    let cart = store_over(Arc::clone(&table) as Arc<dyn CartItemTable>);
    cart.load().await.unwrap();

    table.hold(TableOperation::Insert);
    let add = tokio::spawn({
        let cart = cart.clone();
        async move { cart.add_item(ProductInput::new("Gel", 100)).await }
    });
    table.wait_entered().await;

    cart.close();
    table.release(1);

    let err = add.await.unwrap().unwrap_err();
    assert!(matches!(err, CartError::Closed));
    assert!(cart.items().await.is_empty());
    assert!(cart.last_event().is_none());
    // The remote call itself completed.
    assert_eq!(table.table().rows().len(), 1);
}

#[tokio::test]
async fn test_close_during_load_keeps_store_inert() {
    let table = Arc::new(GatedTable::new());
    let cart = store_over(Arc::clone(&table) as Arc<dyn CartItemTable>);

    table.hold(TableOperation::FetchByCart);
    let load = tokio::spawn({
        let cart = cart.clone();
        async move { cart.load().await }
    });
    table.wait_entered().await;

    cart.close();
    table.release(1);
    assert!(matches!(load.await.unwrap(), Err(CartError::Closed)));

    assert!(cart.is_closed());
    assert_eq!(cart.phase().await, CartPhase::Loading);
    assert!(matches!(
        cart.remove_item("Gel").await,
        Err(CartError::Closed)
    ));
    assert!(matches!(cart.clear_cart().await, Err(CartError::Closed)));
}
