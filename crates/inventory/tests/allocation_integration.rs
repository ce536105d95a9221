//! Integration tests for the warehouse allocator against the in-memory store.

use common::{Money, ProductId, WarehouseId};
use domain::{LineItem, NewProduct, NewWarehouse, StockCell, WarehouseStatus};
use inventory::{InventoryError, Ledger, StockLedger, WarehouseAllocator};
use store::{InMemoryStore, StockRepository};

type TestAllocator = WarehouseAllocator<InMemoryStore, StockLedger<InMemoryStore>>;

struct TestHarness {
    allocator: TestAllocator,
    store: InMemoryStore,
    product: ProductId,
    w1: WarehouseId,
    w2: WarehouseId,
}

impl TestHarness {
    /// Product with cells W1=3 and W2=5 in two active warehouses.
    async fn new() -> Self {
        let store = InMemoryStore::new();
        let allocator = WarehouseAllocator::new(store.clone(), StockLedger::new(store.clone()));

        let product = allocator
            .ledger()
            .create_product(NewProduct::new("Widget", Money::from_cents(100), 0))
            .await
            .unwrap()
            .id;
        let w1 = allocator
            .create_warehouse(NewWarehouse::new("W1", WarehouseStatus::Active))
            .await
            .unwrap()
            .id;
        let w2 = allocator
            .create_warehouse(NewWarehouse::new("W2", WarehouseStatus::Active))
            .await
            .unwrap()
            .id;

        allocator
            .register_cell(StockCell::new(product, w1, 3))
            .await
            .unwrap();
        allocator
            .register_cell(StockCell::new(product, w2, 5))
            .await
            .unwrap();

        Self {
            allocator,
            store,
            product,
            w1,
            w2,
        }
    }

    async fn cell(&self, warehouse_id: WarehouseId) -> i64 {
        self.store
            .get_cell(self.product, warehouse_id)
            .await
            .unwrap()
            .unwrap()
            .quantity
    }

    async fn aggregate(&self) -> i64 {
        self.allocator
            .ledger()
            .get_stock(self.product)
            .await
            .unwrap()
            .stock
    }
}

#[tokio::test]
async fn test_remove_beyond_cell_is_rejected() {
    let h = TestHarness::new().await;

    let result = h.allocator.remove_stock_cell(h.product, h.w2, 6).await;
    assert!(matches!(
        result,
        Err(InventoryError::InsufficientCellStock {
            requested: 6,
            available: 5,
            ..
        })
    ));
    assert_eq!(h.cell(h.w2).await, 5);
    assert_eq!(h.aggregate().await, 8);
}

#[tokio::test]
async fn test_allocation_drains_warehouses_greedily() {
    let h = TestHarness::new().await;

    h.allocator
        .allocate_for_order(&[LineItem::new(h.product, 6)])
        .await
        .unwrap();

    assert_eq!(h.cell(h.w1).await, 0);
    assert_eq!(h.cell(h.w2).await, 2);
}

#[tokio::test]
async fn test_allocation_shortfall_keeps_partial_draws() {
    let h = TestHarness::new().await;

    let result = h
        .allocator
        .allocate_for_order(&[LineItem::new(h.product, 10)])
        .await;

    assert!(matches!(
        result,
        Err(InventoryError::InsufficientStockForProduct(p)) if p == h.product
    ));
    assert_eq!(h.cell(h.w1).await, 0);
    assert_eq!(h.cell(h.w2).await, 0);
}

#[tokio::test]
async fn test_allocation_does_not_roll_back_earlier_items() {
    let h = TestHarness::new().await;
    let other = h
        .allocator
        .ledger()
        .create_product(NewProduct::new("Gadget", Money::from_cents(50), 0))
        .await
        .unwrap()
        .id;
    h.allocator
        .register_cell(StockCell::new(other, h.w1, 1))
        .await
        .unwrap();

    let result = h
        .allocator
        .allocate_for_order(&[LineItem::new(h.product, 4), LineItem::new(other, 2)])
        .await;

    assert!(matches!(
        result,
        Err(InventoryError::InsufficientStockForProduct(p)) if p == other
    ));
    assert_eq!(h.cell(h.w1).await, 0);
    assert_eq!(h.cell(h.w2).await, 4);
}

#[tokio::test]
async fn test_allocation_skips_inactive_warehouse() {
    let h = TestHarness::new().await;
    h.allocator.deactivate(h.w1).await.unwrap();

    h.allocator
        .allocate_for_order(&[LineItem::new(h.product, 4)])
        .await
        .unwrap();

    assert_eq!(h.cell(h.w1).await, 3);
    assert_eq!(h.cell(h.w2).await, 1);
}

#[tokio::test]
async fn test_allocation_skips_warehouse_without_cell() {
    let h = TestHarness::new().await;
    let w0 = h
        .allocator
        .create_warehouse(NewWarehouse::new("Empty", WarehouseStatus::Active))
        .await
        .unwrap()
        .id;

    assert_eq!(h.allocator.compute_total_stock(h.product).await.unwrap(), 8);
    h.allocator
        .allocate_for_order(&[LineItem::new(h.product, 8)])
        .await
        .unwrap();

    assert!(h.store.get_cell(h.product, w0).await.unwrap().is_none());
    assert_eq!(h.cell(h.w2).await, 0);
}

#[tokio::test]
async fn test_transfer_moves_stock_and_keeps_total() {
    let h = TestHarness::new().await;

    let transfer = h
        .allocator
        .transfer_stock(h.product, h.w2, h.w1, 4)
        .await
        .unwrap();

    assert_eq!(transfer.from.quantity, 1);
    assert_eq!(transfer.to.quantity, 7);
    assert_eq!(h.aggregate().await, 8);
}

#[tokio::test]
async fn test_transfer_to_missing_cell_loses_source_stock() {
    let h = TestHarness::new().await;
    let w3 = h
        .allocator
        .create_warehouse(NewWarehouse::new("W3", WarehouseStatus::Active))
        .await
        .unwrap()
        .id;

    let result = h.allocator.transfer_stock(h.product, h.w2, w3, 2).await;

    match result {
        Err(InventoryError::TransferIncomplete {
            quantity, source, ..
        }) => {
            assert_eq!(quantity, 2);
            assert!(matches!(*source, InventoryError::CellNotFound { .. }));
        }
        other => panic!("expected TransferIncomplete, got {other:?}"),
    }
    assert_eq!(h.cell(h.w2).await, 3);
    assert_eq!(h.aggregate().await, 6);
}

#[tokio::test]
async fn test_transfer_with_insufficient_source_changes_nothing() {
    let h = TestHarness::new().await;

    let result = h.allocator.transfer_stock(h.product, h.w1, h.w2, 4).await;

    assert!(matches!(
        result,
        Err(InventoryError::InsufficientCellStock { .. })
    ));
    assert_eq!(h.cell(h.w1).await, 3);
    assert_eq!(h.cell(h.w2).await, 5);
}

#[tokio::test]
async fn test_concurrent_removals_never_overdraw_a_cell() {
    let h = TestHarness::new().await;

    let mut handles = Vec::new();
    for _ in 0..10 {
        let allocator = h.allocator.clone();
        let (p, w) = (h.product, h.w2);
        handles.push(tokio::spawn(async move {
            allocator.remove_stock_cell(p, w, 2).await.is_ok()
        }));
    }

    let mut succeeded = 0;
    for handle in handles {
        if handle.await.unwrap() {
            succeeded += 1;
        }
    }

    assert_eq!(succeeded, 2);
    assert_eq!(h.cell(h.w2).await, 1);
}

#[tokio::test]
async fn test_add_past_max_is_rejected_and_leaves_cell() {
    let h = TestHarness::new().await;

    let result = h.allocator.add_stock_cell(h.product, h.w2, i64::MAX).await;
    assert!(matches!(result, Err(InventoryError::Validation(_))));
    assert_eq!(h.cell(h.w2).await, 5);
    assert_eq!(h.aggregate().await, 8);

    let result = h
        .allocator
        .add_stock_cell(h.product, h.w2, i64::MAX - 8)
        .await
        .unwrap();
    assert_eq!(result.quantity, i64::MAX - 3);
    assert_eq!(h.aggregate().await, i64::MAX);
}

#[tokio::test]
async fn test_total_past_max_is_a_validation_error() {
    let h = TestHarness::new().await;
    let w3 = h
        .allocator
        .create_warehouse(NewWarehouse::new("W3", WarehouseStatus::Active))
        .await
        .unwrap()
        .id;
    h.store
        .insert_cell(StockCell::new(h.product, w3, i64::MAX))
        .await
        .unwrap();

    assert!(matches!(
        h.allocator.compute_total_stock(h.product).await,
        Err(InventoryError::Validation(_))
    ));
    assert!(matches!(
        h.allocator.add_stock_cell(h.product, h.w1, 1).await,
        Err(InventoryError::Validation(_))
    ));
    assert_eq!(h.cell(h.w1).await, 3);
}
