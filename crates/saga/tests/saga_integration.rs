//! Integration tests for the order saga wired in-process.

use common::{Money, OrderId, ProductId, UserId, WarehouseId};
use domain::{
    DomainError, LineItem, NewProduct, NewWarehouse, OrderStatus, StockCell, WarehouseStatus,
};
use inventory::{InventoryError, Ledger, StockLedger, WarehouseAllocator};
use saga::{OrderSaga, SagaError, ShopForwarder};
use store::{InMemoryStore, StockRepository};

type TestLedger = StockLedger<InMemoryStore>;
type TestAllocator = WarehouseAllocator<InMemoryStore, TestLedger>;
type TestSaga = OrderSaga<InMemoryStore, TestLedger, ShopForwarder<TestAllocator>, TestAllocator>;

struct TestHarness {
    saga: TestSaga,
    ledger: TestLedger,
    allocator: TestAllocator,
    store: InMemoryStore,
    product: ProductId,
    w1: WarehouseId,
    w2: WarehouseId,
}

impl TestHarness {
    /// Product priced 100 with cells W1=3 and W2=5, aggregate 8.
    async fn new() -> Self {
        let store = InMemoryStore::new();
        let ledger = StockLedger::new(store.clone());
        let allocator = WarehouseAllocator::new(store.clone(), ledger.clone());
        let saga = OrderSaga::new(
            store.clone(),
            ledger.clone(),
            ShopForwarder::new(allocator.clone()),
            allocator.clone(),
        );

        let product = ledger
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
            saga,
            ledger,
            allocator,
            store,
            product,
            w1,
            w2,
        }
    }

    async fn aggregate(&self) -> i64 {
        self.ledger.get_stock(self.product).await.unwrap().stock
    }

    async fn cell(&self, warehouse_id: WarehouseId) -> i64 {
        self.store
            .get_cell(self.product, warehouse_id)
            .await
            .unwrap()
            .unwrap()
            .quantity
    }

    async fn order(&self, quantity: i64) -> OrderId {
        self.saga
            .create_order(UserId::new(1), vec![LineItem::new(self.product, quantity)])
            .await
            .unwrap()
            .id
    }
}

#[tokio::test]
async fn test_checkout_then_payment_allocates_from_warehouses() {
    let h = TestHarness::new().await;
    assert_eq!(h.aggregate().await, 8);

    let order = h
        .saga
        .create_order(UserId::new(1), vec![LineItem::new(h.product, 6)])
        .await
        .unwrap();
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.total_price, Money::from_cents(600));
    assert_eq!(h.aggregate().await, 2);

    let paid = h.saga.process_payment(order.id, true).await.unwrap();
    assert_eq!(paid.status, OrderStatus::Success);
    assert_eq!(h.cell(h.w1).await, 0);
    assert_eq!(h.cell(h.w2).await, 2);
    assert_eq!(h.aggregate().await, 2);
}

#[tokio::test]
async fn test_checkout_over_stock_is_rejected() {
    let h = TestHarness::new().await;

    let result = h
        .saga
        .create_order(UserId::new(1), vec![LineItem::new(h.product, 9)])
        .await;

    assert!(matches!(
        result,
        Err(SagaError::InsufficientStock {
            requested: 9,
            available: 8,
            ..
        })
    ));
    assert_eq!(h.aggregate().await, 8);
    assert_eq!(h.store.order_count().await, 0);
}

#[tokio::test]
async fn test_earlier_items_stay_deducted_when_later_item_fails() {
    let h = TestHarness::new().await;

    let result = h
        .saga
        .create_order(
            UserId::new(1),
            vec![LineItem::new(h.product, 2), LineItem::new(h.product, 7)],
        )
        .await;

    assert!(matches!(result, Err(SagaError::InsufficientStock { .. })));
    assert_eq!(h.aggregate().await, 6);
    assert_eq!(h.store.order_count().await, 0);
}

#[tokio::test]
async fn test_checkout_total_past_max_is_rejected_before_deducting() {
    let h = TestHarness::new().await;
    let pricey = h
        .ledger
        .create_product(NewProduct::new("Vault", Money::from_cents(i64::MAX / 2 + 1), 3))
        .await
        .unwrap()
        .id;

    let result = h
        .saga
        .create_order(UserId::new(1), vec![LineItem::new(pricey, 2)])
        .await;

    assert!(matches!(
        result,
        Err(SagaError::Validation(DomainError::AmountOverflow { product_id })) if product_id == pricey
    ));
    assert_eq!(h.ledger.get_stock(pricey).await.unwrap().stock, 3);
    assert_eq!(h.store.order_count().await, 0);
}

#[tokio::test]
async fn test_concurrent_checkouts_never_oversell() {
    let h = TestHarness::new().await;

    let mut handles = Vec::new();
    for _ in 0..20 {
        let saga = h.saga.clone();
        let product = h.product;
        handles.push(tokio::spawn(async move {
            saga.create_order(UserId::new(1), vec![LineItem::new(product, 3)])
                .await
                .is_ok()
        }));
    }

    let mut deducted = 0;
    for handle in handles {
        if handle.await.unwrap() {
            deducted += 3;
        }
    }

    assert!(deducted <= 8);
    assert_eq!(deducted, 6);
    assert_eq!(h.aggregate().await, 2);
}

#[tokio::test]
async fn test_rejected_payment_cancels_and_restores_aggregate() {
    let h = TestHarness::new().await;
    let order_id = h.order(6).await;

    let cancelled = h.saga.process_payment(order_id, false).await.unwrap();

    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    assert_eq!(h.aggregate().await, 8);
    assert_eq!(h.cell(h.w1).await, 3);
    assert_eq!(h.cell(h.w2).await, 5);
}

#[tokio::test]
async fn test_direct_cancel_restores_aggregate() {
    let h = TestHarness::new().await;
    let order_id = h.order(4).await;
    assert_eq!(h.aggregate().await, 4);

    let cancelled = h.saga.cancel_order(order_id).await.unwrap();

    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    assert_eq!(h.aggregate().await, 8);
}

#[tokio::test]
async fn test_terminal_orders_reject_further_decisions() {
    let h = TestHarness::new().await;

    let paid = h.order(1).await;
    h.saga.process_payment(paid, true).await.unwrap();

    let cancelled = h.order(1).await;
    h.saga.cancel_order(cancelled).await.unwrap();

    for order_id in [paid, cancelled] {
        assert!(matches!(
            h.saga.process_payment(order_id, true).await,
            Err(SagaError::InvalidState { .. })
        ));
        assert!(matches!(
            h.saga.process_payment(order_id, false).await,
            Err(SagaError::InvalidState { .. })
        ));
        assert!(matches!(
            h.saga.cancel_order(order_id).await,
            Err(SagaError::InvalidState { .. })
        ));
    }

    let stored = h.saga.get_order(paid).await.unwrap();
    assert_eq!(stored.status, OrderStatus::Success);
}

#[tokio::test]
async fn test_forward_failure_leaves_order_pending() {
    let h = TestHarness::new().await;
    // Aggregate above what the cells can cover
    h.ledger.set_absolute(h.product, 20).await.unwrap();
    let order_id = h.order(12).await;

    let result = h.saga.process_payment(order_id, true).await;

    assert!(matches!(
        result,
        Err(SagaError::Inventory(
            InventoryError::InsufficientStockForProduct(_)
        ))
    ));
    let order = h.saga.get_order(order_id).await.unwrap();
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(h.aggregate().await, 8);
    assert_eq!(h.cell(h.w1).await, 0);
    assert_eq!(h.cell(h.w2).await, 0);
}

#[tokio::test]
async fn test_concurrent_cancels_restore_once() {
    let h = TestHarness::new().await;
    let order_id = h.order(5).await;

    let (a, b) = tokio::join!(h.saga.cancel_order(order_id), h.saga.cancel_order(order_id));

    assert_eq!([a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(), 1);
    assert_eq!(h.aggregate().await, 8);
}

#[tokio::test]
async fn test_restore_after_deactivation_is_capped() {
    let h = TestHarness::new().await;
    let order_id = h.order(6).await;
    h.allocator.deactivate(h.w2).await.unwrap();

    h.saga.cancel_order(order_id).await.unwrap();

    // Only W1's 3 units are visible; the aggregate was 2 after checkout.
    assert_eq!(h.aggregate().await, 3);
}
