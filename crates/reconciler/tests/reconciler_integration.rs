//! Integration tests for the auto-cancel and stock-sync reconcilers.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use common::{Money, OrderId, ProductId, UserId, WarehouseId};
use domain::{LineItem, NewProduct, NewWarehouse, Order, OrderStatus, StockCell, WarehouseStatus};
use inventory::{InventoryError, Ledger, StockLedger, StockTotals, WarehouseAllocator};
use reconciler::{AutoCancelJob, CancelReport, OrderCanceller, StockSyncJob, SyncReport};
use saga::{OrderSaga, SagaError, ShopForwarder};
use store::{InMemoryStore, StockRepository};

type TestLedger = StockLedger<InMemoryStore>;
type TestAllocator = WarehouseAllocator<InMemoryStore, TestLedger>;
type TestSaga = OrderSaga<InMemoryStore, TestLedger, ShopForwarder<TestAllocator>, TestAllocator>;

struct TestHarness {
    store: InMemoryStore,
    ledger: TestLedger,
    allocator: TestAllocator,
    saga: TestSaga,
    product: ProductId,
    w1: WarehouseId,
    w2: WarehouseId,
}

impl TestHarness {
    /// Product with cells W1=3 and W2=5, aggregate 8.
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
            store,
            ledger,
            allocator,
            saga,
            product,
            w1,
            w2,
        }
    }

    fn auto_cancel(&self) -> AutoCancelJob<InMemoryStore, TestSaga> {
        AutoCancelJob::new(self.store.clone(), self.saga.clone(), Duration::minutes(2))
    }

    async fn aggregate(&self, product_id: ProductId) -> i64 {
        self.ledger.get_stock(product_id).await.unwrap().stock
    }

    async fn order(&self, quantity: i64) -> Order {
        self.saga
            .create_order(UserId::new(1), vec![LineItem::new(self.product, quantity)])
            .await
            .unwrap()
    }
}

/// Canceller whose upstream is down for one order.
struct FailingCanceller {
    saga: TestSaga,
    broken: OrderId,
}

#[async_trait]
impl OrderCanceller for FailingCanceller {
    async fn cancel_expired(&self, order_id: OrderId) -> Result<Order, SagaError> {
        if order_id == self.broken {
            return Err(SagaError::Upstream {
                operation: "restore_stock",
                reason: "connection reset".to_string(),
            });
        }
        self.saga.cancel_expired(order_id).await
    }
}

/// Canceller that loses every race: a direct cancel lands between the scan
/// and its own compare-and-set.
struct RacedCanceller {
    saga: TestSaga,
}

#[async_trait]
impl OrderCanceller for RacedCanceller {
    async fn cancel_expired(&self, order_id: OrderId) -> Result<Order, SagaError> {
        self.saga.cancel_order(order_id).await?;
        self.saga.cancel_expired(order_id).await
    }
}

/// Totals source that fails for one product.
struct FlakyTotals {
    inner: TestAllocator,
    broken: ProductId,
}

#[async_trait]
impl StockTotals for FlakyTotals {
    async fn compute_total_stock(&self, product_id: ProductId) -> inventory::Result<i64> {
        if product_id == self.broken {
            return Err(InventoryError::Upstream {
                operation: "compute_total_stock",
                reason: "connection reset".to_string(),
            });
        }
        self.inner.compute_total_stock(product_id).await
    }
}

#[tokio::test]
async fn test_stale_pending_order_is_cancelled_and_restored() {
    let h = TestHarness::new().await;
    let order = h
        .saga
        .create_order(UserId::new(1), vec![LineItem::new(h.product, 6)])
        .await
        .unwrap();
    assert_eq!(h.aggregate(h.product).await, 2);

    let report = h
        .auto_cancel()
        .run_at(order.created_at + Duration::minutes(3))
        .await
        .unwrap();

    assert_eq!(
        report,
        CancelReport {
            scanned: 1,
            cancelled: 1,
            skipped: 0,
            failed: 0,
        }
    );
    let order = h.saga.get_order(order.id).await.unwrap();
    assert_eq!(order.status, OrderStatus::Cancelled);
    assert_eq!(h.aggregate(h.product).await, 8);
}

#[tokio::test]
async fn test_fresh_pending_order_is_left_alone() {
    let h = TestHarness::new().await;
    let order = h
        .saga
        .create_order(UserId::new(1), vec![LineItem::new(h.product, 2)])
        .await
        .unwrap();

    let report = h
        .auto_cancel()
        .run_at(order.created_at + Duration::minutes(1))
        .await
        .unwrap();

    assert_eq!(report.scanned, 0);
    let order = h.saga.get_order(order.id).await.unwrap();
    assert_eq!(order.status, OrderStatus::Pending);
}

#[tokio::test]
async fn test_paid_and_cancelled_orders_are_not_scanned() {
    let h = TestHarness::new().await;
    let paid = h
        .saga
        .create_order(UserId::new(1), vec![LineItem::new(h.product, 1)])
        .await
        .unwrap();
    h.saga.process_payment(paid.id, true).await.unwrap();
    let cancelled = h
        .saga
        .create_order(UserId::new(1), vec![LineItem::new(h.product, 1)])
        .await
        .unwrap();
    h.saga.cancel_order(cancelled.id).await.unwrap();

    let report = h
        .auto_cancel()
        .run_at(Utc::now() + Duration::minutes(10))
        .await
        .unwrap();

    assert_eq!(report, CancelReport::default());
    let paid = h.saga.get_order(paid.id).await.unwrap();
    assert_eq!(paid.status, OrderStatus::Success);
}

#[tokio::test]
async fn test_run_uses_wall_clock() {
    let h = TestHarness::new().await;
    let order = h.order(2).await;

    let report = h.auto_cancel().run().await.unwrap();
    assert_eq!(report.scanned, 0);

    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let immediate = AutoCancelJob::new(h.store.clone(), h.saga.clone(), Duration::zero());
    let report = immediate.run().await.unwrap();

    assert_eq!(report.cancelled, 1);
    assert_eq!(
        h.saga.get_order(order.id).await.unwrap().status,
        OrderStatus::Cancelled
    );
    assert_eq!(h.aggregate(h.product).await, 8);
}

#[tokio::test]
async fn test_failed_cancel_does_not_halt_the_scan() {
    let h = TestHarness::new().await;
    let broken = h.order(2).await;
    let healthy = h.order(3).await;
    assert_eq!(h.aggregate(h.product).await, 3);

    let job = AutoCancelJob::new(
        h.store.clone(),
        FailingCanceller {
            saga: h.saga.clone(),
            broken: broken.id,
        },
        Duration::minutes(2),
    );
    let report = job
        .run_at(healthy.created_at + Duration::minutes(3))
        .await
        .unwrap();

    assert_eq!(
        report,
        CancelReport {
            scanned: 2,
            cancelled: 1,
            skipped: 0,
            failed: 1,
        }
    );
    assert_eq!(
        h.saga.get_order(broken.id).await.unwrap().status,
        OrderStatus::Pending
    );
    assert_eq!(
        h.saga.get_order(healthy.id).await.unwrap().status,
        OrderStatus::Cancelled
    );
    assert_eq!(h.aggregate(h.product).await, 6);
}

#[tokio::test]
async fn test_order_cancelled_after_scan_is_skipped() {
    let h = TestHarness::new().await;
    let order = h.order(4).await;

    let job = AutoCancelJob::new(
        h.store.clone(),
        RacedCanceller {
            saga: h.saga.clone(),
        },
        Duration::minutes(2),
    );
    let report = job
        .run_at(order.created_at + Duration::minutes(3))
        .await
        .unwrap();

    assert_eq!(
        report,
        CancelReport {
            scanned: 1,
            cancelled: 0,
            skipped: 1,
            failed: 0,
        }
    );
    assert_eq!(
        h.saga.get_order(order.id).await.unwrap().status,
        OrderStatus::Cancelled
    );
    assert_eq!(h.aggregate(h.product).await, 8);
}

#[tokio::test]
async fn test_stock_sync_overwrites_aggregate_with_cell_total() {
    let h = TestHarness::new().await;
    h.ledger.set_absolute(h.product, 42).await.unwrap();
    h.allocator.deactivate(h.w1).await.unwrap();

    let job = StockSyncJob::new(h.ledger.clone(), h.allocator.clone());
    let report = job.run().await.unwrap();

    assert_eq!(
        report,
        SyncReport {
            synced: 1,
            unchanged: 0,
            failed: 0,
        }
    );
    let w2 = h.store.get_cell(h.product, h.w2).await.unwrap().unwrap();
    assert_eq!(h.aggregate(h.product).await, w2.quantity);
}

#[tokio::test]
async fn test_stock_sync_leaves_matching_aggregate() {
    let h = TestHarness::new().await;

    let job = StockSyncJob::new(h.ledger.clone(), h.allocator.clone());
    let report = job.run().await.unwrap();

    assert_eq!(report.unchanged, 1);
    assert_eq!(h.aggregate(h.product).await, 8);
}

#[tokio::test]
async fn test_stock_sync_isolates_failing_product() {
    let h = TestHarness::new().await;
    let other = h
        .ledger
        .create_product(NewProduct::new("Gadget", Money::from_cents(50), 99))
        .await
        .unwrap()
        .id;
    h.allocator
        .register_cell(StockCell::new(other, h.w1, 4))
        .await
        .unwrap();
    h.ledger.set_absolute(h.product, 0).await.unwrap();
    h.ledger.set_absolute(other, 0).await.unwrap();

    let job = StockSyncJob::new(
        h.ledger.clone(),
        FlakyTotals {
            inner: h.allocator.clone(),
            broken: h.product,
        },
    );
    let report = job.run().await.unwrap();

    assert_eq!(report.failed, 1);
    assert_eq!(report.synced, 1);
    assert_eq!(h.aggregate(h.product).await, 0);
    assert_eq!(h.aggregate(other).await, 4);
}
