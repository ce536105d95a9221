//! Cancels orders left pending past the staleness window.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use common::OrderId;
use domain::{Order, OrderStatus};
use inventory::Ledger;
use saga::{OrderSaga, SagaError, ShopClient, WarehouseClient};
use store::OrderRepository;

use crate::error::Result;
use crate::scheduler::PeriodicJob;

/// Cancels a single expired order, restoring its stock.
#[async_trait]
pub trait OrderCanceller: Send + Sync {
    async fn cancel_expired(&self, order_id: OrderId) -> std::result::Result<Order, SagaError>;
}

#[async_trait]
impl<O, L, Sh, W> OrderCanceller for OrderSaga<O, L, Sh, W>
where
    O: OrderRepository,
    L: Ledger,
    Sh: ShopClient,
    W: WarehouseClient,
{
    async fn cancel_expired(&self, order_id: OrderId) -> std::result::Result<Order, SagaError> {
        OrderSaga::cancel_expired(self, order_id).await
    }
}

/// Outcome of one auto-cancel run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CancelReport {
    /// Pending orders older than the cutoff.
    pub scanned: usize,
    pub cancelled: usize,
    /// Orders that left `pending` between the scan and the cancel.
    pub skipped: usize,
    pub failed: usize,
}

/// Finds pending orders older than `staleness` and cancels each one.
#[derive(Debug, Clone)]
pub struct AutoCancelJob<O, C> {
    orders: O,
    canceller: C,
    staleness: Duration,
}

impl<O: OrderRepository, C: OrderCanceller> AutoCancelJob<O, C> {
    pub fn new(orders: O, canceller: C, staleness: Duration) -> Self {
        Self {
            orders,
            canceller,
            staleness,
        }
    }

    pub async fn run(&self) -> Result<CancelReport> {
        self.run_at(Utc::now()).await
    }

    /// Cancels every order still pending that was created before
    /// `now - staleness`.
    ///
    /// A failure on one order is logged and the scan moves on.
    #[tracing::instrument(skip(self))]
    pub async fn run_at(&self, now: DateTime<Utc>) -> Result<CancelReport> {
        let cutoff = now - self.staleness;
        let stale = self
            .orders
            .find_stale_orders(OrderStatus::Pending, cutoff)
            .await?;

        let mut report = CancelReport {
            scanned: stale.len(),
            ..CancelReport::default()
        };

        for order in stale {
            match self.canceller.cancel_expired(order.id).await {
                Ok(_) => {
                    report.cancelled += 1;
                    metrics::counter!("reconciler_orders_cancelled_total").increment(1);
                }
                Err(SagaError::InvalidState { actual, .. }) => {
                    report.skipped += 1;
                    tracing::warn!(order_id = %order.id, status = %actual, "order no longer pending, skipped");
                }
                Err(err) => {
                    report.failed += 1;
                    tracing::error!(order_id = %order.id, error = %err, "failed to cancel expired order");
                }
            }
        }

        metrics::counter!("reconciler_runs_total", "job" => "auto_cancel").increment(1);
        tracing::info!(
            scanned = report.scanned,
            cancelled = report.cancelled,
            skipped = report.skipped,
            failed = report.failed,
            "auto-cancel run finished"
        );
        Ok(report)
    }
}

#[async_trait]
impl<O, C> PeriodicJob for AutoCancelJob<O, C>
where
    O: OrderRepository + 'static,
    C: OrderCanceller + 'static,
{
    fn name(&self) -> &'static str {
        "auto_cancel"
    }

    async fn tick(&self) {
        if let Err(err) = self.run().await {
            tracing::error!(error = %err, "auto-cancel run aborted");
        }
    }
}
