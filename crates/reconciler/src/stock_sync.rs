//! Recomputes each product's aggregate from its warehouse cells.

use async_trait::async_trait;
use inventory::{Ledger, StockTotals};

use crate::error::Result;
use crate::scheduler::PeriodicJob;

/// Outcome of one stock-sync run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub synced: usize,
    /// Products whose aggregate already matched.
    pub unchanged: usize,
    pub failed: usize,
}

/// Overwrites every product's ledger aggregate with its active-warehouse total.
///
/// Products are isolated from each other: a failure on one is logged and the
/// run continues with the next.
#[derive(Debug, Clone)]
pub struct StockSyncJob<L, T> {
    ledger: L,
    totals: T,
}

impl<L: Ledger, T: StockTotals> StockSyncJob<L, T> {
    pub fn new(ledger: L, totals: T) -> Self {
        Self { ledger, totals }
    }

    #[tracing::instrument(skip(self))]
    pub async fn run(&self) -> Result<SyncReport> {
        let products = self.ledger.list_products().await?;
        let mut report = SyncReport::default();

        for product in products {
            let total = match self.totals.compute_total_stock(product.id).await {
                Ok(total) => total,
                Err(err) => {
                    report.failed += 1;
                    metrics::counter!("stock_sync_products_total", "outcome" => "failed")
                        .increment(1);
                    tracing::error!(product_id = %product.id, error = %err, "failed to compute total stock");
                    continue;
                }
            };

            if total == product.stock {
                report.unchanged += 1;
                metrics::counter!("stock_sync_products_total", "outcome" => "unchanged")
                    .increment(1);
                continue;
            }

            match self.ledger.set_absolute(product.id, total).await {
                Ok(_) => {
                    report.synced += 1;
                    metrics::counter!("stock_sync_products_total", "outcome" => "synced")
                        .increment(1);
                    tracing::debug!(product_id = %product.id, from = product.stock, to = total, "aggregate synced");
                }
                Err(err) => {
                    report.failed += 1;
                    metrics::counter!("stock_sync_products_total", "outcome" => "failed")
                        .increment(1);
                    tracing::error!(product_id = %product.id, error = %err, "failed to push total stock");
                }
            }
        }

        metrics::counter!("reconciler_runs_total", "job" => "stock_sync").increment(1);
        tracing::info!(
            synced = report.synced,
            unchanged = report.unchanged,
            failed = report.failed,
            "stock sync run finished"
        );
        Ok(report)
    }
}

#[async_trait]
impl<L, T> PeriodicJob for StockSyncJob<L, T>
where
    L: Ledger + 'static,
    T: StockTotals + 'static,
{
    fn name(&self) -> &'static str {
        "stock_sync"
    }

    async fn tick(&self) {
        if let Err(err) = self.run().await {
            tracing::error!(error = %err, "stock sync run aborted");
        }
    }
}
