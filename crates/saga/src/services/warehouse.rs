//! Warehouse fulfillment seam.

use std::sync::Arc;

use async_trait::async_trait;
use common::OrderId;
use domain::LineItem;
use inventory::{Allocation, Ledger, WarehouseAllocator};
use store::{StockRepository, WarehouseRepository};

/// The warehouse allocator's order-facing entry points.
///
/// Errors are the allocator's own so that they reach the caller verbatim.
#[async_trait]
pub trait WarehouseClient: Send + Sync {
    /// Draws an order's line items from warehouse stock cells.
    async fn allocate_for_order(
        &self,
        order_id: OrderId,
        items: &[LineItem],
    ) -> inventory::Result<Vec<Allocation>>;

    /// Returns a cancelled order's line items to stock.
    async fn restore_stock(&self, order_id: OrderId, items: &[LineItem]) -> inventory::Result<()>;
}

#[async_trait]
impl<T> WarehouseClient for Arc<T>
where
    T: WarehouseClient + ?Sized,
{
    async fn allocate_for_order(
        &self,
        order_id: OrderId,
        items: &[LineItem],
    ) -> inventory::Result<Vec<Allocation>> {
        (**self).allocate_for_order(order_id, items).await
    }

    async fn restore_stock(&self, order_id: OrderId, items: &[LineItem]) -> inventory::Result<()> {
        (**self).restore_stock(order_id, items).await
    }
}

#[async_trait]
impl<S, L> WarehouseClient for WarehouseAllocator<S, L>
where
    S: WarehouseRepository + StockRepository,
    L: Ledger,
{
    async fn allocate_for_order(
        &self,
        order_id: OrderId,
        items: &[LineItem],
    ) -> inventory::Result<Vec<Allocation>> {
        tracing::debug!(%order_id, "allocating order in-process");
        WarehouseAllocator::allocate_for_order(self, items).await
    }

    async fn restore_stock(&self, order_id: OrderId, items: &[LineItem]) -> inventory::Result<()> {
        tracing::debug!(%order_id, "restoring order stock in-process");
        WarehouseAllocator::restore_stock(self, items).await
    }
}
