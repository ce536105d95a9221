//! Multi-warehouse stock cells and order allocation.

use std::sync::Arc;

use async_trait::async_trait;
use common::{ProductId, WarehouseId};
use domain::{LineItem, NewWarehouse, StockCell, Warehouse, WarehouseStatus};
use serde::{Deserialize, Serialize};
use store::{Deduction, StockRepository, WarehouseRepository};

use crate::error::{InventoryError, Result};
use crate::ledger::Ledger;

/// Units of one product drawn from one warehouse while fulfilling an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    pub product_id: ProductId,
    pub warehouse_id: WarehouseId,
    pub quantity: i64,
}

/// Both cells touched by a completed transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub from: StockCell,
    pub to: StockCell,
}

/// Source of a product's stock total across active warehouses.
#[async_trait]
pub trait StockTotals: Send + Sync {
    async fn compute_total_stock(&self, product_id: ProductId) -> Result<i64>;
}

#[async_trait]
impl<T> StockTotals for Arc<T>
where
    T: StockTotals + ?Sized,
{
    async fn compute_total_stock(&self, product_id: ProductId) -> Result<i64> {
        (**self).compute_total_stock(product_id).await
    }
}

/// Owns stock cells and warehouse status, and keeps the ledger aggregate in
/// step after every single-cell mutation.
#[derive(Debug, Clone)]
pub struct WarehouseAllocator<S, L> {
    store: S,
    ledger: L,
}

fn require_positive(quantity: i64) -> Result<()> {
    if quantity <= 0 {
        return Err(InventoryError::Validation(format!(
            "quantity must be positive, got {quantity}"
        )));
    }
    Ok(())
}

fn total_out_of_range(product_id: ProductId) -> InventoryError {
    InventoryError::Validation(format!(
        "stock total for product {product_id} would exceed {}",
        i64::MAX
    ))
}

impl<S, L> WarehouseAllocator<S, L>
where
    S: WarehouseRepository + StockRepository,
    L: Ledger,
{
    pub fn new(store: S, ledger: L) -> Self {
        Self { store, ledger }
    }

    /// Returns the ledger this allocator pushes totals to.
    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    #[tracing::instrument(skip(self, warehouse), fields(name = %warehouse.name))]
    pub async fn create_warehouse(&self, warehouse: NewWarehouse) -> Result<Warehouse> {
        if warehouse.name.trim().is_empty() {
            return Err(InventoryError::Validation(
                "warehouse name must not be empty".to_string(),
            ));
        }

        let warehouse = self.store.insert_warehouse(warehouse).await?;
        tracing::info!(warehouse_id = %warehouse.id, status = %warehouse.status, "warehouse created");
        Ok(warehouse)
    }

    pub async fn get_warehouse(&self, warehouse_id: WarehouseId) -> Result<Warehouse> {
        self.store
            .get_warehouse(warehouse_id)
            .await?
            .ok_or(InventoryError::WarehouseNotFound(warehouse_id))
    }

    /// Creates the cell for a (product, warehouse) pair.
    ///
    /// This is the only way a cell comes into existence; `add_stock_cell`
    /// on an unregistered pair fails with `CellNotFound`.
    #[tracing::instrument(skip(self))]
    pub async fn register_cell(&self, cell: StockCell) -> Result<StockCell> {
        if cell.quantity < 0 {
            return Err(InventoryError::Validation(format!(
                "quantity must not be negative, got {}",
                cell.quantity
            )));
        }
        self.ledger.get_stock(cell.product_id).await?;
        self.get_warehouse(cell.warehouse_id).await?;
        self.ensure_total_fits(cell.product_id, cell.quantity).await?;

        let cell = self
            .store
            .insert_cell(cell)
            .await
            .map_err(InventoryError::for_cell(cell.product_id, cell.warehouse_id))?;
        metrics::counter!("stock_cell_mutations_total", "operation" => "register").increment(1);

        self.push_total(cell.product_id).await?;
        Ok(cell)
    }

    #[tracing::instrument(skip(self))]
    pub async fn add_stock_cell(
        &self,
        product_id: ProductId,
        warehouse_id: WarehouseId,
        quantity: i64,
    ) -> Result<StockCell> {
        require_positive(quantity)?;
        self.ensure_total_fits(product_id, quantity).await?;

        let cell = self
            .store
            .add_to_cell(product_id, warehouse_id, quantity)
            .await
            .map_err(InventoryError::for_cell(product_id, warehouse_id))?;
        metrics::counter!("stock_cell_mutations_total", "operation" => "add").increment(1);
        tracing::info!(quantity = cell.quantity, "stock added");

        self.push_total(product_id).await?;
        Ok(cell)
    }

    #[tracing::instrument(skip(self))]
    pub async fn remove_stock_cell(
        &self,
        product_id: ProductId,
        warehouse_id: WarehouseId,
        quantity: i64,
    ) -> Result<StockCell> {
        require_positive(quantity)?;

        let cell = match self
            .store
            .remove_from_cell(product_id, warehouse_id, quantity)
            .await
            .map_err(InventoryError::for_cell(product_id, warehouse_id))?
        {
            Deduction::Applied(cell) => cell,
            Deduction::Insufficient { available } => {
                return Err(InventoryError::InsufficientCellStock {
                    product_id,
                    warehouse_id,
                    requested: quantity,
                    available,
                });
            }
        };
        metrics::counter!("stock_cell_mutations_total", "operation" => "remove").increment(1);
        tracing::info!(quantity = cell.quantity, "stock removed");

        self.push_total(product_id).await?;
        Ok(cell)
    }

    /// Moves stock between two warehouses as a remove followed by an add.
    ///
    /// The two steps are independent: if the add fails, the removed units are
    /// not put back and the error is [`InventoryError::TransferIncomplete`].
    #[tracing::instrument(skip(self))]
    pub async fn transfer_stock(
        &self,
        product_id: ProductId,
        from: WarehouseId,
        to: WarehouseId,
        quantity: i64,
    ) -> Result<Transfer> {
        if from == to {
            return Err(InventoryError::Validation(
                "source and destination warehouse must differ".to_string(),
            ));
        }

        let source = self.remove_stock_cell(product_id, from, quantity).await?;
        let destination = match self.add_stock_cell(product_id, to, quantity).await {
            Ok(cell) => cell,
            Err(err) => {
                tracing::error!(error = %err, "transfer destination failed after source removal");
                return Err(InventoryError::TransferIncomplete {
                    product_id,
                    from,
                    to,
                    quantity,
                    source: Box::new(err),
                });
            }
        };

        metrics::counter!("stock_cell_mutations_total", "operation" => "transfer").increment(1);
        Ok(Transfer {
            from: source,
            to: destination,
        })
    }

    /// Sums a product's cells across active warehouses.
    ///
    /// A warehouse without a cell for the product contributes nothing.
    pub async fn compute_total_stock(&self, product_id: ProductId) -> Result<i64> {
        let mut total: i64 = 0;
        for warehouse in self.store.active_warehouses().await? {
            if let Some(cell) = self.store.get_cell(product_id, warehouse.id).await? {
                total = total
                    .checked_add(cell.quantity)
                    .ok_or_else(|| total_out_of_range(product_id))?;
            }
        }
        Ok(total)
    }

    #[tracing::instrument(skip(self))]
    pub async fn set_warehouse_status(
        &self,
        warehouse_id: WarehouseId,
        status: WarehouseStatus,
    ) -> Result<Warehouse> {
        let warehouse = self
            .store
            .set_warehouse_status(warehouse_id, status)
            .await
            .map_err(InventoryError::for_warehouse(warehouse_id))?;
        tracing::info!(status = %warehouse.status, "warehouse status set");
        Ok(warehouse)
    }

    /// Activates a currently active warehouse and deactivates an inactive one.
    ///
    /// The branch follows the status read at call time, so the call never
    /// changes anything. Use [`activate`](Self::activate) or
    /// [`deactivate`](Self::deactivate) to actually change status.
    #[tracing::instrument(skip(self))]
    pub async fn toggle_status(&self, warehouse_id: WarehouseId) -> Result<Warehouse> {
        let warehouse = self.get_warehouse(warehouse_id).await?;

        if warehouse.status.is_active() {
            self.activate(warehouse.id).await
        } else {
            self.deactivate(warehouse.id).await
        }
    }

    pub async fn activate(&self, warehouse_id: WarehouseId) -> Result<Warehouse> {
        self.set_warehouse_status(warehouse_id, WarehouseStatus::Active)
            .await
    }

    pub async fn deactivate(&self, warehouse_id: WarehouseId) -> Result<Warehouse> {
        self.set_warehouse_status(warehouse_id, WarehouseStatus::Inactive)
            .await
    }

    /// Draws each requested quantity from active warehouses in ascending
    /// identifier order, emptying cells greedily until the request is met.
    ///
    /// Items are processed in request order. When an item cannot be covered
    /// the call fails with `InsufficientStockForProduct`; cells already drawn
    /// for that item and for earlier items stay drawn.
    #[tracing::instrument(skip(self, items), fields(items = items.len()))]
    pub async fn allocate_for_order(&self, items: &[LineItem]) -> Result<Vec<Allocation>> {
        LineItem::validate_all(items)?;

        let mut allocations = Vec::new();
        for item in items {
            let mut remaining = item.quantity;

            for warehouse in self.store.active_warehouses().await? {
                if remaining == 0 {
                    break;
                }
                let Some(taken) = self
                    .store
                    .take_from_cell(item.product_id, warehouse.id, remaining)
                    .await?
                else {
                    continue;
                };
                if taken > 0 {
                    remaining -= taken;
                    allocations.push(Allocation {
                        product_id: item.product_id,
                        warehouse_id: warehouse.id,
                        quantity: taken,
                    });
                }
            }

            if remaining > 0 {
                metrics::counter!("stock_allocations_total", "outcome" => "insufficient")
                    .increment(1);
                tracing::warn!(
                    product_id = %item.product_id,
                    requested = item.quantity,
                    shortfall = remaining,
                    "allocation could not cover requested quantity"
                );
                return Err(InventoryError::InsufficientStockForProduct(item.product_id));
            }
        }

        metrics::counter!("stock_allocations_total", "outcome" => "success").increment(1);
        tracing::info!(allocations = allocations.len(), "order allocated");
        Ok(allocations)
    }

    /// Returns quantities released by a cancelled order to the ledger.
    ///
    /// Each increment is capped so the aggregate never exceeds the product's
    /// active-warehouse total.
    #[tracing::instrument(skip(self, items), fields(items = items.len()))]
    pub async fn restore_stock(&self, items: &[LineItem]) -> Result<()> {
        LineItem::validate_all(items)?;

        for item in items {
            let total = self.compute_total_stock(item.product_id).await?;
            let current = self.ledger.get_stock(item.product_id).await?.stock;
            let restorable = item.quantity.min(total - current);

            if restorable <= 0 {
                tracing::warn!(
                    product_id = %item.product_id,
                    requested = item.quantity,
                    "aggregate already at warehouse total, nothing restored"
                );
                continue;
            }
            if restorable < item.quantity {
                tracing::warn!(
                    product_id = %item.product_id,
                    requested = item.quantity,
                    restored = restorable,
                    "restoration capped at warehouse total"
                );
            }

            self.ledger.increment(item.product_id, restorable).await?;
            metrics::counter!("stock_restorations_total").increment(1);
        }
        Ok(())
    }

    /// Rejects an addition that would take the product's total past `i64::MAX`.
    ///
    /// Cells in inactive warehouses are not counted here, so reactivating one
    /// can still push the total out of range; `compute_total_stock` reports that.
    async fn ensure_total_fits(&self, product_id: ProductId, quantity: i64) -> Result<()> {
        self.compute_total_stock(product_id)
            .await?
            .checked_add(quantity)
            .map(|_| ())
            .ok_or_else(|| total_out_of_range(product_id))
    }

    /// Recomputes a product's total and overwrites the ledger aggregate.
    async fn push_total(&self, product_id: ProductId) -> Result<i64> {
        let total = self.compute_total_stock(product_id).await?;
        self.ledger.set_absolute(product_id, total).await?;
        tracing::debug!(%product_id, total, "aggregate pushed to ledger");
        Ok(total)
    }
}

#[async_trait]
impl<S, L> StockTotals for WarehouseAllocator<S, L>
where
    S: WarehouseRepository + StockRepository,
    L: Ledger,
{
    async fn compute_total_stock(&self, product_id: ProductId) -> Result<i64> {
        WarehouseAllocator::compute_total_stock(self, product_id).await
    }
}
