use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{OrderId, ProductId, WarehouseId};
use domain::{
    NewOrder, NewProduct, NewWarehouse, Order, OrderStatus, Product, StockCell, Warehouse,
    WarehouseStatus,
};

use crate::Result;

/// Outcome of a floor-checked decrement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Deduction<T> {
    /// The decrement was applied; carries the updated record.
    Applied(T),
    /// The record held less than requested and was left unchanged.
    Insufficient { available: i64 },
}

/// Outcome of a compare-and-set status transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// The order was in the expected status and now carries the new one.
    Applied(Order),
    /// The order was in another status and was left unchanged.
    Rejected { actual: OrderStatus },
}

/// Order ledger persistence.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Inserts a pending order with its items and assigns an identifier.
    async fn insert_order(&self, order: NewOrder) -> Result<Order>;

    /// Loads an order with its items.
    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>>;

    /// Moves an order from `from` to `to` only if it is currently in `from`.
    ///
    /// Fails with `NotFound` if the order does not exist.
    async fn transition_status(
        &self,
        order_id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<Transition>;

    /// Returns orders in `status` created strictly before `created_before`,
    /// oldest first.
    async fn find_stale_orders(
        &self,
        status: OrderStatus,
        created_before: DateTime<Utc>,
    ) -> Result<Vec<Order>>;
}

/// Product aggregate-stock persistence.
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Inserts a product and assigns an identifier.
    async fn insert_product(&self, product: NewProduct) -> Result<Product>;

    /// Loads a product.
    async fn get_product(&self, product_id: ProductId) -> Result<Option<Product>>;

    /// Lists every product, ordered by identifier.
    async fn list_products(&self) -> Result<Vec<Product>>;

    /// Subtracts `quantity` from the aggregate only if at least that much is held.
    async fn decrement_stock(
        &self,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<Deduction<Product>>;

    /// Adds `quantity` to the aggregate.
    async fn increment_stock(&self, product_id: ProductId, quantity: i64) -> Result<Product>;

    /// Overwrites the aggregate.
    async fn set_stock(&self, product_id: ProductId, stock: i64) -> Result<Product>;
}

/// Warehouse persistence.
#[async_trait]
pub trait WarehouseRepository: Send + Sync {
    /// Inserts a warehouse and assigns an identifier.
    async fn insert_warehouse(&self, warehouse: NewWarehouse) -> Result<Warehouse>;

    /// Loads a warehouse.
    async fn get_warehouse(&self, warehouse_id: WarehouseId) -> Result<Option<Warehouse>>;

    /// Sets the status of a warehouse.
    async fn set_warehouse_status(
        &self,
        warehouse_id: WarehouseId,
        status: WarehouseStatus,
    ) -> Result<Warehouse>;

    /// Lists active warehouses in ascending identifier order.
    async fn active_warehouses(&self) -> Result<Vec<Warehouse>>;
}

/// Stock cell persistence.
#[async_trait]
pub trait StockRepository: Send + Sync {
    /// Registers a new cell. Fails with `AlreadyExists` on a duplicate key.
    async fn insert_cell(&self, cell: StockCell) -> Result<StockCell>;

    /// Loads a cell.
    async fn get_cell(
        &self,
        product_id: ProductId,
        warehouse_id: WarehouseId,
    ) -> Result<Option<StockCell>>;

    /// Adds `quantity` to an existing cell.
    async fn add_to_cell(
        &self,
        product_id: ProductId,
        warehouse_id: WarehouseId,
        quantity: i64,
    ) -> Result<StockCell>;

    /// Subtracts `quantity` from a cell only if at least that much is held.
    async fn remove_from_cell(
        &self,
        product_id: ProductId,
        warehouse_id: WarehouseId,
        quantity: i64,
    ) -> Result<Deduction<StockCell>>;

    /// Subtracts `min(quantity held, max)` from a cell and returns the amount
    /// taken, or `None` if no cell exists for the pair.
    async fn take_from_cell(
        &self,
        product_id: ProductId,
        warehouse_id: WarehouseId,
        max: i64,
    ) -> Result<Option<i64>>;
}

/// A store backing every repository at once.
pub trait Store:
    OrderRepository + ProductRepository + WarehouseRepository + StockRepository + Clone + 'static
{
}

impl<T> Store for T where
    T: OrderRepository
        + ProductRepository
        + WarehouseRepository
        + StockRepository
        + Clone
        + 'static
{
}
