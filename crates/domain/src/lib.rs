//! Domain records for the order and inventory services.
//!
//! This crate provides:
//! - `Order` / `OrderItem` with the `pending → success | cancelled` state machine
//! - `Product`, the aggregate-stock record owned by the stock ledger
//! - `Warehouse` and `StockCell`, the per-location source of truth
//! - `LineItem`, the (product, quantity) pair passed between services

pub mod error;
pub mod order;
pub mod product;
pub mod warehouse;

pub use common::{Money, OrderId, ProductId, UserId, WarehouseId};
pub use error::DomainError;
pub use order::{LineItem, NewOrder, Order, OrderItem, OrderStatus};
pub use product::{NewProduct, Product};
pub use warehouse::{NewWarehouse, StockCell, Warehouse, WarehouseStatus};
