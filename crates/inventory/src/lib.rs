//! Stock ledger and warehouse allocator.
//!
//! Physical inventory lives in per-(product, warehouse) stock cells owned by
//! the [`WarehouseAllocator`]. The [`Ledger`] holds a per-product aggregate
//! derived from those cells, used for fast availability checks when orders are
//! placed. The aggregate may lag the cells until the next push or sync pass.

pub mod allocator;
pub mod error;
pub mod ledger;

pub use allocator::{Allocation, StockTotals, Transfer, WarehouseAllocator};
pub use error::{InventoryError, Result};
pub use ledger::{Ledger, StockLedger};
