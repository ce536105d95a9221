//! Background reconcilers.
//!
//! Two jobs run on fixed intervals alongside request traffic:
//! - [`AutoCancelJob`] cancels orders left pending past a staleness window
//!   and restores their stock.
//! - [`StockSyncJob`] overwrites each product's ledger aggregate with the sum
//!   of its active warehouse cells.
//!
//! Both go through the same atomic record operations as the request path and
//! never assume exclusive access to a record.

pub mod auto_cancel;
pub mod error;
pub mod scheduler;
pub mod stock_sync;

pub use auto_cancel::{AutoCancelJob, CancelReport, OrderCanceller};
pub use error::{ReconcileError, Result};
pub use scheduler::{PeriodicJob, spawn_periodic};
pub use stock_sync::{StockSyncJob, SyncReport};
