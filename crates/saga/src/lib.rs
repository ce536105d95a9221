//! Order fulfillment saga.
//!
//! An order moves through these steps, each a separate call with no shared
//! transaction:
//! 1. Reserve stock in the ledger, one line item at a time
//! 2. Persist the order as `pending`
//! 3. On a positive payment decision, forward it through the shop to
//!    warehouse allocation and mark it `success`
//!
//! A negative payment decision, a direct cancel, and the expiry reconciler all
//! go through one compensation routine that cancels the order and restores its
//! stock through the warehouse allocator.

pub mod coordinator;
pub mod error;
pub mod services;

pub use coordinator::{CancelReason, OrderSaga};
pub use error::{Result, SagaError};
pub use services::{ShopClient, ShopForwarder, ShopOrder, WarehouseClient};
