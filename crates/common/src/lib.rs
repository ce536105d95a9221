//! Shared identifier and money types used by every inventory service.

mod money;
mod types;

pub use money::Money;
pub use types::{OrderId, ProductId, UserId, WarehouseId};
