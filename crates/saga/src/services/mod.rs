//! Collaborator seams for the order saga.

pub mod shop;
pub mod warehouse;

pub use shop::{ShopClient, ShopForwarder, ShopOrder};
pub use warehouse::WarehouseClient;
