//! Persistence for the inventory services.
//!
//! Each service owns its records through one of the repository traits in
//! [`store`]. Floor-checked decrements and order status transitions are single
//! atomic operations in every implementation, so callers never need to hold a
//! lock across a read and a write.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use store::{
    Deduction, OrderRepository, ProductRepository, StockRepository, Store, Transition,
    WarehouseRepository,
};
