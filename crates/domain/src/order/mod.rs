//! Order records and the order status state machine.

mod model;
mod state;

pub use model::{LineItem, NewOrder, Order, OrderItem};
pub use state::OrderStatus;
