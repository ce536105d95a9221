//! Saga error types.

use common::{OrderId, ProductId};
use domain::{DomainError, OrderStatus};
use inventory::InventoryError;
use store::StoreError;
use thiserror::Error;

/// Errors that can occur during saga operations.
#[derive(Debug, Error)]
pub enum SagaError {
    /// The order request is malformed.
    #[error("Invalid order: {0}")]
    Validation(#[from] DomainError),

    /// Order not found.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// The order is not in the status the operation requires.
    #[error("Invalid order state for order {order_id}: expected {expected}, actual {actual}")]
    InvalidState {
        order_id: OrderId,
        expected: OrderStatus,
        actual: OrderStatus,
    },

    /// The ledger holds less of a product than the order requests.
    #[error(
        "Insufficient stock for product {product_id}: requested {requested}, available {available}"
    )]
    InsufficientStock {
        product_id: ProductId,
        requested: i64,
        available: i64,
    },

    /// The ledger or the warehouse allocator rejected a call.
    #[error("Inventory error: {0}")]
    Inventory(#[from] InventoryError),

    /// A remote collaborator failed or returned a non-success response.
    #[error("Upstream call '{operation}' failed: {reason}")]
    Upstream {
        operation: &'static str,
        reason: String,
    },

    /// Order store error.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl SagaError {
    /// Maps a store `NotFound` onto the order it concerns.
    pub(crate) fn for_order(order_id: OrderId) -> impl FnOnce(StoreError) -> Self {
        move |err| {
            if err.is_not_found() {
                SagaError::OrderNotFound(order_id)
            } else {
                SagaError::Store(err)
            }
        }
    }
}

/// Convenience type alias for saga results.
pub type Result<T> = std::result::Result<T, SagaError>;
