//! Domain error types.

use common::ProductId;
use thiserror::Error;

/// Errors raised when building or parsing domain records.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// An order was requested without line items.
    #[error("Order has no items")]
    NoItems,

    /// A line item quantity was zero or negative.
    #[error("Invalid quantity {quantity} for product {product_id} (must be greater than 0)")]
    InvalidQuantity { product_id: ProductId, quantity: i64 },

    /// A price computation left the representable range.
    #[error("Order total for product {product_id} exceeds the supported amount")]
    AmountOverflow { product_id: ProductId },

    /// A status string did not name a known status.
    #[error("Unknown {kind} status: {value}")]
    UnknownStatus { kind: &'static str, value: String },
}
