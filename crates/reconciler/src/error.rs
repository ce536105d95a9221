//! Reconciler error types.

use inventory::InventoryError;
use store::StoreError;
use thiserror::Error;

/// Errors that abort a whole reconciler run.
///
/// Failures on individual records are logged and counted in the run report
/// instead.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The order scan could not be performed.
    #[error("Failed to scan orders: {0}")]
    Store(#[from] StoreError),

    /// The product listing could not be fetched.
    #[error("Failed to list products: {0}")]
    Inventory(#[from] InventoryError),
}

/// Convenience type alias for reconciler results.
pub type Result<T> = std::result::Result<T, ReconcileError>;
