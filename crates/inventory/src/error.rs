//! Inventory error types.

use common::{ProductId, WarehouseId};
use domain::DomainError;
use store::StoreError;
use thiserror::Error;

/// Errors returned by the stock ledger and the warehouse allocator.
#[derive(Debug, Error)]
pub enum InventoryError {
    /// Malformed or missing input.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A request item failed domain validation.
    #[error("Invalid request: {0}")]
    Domain(#[from] DomainError),

    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    #[error("Warehouse not found: {0}")]
    WarehouseNotFound(WarehouseId),

    #[error("Stock cell not found: product {product_id} in warehouse {warehouse_id}")]
    CellNotFound {
        product_id: ProductId,
        warehouse_id: WarehouseId,
    },

    #[error("Stock cell already exists: product {product_id} in warehouse {warehouse_id}")]
    CellAlreadyExists {
        product_id: ProductId,
        warehouse_id: WarehouseId,
    },

    /// The product aggregate holds less than requested.
    #[error(
        "Insufficient stock for product {product_id}: requested {requested}, available {available}"
    )]
    InsufficientStock {
        product_id: ProductId,
        requested: i64,
        available: i64,
    },

    /// A single stock cell holds less than requested.
    #[error(
        "Insufficient stock for product {product_id} in warehouse {warehouse_id}: requested {requested}, available {available}"
    )]
    InsufficientCellStock {
        product_id: ProductId,
        warehouse_id: WarehouseId,
        requested: i64,
        available: i64,
    },

    /// Active warehouses could not cover a requested quantity during allocation.
    #[error("Insufficient stock for product_id: {0}")]
    InsufficientStockForProduct(ProductId),

    /// Stock left the source cell of a transfer but never reached the destination.
    #[error(
        "Transfer incomplete: {quantity} units of product {product_id} removed from warehouse {from} but not added to warehouse {to}: {source}"
    )]
    TransferIncomplete {
        product_id: ProductId,
        from: WarehouseId,
        to: WarehouseId,
        quantity: i64,
        source: Box<InventoryError>,
    },

    /// A remote collaborator failed or returned a non-success response.
    #[error("Upstream call '{operation}' failed: {reason}")]
    Upstream {
        operation: &'static str,
        reason: String,
    },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl InventoryError {
    /// Maps a store `NotFound` onto the product it concerns, and an
    /// out-of-range increment onto a validation failure.
    pub(crate) fn for_product(product_id: ProductId) -> impl FnOnce(StoreError) -> Self {
        move |err| match err {
            StoreError::NotFound { .. } => InventoryError::ProductNotFound(product_id),
            StoreError::Overflow { .. } => InventoryError::Validation(err.to_string()),
            other => InventoryError::Store(other),
        }
    }

    /// Maps a store `NotFound` onto the warehouse it concerns.
    pub(crate) fn for_warehouse(warehouse_id: WarehouseId) -> impl FnOnce(StoreError) -> Self {
        move |err| {
            if err.is_not_found() {
                InventoryError::WarehouseNotFound(warehouse_id)
            } else {
                InventoryError::Store(err)
            }
        }
    }

    /// Maps store `NotFound`/`AlreadyExists` onto the stock cell they concern.
    /// An out-of-range increment becomes a validation failure.
    pub(crate) fn for_cell(
        product_id: ProductId,
        warehouse_id: WarehouseId,
    ) -> impl FnOnce(StoreError) -> Self {
        move |err| match err {
            StoreError::NotFound { entity: "stock cell", .. } => InventoryError::CellNotFound {
                product_id,
                warehouse_id,
            },
            StoreError::NotFound { .. } => InventoryError::WarehouseNotFound(warehouse_id),
            StoreError::AlreadyExists { .. } => InventoryError::CellAlreadyExists {
                product_id,
                warehouse_id,
            },
            StoreError::Overflow { .. } => InventoryError::Validation(err.to_string()),
            other => InventoryError::Store(other),
        }
    }
}

/// Convenience type alias for inventory results.
pub type Result<T> = std::result::Result<T, InventoryError>;
