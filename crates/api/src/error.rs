//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use inventory::InventoryError;
use saga::SagaError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Bad request from the client.
    BadRequest(String),
    /// The acting user identity is missing or malformed.
    Unauthorized(String),
    /// Ledger or allocator error.
    Inventory(InventoryError),
    /// Order saga error.
    Saga(SagaError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Inventory(err) => (inventory_status(&err), err.to_string()),
            ApiError::Saga(err) => (saga_status(&err), err.to_string()),
        };

        if status.is_server_error() {
            tracing::error!(%status, error = %message, "request failed");
        }

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn inventory_status(err: &InventoryError) -> StatusCode {
    match err {
        InventoryError::Validation(_) | InventoryError::Domain(_) => StatusCode::BAD_REQUEST,
        InventoryError::ProductNotFound(_)
        | InventoryError::WarehouseNotFound(_)
        | InventoryError::CellNotFound { .. } => StatusCode::NOT_FOUND,
        InventoryError::CellAlreadyExists { .. }
        | InventoryError::InsufficientStock { .. }
        | InventoryError::InsufficientCellStock { .. }
        | InventoryError::InsufficientStockForProduct(_) => StatusCode::CONFLICT,
        InventoryError::Upstream { .. } => StatusCode::BAD_GATEWAY,
        InventoryError::TransferIncomplete { .. } | InventoryError::Store(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn saga_status(err: &SagaError) -> StatusCode {
    match err {
        SagaError::Validation(_) => StatusCode::BAD_REQUEST,
        SagaError::OrderNotFound(_) => StatusCode::NOT_FOUND,
        SagaError::InvalidState { .. } | SagaError::InsufficientStock { .. } => {
            StatusCode::CONFLICT
        }
        SagaError::Inventory(inner) => inventory_status(inner),
        SagaError::Upstream { .. } => StatusCode::BAD_GATEWAY,
        SagaError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<InventoryError> for ApiError {
    fn from(err: InventoryError) -> Self {
        ApiError::Inventory(err)
    }
}

impl From<SagaError> for ApiError {
    fn from(err: SagaError) -> Self {
        ApiError::Saga(err)
    }
}
