//! Warehouse allocator endpoints: warehouses, stock cells, allocation and restore.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::{ProductId, WarehouseId};
use domain::{NewWarehouse, StockCell, Warehouse};
use inventory::{Allocation, Transfer};
use saga::{ShopOrder, WarehouseClient};
use serde::{Deserialize, Serialize};
use store::Store;

use crate::AppState;
use crate::error::ApiError;

// -- Request types --

/// One (product, warehouse, quantity) triple, used to register, add and remove.
#[derive(Debug, Serialize, Deserialize)]
pub struct CellRequest {
    pub product_id: ProductId,
    pub warehouse_id: WarehouseId,
    pub quantity: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TransferRequest {
    pub product_id: ProductId,
    pub from_warehouse_id: WarehouseId,
    pub to_warehouse_id: WarehouseId,
    pub quantity: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WarehouseIdRequest {
    pub warehouse_id: WarehouseId,
}

// -- Response types --

#[derive(Debug, Serialize, Deserialize)]
pub struct TotalStockResponse {
    pub product_id: ProductId,
    pub total: i64,
}

// -- Handlers --

#[tracing::instrument(skip(state, req))]
pub async fn create<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<NewWarehouse>,
) -> Result<(StatusCode, Json<Warehouse>), ApiError> {
    let warehouse = state.allocator.create_warehouse(req).await?;
    Ok((StatusCode::CREATED, Json(warehouse)))
}

#[tracing::instrument(skip(state))]
pub async fn get<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<WarehouseId>,
) -> Result<Json<Warehouse>, ApiError> {
    Ok(Json(state.allocator.get_warehouse(id).await?))
}

#[tracing::instrument(skip(state))]
pub async fn activate<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<WarehouseId>,
) -> Result<Json<Warehouse>, ApiError> {
    Ok(Json(state.allocator.activate(id).await?))
}

#[tracing::instrument(skip(state))]
pub async fn deactivate<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<WarehouseId>,
) -> Result<Json<Warehouse>, ApiError> {
    Ok(Json(state.allocator.deactivate(id).await?))
}

/// POST /warehouse/stock/cells: create a cell with its initial quantity.
#[tracing::instrument(skip(state))]
pub async fn register_cell<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CellRequest>,
) -> Result<(StatusCode, Json<StockCell>), ApiError> {
    let cell = state
        .allocator
        .register_cell(StockCell::new(req.product_id, req.warehouse_id, req.quantity))
        .await?;
    Ok((StatusCode::CREATED, Json(cell)))
}

/// GET /warehouse/stock/{product_id}/total: sum over active warehouses.
#[tracing::instrument(skip(state))]
pub async fn total_stock<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(product_id): Path<ProductId>,
) -> Result<Json<TotalStockResponse>, ApiError> {
    let total = state.allocator.compute_total_stock(product_id).await?;
    Ok(Json(TotalStockResponse { product_id, total }))
}

#[tracing::instrument(skip(state))]
pub async fn add_stock<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CellRequest>,
) -> Result<Json<StockCell>, ApiError> {
    let cell = state
        .allocator
        .add_stock_cell(req.product_id, req.warehouse_id, req.quantity)
        .await?;
    Ok(Json(cell))
}

#[tracing::instrument(skip(state))]
pub async fn remove_stock<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CellRequest>,
) -> Result<Json<StockCell>, ApiError> {
    let cell = state
        .allocator
        .remove_stock_cell(req.product_id, req.warehouse_id, req.quantity)
        .await?;
    Ok(Json(cell))
}

#[tracing::instrument(skip(state))]
pub async fn transfer_product<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<TransferRequest>,
) -> Result<Json<Transfer>, ApiError> {
    let transfer = state
        .allocator
        .transfer_stock(
            req.product_id,
            req.from_warehouse_id,
            req.to_warehouse_id,
            req.quantity,
        )
        .await?;
    Ok(Json(transfer))
}

/// POST /warehouse/stock/active-deactive: re-applies the warehouse's current status.
#[tracing::instrument(skip(state))]
pub async fn active_deactive<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<WarehouseIdRequest>,
) -> Result<Json<Warehouse>, ApiError> {
    Ok(Json(state.allocator.toggle_status(req.warehouse_id).await?))
}

/// POST /warehouse/stock/proceed-order: draw a paid order from stock cells.
#[tracing::instrument(skip(state, req))]
pub async fn proceed_order<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<ShopOrder>,
) -> Result<Json<Vec<Allocation>>, ApiError> {
    let allocations =
        WarehouseClient::allocate_for_order(&state.allocator, req.order_id, &req.items).await?;
    Ok(Json(allocations))
}

/// POST /warehouse/stock/restore: return a cancelled order's items to stock.
#[tracing::instrument(skip(state, req))]
pub async fn restore_stock<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<ShopOrder>,
) -> Result<StatusCode, ApiError> {
    WarehouseClient::restore_stock(&state.allocator, req.order_id, &req.items).await?;
    Ok(StatusCode::NO_CONTENT)
}
