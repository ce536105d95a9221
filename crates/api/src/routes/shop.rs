//! Shop forwarding endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use inventory::Allocation;
use saga::ShopOrder;
use store::Store;

use crate::AppState;
use crate::error::ApiError;

/// POST /shop/proceed-order: relay a paid order to warehouse allocation.
#[tracing::instrument(skip(state, req))]
pub async fn proceed_order<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<ShopOrder>,
) -> Result<Json<Vec<Allocation>>, ApiError> {
    Ok(Json(state.shop.proceed_order(&req).await?))
}
