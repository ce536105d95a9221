//! Checkout, payment decision and cancellation endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use chrono::{DateTime, Utc};
use common::{OrderId, ProductId, UserId};
use domain::{LineItem, Order};
use serde::{Deserialize, Serialize};
use store::Store;

use crate::AppState;
use crate::error::ApiError;

/// Header carrying the acting user, set by the authentication layer in front.
pub const USER_ID_HEADER: &str = "x-user-id";

// -- Request types --

#[derive(Deserialize)]
pub struct CheckoutRequest {
    pub items: Vec<LineItem>,
}

#[derive(Deserialize)]
pub struct PaymentRequest {
    pub paid: bool,
}

// -- Response types --

#[derive(Debug, Serialize, Deserialize)]
pub struct OrderResponse {
    pub id: OrderId,
    pub user_id: UserId,
    pub status: String,
    pub items: Vec<OrderItemResponse>,
    pub total_price_cents: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OrderItemResponse {
    pub product_id: ProductId,
    pub quantity: i64,
    pub unit_price_cents: i64,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            id: order.id,
            user_id: order.user_id,
            status: order.status.to_string(),
            items: order
                .items
                .iter()
                .map(|item| OrderItemResponse {
                    product_id: item.product_id,
                    quantity: item.quantity,
                    unit_price_cents: item.unit_price.cents(),
                })
                .collect(),
            total_price_cents: order.total_price.cents(),
            created_at: order.created_at,
        }
    }
}

fn acting_user(headers: &HeaderMap) -> Result<UserId, ApiError> {
    let raw = headers
        .get(USER_ID_HEADER)
        .ok_or_else(|| ApiError::Unauthorized("missing X-User-Id header".to_string()))?;

    raw.to_str()
        .ok()
        .and_then(|v| v.trim().parse::<i64>().ok())
        .map(UserId::new)
        .ok_or_else(|| ApiError::Unauthorized("malformed X-User-Id header".to_string()))
}

// -- Handlers --

/// POST /order/checkout: reserve stock and create a pending order.
#[tracing::instrument(skip(state, headers, req))]
pub async fn checkout<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Json(req): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let user_id = acting_user(&headers)?;
    let order = state.saga.create_order(user_id, req.items).await?;
    Ok((StatusCode::CREATED, Json(order.into())))
}

/// POST /order/payment/{order_id}: apply a payment decision.
#[tracing::instrument(skip(state, req))]
pub async fn payment<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(order_id): Path<OrderId>,
    Json(req): Json<PaymentRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state.saga.process_payment(order_id, req.paid).await?;
    Ok(Json(order.into()))
}

/// POST /order/cancel/{order_id}: cancel a pending order and restore its stock.
#[tracing::instrument(skip(state))]
pub async fn cancel<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(order_id): Path<OrderId>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state.saga.cancel_order(order_id).await?;
    Ok(Json(order.into()))
}

/// GET /order/{order_id}: load an order.
#[tracing::instrument(skip(state))]
pub async fn get<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(order_id): Path<OrderId>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state.saga.get_order(order_id).await?;
    Ok(Json(order.into()))
}
