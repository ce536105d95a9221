//! Stock ledger endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::{Money, ProductId};
use domain::{NewProduct, Product};
use inventory::Ledger;
use serde::{Deserialize, Serialize};
use store::Store;

use crate::AppState;
use crate::error::ApiError;

// -- Request types --

#[derive(Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    pub price_cents: i64,
    #[serde(default)]
    pub stock: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct QuantityRequest {
    pub quantity: i64,
}

// -- Response types --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductResponse {
    pub id: ProductId,
    pub name: String,
    pub price_cents: i64,
    pub stock: i64,
}

impl From<Product> for ProductResponse {
    fn from(product: Product) -> Self {
        Self {
            id: product.id,
            name: product.name,
            price_cents: product.price.cents(),
            stock: product.stock,
        }
    }
}

impl From<ProductResponse> for Product {
    fn from(response: ProductResponse) -> Self {
        Self {
            id: response.id,
            name: response.name,
            price: Money::from_cents(response.price_cents),
            stock: response.stock,
        }
    }
}

// -- Handlers --

/// GET /products: list every product with its aggregate stock.
#[tracing::instrument(skip(state))]
pub async fn list<S: Store>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<ProductResponse>>, ApiError> {
    let products = state.ledger.list_products().await?;
    Ok(Json(products.into_iter().map(Into::into).collect()))
}

/// POST /products: register a product.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<ProductResponse>), ApiError> {
    let product = state
        .ledger
        .create_product(NewProduct::new(
            req.name,
            Money::from_cents(req.price_cents),
            req.stock,
        ))
        .await?;
    Ok((StatusCode::CREATED, Json(product.into())))
}

/// GET /products/{id}: read stock and unit price.
#[tracing::instrument(skip(state))]
pub async fn get<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<ProductId>,
) -> Result<Json<ProductResponse>, ApiError> {
    Ok(Json(state.ledger.get_stock(id).await?.into()))
}

/// POST /products/deduct/{id}: floor-checked decrement.
#[tracing::instrument(skip(state))]
pub async fn deduct<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<ProductId>,
    Json(req): Json<QuantityRequest>,
) -> Result<Json<ProductResponse>, ApiError> {
    Ok(Json(state.ledger.decrement(id, req.quantity).await?.into()))
}

/// POST /products/restore/{id}: increment.
#[tracing::instrument(skip(state))]
pub async fn restore<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<ProductId>,
    Json(req): Json<QuantityRequest>,
) -> Result<Json<ProductResponse>, ApiError> {
    Ok(Json(state.ledger.increment(id, req.quantity).await?.into()))
}

/// POST /products/adjust-total-stock/{id}: overwrite the aggregate.
#[tracing::instrument(skip(state))]
pub async fn adjust_total_stock<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<ProductId>,
    Json(req): Json<QuantityRequest>,
) -> Result<Json<ProductResponse>, ApiError> {
    Ok(Json(
        state.ledger.set_absolute(id, req.quantity).await?.into(),
    ))
}
