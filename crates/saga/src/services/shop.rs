//! Shop forwarder: relays confirmed orders to warehouse fulfillment.

use std::sync::Arc;

use async_trait::async_trait;
use common::OrderId;
use domain::{LineItem, Order};
use inventory::Allocation;
use serde::{Deserialize, Serialize};

use crate::error::SagaError;
use crate::services::warehouse::WarehouseClient;

/// The payload the shop hands to warehouse fulfillment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopOrder {
    pub order_id: OrderId,
    pub items: Vec<LineItem>,
}

impl From<&Order> for ShopOrder {
    fn from(order: &Order) -> Self {
        Self {
            order_id: order.id,
            items: order.line_items(),
        }
    }
}

/// Trait for forwarding a paid order to fulfillment.
#[async_trait]
pub trait ShopClient: Send + Sync {
    async fn forward(&self, order: &Order) -> Result<Vec<Allocation>, SagaError>;
}

#[async_trait]
impl<T> ShopClient for Arc<T>
where
    T: ShopClient + ?Sized,
{
    async fn forward(&self, order: &Order) -> Result<Vec<Allocation>, SagaError> {
        (**self).forward(order).await
    }
}

/// Pass-through relay to the warehouse allocator.
///
/// Failures are returned as-is; nothing is retried or compensated here.
#[derive(Debug, Clone)]
pub struct ShopForwarder<W> {
    warehouse: W,
}

impl<W: WarehouseClient> ShopForwarder<W> {
    pub fn new(warehouse: W) -> Self {
        Self { warehouse }
    }

    #[tracing::instrument(skip(self, order), fields(order_id = %order.order_id))]
    pub async fn proceed_order(&self, order: &ShopOrder) -> Result<Vec<Allocation>, SagaError> {
        let allocations = self
            .warehouse
            .allocate_for_order(order.order_id, &order.items)
            .await?;
        tracing::info!(allocations = allocations.len(), "order forwarded to warehouse");
        Ok(allocations)
    }
}

#[async_trait]
impl<W: WarehouseClient> ShopClient for ShopForwarder<W> {
    async fn forward(&self, order: &Order) -> Result<Vec<Allocation>, SagaError> {
        self.proceed_order(&ShopOrder::from(order)).await
    }
}
