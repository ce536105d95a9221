//! Order saga orchestration.

use std::time::Instant;

use chrono::Utc;
use common::{Money, OrderId, UserId};
use domain::{DomainError, LineItem, NewOrder, Order, OrderItem, OrderStatus};
use inventory::{InventoryError, Ledger};
use store::{OrderRepository, Transition};

use crate::error::{Result, SagaError};
use crate::services::shop::ShopClient;
use crate::services::warehouse::WarehouseClient;

/// Why an order is being cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// The payment decision was negative.
    PaymentRejected,
    /// A caller cancelled the order directly.
    Requested,
    /// The order stayed pending past the staleness window.
    Expired,
}

impl CancelReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            CancelReason::PaymentRejected => "payment_rejected",
            CancelReason::Requested => "requested",
            CancelReason::Expired => "expired",
        }
    }
}

/// Drives an order through reserve → persist → payment decision →
/// forward or compensate.
///
/// There is no transaction across the steps. Every step is atomic on its own
/// record; nothing is rolled back across steps, and the reconcilers restore
/// consistency over time.
#[derive(Debug, Clone)]
pub struct OrderSaga<O, L, Sh, W> {
    orders: O,
    ledger: L,
    shop: Sh,
    warehouse: W,
}

impl<O, L, Sh, W> OrderSaga<O, L, Sh, W>
where
    O: OrderRepository,
    L: Ledger,
    Sh: ShopClient,
    W: WarehouseClient,
{
    /// Creates a new order saga.
    pub fn new(orders: O, ledger: L, shop: Sh, warehouse: W) -> Self {
        Self {
            orders,
            ledger,
            shop,
            warehouse,
        }
    }

    /// Reserves stock for each item and persists a pending order.
    ///
    /// Items are checked and deducted one at a time in request order. If a
    /// later item fails, deductions already made for earlier items stand.
    #[tracing::instrument(skip(self, items), fields(items = items.len()))]
    pub async fn create_order(&self, user_id: UserId, items: Vec<LineItem>) -> Result<Order> {
        LineItem::validate_all(&items)?;

        let reserve_start = Instant::now();
        let mut order_items = Vec::with_capacity(items.len());
        let mut total = Money::zero();
        for item in &items {
            let product = self.ledger.get_stock(item.product_id).await?;
            if item.quantity > product.stock {
                return Err(SagaError::InsufficientStock {
                    product_id: item.product_id,
                    requested: item.quantity,
                    available: product.stock,
                });
            }

            let order_item = OrderItem::new(item.product_id, item.quantity, product.price);
            total = total
                .checked_add(order_item.total_price()?)
                .ok_or(DomainError::AmountOverflow {
                    product_id: item.product_id,
                })?;

            self.ledger
                .decrement(item.product_id, item.quantity)
                .await
                .map_err(|err| match err {
                    InventoryError::InsufficientStock {
                        product_id,
                        requested,
                        available,
                    } => SagaError::InsufficientStock {
                        product_id,
                        requested,
                        available,
                    },
                    other => SagaError::Inventory(other),
                })?;

            order_items.push(order_item);
        }
        metrics::histogram!("saga_step_duration_seconds", "step" => "reserve")
            .record(reserve_start.elapsed().as_secs_f64());

        let persist_start = Instant::now();
        let order = self
            .orders
            .insert_order(NewOrder::new(user_id, order_items, Utc::now())?)
            .await?;
        metrics::histogram!("saga_step_duration_seconds", "step" => "persist")
            .record(persist_start.elapsed().as_secs_f64());

        metrics::counter!("orders_created_total").increment(1);
        tracing::info!(order_id = %order.id, total = %order.total_price, "order created");
        Ok(order)
    }

    /// Applies a payment decision to a pending order.
    ///
    /// A paid order is forwarded to fulfillment and then marked `success`. If
    /// forwarding fails the order stays pending and the forwarding error is
    /// returned. An unpaid order is cancelled through [`compensate`](Self::compensate).
    #[tracing::instrument(skip(self))]
    pub async fn process_payment(&self, order_id: OrderId, paid: bool) -> Result<Order> {
        let order = self.get_order(order_id).await?;
        let decided = if paid {
            OrderStatus::Success
        } else {
            OrderStatus::Cancelled
        };
        if !order.status.can_transition_to(decided) {
            return Err(SagaError::InvalidState {
                order_id,
                expected: OrderStatus::Pending,
                actual: order.status,
            });
        }

        if !paid {
            metrics::counter!("order_payments_total", "outcome" => "rejected").increment(1);
            return self.compensate(order_id, CancelReason::PaymentRejected).await;
        }

        let forward_start = Instant::now();
        let forwarded = self.shop.forward(&order).await;
        metrics::histogram!("saga_step_duration_seconds", "step" => "forward")
            .record(forward_start.elapsed().as_secs_f64());

        if let Err(err) = forwarded {
            metrics::counter!("order_payments_total", "outcome" => "forward_failed").increment(1);
            tracing::warn!(%order_id, error = %err, "forwarding failed, order left pending");
            return Err(err);
        }

        match self
            .orders
            .transition_status(order_id, OrderStatus::Pending, OrderStatus::Success)
            .await
            .map_err(SagaError::for_order(order_id))?
        {
            Transition::Applied(order) => {
                metrics::counter!("order_payments_total", "outcome" => "paid").increment(1);
                tracing::info!(%order_id, "order paid and forwarded");
                Ok(order)
            }
            Transition::Rejected { actual } => {
                tracing::error!(
                    %order_id,
                    status = %actual,
                    "order left pending while being forwarded"
                );
                Err(SagaError::InvalidState {
                    order_id,
                    expected: OrderStatus::Pending,
                    actual,
                })
            }
        }
    }

    /// Cancels a pending order on request.
    pub async fn cancel_order(&self, order_id: OrderId) -> Result<Order> {
        self.compensate(order_id, CancelReason::Requested).await
    }

    /// Cancels an order that stayed pending too long.
    pub async fn cancel_expired(&self, order_id: OrderId) -> Result<Order> {
        self.compensate(order_id, CancelReason::Expired).await
    }

    /// The single cancellation routine behind every entry point.
    ///
    /// Moves the order `pending → cancelled` with a compare-and-set, then
    /// returns its line items to stock through the warehouse allocator. Only
    /// the caller that wins the transition restores stock.
    #[tracing::instrument(skip(self), fields(reason = reason.as_str()))]
    pub async fn compensate(&self, order_id: OrderId, reason: CancelReason) -> Result<Order> {
        let start = Instant::now();

        let order = match self
            .orders
            .transition_status(order_id, OrderStatus::Pending, OrderStatus::Cancelled)
            .await
            .map_err(SagaError::for_order(order_id))?
        {
            Transition::Applied(order) => order,
            Transition::Rejected { actual } => {
                return Err(SagaError::InvalidState {
                    order_id,
                    expected: OrderStatus::Pending,
                    actual,
                });
            }
        };

        if let Err(err) = self
            .warehouse
            .restore_stock(order_id, &order.line_items())
            .await
        {
            tracing::error!(%order_id, error = %err, "order cancelled but stock restoration failed");
            return Err(err.into());
        }

        metrics::histogram!("saga_step_duration_seconds", "step" => "compensate")
            .record(start.elapsed().as_secs_f64());
        metrics::counter!("orders_cancelled_total", "source" => reason.as_str()).increment(1);
        tracing::warn!(%order_id, "order cancelled and stock restored");
        Ok(order)
    }

    /// Loads an order.
    pub async fn get_order(&self, order_id: OrderId) -> Result<Order> {
        self.orders
            .get_order(order_id)
            .await?
            .ok_or(SagaError::OrderNotFound(order_id))
    }
}
