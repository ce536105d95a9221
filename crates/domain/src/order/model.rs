//! Order records.

use chrono::{DateTime, Utc};
use common::{Money, OrderId, ProductId, UserId};
use serde::{Deserialize, Serialize};

use super::OrderStatus;
use crate::error::DomainError;

/// A requested (product, quantity) pair.
///
/// This is the shape passed from the order service to the shop and on to the
/// warehouse allocator; it carries no price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: ProductId,
    pub quantity: i64,
}

impl LineItem {
    /// Creates a new line item.
    pub fn new(product_id: impl Into<ProductId>, quantity: i64) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
        }
    }

    /// Rejects non-positive quantities.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.quantity <= 0 {
            return Err(DomainError::InvalidQuantity {
                product_id: self.product_id,
                quantity: self.quantity,
            });
        }
        Ok(())
    }

    /// Validates a whole request: at least one item, every quantity positive.
    pub fn validate_all(items: &[LineItem]) -> Result<(), DomainError> {
        if items.is_empty() {
            return Err(DomainError::NoItems);
        }
        items.iter().try_for_each(LineItem::validate)
    }
}

/// A line of an order, with the unit price locked at creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    pub quantity: i64,
    pub unit_price: Money,
}

impl OrderItem {
    /// Creates a new order item.
    pub fn new(product_id: impl Into<ProductId>, quantity: i64, unit_price: Money) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
            unit_price,
        }
    }

    /// Returns the total price for this item (quantity * unit_price).
    pub fn total_price(&self) -> Result<Money, DomainError> {
        self.unit_price
            .checked_multiply(self.quantity)
            .ok_or(DomainError::AmountOverflow {
                product_id: self.product_id,
            })
    }

    /// Returns the unpriced (product, quantity) pair.
    pub fn line_item(&self) -> LineItem {
        LineItem::new(self.product_id, self.quantity)
    }
}

/// An order that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub user_id: UserId,
    pub items: Vec<OrderItem>,
    pub total_price: Money,
    pub created_at: DateTime<Utc>,
}

impl NewOrder {
    /// Builds a pending order, computing the total from the locked unit prices.
    ///
    /// Fails with [`DomainError::AmountOverflow`] when a line or the running
    /// total does not fit in cents.
    pub fn new(
        user_id: UserId,
        items: Vec<OrderItem>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let total_price = items.iter().try_fold(Money::zero(), |total, item| {
            total
                .checked_add(item.total_price()?)
                .ok_or(DomainError::AmountOverflow {
                    product_id: item.product_id,
                })
        })?;
        Ok(Self {
            user_id,
            items,
            total_price,
            created_at,
        })
    }
}

/// A persisted order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub items: Vec<OrderItem>,
    pub total_price: Money,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Materializes a freshly inserted order with its assigned identifier.
    pub fn from_new(id: OrderId, new: NewOrder) -> Self {
        Self {
            id,
            user_id: new.user_id,
            items: new.items,
            total_price: new.total_price,
            status: OrderStatus::Pending,
            created_at: new.created_at,
        }
    }

    /// Returns the unpriced line items of this order.
    pub fn line_items(&self) -> Vec<LineItem> {
        self.items.iter().map(OrderItem::line_item).collect()
    }
}
