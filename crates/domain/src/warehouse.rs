//! Warehouse and stock-cell records.

use std::str::FromStr;

use common::{ProductId, WarehouseId};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Whether a warehouse participates in allocation and stock totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum WarehouseStatus {
    #[default]
    Active,
    Inactive,
}

impl WarehouseStatus {
    /// Returns true for `Active`.
    pub fn is_active(&self) -> bool {
        matches!(self, WarehouseStatus::Active)
    }

    /// Returns the wire/storage name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            WarehouseStatus::Active => "active",
            WarehouseStatus::Inactive => "inactive",
        }
    }
}

impl std::fmt::Display for WarehouseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for WarehouseStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(WarehouseStatus::Active),
            "inactive" => Ok(WarehouseStatus::Inactive),
            other => Err(DomainError::UnknownStatus {
                kind: "warehouse",
                value: other.to_string(),
            }),
        }
    }
}

/// A physical warehouse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warehouse {
    pub id: WarehouseId,
    pub name: String,
    pub status: WarehouseStatus,
}

/// A warehouse that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewWarehouse {
    pub name: String,
    #[serde(default)]
    pub status: WarehouseStatus,
}

impl NewWarehouse {
    /// Creates a new warehouse definition.
    pub fn new(name: impl Into<String>, status: WarehouseStatus) -> Self {
        Self {
            name: name.into(),
            status,
        }
    }
}

/// Quantity of one product held at one warehouse.
///
/// Keyed by `(product_id, warehouse_id)`. This is the source of truth for
/// physical inventory; `quantity` never goes negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockCell {
    pub product_id: ProductId,
    pub warehouse_id: WarehouseId,
    pub quantity: i64,
}

impl StockCell {
    /// Creates a stock cell.
    pub fn new(
        product_id: impl Into<ProductId>,
        warehouse_id: impl Into<WarehouseId>,
        quantity: i64,
    ) -> Self {
        Self {
            product_id: product_id.into(),
            warehouse_id: warehouse_id.into(),
            quantity,
        }
    }
}
