//! Product aggregate-stock record.

use common::{Money, ProductId};
use serde::{Deserialize, Serialize};

/// A product as held by the stock ledger.
///
/// `stock` is a cached sum of the product's active warehouse cells. It is
/// decremented on reservation and may lag the cells until the next sync pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Money,
    pub stock: i64,
}

/// A product that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub price: Money,
    #[serde(default)]
    pub stock: i64,
}

impl NewProduct {
    /// Creates a new product definition.
    pub fn new(name: impl Into<String>, price: Money, stock: i64) -> Self {
        Self {
            name: name.into(),
            price,
            stock,
        }
    }
}
