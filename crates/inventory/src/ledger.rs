//! Per-product aggregate stock counter.

use std::sync::Arc;

use async_trait::async_trait;
use common::ProductId;
use domain::{NewProduct, Product};
use store::{Deduction, ProductRepository};

use crate::error::{InventoryError, Result};

/// Read and mutate a product's aggregate stock.
///
/// `decrement` re-checks the floor at write time, so a stale `get_stock`
/// read by the caller can never lead to a negative aggregate.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Returns the product with its current aggregate stock and unit price.
    async fn get_stock(&self, product_id: ProductId) -> Result<Product>;

    /// Lists every product.
    async fn list_products(&self) -> Result<Vec<Product>>;

    /// Subtracts `quantity`, failing with `InsufficientStock` if less is held.
    async fn decrement(&self, product_id: ProductId, quantity: i64) -> Result<Product>;

    /// Adds `quantity`.
    async fn increment(&self, product_id: ProductId, quantity: i64) -> Result<Product>;

    /// Overwrites the aggregate unconditionally.
    async fn set_absolute(&self, product_id: ProductId, quantity: i64) -> Result<Product>;
}

#[async_trait]
impl<T> Ledger for Arc<T>
where
    T: Ledger + ?Sized,
{
    async fn get_stock(&self, product_id: ProductId) -> Result<Product> {
        (**self).get_stock(product_id).await
    }

    async fn list_products(&self) -> Result<Vec<Product>> {
        (**self).list_products().await
    }

    async fn decrement(&self, product_id: ProductId, quantity: i64) -> Result<Product> {
        (**self).decrement(product_id, quantity).await
    }

    async fn increment(&self, product_id: ProductId, quantity: i64) -> Result<Product> {
        (**self).increment(product_id, quantity).await
    }

    async fn set_absolute(&self, product_id: ProductId, quantity: i64) -> Result<Product> {
        (**self).set_absolute(product_id, quantity).await
    }
}

/// Store-backed [`Ledger`].
#[derive(Debug, Clone)]
pub struct StockLedger<R> {
    repo: R,
}

impl<R: ProductRepository> StockLedger<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Registers a product with its price and initial aggregate stock.
    #[tracing::instrument(skip(self, product), fields(name = %product.name))]
    pub async fn create_product(&self, product: NewProduct) -> Result<Product> {
        if product.name.trim().is_empty() {
            return Err(InventoryError::Validation(
                "product name must not be empty".to_string(),
            ));
        }
        if product.price.is_negative() {
            return Err(InventoryError::Validation(format!(
                "price must not be negative, got {}",
                product.price
            )));
        }
        if product.stock < 0 {
            return Err(InventoryError::Validation(format!(
                "stock must not be negative, got {}",
                product.stock
            )));
        }

        let product = self.repo.insert_product(product).await?;
        tracing::info!(product_id = %product.id, stock = product.stock, "product created");
        Ok(product)
    }
}

fn require_positive(quantity: i64) -> Result<()> {
    if quantity <= 0 {
        return Err(InventoryError::Validation(format!(
            "quantity must be positive, got {quantity}"
        )));
    }
    Ok(())
}

#[async_trait]
impl<R: ProductRepository> Ledger for StockLedger<R> {
    async fn get_stock(&self, product_id: ProductId) -> Result<Product> {
        self.repo
            .get_product(product_id)
            .await?
            .ok_or(InventoryError::ProductNotFound(product_id))
    }

    async fn list_products(&self) -> Result<Vec<Product>> {
        Ok(self.repo.list_products().await?)
    }

    #[tracing::instrument(skip(self))]
    async fn decrement(&self, product_id: ProductId, quantity: i64) -> Result<Product> {
        require_positive(quantity)?;

        match self
            .repo
            .decrement_stock(product_id, quantity)
            .await
            .map_err(InventoryError::for_product(product_id))?
        {
            Deduction::Applied(product) => {
                tracing::debug!(stock = product.stock, "aggregate decremented");
                Ok(product)
            }
            Deduction::Insufficient { available } => Err(InventoryError::InsufficientStock {
                product_id,
                requested: quantity,
                available,
            }),
        }
    }

    #[tracing::instrument(skip(self))]
    async fn increment(&self, product_id: ProductId, quantity: i64) -> Result<Product> {
        require_positive(quantity)?;

        let product = self
            .repo
            .increment_stock(product_id, quantity)
            .await
            .map_err(InventoryError::for_product(product_id))?;
        tracing::debug!(stock = product.stock, "aggregate incremented");
        Ok(product)
    }

    #[tracing::instrument(skip(self))]
    async fn set_absolute(&self, product_id: ProductId, quantity: i64) -> Result<Product> {
        if quantity < 0 {
            return Err(InventoryError::Validation(format!(
                "stock must not be negative, got {quantity}"
            )));
        }

        self.repo
            .set_stock(product_id, quantity)
            .await
            .map_err(InventoryError::for_product(product_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::Money;
    use store::InMemoryStore;

    async fn ledger_with(stock: i64) -> (StockLedger<InMemoryStore>, ProductId) {
        let ledger = StockLedger::new(InMemoryStore::new());
        let product = ledger
            .create_product(NewProduct::new("Widget", Money::from_cents(100), stock))
            .await
            .unwrap();
        (ledger, product.id)
    }

    #[tokio::test]
    async fn test_get_stock_returns_price_and_stock() {
        let (ledger, id) = ledger_with(8).await;
        let product = ledger.get_stock(id).await.unwrap();
        assert_eq!(product.stock, 8);
        assert_eq!(product.price, Money::from_cents(100));
    }

    #[tokio::test]
    async fn test_decrement_over_stock_fails_and_leaves_stock() {
        let (ledger, id) = ledger_with(5).await;

        let err = ledger.decrement(id, 6).await.unwrap_err();
        assert!(matches!(
            err,
            InventoryError::InsufficientStock {
                requested: 6,
                available: 5,
                ..
            }
        ));
        assert_eq!(ledger.get_stock(id).await.unwrap().stock, 5);
    }

    #[tokio::test]
    async fn test_increment_and_set_absolute() {
        let (ledger, id) = ledger_with(5).await;

        assert_eq!(ledger.increment(id, 3).await.unwrap().stock, 8);
        assert_eq!(ledger.set_absolute(id, 2).await.unwrap().stock, 2);
    }

    #[tokio::test]
    async fn test_increment_past_max_is_rejected_and_leaves_stock() {
        let (ledger, id) = ledger_with(5).await;

        assert!(matches!(
            ledger.increment(id, i64::MAX).await,
            Err(InventoryError::Validation(_))
        ));
        assert_eq!(ledger.get_stock(id).await.unwrap().stock, 5);
    }

    #[tokio::test]
    async fn test_unknown_product_is_not_found() {
        let (ledger, _) = ledger_with(5).await;
        let missing = ProductId::new(42);

        assert!(matches!(
            ledger.get_stock(missing).await,
            Err(InventoryError::ProductNotFound(id)) if id == missing
        ));
        assert!(matches!(
            ledger.decrement(missing, 1).await,
            Err(InventoryError::ProductNotFound(_))
        ));
        assert!(matches!(
            ledger.set_absolute(missing, 1).await,
            Err(InventoryError::ProductNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_rejects_non_positive_quantities() {
        let (ledger, id) = ledger_with(5).await;

        assert!(matches!(
            ledger.decrement(id, 0).await,
            Err(InventoryError::Validation(_))
        ));
        assert!(matches!(
            ledger.increment(id, -1).await,
            Err(InventoryError::Validation(_))
        ));
        assert!(matches!(
            ledger.set_absolute(id, -1).await,
            Err(InventoryError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_create_product_validates_input() {
        let ledger = StockLedger::new(InMemoryStore::new());
        let result = ledger
            .create_product(NewProduct::new(" ", Money::from_cents(100), 1))
            .await;
        assert!(matches!(result, Err(InventoryError::Validation(_))));
    }
}
