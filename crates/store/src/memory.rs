use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{OrderId, ProductId, WarehouseId};
use domain::{
    NewOrder, NewProduct, NewWarehouse, Order, OrderStatus, Product, StockCell, Warehouse,
    WarehouseStatus,
};
use tokio::sync::RwLock;

use crate::{
    Result, StoreError,
    store::{
        Deduction, OrderRepository, ProductRepository, StockRepository, Transition,
        WarehouseRepository,
    },
};

/// Rows keyed by identifier plus the next identifier to hand out.
struct Table<K, V> {
    rows: BTreeMap<K, V>,
    last_id: i64,
}

impl<K: Ord, V> Default for Table<K, V> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            last_id: 0,
        }
    }
}

impl<K: Ord + From<i64> + Copy, V> Table<K, V> {
    fn insert_with(&mut self, build: impl FnOnce(K) -> V) -> &V {
        self.last_id += 1;
        let id = K::from(self.last_id);
        self.rows.entry(id).or_insert(build(id))
    }
}

/// In-memory store implementation for testing and single-process deployments.
///
/// Every table sits behind its own lock; each mutating operation takes exactly
/// one write lock, which makes each read-check-write atomic per record.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    orders: Arc<RwLock<Table<OrderId, Order>>>,
    products: Arc<RwLock<Table<ProductId, Product>>>,
    warehouses: Arc<RwLock<Table<WarehouseId, Warehouse>>>,
    cells: Arc<RwLock<HashMap<(ProductId, WarehouseId), i64>>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of orders stored.
    pub async fn order_count(&self) -> usize {
        self.orders.read().await.rows.len()
    }
}

fn cell_key(product_id: ProductId, warehouse_id: WarehouseId) -> String {
    format!("product {product_id} / warehouse {warehouse_id}")
}

#[async_trait]
impl OrderRepository for InMemoryStore {
    async fn insert_order(&self, order: NewOrder) -> Result<Order> {
        let mut orders = self.orders.write().await;
        Ok(orders.insert_with(|id| Order::from_new(id, order)).clone())
    }

    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>> {
        Ok(self.orders.read().await.rows.get(&order_id).cloned())
    }

    async fn transition_status(
        &self,
        order_id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<Transition> {
        let mut orders = self.orders.write().await;
        let order = orders
            .rows
            .get_mut(&order_id)
            .ok_or_else(|| StoreError::not_found("order", order_id))?;

        if order.status != from {
            return Ok(Transition::Rejected {
                actual: order.status,
            });
        }
        order.status = to;
        Ok(Transition::Applied(order.clone()))
    }

    async fn find_stale_orders(
        &self,
        status: OrderStatus,
        created_before: DateTime<Utc>,
    ) -> Result<Vec<Order>> {
        let orders = self.orders.read().await;
        let mut stale: Vec<Order> = orders
            .rows
            .values()
            .filter(|o| o.status == status && o.created_at < created_before)
            .cloned()
            .collect();
        stale.sort_by_key(|o| (o.created_at, o.id));
        Ok(stale)
    }
}

#[async_trait]
impl ProductRepository for InMemoryStore {
    async fn insert_product(&self, product: NewProduct) -> Result<Product> {
        let mut products = self.products.write().await;
        Ok(products
            .insert_with(|id| Product {
                id,
                name: product.name,
                price: product.price,
                stock: product.stock,
            })
            .clone())
    }

    async fn get_product(&self, product_id: ProductId) -> Result<Option<Product>> {
        Ok(self.products.read().await.rows.get(&product_id).cloned())
    }

    async fn list_products(&self) -> Result<Vec<Product>> {
        Ok(self.products.read().await.rows.values().cloned().collect())
    }

    async fn decrement_stock(
        &self,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<Deduction<Product>> {
        let mut products = self.products.write().await;
        let product = products
            .rows
            .get_mut(&product_id)
            .ok_or_else(|| StoreError::not_found("product", product_id))?;

        if product.stock < quantity {
            return Ok(Deduction::Insufficient {
                available: product.stock,
            });
        }
        product.stock -= quantity;
        Ok(Deduction::Applied(product.clone()))
    }

    async fn increment_stock(&self, product_id: ProductId, quantity: i64) -> Result<Product> {
        let mut products = self.products.write().await;
        let product = products
            .rows
            .get_mut(&product_id)
            .ok_or_else(|| StoreError::not_found("product", product_id))?;
        product.stock = product
            .stock
            .checked_add(quantity)
            .ok_or_else(|| StoreError::overflow("product", product_id))?;
        Ok(product.clone())
    }

    async fn set_stock(&self, product_id: ProductId, stock: i64) -> Result<Product> {
        let mut products = self.products.write().await;
        let product = products
            .rows
            .get_mut(&product_id)
            .ok_or_else(|| StoreError::not_found("product", product_id))?;
        product.stock = stock;
        Ok(product.clone())
    }
}

#[async_trait]
impl WarehouseRepository for InMemoryStore {
    async fn insert_warehouse(&self, warehouse: NewWarehouse) -> Result<Warehouse> {
        let mut warehouses = self.warehouses.write().await;
        Ok(warehouses
            .insert_with(|id| Warehouse {
                id,
                name: warehouse.name,
                status: warehouse.status,
            })
            .clone())
    }

    async fn get_warehouse(&self, warehouse_id: WarehouseId) -> Result<Option<Warehouse>> {
        Ok(self.warehouses.read().await.rows.get(&warehouse_id).cloned())
    }

    async fn set_warehouse_status(
        &self,
        warehouse_id: WarehouseId,
        status: WarehouseStatus,
    ) -> Result<Warehouse> {
        let mut warehouses = self.warehouses.write().await;
        let warehouse = warehouses
            .rows
            .get_mut(&warehouse_id)
            .ok_or_else(|| StoreError::not_found("warehouse", warehouse_id))?;
        warehouse.status = status;
        Ok(warehouse.clone())
    }

    async fn active_warehouses(&self) -> Result<Vec<Warehouse>> {
        Ok(self
            .warehouses
            .read()
            .await
            .rows
            .values()
            .filter(|w| w.status.is_active())
            .cloned()
            .collect())
    }
}

#[async_trait]
impl StockRepository for InMemoryStore {
    async fn insert_cell(&self, cell: StockCell) -> Result<StockCell> {
        let mut cells = self.cells.write().await;
        let key = (cell.product_id, cell.warehouse_id);
        if cells.contains_key(&key) {
            return Err(StoreError::already_exists(
                "stock cell",
                cell_key(cell.product_id, cell.warehouse_id),
            ));
        }
        cells.insert(key, cell.quantity);
        Ok(cell)
    }

    async fn get_cell(
        &self,
        product_id: ProductId,
        warehouse_id: WarehouseId,
    ) -> Result<Option<StockCell>> {
        Ok(self
            .cells
            .read()
            .await
            .get(&(product_id, warehouse_id))
            .map(|&quantity| StockCell::new(product_id, warehouse_id, quantity)))
    }

    async fn add_to_cell(
        &self,
        product_id: ProductId,
        warehouse_id: WarehouseId,
        quantity: i64,
    ) -> Result<StockCell> {
        let mut cells = self.cells.write().await;
        let held = cells.get_mut(&(product_id, warehouse_id)).ok_or_else(|| {
            StoreError::not_found("stock cell", cell_key(product_id, warehouse_id))
        })?;
        *held = held.checked_add(quantity).ok_or_else(|| {
            StoreError::overflow("stock cell", cell_key(product_id, warehouse_id))
        })?;
        Ok(StockCell::new(product_id, warehouse_id, *held))
    }

    async fn remove_from_cell(
        &self,
        product_id: ProductId,
        warehouse_id: WarehouseId,
        quantity: i64,
    ) -> Result<Deduction<StockCell>> {
        let mut cells = self.cells.write().await;
        let held = cells.get_mut(&(product_id, warehouse_id)).ok_or_else(|| {
            StoreError::not_found("stock cell", cell_key(product_id, warehouse_id))
        })?;

        if *held < quantity {
            return Ok(Deduction::Insufficient { available: *held });
        }
        *held -= quantity;
        Ok(Deduction::Applied(StockCell::new(
            product_id,
            warehouse_id,
            *held,
        )))
    }

    async fn take_from_cell(
        &self,
        product_id: ProductId,
        warehouse_id: WarehouseId,
        max: i64,
    ) -> Result<Option<i64>> {
        let mut cells = self.cells.write().await;
        Ok(cells.get_mut(&(product_id, warehouse_id)).map(|held| {
            let taken = (*held).min(max).max(0);
            *held -= taken;
            taken
        }))
    }
}
