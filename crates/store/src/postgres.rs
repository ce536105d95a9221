use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{Money, OrderId, ProductId, UserId, WarehouseId};
use domain::{
    NewOrder, NewProduct, NewWarehouse, Order, OrderItem, OrderStatus, Product, StockCell,
    Warehouse, WarehouseStatus,
};
use sqlx::{
    PgPool, Postgres, Row, Transaction,
    postgres::{PgPoolOptions, PgRow},
};

use crate::{
    Result, StoreError,
    store::{
        Deduction, OrderRepository, ProductRepository, StockRepository, Transition,
        WarehouseRepository,
    },
};

/// SQLSTATE raised when an arithmetic result leaves the column's range.
const NUMERIC_VALUE_OUT_OF_RANGE: &str = "22003";

fn out_of_range(e: sqlx::Error, entity: &'static str, id: impl ToString) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = e {
        if db_err.code().as_deref() == Some(NUMERIC_VALUE_OUT_OF_RANGE) {
            return StoreError::overflow(entity, id);
        }
    }
    StoreError::Database(e)
}

/// PostgreSQL-backed record store.
///
/// Every guarded mutation is a single conditional `UPDATE`, so concurrent
/// callers against the same row serialize inside the database.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects a pool to `database_url`.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_product(row: PgRow) -> Result<Product> {
        Ok(Product {
            id: ProductId::new(row.try_get("id")?),
            name: row.try_get("name")?,
            price: Money::from_cents(row.try_get("price_cents")?),
            stock: row.try_get("stock")?,
        })
    }

    fn row_to_warehouse(row: PgRow) -> Result<Warehouse> {
        let status: String = row.try_get("status")?;
        Ok(Warehouse {
            id: WarehouseId::new(row.try_get("id")?),
            name: row.try_get("name")?,
            status: status.parse()?,
        })
    }

    fn row_to_cell(row: PgRow) -> Result<StockCell> {
        Ok(StockCell {
            product_id: ProductId::new(row.try_get("product_id")?),
            warehouse_id: WarehouseId::new(row.try_get("warehouse_id")?),
            quantity: row.try_get("quantity")?,
        })
    }

    fn row_to_item(row: PgRow) -> Result<OrderItem> {
        Ok(OrderItem {
            product_id: ProductId::new(row.try_get("product_id")?),
            quantity: row.try_get("quantity")?,
            unit_price: Money::from_cents(row.try_get("price_cents")?),
        })
    }

    /// Builds an order from its header row, loading its items.
    async fn load_order<'e, E>(executor: E, row: PgRow) -> Result<Order>
    where
        E: sqlx::PgExecutor<'e>,
    {
        let id: i64 = row.try_get("id")?;
        let status: String = row.try_get("status")?;

        let items = sqlx::query(
            r#"
            SELECT product_id, quantity, price_cents
            FROM order_items
            WHERE order_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(id)
        .fetch_all(executor)
        .await?
        .into_iter()
        .map(Self::row_to_item)
        .collect::<Result<Vec<_>>>()?;

        Ok(Order {
            id: OrderId::new(id),
            user_id: UserId::new(row.try_get("user_id")?),
            items,
            total_price: Money::from_cents(row.try_get("total_price_cents")?),
            status: status.parse()?,
            created_at: row.try_get("created_at")?,
        })
    }

    async fn insert_items(
        tx: &mut Transaction<'_, Postgres>,
        order_id: i64,
        items: &[OrderItem],
    ) -> Result<()> {
        for item in items {
            sqlx::query(
                r#"
                INSERT INTO order_items (order_id, product_id, quantity, price_cents)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(order_id)
            .bind(item.product_id.get())
            .bind(item.quantity)
            .bind(item.unit_price.cents())
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl OrderRepository for PostgresStore {
    async fn insert_order(&self, order: NewOrder) -> Result<Order> {
        let mut tx = self.pool.begin().await?;

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO orders (user_id, total_price_cents, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $4)
            RETURNING id
            "#,
        )
        .bind(order.user_id.get())
        .bind(order.total_price.cents())
        .bind(OrderStatus::Pending.as_str())
        .bind(order.created_at)
        .fetch_one(&mut *tx)
        .await?;

        Self::insert_items(&mut tx, id, &order.items).await?;
        tx.commit().await?;

        tracing::debug!(order_id = id, items = order.items.len(), "Inserted order");
        Ok(Order::from_new(OrderId::new(id), order))
    }

    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, total_price_cents, status, created_at
            FROM orders
            WHERE id = $1
            "#,
        )
        .bind(order_id.get())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(Self::load_order(&self.pool, row).await?)),
            None => Ok(None),
        }
    }

    async fn transition_status(
        &self,
        order_id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<Transition> {
        let updated = sqlx::query(
            r#"
            UPDATE orders
            SET status = $3, updated_at = NOW()
            WHERE id = $1 AND status = $2
            RETURNING id, user_id, total_price_cents, status, created_at
            "#,
        )
        .bind(order_id.get())
        .bind(from.as_str())
        .bind(to.as_str())
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = updated {
            return Ok(Transition::Applied(
                Self::load_order(&self.pool, row).await?,
            ));
        }

        let actual: Option<String> = sqlx::query_scalar("SELECT status FROM orders WHERE id = $1")
            .bind(order_id.get())
            .fetch_optional(&self.pool)
            .await?;

        match actual {
            Some(status) => Ok(Transition::Rejected {
                actual: status.parse()?,
            }),
            None => Err(StoreError::not_found("order", order_id)),
        }
    }

    async fn find_stale_orders(
        &self,
        status: OrderStatus,
        created_before: DateTime<Utc>,
    ) -> Result<Vec<Order>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, total_price_cents, status, created_at
            FROM orders
            WHERE status = $1 AND created_at < $2
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(status.as_str())
        .bind(created_before)
        .fetch_all(&self.pool)
        .await?;

        let mut orders = Vec::with_capacity(rows.len());
        for row in rows {
            orders.push(Self::load_order(&self.pool, row).await?);
        }
        Ok(orders)
    }
}

#[async_trait]
impl ProductRepository for PostgresStore {
    async fn insert_product(&self, product: NewProduct) -> Result<Product> {
        let row = sqlx::query(
            r#"
            INSERT INTO products (name, price_cents, stock)
            VALUES ($1, $2, $3)
            RETURNING id, name, price_cents, stock
            "#,
        )
        .bind(&product.name)
        .bind(product.price.cents())
        .bind(product.stock)
        .fetch_one(&self.pool)
        .await?;

        Self::row_to_product(row)
    }

    async fn get_product(&self, product_id: ProductId) -> Result<Option<Product>> {
        sqlx::query("SELECT id, name, price_cents, stock FROM products WHERE id = $1")
            .bind(product_id.get())
            .fetch_optional(&self.pool)
            .await?
            .map(Self::row_to_product)
            .transpose()
    }

    async fn list_products(&self) -> Result<Vec<Product>> {
        sqlx::query("SELECT id, name, price_cents, stock FROM products ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Self::row_to_product)
            .collect()
    }

    async fn decrement_stock(
        &self,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<Deduction<Product>> {
        let updated = sqlx::query(
            r#"
            UPDATE products
            SET stock = stock - $2
            WHERE id = $1 AND stock >= $2
            RETURNING id, name, price_cents, stock
            "#,
        )
        .bind(product_id.get())
        .bind(quantity)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = updated {
            return Ok(Deduction::Applied(Self::row_to_product(row)?));
        }

        let available: Option<i64> = sqlx::query_scalar("SELECT stock FROM products WHERE id = $1")
            .bind(product_id.get())
            .fetch_optional(&self.pool)
            .await?;

        match available {
            Some(available) => Ok(Deduction::Insufficient { available }),
            None => Err(StoreError::not_found("product", product_id)),
        }
    }

    async fn increment_stock(&self, product_id: ProductId, quantity: i64) -> Result<Product> {
        sqlx::query(
            r#"
            UPDATE products
            SET stock = stock + $2
            WHERE id = $1
            RETURNING id, name, price_cents, stock
            "#,
        )
        .bind(product_id.get())
        .bind(quantity)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| out_of_range(e, "product", product_id))?
        .map(Self::row_to_product)
        .transpose()?
        .ok_or_else(|| StoreError::not_found("product", product_id))
    }

    async fn set_stock(&self, product_id: ProductId, stock: i64) -> Result<Product> {
        sqlx::query(
            r#"
            UPDATE products
            SET stock = $2
            WHERE id = $1
            RETURNING id, name, price_cents, stock
            "#,
        )
        .bind(product_id.get())
        .bind(stock)
        .fetch_optional(&self.pool)
        .await?
        .map(Self::row_to_product)
        .transpose()?
        .ok_or_else(|| StoreError::not_found("product", product_id))
    }
}

#[async_trait]
impl WarehouseRepository for PostgresStore {
    async fn insert_warehouse(&self, warehouse: NewWarehouse) -> Result<Warehouse> {
        let row = sqlx::query(
            r#"
            INSERT INTO warehouses (name, status)
            VALUES ($1, $2)
            RETURNING id, name, status
            "#,
        )
        .bind(&warehouse.name)
        .bind(warehouse.status.as_str())
        .fetch_one(&self.pool)
        .await?;

        Self::row_to_warehouse(row)
    }

    async fn get_warehouse(&self, warehouse_id: WarehouseId) -> Result<Option<Warehouse>> {
        sqlx::query("SELECT id, name, status FROM warehouses WHERE id = $1")
            .bind(warehouse_id.get())
            .fetch_optional(&self.pool)
            .await?
            .map(Self::row_to_warehouse)
            .transpose()
    }

    async fn set_warehouse_status(
        &self,
        warehouse_id: WarehouseId,
        status: WarehouseStatus,
    ) -> Result<Warehouse> {
        sqlx::query(
            r#"
            UPDATE warehouses
            SET status = $2
            WHERE id = $1
            RETURNING id, name, status
            "#,
        )
        .bind(warehouse_id.get())
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await?
        .map(Self::row_to_warehouse)
        .transpose()?
        .ok_or_else(|| StoreError::not_found("warehouse", warehouse_id))
    }

    async fn active_warehouses(&self) -> Result<Vec<Warehouse>> {
        sqlx::query("SELECT id, name, status FROM warehouses WHERE status = $1 ORDER BY id ASC")
            .bind(WarehouseStatus::Active.as_str())
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Self::row_to_warehouse)
            .collect()
    }
}

#[async_trait]
impl StockRepository for PostgresStore {
    async fn insert_cell(&self, cell: StockCell) -> Result<StockCell> {
        let row = sqlx::query(
            r#"
            INSERT INTO stocks (product_id, warehouse_id, quantity)
            VALUES ($1, $2, $3)
            RETURNING product_id, warehouse_id, quantity
            "#,
        )
        .bind(cell.product_id.get())
        .bind(cell.warehouse_id.get())
        .bind(cell.quantity)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e {
                if db_err.is_unique_violation() {
                    return StoreError::already_exists(
                        "stock cell",
                        format!(
                            "product {} / warehouse {}",
                            cell.product_id, cell.warehouse_id
                        ),
                    );
                }
                if db_err.is_foreign_key_violation() {
                    return StoreError::not_found("warehouse", cell.warehouse_id);
                }
            }
            StoreError::Database(e)
        })?;

        Self::row_to_cell(row)
    }

    async fn get_cell(
        &self,
        product_id: ProductId,
        warehouse_id: WarehouseId,
    ) -> Result<Option<StockCell>> {
        sqlx::query(
            r#"
            SELECT product_id, warehouse_id, quantity
            FROM stocks
            WHERE product_id = $1 AND warehouse_id = $2
            "#,
        )
        .bind(product_id.get())
        .bind(warehouse_id.get())
        .fetch_optional(&self.pool)
        .await?
        .map(Self::row_to_cell)
        .transpose()
    }

    async fn add_to_cell(
        &self,
        product_id: ProductId,
        warehouse_id: WarehouseId,
        quantity: i64,
    ) -> Result<StockCell> {
        sqlx::query(
            r#"
            UPDATE stocks
            SET quantity = quantity + $3
            WHERE product_id = $1 AND warehouse_id = $2
            RETURNING product_id, warehouse_id, quantity
            "#,
        )
        .bind(product_id.get())
        .bind(warehouse_id.get())
        .bind(quantity)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            out_of_range(
                e,
                "stock cell",
                format!("product {product_id} / warehouse {warehouse_id}"),
            )
        })?
        .map(Self::row_to_cell)
        .transpose()?
        .ok_or_else(|| {
            StoreError::not_found(
                "stock cell",
                format!("product {product_id} / warehouse {warehouse_id}"),
            )
        })
    }

    async fn remove_from_cell(
        &self,
        product_id: ProductId,
        warehouse_id: WarehouseId,
        quantity: i64,
    ) -> Result<Deduction<StockCell>> {
        let updated = sqlx::query(
            r#"
            UPDATE stocks
            SET quantity = quantity - $3
            WHERE product_id = $1 AND warehouse_id = $2 AND quantity >= $3
            RETURNING product_id, warehouse_id, quantity
            "#,
        )
        .bind(product_id.get())
        .bind(warehouse_id.get())
        .bind(quantity)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = updated {
            return Ok(Deduction::Applied(Self::row_to_cell(row)?));
        }

        match self.get_cell(product_id, warehouse_id).await? {
            Some(cell) => Ok(Deduction::Insufficient {
                available: cell.quantity,
            }),
            None => Err(StoreError::not_found(
                "stock cell",
                format!("product {product_id} / warehouse {warehouse_id}"),
            )),
        }
    }

    async fn take_from_cell(
        &self,
        product_id: ProductId,
        warehouse_id: WarehouseId,
        max: i64,
    ) -> Result<Option<i64>> {
        let mut tx = self.pool.begin().await?;

        let held: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT quantity
            FROM stocks
            WHERE product_id = $1 AND warehouse_id = $2
            FOR UPDATE
            "#,
        )
        .bind(product_id.get())
        .bind(warehouse_id.get())
        .fetch_optional(&mut *tx)
        .await?;

        let Some(held) = held else {
            return Ok(None);
        };

        let taken = held.min(max).max(0);
        if taken > 0 {
            sqlx::query(
                r#"
                UPDATE stocks
                SET quantity = quantity - $3
                WHERE product_id = $1 AND warehouse_id = $2
                "#,
            )
            .bind(product_id.get())
            .bind(warehouse_id.get())
            .bind(taken)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(Some(taken))
    }
}
