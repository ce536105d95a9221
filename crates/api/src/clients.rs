//! HTTP clients for the service boundaries.
//!
//! Each client implements the same seam the in-process component does, so the
//! saga and the reconcilers can run against a remote ledger, warehouse or shop
//! without changes. Every request is bounded by the configured timeout.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use common::{OrderId, ProductId};
use domain::{LineItem, Order, Product};
use inventory::{Allocation, InventoryError, Ledger, StockTotals};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use saga::{SagaError, ShopClient, ShopOrder, WarehouseClient};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::config::Config;
use crate::routes::products::{ProductResponse, QuantityRequest};
use crate::routes::warehouse::TotalStockResponse;

/// How a remote call went wrong.
#[derive(Debug)]
enum Failure {
    Transport(String),
    Status { status: StatusCode, message: String },
    Decode(String),
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Failure::Transport(msg) => write!(f, "{msg}"),
            Failure::Status { status, message } => write!(f, "{status}: {message}"),
            Failure::Decode(msg) => write!(f, "invalid response body: {msg}"),
        }
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

fn record(operation: &'static str, outcome: &'static str) {
    metrics::counter!("upstream_requests_total", "operation" => operation, "outcome" => outcome)
        .increment(1);
}

/// Base URL plus a client with the request timeout applied.
#[derive(Debug, Clone)]
struct Remote {
    client: Client,
    base_url: String,
}

impl Remote {
    fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> Result<Response, Failure> {
        let response = match request.send().await {
            Ok(response) => response,
            Err(err) => {
                record(operation, "transport_error");
                tracing::warn!(operation, error = %err, "upstream request failed");
                return Err(Failure::Transport(err.to_string()));
            }
        };

        let status = response.status();
        if status.is_success() {
            record(operation, "success");
            return Ok(response);
        }

        record(operation, "error_status");
        let message = match response.json::<ErrorBody>().await {
            Ok(body) => body.error,
            Err(_) => status.to_string(),
        };
        tracing::warn!(operation, %status, error = %message, "upstream returned an error");
        Err(Failure::Status { status, message })
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> Result<T, Failure> {
        self.send(operation, request)
            .await?
            .json::<T>()
            .await
            .map_err(|err| Failure::Decode(err.to_string()))
    }
}

// -- Stock ledger --

/// [`Ledger`] over the `/products` endpoints.
#[derive(Debug, Clone)]
pub struct HttpLedger {
    remote: Remote,
}

impl HttpLedger {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            remote: Remote::new(base_url, timeout)?,
        })
    }

    async fn post_quantity(
        &self,
        operation: &'static str,
        path: String,
        quantity: i64,
    ) -> Result<Product, Failure> {
        let request = self
            .remote
            .client
            .post(self.remote.url(&path))
            .json(&QuantityRequest { quantity });
        let product: ProductResponse = self.remote.fetch(operation, request).await?;
        Ok(product.into())
    }
}

fn ledger_error(operation: &'static str, product_id: ProductId, failure: Failure) -> InventoryError {
    match failure {
        Failure::Status {
            status: StatusCode::NOT_FOUND,
            ..
        } => InventoryError::ProductNotFound(product_id),
        Failure::Status {
            status: StatusCode::BAD_REQUEST,
            message,
        } => InventoryError::Validation(message),
        other => InventoryError::Upstream {
            operation,
            reason: other.to_string(),
        },
    }
}

#[async_trait]
impl Ledger for HttpLedger {
    async fn get_stock(&self, product_id: ProductId) -> inventory::Result<Product> {
        let request = self
            .remote
            .client
            .get(self.remote.url(&format!("/products/{product_id}")));
        self.remote
            .fetch::<ProductResponse>("ledger.get_stock", request)
            .await
            .map(Into::into)
            .map_err(|failure| ledger_error("ledger.get_stock", product_id, failure))
    }

    async fn list_products(&self) -> inventory::Result<Vec<Product>> {
        let request = self.remote.client.get(self.remote.url("/products"));
        let products: Vec<ProductResponse> = self
            .remote
            .fetch("ledger.list_products", request)
            .await
            .map_err(|failure| InventoryError::Upstream {
                operation: "ledger.list_products",
                reason: failure.to_string(),
            })?;
        Ok(products.into_iter().map(Into::into).collect())
    }

    async fn decrement(&self, product_id: ProductId, quantity: i64) -> inventory::Result<Product> {
        match self
            .post_quantity(
                "ledger.decrement",
                format!("/products/deduct/{product_id}"),
                quantity,
            )
            .await
        {
            Ok(product) => Ok(product),
            Err(Failure::Status {
                status: StatusCode::CONFLICT,
                ..
            }) => {
                let available = self.get_stock(product_id).await?.stock;
                Err(InventoryError::InsufficientStock {
                    product_id,
                    requested: quantity,
                    available,
                })
            }
            Err(failure) => Err(ledger_error("ledger.decrement", product_id, failure)),
        }
    }

    async fn increment(&self, product_id: ProductId, quantity: i64) -> inventory::Result<Product> {
        self.post_quantity(
            "ledger.increment",
            format!("/products/restore/{product_id}"),
            quantity,
        )
        .await
        .map_err(|failure| ledger_error("ledger.increment", product_id, failure))
    }

    async fn set_absolute(&self, product_id: ProductId, quantity: i64) -> inventory::Result<Product> {
        self.post_quantity(
            "ledger.set_absolute",
            format!("/products/adjust-total-stock/{product_id}"),
            quantity,
        )
        .await
        .map_err(|failure| ledger_error("ledger.set_absolute", product_id, failure))
    }
}

// -- Warehouse allocator --

/// [`WarehouseClient`] and [`StockTotals`] over the `/warehouse/stock` endpoints.
#[derive(Debug, Clone)]
pub struct HttpWarehouseClient {
    remote: Remote,
}

impl HttpWarehouseClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            remote: Remote::new(base_url, timeout)?,
        })
    }
}

fn warehouse_error(operation: &'static str) -> impl FnOnce(Failure) -> InventoryError {
    move |failure| InventoryError::Upstream {
        operation,
        reason: failure.to_string(),
    }
}

#[async_trait]
impl WarehouseClient for HttpWarehouseClient {
    async fn allocate_for_order(
        &self,
        order_id: OrderId,
        items: &[LineItem],
    ) -> inventory::Result<Vec<Allocation>> {
        let request = self
            .remote
            .client
            .post(self.remote.url("/warehouse/stock/proceed-order"))
            .json(&ShopOrder {
                order_id,
                items: items.to_vec(),
            });
        self.remote
            .fetch("warehouse.proceed_order", request)
            .await
            .map_err(warehouse_error("warehouse.proceed_order"))
    }

    async fn restore_stock(&self, order_id: OrderId, items: &[LineItem]) -> inventory::Result<()> {
        let request = self
            .remote
            .client
            .post(self.remote.url("/warehouse/stock/restore"))
            .json(&ShopOrder {
                order_id,
                items: items.to_vec(),
            });
        self.remote
            .send("warehouse.restore_stock", request)
            .await
            .map_err(warehouse_error("warehouse.restore_stock"))?;
        Ok(())
    }
}

#[async_trait]
impl StockTotals for HttpWarehouseClient {
    async fn compute_total_stock(&self, product_id: ProductId) -> inventory::Result<i64> {
        let request = self
            .remote
            .client
            .get(self.remote.url(&format!("/warehouse/stock/{product_id}/total")));
        let response: TotalStockResponse = self
            .remote
            .fetch("warehouse.total_stock", request)
            .await
            .map_err(warehouse_error("warehouse.total_stock"))?;
        Ok(response.total)
    }
}

// -- Shop --

/// [`ShopClient`] over `POST /shop/proceed-order`.
#[derive(Debug, Clone)]
pub struct HttpShopClient {
    remote: Remote,
}

impl HttpShopClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            remote: Remote::new(base_url, timeout)?,
        })
    }
}

#[async_trait]
impl ShopClient for HttpShopClient {
    async fn forward(&self, order: &Order) -> Result<Vec<Allocation>, SagaError> {
        let request = self
            .remote
            .client
            .post(self.remote.url("/shop/proceed-order"))
            .json(&ShopOrder::from(order));
        self.remote
            .fetch("shop.forward", request)
            .await
            .map_err(|failure| SagaError::Upstream {
                operation: "shop.forward",
                reason: failure.to_string(),
            })
    }
}

// -- Wiring --

/// The HTTP clients configured for this process.
///
/// A `None` entry means that component is reached in-process.
#[derive(Debug, Clone, Default)]
pub struct Remotes {
    pub ledger: Option<HttpLedger>,
    pub warehouse: Option<HttpWarehouseClient>,
    pub shop: Option<HttpShopClient>,
}

impl Remotes {
    /// Builds a client for every base URL set in `config`, each bounded by
    /// `config.upstream_timeout`.
    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        let timeout = config.upstream_timeout;
        Ok(Self {
            ledger: config
                .ledger_url
                .as_deref()
                .map(|url| HttpLedger::new(url, timeout))
                .transpose()?,
            warehouse: config
                .warehouse_url
                .as_deref()
                .map(|url| HttpWarehouseClient::new(url, timeout))
                .transpose()?,
            shop: config
                .shop_url
                .as_deref()
                .map(|url| HttpShopClient::new(url, timeout))
                .transpose()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remotes_follow_configured_urls() {
        let remotes = Remotes::from_config(&Config::default()).unwrap();
        assert!(remotes.ledger.is_none());
        assert!(remotes.warehouse.is_none());
        assert!(remotes.shop.is_none());

        let config = Config {
            ledger_url: Some("http://ledger:3000/".to_string()),
            shop_url: Some("http://shop:3000".to_string()),
            ..Config::default()
        };
        let remotes = Remotes::from_config(&config).unwrap();
        assert_eq!(
            remotes.ledger.unwrap().remote.url("/products"),
            "http://ledger:3000/products"
        );
        assert!(remotes.warehouse.is_none());
        assert_eq!(
            remotes.shop.unwrap().remote.url("/shop/proceed-order"),
            "http://shop:3000/shop/proceed-order"
        );
    }

    #[test]
    fn test_base_url_trailing_slash_is_dropped() {
        let remote = Remote::new("http://ledger:3000/", Duration::from_secs(1)).unwrap();
        assert_eq!(remote.url("/products/4"), "http://ledger:3000/products/4");
    }

    #[test]
    fn test_ledger_error_mapping() {
        let not_found = Failure::Status {
            status: StatusCode::NOT_FOUND,
            message: "Product not found: 4".to_string(),
        };
        assert!(matches!(
            ledger_error("ledger.get_stock", ProductId::new(4), not_found),
            InventoryError::ProductNotFound(id) if id == ProductId::new(4)
        ));

        let bad_request = Failure::Status {
            status: StatusCode::BAD_REQUEST,
            message: "quantity must be positive".to_string(),
        };
        assert!(matches!(
            ledger_error("ledger.increment", ProductId::new(4), bad_request),
            InventoryError::Validation(msg) if msg == "quantity must be positive"
        ));

        let unavailable = Failure::Status {
            status: StatusCode::SERVICE_UNAVAILABLE,
            message: "down".to_string(),
        };
        match ledger_error("ledger.increment", ProductId::new(4), unavailable) {
            InventoryError::Upstream { operation, reason } => {
                assert_eq!(operation, "ledger.increment");
                assert_eq!(reason, "503 Service Unavailable: down");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
