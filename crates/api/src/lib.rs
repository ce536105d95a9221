//! HTTP API server with observability for the order fulfillment services.
//!
//! Hosts the stock ledger, warehouse allocator, shop forwarder and order saga
//! behind one router, with structured logging (tracing) and Prometheus
//! metrics. Every outbound call a component makes goes through a shared seam
//! that is either the in-process component or one of the [`clients`], chosen
//! per component by [`Config`].

pub mod clients;
pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use inventory::{Ledger, StockLedger, StockTotals, WarehouseAllocator};
use metrics_exporter_prometheus::PrometheusHandle;
use reconciler::{AutoCancelJob, StockSyncJob};
use saga::{OrderSaga, ShopClient, ShopForwarder, WarehouseClient};
use store::Store;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::clients::Remotes;
use crate::config::Config;

pub type SharedLedger = Arc<dyn Ledger>;
pub type SharedWarehouse = Arc<dyn WarehouseClient>;
pub type SharedTotals = Arc<dyn StockTotals>;
pub type SharedShop = Arc<dyn ShopClient>;

pub type AppLedger<S> = StockLedger<S>;
pub type AppAllocator<S> = WarehouseAllocator<S, SharedLedger>;
pub type AppShop = ShopForwarder<SharedWarehouse>;
pub type AppSaga<S> = OrderSaga<S, SharedLedger, SharedShop, SharedWarehouse>;

/// Shared application state accessible from all handlers.
///
/// `ledger`, `allocator` and `shop` serve this process's own endpoints; the
/// seams they and the saga call out through may point elsewhere.
pub struct AppState<S: Store> {
    pub store: S,
    pub ledger: AppLedger<S>,
    pub allocator: AppAllocator<S>,
    pub shop: AppShop,
    pub saga: AppSaga<S>,
    totals: SharedTotals,
}

impl<S: Store> AppState<S> {
    /// Auto-cancel over this process's orders, cancelling through the saga.
    pub fn auto_cancel_job(&self, staleness: chrono::Duration) -> AutoCancelJob<S, AppSaga<S>> {
        AutoCancelJob::new(self.store.clone(), self.saga.clone(), staleness)
    }

    /// Stock sync from the configured warehouse totals into the configured ledger.
    pub fn stock_sync_job(&self) -> StockSyncJob<SharedLedger, SharedTotals> {
        StockSyncJob::new(self.allocator.ledger().clone(), self.totals.clone())
    }
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: Store>(state: Arc<AppState<S>>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        // Orders
        .route("/order/checkout", post(routes::orders::checkout::<S>))
        .route("/order/payment/{order_id}", post(routes::orders::payment::<S>))
        .route("/order/cancel/{order_id}", post(routes::orders::cancel::<S>))
        .route("/order/{order_id}", get(routes::orders::get::<S>))
        // Stock ledger
        .route(
            "/products",
            get(routes::products::list::<S>).post(routes::products::create::<S>),
        )
        .route("/products/{id}", get(routes::products::get::<S>))
        .route("/products/deduct/{id}", post(routes::products::deduct::<S>))
        .route("/products/restore/{id}", post(routes::products::restore::<S>))
        .route(
            "/products/adjust-total-stock/{id}",
            post(routes::products::adjust_total_stock::<S>),
        )
        // Warehouses
        .route("/warehouses", post(routes::warehouse::create::<S>))
        .route("/warehouses/{id}", get(routes::warehouse::get::<S>))
        .route("/warehouse/{id}/activate", post(routes::warehouse::activate::<S>))
        .route(
            "/warehouse/{id}/deactivate",
            post(routes::warehouse::deactivate::<S>),
        )
        .route(
            "/warehouse/stock/cells",
            post(routes::warehouse::register_cell::<S>),
        )
        .route(
            "/warehouse/stock/{product_id}/total",
            get(routes::warehouse::total_stock::<S>),
        )
        .route("/warehouse/stock/add", post(routes::warehouse::add_stock::<S>))
        .route(
            "/warehouse/stock/remove",
            post(routes::warehouse::remove_stock::<S>),
        )
        .route(
            "/warehouse/stock/transfer-product",
            post(routes::warehouse::transfer_product::<S>),
        )
        .route(
            "/warehouse/stock/active-deactive",
            post(routes::warehouse::active_deactive::<S>),
        )
        .route(
            "/warehouse/stock/proceed-order",
            post(routes::warehouse::proceed_order::<S>),
        )
        .route(
            "/warehouse/stock/restore",
            post(routes::warehouse::restore_stock::<S>),
        )
        // Shop
        .route("/shop/proceed-order", post(routes::shop::proceed_order::<S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Wires every component over `store`, reaching each collaborator over HTTP
/// when its base URL is configured.
pub fn create_state<S: Store>(
    store: S,
    config: &Config,
) -> Result<Arc<AppState<S>>, reqwest::Error> {
    Ok(assemble(store, Remotes::from_config(config)?))
}

/// Wires every component in-process over one store.
pub fn create_default_state<S: Store>(store: S) -> Arc<AppState<S>> {
    assemble(store, Remotes::default())
}

fn assemble<S: Store>(store: S, remotes: Remotes) -> Arc<AppState<S>> {
    let ledger = StockLedger::new(store.clone());
    let ledger_seam: SharedLedger = match remotes.ledger {
        Some(client) => {
            tracing::info!("ledger reached over HTTP");
            Arc::new(client)
        }
        None => Arc::new(ledger.clone()),
    };

    let allocator = WarehouseAllocator::new(store.clone(), ledger_seam.clone());
    let (warehouse, totals): (SharedWarehouse, SharedTotals) = match remotes.warehouse {
        Some(client) => {
            tracing::info!("warehouse allocator reached over HTTP");
            let client = Arc::new(client);
            (client.clone() as SharedWarehouse, client as SharedTotals)
        }
        None => {
            let local = Arc::new(allocator.clone());
            (local.clone() as SharedWarehouse, local as SharedTotals)
        }
    };

    let shop = ShopForwarder::new(warehouse.clone());
    let shop_seam: SharedShop = match remotes.shop {
        Some(client) => {
            tracing::info!("shop reached over HTTP");
            Arc::new(client)
        }
        None => Arc::new(shop.clone()),
    };

    let saga = OrderSaga::new(store.clone(), ledger_seam, shop_seam, warehouse);

    Arc::new(AppState {
        store,
        ledger,
        allocator,
        shop,
        saga,
        totals,
    })
}
