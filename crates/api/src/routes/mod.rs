//! HTTP handlers, one module per service surface.

pub mod health;
pub mod metrics;
pub mod orders;
pub mod products;
pub mod shop;
pub mod warehouse;
