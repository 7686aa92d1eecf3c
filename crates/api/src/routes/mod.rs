//! HTTP route handlers.

pub mod clients;
pub mod health;
pub mod metrics;
pub mod products;
pub mod reports;
pub mod sales;
