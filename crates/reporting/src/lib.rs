//! Read-only reports for the admin dashboard.
//!
//! - [`ReportingFacade::sales_by_date`]: revenue per sale date
//! - [`ReportingFacade::top_products`]: best sellers by quantity
//! - [`ReportingFacade::inventory`]: current catalog stock and prices
//!
//! Reports are computed from committed rows on every call and never write.

pub mod error;
pub mod facade;
pub mod views;

pub use error::{ReportError, Result};
pub use facade::{DEFAULT_TOP_PRODUCTS, ReportingFacade};
pub use views::{DailySales, InventoryRow, ProductSales};
