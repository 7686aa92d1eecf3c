//! Query facade over the catalog and the ledger.

use store::{CatalogStore, SaleLedger};

use crate::Result;
use crate::views::{self, DailySales, InventoryRow, ProductSales};

/// Number of rows the dashboard asks for in its best-seller table.
pub const DEFAULT_TOP_PRODUCTS: usize = 10;

/// Read-only reports built from committed rows.
#[derive(Clone)]
pub struct ReportingFacade<S> {
    store: S,
}

impl<S: CatalogStore + SaleLedger> ReportingFacade<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Revenue grouped by sale date, oldest first.
    #[tracing::instrument(skip(self))]
    pub async fn sales_by_date(&self) -> Result<Vec<DailySales>> {
        let sales = self.store.list_sales().await?;
        Ok(views::sales_by_date(&sales))
    }

    /// The `limit` best-selling products by units sold.
    #[tracing::instrument(skip(self))]
    pub async fn top_products(&self, limit: usize) -> Result<Vec<ProductSales>> {
        let items = self.store.list_line_items().await?;
        let catalog = self.store.list_products().await?;
        Ok(views::top_products(&items, &catalog, limit))
    }

    /// Every product with its current price and stock, by id.
    #[tracing::instrument(skip(self))]
    pub async fn inventory(&self) -> Result<Vec<InventoryRow>> {
        let products = self.store.list_products().await?;
        Ok(products.into_iter().map(InventoryRow::from).collect())
    }
}
