//! Report rows and the aggregations that build them.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use common::ProductId;
use domain::{LineItem, Money, Product, Sale};
use serde::Serialize;

/// Revenue for one sale date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailySales {
    pub date: NaiveDate,
    pub total: Money,
}

/// Units sold of one product across all sales.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductSales {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u64,
}

/// Catalog projection used by the inventory table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InventoryRow {
    pub id: ProductId,
    pub name: String,
    pub price: Money,
    pub stock: i64,
}

impl From<Product> for InventoryRow {
    fn from(product: Product) -> Self {
        Self {
            id: product.id,
            name: product.name,
            price: product.price,
            stock: product.stock,
        }
    }
}

/// Sums sale totals per date, ascending by date.
pub fn sales_by_date(sales: &[Sale]) -> Vec<DailySales> {
    let mut by_date: BTreeMap<NaiveDate, Money> = BTreeMap::new();
    for sale in sales {
        *by_date.entry(sale.sale_date).or_default() += sale.total;
    }

    by_date
        .into_iter()
        .map(|(date, total)| DailySales { date, total })
        .collect()
}

/// Sums line item quantities per product, largest first.
///
/// Ties go to the lower product id. Products no longer in `catalog` are
/// labelled by their id.
pub fn top_products(items: &[LineItem], catalog: &[Product], limit: usize) -> Vec<ProductSales> {
    let mut quantities: BTreeMap<ProductId, u64> = BTreeMap::new();
    for item in items {
        *quantities.entry(item.product_id).or_default() += u64::from(item.quantity);
    }

    let names: BTreeMap<ProductId, &str> = catalog
        .iter()
        .map(|product| (product.id, product.name.as_str()))
        .collect();

    let mut rows: Vec<ProductSales> = quantities
        .into_iter()
        .map(|(product_id, quantity)| ProductSales {
            product_id,
            product_name: names
                .get(&product_id)
                .map(|name| name.to_string())
                .unwrap_or_else(|| product_id.to_string()),
            quantity,
        })
        .collect();

    rows.sort_by(|a, b| {
        b.quantity
            .cmp(&a.quantity)
            .then(a.product_id.cmp(&b.product_id))
    });
    rows.truncate(limit);
    rows
}
