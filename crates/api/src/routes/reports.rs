//! Dashboard reports.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use reporting::{DEFAULT_TOP_PRODUCTS, DailySales, InventoryRow, ProductSales};
use serde::Deserialize;
use store::Store;

use crate::AppState;
use crate::error::ApiError;
use crate::extract::Query;

#[derive(Debug, Deserialize)]
pub struct TopProductsQuery {
    pub limit: Option<usize>,
}

/// GET /api/reports/sales-by-date
#[tracing::instrument(skip(state))]
pub async fn sales_by_date<S: Store>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<DailySales>>, ApiError> {
    Ok(Json(state.reports.sales_by_date().await?))
}

/// GET /api/reports/top-products?limit=N (default 10)
#[tracing::instrument(skip(state))]
pub async fn top_products<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Query(query): Query<TopProductsQuery>,
) -> Result<Json<Vec<ProductSales>>, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_TOP_PRODUCTS);
    Ok(Json(state.reports.top_products(limit).await?))
}

/// GET /api/reports/inventory
#[tracing::instrument(skip(state))]
pub async fn inventory<S: Store>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<InventoryRow>>, ApiError> {
    Ok(Json(state.reports.inventory().await?))
}
