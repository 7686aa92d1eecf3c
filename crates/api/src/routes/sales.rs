//! Sale submission and ledger reads.
//!
//! The only way to write a sale is `POST /api/sales`, which hands the
//! request to the coordinator. Headers and line items are never inserted
//! one by one.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use common::{Entity, SaleId};
use domain::{LineItem, Sale, SaleRequest};
use sales::SaleReceipt;
use serde::Serialize;
use store::{SaleLedger, Store};

use crate::AppState;
use crate::error::ApiError;
use crate::extract::{self, Path};

/// A sale header with its line items.
#[derive(Serialize)]
pub struct SaleDetail {
    pub sale: Sale,
    pub line_items: Vec<LineItem>,
}

/// GET /api/sales: every sale header ordered by id.
#[tracing::instrument(skip(state))]
pub async fn list<S: Store>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<Sale>>, ApiError> {
    Ok(Json(state.store.list_sales().await?))
}

/// POST /api/sales: validate and commit a sale atomically.
#[tracing::instrument(skip(state, req))]
pub async fn submit<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    extract::Json(req): extract::Json<SaleRequest>,
) -> Result<(StatusCode, Json<SaleReceipt>), ApiError> {
    let receipt = state.coordinator.submit_sale(req).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

/// GET /api/sales/{id}: a sale and its line items.
#[tracing::instrument(skip(state))]
pub async fn get<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<i64>,
) -> Result<Json<SaleDetail>, ApiError> {
    let sale_id = SaleId::new(id);
    let sale = state
        .store
        .get_sale(sale_id)
        .await?
        .ok_or(ApiError::NotFound {
            entity: Entity::Sale,
            id,
        })?;
    let line_items = state.store.line_items_for_sale(sale_id).await?;

    Ok(Json(SaleDetail { sale, line_items }))
}

/// GET /api/sale-items: every line item ordered by id.
#[tracing::instrument(skip(state))]
pub async fn list_items<S: Store>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<LineItem>>, ApiError> {
    Ok(Json(state.store.list_line_items().await?))
}
