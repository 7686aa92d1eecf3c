//! Product catalog endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use common::{Entity, ProductId};
use domain::{NewProduct, Product};
use store::{CatalogStore, Store};

use crate::AppState;
use crate::error::ApiError;
use crate::extract::{self, Path};

/// GET /api/products: the whole catalog ordered by id.
#[tracing::instrument(skip(state))]
pub async fn list<S: Store>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<Product>>, ApiError> {
    Ok(Json(state.store.list_products().await?))
}

/// POST /api/products: add a product with its opening stock.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    extract::Json(req): extract::Json<NewProduct>,
) -> Result<(StatusCode, Json<Product>), ApiError> {
    let product = state.store.create_product(req.validate()?).await?;
    tracing::info!(product_id = %product.id, stock = product.stock, "product added");
    Ok((StatusCode::CREATED, Json(product)))
}

/// GET /api/products/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<i64>,
) -> Result<Json<Product>, ApiError> {
    state
        .store
        .get_product(ProductId::new(id))
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound {
            entity: Entity::Product,
            id,
        })
}
