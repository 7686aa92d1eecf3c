//! Client registration and lookup.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use common::{ClientId, Entity};
use domain::{Client, NewClient};
use store::{CatalogStore, Store};

use crate::AppState;
use crate::error::ApiError;
use crate::extract::{self, Path};

/// GET /api/clients: every client ordered by id.
#[tracing::instrument(skip(state))]
pub async fn list<S: Store>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<Client>>, ApiError> {
    Ok(Json(state.store.list_clients().await?))
}

/// POST /api/clients: register a client.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    extract::Json(req): extract::Json<NewClient>,
) -> Result<(StatusCode, Json<Client>), ApiError> {
    let client = state.store.create_client(req.validate()?).await?;
    tracing::info!(client_id = %client.id, "client registered");
    Ok((StatusCode::CREATED, Json(client)))
}

/// GET /api/clients/{id}
#[tracing::instrument(skip(state))]
pub async fn get<S: Store>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<i64>,
) -> Result<Json<Client>, ApiError> {
    state
        .store
        .get_client(ClientId::new(id))
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound {
            entity: Entity::Client,
            id,
        })
}
