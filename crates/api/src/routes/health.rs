//! Liveness and database reachability endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Serialize;
use store::{Store, TransactionalStore};

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Serialize)]
pub struct DbPingResponse {
    pub db: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// GET /health: returns system health status.
pub async fn check() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// GET /db-ping: checks that the backing store answers.
#[tracing::instrument(skip(state))]
pub async fn db_ping<S: Store>(
    State(state): State<Arc<AppState<S>>>,
) -> (StatusCode, Json<DbPingResponse>) {
    match state.store.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(DbPingResponse {
                db: "ok",
                detail: None,
            }),
        ),
        Err(err) => {
            tracing::error!(error = %err, "database ping failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(DbPingResponse {
                    db: "error",
                    detail: Some(err.to_string()),
                }),
            )
        }
    }
}
