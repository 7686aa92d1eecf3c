//! HTTP API server for the sales admin backend.
//!
//! Exposes the catalog, the sale submission path and the dashboard
//! reports as JSON endpoints under `/api`, with structured logging
//! (tracing) and Prometheus metrics.

pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::middleware;
use axum::routing::get;
use metrics_exporter_prometheus::PrometheusHandle;
use reporting::ReportingFacade;
use sales::{CoordinatorConfig, SaleCoordinator};
use store::Store;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use auth::Credentials;

/// Shared application state accessible from all handlers.
pub struct AppState<S: Store> {
    pub store: S,
    pub coordinator: SaleCoordinator<S>,
    pub reports: ReportingFacade<S>,
    pub credentials: Option<Credentials>,
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: Store>(state: Arc<AppState<S>>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::render))
        .with_state(metrics_handle);

    let api = Router::new()
        .route(
            "/clients",
            get(routes::clients::list::<S>).post(routes::clients::create::<S>),
        )
        .route("/clients/{id}", get(routes::clients::get::<S>))
        .route(
            "/products",
            get(routes::products::list::<S>).post(routes::products::create::<S>),
        )
        .route("/products/{id}", get(routes::products::get::<S>))
        .route(
            "/sales",
            get(routes::sales::list::<S>).post(routes::sales::submit::<S>),
        )
        .route("/sales/{id}", get(routes::sales::get::<S>))
        .route("/sale-items", get(routes::sales::list_items::<S>))
        .route(
            "/reports/sales-by-date",
            get(routes::reports::sales_by_date::<S>),
        )
        .route(
            "/reports/top-products",
            get(routes::reports::top_products::<S>),
        )
        .route("/reports/inventory", get(routes::reports::inventory::<S>))
        .route_layer(middleware::from_fn_with_state(
            state.credentials.clone(),
            auth::require_credentials,
        ))
        .with_state(state.clone());

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/db-ping", get(routes::health::db_ping::<S>))
        .with_state(state)
        .nest("/api", api)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the application state around a store.
pub fn create_state<S: Store>(
    store: S,
    coordinator: CoordinatorConfig,
    credentials: Option<Credentials>,
) -> Arc<AppState<S>> {
    Arc::new(AppState {
        coordinator: SaleCoordinator::with_config(store.clone(), coordinator),
        reports: ReportingFacade::new(store.clone()),
        store,
        credentials,
    })
}
