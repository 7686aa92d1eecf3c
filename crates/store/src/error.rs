use common::{Entity, ProductId};
use thiserror::Error;

/// Errors that can occur when interacting with the catalog store or sale ledger.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A referenced record does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: Entity, id: i64 },

    /// A conditional stock decrement found less stock than requested.
    #[error(
        "Insufficient stock for product {product_id}: available {available}, requested {requested}"
    )]
    InsufficientStock {
        product_id: ProductId,
        available: i64,
        requested: i64,
    },

    /// A write was refused by a store constraint.
    #[error("Constraint violated: {0}")]
    Constraint(String),

    /// The store could not be reached or refused to start work.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl StoreError {
    /// Returns true if retrying the whole transaction may succeed.
    ///
    /// Covers connection loss, pool exhaustion, serialization failures,
    /// deadlocks and lock timeouts. Everything else is deterministic.
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::Unavailable(_) => true,
            StoreError::Database(err) => match err {
                sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) | sqlx::Error::WorkerCrashed => {
                    true
                }
                sqlx::Error::Database(db_err) => matches!(
                    db_err.code().as_deref(),
                    Some("40001") | Some("40P01") | Some("55P03")
                ),
                _ => false,
            },
            _ => false,
        }
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
