//! Sale submission error types.

use std::time::Duration;

use common::{Entity, ProductId};
use domain::{DomainError, InvalidReason};
use store::StoreError;
use thiserror::Error;

/// Why a transaction could not be carried out, independent of the request.
#[derive(Debug, Error)]
pub enum TransactionFailure {
    /// The submission did not finish within its deadline.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// A transient store failure persisted through every retry.
    #[error("gave up after {attempts} attempts: {source}")]
    RetriesExhausted {
        attempts: usize,
        #[source]
        source: StoreError,
    },

    /// The store failed in a way retrying cannot fix.
    #[error(transparent)]
    Store(StoreError),
}

/// Errors a sale submission can end with.
///
/// Each variant is a distinct cause a caller can react to; none of them
/// leaves a partial sale behind.
#[derive(Debug, Error)]
pub enum SaleError {
    /// The client or a product does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: Entity, id: i64 },

    /// The request failed field-level validation.
    #[error("Invalid request: {0}")]
    InvalidRequest(InvalidReason),

    /// A product does not have enough stock for the summed quantity.
    #[error(
        "Insufficient stock for product {product_id}: available {available}, requested {requested}"
    )]
    InsufficientStock {
        product_id: ProductId,
        available: i64,
        requested: i64,
    },

    /// The store could not complete the transaction.
    #[error("Transaction failed: {0}")]
    TransactionFailed(#[source] TransactionFailure),
}

impl SaleError {
    /// Returns a stable snake_case code for the failure kind.
    pub fn kind(&self) -> &'static str {
        match self {
            SaleError::NotFound { .. } => "not_found",
            SaleError::InvalidRequest(_) => "invalid_request",
            SaleError::InsufficientStock { .. } => "insufficient_stock",
            SaleError::TransactionFailed(_) => "transaction_failed",
        }
    }

    /// Returns true for transient store failures worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SaleError::TransactionFailed(TransactionFailure::Store(err)) if err.is_transient()
        )
    }
}

impl From<StoreError> for SaleError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => SaleError::NotFound { entity, id },
            StoreError::InsufficientStock {
                product_id,
                available,
                requested,
            } => SaleError::InsufficientStock {
                product_id,
                available,
                requested,
            },
            other => SaleError::TransactionFailed(TransactionFailure::Store(other)),
        }
    }
}

impl From<DomainError> for SaleError {
    fn from(err: DomainError) -> Self {
        SaleError::InvalidRequest(err.reason())
    }
}

/// Convenience type alias for sale results.
pub type Result<T> = std::result::Result<T, SaleError>;
