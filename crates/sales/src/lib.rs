//! Sale transaction coordinator.
//!
//! A sale submission names a client, a date and a list of
//! product/quantity/price lines. The coordinator validates it against the
//! catalog, prices it, and commits the sale header, its line items and
//! the matching stock decrements as one transaction:
//! 1. Client exists, items non-empty, every line valid
//! 2. Summed quantity per product fits current stock
//! 3. Stock decrements, sale header and line items written together
//!
//! Transient store failures are retried with backoff; everything else is
//! reported as-is. A submission never leaves a partial sale behind.

pub mod coordinator;
pub mod error;
pub mod retry;

pub use coordinator::{CoordinatorConfig, SaleCoordinator, SaleReceipt};
pub use error::{Result, SaleError, TransactionFailure};
pub use retry::RetryPolicy;
