//! Catalog store and sale ledger.
//!
//! Both live behind one transactional boundary so that a sale header,
//! its line items and the stock decrements they imply are committed
//! together or not at all.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::{InMemoryStore, InMemoryTransaction};
pub use postgres::{PostgresStore, PostgresTransaction};
pub use store::{CatalogStore, SaleLedger, Store, StoreTransaction, TransactionalStore};
