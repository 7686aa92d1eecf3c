use async_trait::async_trait;
use common::{ClientId, LineItemId, ProductId, SaleId};
use domain::{Client, LineItem, NewClient, NewLineItem, NewProduct, NewSale, Product, Sale};

use crate::Result;

/// Record of truth for clients and products.
///
/// Creation inputs are expected to be validated by the caller; the
/// backing store still enforces its own constraints.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Registers a client and returns it with its assigned id.
    async fn create_client(&self, client: NewClient) -> Result<Client>;

    /// Looks up a client by id.
    async fn get_client(&self, id: ClientId) -> Result<Option<Client>>;

    /// Lists all clients ordered by id.
    async fn list_clients(&self) -> Result<Vec<Client>>;

    /// Adds a product and returns it with its assigned id.
    async fn create_product(&self, product: NewProduct) -> Result<Product>;

    /// Looks up a product by id.
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>>;

    /// Lists all products ordered by id.
    async fn list_products(&self) -> Result<Vec<Product>>;
}

/// Read access to committed sales and line items.
///
/// There is deliberately no write method here: rows only enter the
/// ledger through a [`StoreTransaction`].
#[async_trait]
pub trait SaleLedger: Send + Sync {
    /// Looks up a sale header by id.
    async fn get_sale(&self, id: SaleId) -> Result<Option<Sale>>;

    /// Lists all sale headers ordered by id.
    async fn list_sales(&self) -> Result<Vec<Sale>>;

    /// Lists all line items ordered by id.
    async fn list_line_items(&self) -> Result<Vec<LineItem>>;

    /// Lists the line items of one sale ordered by id.
    async fn line_items_for_sale(&self, id: SaleId) -> Result<Vec<LineItem>>;
}

/// A store able to open a transaction spanning both the catalog and the ledger.
#[async_trait]
pub trait TransactionalStore: Send + Sync {
    type Transaction: StoreTransaction;

    /// Opens a new transaction.
    async fn begin(&self) -> Result<Self::Transaction>;

    /// Checks that the store is reachable.
    async fn ping(&self) -> Result<()>;
}

/// One all-or-nothing unit of work across catalog and ledger.
///
/// Nothing written through a transaction is visible to other readers
/// until [`commit`](StoreTransaction::commit) returns `Ok`. Dropping a
/// transaction without committing discards every staged write.
#[async_trait]
pub trait StoreTransaction: Send {
    /// Reads a client as seen by this transaction.
    async fn get_client(&mut self, id: ClientId) -> Result<Option<Client>>;

    /// Reads a product as seen by this transaction, including its own
    /// pending stock decrements.
    async fn get_product(&mut self, id: ProductId) -> Result<Option<Product>>;

    /// Takes `amount` units from a product's stock if at least that many
    /// remain, returning the stock left.
    ///
    /// The check and the decrement are indivisible with respect to other
    /// transactions touching the same product. Fails with
    /// `InsufficientStock` carrying the stock actually available.
    async fn decrement_stock(&mut self, id: ProductId, amount: i64) -> Result<i64>;

    /// Inserts a sale header.
    async fn insert_sale(&mut self, sale: &NewSale) -> Result<SaleId>;

    /// Inserts a line item under a sale inserted by this transaction.
    async fn insert_line_item(&mut self, item: &NewLineItem) -> Result<LineItemId>;

    /// Makes every staged write visible atomically.
    async fn commit(self) -> Result<()>;

    /// Discards every staged write.
    async fn rollback(self) -> Result<()>;
}

/// Everything the services need from a backing store.
pub trait Store: CatalogStore + SaleLedger + TransactionalStore + Clone + 'static {}

impl<T> Store for T where T: CatalogStore + SaleLedger + TransactionalStore + Clone + 'static {}
