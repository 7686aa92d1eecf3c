use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use common::{ClientId, Entity, LineItemId, ProductId, SaleId};
use domain::{Client, LineItem, NewClient, NewLineItem, NewProduct, NewSale, Product, Sale};
use tokio::sync::RwLock;

use crate::{
    Result, StoreError,
    store::{CatalogStore, SaleLedger, StoreTransaction, TransactionalStore},
};

#[derive(Debug, Default)]
struct MemoryState {
    clients: BTreeMap<ClientId, Client>,
    products: BTreeMap<ProductId, Product>,
    sales: BTreeMap<SaleId, Sale>,
    line_items: BTreeMap<LineItemId, LineItem>,
}

/// Row id sequences. Like database sequences, ids handed to a
/// transaction that later rolls back are never reused.
#[derive(Debug, Default)]
struct Sequences {
    client: AtomicI64,
    product: AtomicI64,
    sale: AtomicI64,
    line_item: AtomicI64,
}

fn next_id(seq: &AtomicI64) -> i64 {
    seq.fetch_add(1, Ordering::SeqCst) + 1
}

/// Failure injection used by tests to exercise partial-failure paths.
#[derive(Debug, Default)]
struct Faults {
    failing_begins: AtomicUsize,
    fail_on_commit: AtomicBool,
    fail_on_line_item: AtomicBool,
    commit_delay_ms: AtomicU64,
    decrement_delay_ms: AtomicU64,
}

/// In-memory store implementation for testing and local runs.
///
/// Transactions stage their writes privately. Commit takes the state
/// write lock, re-checks every staged stock decrement against the
/// current stock and then applies everything, so no reader ever sees
/// half a sale and concurrent sales cannot oversell.
#[derive(Clone, Debug, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<MemoryState>>,
    sequences: Arc<Sequences>,
    faults: Arc<Faults>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of committed sales.
    pub async fn sale_count(&self) -> usize {
        self.state.read().await.sales.len()
    }

    /// Returns the number of committed line items.
    pub async fn line_item_count(&self) -> usize {
        self.state.read().await.line_items.len()
    }

    /// Makes the next `count` calls to `begin` fail as unavailable.
    pub fn fail_next_begins(&self, count: usize) {
        self.faults.failing_begins.store(count, Ordering::SeqCst);
    }

    /// Makes every commit fail as unavailable until reset.
    pub fn set_fail_on_commit(&self, fail: bool) {
        self.faults.fail_on_commit.store(fail, Ordering::SeqCst);
    }

    /// Makes every line item insert fail with a constraint violation until reset.
    pub fn set_fail_on_line_item(&self, fail: bool) {
        self.faults.fail_on_line_item.store(fail, Ordering::SeqCst);
    }

    /// Delays every commit before it applies anything.
    pub fn set_commit_delay(&self, delay: Duration) {
        self.faults
            .commit_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Delays every stock decrement, like a write waiting on a row lock.
    pub fn set_decrement_delay(&self, delay: Duration) {
        self.faults
            .decrement_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }
}

#[async_trait]
impl CatalogStore for InMemoryStore {
    async fn create_client(&self, client: NewClient) -> Result<Client> {
        let client = Client {
            id: ClientId::new(next_id(&self.sequences.client)),
            first_name: client.first_name,
            last_name: client.last_name,
            email: client.email,
            phone: client.phone,
            address: client.address,
            registered_on: client
                .registered_on
                .unwrap_or_else(|| Utc::now().date_naive()),
        };
        self.state
            .write()
            .await
            .clients
            .insert(client.id, client.clone());
        Ok(client)
    }

    async fn get_client(&self, id: ClientId) -> Result<Option<Client>> {
        Ok(self.state.read().await.clients.get(&id).cloned())
    }

    async fn list_clients(&self) -> Result<Vec<Client>> {
        Ok(self.state.read().await.clients.values().cloned().collect())
    }

    async fn create_product(&self, product: NewProduct) -> Result<Product> {
        if product.stock < 0 {
            return Err(StoreError::Constraint(
                "products_stock_non_negative".to_string(),
            ));
        }

        let product = Product {
            id: ProductId::new(next_id(&self.sequences.product)),
            name: product.name,
            description: product.description,
            price: product.price,
            stock: product.stock,
            created_on: product
                .created_on
                .unwrap_or_else(|| Utc::now().date_naive()),
        };
        self.state
            .write()
            .await
            .products
            .insert(product.id, product.clone());
        Ok(product)
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        Ok(self.state.read().await.products.get(&id).cloned())
    }

    async fn list_products(&self) -> Result<Vec<Product>> {
        Ok(self.state.read().await.products.values().cloned().collect())
    }
}

#[async_trait]
impl SaleLedger for InMemoryStore {
    async fn get_sale(&self, id: SaleId) -> Result<Option<Sale>> {
        Ok(self.state.read().await.sales.get(&id).cloned())
    }

    async fn list_sales(&self) -> Result<Vec<Sale>> {
        Ok(self.state.read().await.sales.values().cloned().collect())
    }

    async fn list_line_items(&self) -> Result<Vec<LineItem>> {
        Ok(self.state.read().await.line_items.values().cloned().collect())
    }

    async fn line_items_for_sale(&self, id: SaleId) -> Result<Vec<LineItem>> {
        Ok(self
            .state
            .read()
            .await
            .line_items
            .values()
            .filter(|item| item.sale_id == id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl TransactionalStore for InMemoryStore {
    type Transaction = InMemoryTransaction;

    async fn begin(&self) -> Result<InMemoryTransaction> {
        let failing = self
            .faults
            .failing_begins
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if failing.is_ok() {
            return Err(StoreError::Unavailable(
                "injected begin failure".to_string(),
            ));
        }

        Ok(InMemoryTransaction {
            store: self.clone(),
            sales: Vec::new(),
            line_items: Vec::new(),
            decrements: BTreeMap::new(),
        })
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

/// A staged unit of work against an [`InMemoryStore`].
#[derive(Debug)]
pub struct InMemoryTransaction {
    store: InMemoryStore,
    sales: Vec<Sale>,
    line_items: Vec<LineItem>,
    decrements: BTreeMap<ProductId, i64>,
}

impl InMemoryTransaction {
    fn pending_decrement(&self, id: ProductId) -> i64 {
        self.decrements.get(&id).copied().unwrap_or(0)
    }
}

#[async_trait]
impl StoreTransaction for InMemoryTransaction {
    async fn get_client(&mut self, id: ClientId) -> Result<Option<Client>> {
        self.store.get_client(id).await
    }

    async fn get_product(&mut self, id: ProductId) -> Result<Option<Product>> {
        let pending = self.pending_decrement(id);
        Ok(self.store.get_product(id).await?.map(|mut product| {
            product.stock -= pending;
            product
        }))
    }

    async fn decrement_stock(&mut self, id: ProductId, amount: i64) -> Result<i64> {
        let delay = self.store.faults.decrement_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        let stock = self
            .store
            .get_product(id)
            .await?
            .ok_or(StoreError::NotFound {
                entity: Entity::Product,
                id: id.as_i64(),
            })?
            .stock;

        let available = stock - self.pending_decrement(id);
        if available < amount {
            return Err(StoreError::InsufficientStock {
                product_id: id,
                available,
                requested: amount,
            });
        }

        *self.decrements.entry(id).or_insert(0) += amount;
        Ok(available - amount)
    }

    async fn insert_sale(&mut self, sale: &NewSale) -> Result<SaleId> {
        if self.store.get_client(sale.client_id()).await?.is_none() {
            return Err(StoreError::Constraint("sales_client_id_fkey".to_string()));
        }

        let id = SaleId::new(next_id(&self.store.sequences.sale));
        self.sales.push(Sale {
            id,
            client_id: sale.client_id(),
            sale_date: sale.sale_date(),
            total: sale.total(),
        });
        Ok(id)
    }

    async fn insert_line_item(&mut self, item: &NewLineItem) -> Result<LineItemId> {
        if self.store.faults.fail_on_line_item.load(Ordering::SeqCst) {
            return Err(StoreError::Constraint(
                "injected line item failure".to_string(),
            ));
        }
        if !self.sales.iter().any(|sale| sale.id == item.sale_id()) {
            return Err(StoreError::Constraint(
                "line_items_sale_id_fkey".to_string(),
            ));
        }
        if self.store.get_product(item.product_id()).await?.is_none() {
            return Err(StoreError::Constraint(
                "line_items_product_id_fkey".to_string(),
            ));
        }

        let id = LineItemId::new(next_id(&self.store.sequences.line_item));
        self.line_items.push(item.clone().into_line_item(id));
        Ok(id)
    }

    async fn commit(self) -> Result<()> {
        let InMemoryTransaction {
            store,
            sales,
            line_items,
            decrements,
        } = self;

        let delay = store.faults.commit_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if store.faults.fail_on_commit.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(
                "injected commit failure".to_string(),
            ));
        }

        let mut state = store.state.write().await;

        // Re-verify against current stock; another transaction may have
        // committed since this one staged its decrements.
        for (id, amount) in &decrements {
            let product = state.products.get(id).ok_or(StoreError::NotFound {
                entity: Entity::Product,
                id: id.as_i64(),
            })?;
            if product.stock < *amount {
                return Err(StoreError::InsufficientStock {
                    product_id: *id,
                    available: product.stock,
                    requested: *amount,
                });
            }
        }

        for (id, amount) in &decrements {
            if let Some(product) = state.products.get_mut(id) {
                product.stock -= amount;
            }
        }
        for sale in sales {
            state.sales.insert(sale.id, sale);
        }
        for item in line_items {
            state.line_items.insert(item.id, item);
        }

        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        Ok(())
    }
}
