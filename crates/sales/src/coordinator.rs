//! Sale transaction coordinator.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use chrono::{NaiveDate, Utc};
use common::{Entity, LineItemId, ProductId};
use domain::{InvalidReason, LineItem, Product, Sale, SalePlan, SaleRequest};
use serde::Serialize;
use store::{StoreTransaction, TransactionalStore};

use crate::error::{Result, SaleError, TransactionFailure};
use crate::retry::RetryPolicy;

/// Deadline and retry settings for sale submissions.
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinatorConfig {
    /// Time allowed for reads, writes and retry backoff. A commit that was
    /// already sent is awaited past it.
    pub timeout: Duration,
    /// Backoff applied to transient store failures.
    pub retry: RetryPolicy,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            retry: RetryPolicy::default(),
        }
    }
}

/// What a successful submission created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SaleReceipt {
    pub sale: Sale,
    pub line_items: Vec<LineItem>,
}

impl SaleReceipt {
    pub fn line_item_ids(&self) -> Vec<LineItemId> {
        self.line_items.iter().map(|item| item.id).collect()
    }
}

/// Turns sale requests into committed sales.
///
/// Each submission runs in a single store transaction that decrements
/// stock, inserts the sale header and inserts its line items; any failure
/// rolls all of it back. The coordinator keeps no state between calls,
/// so any number of instances may share one store.
#[derive(Clone)]
pub struct SaleCoordinator<S: TransactionalStore> {
    store: S,
    config: CoordinatorConfig,
}

impl<S: TransactionalStore> SaleCoordinator<S> {
    /// Creates a coordinator with the default deadline and retry policy.
    pub fn new(store: S) -> Self {
        Self::with_config(store, CoordinatorConfig::default())
    }

    pub fn with_config(store: S, config: CoordinatorConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Validates, prices and commits a sale.
    ///
    /// A missing sale date means today (UTC). Line items naming the same
    /// product are summed before stock is checked.
    #[tracing::instrument(
        skip(self, request),
        fields(client_id = %request.client_id, lines = request.items.len())
    )]
    pub async fn submit_sale(&self, request: SaleRequest) -> Result<SaleReceipt> {
        metrics::counter!("sales_submitted_total").increment(1);
        let started = Instant::now();
        let deadline = tokio::time::Instant::now() + self.config.timeout;
        let sale_date = request
            .sale_date
            .unwrap_or_else(|| Utc::now().date_naive());

        let result = self.commit_with_retry(&request, sale_date, deadline).await;

        let duration = started.elapsed().as_secs_f64();
        metrics::histogram!("sale_commit_duration_seconds").record(duration);

        match &result {
            Ok(receipt) => {
                metrics::counter!("sales_committed_total").increment(1);
                tracing::info!(
                    sale_id = %receipt.sale.id,
                    total = %receipt.sale.total,
                    duration,
                    "sale committed"
                );
            }
            Err(err) => {
                metrics::counter!("sales_rejected_total", "reason" => err.kind()).increment(1);
                tracing::warn!(error = %err, kind = err.kind(), "sale rejected");
            }
        }

        result
    }

    fn timed_out(&self) -> SaleError {
        SaleError::TransactionFailed(TransactionFailure::Timeout(self.config.timeout))
    }

    /// Runs attempts until one succeeds, fails for a non-transient reason,
    /// the retry budget is spent or the deadline passes.
    async fn commit_with_retry(
        &self,
        request: &SaleRequest,
        sale_date: NaiveDate,
        deadline: tokio::time::Instant,
    ) -> Result<SaleReceipt> {
        let policy = &self.config.retry;
        let mut attempt = 0;

        loop {
            match self.try_commit(request, sale_date, deadline).await {
                Ok(receipt) => return Ok(receipt),
                Err(err) if err.is_retryable() && attempt < policy.max_retries => {
                    let delay = policy.delay_for_attempt(attempt);
                    if tokio::time::Instant::now() + delay >= deadline {
                        tracing::warn!(error = %err, attempt, "no time left to retry");
                        return Err(self.timed_out());
                    }
                    attempt += 1;
                    metrics::counter!("sale_commit_retries_total").increment(1);
                    tracing::warn!(error = %err, attempt, ?delay, "transient store failure, retrying");
                    tokio::time::sleep(delay).await;
                }
                Err(SaleError::TransactionFailed(TransactionFailure::Store(source)))
                    if attempt > 0 && source.is_transient() =>
                {
                    return Err(SaleError::TransactionFailed(
                        TransactionFailure::RetriesExhausted {
                            attempts: attempt + 1,
                            source,
                        },
                    ));
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// One transaction: everything is applied on commit or rolled back.
    ///
    /// The deadline bounds the reads and writes. Once they are done the
    /// commit is sent and awaited unbounded, so the reported outcome is
    /// always the one the store settled on.
    async fn try_commit(
        &self,
        request: &SaleRequest,
        sale_date: NaiveDate,
        deadline: tokio::time::Instant,
    ) -> Result<SaleReceipt> {
        let (tx, receipt) = tokio::time::timeout_at(deadline, self.stage(request, sale_date))
            .await
            .map_err(|_| self.timed_out())??;

        tx.commit().await?;
        Ok(receipt)
    }

    /// Begins a transaction and applies the sale to it without committing.
    ///
    /// Dropping the returned future mid-way drops the transaction, which
    /// rolls it back.
    async fn stage(
        &self,
        request: &SaleRequest,
        sale_date: NaiveDate,
    ) -> Result<(S::Transaction, SaleReceipt)> {
        let mut tx = self.store.begin().await?;

        match Self::apply(&mut tx, request, sale_date).await {
            Ok(receipt) => Ok((tx, receipt)),
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::warn!(error = %rollback_err, "rollback failed");
                }
                Err(err)
            }
        }
    }

    async fn apply(
        tx: &mut S::Transaction,
        request: &SaleRequest,
        sale_date: NaiveDate,
    ) -> Result<SaleReceipt> {
        // 1. Client must exist
        if tx.get_client(request.client_id).await?.is_none() {
            return Err(SaleError::NotFound {
                entity: Entity::Client,
                id: request.client_id.as_i64(),
            });
        }

        // 2. At least one line
        if request.items.is_empty() {
            return Err(SaleError::InvalidRequest(InvalidReason::EmptySale));
        }

        // 3. Each line: product, quantity, price
        let mut products: BTreeMap<ProductId, Product> = BTreeMap::new();
        let mut priced = Vec::with_capacity(request.items.len());
        for item in &request.items {
            if !products.contains_key(&item.product_id) {
                let product = tx.get_product(item.product_id).await?.ok_or(
                    SaleError::NotFound {
                        entity: Entity::Product,
                        id: item.product_id.as_i64(),
                    },
                )?;
                products.insert(item.product_id, product);
            }
            let product = &products[&item.product_id];
            let quantity = item.checked_quantity()?;
            let unit_price = item.checked_unit_price(product.price)?;
            priced.push((item.product_id, quantity, unit_price));
        }

        let plan = SalePlan::new(request.client_id, sale_date, priced)?;

        // 4. Summed demand against the stock read above, before any write
        for (product_id, requested) in plan.demand() {
            if let Some(product) = products.get(&product_id)
                && !product.has_stock_for(requested)
            {
                return Err(SaleError::InsufficientStock {
                    product_id,
                    available: product.stock,
                    requested,
                });
            }
        }

        // 5. Authoritative check-and-decrement, in ascending product id order
        for (product_id, requested) in plan.demand() {
            tx.decrement_stock(product_id, requested).await?;
        }

        // 6. Header and lines
        let new_sale = plan.new_sale();
        let sale_id = tx.insert_sale(&new_sale).await?;

        let mut line_items = Vec::with_capacity(plan.lines().len());
        for row in plan.new_line_items(sale_id) {
            let id = tx.insert_line_item(&row).await?;
            line_items.push(row.into_line_item(id));
        }

        Ok(SaleReceipt {
            sale: Sale {
                id: sale_id,
                client_id: new_sale.client_id(),
                sale_date: new_sale.sale_date(),
                total: new_sale.total(),
            },
            line_items,
        })
    }
}
