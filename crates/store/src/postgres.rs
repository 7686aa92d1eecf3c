use std::time::Duration;

use async_trait::async_trait;
use common::{ClientId, Entity, LineItemId, ProductId, SaleId};
use domain::{
    Client, LineItem, Money, NewClient, NewLineItem, NewProduct, NewSale, Product, Sale,
};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgPoolOptions, postgres::PgRow};

use crate::{
    Result, StoreError,
    store::{CatalogStore, SaleLedger, StoreTransaction, TransactionalStore},
};

const CLIENT_COLUMNS: &str =
    "id, first_name, last_name, email, phone, address, registered_on";
const PRODUCT_COLUMNS: &str = "id, name, description, price, stock, created_on";
const SALE_COLUMNS: &str = "id, client_id, sale_date, total";
const LINE_ITEM_COLUMNS: &str = "id, sale_id, product_id, quantity, unit_price, subtotal";

/// PostgreSQL-backed catalog store and sale ledger.
///
/// Stock decrements are conditional updates, so the row lock taken by
/// the first writer serializes concurrent sales of the same product
/// while sales of different products proceed independently.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
    lock_timeout: Option<Duration>,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            lock_timeout: None,
        }
    }

    /// Connects a pool to `database_url`.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Bounds how long a transaction waits on a row lock.
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = Some(timeout);
        self
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_client(row: PgRow) -> Result<Client> {
        Ok(Client {
            id: ClientId::new(row.try_get("id")?),
            first_name: row.try_get("first_name")?,
            last_name: row.try_get("last_name")?,
            email: row.try_get("email")?,
            phone: row.try_get("phone")?,
            address: row.try_get("address")?,
            registered_on: row.try_get("registered_on")?,
        })
    }

    fn row_to_product(row: PgRow) -> Result<Product> {
        Ok(Product {
            id: ProductId::new(row.try_get("id")?),
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            price: Money::new(row.try_get::<Decimal, _>("price")?),
            stock: row.try_get("stock")?,
            created_on: row.try_get("created_on")?,
        })
    }

    fn row_to_sale(row: PgRow) -> Result<Sale> {
        Ok(Sale {
            id: SaleId::new(row.try_get("id")?),
            client_id: ClientId::new(row.try_get("client_id")?),
            sale_date: row.try_get("sale_date")?,
            total: Money::new(row.try_get::<Decimal, _>("total")?),
        })
    }

    fn row_to_line_item(row: PgRow) -> Result<LineItem> {
        let quantity: i64 = row.try_get("quantity")?;
        Ok(LineItem {
            id: LineItemId::new(row.try_get("id")?),
            sale_id: SaleId::new(row.try_get("sale_id")?),
            product_id: ProductId::new(row.try_get("product_id")?),
            quantity: u32::try_from(quantity).map_err(|e| sqlx::Error::Decode(Box::new(e)))?,
            unit_price: Money::new(row.try_get::<Decimal, _>("unit_price")?),
            subtotal: Money::new(row.try_get::<Decimal, _>("subtotal")?),
        })
    }
}

/// Maps named constraint violations to [`StoreError::Constraint`].
fn map_write_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = err
        && let Some(constraint) = db_err.constraint()
    {
        return StoreError::Constraint(constraint.to_string());
    }
    StoreError::Database(err)
}

#[async_trait]
impl CatalogStore for PostgresStore {
    #[tracing::instrument(skip(self, client))]
    async fn create_client(&self, client: NewClient) -> Result<Client> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO clients (first_name, last_name, email, phone, address, registered_on)
            VALUES ($1, $2, $3, $4, $5, COALESCE($6, CURRENT_DATE))
            RETURNING {CLIENT_COLUMNS}
            "#
        ))
        .bind(&client.first_name)
        .bind(&client.last_name)
        .bind(&client.email)
        .bind(&client.phone)
        .bind(&client.address)
        .bind(client.registered_on)
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error)?;

        Self::row_to_client(row)
    }

    async fn get_client(&self, id: ClientId) -> Result<Option<Client>> {
        sqlx::query(&format!("SELECT {CLIENT_COLUMNS} FROM clients WHERE id = $1"))
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await?
            .map(Self::row_to_client)
            .transpose()
    }

    async fn list_clients(&self) -> Result<Vec<Client>> {
        let rows = sqlx::query(&format!("SELECT {CLIENT_COLUMNS} FROM clients ORDER BY id ASC"))
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Self::row_to_client).collect()
    }

    #[tracing::instrument(skip(self, product))]
    async fn create_product(&self, product: NewProduct) -> Result<Product> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO products (name, description, price, stock, created_on)
            VALUES ($1, $2, $3, $4, COALESCE($5, CURRENT_DATE))
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price.amount())
        .bind(product.stock)
        .bind(product.created_on)
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error)?;

        Self::row_to_product(row)
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        sqlx::query(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"))
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await?
            .map(Self::row_to_product)
            .transpose()
    }

    async fn list_products(&self) -> Result<Vec<Product>> {
        let rows =
            sqlx::query(&format!("SELECT {PRODUCT_COLUMNS} FROM products ORDER BY id ASC"))
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter().map(Self::row_to_product).collect()
    }
}

#[async_trait]
impl SaleLedger for PostgresStore {
    async fn get_sale(&self, id: SaleId) -> Result<Option<Sale>> {
        sqlx::query(&format!("SELECT {SALE_COLUMNS} FROM sales WHERE id = $1"))
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await?
            .map(Self::row_to_sale)
            .transpose()
    }

    async fn list_sales(&self) -> Result<Vec<Sale>> {
        let rows = sqlx::query(&format!("SELECT {SALE_COLUMNS} FROM sales ORDER BY id ASC"))
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Self::row_to_sale).collect()
    }

    async fn list_line_items(&self) -> Result<Vec<LineItem>> {
        let rows = sqlx::query(&format!(
            "SELECT {LINE_ITEM_COLUMNS} FROM line_items ORDER BY id ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_line_item).collect()
    }

    async fn line_items_for_sale(&self, id: SaleId) -> Result<Vec<LineItem>> {
        let rows = sqlx::query(&format!(
            "SELECT {LINE_ITEM_COLUMNS} FROM line_items WHERE sale_id = $1 ORDER BY id ASC"
        ))
        .bind(id.as_i64())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_line_item).collect()
    }
}

#[async_trait]
impl TransactionalStore for PostgresStore {
    type Transaction = PostgresTransaction;

    #[tracing::instrument(skip(self))]
    async fn begin(&self) -> Result<PostgresTransaction> {
        let mut tx = self.pool.begin().await?;

        if let Some(timeout) = self.lock_timeout {
            // SET does not take bind parameters; the value is an integer.
            sqlx::query(&format!("SET LOCAL lock_timeout = '{}ms'", timeout.as_millis()))
                .execute(&mut *tx)
                .await?;
        }

        Ok(PostgresTransaction { tx })
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(())
    }
}

/// A database transaction spanning catalog and ledger tables.
///
/// Dropping it without committing rolls everything back.
pub struct PostgresTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTransaction for PostgresTransaction {
    async fn get_client(&mut self, id: ClientId) -> Result<Option<Client>> {
        sqlx::query(&format!("SELECT {CLIENT_COLUMNS} FROM clients WHERE id = $1"))
            .bind(id.as_i64())
            .fetch_optional(&mut *self.tx)
            .await?
            .map(PostgresStore::row_to_client)
            .transpose()
    }

    async fn get_product(&mut self, id: ProductId) -> Result<Option<Product>> {
        sqlx::query(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"))
            .bind(id.as_i64())
            .fetch_optional(&mut *self.tx)
            .await?
            .map(PostgresStore::row_to_product)
            .transpose()
    }

    #[tracing::instrument(skip(self))]
    async fn decrement_stock(&mut self, id: ProductId, amount: i64) -> Result<i64> {
        // Under READ COMMITTED a concurrent writer blocks on the row lock and
        // re-evaluates the WHERE clause against the committed stock.
        let remaining: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE products
            SET stock = stock - $2
            WHERE id = $1 AND stock >= $2
            RETURNING stock
            "#,
        )
        .bind(id.as_i64())
        .bind(amount)
        .fetch_optional(&mut *self.tx)
        .await?;

        if let Some(remaining) = remaining {
            return Ok(remaining);
        }

        let available: Option<i64> =
            sqlx::query_scalar("SELECT stock FROM products WHERE id = $1")
                .bind(id.as_i64())
                .fetch_optional(&mut *self.tx)
                .await?;

        match available {
            Some(available) => Err(StoreError::InsufficientStock {
                product_id: id,
                available,
                requested: amount,
            }),
            None => Err(StoreError::NotFound {
                entity: Entity::Product,
                id: id.as_i64(),
            }),
        }
    }

    async fn insert_sale(&mut self, sale: &NewSale) -> Result<SaleId> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO sales (client_id, sale_date, total)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(sale.client_id().as_i64())
        .bind(sale.sale_date())
        .bind(sale.total().amount())
        .fetch_one(&mut *self.tx)
        .await
        .map_err(map_write_error)?;

        Ok(SaleId::new(id))
    }

    async fn insert_line_item(&mut self, item: &NewLineItem) -> Result<LineItemId> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO line_items (sale_id, product_id, quantity, unit_price, subtotal)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(item.sale_id().as_i64())
        .bind(item.product_id().as_i64())
        .bind(i64::from(item.quantity()))
        .bind(item.unit_price().amount())
        .bind(item.subtotal().amount())
        .fetch_one(&mut *self.tx)
        .await
        .map_err(map_write_error)?;

        Ok(LineItemId::new(id))
    }

    async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
