//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container and need Docker.
//! Run with:
//!
//! ```bash
//! cargo test -p store --test postgres_integration -- --ignored
//! ```

use std::sync::Arc;

use chrono::NaiveDate;
use domain::{Money, NewClient, NewProduct, SalePlan};
use rust_decimal_macros::dec;
use serial_test::serial;
use sqlx::PgPool;
use store::{
    CatalogStore, PostgresStore, SaleLedger, StoreError, StoreTransaction, TransactionalStore,
};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();
            sqlx::raw_sql(include_str!(
                "../../../migrations/001_create_sales_schema.sql"
            ))
            .execute(&temp_pool)
            .await
            .unwrap();
            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and cleared tables
async fn get_test_store() -> PostgresStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE line_items, sales, products, clients RESTART IDENTITY")
        .execute(&pool)
        .await
        .unwrap();

    PostgresStore::new(pool)
}

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
}

#[tokio::test]
#[ignore = "requires docker"]
#[serial]
async fn create_and_list_catalog() {
    let store = get_test_store().await;

    let client = store
        .create_client(NewClient::new("Ana", "Perez").with_email("ana@example.com"))
        .await
        .unwrap();
    let product = store
        .create_product(NewProduct::new("Lamp", Money::new(dec!(9.99)), 5))
        .await
        .unwrap();

    assert_eq!(store.get_client(client.id).await.unwrap(), Some(client.clone()));
    assert_eq!(store.list_clients().await.unwrap(), vec![client]);
    assert_eq!(product.price.amount(), dec!(9.99));
    assert_eq!(store.list_products().await.unwrap(), vec![product]);
}

#[tokio::test]
#[ignore = "requires docker"]
#[serial]
async fn negative_stock_is_rejected_by_schema() {
    let store = get_test_store().await;

    let err = store
        .create_product(NewProduct::new("Lamp", Money::new(dec!(1.00)), -1))
        .await
        .unwrap_err();

    match err {
        StoreError::Constraint(name) => assert_eq!(name, "products_stock_non_negative"),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
#[ignore = "requires docker"]
#[serial]
async fn committed_transaction_writes_sale_items_and_stock() {
    let store = get_test_store().await;
    let client = store
        .create_client(NewClient::new("Ana", "Perez"))
        .await
        .unwrap();
    let product = store
        .create_product(NewProduct::new("Lamp", Money::new(dec!(9.99)), 5))
        .await
        .unwrap();
    let plan = SalePlan::new(client.id, date(), [(product.id, 3, product.price)]).unwrap();

    let mut tx = store.begin().await.unwrap();
    assert_eq!(tx.decrement_stock(product.id, 3).await.unwrap(), 2);
    let sale_id = tx.insert_sale(&plan.new_sale()).await.unwrap();
    for item in plan.new_line_items(sale_id) {
        tx.insert_line_item(&item).await.unwrap();
    }
    tx.commit().await.unwrap();

    let sale = store.get_sale(sale_id).await.unwrap().unwrap();
    let items = store.line_items_for_sale(sale_id).await.unwrap();
    assert_eq!(sale.total.amount(), dec!(29.97));
    assert!(sale.is_consistent_with(&items));
    assert_eq!(store.get_product(product.id).await.unwrap().unwrap().stock, 2);
}

#[tokio::test]
#[ignore = "requires docker"]
#[serial]
async fn rolled_back_transaction_leaves_no_trace() {
    let store = get_test_store().await;
    let client = store
        .create_client(NewClient::new("Ana", "Perez"))
        .await
        .unwrap();
    let product = store
        .create_product(NewProduct::new("Lamp", Money::new(dec!(9.99)), 5))
        .await
        .unwrap();
    let plan = SalePlan::new(client.id, date(), [(product.id, 2, product.price)]).unwrap();

    let mut tx = store.begin().await.unwrap();
    tx.decrement_stock(product.id, 2).await.unwrap();
    tx.insert_sale(&plan.new_sale()).await.unwrap();
    tx.rollback().await.unwrap();

    assert!(store.list_sales().await.unwrap().is_empty());
    assert_eq!(store.get_product(product.id).await.unwrap().unwrap().stock, 5);
}

#[tokio::test]
#[ignore = "requires docker"]
#[serial]
async fn conditional_decrement_reports_available_stock() {
    let store = get_test_store().await;
    let product = store
        .create_product(NewProduct::new("Lamp", Money::new(dec!(9.99)), 2))
        .await
        .unwrap();

    let mut tx = store.begin().await.unwrap();
    let err = tx.decrement_stock(product.id, 3).await.unwrap_err();

    assert!(matches!(
        err,
        StoreError::InsufficientStock {
            available: 2,
            requested: 3,
            ..
        }
    ));
}

#[tokio::test]
#[ignore = "requires docker"]
#[serial]
async fn concurrent_decrements_do_not_oversell() {
    let store = get_test_store().await;
    let product = store
        .create_product(NewProduct::new("Lamp", Money::new(dec!(9.99)), 5))
        .await
        .unwrap();

    let mut first = store.begin().await.unwrap();
    first.decrement_stock(product.id, 5).await.unwrap();

    // The second transaction blocks on the row lock until the first commits.
    let contender = {
        let store = store.clone();
        tokio::spawn(async move {
            let mut second = store.begin().await.unwrap();
            second.decrement_stock(product.id, 5).await
        })
    };

    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    first.commit().await.unwrap();

    let err = contender.await.unwrap().unwrap_err();
    assert!(matches!(
        err,
        StoreError::InsufficientStock {
            available: 0,
            requested: 5,
            ..
        }
    ));
    assert_eq!(store.get_product(product.id).await.unwrap().unwrap().stock, 0);
}

#[tokio::test]
#[ignore = "requires docker"]
#[serial]
async fn lock_timeout_is_transient() {
    let store = get_test_store()
        .await
        .with_lock_timeout(std::time::Duration::from_millis(50));
    let product = store
        .create_product(NewProduct::new("Lamp", Money::new(dec!(9.99)), 5))
        .await
        .unwrap();

    let mut holder = store.begin().await.unwrap();
    holder.decrement_stock(product.id, 1).await.unwrap();

    let mut waiter = store.begin().await.unwrap();
    let err = waiter.decrement_stock(product.id, 1).await.unwrap_err();
    assert!(err.is_transient());

    holder.rollback().await.unwrap();
}
