//! Integration tests for sale submission against the in-memory store.

use std::time::Duration;

use chrono::NaiveDate;
use common::{ClientId, Entity, ProductId};
use domain::{InvalidReason, Money, NewClient, NewProduct, RequestedItem, SaleRequest};
use rust_decimal_macros::dec;
use sales::{CoordinatorConfig, RetryPolicy, SaleCoordinator, SaleError, TransactionFailure};
use store::{CatalogStore, InMemoryStore, SaleLedger};

struct TestHarness {
    store: InMemoryStore,
    coordinator: SaleCoordinator<InMemoryStore>,
    client: ClientId,
}

impl TestHarness {
    async fn new() -> Self {
        Self::with_config(CoordinatorConfig {
            timeout: Duration::from_secs(5),
            retry: RetryPolicy::exponential(3, Duration::from_millis(1)),
        })
        .await
    }

    async fn with_config(config: CoordinatorConfig) -> Self {
        let store = InMemoryStore::new();
        let client = store
            .create_client(NewClient::new("Ana", "Perez"))
            .await
            .unwrap()
            .id;
        let coordinator = SaleCoordinator::with_config(store.clone(), config);

        Self {
            store,
            coordinator,
            client,
        }
    }

    async fn product(&self, price_cents: i64, stock: i64) -> ProductId {
        self.store
            .create_product(NewProduct::new("Widget", Money::from_cents(price_cents), stock))
            .await
            .unwrap()
            .id
    }

    async fn stock(&self, id: ProductId) -> i64 {
        self.store.get_product(id).await.unwrap().unwrap().stock
    }

    /// Sale rows, line item rows and the stock of `products`.
    async fn snapshot(&self, products: &[ProductId]) -> (usize, usize, Vec<i64>) {
        let mut stocks = Vec::new();
        for id in products {
            stocks.push(self.stock(*id).await);
        }
        (
            self.store.sale_count().await,
            self.store.line_item_count().await,
            stocks,
        )
    }
}

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
}

#[tokio::test]
async fn test_successful_sale_commits_total_items_and_stock() {
    let h = TestHarness::new().await;
    let product = h.product(999, 5).await;

    let receipt = h
        .coordinator
        .submit_sale(
            SaleRequest::new(h.client, vec![RequestedItem::new(product, 3, dec!(9.99))]).on(date()),
        )
        .await
        .unwrap();

    assert_eq!(receipt.sale.total.amount(), dec!(29.97));
    assert_eq!(receipt.sale.sale_date, date());
    assert_eq!(receipt.line_items.len(), 1);
    assert_eq!(receipt.line_items[0].subtotal.amount(), dec!(29.97));
    assert_eq!(h.stock(product).await, 2);

    let stored = h.store.get_sale(receipt.sale.id).await.unwrap().unwrap();
    let items = h.store.line_items_for_sale(receipt.sale.id).await.unwrap();
    assert_eq!(stored, receipt.sale);
    assert_eq!(items, receipt.line_items);
    assert!(stored.is_consistent_with(&items));
}

#[tokio::test]
async fn test_insufficient_stock_reports_available_and_requested() {
    let h = TestHarness::new().await;
    let product = h.product(999, 5).await;
    h.coordinator
        .submit_sale(SaleRequest::new(
            h.client,
            vec![RequestedItem::new(product, 3, dec!(9.99))],
        ))
        .await
        .unwrap();

    let err = h
        .coordinator
        .submit_sale(SaleRequest::new(
            h.client,
            vec![RequestedItem::new(product, 3, dec!(9.99))],
        ))
        .await
        .unwrap_err();

    match err {
        SaleError::InsufficientStock {
            product_id,
            available,
            requested,
        } => {
            assert_eq!(product_id, product);
            assert_eq!(available, 2);
            assert_eq!(requested, 3);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(h.stock(product).await, 2);
    assert_eq!(h.store.sale_count().await, 1);
}

#[tokio::test]
async fn test_unknown_client_is_not_found() {
    let h = TestHarness::new().await;
    let product = h.product(999, 5).await;

    let err = h
        .coordinator
        .submit_sale(SaleRequest::new(
            ClientId::new(999),
            vec![RequestedItem::new(product, 1, dec!(9.99))],
        ))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SaleError::NotFound {
            entity: Entity::Client,
            id: 999
        }
    ));
    assert_eq!(h.store.sale_count().await, 0);
}

#[tokio::test]
async fn test_empty_sale_is_invalid() {
    let h = TestHarness::new().await;

    let err = h
        .coordinator
        .submit_sale(SaleRequest::new(h.client, vec![]))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SaleError::InvalidRequest(InvalidReason::EmptySale)
    ));
}

#[tokio::test]
async fn test_unknown_product_is_named() {
    let h = TestHarness::new().await;
    let product = h.product(999, 5).await;

    let err = h
        .coordinator
        .submit_sale(SaleRequest::new(
            h.client,
            vec![
                RequestedItem::new(product, 1, dec!(9.99)),
                RequestedItem::new(ProductId::new(404), 1, dec!(1.00)),
            ],
        ))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SaleError::NotFound {
            entity: Entity::Product,
            id: 404
        }
    ));
    assert_eq!(h.snapshot(&[product]).await, (0, 0, vec![5]));
}

#[tokio::test]
async fn test_bad_quantity_and_bad_price_are_distinct() {
    let h = TestHarness::new().await;
    let product = h.product(999, 5).await;

    let err = h
        .coordinator
        .submit_sale(SaleRequest::new(
            h.client,
            vec![RequestedItem::new(product, 0, dec!(9.99))],
        ))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SaleError::InvalidRequest(InvalidReason::BadQuantity)
    ));

    let err = h
        .coordinator
        .submit_sale(SaleRequest::new(
            h.client,
            vec![RequestedItem::new(product, 1, dec!(-1))],
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, SaleError::InvalidRequest(InvalidReason::BadPrice)));

    assert_eq!(h.snapshot(&[product]).await, (0, 0, vec![5]));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_unstorable_amount_is_invalid_not_a_panic() {
    let h = TestHarness::new().await;
    let product = h.product(999, 5).await;

    let coordinator = h.coordinator.clone();
    let client = h.client;
    let err = tokio::spawn(async move {
        coordinator
            .submit_sale(SaleRequest::new(
                client,
                vec![RequestedItem::new(product, 2, rust_decimal::Decimal::MAX)],
            ))
            .await
    })
    .await
    .expect("submission task panicked")
    .unwrap_err();

    assert!(matches!(
        err,
        SaleError::InvalidRequest(InvalidReason::AmountTooLarge)
    ));
    assert_eq!(err.kind(), "invalid_request");
    assert_eq!(h.snapshot(&[product]).await, (0, 0, vec![5]));
}

#[tokio::test]
async fn test_repeated_product_lines_are_summed_for_stock() {
    let h = TestHarness::new().await;
    let product = h.product(100, 5).await;

    let err = h
        .coordinator
        .submit_sale(SaleRequest::new(
            h.client,
            vec![
                RequestedItem::new(product, 3, dec!(1.00)),
                RequestedItem::new(product, 3, dec!(1.00)),
            ],
        ))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SaleError::InsufficientStock {
            available: 5,
            requested: 6,
            ..
        }
    ));
    assert_eq!(h.stock(product).await, 5);
}

#[tokio::test]
async fn test_stock_conservation_across_products() {
    let h = TestHarness::new().await;
    let lamp = h.product(1999, 10).await;
    let desk = h.product(15000, 3).await;

    let receipt = h
        .coordinator
        .submit_sale(SaleRequest::new(
            h.client,
            vec![
                RequestedItem::new(lamp, 2, dec!(19.99)),
                RequestedItem::new(desk, 1, dec!(150.00)),
                RequestedItem::new(lamp, 1, dec!(18.50)),
            ],
        ))
        .await
        .unwrap();

    assert_eq!(h.stock(lamp).await, 7);
    assert_eq!(h.stock(desk).await, 2);
    assert_eq!(receipt.line_items.len(), 3);
    assert_eq!(receipt.sale.total.amount(), dec!(208.48));
    assert_eq!(receipt.line_item_ids().len(), 3);
}

#[tokio::test]
async fn test_missing_price_uses_catalog_price() {
    let h = TestHarness::new().await;
    let product = h.product(999, 5).await;

    let receipt = h
        .coordinator
        .submit_sale(SaleRequest::new(
            h.client,
            vec![RequestedItem::at_catalog_price(product, 2)],
        ))
        .await
        .unwrap();

    assert_eq!(receipt.line_items[0].unit_price.amount(), dec!(9.99));
    assert_eq!(receipt.sale.total.amount(), dec!(19.98));
}

#[tokio::test]
async fn test_line_item_failure_rolls_back_everything() {
    let h = TestHarness::new().await;
    let product = h.product(999, 5).await;
    h.store.set_fail_on_line_item(true);

    let err = h
        .coordinator
        .submit_sale(SaleRequest::new(
            h.client,
            vec![RequestedItem::new(product, 2, dec!(9.99))],
        ))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SaleError::TransactionFailed(TransactionFailure::Store(_))
    ));
    assert_eq!(h.snapshot(&[product]).await, (0, 0, vec![5]));
}

#[tokio::test]
async fn test_commit_failure_exhausts_retries_without_partial_state() {
    let h = TestHarness::new().await;
    let product = h.product(999, 5).await;
    h.store.set_fail_on_commit(true);

    let err = h
        .coordinator
        .submit_sale(SaleRequest::new(
            h.client,
            vec![RequestedItem::new(product, 2, dec!(9.99))],
        ))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SaleError::TransactionFailed(TransactionFailure::RetriesExhausted { attempts: 4, .. })
    ));
    assert_eq!(h.snapshot(&[product]).await, (0, 0, vec![5]));
}

#[tokio::test]
async fn test_transient_failures_are_retried() {
    let h = TestHarness::new().await;
    let product = h.product(999, 5).await;
    h.store.fail_next_begins(2);

    let receipt = h
        .coordinator
        .submit_sale(SaleRequest::new(
            h.client,
            vec![RequestedItem::new(product, 1, dec!(9.99))],
        ))
        .await
        .unwrap();

    assert_eq!(h.store.sale_count().await, 1);
    assert_eq!(h.stock(product).await, 4);
    assert_eq!(receipt.line_items.len(), 1);
}

#[tokio::test]
async fn test_no_retry_policy_surfaces_store_error() {
    let h = TestHarness::with_config(CoordinatorConfig {
        timeout: Duration::from_secs(5),
        retry: RetryPolicy::none(),
    })
    .await;
    let product = h.product(999, 5).await;
    h.store.fail_next_begins(1);

    let err = h
        .coordinator
        .submit_sale(SaleRequest::new(
            h.client,
            vec![RequestedItem::new(product, 1, dec!(9.99))],
        ))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SaleError::TransactionFailed(TransactionFailure::Store(_))
    ));
}

#[tokio::test]
async fn test_timeout_fails_cleanly() {
    let h = TestHarness::with_config(CoordinatorConfig {
        timeout: Duration::from_millis(50),
        retry: RetryPolicy::none(),
    })
    .await;
    let product = h.product(999, 5).await;
    h.store.set_decrement_delay(Duration::from_millis(500));

    let err = h
        .coordinator
        .submit_sale(SaleRequest::new(
            h.client,
            vec![RequestedItem::new(product, 1, dec!(9.99))],
        ))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SaleError::TransactionFailed(TransactionFailure::Timeout(_))
    ));
    assert_eq!(h.snapshot(&[product]).await, (0, 0, vec![5]));
}

#[tokio::test]
async fn test_slow_commit_past_deadline_still_reports_success() {
    let h = TestHarness::with_config(CoordinatorConfig {
        timeout: Duration::from_millis(50),
        retry: RetryPolicy::none(),
    })
    .await;
    let product = h.product(999, 5).await;
    h.store.set_commit_delay(Duration::from_millis(200));

    let receipt = h
        .coordinator
        .submit_sale(SaleRequest::new(
            h.client,
            vec![RequestedItem::new(product, 1, dec!(9.99))],
        ))
        .await
        .unwrap();

    assert_eq!(receipt.sale.total.amount(), dec!(9.99));
    assert_eq!(h.snapshot(&[product]).await, (1, 1, vec![4]));
}

#[tokio::test]
async fn test_backoff_stops_at_deadline() {
    let h = TestHarness::with_config(CoordinatorConfig {
        timeout: Duration::from_millis(150),
        retry: RetryPolicy::exponential(10, Duration::from_millis(100)),
    })
    .await;
    let product = h.product(999, 5).await;
    h.store.fail_next_begins(10);

    let err = h
        .coordinator
        .submit_sale(SaleRequest::new(
            h.client,
            vec![RequestedItem::new(product, 1, dec!(9.99))],
        ))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        SaleError::TransactionFailed(TransactionFailure::Timeout(_))
    ));
    assert_eq!(h.snapshot(&[product]).await, (0, 0, vec![5]));
}

#[tokio::test]
async fn test_fixing_reported_cause_succeeds_exactly_once() {
    let h = TestHarness::new().await;
    let product = h.product(999, 2).await;

    let err = h
        .coordinator
        .submit_sale(SaleRequest::new(
            h.client,
            vec![RequestedItem::new(product, 3, dec!(9.99))],
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, SaleError::InsufficientStock { .. }));

    h.coordinator
        .submit_sale(SaleRequest::new(
            h.client,
            vec![RequestedItem::new(product, 2, dec!(9.99))],
        ))
        .await
        .unwrap();

    assert_eq!(h.store.sale_count().await, 1);
    assert_eq!(h.stock(product).await, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_two_concurrent_sales_of_all_stock_only_one_wins() {
    let h = TestHarness::new().await;
    let product = h.product(999, 5).await;

    let submit = |coordinator: SaleCoordinator<InMemoryStore>, client: ClientId| async move {
        coordinator
            .submit_sale(SaleRequest::new(
                client,
                vec![RequestedItem::new(product, 5, dec!(9.99))],
            ))
            .await
    };

    let (a, b) = tokio::join!(
        tokio::spawn(submit(h.coordinator.clone(), h.client)),
        tokio::spawn(submit(h.coordinator.clone(), h.client)),
    );
    let results = [a.unwrap(), b.unwrap()];

    let successes = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1);
    assert!(results.iter().any(|r| matches!(
        r,
        Err(SaleError::InsufficientStock {
            available: 0,
            requested: 5,
            ..
        })
    )));
    assert_eq!(h.stock(product).await, 0);
    assert_eq!(h.store.sale_count().await, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_many_concurrent_sales_never_oversell() {
    let h = TestHarness::new().await;
    let product = h.product(100, 10).await;

    let handles: Vec<_> = (0..25)
        .map(|_| {
            let coordinator = h.coordinator.clone();
            let client = h.client;
            tokio::spawn(async move {
                coordinator
                    .submit_sale(SaleRequest::new(
                        client,
                        vec![RequestedItem::new(product, 1, dec!(1.00))],
                    ))
                    .await
            })
        })
        .collect();

    let results = futures_util::future::join_all(handles).await;
    let successes = results
        .into_iter()
        .map(|r| r.unwrap())
        .filter(|r| r.is_ok())
        .count();

    assert_eq!(successes, 10);
    assert_eq!(h.stock(product).await, 0);
    assert_eq!(h.store.sale_count().await, 10);

    for sale in h.store.list_sales().await.unwrap() {
        let items = h.store.line_items_for_sale(sale.id).await.unwrap();
        assert!(sale.is_consistent_with(&items));
    }
}
