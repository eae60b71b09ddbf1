//! Inventory ledger tests
//!
//! Runs the inventory service against the in-memory store:
//! - Availability checks
//! - Usage and purchase recording
//! - All-or-nothing log deduction
//! - No drift between item quantity and its transaction history

use fms_backend::error::AppError;
use fms_backend::services::inventory::{CreateItemInput, RecordPurchaseInput};
use fms_backend::services::{InventoryService, MemoryInventoryStore};
use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::{
    insufficient_stock_message, replay_quantity, ConsumptionLine, ConsumptionPurpose,
    InventoryCategory, InventoryItem, TransactionKind,
};
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn service() -> InventoryService {
    InventoryService::new(Arc::new(MemoryInventoryStore::new()))
}

fn purchase_of(name: &str, quantity: &str) -> RecordPurchaseInput {
    RecordPurchaseInput {
        item_id: None,
        name: Some(name.to_string()),
        category: Some(InventoryCategory::Feed),
        unit: Some("Bags".to_string()),
        min_threshold: Some(dec("5")),
        quantity: dec(quantity),
        cost: None,
        supplier: None,
        notes: None,
        transaction_date: None,
    }
}

/// TopFeed Layer Mash with 12 Bags in stock
async fn stocked(service: &InventoryService, farm_id: Uuid) -> InventoryItem {
    service
        .record_purchase(farm_id, purchase_of("TopFeed Layer Mash", "12"))
        .await
        .unwrap()
        .item
}

// ============================================================================
// Availability
// ============================================================================

#[tokio::test]
async fn test_availability_reports_current_quantity() {
    let service = service();
    let item = stocked(&service, Uuid::new_v4()).await;

    let enough = service.check_availability(item.id, dec("12")).await.unwrap();
    assert!(enough.available);
    assert_eq!(enough.current_qty, dec("12"));
    assert_eq!(enough.item_name, "TopFeed Layer Mash");
    assert_eq!(enough.unit, "Bags");

    let short = service.check_availability(item.id, dec("12.5")).await.unwrap();
    assert!(!short.available);
    assert_eq!(short.current_qty, dec("12"));
}

#[tokio::test]
async fn test_availability_is_idempotent() {
    let service = service();
    let item = stocked(&service, Uuid::new_v4()).await;

    let first = service.check_availability(item.id, dec("5")).await.unwrap();
    let second = service.check_availability(item.id, dec("5")).await.unwrap();
    assert_eq!(first, second);

    let after = service.get_item(item.id).await.unwrap();
    assert_eq!(after.quantity, dec("12"));
    assert_eq!(service.list_transactions(item.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_availability_of_unknown_item_is_not_found() {
    let service = service();
    let err = service
        .check_availability(Uuid::new_v4(), dec("1"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_availability_rejects_non_positive_request() {
    let service = service();
    let item = stocked(&service, Uuid::new_v4()).await;

    for requested in ["0", "-1"] {
        let err = service
            .check_availability(item.id, dec(requested))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }
}

#[tokio::test]
async fn test_quantities_finer_than_storage_are_rejected() {
    let service = service();
    let farm_id = Uuid::new_v4();
    let item = service
        .record_purchase(farm_id, purchase_of("Layer Premix", "1.001"))
        .await
        .unwrap()
        .item;

    let err = service
        .check_availability(item.id, dec("0.0004"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation { .. }));

    let err = service
        .record_usage(item.id, dec("0.0005"), "Premix")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation { .. }));

    let mut topup = purchase_of("Layer Premix", "1.0005");
    topup.item_id = Some(item.id);
    let err = service.record_purchase(farm_id, topup).await.unwrap_err();
    assert!(matches!(err, AppError::Validation { .. }));

    let lines = vec![ConsumptionLine {
        item_id: item.id,
        quantity: dec("0.0004"),
        purpose: ConsumptionPurpose::Feed,
    }];
    let date = NaiveDate::from_ymd_opt(2025, 11, 18).unwrap();
    assert!(service
        .deduct_for_log(farm_id, &lines, "Daily log", date)
        .await
        .is_err());

    let after = service.get_item(item.id).await.unwrap();
    let history = service.list_transactions(item.id).await.unwrap();
    assert_eq!(after.quantity, dec("1.001"));
    assert_eq!(history.len(), 1);
    assert_eq!(replay_quantity(&history), after.quantity);
}

// ============================================================================
// Usage
// ============================================================================

#[tokio::test]
async fn test_usage_deducts_and_records_transaction() {
    let service = service();
    let item = stocked(&service, Uuid::new_v4()).await;

    let committed = service
        .record_usage(item.id, dec("5"), "Morning feed")
        .await
        .unwrap();
    assert_eq!(committed.item.quantity, dec("7"));
    assert_eq!(committed.transaction.kind, TransactionKind::Usage);
    assert_eq!(committed.transaction.quantity, dec("5"));
    assert_eq!(committed.transaction.unit, "Bags");
    assert_eq!(committed.transaction.notes.as_deref(), Some("Morning feed"));

    let transactions = service.list_transactions(item.id).await.unwrap();
    let usages: Vec<_> = transactions
        .iter()
        .filter(|t| t.kind == TransactionKind::Usage)
        .collect();
    assert_eq!(usages.len(), 1);
}

#[tokio::test]
async fn test_overdraw_fails_and_changes_nothing() {
    let service = service();
    let item = stocked(&service, Uuid::new_v4()).await;
    service.record_usage(item.id, dec("5"), "Morning feed").await.unwrap();

    let err = service
        .record_usage(item.id, dec("20"), "Evening feed")
        .await
        .unwrap_err();

    match &err {
        AppError::InsufficientStock {
            item_name,
            unit,
            current_qty,
            requested,
            ..
        } => {
            assert_eq!(item_name, "TopFeed Layer Mash");
            assert_eq!(unit, "Bags");
            assert_eq!(*current_qty, dec("7"));
            assert_eq!(*requested, dec("20"));
        }
        other => panic!("expected InsufficientStock, got {:?}", other),
    }
    assert_eq!(
        err.to_string(),
        "Insufficient stock! Only 7 Bags of TopFeed Layer Mash available."
    );

    assert_eq!(service.get_item(item.id).await.unwrap().quantity, dec("7"));
    assert_eq!(service.list_transactions(item.id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_sequential_usages_apply_in_call_order() {
    let service = service();
    let item = stocked(&service, Uuid::new_v4()).await;

    service.record_usage(item.id, dec("2"), "first").await.unwrap();
    service.record_usage(item.id, dec("2"), "second").await.unwrap();

    assert_eq!(service.get_item(item.id).await.unwrap().quantity, dec("8"));

    // Newest first
    let notes: Vec<String> = service
        .list_transactions(item.id)
        .await
        .unwrap()
        .into_iter()
        .filter(|t| t.kind == TransactionKind::Usage)
        .filter_map(|t| t.notes)
        .collect();
    assert_eq!(notes, vec!["second".to_string(), "first".to_string()]);
}

#[tokio::test]
async fn test_concurrent_usages_never_overdraw() {
    let service = service();
    let item_id = stocked(&service, Uuid::new_v4()).await.id;

    let handles: Vec<_> = (0..5)
        .map(|i| {
            let service = service.clone();
            tokio::spawn(async move {
                let note = format!("worker {}", i);
                service.record_usage(item_id, dec("3"), &note).await
            })
        })
        .collect();

    let mut succeeded = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            succeeded += 1;
        }
    }

    assert_eq!(succeeded, 4);
    assert_eq!(service.get_item(item_id).await.unwrap().quantity, Decimal::ZERO);
}

// ============================================================================
// Purchases
// ============================================================================

#[tokio::test]
async fn test_purchase_of_new_item_creates_it() {
    let service = service();
    let farm_id = Uuid::new_v4();

    let mut input = purchase_of("Grower Pellets", "50");
    input.cost = Some(dec("450000"));
    input.supplier = Some("Agro Supplies".to_string());

    let committed = service.record_purchase(farm_id, input).await.unwrap();
    assert_eq!(committed.item.quantity, dec("50"));
    assert_eq!(committed.item.unit, "Bags");
    assert_eq!(committed.transaction.kind, TransactionKind::Purchase);
    assert_eq!(committed.transaction.quantity, dec("50"));
    assert_eq!(committed.transaction.cost, Some(dec("450000")));

    let items = service.list_items(Some(farm_id), None).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(service.list_transactions(committed.item.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_purchase_matches_existing_name_case_insensitively() {
    let service = service();
    let farm_id = Uuid::new_v4();
    let item = stocked(&service, farm_id).await;

    let committed = service
        .record_purchase(farm_id, purchase_of("  topfeed layer MASH ", "8"))
        .await
        .unwrap();

    assert_eq!(committed.item.id, item.id);
    assert_eq!(committed.item.quantity, dec("20"));
    assert_eq!(service.list_items(Some(farm_id), None).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_purchase_by_id_from_another_farm_is_not_found() {
    let service = service();
    let item = stocked(&service, Uuid::new_v4()).await;

    let mut input = purchase_of("ignored", "1");
    input.item_id = Some(item.id);
    let err = service
        .record_purchase(Uuid::new_v4(), input)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_purchase_of_new_item_requires_unit() {
    let service = service();
    let mut input = purchase_of("Vitamin Mix", "3");
    input.unit = None;

    let err = service.record_purchase(Uuid::new_v4(), input).await.unwrap_err();
    assert!(matches!(err, AppError::Validation { ref field, .. } if field == "unit"));
}

#[tokio::test]
async fn test_create_item_starts_empty_and_rejects_duplicates() {
    let service = service();
    let farm_id = Uuid::new_v4();
    let input = || CreateItemInput {
        name: "Newcastle Vaccine".to_string(),
        category: InventoryCategory::Medication,
        unit: "Vials".to_string(),
        min_threshold: Some(dec("2")),
    };

    let item = service.create_item(farm_id, input()).await.unwrap();
    assert_eq!(item.quantity, Decimal::ZERO);
    assert!(item.is_low_stock());

    let err = service.create_item(farm_id, input()).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict { .. }));

    // Same name on another farm is a different item
    assert!(service.create_item(Uuid::new_v4(), input()).await.is_ok());
}

#[tokio::test]
async fn test_low_stock_lists_items_at_or_below_threshold() {
    let service = service();
    let farm_id = Uuid::new_v4();
    let item = stocked(&service, farm_id).await;
    service
        .record_purchase(farm_id, purchase_of("Broiler Starter", "40"))
        .await
        .unwrap();

    assert!(service.low_stock(farm_id).await.unwrap().is_empty());

    service.record_usage(item.id, dec("7"), "feed").await.unwrap();
    let low = service.low_stock(farm_id).await.unwrap();
    assert_eq!(low.len(), 1);
    assert_eq!(low[0].id, item.id);
}

// ============================================================================
// Log deduction
// ============================================================================

fn line(item_id: Uuid, quantity: &str) -> ConsumptionLine {
    ConsumptionLine {
        item_id,
        quantity: dec(quantity),
        purpose: ConsumptionPurpose::Feed,
    }
}

fn log_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 11, 18).unwrap()
}

#[tokio::test]
async fn test_log_deduction_uses_log_note() {
    let service = service();
    let farm_id = Uuid::new_v4();
    let item = stocked(&service, farm_id).await;
    let note = shared::daily_log_note(shared::Sector::Layer, log_date());

    let committed = service
        .deduct_for_log(farm_id, &[line(item.id, "3")], &note, log_date())
        .await
        .unwrap();

    assert_eq!(committed.len(), 1);
    assert_eq!(committed[0].item.quantity, dec("9"));
    assert_eq!(
        committed[0].transaction.notes.as_deref(),
        Some("Daily log (Layer) — 2025-11-18")
    );
    assert_eq!(committed[0].transaction.transaction_date, log_date());
}

#[tokio::test]
async fn test_log_deduction_is_all_or_nothing() {
    let service = service();
    let farm_id = Uuid::new_v4();
    let feed = stocked(&service, farm_id).await;
    let grit = service
        .record_purchase(farm_id, purchase_of("Oyster Grit", "1"))
        .await
        .unwrap()
        .item;

    let err = service
        .deduct_for_log(
            farm_id,
            &[line(feed.id, "4"), line(grit.id, "2")],
            "Daily log (Layer) — 2025-11-18",
            log_date(),
        )
        .await
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        insufficient_stock_message("Oyster Grit", "Bags", &dec("1"))
    );
    assert_eq!(service.get_item(feed.id).await.unwrap().quantity, dec("12"));
    assert_eq!(service.get_item(grit.id).await.unwrap().quantity, dec("1"));
    assert_eq!(service.list_transactions(feed.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_log_deduction_sums_repeated_lines() {
    let service = service();
    let farm_id = Uuid::new_v4();
    let item = stocked(&service, farm_id).await;

    // 7 + 7 exceeds 12 even though each line alone fits
    let err = service
        .deduct_for_log(farm_id, &[line(item.id, "7"), line(item.id, "7")], "log", log_date())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InsufficientStock { .. }));

    let committed = service
        .deduct_for_log(farm_id, &[line(item.id, "4"), line(item.id, "4")], "log", log_date())
        .await
        .unwrap();
    assert_eq!(committed.len(), 1);
    assert_eq!(committed[0].transaction.quantity, dec("8"));
}

#[tokio::test]
async fn test_log_deduction_rejects_items_of_other_farms() {
    let service = service();
    let item = stocked(&service, Uuid::new_v4()).await;

    let err = service
        .deduct_for_log(Uuid::new_v4(), &[line(item.id, "1")], "log", log_date())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    assert_eq!(service.get_item(item.id).await.unwrap().quantity, dec("12"));
}

#[tokio::test]
async fn test_empty_log_deduction_is_a_no_op() {
    let service = service();
    let committed = service
        .deduct_for_log(Uuid::new_v4(), &[], "log", log_date())
        .await
        .unwrap();
    assert!(committed.is_empty());
}

// ============================================================================
// Property Tests
// ============================================================================

#[derive(Debug, Clone)]
enum Op {
    Purchase(Decimal),
    Usage(Decimal),
}

fn quantity_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..=5000i64).prop_map(|n| Decimal::new(n, 1))
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        quantity_strategy().prop_map(Op::Purchase),
        quantity_strategy().prop_map(Op::Usage),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Quantity always equals purchases minus applied usages, and never goes negative
    #[test]
    fn prop_quantity_matches_history(
        initial in quantity_strategy(),
        ops in prop::collection::vec(op_strategy(), 1..25)
    ) {
        let service = service();
        let farm_id = Uuid::new_v4();

        tokio_test::block_on(async {
            let item = service
                .record_purchase(farm_id, purchase_of("Layer Mash", &initial.to_string()))
                .await
                .unwrap()
                .item;

            let mut expected = initial;
            for op in &ops {
                match op {
                    Op::Purchase(q) => {
                        let mut input = purchase_of("Layer Mash", &q.to_string());
                        input.item_id = Some(item.id);
                        service.record_purchase(farm_id, input).await.unwrap();
                        expected += *q;
                    }
                    Op::Usage(q) => {
                        let result = service.record_usage(item.id, *q, "usage").await;
                        if *q <= expected {
                            prop_assert!(result.is_ok());
                            expected -= *q;
                        } else {
                            let is_insufficient = matches!(result, Err(AppError::InsufficientStock { .. }));
                            prop_assert!(is_insufficient);
                        }
                    }
                }
            }

            let current = service.get_item(item.id).await.unwrap();
            let history = service.list_transactions(item.id).await.unwrap();
            prop_assert_eq!(current.quantity, expected);
            prop_assert_eq!(replay_quantity(&history), expected);
            prop_assert!(current.quantity >= Decimal::ZERO);
            Ok(())
        })?;
    }

    /// Availability holds exactly when the request fits the stock
    #[test]
    fn prop_availability_matches_comparison(
        stock in quantity_strategy(),
        requested in quantity_strategy()
    ) {
        let service = service();

        tokio_test::block_on(async {
            let item = service
                .record_purchase(Uuid::new_v4(), purchase_of("Fish Pellets", &stock.to_string()))
                .await
                .unwrap()
                .item;

            let availability = service.check_availability(item.id, requested).await.unwrap();
            prop_assert_eq!(availability.available, requested <= stock);
            prop_assert_eq!(availability.current_qty, stock);
            Ok(())
        })?;
    }
}
